//! Routing and failover behaviour against scripted backends.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use replica_router::config::HealthCheckConfig;
use replica_router::health::{HealthMonitor, HealthReport};
use replica_router::pool::{BackendError, Role};
use replica_router::routing::{QueryIntent, RouteError};
use replica_router::Shutdown;

mod common;

use common::{fake_router, fake_router_with_check_timeout, Mode};

fn select_one() -> QueryIntent {
    QueryIntent::read("SELECT 1")
}

fn insert_order() -> QueryIntent {
    QueryIntent::write("INSERT INTO orders (product_id, quantity) VALUES ($1, $2)")
        .bind(1)
        .bind(2)
}

#[tokio::test]
async fn test_read_served_by_primary_when_both_healthy() {
    let router = fake_router();

    let routed = router.route(&select_one()).await.unwrap();

    assert_eq!(routed.decision.role, Role::Primary);
    assert_eq!(routed.decision.host, "10.0.0.10");
    assert_eq!(routed.decision.attempts, 1);
    assert!(!routed.decision.failed_over);
    assert_eq!(routed.output, "10.0.0.10");
    assert_eq!(router.backend(Role::Replica).executes(), 0);
    assert_eq!(router.last_decision(), Some(routed.decision));
}

#[tokio::test]
async fn test_read_goes_to_replica_when_primary_marked_down() {
    let router = fake_router();
    router.health().mark_unhealthy(Role::Primary);

    let routed = router.route(&select_one()).await.unwrap();

    assert_eq!(routed.decision.role, Role::Replica);
    assert_eq!(routed.decision.attempts, 1);
    assert_eq!(router.backend(Role::Primary).executes(), 0);
}

#[tokio::test]
async fn test_read_with_both_down_is_no_pool_available() {
    let router = fake_router();
    router.health().mark_unhealthy(Role::Primary);
    router.health().mark_unhealthy(Role::Replica);

    let err = router.route(&select_one()).await.unwrap_err();

    assert_eq!(err, RouteError::NoPoolAvailable { cause: None });
    assert_eq!(router.backend(Role::Primary).executes(), 0);
    assert_eq!(router.backend(Role::Replica).executes(), 0);
}

#[tokio::test]
async fn test_write_with_primary_marked_down_never_reaches_replica() {
    let router = fake_router();
    router.health().mark_unhealthy(Role::Primary);

    let err = router.route(&insert_order()).await.unwrap_err();

    assert_eq!(err, RouteError::PrimaryUnavailable { cause: None });
    assert_eq!(router.backend(Role::Replica).executes(), 0);
}

#[tokio::test]
async fn test_write_connectivity_failure_is_not_retried() {
    let router = fake_router();
    router.backend(Role::Primary).set_mode(Mode::Down);

    let err = router.route(&insert_order()).await.unwrap_err();

    assert_eq!(
        err,
        RouteError::PrimaryUnavailable {
            cause: Some(BackendError::Connectivity("connection refused".into()))
        }
    );
    assert_eq!(router.backend(Role::Primary).executes(), 1);
    assert_eq!(router.backend(Role::Replica).executes(), 0);
    assert!(!router.health().is_healthy(Role::Primary));
    assert!(router.health().is_healthy(Role::Replica));
}

#[tokio::test]
async fn test_malformed_sql_is_query_failed_without_retry() {
    let router = fake_router();
    router.backend(Role::Primary).set_mode(Mode::Reject("42601"));

    let err = router.route(&QueryIntent::read("SELEC 1")).await.unwrap_err();

    assert!(matches!(
        err,
        RouteError::QueryFailed { role: Role::Primary, ref source } if source.code() == Some("42601")
    ));
    assert!(router.health().is_healthy(Role::Primary));
    assert_eq!(router.backend(Role::Replica).executes(), 0);
    assert!(router.last_decision().is_none());
}

#[tokio::test]
async fn test_read_starting_on_replica_never_bounces_to_primary() {
    let router = fake_router();
    router.health().mark_unhealthy(Role::Primary);
    router.backend(Role::Replica).set_mode(Mode::Down);

    let err = router.route(&select_one()).await.unwrap_err();

    assert!(matches!(err, RouteError::NoPoolAvailable { cause: Some(_) }));
    assert_eq!(router.backend(Role::Replica).executes(), 1);
    assert_eq!(router.backend(Role::Primary).executes(), 0);
    assert!(!router.health().is_healthy(Role::Replica));
}

#[tokio::test]
async fn test_no_failover_to_replica_marked_down() {
    let router = fake_router();
    router.health().mark_unhealthy(Role::Replica);
    router.backend(Role::Primary).set_mode(Mode::Down);

    let err = router.route(&select_one()).await.unwrap_err();

    assert_eq!(
        err,
        RouteError::NoPoolAvailable {
            cause: Some(BackendError::Connectivity("connection refused".into()))
        }
    );
    assert_eq!(router.backend(Role::Primary).executes(), 1);
    assert_eq!(router.backend(Role::Replica).executes(), 0);
}

#[tokio::test]
async fn test_read_fails_over_once_on_connectivity_failure() {
    let router = fake_router();
    router.backend(Role::Primary).set_mode(Mode::Down);

    let routed = router.route(&select_one()).await.unwrap();

    assert_eq!(routed.decision.role, Role::Replica);
    assert_eq!(routed.decision.attempts, 2);
    assert!(routed.decision.failed_over);
    assert!(!router.health().is_healthy(Role::Primary));
    assert!(router.health().is_healthy(Role::Replica));
}

#[tokio::test]
async fn test_failover_target_query_error_keeps_health() {
    let router = fake_router();
    router.backend(Role::Primary).set_mode(Mode::Down);
    router.backend(Role::Replica).set_mode(Mode::Reject("42P01"));

    let err = router.route(&select_one()).await.unwrap_err();

    assert!(matches!(err, RouteError::QueryFailed { role: Role::Replica, .. }));
    assert!(router.health().is_healthy(Role::Replica));
}

#[tokio::test]
async fn test_at_most_one_retry_per_route() {
    let router = fake_router();
    router.backend(Role::Primary).set_mode(Mode::Down);
    router.backend(Role::Replica).set_mode(Mode::Down);

    let err = router.route(&select_one()).await.unwrap_err();

    assert!(matches!(err, RouteError::NoPoolAvailable { cause: Some(_) }));
    assert_eq!(router.backend(Role::Primary).executes(), 1);
    assert_eq!(router.backend(Role::Replica).executes(), 1);
    assert!(!router.health().is_healthy(Role::Primary));
    assert!(!router.health().is_healthy(Role::Replica));
}

#[tokio::test]
async fn test_only_health_check_restores_health() {
    let router = fake_router();
    router.backend(Role::Primary).set_mode(Mode::Down);
    router.route(&select_one()).await.unwrap();
    assert!(!router.health().is_healthy(Role::Primary));

    // The primary is back, but routing alone must not notice.
    router.backend(Role::Primary).set_mode(Mode::Up);
    for _ in 0..3 {
        let routed = router.route(&select_one()).await.unwrap();
        assert_eq!(routed.decision.role, Role::Replica);
    }
    assert!(!router.health().is_healthy(Role::Primary));

    let report = router.check_health().await;

    assert_eq!(report, HealthReport { primary: true, replica: true });
    assert!(router.health().is_healthy(Role::Primary));
    assert_eq!(
        router.route(&select_one()).await.unwrap().decision.role,
        Role::Primary
    );
}

#[tokio::test]
async fn test_check_health_is_stable_and_tracks_servers() {
    let router = fake_router();

    for _ in 0..3 {
        assert_eq!(router.check_health().await, HealthReport { primary: true, replica: true });
    }

    router.backend(Role::Replica).set_mode(Mode::Down);

    for _ in 0..3 {
        assert_eq!(router.check_health().await, HealthReport { primary: true, replica: false });
    }

    let snapshot = router.health_snapshot();
    assert!(snapshot.primary.healthy);
    assert!(!snapshot.replica.healthy);
    assert!(snapshot.replica.last_checked_at_ms.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_hung_primary_is_bounded_by_attempt_deadline() {
    let router = fake_router();
    router.backend(Role::Primary).set_mode(Mode::Hang);

    let started = tokio::time::Instant::now();
    let routed = router.route(&select_one()).await.unwrap();
    let elapsed = started.elapsed();

    let deadline = common::CONNECT_TIMEOUT + common::STATEMENT_TIMEOUT;
    assert_eq!(routed.decision.role, Role::Replica);
    assert!(elapsed >= deadline && elapsed < deadline * 2, "elapsed {elapsed:?}");
    assert!(!router.health().is_healthy(Role::Primary));
}

#[tokio::test(start_paused = true)]
async fn test_hung_write_surfaces_timeout() {
    let router = fake_router();
    router.backend(Role::Primary).set_mode(Mode::Hang);

    let err = router.route(&insert_order()).await.unwrap_err();

    assert_eq!(
        err,
        RouteError::PrimaryUnavailable {
            cause: Some(BackendError::Timeout(common::CONNECT_TIMEOUT + common::STATEMENT_TIMEOUT))
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_hung_probe_is_bounded_by_probe_timeout() {
    let router = fake_router();
    router.backend(Role::Replica).set_mode(Mode::Hang);

    let started = tokio::time::Instant::now();
    let report = router.check_health().await;

    assert_eq!(report, HealthReport { primary: true, replica: false });
    assert!(started.elapsed() < common::PROBE_TIMEOUT * 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_leaves_health_untouched() {
    let router = fake_router();
    router.backend(Role::Primary).set_mode(Mode::Hang);

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let err = router.route_until_cancelled(&select_one(), &token).await.unwrap_err();

    assert_eq!(err, RouteError::Cancelled);
    assert!(router.health().is_healthy(Role::Primary));
    assert!(router.health().is_healthy(Role::Replica));
    assert_eq!(router.backend(Role::Replica).executes(), 0);
}

#[tokio::test]
async fn test_already_cancelled_token_runs_nothing() {
    let router = fake_router();
    let token = CancellationToken::new();
    token.cancel();

    let err = router.route_until_cancelled(&select_one(), &token).await.unwrap_err();

    assert_eq!(err, RouteError::Cancelled);
    assert_eq!(router.backend(Role::Primary).executes(), 0);
}

#[tokio::test]
async fn test_route_until_cancelled_passes_results_through() {
    let router = fake_router();
    let token = CancellationToken::new();

    let routed = router.route_until_cancelled(&select_one(), &token).await.unwrap();

    assert_eq!(routed.decision.role, Role::Primary);
}

#[tokio::test(start_paused = true)]
async fn test_monitor_checks_on_interval_until_shutdown() {
    let router = Arc::new(fake_router());
    router.health().mark_unhealthy(Role::Primary);

    let config = HealthCheckConfig {
        enabled: true,
        interval_secs: 10,
        timeout_secs: 1,
        jitter_ms: 0,
    };
    let shutdown = Shutdown::new();
    let monitor = HealthMonitor::new(router.clone(), config);
    let task = tokio::spawn(monitor.run(shutdown.subscribe()));

    // Ticks at 0s, 10s and 20s.
    tokio::time::sleep(Duration::from_secs(25)).await;

    assert!(router.health().is_healthy(Role::Primary));
    assert_eq!(router.backend(Role::Primary).pings(), 3);
    assert_eq!(router.backend(Role::Replica).pings(), 3);

    shutdown.trigger();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_slow_health_checks_never_overlap() {
    let router = Arc::new(fake_router_with_check_timeout(Duration::from_secs(60)));
    router.backend(Role::Primary).set_mode(Mode::Slow(Duration::from_secs(25)));
    router.backend(Role::Replica).set_mode(Mode::Slow(Duration::from_secs(25)));

    let config = HealthCheckConfig {
        enabled: true,
        interval_secs: 10,
        timeout_secs: 5,
        jitter_ms: 0,
    };
    let shutdown = Shutdown::new();
    let task = tokio::spawn(HealthMonitor::new(router.clone(), config).run(shutdown.subscribe()));

    // The first check is still running 25s later; the servers answer
    // instantly from here on.
    tokio::time::sleep(Duration::from_secs(1)).await;
    router.backend(Role::Primary).set_mode(Mode::Up);
    router.backend(Role::Replica).set_mode(Mode::Up);

    // At 25s the overdue tick fires once. The tick due at 20s is dropped
    // rather than replayed, and the schedule resumes at 30s.
    tokio::time::sleep(Duration::from_secs(26)).await;
    for role in Role::ALL {
        assert_eq!(router.backend(role).pings(), 2, "{role}");
    }

    tokio::time::sleep(Duration::from_secs(4)).await;
    for role in Role::ALL {
        assert_eq!(router.backend(role).pings(), 3, "{role}");
        assert_eq!(router.backend(role).max_pings_in_flight(), 1, "{role}");
    }

    shutdown.trigger();
    task.await.unwrap();
}

#[tokio::test]
async fn test_disabled_monitor_exits_immediately() {
    let router = Arc::new(fake_router());
    let config = HealthCheckConfig {
        enabled: false,
        ..HealthCheckConfig::default()
    };
    let shutdown = Shutdown::new();

    HealthMonitor::new(router.clone(), config)
        .run(shutdown.subscribe())
        .await;

    assert_eq!(router.backend(Role::Primary).pings(), 0);
}

#[tokio::test]
async fn test_close_reaches_both_backends() {
    let router = fake_router();

    router.close(Duration::from_secs(1)).await;

    assert!(router.backend(Role::Primary).is_closed());
    assert!(router.backend(Role::Replica).is_closed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_routes_share_one_router() {
    let router = Arc::new(fake_router());

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let router = router.clone();
            tokio::spawn(async move {
                let intent = if i % 4 == 0 { insert_order() } else { select_one() };
                router.route(&intent).await
            })
        })
        .collect();

    for task in tasks {
        let routed = task.await.unwrap().unwrap();
        assert_eq!(routed.decision.role, Role::Primary);
    }
    assert_eq!(router.backend(Role::Primary).executes(), 32);
    assert_eq!(router.backend(Role::Replica).executes(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_reads_all_fail_over_when_primary_dies() {
    let router = Arc::new(fake_router());
    router.backend(Role::Primary).set_mode(Mode::Down);

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let router = router.clone();
            tokio::spawn(async move { router.route(&select_one()).await })
        })
        .collect();

    for task in tasks {
        let routed = task.await.unwrap().unwrap();
        assert_eq!(routed.decision.role, Role::Replica);
    }

    // Each read costs the replica exactly one call, whether it failed over
    // or was routed there directly after the primary was marked down.
    assert_eq!(router.backend(Role::Replica).executes(), 32);
    assert!(router.backend(Role::Primary).executes() >= 1);
    assert!(!router.health().is_healthy(Role::Primary));
    assert!(router.health().is_healthy(Role::Replica));
}
