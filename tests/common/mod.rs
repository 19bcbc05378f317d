//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;

use replica_router::config::{DatabaseConfig, RouterConfig};
use replica_router::health::HealthRegistry;
use replica_router::pool::{BackendError, PoolDescriptor, Role, RoleBackend};
use replica_router::routing::{DatabaseRouter, QueryIntent};
use replica_router::{HttpServer, PgRouter, Shutdown};

pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(100);
pub const STATEMENT_TIMEOUT: Duration = Duration::from_millis(200);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// How a scripted server behaves.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Up,
    /// Refuses connections.
    Down,
    /// Accepts the call and never answers.
    Hang,
    /// Rejects every statement with this SQLSTATE.
    Reject(&'static str),
    /// Answers, but only after this long.
    Slow(Duration),
}

/// In-memory stand-in for one database role.
pub struct FakeBackend {
    descriptor: PoolDescriptor,
    mode: Mutex<Mode>,
    executes: AtomicUsize,
    pings: AtomicUsize,
    pings_in_flight: AtomicUsize,
    max_pings_in_flight: AtomicUsize,
    closed: AtomicBool,
}

impl FakeBackend {
    pub fn new(role: Role) -> Self {
        let host = match role {
            Role::Primary => "10.0.0.10",
            Role::Replica => "10.0.0.11",
        };
        Self {
            descriptor: PoolDescriptor {
                role,
                host: host.into(),
                port: 5432,
                database: "ecommerce".into(),
                user: "app".into(),
                password: "secret".into(),
                max_connections: 4,
                idle_timeout: Duration::from_secs(30),
                connect_timeout: CONNECT_TIMEOUT,
                statement_timeout: STATEMENT_TIMEOUT,
            },
            mode: Mutex::new(Mode::Up),
            executes: AtomicUsize::new(0),
            pings: AtomicUsize::new(0),
            pings_in_flight: AtomicUsize::new(0),
            max_pings_in_flight: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn executes(&self) -> usize {
        self.executes.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    /// Highest number of pings that were running at the same time.
    pub fn max_pings_in_flight(&self) -> usize {
        self.max_pings_in_flight.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn respond(&self) -> Result<(), BackendError> {
        let mode = self.mode.lock().unwrap().clone();
        match mode {
            Mode::Up => Ok(()),
            Mode::Down => Err(BackendError::Connectivity("connection refused".into())),
            Mode::Hang => std::future::pending().await,
            Mode::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            Mode::Reject(code) => Err(BackendError::Query {
                code: Some(code.into()),
                message: "statement rejected".into(),
            }),
        }
    }
}

#[async_trait]
impl RoleBackend for FakeBackend {
    /// The host that answered, standing in for result rows.
    type Output = String;

    fn descriptor(&self) -> &PoolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, _intent: &QueryIntent) -> Result<String, BackendError> {
        self.executes.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        Ok(self.descriptor.host.clone())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        let running = self.pings_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_pings_in_flight.fetch_max(running, Ordering::SeqCst);

        let result = match self.respond().await {
            // A server that rejects statements still answers SELECT 1.
            Err(BackendError::Query { .. }) => Ok(()),
            other => other,
        };

        self.pings_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub type FakeRouter = DatabaseRouter<FakeBackend>;

/// Router over two healthy fake servers.
pub fn fake_router() -> FakeRouter {
    fake_router_with_check_timeout(PROBE_TIMEOUT)
}

pub fn fake_router_with_check_timeout(check_timeout: Duration) -> FakeRouter {
    DatabaseRouter::new(
        FakeBackend::new(Role::Primary),
        FakeBackend::new(Role::Replica),
        Arc::new(HealthRegistry::new()),
        check_timeout,
    )
}

/// A localhost port with nothing listening on it.
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Database configuration pointing both roles at closed local ports.
pub async fn unreachable_database() -> DatabaseConfig {
    let mut config = RouterConfig::default();
    config.database.primary.host = "127.0.0.1".into();
    config.database.primary.port = unused_port().await;
    config.database.replica.host = "127.0.0.1".into();
    config.database.replica.port = unused_port().await;
    config.database.pool.connect_timeout_ms = 300;
    config.database.pool.statement_timeout_ms = 300;
    config.database
}

/// Start the HTTP server on an ephemeral port.
pub async fn start_server(router: Arc<PgRouter>, shutdown: &Shutdown) -> SocketAddr {
    let config = RouterConfig::default();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(router, &config.shutdown);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    addr
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
