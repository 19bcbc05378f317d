//! PostgreSQL backend built on a lazily created sqlx pool.

use std::sync::OnceLock;

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{FromRow, Postgres};

use crate::pool::backend::{BackendError, RoleBackend};
use crate::pool::descriptor::PoolDescriptor;
use crate::routing::{QueryIntent, QueryParam};

const APPLICATION_NAME: &str = "replica-router";

/// Rows and row count returned by a PostgreSQL statement.
pub struct QueryOutput {
    pub rows: Vec<PgRow>,
    pub rows_affected: u64,
}

impl QueryOutput {
    /// Decode every row into `T`.
    pub fn decode<T>(&self) -> Result<Vec<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow>,
    {
        self.rows.iter().map(|row| T::from_row(row)).collect()
    }
}

/// Pool for one role. The underlying `PgPool` is created on first use.
pub struct PgBackend {
    descriptor: PoolDescriptor,
    pool: OnceLock<PgPool>,
}

impl PgBackend {
    pub fn new(descriptor: PoolDescriptor) -> Self {
        Self {
            descriptor,
            pool: OnceLock::new(),
        }
    }

    /// Whether the pool has been created yet.
    pub fn is_initialized(&self) -> bool {
        self.pool.get().is_some()
    }

    fn pool(&self) -> &PgPool {
        self.pool.get_or_init(|| {
            let d = &self.descriptor;
            tracing::info!(
                role = %d.role,
                url = %d.redacted_url(),
                max_connections = d.max_connections,
                "Creating connection pool"
            );

            let options = PgConnectOptions::new()
                .host(&d.host)
                .port(d.port)
                .database(&d.database)
                .username(&d.user)
                .password(&d.password)
                .application_name(APPLICATION_NAME)
                .options([("statement_timeout", d.statement_timeout.as_millis().to_string())]);

            PgPoolOptions::new()
                .max_connections(d.max_connections)
                .min_connections(0)
                .acquire_timeout(d.connect_timeout)
                .idle_timeout(Some(d.idle_timeout))
                .connect_lazy_with(options)
        })
    }

    fn classify(&self, err: sqlx::Error) -> BackendError {
        match &err {
            sqlx::Error::Database(db) => {
                let code = db.code().map(|c| c.into_owned());
                match code.as_deref() {
                    // query_canceled, raised by the server-side statement_timeout
                    Some("57014") => BackendError::Timeout(self.descriptor.statement_timeout),
                    Some(state) if is_connectivity_state(state) => {
                        BackendError::Connectivity(db.message().to_string())
                    }
                    _ => BackendError::Query {
                        code,
                        message: db.message().to_string(),
                    },
                }
            }
            sqlx::Error::PoolTimedOut => BackendError::Timeout(self.descriptor.connect_timeout),
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => BackendError::Connectivity(err.to_string()),
            _ => BackendError::Query {
                code: None,
                message: err.to_string(),
            },
        }
    }
}

/// SQLSTATEs that mean the server, not the statement, is the problem.
///
/// Class 28 and 3D000 are only raised while a connection is being opened:
/// a role with bad credentials or a missing database cannot serve anything.
fn is_connectivity_state(state: &str) -> bool {
    // class 08: connection exception, class 28: invalid authorization
    state.starts_with("08")
        || state.starts_with("28")
        // invalid_catalog_name, admin_shutdown, crash_shutdown, cannot_connect_now,
        // too_many_connections
        || matches!(state, "3D000" | "57P01" | "57P02" | "57P03" | "53300")
}

fn bind_param<'q>(
    query: Query<'q, Postgres, PgArguments>,
    param: &'q QueryParam,
) -> Query<'q, Postgres, PgArguments> {
    match param {
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::Text(v) => query.bind(v.as_deref()),
        QueryParam::Json(v) => query.bind(v.as_ref().map(Json)),
    }
}

#[async_trait]
impl RoleBackend for PgBackend {
    type Output = QueryOutput;

    fn descriptor(&self) -> &PoolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, intent: &QueryIntent) -> Result<QueryOutput, BackendError> {
        let query = intent
            .params
            .iter()
            .fold(sqlx::query(&intent.sql), bind_param);

        if intent.fetch_rows {
            let rows = query
                .fetch_all(self.pool())
                .await
                .map_err(|e| self.classify(e))?;
            Ok(QueryOutput {
                rows_affected: rows.len() as u64,
                rows,
            })
        } else {
            let result = query
                .execute(self.pool())
                .await
                .map_err(|e| self.classify(e))?;
            Ok(QueryOutput {
                rows: Vec::new(),
                rows_affected: result.rows_affected(),
            })
        }
    }

    async fn ping(&self) -> Result<(), BackendError> {
        sqlx::query("SELECT 1")
            .execute(self.pool())
            .await
            .map(|_| ())
            .map_err(|e| self.classify(e))
    }

    async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            tracing::info!(role = %self.descriptor.role, "Closing connection pool");
            pool.close().await;
        }
    }
}
