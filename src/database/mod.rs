//! Connection manager.
//!
//! A [`Database`] owns one sqlx pool for the lifetime of the process. Clones
//! are cheap and share the pool; [`Database::with_context`] produces a clone
//! bound to a different parent [`Context`].

mod dialect;
mod pool;
mod stats;
mod transaction;

pub use dialect::Dialect;
pub use pool::mask_url;
pub use stats::{PoolCounters, PoolStats};
pub use transaction::Tx;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyPool, Connection, Transaction};

use crate::config::{DatabaseConfig, Driver};
use crate::context::Context;
use crate::error::{DbError, Result};
use crate::metrics::{OperationMetrics, PoolMetrics};
use crate::record::TableSchema;

struct Shared {
    pool: AnyPool,
    config: DatabaseConfig,
    dialect: Dialect,
    counters: Arc<PoolCounters>,
}

#[derive(Clone)]
pub struct Database {
    inner: Arc<Shared>,
    ctx: Context,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("driver", &self.inner.config.driver)
            .field("url", &mask_url(&self.inner.config.url))
            .field("closed", &self.inner.pool.is_closed())
            .finish()
    }
}

impl Database {
    /// Open the pool described by `config`.
    ///
    /// Zero pool limits are replaced with defaults before validation. The
    /// first connection is established eagerly, so an unreachable server or
    /// rejected credentials fail here rather than on first use.
    pub async fn connect(config: Option<DatabaseConfig>) -> Result<Self> {
        let config = config
            .ok_or_else(|| DbError::invalid_configuration("database config is required"))?
            .with_defaults();
        config.validate()?;

        let counters = Arc::new(PoolCounters::new());
        let pool = pool::open_pool(&config, Arc::clone(&counters)).await?;

        Ok(Self {
            inner: Arc::new(Shared {
                pool,
                dialect: Dialect::from(config.driver),
                config,
                counters,
            }),
            ctx: Context::background(),
        })
    }

    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        Self::connect(Some(config)).await
    }

    /// Close the pool. Every clone observes the closure.
    pub async fn close(&self) -> Result<()> {
        self.ensure_open("close")?;
        self.inner.pool.close().await;
        tracing::info!(driver = %self.inner.config.driver, "Database connection pool closed");
        Ok(())
    }

    pub async fn ping(&self, ctx: &Context) -> Result<()> {
        const OP: &str = "ping";
        self.instrument(OP, ctx, async {
            let mut conn = self.acquire(OP).await?;
            conn.ping().await.map_err(|source| DbError::Connection {
                operation: OP,
                source,
            })
        })
        .await
    }

    /// Ping, then confirm the pool still holds at least one open connection.
    pub async fn health_check(&self, ctx: &Context) -> Result<()> {
        self.ping(ctx).await?;
        if self.inner.pool.size() == 0 {
            return Err(DbError::DegradedState {
                operation: "health_check",
                message: "no open connections".to_string(),
            });
        }
        Ok(())
    }

    /// Snapshot the pool counters and publish them as gauges.
    pub fn stats(&self) -> Result<PoolStats> {
        self.ensure_open("stats")?;

        let pool = &self.inner.pool;
        let counters = &self.inner.counters;
        let open = pool.size();
        let idle = (pool.num_idle() as u32).min(open);
        let stats = PoolStats {
            max_open_connections: self.inner.config.max_open_conns,
            open_connections: open,
            in_use: open - idle,
            idle,
            wait_count: counters.wait_count(),
            wait_duration: counters.wait_duration(),
            max_idle_closed: counters.max_idle_closed(),
            max_lifetime_closed: counters.max_lifetime_closed(),
        };
        PoolMetrics::observe(&stats);
        Ok(stats)
    }

    /// Run `work` in one transaction under the bound context.
    ///
    /// `Ok` commits. `Err` rolls back and returns the unit of work's error; if
    /// the rollback itself fails the result is [`DbError::RollbackFailed`].
    /// A transaction abandoned by cancellation is rolled back by the driver.
    pub async fn transaction<R, F>(&self, work: F) -> Result<R>
    where
        F: for<'t> FnOnce(&'t mut Tx) -> BoxFuture<'t, Result<R>> + Send,
    {
        self.run_transaction(&Context::background(), work).await
    }

    /// A view of the same pool whose operations are bounded by `ctx`.
    pub fn with_context(&self, ctx: Context) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            ctx,
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Create each table that does not exist yet. Existing tables are left alone.
    ///
    /// Every schema is rendered before the first statement runs, so a schema
    /// the driver cannot hold leaves the database untouched.
    pub async fn auto_migrate(&self, schemas: &[TableSchema]) -> Result<()> {
        const OP: &str = "auto_migrate";
        let ddl = schemas
            .iter()
            .map(|schema| self.inner.dialect.create_table(schema))
            .collect::<Result<Vec<_>>>()?;

        self.instrument(OP, &Context::background(), async {
            let mut conn = self.acquire(OP).await?;
            for (schema, sql) in schemas.iter().zip(&ddl) {
                sqlx::query(sql)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| DbError::from_sqlx(OP, e))?;
                tracing::info!(table = schema.table, "Table synchronized");
            }
            Ok(())
        })
        .await
    }

    /// Clock used for record timestamps.
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    pub fn driver(&self) -> Driver {
        self.inner.config.driver
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    pub fn is_closed(&self) -> bool {
        self.inner.pool.is_closed()
    }

    /// The underlying pool, for queries outside the repository surface.
    pub fn pool(&self) -> &AnyPool {
        &self.inner.pool
    }

    pub(crate) fn dialect(&self) -> Dialect {
        self.inner.dialect
    }

    fn ensure_open(&self, operation: &'static str) -> Result<()> {
        if self.inner.pool.is_closed() {
            return Err(DbError::NotConnected { operation });
        }
        Ok(())
    }

    /// Every connection is checked out and the pool is at its ceiling.
    fn is_saturated(&self) -> bool {
        let pool = &self.inner.pool;
        pool.num_idle() == 0 && pool.size() >= self.inner.config.max_open_conns
    }

    pub(crate) async fn acquire(&self, operation: &'static str) -> Result<PoolConnection<Any>> {
        self.ensure_open(operation)?;
        let saturated = self.is_saturated();
        let started = Instant::now();

        let conn = self
            .inner
            .pool
            .acquire()
            .await
            .map_err(|e| DbError::from_sqlx(operation, e))?;

        if saturated {
            self.inner.counters.record_wait(started.elapsed());
        }
        Ok(conn)
    }

    async fn begin(&self, operation: &'static str) -> Result<Transaction<'static, Any>> {
        self.ensure_open(operation)?;
        let saturated = self.is_saturated();
        let started = Instant::now();

        let tx = self
            .inner
            .pool
            .begin()
            .await
            .map_err(|e| DbError::from_sqlx(operation, e))?;

        if saturated {
            self.inner.counters.record_wait(started.elapsed());
        }
        Ok(tx)
    }

    pub(crate) async fn run_transaction<R, F>(&self, ctx: &Context, work: F) -> Result<R>
    where
        F: for<'t> FnOnce(&'t mut Tx) -> BoxFuture<'t, Result<R>> + Send,
    {
        const OP: &str = "transaction";
        self.instrument(OP, ctx, async move {
            let mut tx = Tx::new(self.clone(), self.begin(OP).await?);

            match work(&mut tx).await {
                Ok(value) => {
                    tx.into_inner()
                        .commit()
                        .await
                        .map_err(|e| DbError::from_sqlx(OP, e))?;
                    Ok(value)
                }
                Err(cause) => match tx.into_inner().rollback().await {
                    Ok(()) => {
                        tracing::debug!(error = %cause, "Transaction rolled back");
                        Err(cause)
                    }
                    Err(source) => Err(DbError::RollbackFailed {
                        operation: OP,
                        cause: Box::new(cause),
                        source,
                    }),
                },
            }
        })
        .await
    }

    /// Run one operation under the bound context and the caller's, recording
    /// latency and failures.
    pub(crate) async fn instrument<T, F>(
        &self,
        operation: &'static str,
        ctx: &Context,
        fut: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let result = self.ctx.run(operation, ctx.run(operation, fut)).await;
        OperationMetrics::record_latency(operation, started.elapsed().as_secs_f64());

        if let Err(e) = &result {
            OperationMetrics::record_error(operation, e.kind());
            if e.is_not_found() {
                tracing::debug!(operation, "Record not found");
            } else {
                tracing::warn!(operation, error = %e, "Database operation failed");
            }
        }
        result
    }
}
