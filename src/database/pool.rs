//! Pool construction over the sqlx `Any` driver.

use std::str::FromStr;
use std::sync::{Arc, Once};
use std::time::Duration;

use sqlx::any::{AnyConnectOptions, AnyPoolOptions};
use sqlx::pool::PoolConnectionMetadata;
use sqlx::{AnyPool, ConnectOptions};

use super::stats::PoolCounters;
use crate::config::DatabaseConfig;
use crate::error::{DbError, Result};

/// Slow statement threshold used when `log_level` is `warn` or `info`.
const SLOW_STATEMENT_THRESHOLD: Duration = Duration::from_millis(200);

static INSTALL_DRIVERS: Once = Once::new();

/// Open a pool for an already defaulted and validated config.
pub(crate) async fn open_pool(
    config: &DatabaseConfig,
    counters: Arc<PoolCounters>,
) -> Result<AnyPool> {
    INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);

    let connect_options = AnyConnectOptions::from_str(&config.url)
        .map_err(connection_error)?
        .log_statements(config.log_level.statement_level())
        .log_slow_statements(
            config.log_level.slow_statement_level(),
            SLOW_STATEMENT_THRESHOLD,
        );

    let max_lifetime = config.conn_max_lifetime();
    let max_idle_time = config.conn_max_idle_time();

    let pool = AnyPoolOptions::new()
        .max_connections(config.max_open_conns)
        .acquire_timeout(config.acquire_timeout())
        .max_lifetime(max_lifetime)
        .idle_timeout(max_idle_time)
        .before_acquire(move |_conn, meta: PoolConnectionMetadata| {
            let keep = retain_connection(
                &counters,
                meta.age,
                meta.idle_for,
                max_lifetime,
                max_idle_time,
            );
            Box::pin(async move { Ok(keep) })
        })
        .connect_with(connect_options)
        .await
        .map_err(connection_error)?;

    tracing::info!(
        driver = %config.driver,
        url = %mask_url(&config.url),
        max_open_conns = config.max_open_conns,
        max_idle_conns = config.max_idle_conns,
        conn_max_lifetime_secs = config.conn_max_lifetime_seconds,
        conn_max_idle_time_secs = config.conn_max_idle_time_seconds,
        "Database connection pool created"
    );

    Ok(pool)
}

/// Every failure while establishing the pool is a connection failure,
/// including a connection string the driver cannot parse.
fn connection_error(source: sqlx::Error) -> DbError {
    DbError::Connection {
        operation: "connect",
        source,
    }
}

/// Checkout-time guard: retire idle connections that outlived their limits.
fn retain_connection(
    counters: &PoolCounters,
    age: Duration,
    idle_for: Duration,
    max_lifetime: Duration,
    max_idle_time: Duration,
) -> bool {
    if age >= max_lifetime {
        counters.record_lifetime_closed();
        return false;
    }
    if idle_for >= max_idle_time {
        counters.record_idle_closed();
        return false;
    }
    true
}

/// Mask the password in a connection URL for safe logging.
///
/// The userinfo ends at the last `@` before the path, query or fragment, so
/// passwords containing `@` are masked whole.
pub fn mask_url(url: &str) -> String {
    let userinfo_start = url.find("://").map(|p| p + 3).unwrap_or(0);
    let rest = &url[userinfo_start..];
    let authority = rest
        .find(|c| matches!(c, '/' | '?' | '#'))
        .map_or(rest, |end| &rest[..end]);
    let Some(at_pos) = authority.rfind('@') else {
        return url.to_string();
    };
    match authority[..at_pos].find(':') {
        Some(colon_pos) => format!(
            "{}***{}",
            &url[..userinfo_start + colon_pos + 1],
            &url[userinfo_start + at_pos..]
        ),
        None => url.to_string(),
    }
}
