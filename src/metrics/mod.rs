//! Prometheus metrics for the data-access layer.
//!
//! - Operation metrics (latency and failures per repository/manager operation)
//! - Pool metrics (connection gauges, waits, retired connections)

mod helpers;

pub use helpers::{encode_metrics, OperationMetrics, PoolMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, register_int_gauge_vec,
    HistogramVec, IntCounterVec, IntGauge, IntGaugeVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "ara_db";

lazy_static! {
    // ============================================================================
    // Operation Metrics
    // ============================================================================

    /// Round-trip latency per operation
    pub static ref OPERATION_LATENCY: HistogramVec = register_histogram_vec!(
        format!("{}_operation_latency_seconds", METRIC_PREFIX),
        "Database operation latency in seconds",
        &["operation"],
        vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]
    ).unwrap();

    /// Failed operations by error kind
    pub static ref OPERATION_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_operation_errors_total", METRIC_PREFIX),
        "Total failed database operations",
        &["operation", "kind"]
    ).unwrap();

    // ============================================================================
    // Pool Metrics
    // ============================================================================

    /// Connections by state (open, in_use, idle)
    pub static ref POOL_CONNECTIONS: IntGaugeVec = register_int_gauge_vec!(
        format!("{}_pool_connections", METRIC_PREFIX),
        "Pool connections by state",
        &["state"]
    ).unwrap();

    /// Configured connection ceiling
    pub static ref POOL_MAX_OPEN: IntGauge = register_int_gauge!(
        format!("{}_pool_max_open_connections", METRIC_PREFIX),
        "Maximum open connections allowed by the pool"
    ).unwrap();

    /// Acquires that had to wait for a connection
    pub static ref POOL_WAIT_COUNT: IntGauge = register_int_gauge!(
        format!("{}_pool_wait_count", METRIC_PREFIX),
        "Cumulative number of acquires that waited for a connection"
    ).unwrap();

    /// Connections retired at checkout, by reason
    pub static ref POOL_RETIRED: IntGaugeVec = register_int_gauge_vec!(
        format!("{}_pool_retired_connections", METRIC_PREFIX),
        "Cumulative connections closed for exceeding idle time or lifetime",
        &["reason"]
    ).unwrap();
}
