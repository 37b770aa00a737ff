//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    OPERATION_ERRORS_TOTAL, OPERATION_LATENCY, POOL_CONNECTIONS, POOL_MAX_OPEN, POOL_RETIRED,
    POOL_WAIT_COUNT,
};
use crate::database::PoolStats;
use crate::error::ErrorKind;

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording operation metrics
pub struct OperationMetrics;

impl OperationMetrics {
    pub fn record_latency(operation: &str, latency_secs: f64) {
        OPERATION_LATENCY
            .with_label_values(&[operation])
            .observe(latency_secs);
    }

    pub fn record_error(operation: &str, kind: ErrorKind) {
        OPERATION_ERRORS_TOTAL
            .with_label_values(&[operation, kind.as_str()])
            .inc();
    }
}

/// Helper struct for publishing pool snapshots
pub struct PoolMetrics;

impl PoolMetrics {
    pub fn observe(stats: &PoolStats) {
        POOL_MAX_OPEN.set(stats.max_open_connections as i64);
        POOL_CONNECTIONS
            .with_label_values(&["open"])
            .set(stats.open_connections as i64);
        POOL_CONNECTIONS
            .with_label_values(&["in_use"])
            .set(stats.in_use as i64);
        POOL_CONNECTIONS
            .with_label_values(&["idle"])
            .set(stats.idle as i64);
        POOL_WAIT_COUNT.set(stats.wait_count as i64);
        POOL_RETIRED
            .with_label_values(&["idle_time"])
            .set(stats.max_idle_closed as i64);
        POOL_RETIRED
            .with_label_values(&["lifetime"])
            .set(stats.max_lifetime_closed as i64);
    }
}
