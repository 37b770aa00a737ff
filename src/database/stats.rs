//! Connection pool counters

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Cumulative counters sqlx does not track for us.
#[derive(Debug, Default)]
pub struct PoolCounters {
    wait_count: AtomicU64,
    wait_duration_us: AtomicU64,
    max_idle_closed: AtomicU64,
    max_lifetime_closed: AtomicU64,
}

impl PoolCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an acquire that had to wait for a connection to free up.
    pub fn record_wait(&self, waited: Duration) {
        self.wait_count.fetch_add(1, Ordering::AcqRel);
        self.wait_duration_us
            .fetch_add(waited.as_micros() as u64, Ordering::AcqRel);
    }

    pub fn record_idle_closed(&self) {
        self.max_idle_closed.fetch_add(1, Ordering::AcqRel);
    }

    pub fn record_lifetime_closed(&self) {
        self.max_lifetime_closed.fetch_add(1, Ordering::AcqRel);
    }

    pub fn wait_count(&self) -> u64 {
        self.wait_count.load(Ordering::Acquire)
    }

    pub fn wait_duration(&self) -> Duration {
        Duration::from_micros(self.wait_duration_us.load(Ordering::Acquire))
    }

    pub fn max_idle_closed(&self) -> u64 {
        self.max_idle_closed.load(Ordering::Acquire)
    }

    pub fn max_lifetime_closed(&self) -> u64 {
        self.max_lifetime_closed.load(Ordering::Acquire)
    }
}

/// Point-in-time pool statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolStats {
    pub max_open_connections: u32,
    pub open_connections: u32,
    pub in_use: u32,
    pub idle: u32,
    pub wait_count: u64,
    pub wait_duration: Duration,
    pub max_idle_closed: u64,
    pub max_lifetime_closed: u64,
}

impl PoolStats {
    /// Named counters, with the wait duration rendered as text.
    pub fn as_map(&self) -> BTreeMap<&'static str, serde_json::Value> {
        BTreeMap::from([
            ("max_open_connections", self.max_open_connections.into()),
            ("open_connections", self.open_connections.into()),
            ("in_use", self.in_use.into()),
            ("idle", self.idle.into()),
            ("wait_count", self.wait_count.into()),
            (
                "wait_duration",
                format!("{:?}", self.wait_duration).into(),
            ),
            ("max_idle_closed", self.max_idle_closed.into()),
            ("max_lifetime_closed", self.max_lifetime_closed.into()),
        ])
    }
}
