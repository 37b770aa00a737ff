//! Data-access layer over sqlx.
//!
//! A pooled connection manager ([`Database`]) plus a generic repository
//! ([`Repository`]) offering CRUD, predicate queries, pagination, counting and
//! transactions for any type implementing [`Record`].

pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod metrics;
pub mod record;
pub mod repository;
pub mod telemetry;

pub use config::{DatabaseConfig, Driver, LogLevel};
pub use context::Context;
pub use database::{Database, PoolStats, Tx};
pub use error::{DbError, ErrorKind, Result};
pub use record::{Column, ColumnType, KeyType, Record, TableSchema, Value};
pub use repository::{Page, Repository};

/// Return type of transaction units of work.
pub use futures::future::BoxFuture;
