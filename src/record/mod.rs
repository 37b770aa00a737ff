//! Record capability: how a Rust type maps onto one table.
//!
//! A record lists its table, its key and its non-key columns declaratively, and
//! decodes itself with `sqlx::FromRow`. The repository and schema sync are
//! generic over this trait and never inspect the type otherwise.

mod value;

pub use value::Value;
pub(crate) use value::to_arguments;

use chrono::{DateTime, Utc};
use sqlx::any::AnyRow;
use sqlx::FromRow;

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    /// 64-bit integer
    BigInt,
    Double,
    Text,
    VarChar(u32),
    Blob,
}

/// A non-key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    pub unique: bool,
}

impl Column {
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            unique: false,
        }
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// How primary keys are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// Database-generated 64-bit integer, written back after insert.
    AutoIncrement,
    /// Supplied by the caller before insert.
    Assigned(ColumnType),
}

/// Table description consumed by schema sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: &'static str,
    pub primary_key: &'static str,
    pub key_type: KeyType,
    pub columns: &'static [Column],
}

pub trait Record: for<'r> FromRow<'r, AnyRow> + Send + Sync + Unpin + 'static {
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str = "id";
    const KEY_TYPE: KeyType = KeyType::AutoIncrement;
    /// Non-key columns, in the order `values()` returns them.
    const COLUMNS: &'static [Column];

    /// Current key, or `None` when it has not been assigned yet.
    fn primary_key(&self) -> Option<Value>;

    /// Write back a database-generated key.
    fn set_primary_key(&mut self, id: i64);

    /// Column values matching `COLUMNS`.
    fn values(&self) -> Vec<Value>;

    /// Called with the manager's UTC clock before insert (`created = true`) and update.
    fn touch(&mut self, _now: DateTime<Utc>, _created: bool) {}

    fn schema() -> TableSchema {
        TableSchema {
            table: Self::TABLE,
            primary_key: Self::PRIMARY_KEY,
            key_type: Self::KEY_TYPE,
            columns: Self::COLUMNS,
        }
    }
}
