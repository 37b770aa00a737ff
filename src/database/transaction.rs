use sqlx::{Any, AnyConnection, Transaction};

use super::Database;
use crate::error::Result;
use crate::record::{Record, Value};
use crate::repository::statements;

/// Transaction-scoped handle passed to a unit of work.
///
/// Everything issued through it commits or rolls back together. The handle
/// does not race its own calls against a context; the enclosing
/// transaction does that as a whole.
pub struct Tx {
    db: Database,
    inner: Transaction<'static, Any>,
}

impl Tx {
    pub(crate) fn new(db: Database, inner: Transaction<'static, Any>) -> Self {
        Self { db, inner }
    }

    pub(crate) fn into_inner(self) -> Transaction<'static, Any> {
        self.inner
    }

    /// Raw connection for statements the handle does not cover.
    pub fn connection(&mut self) -> &mut AnyConnection {
        &mut self.inner
    }

    /// Run caller SQL inside the transaction, returning affected rows.
    pub async fn execute(&mut self, sql: &str, args: Vec<Value>) -> Result<u64> {
        statements::execute(&mut self.inner, "tx.execute", sql, args).await
    }

    pub async fn create<T: Record>(&mut self, entity: &mut T) -> Result<()> {
        let (dialect, now) = (self.db.dialect(), self.db.now());
        statements::insert(&mut self.inner, dialect, "tx.create", now, entity).await
    }

    pub async fn update<T: Record>(&mut self, entity: &mut T) -> Result<()> {
        let (dialect, now) = (self.db.dialect(), self.db.now());
        statements::save(&mut self.inner, dialect, "tx.update", now, entity).await
    }

    pub async fn find_by_id<T: Record>(&mut self, id: impl Into<Value>) -> Result<T> {
        let dialect = self.db.dialect();
        statements::fetch_by_id(&mut self.inner, dialect, "tx.find_by_id", id.into()).await
    }

    pub async fn find_where<T: Record>(
        &mut self,
        predicate: &str,
        args: Vec<Value>,
    ) -> Result<Vec<T>> {
        let dialect = self.db.dialect();
        statements::fetch_where(&mut self.inner, dialect, "tx.find_where", predicate, args).await
    }

    pub async fn delete_by_id<T: Record>(&mut self, id: impl Into<Value>) -> Result<()> {
        let dialect = self.db.dialect();
        statements::delete_by_key::<T>(&mut self.inner, dialect, "tx.delete_by_id", id.into())
            .await
            .map(|_| ())
    }

    pub async fn count<T: Record>(&mut self) -> Result<i64> {
        let dialect = self.db.dialect();
        statements::count::<T>(&mut self.inner, dialect, "tx.count").await
    }
}
