//! Generic repository over any [`Record`] type.
//!
//! Each call checks one connection out of the shared pool, issues a single
//! statement (two for `paginate`) and races it against the caller's
//! [`Context`] and the manager's bound one.

pub(crate) mod statements;

use std::marker::PhantomData;

use futures::future::BoxFuture;
use serde::Serialize;

use crate::context::Context;
use crate::database::{Database, Tx};
use crate::error::{DbError, Result};
use crate::record::{Record, Value};

/// One page of records plus the table-wide total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

pub struct Repository<T> {
    db: Database,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("record", &std::any::type_name::<T>())
            .field("db", &self.db)
            .finish()
    }
}

impl<T: Record> Repository<T> {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            _record: PhantomData,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Insert `entity` and write its generated key back.
    pub async fn create(&self, ctx: &Context, entity: &mut T) -> Result<()> {
        const OP: &str = "create";
        self.db
            .instrument(OP, ctx, async {
                let mut conn = self.db.acquire(OP).await?;
                statements::insert(&mut conn, self.db.dialect(), OP, self.db.now(), entity).await
            })
            .await?;
        tracing::debug!(table = T::TABLE, id = ?entity.primary_key(), "Record created");
        Ok(())
    }

    pub async fn find_by_id(&self, ctx: &Context, id: impl Into<Value>) -> Result<T> {
        const OP: &str = "find_by_id";
        let id = id.into();
        self.db
            .instrument(OP, ctx, async {
                let mut conn = self.db.acquire(OP).await?;
                statements::fetch_by_id(&mut conn, self.db.dialect(), OP, id).await
            })
            .await
    }

    pub async fn find_all(&self, ctx: &Context) -> Result<Vec<T>> {
        const OP: &str = "find_all";
        self.db
            .instrument(OP, ctx, async {
                let mut conn = self.db.acquire(OP).await?;
                statements::fetch_all(&mut conn, self.db.dialect(), OP).await
            })
            .await
    }

    /// Save every column of `entity`.
    ///
    /// A keyed record is updated in place, or inserted with its key when no
    /// row has it yet. A record without a key is created.
    pub async fn update(&self, ctx: &Context, entity: &mut T) -> Result<()> {
        const OP: &str = "update";
        self.db
            .instrument(OP, ctx, async {
                let mut conn = self.db.acquire(OP).await?;
                statements::save(&mut conn, self.db.dialect(), OP, self.db.now(), entity).await
            })
            .await
    }

    /// Delete the row keyed by `entity`. A missing row is not an error.
    pub async fn delete(&self, ctx: &Context, entity: &T) -> Result<()> {
        const OP: &str = "delete";
        let Some(id) = entity.primary_key() else {
            return Err(DbError::invalid_argument(
                OP,
                format!("{} record has no {}", T::TABLE, T::PRIMARY_KEY),
            ));
        };
        self.remove(OP, ctx, id).await
    }

    pub async fn delete_by_id(&self, ctx: &Context, id: impl Into<Value>) -> Result<()> {
        self.remove("delete_by_id", ctx, id.into()).await
    }

    async fn remove(&self, operation: &'static str, ctx: &Context, id: Value) -> Result<()> {
        let deleted = self
            .db
            .instrument(operation, ctx, async {
                let mut conn = self.db.acquire(operation).await?;
                statements::delete_by_key::<T>(&mut conn, self.db.dialect(), operation, id).await
            })
            .await?;
        tracing::debug!(table = T::TABLE, deleted, "Records deleted");
        Ok(())
    }

    pub async fn count(&self, ctx: &Context) -> Result<i64> {
        const OP: &str = "count";
        self.db
            .instrument(OP, ctx, async {
                let mut conn = self.db.acquire(OP).await?;
                statements::count::<T>(&mut conn, self.db.dialect(), OP).await
            })
            .await
    }

    /// Records matching `predicate`, a backend-native boolean expression using
    /// the driver's own placeholder syntax (`?` or `$n`) bound to `args` in order.
    pub async fn find_where(
        &self,
        ctx: &Context,
        predicate: &str,
        args: Vec<Value>,
    ) -> Result<Vec<T>> {
        const OP: &str = "find_where";
        self.db
            .instrument(OP, ctx, async {
                let mut conn = self.db.acquire(OP).await?;
                statements::fetch_where(&mut conn, self.db.dialect(), OP, predicate, args).await
            })
            .await
    }

    /// First record matching `predicate`, or `NotFound`.
    pub async fn first_where(&self, ctx: &Context, predicate: &str, args: Vec<Value>) -> Result<T> {
        const OP: &str = "first_where";
        self.db
            .instrument(OP, ctx, async {
                let mut conn = self.db.acquire(OP).await?;
                statements::fetch_first_where(&mut conn, self.db.dialect(), OP, predicate, args)
                    .await
            })
            .await
    }

    /// Page `page` (1-based) of `page_size` records ordered by key, with the
    /// total row count. Both arguments must be at least 1.
    pub async fn paginate(&self, ctx: &Context, page: i64, page_size: i64) -> Result<Page<T>> {
        const OP: &str = "paginate";
        if page < 1 || page_size < 1 {
            return Err(DbError::invalid_argument(
                OP,
                format!("page ({}) and page_size ({}) must be at least 1", page, page_size),
            ));
        }
        let offset = (page - 1)
            .checked_mul(page_size)
            .ok_or_else(|| DbError::invalid_argument(OP, "page offset overflows"))?;

        self.db
            .instrument(OP, ctx, async {
                let mut conn = self.db.acquire(OP).await?;
                let dialect = self.db.dialect();
                let total = statements::count::<T>(&mut conn, dialect, OP).await?;
                let items =
                    statements::fetch_page(&mut conn, dialect, OP, page_size, offset).await?;
                Ok(Page {
                    items,
                    total,
                    page,
                    page_size,
                })
            })
            .await
    }

    /// Run `work` in one transaction bounded by `ctx`. See [`Database::transaction`].
    pub async fn transaction<R, F>(&self, ctx: &Context, work: F) -> Result<R>
    where
        F: for<'t> FnOnce(&'t mut Tx) -> BoxFuture<'t, Result<R>> + Send,
    {
        self.db.run_transaction(ctx, work).await
    }
}
