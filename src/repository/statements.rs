//! Single round-trip statements over one connection.
//!
//! Shared by the pooled repository and the transaction handle, so a unit of
//! work sees exactly the same SQL and error classification as a plain call.

use chrono::{DateTime, Utc};
use sqlx::any::AnyArguments;
use sqlx::{Any, AnyConnection};

use crate::database::Dialect;
use crate::error::{DbError, Result};
use crate::record::{to_arguments, KeyType, Record, Value};

fn classify(operation: &'static str) -> impl FnOnce(sqlx::Error) -> DbError {
    move |err| DbError::from_sqlx(operation, err)
}

fn column_names<T: Record>() -> Vec<&'static str> {
    T::COLUMNS.iter().map(|c| c.name).collect()
}

/// INSERT the record, writing a generated key back into it.
pub(crate) async fn insert<T: Record>(
    conn: &mut AnyConnection,
    dialect: Dialect,
    operation: &'static str,
    now: DateTime<Utc>,
    entity: &mut T,
) -> Result<()> {
    entity.touch(now, true);

    let mut columns = column_names::<T>();
    let mut values = entity.values();
    let generated = match entity.primary_key() {
        Some(key) => {
            columns.insert(0, T::PRIMARY_KEY);
            values.insert(0, key);
            false
        }
        None if matches!(T::KEY_TYPE, KeyType::Assigned(_)) => {
            return Err(DbError::invalid_argument(
                operation,
                format!("{} requires an assigned {}", T::TABLE, T::PRIMARY_KEY),
            ));
        }
        None => true,
    };
    let args = to_arguments(values).map_err(classify(operation))?;

    if generated && dialect.returns_generated_key() {
        let sql = dialect.insert(T::TABLE, &columns, Some(T::PRIMARY_KEY));
        let id = sqlx::query_scalar_with::<Any, i64, _>(&sql, args)
            .fetch_one(&mut *conn)
            .await
            .map_err(classify(operation))?;
        entity.set_primary_key(id);
        return Ok(());
    }

    let sql = dialect.insert(T::TABLE, &columns, None);
    let result = sqlx::query_with::<Any, _>(&sql, args)
        .execute(&mut *conn)
        .await
        .map_err(classify(operation))?;

    if generated {
        let id = result.last_insert_id().ok_or_else(|| DbError::Storage {
            operation,
            source: sqlx::Error::Protocol(format!(
                "driver reported no generated key for {}",
                T::TABLE
            )),
        })?;
        entity.set_primary_key(id);
    }
    Ok(())
}

/// UPDATE every column of a keyed record, inserting it when no row has that key.
/// A record without a key is inserted.
pub(crate) async fn save<T: Record>(
    conn: &mut AnyConnection,
    dialect: Dialect,
    operation: &'static str,
    now: DateTime<Utc>,
    entity: &mut T,
) -> Result<()> {
    let Some(key) = entity.primary_key() else {
        return insert(conn, dialect, operation, now, entity).await;
    };
    entity.touch(now, false);

    if !T::COLUMNS.is_empty() {
        let mut values = entity.values();
        values.push(key.clone());
        let args = to_arguments(values).map_err(classify(operation))?;
        let sql = dialect.update(T::TABLE, &column_names::<T>(), T::PRIMARY_KEY);
        let updated = sqlx::query_with::<Any, _>(&sql, args)
            .execute(&mut *conn)
            .await
            .map_err(classify(operation))?
            .rows_affected();
        if updated > 0 {
            return Ok(());
        }
    }

    // mysql reports zero affected rows for an UPDATE that changed nothing
    if exists_by_key::<T>(conn, dialect, operation, key).await? {
        return Ok(());
    }
    insert(conn, dialect, operation, now, entity).await
}

async fn exists_by_key<T: Record>(
    conn: &mut AnyConnection,
    dialect: Dialect,
    operation: &'static str,
    key: Value,
) -> Result<bool> {
    let predicate = format!("{} = {}", dialect.quote(T::PRIMARY_KEY), dialect.placeholder(1));
    let sql = format!("{} WHERE {}", dialect.count(T::TABLE), predicate);
    let args = to_arguments([key]).map_err(classify(operation))?;
    let found = sqlx::query_scalar_with::<Any, i64, _>(&sql, args)
        .fetch_one(&mut *conn)
        .await
        .map_err(classify(operation))?;
    Ok(found > 0)
}

pub(crate) async fn fetch_by_id<T: Record>(
    conn: &mut AnyConnection,
    dialect: Dialect,
    operation: &'static str,
    id: Value,
) -> Result<T> {
    let sql = dialect.select_by_key(T::TABLE, T::PRIMARY_KEY);
    let args = to_arguments([id]).map_err(classify(operation))?;
    sqlx::query_as_with::<Any, T, _>(&sql, args)
        .fetch_one(&mut *conn)
        .await
        .map_err(classify(operation))
}

pub(crate) async fn fetch_all<T: Record>(
    conn: &mut AnyConnection,
    dialect: Dialect,
    operation: &'static str,
) -> Result<Vec<T>> {
    let sql = dialect.select_all(T::TABLE);
    sqlx::query_as_with::<Any, T, _>(&sql, AnyArguments::default())
        .fetch_all(&mut *conn)
        .await
        .map_err(classify(operation))
}

pub(crate) async fn fetch_where<T: Record>(
    conn: &mut AnyConnection,
    dialect: Dialect,
    operation: &'static str,
    predicate: &str,
    args: Vec<Value>,
) -> Result<Vec<T>> {
    let sql = dialect.select_where(T::TABLE, predicate);
    let args = to_arguments(args).map_err(classify(operation))?;
    sqlx::query_as_with::<Any, T, _>(&sql, args)
        .fetch_all(&mut *conn)
        .await
        .map_err(classify(operation))
}

pub(crate) async fn fetch_first_where<T: Record>(
    conn: &mut AnyConnection,
    dialect: Dialect,
    operation: &'static str,
    predicate: &str,
    args: Vec<Value>,
) -> Result<T> {
    let sql = dialect.select_first_where(T::TABLE, predicate);
    let args = to_arguments(args).map_err(classify(operation))?;
    sqlx::query_as_with::<Any, T, _>(&sql, args)
        .fetch_one(&mut *conn)
        .await
        .map_err(classify(operation))
}

pub(crate) async fn fetch_page<T: Record>(
    conn: &mut AnyConnection,
    dialect: Dialect,
    operation: &'static str,
    limit: i64,
    offset: i64,
) -> Result<Vec<T>> {
    let sql = dialect.select_page(T::TABLE, T::PRIMARY_KEY);
    let args = to_arguments([Value::from(limit), Value::from(offset)])
        .map_err(classify(operation))?;
    sqlx::query_as_with::<Any, T, _>(&sql, args)
        .fetch_all(&mut *conn)
        .await
        .map_err(classify(operation))
}

pub(crate) async fn count<T: Record>(
    conn: &mut AnyConnection,
    dialect: Dialect,
    operation: &'static str,
) -> Result<i64> {
    let sql = dialect.count(T::TABLE);
    sqlx::query_scalar_with::<Any, i64, _>(&sql, AnyArguments::default())
        .fetch_one(&mut *conn)
        .await
        .map_err(classify(operation))
}

/// DELETE by key. Zero affected rows is not an error.
pub(crate) async fn delete_by_key<T: Record>(
    conn: &mut AnyConnection,
    dialect: Dialect,
    operation: &'static str,
    id: Value,
) -> Result<u64> {
    let sql = dialect.delete_by_key(T::TABLE, T::PRIMARY_KEY);
    let args = to_arguments([id]).map_err(classify(operation))?;
    let result = sqlx::query_with::<Any, _>(&sql, args)
        .execute(&mut *conn)
        .await
        .map_err(classify(operation))?;
    Ok(result.rows_affected())
}

/// Run caller SQL verbatim and report affected rows.
pub(crate) async fn execute(
    conn: &mut AnyConnection,
    operation: &'static str,
    sql: &str,
    args: Vec<Value>,
) -> Result<u64> {
    let args = to_arguments(args).map_err(classify(operation))?;
    let result = sqlx::query_with::<Any, _>(sql, args)
        .execute(&mut *conn)
        .await
        .map_err(classify(operation))?;
    Ok(result.rows_affected())
}
