//! Driver-specific SQL text.
//!
//! Only statements the repository generates go through here. Caller
//! predicates are spliced in verbatim and keep their own placeholder syntax.

use crate::config::Driver;
use crate::error::{DbError, Result};
use crate::record::{Column, ColumnType, KeyType, TableSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    driver: Driver,
}

impl From<Driver> for Dialect {
    fn from(driver: Driver) -> Self {
        Self { driver }
    }
}

impl Dialect {
    pub fn driver(&self) -> Driver {
        self.driver
    }

    /// Positional placeholder for the 1-based parameter `n`.
    pub fn placeholder(&self, n: usize) -> String {
        match self.driver {
            Driver::Postgres => format!("${}", n),
            Driver::MySql | Driver::Sqlite => "?".to_string(),
        }
    }

    pub fn quote(&self, ident: &str) -> String {
        match self.driver {
            Driver::MySql => format!("`{}`", ident.replace('`', "``")),
            Driver::Postgres | Driver::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Postgres and sqlite hand back generated keys through `RETURNING`. The
    /// sqlite adapter under `Any` never reports a last insert id, so only mysql
    /// relies on it.
    pub fn returns_generated_key(&self) -> bool {
        matches!(self.driver, Driver::Postgres | Driver::Sqlite)
    }

    pub fn insert(&self, table: &str, columns: &[&str], returning: Option<&str>) -> String {
        let cols = columns
            .iter()
            .map(|c| self.quote(c))
            .collect::<Vec<_>>()
            .join(", ");
        let params = (1..=columns.len())
            .map(|n| self.placeholder(n))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = if columns.is_empty() {
            match self.driver {
                Driver::MySql => format!("INSERT INTO {} () VALUES ()", self.quote(table)),
                _ => format!("INSERT INTO {} DEFAULT VALUES", self.quote(table)),
            }
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.quote(table),
                cols,
                params
            )
        };
        if let Some(key) = returning {
            sql.push_str(&format!(" RETURNING {}", self.quote(key)));
        }
        sql
    }

    pub fn update(&self, table: &str, columns: &[&str], key: &str) -> String {
        let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = {}", self.quote(c), self.placeholder(i + 1)))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {} SET {} WHERE {} = {}",
            self.quote(table),
            assignments,
            self.quote(key),
            self.placeholder(columns.len() + 1)
        )
    }

    pub fn delete_by_key(&self, table: &str, key: &str) -> String {
        format!(
            "DELETE FROM {} WHERE {} = {}",
            self.quote(table),
            self.quote(key),
            self.placeholder(1)
        )
    }

    pub fn select_all(&self, table: &str) -> String {
        format!("SELECT * FROM {}", self.quote(table))
    }

    pub fn select_by_key(&self, table: &str, key: &str) -> String {
        format!(
            "SELECT * FROM {} WHERE {} = {}",
            self.quote(table),
            self.quote(key),
            self.placeholder(1)
        )
    }

    pub fn select_where(&self, table: &str, predicate: &str) -> String {
        format!("SELECT * FROM {} WHERE {}", self.quote(table), predicate)
    }

    pub fn select_first_where(&self, table: &str, predicate: &str) -> String {
        format!("{} LIMIT 1", self.select_where(table, predicate))
    }

    /// One page ordered by key so consecutive pages never overlap.
    pub fn select_page(&self, table: &str, key: &str) -> String {
        format!(
            "SELECT * FROM {} ORDER BY {} LIMIT {} OFFSET {}",
            self.quote(table),
            self.quote(key),
            self.placeholder(1),
            self.placeholder(2)
        )
    }

    pub fn count(&self, table: &str) -> String {
        format!("SELECT COUNT(*) FROM {}", self.quote(table))
    }

    /// DDL for `schema`.
    ///
    /// Fails for `Boolean` columns on sqlite: the `Any` adapter cannot decode
    /// sqlite's boolean type, so such a table could be written but never read.
    /// Store flags there as `BigInt` 0/1 instead.
    pub fn create_table(&self, schema: &TableSchema) -> Result<String> {
        self.check_supported(schema)?;
        let mut defs = vec![self.key_definition(schema.primary_key, schema.key_type)];
        defs.extend(schema.columns.iter().map(|c| self.column_definition(c)));
        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.quote(schema.table),
            defs.join(", ")
        ))
    }

    fn check_supported(&self, schema: &TableSchema) -> Result<()> {
        if self.driver != Driver::Sqlite {
            return Ok(());
        }
        let key_is_bool = schema.key_type == KeyType::Assigned(ColumnType::Boolean);
        let bool_column = schema
            .columns
            .iter()
            .find(|c| c.ty == ColumnType::Boolean)
            .map(|c| c.name)
            .or(key_is_bool.then_some(schema.primary_key));
        match bool_column {
            Some(name) => Err(DbError::invalid_argument(
                "auto_migrate",
                format!(
                    "{}.{}: boolean columns cannot be read back from sqlite, use BigInt",
                    schema.table, name
                ),
            )),
            None => Ok(()),
        }
    }

    fn key_definition(&self, key: &str, key_type: KeyType) -> String {
        let name = self.quote(key);
        match (key_type, self.driver) {
            (KeyType::AutoIncrement, Driver::Postgres) => format!("{} BIGSERIAL PRIMARY KEY", name),
            (KeyType::AutoIncrement, Driver::MySql) => {
                format!("{} BIGINT AUTO_INCREMENT PRIMARY KEY", name)
            }
            (KeyType::AutoIncrement, Driver::Sqlite) => {
                format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", name)
            }
            (KeyType::Assigned(ty), _) => format!("{} {} PRIMARY KEY", name, self.type_name(ty)),
        }
    }

    fn column_definition(&self, column: &Column) -> String {
        let mut def = format!("{} {}", self.quote(column.name), self.type_name(column.ty));
        if !column.nullable {
            def.push_str(" NOT NULL");
        }
        if column.unique {
            def.push_str(" UNIQUE");
        }
        def
    }

    fn type_name(&self, ty: ColumnType) -> String {
        match (ty, self.driver) {
            (ColumnType::Boolean, _) => "BOOLEAN".to_string(),
            (ColumnType::BigInt, Driver::Sqlite) => "INTEGER".to_string(),
            (ColumnType::BigInt, _) => "BIGINT".to_string(),
            (ColumnType::Double, Driver::Postgres) => "DOUBLE PRECISION".to_string(),
            (ColumnType::Double, Driver::MySql) => "DOUBLE".to_string(),
            (ColumnType::Double, Driver::Sqlite) => "REAL".to_string(),
            (ColumnType::Text, _) => "TEXT".to_string(),
            (ColumnType::VarChar(len), _) => format!("VARCHAR({})", len),
            (ColumnType::Blob, Driver::Postgres) => "BYTEA".to_string(),
            (ColumnType::Blob, _) => "BLOB".to_string(),
        }
    }
}
