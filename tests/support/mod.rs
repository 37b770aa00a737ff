//! Shared fixtures: a scratch SQLite database and a user record.

#![allow(dead_code)]

use tempfile::TempDir;

use ara_data_access::{
    Column, ColumnType, Database, DatabaseConfig, Driver, Record, Repository, Value,
};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TestUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub age: i64,
}

impl TestUser {
    pub fn new(name: &str, email: &str, age: i64) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            email: email.to_string(),
            age,
        }
    }
}

impl Record for TestUser {
    const TABLE: &'static str = "test_users";
    const COLUMNS: &'static [Column] = &[
        Column::new("name", ColumnType::VarChar(100)),
        Column::new("email", ColumnType::VarChar(100)).unique(),
        Column::new("age", ColumnType::BigInt),
    ];

    fn primary_key(&self) -> Option<Value> {
        (self.id != 0).then(|| self.id.into())
    }

    fn set_primary_key(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.name.as_str().into(),
            self.email.as_str().into(),
            self.age.into(),
        ]
    }
}

/// A migrated database living in a temp dir that is removed on drop.
pub struct TestDb {
    pub db: Database,
    pub users: Repository<TestUser>,
    _dir: TempDir,
}

pub fn sqlite_config(dir: &TempDir) -> DatabaseConfig {
    let path = dir.path().join("test.db");
    let mut config = DatabaseConfig::new(Driver::Sqlite, format!("sqlite://{}?mode=rwc", path.display()));
    config.max_open_conns = 4;
    config
}

pub async fn setup() -> TestDb {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db = Database::new(sqlite_config(&dir))
        .await
        .expect("open sqlite database");
    db.auto_migrate(&[TestUser::schema()])
        .await
        .expect("migrate test_users");

    TestDb {
        users: Repository::new(&db),
        db,
        _dir: dir,
    }
}

/// Insert `n` users named `user{i}` with ages 20, 21, ...
pub async fn seed_users(repo: &Repository<TestUser>, n: i64) -> Vec<TestUser> {
    let ctx = ara_data_access::Context::background();
    let mut created = Vec::new();
    for i in 0..n {
        let mut user = TestUser::new(&format!("user{}", i), &format!("user{}@example.com", i), 20 + i);
        repo.create(&ctx, &mut user).await.expect("seed user");
        created.push(user);
    }
    created
}
