//! Connection manager integration tests
//!
//! Lifecycle, health, statistics and schema sync against a scratch SQLite file.

mod support;

use tokio_test::assert_ok;

use ara_data_access::{
    Column, ColumnType, Context, Database, DatabaseConfig, DbError, Driver, ErrorKind, KeyType,
    LogLevel, Record, Repository, TableSchema,
};
use support::{setup, sqlite_config, TestUser};

#[tokio::test]
async fn test_connect_without_config_is_invalid_configuration() {
    let err = Database::connect(None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
}

#[tokio::test]
async fn test_connect_rejects_driver_url_mismatch() {
    let config = DatabaseConfig::new(Driver::Postgres, "sqlite::memory:");
    let err = Database::new(config).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
}

#[tokio::test]
async fn test_connect_unreachable_file_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    // Read-only open of a file that does not exist
    let url = format!("sqlite://{}?mode=ro", dir.path().join("missing.db").display());
    let err = Database::new(DatabaseConfig::new(Driver::Sqlite, url))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionError);
}

#[tokio::test]
async fn test_config_is_normalized() {
    let env = setup().await;
    let config = env.db.config();
    assert_eq!(config.max_open_conns, 4);
    assert_eq!(config.max_idle_conns, 4);
    assert_eq!(config.conn_max_lifetime_seconds, 3600);
    assert_eq!(config.conn_max_idle_time_seconds, 600);
    assert_eq!(config.log_level, LogLevel::Warn);
    assert_eq!(env.db.driver(), Driver::Sqlite);
}

#[tokio::test]
async fn test_ping_and_health_check() {
    let env = setup().await;
    let ctx = Context::background();
    assert_ok!(env.db.ping(&ctx).await);
    assert_ok!(env.db.health_check(&ctx).await);
}

#[tokio::test]
async fn test_stats_reports_pool_counters() {
    let env = setup().await;
    env.db.ping(&Context::background()).await.unwrap();

    let stats = env.db.stats().unwrap();
    assert_eq!(stats.max_open_connections, 4);
    assert!(stats.open_connections >= 1);
    assert_eq!(stats.in_use + stats.idle, stats.open_connections);
    assert_eq!(stats.wait_count, 0);

    let map = stats.as_map();
    for key in [
        "max_open_connections",
        "open_connections",
        "in_use",
        "idle",
        "wait_count",
        "wait_duration",
        "max_idle_closed",
        "max_lifetime_closed",
    ] {
        assert!(map.contains_key(key), "missing {}", key);
    }
    assert!(map["wait_duration"].is_string());
}

#[tokio::test]
async fn test_close_then_operations_fail_not_connected() {
    let env = setup().await;
    let ctx = Context::background();

    assert_ok!(env.db.close().await);
    assert!(env.db.is_closed());

    assert_eq!(env.db.close().await.unwrap_err().kind(), ErrorKind::NotConnected);
    assert_eq!(env.db.ping(&ctx).await.unwrap_err().kind(), ErrorKind::NotConnected);
    assert_eq!(env.db.stats().unwrap_err().kind(), ErrorKind::NotConnected);

    // Repositories share the pool and see the closure too
    let err = env.users.count(&ctx).await.unwrap_err();
    assert!(matches!(err, DbError::NotConnected { .. }));
}

#[derive(Debug, sqlx::FromRow)]
struct Session {
    token: String,
    user_id: i64,
    note: Option<String>,
}

impl Record for Session {
    const TABLE: &'static str = "sessions";
    const PRIMARY_KEY: &'static str = "token";
    const KEY_TYPE: KeyType = KeyType::Assigned(ColumnType::VarChar(64));
    const COLUMNS: &'static [Column] = &[
        Column::new("user_id", ColumnType::BigInt),
        Column::new("note", ColumnType::Text).nullable(),
    ];

    fn primary_key(&self) -> Option<ara_data_access::Value> {
        (!self.token.is_empty()).then(|| self.token.as_str().into())
    }

    fn set_primary_key(&mut self, _id: i64) {}

    fn values(&self) -> Vec<ara_data_access::Value> {
        vec![self.user_id.into(), self.note.as_deref().into()]
    }
}

#[tokio::test]
async fn test_auto_migrate_is_idempotent_and_supports_assigned_keys() {
    let env = setup().await;
    let ctx = Context::background();
    let schemas: [TableSchema; 2] = [TestUser::schema(), Session::schema()];

    assert_ok!(env.db.auto_migrate(&schemas).await);
    assert_ok!(env.db.auto_migrate(&schemas).await);

    let sessions: Repository<Session> = Repository::new(&env.db);
    let mut session = Session {
        token: "abc123".into(),
        user_id: 7,
        note: None,
    };
    sessions.create(&ctx, &mut session).await.unwrap();

    let found = sessions.find_by_id(&ctx, "abc123").await.unwrap();
    assert_eq!(found.user_id, 7);
    assert!(found.note.is_none());

    let mut missing_key = Session {
        token: String::new(),
        user_id: 8,
        note: Some("no token".into()),
    };
    let err = sessions.create(&ctx, &mut missing_key).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn test_transaction_on_manager() {
    let env = setup().await;
    let ctx = Context::background();

    let created = env
        .db
        .transaction(|tx| {
            Box::pin(async move {
                let mut user = TestUser::new("Manager Tx", "manager@example.com", 41);
                tx.create(&mut user).await?;
                Ok::<_, DbError>(user.id)
            })
        })
        .await
        .unwrap();

    let found = env.users.find_by_id(&ctx, created).await.unwrap();
    assert_eq!(found.email, "manager@example.com");
}

#[tokio::test]
async fn test_pools_on_separate_files_are_isolated() {
    let first = setup().await;
    let dir = tempfile::tempdir().unwrap();
    let second = Database::new(sqlite_config(&dir)).await.unwrap();
    second.auto_migrate(&[TestUser::schema()]).await.unwrap();

    support::seed_users(&first.users, 2).await;
    let other: Repository<TestUser> = Repository::new(&second);
    assert_eq!(other.count(&Context::background()).await.unwrap(), 0);
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
struct Measurement {
    id: i64,
    score: f64,
    ratio: Option<f64>,
    payload: Vec<u8>,
    active: i64,
}

impl Record for Measurement {
    const TABLE: &'static str = "measurements";
    const COLUMNS: &'static [Column] = &[
        Column::new("score", ColumnType::Double),
        Column::new("ratio", ColumnType::Double).nullable(),
        Column::new("payload", ColumnType::Blob),
        Column::new("active", ColumnType::BigInt),
    ];

    fn primary_key(&self) -> Option<ara_data_access::Value> {
        (self.id != 0).then(|| self.id.into())
    }

    fn set_primary_key(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<ara_data_access::Value> {
        vec![
            self.score.into(),
            self.ratio.into(),
            self.payload.clone().into(),
            self.active.into(),
        ]
    }
}

#[derive(Debug, sqlx::FromRow)]
struct Toggle {
    id: i64,
    enabled: bool,
}

impl Record for Toggle {
    const TABLE: &'static str = "toggles";
    const COLUMNS: &'static [Column] = &[Column::new("enabled", ColumnType::Boolean)];

    fn primary_key(&self) -> Option<ara_data_access::Value> {
        (self.id != 0).then(|| self.id.into())
    }

    fn set_primary_key(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<ara_data_access::Value> {
        vec![self.enabled.into()]
    }
}

#[tokio::test]
async fn test_double_blob_and_flag_columns_round_trip() {
    let env = setup().await;
    let ctx = Context::background();
    env.db.auto_migrate(&[Measurement::schema()]).await.unwrap();

    let readings: Repository<Measurement> = Repository::new(&env.db);
    let mut full = Measurement {
        id: 0,
        score: 98.25,
        ratio: Some(0.5),
        payload: vec![0, 1, 2, 254, 255],
        active: 1,
    };
    let mut sparse = Measurement {
        id: 0,
        score: -3.5,
        ratio: None,
        payload: vec![42],
        active: 0,
    };
    readings.create(&ctx, &mut full).await.unwrap();
    readings.create(&ctx, &mut sparse).await.unwrap();

    assert_eq!(readings.find_by_id(&ctx, full.id).await.unwrap(), full);
    assert_eq!(readings.find_by_id(&ctx, sparse.id).await.unwrap(), sparse);

    let active = readings
        .find_where(&ctx, "active = ?", ara_data_access::params![1])
        .await
        .unwrap();
    assert_eq!(active, vec![full]);
}

#[tokio::test]
async fn test_auto_migrate_rejects_boolean_columns_on_sqlite() {
    let env = setup().await;
    let ctx = Context::background();

    let err = env
        .db
        .auto_migrate(&[Measurement::schema(), Toggle::schema()])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(err.to_string().contains("toggles.enabled"));

    // Nothing from the batch was created
    let readings: Repository<Measurement> = Repository::new(&env.db);
    let missing = readings.count(&ctx).await.unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::StorageError);
}
