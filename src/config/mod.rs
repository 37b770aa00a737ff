mod settings;

pub use settings::{
    DatabaseConfig, Driver, LogLevel, DEFAULT_ACQUIRE_TIMEOUT_SECONDS,
    DEFAULT_CONN_MAX_IDLE_TIME_SECONDS, DEFAULT_CONN_MAX_LIFETIME_SECONDS, DEFAULT_MAX_IDLE_CONNS,
    DEFAULT_MAX_OPEN_CONNS,
};
