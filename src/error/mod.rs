use thiserror::Error;

/// Coarse classification of a [`DbError`], stable across drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    ConstraintViolation,
    NotConnected,
    InvalidConfiguration,
    InvalidArgument,
    ConnectionError,
    DegradedState,
    Cancelled,
    Timeout,
    Aborted,
    RollbackFailed,
    StorageError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::ConstraintViolation => "constraint_violation",
            ErrorKind::NotConnected => "not_connected",
            ErrorKind::InvalidConfiguration => "invalid_configuration",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::ConnectionError => "connection_error",
            ErrorKind::DegradedState => "degraded_state",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Aborted => "aborted",
            ErrorKind::RollbackFailed => "rollback_failed",
            ErrorKind::StorageError => "storage_error",
        }
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("{operation}: record not found")]
    NotFound { operation: &'static str },

    #[error("{operation}: constraint violation: {source}")]
    ConstraintViolation {
        operation: &'static str,
        source: sqlx::Error,
    },

    #[error("{operation}: database not connected")]
    NotConnected { operation: &'static str },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("{operation}: invalid argument: {message}")]
    InvalidArgument {
        operation: &'static str,
        message: String,
    },

    #[error("{operation}: connection error: {source}")]
    Connection {
        operation: &'static str,
        source: sqlx::Error,
    },

    #[error("{operation}: degraded state: {message}")]
    DegradedState {
        operation: &'static str,
        message: String,
    },

    #[error("{operation}: cancelled")]
    Cancelled { operation: &'static str },

    #[error("{operation}: deadline exceeded")]
    Timeout { operation: &'static str },

    /// Returned by a unit of work to force a rollback.
    #[error("Transaction aborted: {0}")]
    Aborted(String),

    #[error("{operation}: rollback failed ({source}) after: {cause}")]
    RollbackFailed {
        operation: &'static str,
        cause: Box<DbError>,
        source: sqlx::Error,
    },

    #[error("{operation}: storage error: {source}")]
    Storage {
        operation: &'static str,
        source: sqlx::Error,
    },
}

impl DbError {
    /// Classify a driver error raised while running `operation`.
    pub fn from_sqlx(operation: &'static str, err: sqlx::Error) -> Self {
        let constraint = matches!(&err, sqlx::Error::Database(e) if is_constraint(e.kind()));
        if constraint {
            return DbError::ConstraintViolation {
                operation,
                source: err,
            };
        }

        match err {
            sqlx::Error::RowNotFound => DbError::NotFound { operation },
            sqlx::Error::PoolClosed => DbError::NotConnected { operation },
            sqlx::Error::Configuration(e) => {
                DbError::InvalidConfiguration(format!("{}: {}", operation, e))
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::WorkerCrashed => DbError::Connection {
                operation,
                source: err,
            },
            other => DbError::Storage {
                operation,
                source: other,
            },
        }
    }

    pub fn invalid_argument(operation: &'static str, message: impl Into<String>) -> Self {
        DbError::InvalidArgument {
            operation,
            message: message.into(),
        }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        DbError::InvalidConfiguration(message.into())
    }

    pub fn aborted(reason: impl Into<String>) -> Self {
        DbError::Aborted(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::NotFound { .. } => ErrorKind::NotFound,
            DbError::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
            DbError::NotConnected { .. } => ErrorKind::NotConnected,
            DbError::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            DbError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            DbError::Connection { .. } => ErrorKind::ConnectionError,
            DbError::DegradedState { .. } => ErrorKind::DegradedState,
            DbError::Cancelled { .. } => ErrorKind::Cancelled,
            DbError::Timeout { .. } => ErrorKind::Timeout,
            DbError::Aborted(_) => ErrorKind::Aborted,
            DbError::RollbackFailed { .. } => ErrorKind::RollbackFailed,
            DbError::Storage { .. } => ErrorKind::StorageError,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_constraint_violation(&self) -> bool {
        self.kind() == ErrorKind::ConstraintViolation
    }
}

fn is_constraint(kind: sqlx::error::ErrorKind) -> bool {
    matches!(
        kind,
        sqlx::error::ErrorKind::UniqueViolation
            | sqlx::error::ErrorKind::ForeignKeyViolation
            | sqlx::error::ErrorKind::NotNullViolation
            | sqlx::error::ErrorKind::CheckViolation
    )
}

pub type Result<T> = std::result::Result<T, DbError>;
