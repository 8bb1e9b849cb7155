///
/// Error types for the handle layer.
///
/// Every failure the host can observe: bad handles, unbindable values,
/// native engine failures, contract mismatches with the engine, malformed
/// command invocations and configuration problems. Each variant maps to a
/// stable kind ID from hostsql-core for the C ABI.
///

use std::fmt;
use std::path::PathBuf;

use hostsql_core::{
    ERROR_KIND_ARITY, ERROR_KIND_CONFIG, ERROR_KIND_ENGINE, ERROR_KIND_FATAL,
    ERROR_KIND_INVALID_HANDLE, ERROR_KIND_INVALID_VALUE, ERROR_KIND_RANGE,
    ERROR_KIND_UNKNOWN_COMMAND, ERROR_KIND_WRONG_TYPE,
};
use miette::Diagnostic;
use thiserror::Error;

use crate::handle_table::SlotError;

/// Which table a handle indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Connection,
    Statement,
}

impl HandleKind {
    /// Attach the table kind to a failed slot lookup
    pub fn error(self, err: SlotError) -> DbError {
        match err {
            SlotError::OutOfRange { index, capacity } => DbError::Range {
                kind: self,
                handle: index,
                capacity,
            },
            SlotError::Empty { index } => DbError::InvalidHandle {
                kind: self,
                handle: index,
            },
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleKind::Connection => write!(f, "database"),
            HandleKind::Statement => write!(f, "statement"),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum DbError {
    #[error("Args out of range: {kind} handle {handle} is not in [0, {capacity})")]
    #[diagnostic(code(hostsql::range))]
    Range {
        kind: HandleKind,
        handle: i64,
        capacity: usize,
    },

    #[error("Invalid SQLite {kind}: {handle}")]
    #[diagnostic(code(hostsql::invalid_handle))]
    InvalidHandle { kind: HandleKind, handle: i64 },

    #[error("Invalid SQLite value type: {found}")]
    #[diagnostic(
        code(hostsql::invalid_value),
        help("only integers, floats, nil and strings can be bound")
    )]
    InvalidValue { found: &'static str },

    #[error("SQLite error: {message}")]
    #[diagnostic(code(hostsql::engine))]
    Engine { code: i32, message: String },

    #[error("Unknown SQLite column type {0}")]
    #[diagnostic(
        code(hostsql::fatal),
        help("the linked SQLite library does not match the expected call contract")
    )]
    UnknownColumnType(i32),

    #[error("Wrong type argument: expected {expected}, got {found}")]
    #[diagnostic(code(hostsql::wrong_type))]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Wrong number of arguments to {command}: expected {expected}, got {found}")]
    #[diagnostic(code(hostsql::arity))]
    Arity {
        command: String,
        expected: usize,
        found: usize,
    },

    #[error("Unknown command: {0}")]
    #[diagnostic(code(hostsql::unknown_command))]
    UnknownCommand(String),

    #[error(transparent)]
    #[diagnostic(code(hostsql::config))]
    Config(#[from] ConfigError),
}

impl DbError {
    pub fn engine(code: i32, message: impl Into<String>) -> Self {
        DbError::Engine {
            code,
            message: message.into(),
        }
    }

    /// Contract mismatches with the engine; the operation cannot be retried
    pub fn is_fatal(&self) -> bool {
        matches!(self, DbError::UnknownColumnType(_))
    }

    /// Host-visible kind ID (see hostsql_core::exception)
    pub fn kind_id(&self) -> i64 {
        match self {
            DbError::Range { .. } => ERROR_KIND_RANGE,
            DbError::InvalidHandle { .. } => ERROR_KIND_INVALID_HANDLE,
            DbError::InvalidValue { .. } => ERROR_KIND_INVALID_VALUE,
            DbError::Engine { .. } => ERROR_KIND_ENGINE,
            DbError::UnknownColumnType(_) => ERROR_KIND_FATAL,
            DbError::WrongType { .. } => ERROR_KIND_WRONG_TYPE,
            DbError::Arity { .. } => ERROR_KIND_ARITY,
            DbError::UnknownCommand(_) => ERROR_KIND_UNKNOWN_COMMAND,
            DbError::Config(_) => ERROR_KIND_CONFIG,
        }
    }

    /// Native result code, 0 for errors raised by this layer
    pub fn native_code(&self) -> i64 {
        match self {
            DbError::Engine { code, .. } => i64::from(*code),
            _ => 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {field} must be between 1 and {max}, got {value}")]
    Capacity {
        field: &'static str,
        value: usize,
        max: usize,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = DbError::Range {
            kind: HandleKind::Connection,
            handle: 99,
            capacity: 16,
        };
        assert!(err.to_string().contains("out of range"));
        assert!(err.to_string().contains("99"));
        assert!(err.to_string().contains("[0, 16)"));

        let err = DbError::InvalidHandle {
            kind: HandleKind::Statement,
            handle: 3,
        };
        assert_eq!(err.to_string(), "Invalid SQLite statement: 3");

        let err = DbError::InvalidHandle {
            kind: HandleKind::Connection,
            handle: 0,
        };
        assert_eq!(err.to_string(), "Invalid SQLite database: 0");

        let err = DbError::engine(1, "no such table: t");
        assert_eq!(err.to_string(), "SQLite error: no such table: t");

        let err = DbError::InvalidValue { found: "symbol" };
        assert!(err.to_string().contains("symbol"));

        let err = DbError::Arity {
            command: "sqlite3-step".to_string(),
            expected: 2,
            found: 1,
        };
        assert!(err.to_string().contains("sqlite3-step"));
        assert!(err.to_string().contains("expected 2, got 1"));
    }

    #[test]
    fn test_slot_errors_carry_kind() {
        let err = HandleKind::Statement.error(SlotError::OutOfRange {
            index: 8,
            capacity: 8,
        });
        assert!(matches!(
            err,
            DbError::Range {
                kind: HandleKind::Statement,
                handle: 8,
                capacity: 8
            }
        ));

        let err = HandleKind::Connection.error(SlotError::Empty { index: 3 });
        assert!(matches!(
            err,
            DbError::InvalidHandle {
                kind: HandleKind::Connection,
                handle: 3
            }
        ));
    }

    #[test]
    fn test_kind_ids_and_codes() {
        assert_eq!(DbError::engine(5, "database is locked").kind_id(), ERROR_KIND_ENGINE);
        assert_eq!(DbError::engine(5, "database is locked").native_code(), 5);
        assert_eq!(DbError::UnknownCommand("x".into()).native_code(), 0);
        assert!(DbError::UnknownColumnType(42).is_fatal());
        assert!(!DbError::engine(1, "x").is_fatal());
        assert_eq!(DbError::UnknownColumnType(42).kind_id(), ERROR_KIND_FATAL);
    }
}
