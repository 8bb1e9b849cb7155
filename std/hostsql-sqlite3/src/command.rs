///
/// Named command surface.
///
/// The host calls commands by name with a list of dynamic values. Parsing
/// checks arity and argument types (the host's own wrong-type and
/// wrong-number-of-arguments errors); execution runs the command against a
/// registry and returns a host value.
///
/// Commands:
/// - sqlite3-open location -> conn
/// - sqlite3-close conn -> nil
/// - sqlite3-prepare conn sql -> stmt
/// - sqlite3-finalize conn stmt -> nil
/// - sqlite3-reset conn stmt -> nil
/// - sqlite3-bind conn stmt position value -> value
/// - sqlite3-column conn stmt index -> value
/// - sqlite3-column-count conn stmt -> integer
/// - sqlite3-column-name conn stmt index -> string or nil
/// - sqlite3-step conn stmt -> t or nil
/// - sqlite3-changes conn -> integer
/// - sqlite3-last-insert-rowid conn -> integer
/// - sqlite3-available-p -> t
///

use hostsql_core::{HostString, Value};

use crate::error::{DbError, Result};
use crate::registry::Registry;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open { location: HostString },
    Close { conn: i64 },
    Prepare { conn: i64, sql: HostString },
    Finalize { conn: i64, stmt: i64 },
    Reset { conn: i64, stmt: i64 },
    Bind {
        conn: i64,
        stmt: i64,
        position: i64,
        value: Value,
    },
    Column { conn: i64, stmt: i64, index: i64 },
    ColumnCount { conn: i64, stmt: i64 },
    ColumnName { conn: i64, stmt: i64, index: i64 },
    Step { conn: i64, stmt: i64 },
    Changes { conn: i64 },
    LastInsertRowid { conn: i64 },
    Available,
}

pub const COMMAND_NAMES: &[&str] = &[
    "sqlite3-open",
    "sqlite3-close",
    "sqlite3-prepare",
    "sqlite3-finalize",
    "sqlite3-reset",
    "sqlite3-bind",
    "sqlite3-column",
    "sqlite3-column-count",
    "sqlite3-column-name",
    "sqlite3-step",
    "sqlite3-changes",
    "sqlite3-last-insert-rowid",
    "sqlite3-available-p",
];

fn arity(name: &str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(DbError::Arity {
            command: name.to_string(),
            expected,
            found: args.len(),
        })
    }
}

fn integer(value: &Value) -> Result<i64> {
    value.as_integer().ok_or(DbError::WrongType {
        expected: "integer",
        found: value.type_name(),
    })
}

fn string(value: Value) -> Result<HostString> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(DbError::WrongType {
            expected: "string",
            found: other.type_name(),
        }),
    }
}

impl Command {
    pub fn parse(name: &str, args: Vec<Value>) -> Result<Self> {
        let expected = match name {
            "sqlite3-available-p" => 0,
            "sqlite3-open" | "sqlite3-close" | "sqlite3-changes" | "sqlite3-last-insert-rowid" => 1,
            "sqlite3-prepare" | "sqlite3-finalize" | "sqlite3-reset" | "sqlite3-column-count"
            | "sqlite3-step" => 2,
            "sqlite3-column" | "sqlite3-column-name" => 3,
            "sqlite3-bind" => 4,
            _ => return Err(DbError::UnknownCommand(name.to_string())),
        };
        arity(name, &args, expected)?;

        let mut args = args.into_iter();
        let mut next = || args.next().unwrap_or(Value::Nil);

        let command = match name {
            "sqlite3-available-p" => Command::Available,
            "sqlite3-open" => Command::Open {
                location: string(next())?,
            },
            "sqlite3-close" => Command::Close {
                conn: integer(&next())?,
            },
            "sqlite3-changes" => Command::Changes {
                conn: integer(&next())?,
            },
            "sqlite3-last-insert-rowid" => Command::LastInsertRowid {
                conn: integer(&next())?,
            },
            "sqlite3-prepare" => Command::Prepare {
                conn: integer(&next())?,
                sql: string(next())?,
            },
            "sqlite3-finalize" => Command::Finalize {
                conn: integer(&next())?,
                stmt: integer(&next())?,
            },
            "sqlite3-reset" => Command::Reset {
                conn: integer(&next())?,
                stmt: integer(&next())?,
            },
            "sqlite3-column-count" => Command::ColumnCount {
                conn: integer(&next())?,
                stmt: integer(&next())?,
            },
            "sqlite3-step" => Command::Step {
                conn: integer(&next())?,
                stmt: integer(&next())?,
            },
            "sqlite3-column" => Command::Column {
                conn: integer(&next())?,
                stmt: integer(&next())?,
                index: integer(&next())?,
            },
            "sqlite3-column-name" => Command::ColumnName {
                conn: integer(&next())?,
                stmt: integer(&next())?,
                index: integer(&next())?,
            },
            _ => Command::Bind {
                conn: integer(&next())?,
                stmt: integer(&next())?,
                position: integer(&next())?,
                value: next(),
            },
        };
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Open { .. } => "sqlite3-open",
            Command::Close { .. } => "sqlite3-close",
            Command::Prepare { .. } => "sqlite3-prepare",
            Command::Finalize { .. } => "sqlite3-finalize",
            Command::Reset { .. } => "sqlite3-reset",
            Command::Bind { .. } => "sqlite3-bind",
            Command::Column { .. } => "sqlite3-column",
            Command::ColumnCount { .. } => "sqlite3-column-count",
            Command::ColumnName { .. } => "sqlite3-column-name",
            Command::Step { .. } => "sqlite3-step",
            Command::Changes { .. } => "sqlite3-changes",
            Command::LastInsertRowid { .. } => "sqlite3-last-insert-rowid",
            Command::Available => "sqlite3-available-p",
        }
    }

    pub fn execute(self, registry: &mut Registry) -> Result<Value> {
        match self {
            Command::Open { location } => registry.open(location.as_bytes()).map(Value::Integer),
            Command::Close { conn } => registry.close(conn).map(|()| Value::Nil),
            Command::Prepare { conn, sql } => {
                registry.prepare(conn, sql.as_bytes()).map(Value::Integer)
            }
            Command::Finalize { conn, stmt } => registry.finalize(conn, stmt).map(|()| Value::Nil),
            Command::Reset { conn, stmt } => registry.reset(conn, stmt).map(|()| Value::Nil),
            Command::Bind {
                conn,
                stmt,
                position,
                value,
            } => {
                registry.bind(conn, stmt, position, &value)?;
                Ok(value)
            }
            Command::Column { conn, stmt, index } => registry.column(conn, stmt, index),
            Command::ColumnCount { conn, stmt } => {
                registry.column_count(conn, stmt).map(Value::Integer)
            }
            Command::ColumnName { conn, stmt, index } => Ok(registry
                .column_name(conn, stmt, index)?
                .map(Value::text)
                .unwrap_or(Value::Nil)),
            Command::Step { conn, stmt } => registry.step(conn, stmt).map(Value::from_bool),
            Command::Changes { conn } => registry.changes(conn).map(Value::Integer),
            Command::LastInsertRowid { conn } => {
                registry.last_insert_rowid(conn).map(Value::Integer)
            }
            Command::Available => Ok(Value::from_bool(crate::available())),
        }
    }
}

/// Parse and run a command in one go
pub fn call(registry: &mut Registry, name: &str, args: Vec<Value>) -> Result<Value> {
    Command::parse(name, args)?.execute(registry)
}
