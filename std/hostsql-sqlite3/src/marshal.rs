///
/// Conversion between host values and SQLite's typed bind/column protocol.
///
/// Outbound (bind):
/// - Integer → int64, Float → double, Nil → NULL
/// - multibyte String → TEXT, unibyte String → BLOB (explicit byte length)
/// - anything else → InvalidValue, before touching the statement
///
/// Inbound (column), by the column's fundamental type:
/// - INTEGER → Integer, FLOAT → Float, NULL → Nil
/// - TEXT → multibyte String, BLOB → unibyte String
///

use std::ffi::c_int;

use hostsql_core::{HostString, Value};
use rusqlite::ffi;
use tracing::error;

use crate::error::{DbError, Result};
use crate::native::NativeStatement;

/// Reject values that have no SQLite representation
pub fn check_bindable(value: &Value) -> Result<()> {
    match value {
        Value::Integer(_) | Value::Float(_) | Value::Nil | Value::String(_) => Ok(()),
        other => Err(DbError::InvalidValue {
            found: other.type_name(),
        }),
    }
}

pub(crate) fn bind_value(stmt: &mut NativeStatement, position: c_int, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => stmt.bind_int64(position, *i),
        Value::Float(f) => stmt.bind_double(position, *f),
        Value::Nil => stmt.bind_null(position),
        Value::String(s) if s.is_multibyte() => stmt.bind_text(position, s.as_bytes()),
        Value::String(s) => stmt.bind_blob(position, s.as_bytes()),
        other => Err(DbError::InvalidValue {
            found: other.type_name(),
        }),
    }
}

pub(crate) fn column_value(stmt: &NativeStatement, index: c_int) -> Result<Value> {
    match stmt.column_type(index) {
        ffi::SQLITE_INTEGER => Ok(Value::Integer(stmt.column_int64(index))),
        ffi::SQLITE_FLOAT => Ok(Value::Float(stmt.column_double(index))),
        ffi::SQLITE_NULL => Ok(Value::Nil),
        ffi::SQLITE_TEXT => Ok(Value::String(HostString::multibyte(stmt.column_text(index)))),
        ffi::SQLITE_BLOB => Ok(Value::String(HostString::unibyte(stmt.column_blob(index)))),
        other => {
            error!(column = index, column_type = other, "engine reported an unknown column type");
            Err(DbError::UnknownColumnType(other))
        }
    }
}
