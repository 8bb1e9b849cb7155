///
/// C ABI over a process-wide registry.
///
/// The registry lives behind LazyLock<Mutex<Registry>>, so every call,
/// including its native call sequence, is atomic with respect to other
/// callers.
///
/// Error handling follows the host error slot:
/// - Each call clears the slot on entry
/// - On failure it records kind, native code and message, and returns a
///   sentinel (-1, 0 or 0.0); the host checks `hostsql_error_check()`
///
/// Strings and blobs cross as (pointer, length) pairs; a null pointer is
/// only accepted with length 0.
///

use std::sync::{LazyLock, Mutex, PoisonError};

use hostsql_core::{HostString, Value, clear_error, set_error};
use rusqlite::ffi;

use crate::config::Config;
use crate::error::{DbError, Result};
use crate::registry::Registry;

/// Column type codes reported to the host (SQLite's fundamental types)
pub const COLUMN_TYPE_INTEGER: i64 = 1;
pub const COLUMN_TYPE_FLOAT: i64 = 2;
pub const COLUMN_TYPE_TEXT: i64 = 3;
pub const COLUMN_TYPE_BLOB: i64 = 4;
pub const COLUMN_TYPE_NULL: i64 = 5;

static REGISTRY: LazyLock<Mutex<Registry>> = LazyLock::new(|| Mutex::new(Registry::new()));

fn throw(err: &DbError) {
    set_error(err.kind_id(), err.native_code(), &err.to_string());
}

fn with_registry<T>(sentinel: T, f: impl FnOnce(&mut Registry) -> Result<T>) -> T {
    clear_error();
    let mut reg = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
    match f(&mut *reg) {
        Ok(value) => value,
        Err(e) => {
            throw(&e);
            sentinel
        }
    }
}

unsafe fn bytes_from_host<'a>(data: *const u8, len: usize) -> &'a [u8] {
    if data.is_null() || len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(data, len) }
    }
}

/// Replace the process-wide registry with one built from TOML settings.
/// Refused while any connection is open. Returns 0 on success, -1 on error.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hostsql_sqlite3_configure(toml: *const u8, len: usize) -> i64 {
    let text = String::from_utf8_lossy(unsafe { bytes_from_host(toml, len) }).into_owned();
    with_registry(-1, |reg| {
        if reg.connection_count() > 0 {
            return Err(DbError::engine(
                ffi::SQLITE_MISUSE,
                "cannot reconfigure while connections are open",
            ));
        }
        *reg = Registry::with_config(Config::parse(&text)?);
        Ok(0)
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn hostsql_sqlite3_open(location: *const u8, len: usize) -> i64 {
    let location = unsafe { bytes_from_host(location, len) };
    with_registry(-1, |reg| reg.open(location))
}

#[unsafe(no_mangle)]
pub extern "C" fn hostsql_sqlite3_close(conn: i64) -> i64 {
    with_registry(-1, |reg| reg.close(conn).map(|()| 0))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn hostsql_sqlite3_prepare(conn: i64, sql: *const u8, len: usize) -> i64 {
    let sql = unsafe { bytes_from_host(sql, len) };
    with_registry(-1, |reg| reg.prepare(conn, sql))
}

#[unsafe(no_mangle)]
pub extern "C" fn hostsql_sqlite3_finalize(conn: i64, stmt: i64) -> i64 {
    with_registry(-1, |reg| reg.finalize(conn, stmt).map(|()| 0))
}

#[unsafe(no_mangle)]
pub extern "C" fn hostsql_sqlite3_reset(conn: i64, stmt: i64) -> i64 {
    with_registry(-1, |reg| reg.reset(conn, stmt).map(|()| 0))
}

#[unsafe(no_mangle)]
pub extern "C" fn hostsql_sqlite3_bind_int(conn: i64, stmt: i64, position: i64, value: i64) -> i64 {
    with_registry(-1, |reg| {
        reg.bind(conn, stmt, position, &Value::Integer(value)).map(|()| 0)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn hostsql_sqlite3_bind_float(conn: i64, stmt: i64, position: i64, value: f64) -> i64 {
    with_registry(-1, |reg| {
        reg.bind(conn, stmt, position, &Value::Float(value)).map(|()| 0)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn hostsql_sqlite3_bind_null(conn: i64, stmt: i64, position: i64) -> i64 {
    with_registry(-1, |reg| reg.bind(conn, stmt, position, &Value::Nil).map(|()| 0))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn hostsql_sqlite3_bind_text(
    conn: i64,
    stmt: i64,
    position: i64,
    data: *const u8,
    len: usize,
) -> i64 {
    let value = Value::String(HostString::multibyte(unsafe { bytes_from_host(data, len) }));
    with_registry(-1, |reg| reg.bind(conn, stmt, position, &value).map(|()| 0))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn hostsql_sqlite3_bind_blob(
    conn: i64,
    stmt: i64,
    position: i64,
    data: *const u8,
    len: usize,
) -> i64 {
    let value = Value::String(HostString::unibyte(unsafe { bytes_from_host(data, len) }));
    with_registry(-1, |reg| reg.bind(conn, stmt, position, &value).map(|()| 0))
}

/// 1 when a row is available, 0 when done, -1 on error
#[unsafe(no_mangle)]
pub extern "C" fn hostsql_sqlite3_step(conn: i64, stmt: i64) -> i64 {
    with_registry(-1, |reg| reg.step(conn, stmt).map(i64::from))
}

#[unsafe(no_mangle)]
pub extern "C" fn hostsql_sqlite3_column_type(conn: i64, stmt: i64, index: i64) -> i64 {
    with_registry(-1, |reg| match reg.column_type(conn, stmt, index)? {
        ffi::SQLITE_INTEGER => Ok(COLUMN_TYPE_INTEGER),
        ffi::SQLITE_FLOAT => Ok(COLUMN_TYPE_FLOAT),
        ffi::SQLITE_TEXT => Ok(COLUMN_TYPE_TEXT),
        ffi::SQLITE_BLOB => Ok(COLUMN_TYPE_BLOB),
        ffi::SQLITE_NULL => Ok(COLUMN_TYPE_NULL),
        other => Err(DbError::UnknownColumnType(other)),
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn hostsql_sqlite3_column_int(conn: i64, stmt: i64, index: i64) -> i64 {
    with_registry(0, |reg| {
        Ok(match reg.column(conn, stmt, index)? {
            Value::Integer(i) => i,
            Value::Float(f) => f as i64,
            _ => 0,
        })
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn hostsql_sqlite3_column_float(conn: i64, stmt: i64, index: i64) -> f64 {
    with_registry(0.0, |reg| {
        Ok(match reg.column(conn, stmt, index)? {
            Value::Float(f) => f,
            Value::Integer(i) => i as f64,
            _ => 0.0,
        })
    })
}

/// Copy a TEXT or BLOB column into `buf` (at most `cap` bytes).
/// Returns the full length, so a short buffer can be retried; -1 on error.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hostsql_sqlite3_column_bytes(
    conn: i64,
    stmt: i64,
    index: i64,
    buf: *mut u8,
    cap: usize,
) -> i64 {
    with_registry(-1, |reg| {
        let bytes = match reg.column(conn, stmt, index)? {
            Value::String(s) => s.into_bytes(),
            _ => Vec::new(),
        };
        let n = bytes.len().min(cap);
        if !buf.is_null() && n > 0 {
            unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf, n) };
        }
        Ok(bytes.len() as i64)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn hostsql_sqlite3_column_count(conn: i64, stmt: i64) -> i64 {
    with_registry(-1, |reg| reg.column_count(conn, stmt))
}

#[unsafe(no_mangle)]
pub extern "C" fn hostsql_sqlite3_changes(conn: i64) -> i64 {
    with_registry(-1, |reg| reg.changes(conn))
}

#[unsafe(no_mangle)]
pub extern "C" fn hostsql_sqlite3_last_insert_rowid(conn: i64) -> i64 {
    with_registry(-1, |reg| reg.last_insert_rowid(conn))
}
