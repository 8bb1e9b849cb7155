///
/// Tests for the C ABI exported by hostsql-sqlite3.
///
/// The ABI shares one process-wide registry, so tests in this file take a
/// lock and never assume particular handle numbers.
///

use std::sync::{Mutex, MutexGuard, PoisonError};

use hostsql_core::{
    ERROR_KIND_CONFIG, ERROR_KIND_ENGINE, ERROR_KIND_INVALID_HANDLE, ERROR_KIND_NONE,
    ERROR_KIND_RANGE, hostsql_error_check, hostsql_error_code, hostsql_error_kind,
    hostsql_error_message,
};
use hostsql_sqlite3::abi::*;
use hostsql_sqlite3::hostsql_sqlite3_available;

static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

fn open_memory() -> i64 {
    let location = b":memory:";
    let conn = unsafe { hostsql_sqlite3_open(location.as_ptr(), location.len()) };
    assert!(conn >= 0, "open failed: {}", last_message());
    conn
}

fn prepare(conn: i64, sql: &str) -> i64 {
    let stmt = unsafe { hostsql_sqlite3_prepare(conn, sql.as_ptr(), sql.len()) };
    assert!(stmt >= 0, "prepare failed: {}", last_message());
    stmt
}

fn last_message() -> String {
    let mut buf = vec![0u8; 256];
    let len = unsafe { hostsql_error_message(buf.as_mut_ptr(), buf.len()) };
    buf.truncate(len.min(256));
    String::from_utf8_lossy(&buf).into_owned()
}

#[test]
fn test_abi_insert_and_read_back() {
    let _guard = serial();
    let conn = open_memory();

    let create = prepare(conn, "CREATE TABLE t(i INTEGER, f REAL, s TEXT, b BLOB, n)");
    assert_eq!(hostsql_sqlite3_step(conn, create), 0);
    assert_eq!(hostsql_sqlite3_finalize(conn, create), 0);

    let insert = prepare(conn, "INSERT INTO t VALUES (?, ?, ?, ?, ?)");
    assert_eq!(hostsql_sqlite3_bind_int(conn, insert, 1, 7), 0);
    assert_eq!(hostsql_sqlite3_bind_float(conn, insert, 2, 1.5), 0);
    let text = "héllo";
    assert_eq!(
        unsafe { hostsql_sqlite3_bind_text(conn, insert, 3, text.as_ptr(), text.len()) },
        0
    );
    let blob = [0u8, 1, 2, 255];
    assert_eq!(
        unsafe { hostsql_sqlite3_bind_blob(conn, insert, 4, blob.as_ptr(), blob.len()) },
        0
    );
    assert_eq!(hostsql_sqlite3_bind_null(conn, insert, 5), 0);
    assert_eq!(hostsql_sqlite3_step(conn, insert), 0);
    assert_eq!(hostsql_sqlite3_changes(conn), 1);
    assert_eq!(hostsql_sqlite3_last_insert_rowid(conn), 1);
    assert_eq!(hostsql_sqlite3_finalize(conn, insert), 0);

    let select = prepare(conn, "SELECT i, f, s, b, n FROM t");
    assert_eq!(hostsql_sqlite3_column_count(conn, select), 5);
    assert_eq!(hostsql_sqlite3_step(conn, select), 1);

    assert_eq!(hostsql_sqlite3_column_type(conn, select, 0), COLUMN_TYPE_INTEGER);
    assert_eq!(hostsql_sqlite3_column_int(conn, select, 0), 7);
    assert_eq!(hostsql_sqlite3_column_type(conn, select, 1), COLUMN_TYPE_FLOAT);
    assert_eq!(hostsql_sqlite3_column_float(conn, select, 1), 1.5);
    assert_eq!(hostsql_sqlite3_column_type(conn, select, 2), COLUMN_TYPE_TEXT);
    assert_eq!(hostsql_sqlite3_column_type(conn, select, 3), COLUMN_TYPE_BLOB);
    assert_eq!(hostsql_sqlite3_column_type(conn, select, 4), COLUMN_TYPE_NULL);

    let mut buf = [0u8; 16];
    let len = unsafe { hostsql_sqlite3_column_bytes(conn, select, 2, buf.as_mut_ptr(), buf.len()) };
    assert_eq!(&buf[..len as usize], text.as_bytes());
    let len = unsafe { hostsql_sqlite3_column_bytes(conn, select, 3, buf.as_mut_ptr(), buf.len()) };
    assert_eq!(&buf[..len as usize], &blob);

    assert_eq!(hostsql_sqlite3_step(conn, select), 0);
    assert_eq!(hostsql_sqlite3_finalize(conn, select), 0);
    assert_eq!(hostsql_sqlite3_close(conn), 0);
    assert_eq!(hostsql_error_check(), 0);
}

#[test]
fn test_abi_short_buffer_reports_full_length() {
    let _guard = serial();
    let conn = open_memory();
    let stmt = prepare(conn, "SELECT 'abcdefgh'");
    assert_eq!(hostsql_sqlite3_step(conn, stmt), 1);

    let mut buf = [0u8; 3];
    let len = unsafe { hostsql_sqlite3_column_bytes(conn, stmt, 0, buf.as_mut_ptr(), buf.len()) };
    assert_eq!(len, 8);
    assert_eq!(&buf, b"abc");

    assert_eq!(hostsql_sqlite3_finalize(conn, stmt), 0);
    assert_eq!(hostsql_sqlite3_close(conn), 0);
}

#[test]
fn test_abi_errors_land_in_error_slot() {
    let _guard = serial();

    assert_eq!(hostsql_sqlite3_close(-1), -1);
    assert_eq!(hostsql_error_kind(), ERROR_KIND_RANGE);
    assert!(last_message().starts_with("Args out of range"));

    let conn = open_memory();
    assert_eq!(hostsql_error_kind(), ERROR_KIND_NONE);

    let live = prepare(conn, "SELECT 1");
    let empty = live + 1;
    assert_eq!(hostsql_sqlite3_step(conn, empty), -1);
    assert_eq!(hostsql_error_kind(), ERROR_KIND_INVALID_HANDLE);
    assert_eq!(last_message(), format!("Invalid SQLite statement: {empty}"));
    assert_eq!(hostsql_sqlite3_finalize(conn, live), 0);

    let sql = "SELECT * FROM nowhere";
    assert_eq!(
        unsafe { hostsql_sqlite3_prepare(conn, sql.as_ptr(), sql.len()) },
        -1
    );
    assert_eq!(hostsql_error_kind(), ERROR_KIND_ENGINE);
    assert_eq!(hostsql_error_code(), 1);
    assert_eq!(last_message(), "SQLite error: no such table: nowhere");

    assert_eq!(hostsql_sqlite3_close(conn), 0);
    assert_eq!(hostsql_error_check(), 0);
    assert_eq!(hostsql_sqlite3_close(conn), -1);
    assert_eq!(hostsql_error_kind(), ERROR_KIND_INVALID_HANDLE);
}

#[test]
fn test_abi_close_with_open_statement_fails_and_keeps_connection() {
    let _guard = serial();
    let conn = open_memory();
    let stmt = prepare(conn, "SELECT 1");

    assert_eq!(hostsql_sqlite3_close(conn), -1);
    assert_eq!(hostsql_error_kind(), ERROR_KIND_ENGINE);
    assert_eq!(hostsql_error_code(), 5);

    assert_eq!(hostsql_sqlite3_step(conn, stmt), 1);
    assert_eq!(hostsql_sqlite3_column_int(conn, stmt, 0), 1);
    assert_eq!(hostsql_sqlite3_finalize(conn, stmt), 0);
    assert_eq!(hostsql_sqlite3_close(conn), 0);
}

#[test]
fn test_abi_configure() {
    let _guard = serial();

    let bad = "[registry]\ninitial_connections = \"many\"";
    assert_eq!(
        unsafe { hostsql_sqlite3_configure(bad.as_ptr(), bad.len()) },
        -1
    );
    assert_eq!(hostsql_error_kind(), ERROR_KIND_CONFIG);

    let conn = open_memory();
    let good = "[registry]\ninitial_statements = 2";
    assert_eq!(
        unsafe { hostsql_sqlite3_configure(good.as_ptr(), good.len()) },
        -1
    );
    assert_eq!(hostsql_error_kind(), ERROR_KIND_ENGINE);
    assert_eq!(hostsql_sqlite3_close(conn), 0);

    assert_eq!(
        unsafe { hostsql_sqlite3_configure(good.as_ptr(), good.len()) },
        0
    );
    assert_eq!(hostsql_sqlite3_available(), 1);

    let conn = open_memory();
    let stmts = [
        prepare(conn, "SELECT 1"),
        prepare(conn, "SELECT 2"),
        prepare(conn, "SELECT 3"),
    ];
    for stmt in stmts {
        assert_eq!(hostsql_sqlite3_finalize(conn, stmt), 0);
    }
    assert_eq!(hostsql_sqlite3_close(conn), 0);

    let defaults = "";
    assert_eq!(
        unsafe { hostsql_sqlite3_configure(defaults.as_ptr(), defaults.len()) },
        0
    );
}

#[test]
fn test_abi_configure_rejects_oversized_capacity() {
    let _guard = serial();

    let huge = "[registry]\ninitial_connections = 4611686018427387904";
    assert_eq!(
        unsafe { hostsql_sqlite3_configure(huge.as_ptr(), huge.len()) },
        -1
    );
    assert_eq!(hostsql_error_kind(), ERROR_KIND_CONFIG);
    assert!(
        last_message().starts_with("Invalid config: initial_connections must be between 1 and"),
        "{}",
        last_message()
    );

    let conn = open_memory();
    assert_eq!(hostsql_sqlite3_close(conn), 0);
}

#[test]
fn test_abi_column_type_of_unread_row() {
    let _guard = serial();
    let conn = open_memory();
    let stmt = prepare(conn, "SELECT 1, 'two', x'03', 4.0, NULL");
    assert_eq!(hostsql_sqlite3_step(conn, stmt), 1);

    assert_eq!(hostsql_sqlite3_column_type(conn, stmt, 2), COLUMN_TYPE_BLOB);
    assert_eq!(hostsql_sqlite3_column_type(conn, stmt, 1), COLUMN_TYPE_TEXT);
    assert_eq!(hostsql_sqlite3_column_type(conn, stmt, 3), COLUMN_TYPE_FLOAT);
    assert_eq!(hostsql_sqlite3_column_type(conn, stmt, 0), COLUMN_TYPE_INTEGER);
    assert_eq!(hostsql_sqlite3_column_type(conn, stmt, 4), COLUMN_TYPE_NULL);
    assert_eq!(hostsql_sqlite3_column_type(conn, stmt, 99), COLUMN_TYPE_NULL);
    assert_eq!(hostsql_error_check(), 0);

    assert_eq!(hostsql_sqlite3_column_type(conn, stmt + 1, 0), -1);
    assert_eq!(hostsql_error_kind(), ERROR_KIND_INVALID_HANDLE);

    assert_eq!(hostsql_sqlite3_finalize(conn, stmt), 0);
    assert_eq!(hostsql_sqlite3_close(conn), 0);
}
