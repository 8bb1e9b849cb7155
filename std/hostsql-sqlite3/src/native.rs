///
/// Owning wrappers around SQLite's raw connection and statement pointers.
///
/// This is the only module that dereferences `sqlite3*` / `sqlite3_stmt*`.
/// Everything above it works with these wrappers, which are only ever
/// reachable through a validated handle.
///
/// Lifetimes follow the engine's rules:
/// - `NativeConnection::close` is fallible and hands the connection back on
///   failure (SQLITE_BUSY while statements are still open), so a failed
///   close leaves a usable connection.
/// - Dropping a wrapper releases the native object (finalize, or
///   sqlite3_close_v2 which defers until the last statement is gone).
/// - Column text and blob slices borrow the statement, so they cannot
///   outlive the next step, reset or finalize.
///

use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::ptr::{self, NonNull};

use rusqlite::ffi;

use crate::config::OpenConfig;
use crate::error::{DbError, Result};

/// Message for a result code when no connection is available to ask
fn errstr(rc: c_int) -> String {
    unsafe {
        let msg = ffi::sqlite3_errstr(rc);
        if msg.is_null() {
            return format!("error code {}", rc);
        }
        CStr::from_ptr(msg).to_string_lossy().into_owned()
    }
}

/// Build an EngineError from the connection's most recent diagnostic
unsafe fn last_error(db: *mut ffi::sqlite3, rc: c_int) -> DbError {
    if db.is_null() {
        return DbError::engine(rc, errstr(rc));
    }
    let msg = unsafe { ffi::sqlite3_errmsg(db) };
    if msg.is_null() {
        return DbError::engine(rc, errstr(rc));
    }
    let message = unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned();
    DbError::engine(rc, message)
}

fn length(bytes: &[u8]) -> Result<c_int> {
    c_int::try_from(bytes.len())
        .map_err(|_| DbError::engine(ffi::SQLITE_TOOBIG, errstr(ffi::SQLITE_TOOBIG)))
}

fn open_flags(open: &OpenConfig) -> c_int {
    let mut flags = if open.read_only {
        ffi::SQLITE_OPEN_READONLY
    } else if open.create {
        ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE
    } else {
        ffi::SQLITE_OPEN_READWRITE
    };
    if open.uri {
        flags |= ffi::SQLITE_OPEN_URI;
    }
    flags
}

pub(crate) struct NativeConnection {
    db: NonNull<ffi::sqlite3>,
}

// The bundled library is compiled in serialized threading mode, and the
// registry never shares a connection between threads without its lock.
unsafe impl Send for NativeConnection {}

impl NativeConnection {
    pub(crate) fn open(location: &[u8], open: &OpenConfig) -> Result<Self> {
        let c_location = CString::new(location)
            .map_err(|_| DbError::engine(ffi::SQLITE_MISUSE, "location contains a NUL byte"))?;
        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let rc = unsafe {
            ffi::sqlite3_open_v2(c_location.as_ptr(), &mut db, open_flags(open), ptr::null())
        };
        if rc != ffi::SQLITE_OK {
            // A handle is usually allocated even on failure; it has to be
            // closed after reading its message.
            let err = unsafe { last_error(db, rc) };
            if !db.is_null() {
                unsafe { ffi::sqlite3_close(db) };
            }
            return Err(err);
        }
        let db = NonNull::new(db)
            .ok_or_else(|| DbError::engine(ffi::SQLITE_NOMEM, errstr(ffi::SQLITE_NOMEM)))?;
        if open.busy_timeout_ms > 0 {
            let ms = c_int::try_from(open.busy_timeout_ms).unwrap_or(c_int::MAX);
            unsafe { ffi::sqlite3_busy_timeout(db.as_ptr(), ms) };
        }
        Ok(Self { db })
    }

    /// Close the connection; on failure the still-open connection is returned
    pub(crate) fn close(self) -> std::result::Result<(), (Self, DbError)> {
        let rc = unsafe { ffi::sqlite3_close(self.db.as_ptr()) };
        if rc == ffi::SQLITE_OK {
            std::mem::forget(self);
            Ok(())
        } else {
            let err = unsafe { last_error(self.db.as_ptr(), rc) };
            Err((self, err))
        }
    }

    /// Compile the first statement in `sql`; trailing SQL is ignored
    pub(crate) fn prepare(&self, sql: &[u8]) -> Result<NativeStatement> {
        let len = length(sql)?;
        let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(
                self.db.as_ptr(),
                sql.as_ptr() as *const c_char,
                len,
                &mut stmt,
                ptr::null_mut(),
            )
        };
        if rc != ffi::SQLITE_OK {
            if !stmt.is_null() {
                unsafe { ffi::sqlite3_finalize(stmt) };
            }
            return Err(unsafe { last_error(self.db.as_ptr(), rc) });
        }
        NonNull::new(stmt)
            .map(|stmt| NativeStatement { stmt })
            .ok_or_else(|| DbError::engine(ffi::SQLITE_MISUSE, "SQL contains no statement"))
    }

    pub(crate) fn changes(&self) -> i64 {
        i64::from(unsafe { ffi::sqlite3_changes(self.db.as_ptr()) })
    }

    pub(crate) fn last_insert_rowid(&self) -> i64 {
        unsafe { ffi::sqlite3_last_insert_rowid(self.db.as_ptr()) }
    }
}

impl Drop for NativeConnection {
    fn drop(&mut self) {
        unsafe { ffi::sqlite3_close_v2(self.db.as_ptr()) };
    }
}

pub(crate) struct NativeStatement {
    stmt: NonNull<ffi::sqlite3_stmt>,
}

unsafe impl Send for NativeStatement {}

impl NativeStatement {
    fn check(&self, rc: c_int) -> Result<()> {
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(self.error(rc))
        }
    }

    fn error(&self, rc: c_int) -> DbError {
        unsafe { last_error(ffi::sqlite3_db_handle(self.stmt.as_ptr()), rc) }
    }

    pub(crate) fn bind_int64(&mut self, position: c_int, value: i64) -> Result<()> {
        self.check(unsafe { ffi::sqlite3_bind_int64(self.stmt.as_ptr(), position, value) })
    }

    pub(crate) fn bind_double(&mut self, position: c_int, value: f64) -> Result<()> {
        self.check(unsafe { ffi::sqlite3_bind_double(self.stmt.as_ptr(), position, value) })
    }

    pub(crate) fn bind_null(&mut self, position: c_int) -> Result<()> {
        self.check(unsafe { ffi::sqlite3_bind_null(self.stmt.as_ptr(), position) })
    }

    pub(crate) fn bind_text(&mut self, position: c_int, text: &[u8]) -> Result<()> {
        let len = length(text)?;
        self.check(unsafe {
            ffi::sqlite3_bind_text(
                self.stmt.as_ptr(),
                position,
                text.as_ptr() as *const c_char,
                len,
                ffi::SQLITE_TRANSIENT(),
            )
        })
    }

    pub(crate) fn bind_blob(&mut self, position: c_int, blob: &[u8]) -> Result<()> {
        if blob.is_empty() {
            // A null data pointer would bind NULL instead of an empty blob
            return self.check(unsafe { ffi::sqlite3_bind_zeroblob(self.stmt.as_ptr(), position, 0) });
        }
        let len = length(blob)?;
        self.check(unsafe {
            ffi::sqlite3_bind_blob(
                self.stmt.as_ptr(),
                position,
                blob.as_ptr() as *const c_void,
                len,
                ffi::SQLITE_TRANSIENT(),
            )
        })
    }

    /// Advance the cursor: true when a row is available, false when done
    pub(crate) fn step(&mut self) -> Result<bool> {
        match unsafe { ffi::sqlite3_step(self.stmt.as_ptr()) } {
            ffi::SQLITE_ROW => Ok(true),
            ffi::SQLITE_DONE => Ok(false),
            rc => Err(self.error(rc)),
        }
    }

    /// Rewind the cursor. The returned error, if any, is the one raised by
    /// the previous step; the statement is reset either way.
    pub(crate) fn reset(&mut self) -> Result<()> {
        self.check(unsafe { ffi::sqlite3_reset(self.stmt.as_ptr()) })
    }

    pub(crate) fn clear_bindings(&mut self) {
        unsafe { ffi::sqlite3_clear_bindings(self.stmt.as_ptr()) };
    }

    /// Release the statement. The native object is gone whatever the result.
    pub(crate) fn finalize(self) -> Result<()> {
        let stmt = self.stmt.as_ptr();
        std::mem::forget(self);
        let db = unsafe { ffi::sqlite3_db_handle(stmt) };
        let rc = unsafe { ffi::sqlite3_finalize(stmt) };
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(unsafe { last_error(db, rc) })
        }
    }

    pub(crate) fn column_count(&self) -> c_int {
        unsafe { ffi::sqlite3_column_count(self.stmt.as_ptr()) }
    }

    pub(crate) fn parameter_count(&self) -> c_int {
        unsafe { ffi::sqlite3_bind_parameter_count(self.stmt.as_ptr()) }
    }

    pub(crate) fn column_name(&self, index: c_int) -> Option<String> {
        let name = unsafe { ffi::sqlite3_column_name(self.stmt.as_ptr(), index) };
        if name.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned())
    }

    /// Fundamental datatype code of a column in the current row
    pub(crate) fn column_type(&self, index: c_int) -> c_int {
        unsafe { ffi::sqlite3_column_type(self.stmt.as_ptr(), index) }
    }

    pub(crate) fn column_int64(&self, index: c_int) -> i64 {
        unsafe { ffi::sqlite3_column_int64(self.stmt.as_ptr(), index) }
    }

    pub(crate) fn column_double(&self, index: c_int) -> f64 {
        unsafe { ffi::sqlite3_column_double(self.stmt.as_ptr(), index) }
    }

    pub(crate) fn column_text(&self, index: c_int) -> &[u8] {
        unsafe {
            let data = ffi::sqlite3_column_text(self.stmt.as_ptr(), index);
            let n = ffi::sqlite3_column_bytes(self.stmt.as_ptr(), index);
            if data.is_null() || n <= 0 {
                &[]
            } else {
                std::slice::from_raw_parts(data, n as usize)
            }
        }
    }

    pub(crate) fn column_blob(&self, index: c_int) -> &[u8] {
        unsafe {
            let data = ffi::sqlite3_column_blob(self.stmt.as_ptr(), index);
            let n = ffi::sqlite3_column_bytes(self.stmt.as_ptr(), index);
            if data.is_null() || n <= 0 {
                &[]
            } else {
                std::slice::from_raw_parts(data as *const u8, n as usize)
            }
        }
    }
}

impl Drop for NativeStatement {
    fn drop(&mut self) {
        unsafe { ffi::sqlite3_finalize(self.stmt.as_ptr()) };
    }
}
