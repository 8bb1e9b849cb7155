//!
//! Host Error Slot
//!
//! Provides thread-local storage for the last failure raised by a C ABI call.
//! ABI functions return a sentinel and record the failure here; the host then
//! reads the kind, native code and message, and clears the slot.
//!
//! Error kind IDs:
//! - 0: None
//! - 1: RangeError (handle outside table bounds)
//! - 2: InvalidHandleError (slot empty)
//! - 3: InvalidValueError (value cannot be bound)
//! - 4: EngineError (native call failed)
//! - 5: FatalError (engine contract mismatch)
//! - 6: WrongTypeError (argument of the wrong host type)
//! - 7: ArityError (wrong number of arguments)
//! - 8: UnknownCommandError
//! - 9: ConfigError
//!

use std::cell::{Cell, RefCell};

thread_local! {
    static CURRENT_ERROR_KIND: Cell<i64> = const { Cell::new(0) };
    static CURRENT_ERROR_CODE: Cell<i64> = const { Cell::new(0) };
    static CURRENT_ERROR_MESSAGE: RefCell<String> = const { RefCell::new(String::new()) };
}

pub const ERROR_KIND_NONE: i64 = 0;
pub const ERROR_KIND_RANGE: i64 = 1;
pub const ERROR_KIND_INVALID_HANDLE: i64 = 2;
pub const ERROR_KIND_INVALID_VALUE: i64 = 3;
pub const ERROR_KIND_ENGINE: i64 = 4;
pub const ERROR_KIND_FATAL: i64 = 5;
pub const ERROR_KIND_WRONG_TYPE: i64 = 6;
pub const ERROR_KIND_ARITY: i64 = 7;
pub const ERROR_KIND_UNKNOWN_COMMAND: i64 = 8;
pub const ERROR_KIND_CONFIG: i64 = 9;

/// Snapshot of the pending error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostError {
    pub kind: i64,
    pub code: i64,
    pub message: String,
}

/// Record a failure for the current thread, replacing any pending one
pub fn set_error(kind: i64, code: i64, message: &str) {
    CURRENT_ERROR_KIND.with(|k| k.set(kind));
    CURRENT_ERROR_CODE.with(|c| c.set(code));
    CURRENT_ERROR_MESSAGE.with(|m| {
        let mut m = m.borrow_mut();
        m.clear();
        m.push_str(message);
    });
}

/// Pending error, if any
pub fn current_error() -> Option<HostError> {
    let kind = CURRENT_ERROR_KIND.with(|k| k.get());
    if kind == ERROR_KIND_NONE {
        return None;
    }
    Some(HostError {
        kind,
        code: CURRENT_ERROR_CODE.with(|c| c.get()),
        message: CURRENT_ERROR_MESSAGE.with(|m| m.borrow().clone()),
    })
}

pub fn clear_error() {
    CURRENT_ERROR_KIND.with(|k| k.set(ERROR_KIND_NONE));
    CURRENT_ERROR_CODE.with(|c| c.set(0));
    CURRENT_ERROR_MESSAGE.with(|m| m.borrow_mut().clear());
}

/// Kind of the pending error (0 if none)
#[unsafe(no_mangle)]
pub extern "C" fn hostsql_error_kind() -> i64 {
    CURRENT_ERROR_KIND.with(|k| k.get())
}

/// Native result code of the pending error (0 unless it came from the engine)
#[unsafe(no_mangle)]
pub extern "C" fn hostsql_error_code() -> i64 {
    CURRENT_ERROR_CODE.with(|c| c.get())
}

/// Check if there's a pending error
#[unsafe(no_mangle)]
pub extern "C" fn hostsql_error_check() -> i64 {
    if hostsql_error_kind() == ERROR_KIND_NONE { 0 } else { 1 }
}

/// Copy the pending message into `buf` (truncated to `cap` bytes).
/// Returns the full message length so the caller can retry with a larger buffer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hostsql_error_message(buf: *mut u8, cap: usize) -> usize {
    CURRENT_ERROR_MESSAGE.with(|m| {
        let m = m.borrow();
        let n = m.len().min(cap);
        if !buf.is_null() && n > 0 {
            unsafe { std::ptr::copy_nonoverlapping(m.as_ptr(), buf, n) };
        }
        m.len()
    })
}

/// Clear the pending error (called after the host handles it)
#[unsafe(no_mangle)]
pub extern "C" fn hostsql_error_clear() {
    clear_error();
}
