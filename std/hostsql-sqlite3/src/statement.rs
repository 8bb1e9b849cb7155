///
/// Prepared statement lifecycle.
///
/// States:
/// - Ready: freshly prepared or reset, no pending row
/// - HasRow: the last step produced a row; columns can be read
/// - Exhausted: the last step reported completion or failed
///
/// Binding never changes the state. Reading columns outside HasRow is not
/// rejected; the engine answers NULL there.
///

use std::ffi::c_int;

use hostsql_core::Value;
use tracing::{trace, warn};

use crate::error::{DbError, Result};
use crate::marshal;
use crate::native::NativeStatement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    Ready,
    HasRow,
    Exhausted,
}

pub(crate) struct StatementRecord {
    native: NativeStatement,
    state: StatementState,
    sql: String,
}

/// Host positions and indices that do not fit a C int can never name a
/// parameter or column; report them as the engine would for an unused one.
fn c_index(index: i64) -> Option<c_int> {
    c_int::try_from(index).ok()
}

impl StatementRecord {
    pub(crate) fn new(native: NativeStatement, sql: String) -> Self {
        Self {
            native,
            state: StatementState::Ready,
            sql,
        }
    }

    pub(crate) fn state(&self) -> StatementState {
        self.state
    }

    pub(crate) fn sql(&self) -> &str {
        &self.sql
    }

    pub(crate) fn bind(&mut self, position: i64, value: &Value) -> Result<()> {
        marshal::check_bindable(value)?;
        let position = c_index(position).ok_or_else(|| {
            DbError::engine(rusqlite::ffi::SQLITE_RANGE, "column index out of range")
        })?;
        trace!(position, kind = value.type_name(), "bind");
        marshal::bind_value(&mut self.native, position, value)
    }

    pub(crate) fn step(&mut self) -> Result<bool> {
        match self.native.step() {
            Ok(has_row) => {
                self.state = if has_row {
                    StatementState::HasRow
                } else {
                    StatementState::Exhausted
                };
                trace!(has_row, "step");
                Ok(has_row)
            }
            Err(e) => {
                warn!(sql = %self.sql, error = %e, "step failed");
                self.state = StatementState::Exhausted;
                Err(e)
            }
        }
    }

    pub(crate) fn column(&self, index: i64) -> Result<Value> {
        match c_index(index) {
            Some(index) => marshal::column_value(&self.native, index),
            None => Ok(Value::Nil),
        }
    }

    /// Raw engine type code of a result column, read without decoding the
    /// value
    pub(crate) fn column_type(&self, index: i64) -> c_int {
        match c_index(index) {
            Some(index) => self.native.column_type(index),
            None => rusqlite::ffi::SQLITE_NULL,
        }
    }

    pub(crate) fn column_count(&self) -> i64 {
        i64::from(self.native.column_count())
    }

    pub(crate) fn column_name(&self, index: i64) -> Option<String> {
        c_index(index).and_then(|index| self.native.column_name(index))
    }

    pub(crate) fn parameter_count(&self) -> i64 {
        i64::from(self.native.parameter_count())
    }

    /// Rewind and clear bindings. The statement is Ready afterwards even
    /// when the engine reports the previous step's failure.
    pub(crate) fn reset(&mut self) -> Result<()> {
        let result = self.native.reset();
        self.native.clear_bindings();
        self.state = StatementState::Ready;
        result
    }

    pub(crate) fn finalize(self) -> Result<()> {
        self.native.finalize()
    }
}
