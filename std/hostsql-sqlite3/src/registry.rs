///
/// Connection registry: the two-level handle table.
///
/// The outer table holds connection records; each record owns its own
/// statement table, so a statement handle only means something next to the
/// connection handle it was prepared on. Every operation validates the
/// connection handle (range, then liveness) and then the statement handle
/// inside that connection before calling into the engine.
///
/// Closing a connection that still has prepared statements is refused by
/// the engine (SQLITE_BUSY); the connection then stays open under the same
/// handle. Finalize the statements first.
///

use hostsql_core::Value;
use tracing::{debug, warn};

use crate::config::{Config, MAX_INITIAL_CAPACITY, ResetPolicy};
use crate::error::{HandleKind, Result};
use crate::handle_table::HandleTable;
use crate::native::NativeConnection;
use crate::statement::{StatementRecord, StatementState};

struct ConnectionRecord {
    // Fields drop in order: statements are finalized before the connection
    // itself is released.
    statements: HandleTable<StatementRecord>,
    native: NativeConnection,
    location: String,
}

pub struct Registry {
    connections: HandleTable<ConnectionRecord>,
    config: Config,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            connections: HandleTable::with_capacity(
                config.registry.initial_connections.min(MAX_INITIAL_CAPACITY),
            ),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current size of the connection table
    pub fn connection_capacity(&self) -> usize {
        self.connections.capacity()
    }

    /// Number of open connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Current size of a connection's statement table
    pub fn statement_capacity(&self, conn: i64) -> Result<usize> {
        Ok(self.connection(conn)?.statements.capacity())
    }

    /// Number of live statements on a connection
    pub fn statement_count(&self, conn: i64) -> Result<usize> {
        Ok(self.connection(conn)?.statements.len())
    }

    fn connection(&self, conn: i64) -> Result<&ConnectionRecord> {
        self.connections
            .get(conn)
            .map_err(|e| HandleKind::Connection.error(e))
    }

    fn connection_mut(&mut self, conn: i64) -> Result<&mut ConnectionRecord> {
        self.connections
            .get_mut(conn)
            .map_err(|e| HandleKind::Connection.error(e))
    }

    fn statement(&self, conn: i64, stmt: i64) -> Result<&StatementRecord> {
        self.connection(conn)?
            .statements
            .get(stmt)
            .map_err(|e| HandleKind::Statement.error(e))
    }

    fn statement_mut(&mut self, conn: i64, stmt: i64) -> Result<&mut StatementRecord> {
        self.connection_mut(conn)?
            .statements
            .get_mut(stmt)
            .map_err(|e| HandleKind::Statement.error(e))
    }

    /// Open the database at `location`, creating it if the config allows
    pub fn open(&mut self, location: impl AsRef<[u8]>) -> Result<i64> {
        let location = location.as_ref();
        let open = &self.config.open;
        let initial_statements = self.config.registry.initial_statements.min(MAX_INITIAL_CAPACITY);
        let conn = self.connections.try_insert_with(|_| {
            let native = NativeConnection::open(location, open)?;
            Ok(ConnectionRecord {
                statements: HandleTable::with_capacity(initial_statements),
                native,
                location: String::from_utf8_lossy(location).into_owned(),
            })
        });
        match conn {
            Ok(conn) => {
                debug!(conn, location = %String::from_utf8_lossy(location), "opened connection");
                Ok(conn as i64)
            }
            Err(e) => {
                warn!(location = %String::from_utf8_lossy(location), error = %e, "open failed");
                Err(e)
            }
        }
    }

    /// Close a connection. On failure the connection stays open and the
    /// handle stays valid.
    pub fn close(&mut self, conn: i64) -> Result<()> {
        let (index, record) = self
            .connections
            .take(conn)
            .map_err(|e| HandleKind::Connection.error(e))?;
        let ConnectionRecord {
            statements,
            native,
            location,
        } = record;
        match native.close() {
            Ok(()) => {
                debug_assert!(statements.is_empty());
                self.connections.discard(index);
                debug!(conn, location = %location, "closed connection");
                Ok(())
            }
            Err((native, e)) => {
                warn!(conn, error = %e, "close failed");
                self.connections.restore(
                    index,
                    ConnectionRecord {
                        statements,
                        native,
                        location,
                    },
                );
                Err(e)
            }
        }
    }

    /// Compile `sql` into a new statement handle on `conn`
    pub fn prepare(&mut self, conn: i64, sql: impl AsRef<[u8]>) -> Result<i64> {
        let sql = sql.as_ref();
        let record = self.connection_mut(conn)?;
        let native = &record.native;
        let stmt = record.statements.try_insert_with(|_| {
            let compiled = native.prepare(sql)?;
            Ok(StatementRecord::new(
                compiled,
                String::from_utf8_lossy(sql).into_owned(),
            ))
        });
        match stmt {
            Ok(stmt) => {
                debug!(conn, stmt, "prepared statement");
                Ok(stmt as i64)
            }
            Err(e) => {
                warn!(conn, error = %e, "prepare failed");
                Err(e)
            }
        }
    }

    /// Bind `value` to the 1-based parameter `position`
    pub fn bind(&mut self, conn: i64, stmt: i64, position: i64, value: &Value) -> Result<()> {
        self.statement_mut(conn, stmt)?.bind(position, value)
    }

    /// Advance the cursor; true when a row is available
    pub fn step(&mut self, conn: i64, stmt: i64) -> Result<bool> {
        self.statement_mut(conn, stmt)?.step()
    }

    /// Value of the 0-based column `index` in the current row
    pub fn column(&self, conn: i64, stmt: i64, index: i64) -> Result<Value> {
        self.statement(conn, stmt)?.column(index)
    }

    /// Engine type code (`SQLITE_INTEGER` etc.) of a column in the current row
    pub fn column_type(&self, conn: i64, stmt: i64, index: i64) -> Result<i32> {
        Ok(self.statement(conn, stmt)?.column_type(index))
    }

    pub fn column_count(&self, conn: i64, stmt: i64) -> Result<i64> {
        Ok(self.statement(conn, stmt)?.column_count())
    }

    pub fn column_name(&self, conn: i64, stmt: i64, index: i64) -> Result<Option<String>> {
        Ok(self.statement(conn, stmt)?.column_name(index))
    }

    pub fn parameter_count(&self, conn: i64, stmt: i64) -> Result<i64> {
        Ok(self.statement(conn, stmt)?.parameter_count())
    }

    pub fn state(&self, conn: i64, stmt: i64) -> Result<StatementState> {
        Ok(self.statement(conn, stmt)?.state())
    }

    pub fn sql(&self, conn: i64, stmt: i64) -> Result<&str> {
        Ok(self.statement(conn, stmt)?.sql())
    }

    /// Return the statement to Ready, clearing its bindings.
    ///
    /// With `ResetPolicy::Release` the handle is freed afterwards (and the
    /// statement finalized), whatever the engine reports.
    pub fn reset(&mut self, conn: i64, stmt: i64) -> Result<()> {
        let policy = self.config.registry.reset_policy;
        match policy {
            ResetPolicy::Retain => {
                let result = self.statement_mut(conn, stmt)?.reset();
                if let Err(e) = &result {
                    warn!(conn, stmt, error = %e, "reset reported an error");
                }
                result
            }
            ResetPolicy::Release => {
                let statements = &mut self.connection_mut(conn)?.statements;
                let (index, mut record) = statements
                    .take(stmt)
                    .map_err(|e| HandleKind::Statement.error(e))?;
                statements.discard(index);
                let reset = record.reset();
                let finalized = record.finalize();
                debug!(conn, stmt, "reset released statement");
                reset.and(finalized)
            }
        }
    }

    /// Release a statement. The handle is freed even when the engine
    /// reports an error.
    pub fn finalize(&mut self, conn: i64, stmt: i64) -> Result<()> {
        let statements = &mut self.connection_mut(conn)?.statements;
        let index = statements
            .check(stmt)
            .map_err(|e| HandleKind::Statement.error(e))?;
        let result = match statements.release(index) {
            Some(record) => record.finalize(),
            None => Ok(()),
        };
        match &result {
            Ok(()) => debug!(conn, stmt, "finalized statement"),
            Err(e) => warn!(conn, stmt, error = %e, "finalize reported an error"),
        }
        result
    }

    /// Rows modified by the most recent statement on `conn`
    pub fn changes(&self, conn: i64) -> Result<i64> {
        Ok(self.connection(conn)?.native.changes())
    }

    pub fn last_insert_rowid(&self, conn: i64) -> Result<i64> {
        Ok(self.connection(conn)?.native.last_insert_rowid())
    }

    /// Location each open connection was opened with, by handle
    pub fn locations(&self) -> impl Iterator<Item = (i64, &str)> {
        self.connections
            .iter()
            .map(|(i, record)| (i as i64, record.location.as_str()))
    }
}
