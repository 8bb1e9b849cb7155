///
/// hostsql SQLite3 Support
///
/// Lets a dynamically-typed host drive SQLite through integer handles,
/// never exposing native pointers. Uses rusqlite's bundled SQLite through
/// its raw ffi module.
///
/// Architecture:
/// - `HandleTable`: slot array behind every handle; lowest free slot first,
///   doubling growth, no compaction.
/// - `Registry`: table of connections, each owning a table of prepared
///   statements. Statement handles are scoped to their connection.
/// - Statement lifecycle: prepare, bind, step, column, reset, finalize.
/// - `marshal`: host values to SQLite binds and columns back to host values
///   (multibyte strings are TEXT, unibyte strings are BLOB).
/// - `Command`: the named command surface the host calls.
/// - `abi`: extern "C" functions over a process-wide registry; errors go
///   through hostsql-core's error slot.
///
/// Closing a connection with live statements is refused by the engine and
/// leaves the connection open; finalize statements first.
///

pub mod config;
pub mod error;
pub mod handle_table;

#[cfg(feature = "engine")]
pub mod abi;
#[cfg(feature = "engine")]
pub mod command;
#[cfg(feature = "engine")]
pub mod marshal;
#[cfg(feature = "engine")]
mod native;
#[cfg(feature = "engine")]
pub mod registry;
#[cfg(feature = "engine")]
mod statement;

pub use config::{Config, OpenConfig, RegistryConfig, ResetPolicy};
pub use error::{ConfigError, DbError, HandleKind, Result};
pub use handle_table::{HandleTable, SlotError};

#[cfg(feature = "engine")]
pub use command::{COMMAND_NAMES, Command, call};
#[cfg(feature = "engine")]
pub use registry::Registry;
#[cfg(feature = "engine")]
pub use statement::StatementState;

/// Whether the SQLite engine was compiled in
pub fn available() -> bool {
    cfg!(feature = "engine")
}

/// 1 if the SQLite engine was compiled in, 0 otherwise
#[unsafe(no_mangle)]
pub extern "C" fn hostsql_sqlite3_available() -> i64 {
    i64::from(available())
}
