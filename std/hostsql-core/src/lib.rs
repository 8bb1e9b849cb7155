//!
//! hostsql-core - Host Value Model
//!
//! This crate provides the types shared across all hostsql crates:
//!
//! - `Value` for the host's dynamically-typed values (nil, t, integers,
//!   floats, strings, symbols, lists)
//! - `HostString` for byte strings that carry a multibyte/unibyte flag
//! - A thread-local error slot for reporting failures across the C ABI
//!
//! Nothing here knows about SQLite; the sqlite3 crate maps these values onto
//! the engine's typed bind and column protocol.
//!

pub mod exception;
pub mod value;

pub use exception::*;
pub use value::*;
