//! Ferry Core: a compact dynamic runtime behind a single value stack
//!
//! This crate provides the runtime side of the ferry value bridge: the
//! tagged values a script talks about, the tables it builds, and the framed
//! stack through which the host and the runtime exchange them.
//!
//! Key design principles:
//! - Value: what the runtime talks about (Number, Integer, String, Table, etc.)
//! - Tag: the runtime-level type marker inspected before every typed read
//! - Stack: one contiguous sequence of values, split into call frames
//! - DynamicStack: the protocol the bridge is written against
//!
//! # Modules
//!
//! - `value`: Core Value enum, Tag, and hashable TableKey
//! - `table`: Tables with a positional part and an insertion-ordered keyed part
//! - `stack`: Framed stack, globals, and protected foreign calls
//! - `protocol`: The `DynamicStack` trait (push/peek/read/pop/traverse/raise)
//! - `error`: Raise payloads, `RuntimeError`, thread-local last-error channel
//! - `config`: `RuntimeConfig` (builder or TOML)

pub mod config;
pub mod error;
pub mod protocol;
pub mod stack;
pub mod table;
pub mod value;

// Re-export key types and functions
pub use config::{ConfigError, RuntimeConfig};
pub use error::{
    Raised, RuntimeError, clear_runtime_error, format_panic_payload, has_runtime_error,
    set_runtime_error, take_runtime_error,
};
pub use protocol::{DynamicStack, StackIndex};
pub use stack::{ForeignFn, Stack};
pub use table::{Table, TableError};
pub use value::{TableKey, TableRef, Tag, Value};
