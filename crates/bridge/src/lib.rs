//! Ferry Bridge: typed value marshalling over a dynamic value stack
//!
//! Hosts exchange Rust values with the runtime through [`DynamicBinding`]
//! implementations, one per host type. Containers recurse through their
//! element bindings; foreign functions use the call adapter to pull typed
//! arguments off their frame and push typed results back.
//!
//! # Modules
//!
//! - `binding`: The `DynamicBinding` trait and `DecodeError`
//! - `scalar`: Numbers, integers, strings, booleans, opaque handles
//! - `container`: Sequences and mappings as tables, traversal cursor
//! - `call`: Arity checks, argument extraction, return pushing
//! - `globals`: Typed read/write of named globals
//! - `runtime`: `Runtime` lifecycle, function and library registration
//!
//! # Example
//!
//! ```ignore
//! use ferry_bridge::{Function, Runtime, Stack, extract_arguments, push_return};
//!
//! fn example(stack: &mut Stack) -> usize {
//!     let (a, b): (f64, i64) = extract_arguments(stack);
//!     push_return(stack, (a, b.to_string()))
//! }
//!
//! let mut runtime = Runtime::with_defaults();
//! runtime.register(&Function::new("example", example));
//! let (x, s): (f64, String) = runtime.call("example", (3.5, 7i64))?;
//! ```

pub mod binding;
pub mod call;
pub mod container;
pub mod globals;
pub mod runtime;
pub mod scalar;

pub use binding::{DecodeError, DynamicBinding, DynamicEncode};
pub use call::{
    ArgumentError, DecodeTuple, EncodeTuple, check_arity, collect_results, extract_arguments,
    push_return, read_arguments,
};
pub use container::{
    MappingTarget, Traversal, decode_mapping, decode_sequence, encode_mapping, encode_sequence,
    read_mapping, read_sequence,
};
pub use runtime::{Function, Library, Runtime};
pub use scalar::{decode_checked, decode_strict, encode};

// The runtime side, re-exported for hosts that only depend on the bridge
pub use ferry_core;
pub use ferry_core::{
    DynamicStack, ForeignFn, RuntimeConfig, RuntimeError, Stack, StackIndex, Tag, Value,
};
