//! Runtime Error Handling
//!
//! Two channels carry errors out of a foreign call:
//!
//! - The raise path: `DynamicStack::raise_error` unwinds with a [`Raised`]
//!   payload. The protected call boundary (`Stack::call`) catches it,
//!   restores the caller's frame, and returns [`RuntimeError::Raised`].
//! - The last-error slot: every caught raise is also recorded in
//!   thread-local state, so hosts that poll can pick it up later.
//!
//! # Usage
//!
//! ```ignore
//! match stack.call(2) {
//!     Ok(count) => { /* `count` results on top of the stack */ }
//!     Err(RuntimeError::Raised(message)) => eprintln!("{message}"),
//!     Err(other) => return Err(other),
//! }
//!
//! // Or, polling:
//! if has_runtime_error() {
//!     let message = take_runtime_error();
//! }
//! ```

use crate::value::Tag;
use std::cell::RefCell;
use thiserror::Error;

thread_local! {
    /// Thread-local storage for the last runtime error message
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Unwind payload of a raised error
///
/// Raised with `std::panic::resume_unwind`, which skips the panic hook, so a
/// raise that is caught by the call boundary prints nothing.
#[derive(Debug, Clone)]
pub struct Raised {
    pub message: String,
}

/// Abort the in-progress foreign call with `message`
///
/// Only meaningful inside a protected call; `Stack::raise_error` checks that.
pub fn raise(message: String) -> ! {
    std::panic::resume_unwind(Box::new(Raised { message }))
}

/// Errors surfaced to the host by the runtime
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// A foreign call raised; the call produced no results
    #[error("{0}")]
    Raised(String),

    #[error("attempt to call undefined function '{0}'")]
    UnknownFunction(String),

    #[error("attempt to call a value of type {0}")]
    NotCallable(Tag),

    #[error("call needs {needed} stack values, frame has {available}")]
    StackUnderflow { needed: usize, available: usize },

    #[error("function returned {declared} values but only {available} are on the stack")]
    ReturnCount { declared: usize, available: usize },

    #[error("expected {expected} results, got {found}")]
    ResultCount { expected: usize, found: usize },

    #[error("bad result #{position} ({message})")]
    ResultType { position: usize, message: String },

    #[error("bad global '{name}' ({message})")]
    GlobalType { name: String, message: String },
}

/// Set the last runtime error message
pub fn set_runtime_error(msg: impl Into<String>) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some(msg.into());
    });
}

/// Take (and clear) the last runtime error message
pub fn take_runtime_error() -> Option<String> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}

/// Check if there's a pending runtime error
pub fn has_runtime_error() -> bool {
    LAST_ERROR.with(|e| e.borrow().is_some())
}

/// Clear any pending runtime error
pub fn clear_runtime_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

/// Format a panic payload into an error message
pub fn format_panic_payload(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(raised) = payload.downcast_ref::<Raised>() {
        raised.message.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
