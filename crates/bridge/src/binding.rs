//! Typed Bindings
//!
//! A `DynamicBinding` ties one host type to exactly one dynamic tag and one
//! conversion pair. Scalars bind to a single slot; containers bind to a
//! table and recurse through their element bindings. A host type without an
//! implementation cannot be passed across the stack at all.
//!
//! Reads are non-consuming and never raise: a mismatch is reported as a
//! [`DecodeError`] and the stack is left exactly as it was found. Whether a
//! mismatch becomes a raise is decided by the caller (see
//! [`decode_strict`](crate::decode_strict) and
//! [`extract_arguments`](crate::extract_arguments)).

use ferry_core::{DynamicStack, StackIndex, Tag};
use thiserror::Error;

/// Why a stack slot could not be decoded as a host type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: Tag },

    #[error("malformed {expected}: {reason}")]
    Malformed { expected: String, reason: String },

    /// An element failed inside a container; the container as a whole fails
    #[error("bad element [{key}] in {expected}: {source}")]
    Element {
        expected: String,
        key: String,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    pub fn mismatch<T: DynamicBinding>(found: Tag) -> Self {
        DecodeError::TypeMismatch {
            expected: T::type_name(),
            found,
        }
    }

    /// The innermost error, following `Element` wrappers
    pub fn root(&self) -> &DecodeError {
        match self {
            DecodeError::Element { source, .. } => source.root(),
            other => other,
        }
    }
}

pub trait DynamicBinding: Sized {
    /// Name used in diagnostics, e.g. `integer` or `sequence<string>`
    fn type_name() -> String;

    /// Push exactly one value representing `self`
    fn encode<S: DynamicStack + ?Sized>(&self, stack: &mut S);

    /// Decode the value at `index` without consuming it
    ///
    /// Must leave the stack depth unchanged on success and on failure.
    fn read<S: DynamicStack + ?Sized>(stack: &mut S, index: StackIndex)
    -> Result<Self, DecodeError>;
}

/// Anything that can be pushed, including borrowed strings
///
/// Every [`DynamicBinding`] encodes through this trait. `str` and `&str`
/// encode as strings but have no read side.
pub trait DynamicEncode {
    fn encode_value<S: DynamicStack + ?Sized>(&self, stack: &mut S);
}

impl<T: DynamicBinding> DynamicEncode for T {
    fn encode_value<S: DynamicStack + ?Sized>(&self, stack: &mut S) {
        self.encode(stack);
    }
}

impl DynamicEncode for str {
    fn encode_value<S: DynamicStack + ?Sized>(&self, stack: &mut S) {
        stack.push_string(self);
    }
}

impl DynamicEncode for &str {
    fn encode_value<S: DynamicStack + ?Sized>(&self, stack: &mut S) {
        stack.push_string(self);
    }
}
