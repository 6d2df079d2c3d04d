//! Call Adapter
//!
//! Foreign functions receive their arguments at positions 1..=n of their
//! frame. The adapter checks the count once, decodes the positions left to
//! right against the declared tuple type, and pushes a typed return tuple:
//!
//! ```ignore
//! fn example(stack: &mut Stack) -> usize {
//!     let (a, b): (f64, i64) = extract_arguments(stack);
//!     push_return(stack, (a, b.to_string()))
//! }
//! ```
//!
//! Argument errors are programming errors at the call site, so
//! `extract_arguments` raises them and the call produces no results.
//! Hosts reading results back after a protected call use the checked
//! [`collect_results`] instead.

use crate::binding::{DecodeError, DynamicBinding, DynamicEncode};
use ferry_core::{DynamicStack, RuntimeError, StackIndex};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgumentError {
    #[error("bad argument count (expected {expected}, got {found})")]
    Count { expected: usize, found: usize },

    #[error("bad argument #{position} ({source})")]
    Type {
        position: usize,
        #[source]
        source: DecodeError,
    },
}

/// A fixed-arity tuple decoded from consecutive stack positions
pub trait DecodeTuple: Sized {
    const ARITY: usize;

    /// Decode positions `first..first + ARITY` without consuming them
    fn read_from<S: DynamicStack + ?Sized>(
        stack: &mut S,
        first: StackIndex,
    ) -> Result<Self, ArgumentError>;
}

/// A fixed-arity tuple pushed element by element
pub trait EncodeTuple {
    const COUNT: usize;

    fn encode_all<S: DynamicStack + ?Sized>(&self, stack: &mut S);
}

macro_rules! impl_tuple {
    ($count:expr; $($name:ident : $index:tt),*) => {
        impl<$($name: DynamicBinding),*> DecodeTuple for ($($name,)*) {
            const ARITY: usize = $count;

            #[allow(unused_variables)]
            fn read_from<S: DynamicStack + ?Sized>(
                stack: &mut S,
                first: StackIndex,
            ) -> Result<Self, ArgumentError> {
                Ok(($(
                    $name::read(stack, first + $index).map_err(|source| ArgumentError::Type {
                        position: $index + 1,
                        source,
                    })?,
                )*))
            }
        }

        impl<$($name: DynamicEncode),*> EncodeTuple for ($($name,)*) {
            const COUNT: usize = $count;

            #[allow(unused_variables)]
            fn encode_all<S: DynamicStack + ?Sized>(&self, stack: &mut S) {
                $( self.$index.encode_value(stack); )*
            }
        }
    };
}

impl_tuple!(0;);
impl_tuple!(1; A: 0);
impl_tuple!(2; A: 0, B: 1);
impl_tuple!(3; A: 0, B: 1, C: 2);
impl_tuple!(4; A: 0, B: 1, C: 2, D: 3);
impl_tuple!(5; A: 0, B: 1, C: 2, D: 3, E: 4);
impl_tuple!(6; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_tuple!(7; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_tuple!(8; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

/// Compare the frame depth against the declared arity
pub fn check_arity<S>(stack: &S, expected: usize) -> Result<(), ArgumentError>
where
    S: DynamicStack + ?Sized,
{
    let found = stack.depth();
    if found == expected {
        Ok(())
    } else {
        Err(ArgumentError::Count { expected, found })
    }
}

/// Checked argument extraction
///
/// On success the argument slots are popped; on failure the stack is left
/// untouched.
pub fn read_arguments<A, S>(stack: &mut S) -> Result<A, ArgumentError>
where
    A: DecodeTuple,
    S: DynamicStack + ?Sized,
{
    check_arity(stack, A::ARITY)?;
    let args = A::read_from(stack, 1)?;
    stack.pop(A::ARITY);
    Ok(args)
}

/// Extract the call's arguments, raising on a count or type mismatch
pub fn extract_arguments<A, S>(stack: &mut S) -> A
where
    A: DecodeTuple,
    S: DynamicStack + ?Sized,
{
    match read_arguments(stack) {
        Ok(args) => args,
        Err(e) => stack.raise_error(e.to_string()),
    }
}

/// Push `values` in order and return how many slots they occupy
pub fn push_return<R, S>(stack: &mut S, values: R) -> usize
where
    R: EncodeTuple,
    S: DynamicStack + ?Sized,
{
    values.encode_all(stack);
    R::COUNT
}

/// Decode the `count` results on top of the stack and consume them
///
/// The results are popped whether or not decoding succeeds.
pub fn collect_results<R, S>(stack: &mut S, count: usize) -> Result<R, RuntimeError>
where
    R: DecodeTuple,
    S: DynamicStack + ?Sized,
{
    if count != R::ARITY {
        stack.pop(count);
        return Err(RuntimeError::ResultCount {
            expected: R::ARITY,
            found: count,
        });
    }

    let first = stack.depth() as StackIndex - count as StackIndex + 1;
    let results = R::read_from(stack, first);
    stack.pop(count);
    results.map_err(|e| match e {
        ArgumentError::Type { position, source } => RuntimeError::ResultType {
            position,
            message: source.to_string(),
        },
        ArgumentError::Count { expected, found } => {
            RuntimeError::ResultCount { expected, found }
        }
    })
}
