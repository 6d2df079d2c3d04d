//! Scalar Codec
//!
//! | Host type            | Tag       |
//! |----------------------|-----------|
//! | `f64`                | number    |
//! | `i64`                | integer   |
//! | `String`             | string    |
//! | `bool`               | boolean   |
//! | `*mut T`, `*const T` | reference |
//!
//! Tags are matched exactly. An integer slot is not a number, a nil slot is
//! not `false`, and a non-reference slot never yields a null handle.

use crate::binding::{DecodeError, DynamicBinding, DynamicEncode};
use ferry_core::{DynamicStack, StackIndex};
use std::ffi::c_void;

/// Push `value`
pub fn encode<T, S>(stack: &mut S, value: &T)
where
    T: DynamicEncode + ?Sized,
    S: DynamicStack + ?Sized,
{
    value.encode_value(stack);
}

/// Decode and consume the top slot, reporting a mismatch instead of raising
///
/// The slot is popped whether or not decoding succeeds.
pub fn decode_checked<T, S>(stack: &mut S) -> Result<T, DecodeError>
where
    T: DynamicBinding,
    S: DynamicStack + ?Sized,
{
    let result = T::read(stack, -1);
    stack.pop(1);
    result
}

/// Decode and consume the top slot, raising on a mismatch
pub fn decode_strict<T, S>(stack: &mut S) -> T
where
    T: DynamicBinding,
    S: DynamicStack + ?Sized,
{
    match decode_checked(stack) {
        Ok(value) => value,
        Err(e) => stack.raise_error(e.to_string()),
    }
}

impl DynamicBinding for f64 {
    fn type_name() -> String {
        "number".to_string()
    }

    fn encode<S: DynamicStack + ?Sized>(&self, stack: &mut S) {
        stack.push_number(*self);
    }

    fn read<S: DynamicStack + ?Sized>(
        stack: &mut S,
        index: StackIndex,
    ) -> Result<Self, DecodeError> {
        stack
            .read_number(index)
            .ok_or_else(|| DecodeError::mismatch::<Self>(stack.peek_tag(index)))
    }
}

impl DynamicBinding for i64 {
    fn type_name() -> String {
        "integer".to_string()
    }

    fn encode<S: DynamicStack + ?Sized>(&self, stack: &mut S) {
        stack.push_integer(*self);
    }

    fn read<S: DynamicStack + ?Sized>(
        stack: &mut S,
        index: StackIndex,
    ) -> Result<Self, DecodeError> {
        stack
            .read_integer(index)
            .ok_or_else(|| DecodeError::mismatch::<Self>(stack.peek_tag(index)))
    }
}

impl DynamicBinding for String {
    fn type_name() -> String {
        "string".to_string()
    }

    fn encode<S: DynamicStack + ?Sized>(&self, stack: &mut S) {
        stack.push_string(self);
    }

    fn read<S: DynamicStack + ?Sized>(
        stack: &mut S,
        index: StackIndex,
    ) -> Result<Self, DecodeError> {
        match stack.read_string(index) {
            Some(s) => Ok(s.to_string()),
            None => Err(DecodeError::mismatch::<Self>(stack.peek_tag(index))),
        }
    }
}

impl DynamicBinding for bool {
    fn type_name() -> String {
        "boolean".to_string()
    }

    fn encode<S: DynamicStack + ?Sized>(&self, stack: &mut S) {
        stack.push_boolean(*self);
    }

    fn read<S: DynamicStack + ?Sized>(
        stack: &mut S,
        index: StackIndex,
    ) -> Result<Self, DecodeError> {
        stack
            .read_boolean(index)
            .ok_or_else(|| DecodeError::mismatch::<Self>(stack.peek_tag(index)))
    }
}

// Handles carry no type information; the pointee type is the caller's claim.

impl<T> DynamicBinding for *mut T {
    fn type_name() -> String {
        "reference".to_string()
    }

    fn encode<S: DynamicStack + ?Sized>(&self, stack: &mut S) {
        stack.push_reference(self.cast::<c_void>());
    }

    fn read<S: DynamicStack + ?Sized>(
        stack: &mut S,
        index: StackIndex,
    ) -> Result<Self, DecodeError> {
        stack
            .read_reference(index)
            .map(|p| p.cast::<T>())
            .ok_or_else(|| DecodeError::mismatch::<Self>(stack.peek_tag(index)))
    }
}

impl<T> DynamicBinding for *const T {
    fn type_name() -> String {
        "reference".to_string()
    }

    fn encode<S: DynamicStack + ?Sized>(&self, stack: &mut S) {
        stack.push_reference(self.cast::<c_void>().cast_mut());
    }

    fn read<S: DynamicStack + ?Sized>(
        stack: &mut S,
        index: StackIndex,
    ) -> Result<Self, DecodeError> {
        stack
            .read_reference(index)
            .map(|p| p.cast::<T>().cast_const())
            .ok_or_else(|| DecodeError::mismatch::<Self>(stack.peek_tag(index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::{Stack, Tag};

    #[test]
    fn test_checked_decode_consumes_on_failure() {
        let mut stack = Stack::with_defaults();
        stack.push_string("below");
        stack.push_integer(7);

        let result = decode_checked::<f64, _>(&mut stack);
        assert_eq!(
            result,
            Err(DecodeError::TypeMismatch {
                expected: "number".to_string(),
                found: Tag::Integer
            })
        );
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_nil_is_not_false() {
        let mut stack = Stack::with_defaults();
        stack.push_nil();
        assert!(decode_checked::<bool, _>(&mut stack).is_err());
    }

    #[test]
    fn test_handle_from_non_reference_fails() {
        let mut stack = Stack::with_defaults();
        stack.push_integer(0);
        let result = decode_checked::<*mut u8, _>(&mut stack);
        assert_eq!(
            result.map(|p| p.is_null()),
            Err(DecodeError::TypeMismatch {
                expected: "reference".to_string(),
                found: Tag::Integer
            })
        );
    }

    #[test]
    fn test_const_handle_round_trip() {
        let target = 42u32;
        let handle: *const u32 = &target;

        let mut stack = Stack::with_defaults();
        encode(&mut stack, &handle);
        assert_eq!(stack.peek_tag(-1), Tag::Reference);
        let back = decode_checked::<*const u32, _>(&mut stack).unwrap();
        assert_eq!(back, handle);
    }

    #[test]
    fn test_read_is_non_consuming() {
        let mut stack = Stack::with_defaults();
        stack.push_boolean(true);
        assert_eq!(bool::read(&mut stack, 1), Ok(true));
        assert_eq!(bool::read(&mut stack, -1), Ok(true));
        assert_eq!(stack.depth(), 1);
    }
}
