//! Typed access to named globals

use crate::binding::{DecodeError, DynamicBinding, DynamicEncode};
use crate::scalar::decode_checked;
use ferry_core::DynamicStack;

/// Encode `value` and store it as global `name`
pub fn set_global<T, S>(stack: &mut S, name: &str, value: &T)
where
    T: DynamicEncode + ?Sized,
    S: DynamicStack + ?Sized,
{
    value.encode_value(stack);
    stack.set_global(name);
}

/// Read global `name` as `T`
///
/// An unset global reads as nil, which no binding accepts. The stack depth
/// is unchanged either way.
pub fn get_global<T, S>(stack: &mut S, name: &str) -> Result<T, DecodeError>
where
    T: DynamicBinding,
    S: DynamicStack + ?Sized,
{
    stack.get_global(name);
    decode_checked(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::{Stack, Tag};

    #[test]
    fn test_unset_global_is_nil_mismatch() {
        let mut stack = Stack::with_defaults();
        let result = get_global::<String, _>(&mut stack, "MISSING");
        assert_eq!(
            result,
            Err(DecodeError::TypeMismatch {
                expected: "string".to_string(),
                found: Tag::Nil
            })
        );
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_overwrite_changes_type() {
        let mut stack = Stack::with_defaults();
        set_global(&mut stack, "x", &1i64);
        set_global(&mut stack, "x", "one");
        assert!(get_global::<i64, _>(&mut stack, "x").is_err());
        assert_eq!(get_global::<String, _>(&mut stack, "x").unwrap(), "one");
    }
}
