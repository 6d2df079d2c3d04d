//! Container Codec
//!
//! Sequences (`Vec<T>`) and mappings (`HashMap<K, V>`, `BTreeMap<K, V>`)
//! travel as tables. Encoding builds the table entry by entry through the
//! element bindings; decoding walks it with the runtime's traversal step.
//!
//! ## Traversal layout
//!
//! ```text
//!   ... table nil             ← Traversal::new pushes the sentinel cursor
//!   ... table key value       ← advance() returned true
//!   ... table key             ← next advance() pops the value, then steps
//!   ... table                 ← advance() returned false, cursor consumed
//! ```
//!
//! Elements are decoded into a staging buffer and only handed out once the
//! whole table has decoded, so a failing element never yields a partial
//! container. Dropping a `Traversal` early (on `?`) pops whatever it left
//! above the table, so every exit path restores the starting depth.
//!
//! Nesting recurses through the element bindings; its depth is bounded only
//! by the host call stack.

use crate::binding::{DecodeError, DynamicBinding, DynamicEncode};
use crate::scalar::decode_checked;
use ferry_core::{DynamicStack, StackIndex, Tag};
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use tracing::trace;

/// Ordered traversal cursor over the table at a fixed position
pub struct Traversal<'s, S: DynamicStack + ?Sized> {
    stack: &'s mut S,
    table: StackIndex,
    base_depth: usize,
    finished: bool,
}

impl<'s, S: DynamicStack + ?Sized> Traversal<'s, S> {
    pub fn new(stack: &'s mut S, table: StackIndex) -> Self {
        let table = stack.absolute(table);
        let base_depth = stack.depth();
        stack.push_nil();
        Traversal {
            stack,
            table,
            base_depth,
            finished: false,
        }
    }

    /// Step to the next entry, leaving its key at -2 and its value at -1
    ///
    /// Returns false once the table is exhausted.
    pub fn advance(&mut self) -> bool {
        if self.finished {
            return false;
        }
        let above_cursor = self.stack.depth().saturating_sub(self.base_depth + 1);
        self.stack.pop(above_cursor);
        if self.stack.table_next(self.table) {
            true
        } else {
            self.finished = true;
            false
        }
    }

    pub fn stack(&mut self) -> &mut S {
        self.stack
    }
}

impl<S: DynamicStack + ?Sized> Drop for Traversal<'_, S> {
    fn drop(&mut self) {
        let extra = self.stack.depth().saturating_sub(self.base_depth);
        self.stack.pop(extra);
    }
}

/// Push a new table holding `items` at keys 1..=n
pub fn encode_sequence<T, S>(stack: &mut S, items: &[T])
where
    T: DynamicEncode,
    S: DynamicStack + ?Sized,
{
    stack.push_table();
    for (i, item) in items.iter().enumerate() {
        stack.push_integer(i as i64 + 1);
        item.encode_value(stack);
        stack.table_insert(-3);
    }
}

/// Push a new table holding every `(key, value)` pair
pub fn encode_mapping<'a, K, V, S, I>(stack: &mut S, pairs: I)
where
    K: DynamicEncode + ?Sized + 'a,
    V: DynamicEncode + ?Sized + 'a,
    S: DynamicStack + ?Sized,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    stack.push_table();
    for (key, value) in pairs {
        key.encode_value(stack);
        value.encode_value(stack);
        stack.table_insert(-3);
    }
}

/// Decode and consume the sequence on top of the stack
pub fn decode_sequence<T, S>(stack: &mut S) -> Result<Vec<T>, DecodeError>
where
    T: DynamicBinding,
    S: DynamicStack + ?Sized,
{
    decode_checked(stack)
}

/// Decode and consume the mapping on top of the stack
pub fn decode_mapping<K, V, S>(stack: &mut S) -> Result<HashMap<K, V>, DecodeError>
where
    K: DynamicBinding + Eq + Hash,
    V: DynamicBinding,
    S: DynamicStack + ?Sized,
{
    decode_checked(stack)
}

/// Read the sequence at `index` without consuming it
pub fn read_sequence<T, S>(stack: &mut S, index: StackIndex) -> Result<Vec<T>, DecodeError>
where
    T: DynamicBinding,
    S: DynamicStack + ?Sized,
{
    let expected = Vec::<T>::type_name();
    expect_table(stack, index, &expected)?;

    let declared = stack.raw_len(index);
    let mut staged = Vec::with_capacity(declared);
    let mut cursor = Traversal::new(stack, index);

    while cursor.advance() {
        let position = staged.len() + 1;
        let stack = cursor.stack();
        if position > declared {
            return Err(DecodeError::Malformed {
                expected,
                reason: format!("more entries than its length {declared}"),
            });
        }
        if stack.read_integer(-2) != Some(position as i64) {
            return Err(DecodeError::Malformed {
                expected,
                reason: format!(
                    "expected key {position}, found {}",
                    describe_key(&*stack, -2)
                ),
            });
        }
        let item = T::read(stack, -1).map_err(|source| DecodeError::Element {
            expected: expected.clone(),
            key: position.to_string(),
            source: Box::new(source),
        })?;
        staged.push(item);
    }

    if staged.len() != declared {
        return Err(DecodeError::Malformed {
            expected,
            reason: format!(
                "length {declared} but traversal yielded {} entries",
                staged.len()
            ),
        });
    }
    trace!(len = declared, "decoded sequence");
    Ok(staged)
}

/// Host map types a mapping can decode into
pub trait MappingTarget<K, V>: Default + Extend<(K, V)> {
    fn entry_count(&self) -> usize;
}

impl<K: Eq + Hash, V, H: BuildHasher + Default> MappingTarget<K, V> for HashMap<K, V, H> {
    fn entry_count(&self) -> usize {
        self.len()
    }
}

impl<K: Ord, V> MappingTarget<K, V> for BTreeMap<K, V> {
    fn entry_count(&self) -> usize {
        self.len()
    }
}

/// Read the mapping at `index` into any map type without consuming it
///
/// Each entry is decoded as a pair: the key at -2 and the value at -1 are
/// both read while on the stack, before the traversal moves on. Distinct
/// dynamic keys that decode to equal host keys make the mapping malformed.
pub fn read_mapping<K, V, M, S>(
    stack: &mut S,
    index: StackIndex,
    expected: String,
) -> Result<M, DecodeError>
where
    K: DynamicBinding,
    V: DynamicBinding,
    M: MappingTarget<K, V>,
    S: DynamicStack + ?Sized,
{
    expect_table(stack, index, &expected)?;

    let mut staged = Vec::new();
    let mut cursor = Traversal::new(stack, index);

    while cursor.advance() {
        let stack = cursor.stack();
        let key = match K::read(stack, -2) {
            Ok(key) => key,
            Err(source) => return Err(element_error(&*stack, &expected, source)),
        };
        let value = match V::read(stack, -1) {
            Ok(value) => value,
            Err(source) => return Err(element_error(&*stack, &expected, source)),
        };
        staged.push((key, value));
    }

    let entries = staged.len();
    let mut map = M::default();
    map.extend(staged);
    if map.entry_count() != entries {
        return Err(DecodeError::Malformed {
            expected,
            reason: format!(
                "{entries} entries decode to only {} distinct keys",
                map.entry_count()
            ),
        });
    }
    trace!(len = entries, "decoded mapping");
    Ok(map)
}

fn expect_table<S>(stack: &S, index: StackIndex, expected: &str) -> Result<(), DecodeError>
where
    S: DynamicStack + ?Sized,
{
    match stack.peek_tag(index) {
        Tag::Table => Ok(()),
        found => Err(DecodeError::TypeMismatch {
            expected: expected.to_string(),
            found,
        }),
    }
}

fn element_error<S>(stack: &S, expected: &str, source: DecodeError) -> DecodeError
where
    S: DynamicStack + ?Sized,
{
    DecodeError::Element {
        expected: expected.to_string(),
        key: describe_key(stack, -2),
        source: Box::new(source),
    }
}

/// Render the key at `index` for diagnostics
fn describe_key<S>(stack: &S, index: StackIndex) -> String
where
    S: DynamicStack + ?Sized,
{
    match stack.peek_tag(index) {
        Tag::Integer => stack.read_integer(index).unwrap_or_default().to_string(),
        Tag::Number => stack.read_number(index).unwrap_or_default().to_string(),
        Tag::Boolean => stack.read_boolean(index).unwrap_or_default().to_string(),
        Tag::String => format!("\"{}\"", stack.read_string(index).unwrap_or_default()),
        other => other.to_string(),
    }
}

impl<T: DynamicBinding> DynamicBinding for Vec<T> {
    fn type_name() -> String {
        format!("sequence<{}>", T::type_name())
    }

    fn encode<S: DynamicStack + ?Sized>(&self, stack: &mut S) {
        encode_sequence(stack, self);
    }

    fn read<S: DynamicStack + ?Sized>(
        stack: &mut S,
        index: StackIndex,
    ) -> Result<Self, DecodeError> {
        read_sequence(stack, index)
    }
}

impl<K, V, H> DynamicBinding for HashMap<K, V, H>
where
    K: DynamicBinding + Eq + Hash,
    V: DynamicBinding,
    H: BuildHasher + Default,
{
    fn type_name() -> String {
        format!("mapping<{}, {}>", K::type_name(), V::type_name())
    }

    fn encode<S: DynamicStack + ?Sized>(&self, stack: &mut S) {
        encode_mapping(stack, self);
    }

    fn read<S: DynamicStack + ?Sized>(
        stack: &mut S,
        index: StackIndex,
    ) -> Result<Self, DecodeError> {
        read_mapping::<K, V, Self, S>(stack, index, Self::type_name())
    }
}

impl<K, V> DynamicBinding for BTreeMap<K, V>
where
    K: DynamicBinding + Ord,
    V: DynamicBinding,
{
    fn type_name() -> String {
        format!("mapping<{}, {}>", K::type_name(), V::type_name())
    }

    fn encode<S: DynamicStack + ?Sized>(&self, stack: &mut S) {
        encode_mapping(stack, self);
    }

    fn read<S: DynamicStack + ?Sized>(
        stack: &mut S,
        index: StackIndex,
    ) -> Result<Self, DecodeError> {
        read_mapping::<K, V, Self, S>(stack, index, Self::type_name())
    }
}
