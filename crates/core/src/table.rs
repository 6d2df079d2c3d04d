//! Tables
//!
//! The runtime's single association container, used for both sequences and
//! mappings. A table keeps two parts:
//!
//! - a positional part holding keys `1..=n` with no holes, and
//! - a keyed part holding every other key in insertion order.
//!
//! Traversal visits the positional part in index order, then the keyed part
//! in insertion order, so a table built from a sequence is always traversed
//! in sequence order no matter how its entries were assigned.
//!
//! Invariant: the keyed part never holds the key `n + 1`; inserting it moves
//! the entry (and any run following it) into the positional part.

use crate::value::{TableKey, Value};
use indexmap::IndexMap;
use thiserror::Error;

/// Errors raised by table operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("table index is nil")]
    NilKey,

    #[error("table index is NaN")]
    NanKey,

    #[error("invalid key to 'next'")]
    InvalidNextKey,
}

#[derive(Debug, Default)]
pub struct Table {
    array: Vec<Value>,
    hash: IndexMap<TableKey, Value>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(positional: usize, keyed: usize) -> Self {
        Table {
            array: Vec::with_capacity(positional),
            hash: IndexMap::with_capacity(keyed),
        }
    }

    /// Raw length: the size of the positional part
    pub fn raw_len(&self) -> usize {
        self.array.len()
    }

    /// Total number of entries
    pub fn len(&self) -> usize {
        self.array.len() + self.hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &TableKey) -> Option<&Value> {
        match self.array_slot(key) {
            Some(slot) => Some(&self.array[slot]),
            None => self.hash.get(key),
        }
    }

    /// Associate `key` with `value`; assigning nil removes the entry
    pub fn set(&mut self, key: TableKey, value: Value) {
        if let Some(slot) = self.array_slot(&key) {
            if value.is_nil() {
                // Entries past the hole lose their positions
                let tail = self.array.split_off(slot);
                for (offset, moved) in tail.into_iter().enumerate().skip(1) {
                    let index = (slot + offset + 1) as i64;
                    self.hash.insert(TableKey::Integer(index), moved);
                }
            } else {
                self.array[slot] = value;
            }
            return;
        }

        if value.is_nil() {
            self.hash.shift_remove(&key);
        } else if key == self.next_position() {
            self.array.push(value);
            self.absorb_positions();
        } else {
            self.hash.insert(key, value);
        }
    }

    /// Traversal step: the entry following `after` (or the first entry)
    ///
    /// Returns `Ok(None)` once the traversal is exhausted.
    pub fn next(&self, after: Option<&TableKey>) -> Result<Option<(TableKey, Value)>, TableError> {
        let position = match after {
            None => 0,
            Some(key) => match self.array_slot(key) {
                Some(slot) => slot + 1,
                None => match self.hash.get_index_of(key) {
                    Some(index) => self.array.len() + index + 1,
                    None => return Err(TableError::InvalidNextKey),
                },
            },
        };
        Ok(self.entry_at(position))
    }

    /// Iterate entries in traversal order
    pub fn iter(&self) -> impl Iterator<Item = (TableKey, &Value)> + '_ {
        let positional = self
            .array
            .iter()
            .enumerate()
            .map(|(slot, value)| (TableKey::Integer(slot as i64 + 1), value));
        let keyed = self.hash.iter().map(|(key, value)| (key.clone(), value));
        positional.chain(keyed)
    }

    fn entry_at(&self, position: usize) -> Option<(TableKey, Value)> {
        if position < self.array.len() {
            Some((
                TableKey::Integer(position as i64 + 1),
                self.array[position].clone(),
            ))
        } else {
            self.hash
                .get_index(position - self.array.len())
                .map(|(key, value)| (key.clone(), value.clone()))
        }
    }

    fn array_slot(&self, key: &TableKey) -> Option<usize> {
        match key {
            TableKey::Integer(n) if *n >= 1 && (*n as u64) <= self.array.len() as u64 => {
                Some(*n as usize - 1)
            }
            _ => None,
        }
    }

    fn next_position(&self) -> TableKey {
        TableKey::Integer(self.array.len() as i64 + 1)
    }

    fn absorb_positions(&mut self) {
        while let Some(value) = self.hash.shift_remove(&self.next_position()) {
            self.array.push(value);
        }
    }
}
