//! Framed Value Stack
//!
//! One contiguous sequence of values shared by the host and the runtime.
//! Each foreign call gets a frame: the slots from its first argument to the
//! top. Positions handed to the protocol are frame-relative, so a function
//! sees its arguments at 1..=n no matter how deep the caller's stack is.
//!
//! ```text
//!   caller values      fn  arg1 arg2         ← before call(2)
//!   ┌────┬────┬────┬────┬────┬────┐
//!   │ .. │ .. │ .. │ f  │ a  │ b  │
//!   └────┴────┴────┴────┴────┴────┘
//!                         ↑ frame base while f runs
//!
//!   caller values      r1   r2               ← after f returned 2
//!   ┌────┬────┬────┬────┬────┐
//!   │ .. │ .. │ .. │ r1 │ r2 │
//!   └────┴────┴────┴────┴────┘
//! ```
//!
//! A raise inside the frame unwinds to `call`, which truncates the stack back
//! to the function slot: the caller sees neither the function, its arguments,
//! nor anything the function pushed.

use crate::config::RuntimeConfig;
use crate::error::{Raised, RuntimeError, raise, set_runtime_error};
use crate::protocol::{DynamicStack, StackIndex};
use crate::table::TableError;
use crate::value::{TableKey, TableRef, Tag, Value};
use std::any::Any;
use std::ffi::c_void;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use tracing::debug;

/// A host function callable from the runtime
///
/// Receives control with its arguments at positions 1..=n of a fresh frame,
/// leaves its results on top of the frame, and returns how many there are.
pub type ForeignFn = fn(&mut Stack) -> usize;

pub struct Stack {
    values: Vec<Value>,
    /// Index into `values` of the current frame's first slot
    base: usize,
    limit: usize,
    /// Number of protected calls in progress
    protected: usize,
    globals: TableRef,
}

impl Stack {
    pub fn new(config: &RuntimeConfig) -> Self {
        Stack {
            values: Vec::with_capacity(config.initial_capacity.min(config.stack_limit)),
            base: 0,
            limit: config.stack_limit,
            protected: 0,
            globals: TableRef::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&RuntimeConfig::default())
    }

    /// The globals table
    pub fn globals(&self) -> &TableRef {
        &self.globals
    }

    /// Value of global `name` (nil when unset)
    pub fn global(&self, name: &str) -> Value {
        self.globals
            .borrow()
            .get(&TableKey::from(name))
            .cloned()
            .unwrap_or_default()
    }

    /// Values of the current frame, bottom first
    pub fn frame(&self) -> &[Value] {
        &self.values[self.base..]
    }

    /// Value at `index` in the current frame
    pub fn value_at(&self, index: StackIndex) -> Option<&Value> {
        self.slot(index).map(|slot| &self.values[slot])
    }

    /// Push an arbitrary Value; raises "stack overflow" past the limit
    pub fn push_value(&mut self, value: Value) {
        if self.values.len() >= self.limit {
            self.raise_error(format!("stack overflow ({} slots)", self.limit));
        }
        self.values.push(value);
    }

    /// Pop the top value of the current frame
    pub fn pop_value(&mut self) -> Option<Value> {
        if self.values.len() > self.base {
            self.values.pop()
        } else {
            None
        }
    }

    /// Pop the top `count` values, returned bottom first
    pub fn take_top(&mut self, count: usize) -> Vec<Value> {
        let start = self.values.len().saturating_sub(count).max(self.base);
        self.values.split_off(start)
    }

    /// Whether a protected call is in progress
    pub fn in_call(&self) -> bool {
        self.protected > 0
    }

    /// Protected call
    ///
    /// Expects a function followed by `nargs` arguments on top of the current
    /// frame. Runs the function in a new frame and replaces the function and
    /// its arguments with its results, returning their count. When the
    /// function raises, the function and arguments are removed, the message
    /// is recorded as the last runtime error, and `Err` is returned.
    pub fn call(&mut self, nargs: usize) -> Result<usize, RuntimeError> {
        let available = self.depth();
        if nargs + 1 > available {
            return Err(RuntimeError::StackUnderflow {
                needed: nargs + 1,
                available,
            });
        }

        let function_slot = self.values.len() - nargs - 1;
        let function = match &self.values[function_slot] {
            Value::Function(f) => *f,
            other => {
                let found = other.tag();
                self.values.truncate(function_slot);
                return Err(RuntimeError::NotCallable(found));
            }
        };

        let caller_base = self.base;
        self.base = function_slot + 1;
        self.protected += 1;
        debug!(nargs, depth = self.values.len(), "foreign call");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| function(self)));

        self.protected -= 1;
        match outcome {
            Ok(declared) => {
                let available = self.values.len() - self.base;
                if declared > available {
                    self.values.truncate(function_slot);
                    self.base = caller_base;
                    return Err(RuntimeError::ReturnCount {
                        declared,
                        available,
                    });
                }
                let results = self.values.split_off(self.values.len() - declared);
                self.values.truncate(function_slot);
                self.values.extend(results);
                self.base = caller_base;
                Ok(declared)
            }
            Err(payload) => Err(self.recover(payload, function_slot, caller_base)),
        }
    }

    /// Run host-side stack work under a raise boundary
    ///
    /// Pushes made outside any foreign call (encoding arguments, setting
    /// globals, decoding results) can still raise, for example on stack
    /// overflow. Inside `protect` such a raise truncates the stack back to
    /// its depth on entry and comes back as `Err` instead of panicking.
    pub fn protect<T>(&mut self, work: impl FnOnce(&mut Stack) -> T) -> Result<T, RuntimeError> {
        let entry_len = self.values.len();
        let entry_base = self.base;
        self.protected += 1;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(self)));

        self.protected -= 1;
        outcome.map_err(|payload| self.recover(payload, entry_len, entry_base))
    }

    /// Restore the stack after a caught unwind; non-raise panics keep going
    fn recover(&mut self, payload: Box<dyn Any + Send>, len: usize, base: usize) -> RuntimeError {
        self.values.truncate(len);
        self.base = base;
        match payload.downcast::<Raised>() {
            Ok(raised) => {
                debug!(message = %raised.message, "raise caught");
                set_runtime_error(raised.message.clone());
                RuntimeError::Raised(raised.message)
            }
            Err(other) => panic::resume_unwind(other),
        }
    }

    /// Index into `values` for a frame position
    fn slot(&self, index: StackIndex) -> Option<usize> {
        let depth = self.depth() as i64;
        let index = index as i64;
        let position = if index < 0 { depth + index + 1 } else { index };
        if position >= 1 && position <= depth {
            Some(self.base + position as usize - 1)
        } else {
            None
        }
    }

    fn table_at(&mut self, index: StackIndex, operation: &str) -> TableRef {
        match self.value_at(index) {
            Some(Value::Table(t)) => t.clone(),
            other => {
                let tag = other.map_or(Tag::None, Value::tag);
                self.raise_error(format!("{operation}: expected table, got {tag}"))
            }
        }
    }

    fn table_key(&mut self, value: &Value) -> TableKey {
        match TableKey::from_value(value) {
            Ok(key) => key,
            Err(e) => self.raise_error(e.to_string()),
        }
    }
}

impl DynamicStack for Stack {
    fn depth(&self) -> usize {
        self.values.len() - self.base
    }

    fn push_nil(&mut self) {
        self.push_value(Value::Nil);
    }

    fn push_number(&mut self, value: f64) {
        self.push_value(Value::Number(value));
    }

    fn push_integer(&mut self, value: i64) {
        self.push_value(Value::Integer(value));
    }

    fn push_string(&mut self, value: &str) {
        self.push_value(Value::String(Rc::from(value)));
    }

    fn push_boolean(&mut self, value: bool) {
        self.push_value(Value::Boolean(value));
    }

    fn push_reference(&mut self, value: *mut c_void) {
        self.push_value(Value::Reference(value));
    }

    fn push_table(&mut self) {
        self.push_value(Value::Table(TableRef::new()));
    }

    fn peek_tag(&self, index: StackIndex) -> Tag {
        self.value_at(index).map_or(Tag::None, Value::tag)
    }

    fn read_number(&self, index: StackIndex) -> Option<f64> {
        match self.value_at(index) {
            Some(Value::Number(n)) => Some(*n),
            _ => None,
        }
    }

    fn read_integer(&self, index: StackIndex) -> Option<i64> {
        match self.value_at(index) {
            Some(Value::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    fn read_string(&self, index: StackIndex) -> Option<&str> {
        match self.value_at(index) {
            Some(Value::String(s)) => Some(s.as_ref()),
            _ => None,
        }
    }

    fn read_boolean(&self, index: StackIndex) -> Option<bool> {
        match self.value_at(index) {
            Some(Value::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    fn read_reference(&self, index: StackIndex) -> Option<*mut c_void> {
        match self.value_at(index) {
            Some(Value::Reference(p)) => Some(*p),
            _ => None,
        }
    }

    fn pop(&mut self, count: usize) {
        let keep = self.values.len().saturating_sub(count).max(self.base);
        self.values.truncate(keep);
    }

    fn raw_len(&self, index: StackIndex) -> usize {
        match self.value_at(index) {
            Some(Value::Table(t)) => t.borrow().raw_len(),
            Some(Value::String(s)) => s.len(),
            _ => 0,
        }
    }

    fn table_insert(&mut self, table: StackIndex) {
        let table = self.table_at(table, "table_insert");
        if self.depth() < 2 {
            self.raise_error("table_insert: expected a key and a value".to_string());
        }
        let value = self.values.pop().unwrap_or_default();
        let key = self.values.pop().unwrap_or_default();
        let key = self.table_key(&key);
        table.borrow_mut().set(key, value);
    }

    fn table_next(&mut self, table: StackIndex) -> bool {
        let table = self.table_at(table, "table_next");
        let cursor = match self.pop_value() {
            Some(Value::Nil) => None,
            Some(key) => Some(self.table_key(&key)),
            None => self.raise_error(TableError::InvalidNextKey.to_string()),
        };

        let step = table.borrow().next(cursor.as_ref());
        match step {
            Ok(Some((key, value))) => {
                self.push_value(key.to_value());
                self.push_value(value);
                true
            }
            Ok(None) => false,
            Err(e) => self.raise_error(e.to_string()),
        }
    }

    fn get_global(&mut self, name: &str) -> Tag {
        let value = self.global(name);
        let tag = value.tag();
        self.push_value(value);
        tag
    }

    fn set_global(&mut self, name: &str) {
        let value = match self.pop_value() {
            Some(value) => value,
            None => self.raise_error(format!("set_global '{name}': stack is empty")),
        };
        self.globals.borrow_mut().set(TableKey::from(name), value);
    }

    fn raise_error(&mut self, message: String) -> ! {
        if self.protected == 0 {
            panic!("unprotected error: {message}");
        }
        raise(message)
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("frame", &self.frame())
            .field("base", &self.base)
            .field("limit", &self.limit)
            .finish()
    }
}
