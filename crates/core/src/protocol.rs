//! The stack protocol
//!
//! `DynamicStack` is the only surface the value bridge is written against.
//! Any embedded runtime that exposes an ordered value stack, tables with an
//! ordered traversal step, and a non-returning error raise can host the
//! bridge; [`Stack`](crate::Stack) is the reference implementation.
//!
//! ## Positions
//!
//! ```text
//!   frame base                         top
//!   ┌──────┬──────┬──────┬──────┬──────┐
//!   │  v1  │  v2  │  v3  │  v4  │  v5  │
//!   └──────┴──────┴──────┴──────┴──────┘
//!      1      2      3      4      5      positive: from the frame base
//!     -5     -4     -3     -2     -1      negative: from the top
//! ```
//!
//! Position 0 and positions outside the current frame hold no value;
//! `peek_tag` reports them as [`Tag::None`].

use crate::value::Tag;
use std::ffi::c_void;

/// A stack position: positive from the frame base (1-based), negative from
/// the top (-1 is the top)
pub type StackIndex = i32;

pub trait DynamicStack {
    /// Number of live values in the current frame
    fn depth(&self) -> usize;

    /// Convert a position to its positive form, which stays valid while
    /// values are pushed above it
    fn absolute(&self, index: StackIndex) -> StackIndex {
        if index < 0 {
            self.depth() as StackIndex + index + 1
        } else {
            index
        }
    }

    fn push_nil(&mut self);
    fn push_number(&mut self, value: f64);
    fn push_integer(&mut self, value: i64);
    fn push_string(&mut self, value: &str);
    fn push_boolean(&mut self, value: bool);
    fn push_reference(&mut self, value: *mut c_void);

    /// Push a new empty table
    fn push_table(&mut self);

    /// Inspect the tag at `index` without consuming it
    fn peek_tag(&self, index: StackIndex) -> Tag;

    /// Typed, non-consuming reads; `None` when the slot holds another tag
    fn read_number(&self, index: StackIndex) -> Option<f64>;
    fn read_integer(&self, index: StackIndex) -> Option<i64>;
    fn read_string(&self, index: StackIndex) -> Option<&str>;
    fn read_boolean(&self, index: StackIndex) -> Option<bool>;
    fn read_reference(&self, index: StackIndex) -> Option<*mut c_void>;

    /// Remove the top `count` values
    fn pop(&mut self, count: usize);

    /// Raw length of the table (or string) at `index`; 0 for other tags
    fn raw_len(&self, index: StackIndex) -> usize;

    /// Pop a value and then a key from the top, and associate them inside
    /// the table at `table`
    ///
    /// Stack effect: ( key value -- )
    fn table_insert(&mut self, table: StackIndex);

    /// Ordered traversal step over the table at `table`
    ///
    /// Pops the cursor key (nil to start). When an entry follows it, pushes
    /// that entry's key and value and returns true; at exhaustion pushes
    /// nothing and returns false.
    ///
    /// Stack effect: ( key -- key' value ) or ( key -- )
    fn table_next(&mut self, table: StackIndex) -> bool;

    /// Push the value of global `name` (nil when unset) and return its tag
    fn get_global(&mut self, name: &str) -> Tag;

    /// Pop the top value into global `name`
    fn set_global(&mut self, name: &str);

    /// Abort the in-progress foreign call, surfacing `message` through the
    /// runtime's error channel
    fn raise_error(&mut self, message: String) -> !;
}
