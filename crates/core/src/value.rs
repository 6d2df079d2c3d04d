use crate::stack::ForeignFn;
use crate::table::{Table, TableError};
use std::cell::{Ref, RefCell, RefMut};
use std::ffi::c_void;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Tag: the runtime-level type marker of a stack slot
///
/// `None` is reported for positions outside the current frame; it is never
/// stored in a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    None,
    Nil,
    Boolean,
    Reference,
    Number,
    Integer,
    String,
    Table,
    Function,
}

impl Tag {
    /// Name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Tag::None => "no value",
            Tag::Nil => "nil",
            Tag::Boolean => "boolean",
            Tag::Reference => "reference",
            Tag::Number => "number",
            Tag::Integer => "integer",
            Tag::String => "string",
            Tag::Table => "table",
            Tag::Function => "function",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared handle to a table
///
/// Tables are reference values: copying a slot shares the table, and
/// equality is identity (pointer comparison), not structural.
#[derive(Clone, Default)]
pub struct TableRef(Rc<RefCell<Table>>);

impl TableRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: Table) -> Self {
        TableRef(Rc::new(RefCell::new(table)))
    }

    pub fn borrow(&self) -> Ref<'_, Table> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Table> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &TableRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

// PartialEq by identity (Rc pointer comparison)
impl PartialEq for TableRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for TableRef {}

impl Hash for TableRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table: 0x{:x}", self.addr())
    }
}

/// Value: what the runtime talks about
///
/// Values live in stack slots, table entries, and globals. Scalars are
/// copied on every read; strings are immutable and shared; tables are
/// shared by reference.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Nil,

    Boolean(bool),

    /// Light reference: an opaque host pointer the runtime never dereferences
    Reference(*mut c_void),

    /// Floating-point value (IEEE 754 double precision)
    Number(f64),

    /// Integer value, a distinct tag from Number
    Integer(i64),

    String(Rc<str>),

    Table(TableRef),

    /// Registered host function
    Function(ForeignFn),
}

impl Value {
    pub fn tag(&self) -> Tag {
        match self {
            Value::Nil => Tag::Nil,
            Value::Boolean(_) => Tag::Boolean,
            Value::Reference(_) => Tag::Reference,
            Value::Number(_) => Tag::Number,
            Value::Integer(_) => Tag::Integer,
            Value::String(_) => Tag::String,
            Value::Table(_) => Tag::Table,
            Value::Function(_) => Tag::Function,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Reference(a), Value::Reference(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => std::ptr::fn_addr_eq(*a, *b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Reference(p) => write!(f, "reference: {:p}", *p),
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 => write!(f, "{:.1}", n),
            Value::Number(n) => write!(f, "{}", n),
            Value::Integer(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
            Value::Table(t) => write!(f, "{:?}", t),
            Value::Function(func) => write!(f, "function: {:p}", *func as *const ()),
        }
    }
}

/// TableKey: the hashable form of a Value used as a table index
///
/// Nil and NaN are not valid keys. Floats holding an exact integer are
/// normalized to `Integer`, so `t[1]` and `t[1.0]` address the same entry.
/// The remaining floats are keyed by their bit pattern.
#[derive(Debug, Clone)]
pub enum TableKey {
    Boolean(bool),
    Reference(*mut c_void),
    Integer(i64),
    Number(u64),
    String(Rc<str>),
    Table(TableRef),
    Function(ForeignFn),
}

impl PartialEq for TableKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TableKey::Boolean(a), TableKey::Boolean(b)) => a == b,
            (TableKey::Reference(a), TableKey::Reference(b)) => a == b,
            (TableKey::Integer(a), TableKey::Integer(b)) => a == b,
            (TableKey::Number(a), TableKey::Number(b)) => a == b,
            (TableKey::String(a), TableKey::String(b)) => a == b,
            (TableKey::Table(a), TableKey::Table(b)) => a == b,
            (TableKey::Function(a), TableKey::Function(b)) => std::ptr::fn_addr_eq(*a, *b),
            _ => false,
        }
    }
}

impl Eq for TableKey {}

impl Hash for TableKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Discriminant for type safety
        std::mem::discriminant(self).hash(state);
        match self {
            TableKey::Boolean(b) => b.hash(state),
            TableKey::Reference(p) => (*p as usize).hash(state),
            TableKey::Integer(n) => n.hash(state),
            TableKey::Number(bits) => bits.hash(state),
            TableKey::String(s) => s.hash(state),
            TableKey::Table(t) => t.hash(state),
            TableKey::Function(func) => (*func as usize).hash(state),
        }
    }
}

impl TableKey {
    /// Convert a Value to a key, normalizing integral floats
    pub fn from_value(value: &Value) -> Result<TableKey, TableError> {
        match value {
            Value::Nil => Err(TableError::NilKey),
            Value::Boolean(b) => Ok(TableKey::Boolean(*b)),
            Value::Reference(p) => Ok(TableKey::Reference(*p)),
            Value::Integer(n) => Ok(TableKey::Integer(*n)),
            Value::Number(n) if n.is_nan() => Err(TableError::NanKey),
            Value::Number(n) => Ok(match float_to_integer(*n) {
                Some(i) => TableKey::Integer(i),
                None => TableKey::Number(n.to_bits()),
            }),
            Value::String(s) => Ok(TableKey::String(s.clone())),
            Value::Table(t) => Ok(TableKey::Table(t.clone())),
            Value::Function(func) => Ok(TableKey::Function(*func)),
        }
    }

    /// Convert the key back to the Value it indexes with
    pub fn to_value(&self) -> Value {
        match self {
            TableKey::Boolean(b) => Value::Boolean(*b),
            TableKey::Reference(p) => Value::Reference(*p),
            TableKey::Integer(n) => Value::Integer(*n),
            TableKey::Number(bits) => Value::Number(f64::from_bits(*bits)),
            TableKey::String(s) => Value::String(s.clone()),
            TableKey::Table(t) => Value::Table(t.clone()),
            TableKey::Function(func) => Value::Function(*func),
        }
    }
}

impl From<&str> for TableKey {
    fn from(s: &str) -> Self {
        TableKey::String(Rc::from(s))
    }
}

impl From<i64> for TableKey {
    fn from(n: i64) -> Self {
        TableKey::Integer(n)
    }
}

/// Exact float-to-integer conversion (None when the float has a fraction or
/// does not fit in an i64)
fn float_to_integer(n: f64) -> Option<i64> {
    // 2^63 is exactly representable; i64::MAX is not
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if n.fract() == 0.0 && (-LIMIT..LIMIT).contains(&n) {
        Some(n as i64)
    } else {
        None
    }
}
