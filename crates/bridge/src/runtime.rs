//! Runtime lifecycle and registration
//!
//! `Runtime` owns one [`Stack`] and the configuration it was built from.
//! Functions are registered as globals, libraries as global tables of
//! functions addressed as `library.function`.
//!
//! Every host-side push runs under [`Stack::protect`], so a full stack
//! surfaces as `Err` and leaves the stack as it was before the operation.

use crate::binding::{DynamicBinding, DynamicEncode};
use crate::call::{DecodeTuple, EncodeTuple, collect_results};
use crate::globals;
use ferry_core::{
    DynamicStack, ForeignFn, RuntimeConfig, RuntimeError, Stack, TableKey, TableRef, Value,
};
use tracing::{debug, warn};

/// A named foreign function
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub func: ForeignFn,
}

impl Function {
    pub fn new(name: impl Into<String>, func: ForeignFn) -> Self {
        Function {
            name: name.into(),
            func,
        }
    }
}

/// A named group of foreign functions, registered as one global table
#[derive(Debug, Clone, Default)]
pub struct Library {
    pub name: String,
    pub functions: Vec<Function>,
}

impl Library {
    pub fn new(name: impl Into<String>) -> Self {
        Library {
            name: name.into(),
            functions: Vec::new(),
        }
    }

    pub fn add_function(&mut self, function: Function) {
        self.functions.push(function);
    }

    pub fn with_function(mut self, name: impl Into<String>, func: ForeignFn) -> Self {
        self.add_function(Function::new(name, func));
        self
    }
}

pub struct Runtime {
    config: RuntimeConfig,
    stack: Stack,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Self {
        let stack = Stack::new(&config);
        debug!(stack_limit = config.stack_limit, "runtime created");
        Runtime { config, stack }
    }

    pub fn with_defaults() -> Self {
        Self::new(RuntimeConfig::default())
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Replace the state with a fresh one; globals and registrations are lost
    pub fn restart(&mut self) {
        self.stack = Stack::new(&self.config);
        debug!("runtime restarted");
    }

    pub fn register(&mut self, function: &Function) {
        self.register_fn(&function.name, function.func);
    }

    pub fn register_fn(&mut self, name: &str, func: ForeignFn) {
        debug!(name, "registering function");
        self.define(name, Value::Function(func));
    }

    pub fn register_library(&mut self, library: &Library) {
        debug!(
            name = %library.name,
            functions = library.functions.len(),
            "registering library"
        );
        let table = TableRef::new();
        for function in &library.functions {
            table.borrow_mut().set(
                TableKey::from(function.name.as_str()),
                Value::Function(function.func),
            );
        }
        self.define(&library.name, Value::Table(table));
    }

    pub fn set_global<T>(&mut self, name: &str, value: &T) -> Result<(), RuntimeError>
    where
        T: DynamicEncode + ?Sized,
    {
        self.stack.protect(|stack| globals::set_global(stack, name, value))
    }

    /// Read global `name` as `T`; a wrong or missing value is `GlobalType`
    pub fn get_global<T: DynamicBinding>(&mut self, name: &str) -> Result<T, RuntimeError> {
        self.stack
            .protect(|stack| globals::get_global(stack, name))?
            .map_err(|e| RuntimeError::GlobalType {
                name: name.to_string(),
                message: e.to_string(),
            })
    }

    /// Call a registered function with typed arguments and results
    pub fn call<A, R>(&mut self, name: &str, args: A) -> Result<R, RuntimeError>
    where
        A: EncodeTuple,
        R: DecodeTuple,
    {
        let function = self.resolve(name)?;
        self.stack.protect(|stack| {
            stack.push_value(function);
            args.encode_all(stack);
        })?;
        let count = self.protected_call(name, A::COUNT)?;
        match self.stack.protect(|stack| collect_results(stack, count)) {
            Ok(results) => results,
            Err(e) => {
                self.stack.pop(count);
                Err(e)
            }
        }
    }

    /// Call a registered function with dynamic values
    pub fn call_values(&mut self, name: &str, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
        let function = self.resolve(name)?;
        self.stack.protect(|stack| {
            stack.push_value(function);
            for arg in args {
                stack.push_value(arg.clone());
            }
        })?;
        let count = self.protected_call(name, args.len())?;
        Ok(self.stack.take_top(count))
    }

    /// Names of every registered function, library members as `library.function`
    pub fn function_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for (key, value) in self.stack.globals().borrow().iter() {
            let TableKey::String(global) = key else {
                continue;
            };
            match value {
                Value::Function(_) => names.push(global.to_string()),
                Value::Table(members) => {
                    for (member, value) in members.borrow().iter() {
                        if let (TableKey::String(member), Value::Function(_)) = (member, value) {
                            names.push(format!("{global}.{member}"));
                        }
                    }
                }
                _ => {}
            }
        }
        names.sort();
        names
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    pub fn into_stack(self) -> Stack {
        self.stack
    }

    /// Bind a global directly in the globals table, without touching the stack
    fn define(&mut self, name: &str, value: Value) {
        self.stack
            .globals()
            .borrow_mut()
            .set(TableKey::from(name), value);
    }

    fn protected_call(&mut self, name: &str, nargs: usize) -> Result<usize, RuntimeError> {
        debug!(name, nargs, "calling");
        self.stack.call(nargs).inspect_err(|e| {
            warn!(name, error = %e, "call failed");
        })
    }

    /// Look up `name`, following `.` through library tables
    fn resolve(&self, name: &str) -> Result<Value, RuntimeError> {
        let mut segments = name.split('.');
        let mut value = self.stack.global(segments.next().unwrap_or_default());
        for segment in segments {
            value = field(&value, segment);
        }
        match value {
            Value::Function(_) => Ok(value),
            Value::Nil => Err(RuntimeError::UnknownFunction(name.to_string())),
            other => Err(RuntimeError::NotCallable(other.tag())),
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn field(value: &Value, name: &str) -> Value {
    match value {
        Value::Table(table) => table
            .borrow()
            .get(&TableKey::from(name))
            .cloned()
            .unwrap_or_default(),
        _ => Value::Nil,
    }
}
