//! Demo functions and value formatting for the `ferry` example program

use ferry_bridge::ferry_core::TableKey;
use ferry_bridge::{
    DynamicStack, Library, Runtime, RuntimeError, Stack, Value, extract_arguments, push_return,
};
use std::collections::HashMap;

/// `example(number, integer) -> (number, string)`
fn example(stack: &mut Stack) -> usize {
    let (a, b): (f64, i64) = extract_arguments(stack);
    push_return(stack, (a, b.to_string()))
}

fn greet(stack: &mut Stack) -> usize {
    let (name,): (String,) = extract_arguments(stack);
    push_return(stack, (format!("Hello, {name}!"),))
}

/// `divmod(integer, integer) -> (integer, integer)`, floored like `div_euclid`
fn divmod(stack: &mut Stack) -> usize {
    let (a, b): (i64, i64) = extract_arguments(stack);
    if b == 0 {
        stack.raise_error("divmod: division by zero".to_string());
    }
    match (a.checked_div_euclid(b), a.checked_rem_euclid(b)) {
        (Some(quotient), Some(remainder)) => push_return(stack, (quotient, remainder)),
        _ => stack.raise_error("divmod: overflow".to_string()),
    }
}

fn hypot(stack: &mut Stack) -> usize {
    let (x, y): (f64, f64) = extract_arguments(stack);
    push_return(stack, (x.hypot(y),))
}

fn upper(stack: &mut Stack) -> usize {
    let (text,): (String,) = extract_arguments(stack);
    push_return(stack, (text.to_uppercase(),))
}

fn words(stack: &mut Stack) -> usize {
    let (text,): (String,) = extract_arguments(stack);
    let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
    push_return(stack, (words,))
}

fn frequencies(stack: &mut Stack) -> usize {
    let (text,): (String,) = extract_arguments(stack);
    let mut counts: HashMap<String, i64> = HashMap::new();
    for word in text.split_whitespace() {
        *counts.entry(word.to_lowercase()).or_default() += 1;
    }
    push_return(stack, (counts,))
}

pub fn text_library() -> Library {
    Library::new("text")
        .with_function("upper", upper)
        .with_function("words", words)
        .with_function("frequencies", frequencies)
}

/// Register every demo function and the globals the example program reads
pub fn install(runtime: &mut Runtime) -> Result<(), RuntimeError> {
    runtime.register_fn("example", example);
    runtime.register_fn("greet", greet);
    runtime.register_fn("divmod", divmod);
    runtime.register_fn("hypot", hypot);
    runtime.register_library(&text_library());

    runtime.set_global("VERSION", "VERSION")?;
    runtime.set_global("V", &4500i64)
}

/// Parse a command-line argument: integer, then number, then
/// `true`/`false`/`nil`, otherwise a string
pub fn parse_argument(arg: &str) -> Value {
    if let Ok(n) = arg.parse::<i64>() {
        return Value::Integer(n);
    }
    if let Ok(n) = arg.parse::<f64>() {
        return Value::Number(n);
    }
    match arg {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        "nil" => Value::Nil,
        _ => Value::from(arg),
    }
}

/// Format a result value; tables are printed with their contents
pub fn render(value: &Value) -> String {
    match value {
        Value::Table(table) => {
            let table = table.borrow();
            if table.len() == table.raw_len() {
                let items: Vec<String> = table.iter().map(|(_, v)| render_nested(v)).collect();
                format!("[{}]", items.join(", "))
            } else {
                let entries: Vec<String> = table
                    .iter()
                    .map(|(k, v)| format!("{} = {}", render_key(&k), render_nested(v)))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
        }
        other => other.to_string(),
    }
}

fn render_nested(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{s:?}"),
        other => render(other),
    }
}

fn render_key(key: &TableKey) -> String {
    match key {
        TableKey::String(s) => s.to_string(),
        other => format!("[{}]", render_nested(&other.to_value())),
    }
}
