//! Call adapter tests
//!
//! Foreign functions registered on a runtime and called through protected
//! calls: argument extraction, return counts, and the raise path.

use ferry_bridge::ferry_core::{clear_runtime_error, take_runtime_error};
use ferry_bridge::{
    DynamicStack, Function, Library, Runtime, RuntimeError, Stack, Tag, Value, extract_arguments,
    push_return,
};
use std::collections::HashMap;

fn example(stack: &mut Stack) -> usize {
    let (a, b): (f64, i64) = extract_arguments(stack);
    push_return(stack, (a, b.to_string()))
}

fn sum(stack: &mut Stack) -> usize {
    let (items,): (Vec<i64>,) = extract_arguments(stack);
    push_return(stack, (items.iter().sum::<i64>(),))
}

fn histogram(stack: &mut Stack) -> usize {
    let (words,): (Vec<String>,) = extract_arguments(stack);
    let mut counts: HashMap<String, i64> = HashMap::new();
    for word in words {
        *counts.entry(word).or_default() += 1;
    }
    push_return(stack, (counts,))
}

fn nothing(stack: &mut Stack) -> usize {
    let () = extract_arguments(stack);
    push_return(stack, ())
}

fn eight(stack: &mut Stack) -> usize {
    let (a, b, c, d, e, f, g, h): (i64, i64, i64, i64, i64, i64, i64, i64) =
        extract_arguments(stack);
    push_return(stack, (h, g, f, e, d, c, b, a))
}

fn example_runtime() -> Runtime {
    let mut runtime = Runtime::with_defaults();
    runtime.register(&Function::new("example", example));
    runtime.register_fn("sum", sum);
    runtime.register_fn("histogram", histogram);
    runtime.register_fn("nothing", nothing);
    runtime.register_fn("eight", eight);
    runtime
}

#[test]
fn test_example_leaves_two_results_in_the_frame() {
    let mut stack = Stack::with_defaults();
    stack.push_value(Value::Function(example));
    stack.push_number(3.5);
    stack.push_integer(7);

    assert_eq!(stack.call(2), Ok(2));
    assert_eq!(stack.depth(), 2);
    assert_eq!(stack.peek_tag(1), Tag::Number);
    assert_eq!(stack.read_number(1), Some(3.5));
    assert_eq!(stack.peek_tag(2), Tag::String);
    assert_eq!(stack.read_string(2), Some("7"));
}

#[test]
fn test_example_through_runtime() {
    let mut runtime = example_runtime();
    let (a, b): (f64, String) = runtime.call("example", (3.5, 7i64)).unwrap();
    assert_eq!(a, 3.5);
    assert_eq!(b, "7");
    assert_eq!(runtime.stack().depth(), 0);
}

#[test]
fn test_too_few_arguments_raises_arity_error() {
    clear_runtime_error();
    let mut runtime = example_runtime();

    let err = runtime
        .call::<(f64,), (f64, String)>("example", (3.5,))
        .unwrap_err();
    assert_eq!(
        err,
        RuntimeError::Raised("bad argument count (expected 2, got 1)".to_string())
    );
    assert_eq!(runtime.stack().depth(), 0);
    assert_eq!(
        take_runtime_error(),
        Some("bad argument count (expected 2, got 1)".to_string())
    );
}

#[test]
fn test_too_many_arguments_raises_arity_error() {
    let mut runtime = example_runtime();
    let err = runtime
        .call_values(
            "example",
            &[Value::Number(1.0), Value::Integer(2), Value::Integer(3)],
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "bad argument count (expected 2, got 3)"
    );
    assert_eq!(runtime.stack().depth(), 0);
}

#[test]
fn test_wrong_type_names_position() {
    let mut runtime = example_runtime();

    let err = runtime
        .call::<(f64, f64), (f64, String)>("example", (3.5, 7.0))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "bad argument #2 (expected integer, got number)"
    );

    let err = runtime
        .call::<(String, i64), (f64, String)>("example", ("3.5".to_string(), 7))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "bad argument #1 (expected number, got string)"
    );
    assert_eq!(runtime.stack().depth(), 0);
}

#[test]
fn test_container_arguments_and_results() {
    let mut runtime = example_runtime();

    let (total,): (i64,) = runtime.call("sum", (vec![1i64, 2, 3, 4],)).unwrap();
    assert_eq!(total, 10);

    let words: Vec<String> = ["a", "b", "a"].iter().map(|s| s.to_string()).collect();
    let (counts,): (HashMap<String, i64>,) = runtime.call("histogram", (words,)).unwrap();
    assert_eq!(counts.get("a"), Some(&2));
    assert_eq!(counts.get("b"), Some(&1));
    assert_eq!(counts.len(), 2);
}

#[test]
fn test_malformed_container_argument_names_element() {
    let mut runtime = example_runtime();
    let err = runtime
        .call::<(Vec<String>,), (i64,)>("sum", (vec!["1".to_string()],))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "bad argument #1 (bad element [1] in sequence<integer>: expected integer, got string)"
    );
}

#[test]
fn test_zero_and_eight_arity() {
    let mut runtime = example_runtime();
    let () = runtime.call("nothing", ()).unwrap();

    let reversed: (i64, i64, i64, i64, i64, i64, i64, i64) = runtime
        .call("eight", (1i64, 2i64, 3i64, 4i64, 5i64, 6i64, 7i64, 8i64))
        .unwrap();
    assert_eq!(reversed, (8, 7, 6, 5, 4, 3, 2, 1));
    assert_eq!(runtime.stack().depth(), 0);
}

#[test]
fn test_result_type_mismatch_is_checked() {
    let mut runtime = example_runtime();
    let err = runtime
        .call::<(f64, i64), (f64, i64)>("example", (1.0, 2))
        .unwrap_err();
    assert_eq!(
        err,
        RuntimeError::ResultType {
            position: 2,
            message: "expected integer, got string".to_string()
        }
    );
    assert_eq!(runtime.stack().depth(), 0);
}

#[test]
fn test_error_leaves_caller_values_untouched() {
    let mut runtime = example_runtime();
    runtime.register_library(&Library::new("lib").with_function("example", example));

    let stack = runtime.stack_mut();
    stack.push_string("mine");
    stack.push_integer(99);

    assert!(runtime.call::<(), ()>("lib.example", ()).is_err());
    let stack = runtime.stack();
    assert_eq!(stack.depth(), 2);
    assert_eq!(stack.read_string(1), Some("mine"));
    assert_eq!(stack.read_integer(2), Some(99));
}
