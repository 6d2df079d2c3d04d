//! Container codec tests
//!
//! Nested round trips, traversal order, and all-or-nothing failure for
//! sequences and mappings.

use ferry_bridge::ferry_core::{TableKey, TableRef};
use ferry_bridge::{
    DecodeError, DynamicBinding, DynamicStack, Stack, Tag, Value, decode_checked, decode_mapping,
    decode_sequence, encode_mapping, encode_sequence,
};
use std::collections::{BTreeMap, HashMap};

fn push_table(stack: &mut Stack, entries: Vec<(TableKey, Value)>) {
    let table = TableRef::new();
    for (key, value) in entries {
        table.borrow_mut().set(key, value);
    }
    stack.push_value(Value::Table(table));
}

#[test]
fn test_sequence_round_trip_preserves_order() {
    let items = vec!["c".to_string(), "a".to_string(), "b".to_string()];
    let mut stack = Stack::with_defaults();
    encode_sequence(&mut stack, &items);

    let back: Vec<String> = decode_sequence(&mut stack).unwrap();
    assert_eq!(back, items);
    assert_eq!(stack.depth(), 0);
}

#[test]
fn test_empty_containers() {
    let mut stack = Stack::with_defaults();
    Vec::<i64>::new().encode(&mut stack);
    HashMap::<String, i64>::new().encode(&mut stack);

    assert!(decode_mapping::<String, i64, _>(&mut stack).unwrap().is_empty());
    assert!(decode_sequence::<i64, _>(&mut stack).unwrap().is_empty());
    assert_eq!(stack.depth(), 0);
}

#[test]
fn test_nested_sequences_depth_three() {
    let value = vec![
        vec![vec![1i64, 2], vec![]],
        vec![vec![3], vec![4, 5, 6]],
        vec![],
    ];
    let mut stack = Stack::with_defaults();
    value.encode(&mut stack);
    assert_eq!(stack.depth(), 1);

    let back: Vec<Vec<Vec<i64>>> = decode_checked(&mut stack).unwrap();
    assert_eq!(back, value);
    assert_eq!(stack.depth(), 0);
}

#[test]
fn test_nested_mappings_depth_three() {
    let mut inner = HashMap::new();
    inner.insert("x".to_string(), vec![1.5, 2.5]);
    inner.insert("y".to_string(), vec![]);

    let mut middle = HashMap::new();
    middle.insert(10i64, inner.clone());
    middle.insert(20i64, HashMap::new());

    let mut outer: HashMap<String, HashMap<i64, HashMap<String, Vec<f64>>>> = HashMap::new();
    outer.insert("first".to_string(), middle);
    outer.insert("second".to_string(), HashMap::new());

    let mut stack = Stack::with_defaults();
    outer.encode(&mut stack);
    let back: HashMap<String, HashMap<i64, HashMap<String, Vec<f64>>>> =
        decode_checked(&mut stack).unwrap();
    assert_eq!(back, outer);
    assert_eq!(stack.depth(), 0);
}

#[test]
fn test_mapping_of_sequences_btree() {
    let mut map = BTreeMap::new();
    map.insert("evens".to_string(), vec![2i64, 4, 6]);
    map.insert("odds".to_string(), vec![1, 3]);

    let mut stack = Stack::with_defaults();
    encode_mapping(&mut stack, &map);
    let back: BTreeMap<String, Vec<i64>> = decode_checked(&mut stack).unwrap();
    assert_eq!(back, map);
}

#[test]
fn test_mapping_with_integer_keys_that_look_like_a_sequence() {
    let mut map = HashMap::new();
    map.insert(1i64, "one".to_string());
    map.insert(2i64, "two".to_string());
    map.insert(5i64, "five".to_string());

    let mut stack = Stack::with_defaults();
    map.encode(&mut stack);
    let back: HashMap<i64, String> = decode_checked(&mut stack).unwrap();
    assert_eq!(back, map);
}

#[test]
fn test_mapping_partial_failure_is_total_failure() {
    let mut stack = Stack::with_defaults();
    push_table(
        &mut stack,
        vec![
            (TableKey::from("a"), Value::Integer(1)),
            (TableKey::from("b"), Value::from("not an integer")),
            (TableKey::from("c"), Value::Integer(3)),
        ],
    );

    let err = decode_mapping::<String, i64, _>(&mut stack).unwrap_err();
    assert_eq!(
        err,
        DecodeError::Element {
            expected: "mapping<string, integer>".to_string(),
            key: "\"b\"".to_string(),
            source: Box::new(DecodeError::TypeMismatch {
                expected: "integer".to_string(),
                found: Tag::String
            })
        }
    );
    assert_eq!(stack.depth(), 0);
}

#[test]
fn test_inner_failure_keeps_outer_stack_intact() {
    // [[1, 2], [3, "x"]] decoded as sequence<sequence<integer>>
    let mut stack = Stack::with_defaults();
    stack.push_string("below");
    let good = TableRef::new();
    good.borrow_mut().set(TableKey::Integer(1), Value::Integer(1));
    good.borrow_mut().set(TableKey::Integer(2), Value::Integer(2));
    let bad = TableRef::new();
    bad.borrow_mut().set(TableKey::Integer(1), Value::Integer(3));
    bad.borrow_mut().set(TableKey::Integer(2), Value::from("x"));
    push_table(
        &mut stack,
        vec![
            (TableKey::Integer(1), Value::Table(good)),
            (TableKey::Integer(2), Value::Table(bad)),
        ],
    );

    let err = decode_checked::<Vec<Vec<i64>>, _>(&mut stack).unwrap_err();
    assert_eq!(
        err.to_string(),
        "bad element [2] in sequence<sequence<integer>>: \
         bad element [2] in sequence<integer>: expected integer, got string"
    );
    assert_eq!(err.root().to_string(), "expected integer, got string");
    assert_eq!(stack.depth(), 1);
    assert_eq!(stack.read_string(-1), Some("below"));
}

#[test]
fn test_sequence_decode_rejects_sparse_table() {
    let mut stack = Stack::with_defaults();
    push_table(
        &mut stack,
        vec![
            (TableKey::Integer(2), Value::Integer(2)),
            (TableKey::Integer(3), Value::Integer(3)),
        ],
    );

    let err = decode_sequence::<i64, _>(&mut stack).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed { .. }), "{err}");
    assert_eq!(stack.depth(), 0);
}

#[test]
fn test_sequence_of_handles() {
    let mut a = 1u32;
    let mut b = 2u32;
    let handles: Vec<*mut u32> = vec![&mut a as *mut u32, &mut b as *mut u32];

    let mut stack = Stack::with_defaults();
    handles.encode(&mut stack);
    let back: Vec<*mut u32> = decode_checked(&mut stack).unwrap();
    assert_eq!(back, handles);
}

#[test]
fn test_container_where_scalar_expected() {
    let mut stack = Stack::with_defaults();
    vec![1i64].encode(&mut stack);
    assert_eq!(
        decode_checked::<i64, _>(&mut stack),
        Err(DecodeError::TypeMismatch {
            expected: "integer".to_string(),
            found: Tag::Table
        })
    );
    assert_eq!(stack.depth(), 0);
}

#[test]
fn test_duplicate_host_keys_reject_the_mapping() {
    let sequence_key = |items: &[i64]| {
        let table = TableRef::new();
        for (i, item) in items.iter().enumerate() {
            table
                .borrow_mut()
                .set(TableKey::Integer(i as i64 + 1), Value::Integer(*item));
        }
        TableKey::Table(table)
    };

    let mut stack = Stack::with_defaults();
    stack.push_string("below");
    push_table(
        &mut stack,
        vec![
            (sequence_key(&[1, 2]), Value::Integer(10)),
            (sequence_key(&[1, 2]), Value::Integer(20)),
            (sequence_key(&[3]), Value::Integer(30)),
        ],
    );

    let err = decode_checked::<BTreeMap<Vec<i64>, i64>, _>(&mut stack).unwrap_err();
    assert!(
        matches!(&err, DecodeError::Malformed { reason, .. } if reason.contains("distinct keys")),
        "{err}"
    );
    assert_eq!(stack.depth(), 1);

    // Equal shapes under distinct keys still decode
    push_table(
        &mut stack,
        vec![
            (sequence_key(&[1, 2]), Value::Integer(10)),
            (sequence_key(&[3]), Value::Integer(30)),
        ],
    );
    let map: HashMap<Vec<i64>, i64> = decode_checked(&mut stack).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map[&vec![1, 2]], 10);
    assert_eq!(stack.depth(), 1);
}

#[test]
fn test_borrowed_strings_encode_into_containers() {
    let mut stack = Stack::with_defaults();
    encode_sequence(&mut stack, &["x", "y"]);
    let back: Vec<String> = decode_sequence(&mut stack).unwrap();
    assert_eq!(back, vec!["x", "y"]);

    let mut pairs = BTreeMap::new();
    pairs.insert("k", "v");
    encode_mapping(&mut stack, &pairs);
    let back: HashMap<String, String> = decode_mapping(&mut stack).unwrap();
    assert_eq!(back["k"], "v");
    assert_eq!(stack.depth(), 0);
}
