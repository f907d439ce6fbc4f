use moonhost_vm::{find_table, new_table, Value};
use proptest::prelude::*;
use std::rc::Rc;

fn count_tables(v: &Value) -> usize {
    match v {
        Value::Table(t) => {
            1 + t
                .borrow()
                .pairs()
                .map(|(_, v)| count_tables(&v))
                .sum::<usize>()
        }
        _ => 0,
    }
}

#[test]
fn test_find_table_on_globals() {
    let globals = new_table(0, 0);
    let root = Value::Table(globals.clone());
    let deep = find_table(&root, "x.y.z", 4);
    assert!(matches!(deep, Value::Table(_)));
    assert_eq!(count_tables(&root), 4);

    let x = globals.borrow().raw_get_str("x");
    let y = x.as_table().unwrap().borrow().raw_get_str("y");
    let z = y.as_table().unwrap().borrow().raw_get_str("z");
    assert!(z.raw_equal(&deep));
}

#[test]
fn test_find_table_keeps_existing_branches() {
    let root = Value::Table(new_table(0, 0));
    let a = find_table(&root, "a", 0);
    a.as_table()
        .unwrap()
        .borrow_mut()
        .raw_set_str("keep", Value::Number(1.0));
    let ab = find_table(&root, "a.b", 0);
    let again = find_table(&root, "a", 0);
    assert!(again.raw_equal(&a));
    assert!(ab.as_table().is_some());
    assert_eq!(
        a.as_table().unwrap().borrow().raw_get_str("keep").as_number(),
        Some(1.0)
    );
}

#[test]
fn test_find_table_stops_at_non_table() {
    let root = Value::Table(new_table(0, 0));
    let a = find_table(&root, "a", 0);
    a.as_table()
        .unwrap()
        .borrow_mut()
        .raw_set_str("b", Value::from("leaf"));
    assert!(find_table(&root, "a.b.c", 0).is_nil());
    assert_eq!(
        a.as_table().unwrap().borrow().raw_get_str("b").as_str(),
        Some("leaf")
    );
}

#[test]
fn test_find_table_non_table_root() {
    assert!(find_table(&Value::Number(1.0), "a", 0).is_nil());
}

proptest! {
    #[test]
    fn prop_find_table_is_idempotent(segments in prop::collection::vec("[a-z]{1,4}", 1..5)) {
        let path = segments.join(".");
        let root = Value::Table(new_table(0, 0));
        let first = find_table(&root, &path, 2);
        let tables_after_first = count_tables(&root);
        let second = find_table(&root, &path, 2);
        match (&first, &second) {
            (Value::Table(a), Value::Table(b)) => prop_assert!(Rc::ptr_eq(a, b)),
            _ => prop_assert!(false, "expected tables"),
        }
        prop_assert_eq!(count_tables(&root), tables_after_first);
    }
}
