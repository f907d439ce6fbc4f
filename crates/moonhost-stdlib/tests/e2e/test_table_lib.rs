use super::helpers::*;

#[test]
fn test_insert_append_and_position() {
    let r = run_lua(
        "local t = {1, 2, 3}
         table.insert(t, 4)
         table.insert(t, 1, 0)
         return table.concat(t, ','), #t",
    );
    assert_str(&r, 0, "0,1,2,3,4");
    assert_num(&r, 1, 5.0);
}

#[test]
fn test_insert_errors() {
    let err = run_lua_err("table.insert({}, 1, 2, 3)");
    assert_eq!(err, "<string>:1: wrong number of arguments to 'insert'");
    let err = run_lua_err("table.insert({}, 0, 'x')");
    assert!(err.ends_with("bad argument #2 to insert (position out of bounds)"), "{err}");
}

#[test]
fn test_remove() {
    let r = run_lua(
        "local t = {'a', 'b', 'c'}
         local last = table.remove(t)
         local first = table.remove(t, 1)
         return last, first, t[1], #t, table.remove({})",
    );
    assert_str(&r, 0, "c");
    assert_str(&r, 1, "a");
    assert_str(&r, 2, "b");
    assert_num(&r, 3, 1.0);
    assert_eq!(r.len(), 4);
}

#[test]
fn test_concat_ranges_and_errors() {
    let r = run_lua("return table.concat({1, 2, 3}), table.concat({'a', 'b', 'c'}, '-', 2, 3), table.concat({}, 'x')");
    assert_str(&r, 0, "123");
    assert_str(&r, 1, "b-c");
    assert_str(&r, 2, "");
    let err = run_lua_err("table.concat({1, {}, 3})");
    assert_eq!(
        err,
        "<string>:1: invalid value (at index 2) in table for 'concat'"
    );
}

#[test]
fn test_sort_default_and_comparator() {
    let r = run_lua(
        "local a = {5, 2, 8, 1, 9}
         table.sort(a)
         local b = {'pear', 'apple', 'fig'}
         table.sort(b, function(x, y) return #x < #y end)
         return table.concat(a, ' '), table.concat(b, ' ')",
    );
    assert_str(&r, 0, "1 2 5 8 9");
    assert_str(&r, 1, "fig pear apple");
}

#[test]
fn test_sort_errors_propagate() {
    let err = run_lua_err("table.sort({1, 'x', 2})");
    assert!(err.contains("attempt to compare"), "{err}");
    let err = run_lua_err("table.sort({1, 2}, 5)");
    assert!(
        err.ends_with("bad argument #2 to sort (function expected, got number)"),
        "{err}"
    );
}

#[test]
fn test_maxn() {
    let r = run_lua("return table.maxn({1, 2, [10] = 3, x = 4}), table.maxn({})");
    assert_num(&r, 0, 10.0);
    assert_num(&r, 1, 0.0);
}
