use moonhost_vm::{NativeFn, State, Value};

/// A bare state (no libraries) with `funcs` installed as globals.
pub fn state_with(funcs: &[(&str, NativeFn)]) -> State {
    let mut state = State::new();
    for (name, func) in funcs {
        let f = state.new_function(name, *func);
        state.set_global(name, f);
    }
    state
}

/// Execute Lua source in a bare state, returning its results.
pub fn run_lua(source: &str) -> Vec<Value> {
    run_lua_with(&[], source)
}

/// Execute Lua source with host functions installed.
pub fn run_lua_with(funcs: &[(&str, NativeFn)], source: &str) -> Vec<Value> {
    let mut state = state_with(funcs);
    state
        .do_string(source)
        .unwrap_or_else(|e| panic!("runtime error: {e}"))
}

/// Execute Lua source, expecting an error; returns its message.
pub fn run_lua_err(source: &str) -> String {
    run_lua_err_with(&[], source)
}

pub fn run_lua_err_with(funcs: &[(&str, NativeFn)], source: &str) -> String {
    let mut state = state_with(funcs);
    match state.do_string(source) {
        Err(e) => e.to_string(),
        Ok(vals) => panic!("expected error, got {} results: {:?}", vals.len(), vals),
    }
}

/// Check that results[idx] is a number with the expected value.
pub fn assert_num(results: &[Value], idx: usize, expected: f64) {
    let val = &results[idx];
    let got = val
        .as_number()
        .unwrap_or_else(|| panic!("result[{idx}] = {val:?}, expected number {expected}"));
    assert!(
        (got - expected).abs() < 1e-10,
        "result[{idx}] = {got}, expected {expected}"
    );
}

/// Check that results[idx] is a boolean with the expected value.
pub fn assert_bool(results: &[Value], idx: usize, expected: bool) {
    match &results[idx] {
        Value::Bool(b) => assert_eq!(*b, expected, "result[{idx}]"),
        other => panic!("result[{idx}] = {other:?}, expected bool {expected}"),
    }
}

/// Check that results[idx] is nil.
pub fn assert_nil(results: &[Value], idx: usize) {
    let val = &results[idx];
    assert!(val.is_nil(), "result[{idx}] = {val:?}, expected nil");
}

/// Check that results[idx] is a string with the expected value.
pub fn assert_str(results: &[Value], idx: usize, expected: &str) {
    let val = &results[idx];
    let got = val
        .as_str()
        .unwrap_or_else(|| panic!("result[{idx}] = {val:?}, expected string \"{expected}\""));
    assert_eq!(got, expected, "result[{idx}]");
}
