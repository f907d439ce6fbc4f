use super::helpers::*;

#[test]
fn test_running_is_nil_on_main_thread() {
    let r = run_lua("return coroutine.running(), select('#', coroutine.running())");
    assert_nil(&r, 0);
    assert_num(&r, 1, 1.0);
}

#[test]
fn test_status_of_main_thread() {
    let mut state = new_state();
    let main = state.main_thread();
    state.set_global("main", main);
    let r = state
        .do_string("return coroutine.status(main), type(main)")
        .unwrap();
    assert_str(&r, 0, "running");
    assert_str(&r, 1, "thread");
}

#[test]
fn test_status_requires_thread() {
    let err = run_lua_err("coroutine.status(1)");
    assert!(
        err.ends_with("bad argument #1 to status (thread expected, got number)"),
        "{err}"
    );
}
