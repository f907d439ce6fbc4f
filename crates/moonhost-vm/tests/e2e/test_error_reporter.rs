use super::helpers::*;
use moonhost_vm::{CallContext, ErrorKind, LuaError, NativeFn, State, Value};

fn native_where(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let level = ctx.opt_int(1, 1)?;
    Ok(vec![Value::from(ctx.state.location(level as usize))])
}

fn native_boom(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    Err(ctx.state.raise(ErrorKind::Runtime, "boom"))
}

fn native_argerr(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    Err(ctx.arg_error(2, "custom detail"))
}

fn native_tb(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    Ok(vec![Value::from(ctx.state.traceback(Some("msg"), 1))])
}

const FUNCS: &[(&str, NativeFn)] = &[
    ("where", native_where),
    ("boom", native_boom),
    ("argerr", native_argerr),
    ("tb", native_tb),
];

#[test]
fn test_where_levels() {
    let r = run_lua_with(
        FUNCS,
        "local function inner() return where(1), where(2), where(0), where(9) end\n\
         return inner()",
    );
    assert_str(&r, 0, "<string>:1:");
    assert_str(&r, 1, "<string>:2:");
    assert_str(&r, 2, "");
    assert_str(&r, 3, "");
}

#[test]
fn test_where_without_source_name() {
    let mut state = state_with(FUNCS);
    let chunk = state.load_buffer(b"return where(1)", "").unwrap();
    let r = state.call(&Value::Function(chunk), vec![]).unwrap();
    assert_str(&r, 0, "[G]:1:");
}

#[test]
fn test_location_with_empty_stack() {
    let state = State::new();
    assert_eq!(state.location(0), "");
    assert_eq!(state.runtime_error("plain").to_string(), "plain");
    assert_eq!(state.frame_function_name(0), "?");
}

#[test]
fn test_raise_is_positioned_at_caller() {
    let err = run_lua_err_with(FUNCS, "local x = 1\nboom()");
    assert_eq!(err, "<string>:2: boom");
}

#[test]
fn test_arg_error_format() {
    let err = run_lua_err_with(FUNCS, "argerr(1, 2)");
    assert_eq!(err, "<string>:1: bad argument #2 to argerr (custom detail)");
}

#[test]
fn test_arg_error_without_name() {
    let err = run_lua_err_with(FUNCS, "local t = {argerr}\nt[1]()");
    assert!(err.contains("bad argument #2 to ? (custom detail)"), "{err}");
}

#[test]
fn test_traceback_lists_frames() {
    let r = run_lua_with(
        FUNCS,
        "local function inner() return tb() end\n\
         return inner()",
    );
    assert_str(
        &r,
        0,
        "msg\nstack traceback:\n\t<string>:1: in function 'inner'\n\t<string>:2: in main chunk",
    );
}

#[test]
fn test_runtime_errors_are_positioned() {
    let err = run_lua_err("local t = nil\nreturn t.x");
    assert_eq!(err, "<string>:2: attempt to index local 't' (a nil value)");
}
