use super::helpers::*;
use moonhost_vm::{CallContext, ErrorKind, LuaError, NativeFn, State, Value};
use std::io::{Cursor, Write};

fn native_fail(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let message = ctx.check_string(1)?;
    Err(ctx.state.raise(ErrorKind::Runtime, &*message))
}

fn native_where(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    Ok(vec![Value::from(ctx.state.location(1))])
}

const FUNCS: &[(&str, NativeFn)] = &[("fail", native_fail), ("where", native_where)];

fn write_script(dir: &tempfile::TempDir, name: &str, source: &str) -> String {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(source.as_bytes()).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_load_file_uses_base_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(&dir, "script.lua", "local a = 1\nreturn where()");
    let mut state = state_with(FUNCS);
    let r = state.do_file(&path).unwrap();
    assert_str(&r, 0, "script.lua:2:");
}

#[test]
fn test_load_file_missing() {
    let mut state = State::new();
    let err = state.load_file("/no/such/file").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::File);
    assert_eq!(err.to_string(), "can not read /no/such/file");
}

#[test]
fn test_load_file_does_not_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(&dir, "set.lua", "ran = true");
    let mut state = State::new();
    let chunk = state.load_file(&path).unwrap();
    assert!(state.get_global("ran").is_nil());
    state.call(&Value::Function(chunk), vec![]).unwrap();
    assert!(matches!(state.get_global("ran"), Value::Bool(true)));
}

#[test]
fn test_load_file_skips_shebang() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(&dir, "tool.lua", "#!/usr/bin/env moonhost\nreturn 5");
    let mut state = State::new();
    let r = state.do_file(&path).unwrap();
    assert_num(&r, 0, 5.0);
}

#[test]
fn test_load_file_compile_error_names_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(&dir, "bad.lua", "return 1 +");
    let mut state = State::new();
    let err = state.load_file(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Compile);
    assert!(err.to_string().starts_with("bad.lua:1:"), "{err}");
}

#[test]
fn test_load_file_empty_path_reads_stdin() {
    let mut state = state_with(FUNCS);
    state.set_stdin(Box::new(Cursor::new(b"return where(), 7".to_vec())));
    let chunk = state.load_file("").unwrap();
    let r = state.call(&Value::Function(chunk), vec![]).unwrap();
    assert_str(&r, 0, "<stdin>:1:");
    assert_num(&r, 1, 7.0);
}

#[test]
fn test_load_from_reader() {
    let mut state = State::new();
    let chunk = state
        .load(Cursor::new("return ...".as_bytes()), "reader")
        .unwrap();
    let r = state
        .call(&Value::Function(chunk), vec![Value::Number(1.0), Value::Number(2.0)])
        .unwrap();
    assert_eq!(r.len(), 2);
    assert_num(&r, 1, 2.0);
}

#[test]
fn test_load_string_chunk_name() {
    let mut state = state_with(FUNCS);
    let chunk = state.load_string("return where()").unwrap();
    let r = state.call(&Value::Function(chunk), vec![]).unwrap();
    assert_str(&r, 0, "<string>:1:");
}

#[test]
fn test_do_string_returns_runtime_error() {
    let mut state = state_with(FUNCS);
    let err = state.do_string("fail('boom')").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Runtime);
    assert!(err.to_string().contains("boom"));
    assert_eq!(state.call_depth(), 0);
}

#[test]
fn test_do_string_compile_error_runs_nothing() {
    let mut state = State::new();
    let err = state.do_string("x = 1\nreturn 1+").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Compile);
    assert!(state.get_global("x").is_nil());
}

#[test]
fn test_load_string_rejects_deep_nesting() {
    let depth = 100_000;
    let source = format!("return {}1{}", "(".repeat(depth), ")".repeat(depth));
    let mut state = State::new();
    let err = state.load_string(&source).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Compile);
    assert!(err.to_string().contains("too many syntax levels"), "{err}");
}

#[test]
fn test_protected_call_keeps_side_effects() {
    let mut state = state_with(FUNCS);
    assert!(state.do_string("x = 1\nfail('late')\nx = 2").is_err());
    assert_eq!(state.get_global("x").as_number(), Some(1.0));
}

#[test]
fn test_do_string_returns_all_results() {
    let r = run_lua("return 1, 'two', nil, true");
    assert_eq!(r.len(), 4);
    assert_num(&r, 0, 1.0);
    assert_str(&r, 1, "two");
    assert_nil(&r, 2);
    assert_bool(&r, 3, true);
}
