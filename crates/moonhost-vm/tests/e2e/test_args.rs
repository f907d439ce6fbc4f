use super::helpers::*;
use moonhost_vm::{new_table, CallContext, ErrorKind, Kind, LuaError, State, Value};
use proptest::prelude::*;

fn native_num(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    Ok(vec![Value::Number(ctx.check_number(1)?)])
}

fn native_optnum(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    Ok(vec![Value::Number(ctx.opt_number(1, 42.0)?)])
}

fn native_second(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    Ok(vec![ctx.check_any(2)?])
}

fn native_mode(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let i = ctx.check_option(1, &["read", "write", "append"])?;
    Ok(vec![Value::from(i)])
}

fn native_keyed(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    ctx.check_kinds(1, &[Kind::Table, Kind::String])?;
    Ok(vec![Value::from(ctx.arg(1).kind().name())])
}

fn native_int(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    Ok(vec![Value::from(ctx.check_int64(1)?)])
}

const FUNCS: &[(&str, moonhost_vm::NativeFn)] = &[
    ("num", native_num),
    ("optnum", native_optnum),
    ("second", native_second),
    ("mode", native_mode),
    ("keyed", native_keyed),
    ("int", native_int),
];

#[test]
fn test_check_number_from_script() {
    let r = run_lua_with(FUNCS, "return num(3.5)");
    assert_num(&r, 0, 3.5);
}

#[test]
fn test_type_mismatch_message() {
    let err = run_lua_err_with(FUNCS, "num('x')");
    assert_eq!(
        err,
        "<string>:1: bad argument #1 to num (number expected, got string)"
    );
}

#[test]
fn test_type_mismatch_reports_calling_line() {
    let err = run_lua_err_with(FUNCS, "local a = 1\n\nnum({})");
    assert!(err.starts_with("<string>:3: "), "{err}");
    assert!(err.ends_with("(number expected, got table)"), "{err}");
}

#[test]
fn test_field_call_uses_field_name() {
    let err = run_lua_err_with(FUNCS, "local t = {f = num}\nt.f(true)");
    assert!(err.contains("bad argument #1 to f "), "{err}");
}

#[test]
fn test_opt_default_for_absent_and_nil() {
    let r = run_lua_with(FUNCS, "return optnum(), optnum(nil), optnum(7)");
    assert_num(&r, 0, 42.0);
    assert_num(&r, 1, 42.0);
    assert_num(&r, 2, 7.0);
}

#[test]
fn test_opt_raises_on_wrong_kind() {
    let err = run_lua_err_with(FUNCS, "optnum(false)");
    assert!(err.contains("number expected, got boolean"), "{err}");
}

#[test]
fn test_check_any_missing() {
    let err = run_lua_err_with(FUNCS, "second(1)");
    assert!(
        err.ends_with("bad argument #2 to second (value expected)"),
        "{err}"
    );
    let r = run_lua_with(FUNCS, "return second(1, nil), second(1, 'v')");
    assert_nil(&r, 0);
    assert_str(&r, 1, "v");
}

#[test]
fn test_check_option_from_script() {
    let r = run_lua_with(FUNCS, "return mode('write')");
    assert_num(&r, 0, 1.0);
    let err = run_lua_err_with(FUNCS, "mode('z')");
    assert!(
        err.ends_with("(invalid option: z (must be one of read,write,append))"),
        "{err}"
    );
}

#[test]
fn test_check_kinds_from_script() {
    let r = run_lua_with(FUNCS, "return keyed({}), keyed('s')");
    assert_str(&r, 0, "table");
    assert_str(&r, 1, "string");
    let err = run_lua_err_with(FUNCS, "keyed(1)");
    assert!(err.contains("(table or string expected)"), "{err}");
}

#[test]
fn test_int_truncation() {
    let r = run_lua_with(FUNCS, "return int(7.9), int(-7.9)");
    assert_num(&r, 0, 7.0);
    assert_num(&r, 1, -7.0);
}

#[test]
fn test_error_kinds_reach_host() {
    let mut state = state_with(FUNCS);
    let err = state.do_string("num(nil)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    let err = state.do_string("mode('x')").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOption);
    let err = state.do_string("second()").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentMissing);
}

// ---------------------------------------------------------------------------
// Properties over arity and kinds
// ---------------------------------------------------------------------------

fn any_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Nil),
        any::<bool>().prop_map(Value::Bool),
        (-1.0e6..1.0e6f64).prop_map(Value::Number),
        "[a-z]{0,6}".prop_map(Value::from),
        Just(()).prop_map(|_| Value::Table(new_table(0, 0))),
    ]
}

fn with_args<R>(args: Vec<Value>, f: impl FnOnce(&CallContext<'_>) -> R) -> R {
    let mut state = State::new();
    let ctx = CallContext::new(&mut state, args);
    f(&ctx)
}

proptest! {
    #[test]
    fn prop_check_any_within_and_beyond_arity(args in prop::collection::vec(any_value(), 0..8), extra in 1usize..4) {
        let arity = args.len();
        with_args(args.clone(), |ctx| {
            for (i, v) in args.iter().enumerate() {
                let got = ctx.check_any(i + 1).unwrap();
                prop_assert!(got.raw_equal(v));
            }
            let err = ctx.check_any(arity + extra).unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::ArgumentMissing);
            Ok(())
        })?;
    }

    #[test]
    fn prop_check_succeeds_iff_kind_matches(v in any_value()) {
        let kind = v.kind();
        with_args(vec![v.clone()], |ctx| {
            prop_assert_eq!(ctx.check_number(1).is_ok(), kind == Kind::Number);
            prop_assert_eq!(ctx.check_string(1).is_ok(), kind == Kind::String);
            prop_assert_eq!(ctx.check_bool(1).is_ok(), kind == Kind::Bool);
            prop_assert_eq!(ctx.check_table(1).is_ok(), kind == Kind::Table);
            if kind != Kind::Number {
                let err = ctx.check_number(1).unwrap_err();
                prop_assert_eq!(err.kind(), ErrorKind::TypeMismatch);
                let expected = format!("number expected, got {}", kind);
                prop_assert!(err.to_string().contains(&expected));
            }
            Ok(())
        })?;
    }

    #[test]
    fn prop_opt_never_substitutes_default(v in any_value()) {
        let kind = v.kind();
        with_args(vec![v.clone()], |ctx| {
            match ctx.opt_string(1, "default") {
                Ok(s) if kind == Kind::Nil => prop_assert_eq!(&*s, "default"),
                Ok(s) => {
                    prop_assert_eq!(kind, Kind::String);
                    prop_assert_eq!(Some(&*s), v.as_str());
                }
                Err(e) => {
                    prop_assert!(kind != Kind::Nil && kind != Kind::String);
                    prop_assert_eq!(e.kind(), ErrorKind::TypeMismatch);
                }
            }
            Ok(())
        })?;
    }
}
