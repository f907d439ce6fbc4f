use super::helpers::*;
use moonhost_vm::{Options, Value};

const MODULES: &[&str] = &[
    "package",
    "_G",
    "coroutine",
    "io",
    "string",
    "table",
    "math",
    "os",
    "debug",
];

#[test]
fn test_every_module_is_loaded() {
    let state = new_state();
    let loaded = state.loaded_modules();
    for name in MODULES {
        assert!(
            matches!(loaded.borrow().raw_get_str(name), Value::Table(_)),
            "package.loaded[{name}] missing"
        );
    }
}

#[test]
fn test_module_globals_match_loaded() {
    let r = run_lua(
        "return package.loaded.string == string, package.loaded._G == _G,
                require('math') == math, _VERSION",
    );
    assert_bool(&r, 0, true);
    assert_bool(&r, 1, true);
    assert_bool(&r, 2, true);
    assert_str(&r, 3, "Lua 5.1");
}

#[test]
fn test_open_libs_twice_keeps_tables() {
    let mut state = new_state();
    state.do_string("string.extra = 1").unwrap();
    let before = state.get_global("string");
    moonhost_stdlib::open_libs(&mut state).unwrap();
    let after = state.get_global("string");
    assert!(before.raw_equal(&after));
    let r = state.do_string("return string.extra, string.upper('ok')").unwrap();
    assert_num(&r, 0, 1.0);
    assert_str(&r, 1, "OK");
}

#[test]
fn test_skip_open_libs_leaves_bare_state() {
    let state = moonhost_stdlib::new_state(Options {
        skip_open_libs: true,
        ..Options::default()
    })
    .unwrap();
    assert!(state.get_global("print").is_nil());
    assert!(state.get_global("string").is_nil());
}

#[test]
fn test_string_methods_through_metatable() {
    let r = run_lua("local s = 'abc'\nreturn s:upper(), ('x'):rep(3), #s:sub(2)");
    assert_str(&r, 0, "ABC");
    assert_str(&r, 1, "xxx");
    assert_num(&r, 2, 2.0);
}

#[test]
fn test_host_string_metatable_is_kept() {
    let mut state = moonhost_stdlib::new_state(Options {
        skip_open_libs: true,
        ..Options::default()
    })
    .unwrap();
    let mt = moonhost_vm::new_table(0, 1);
    state.set_string_metatable(Some(mt.clone()));
    moonhost_stdlib::open_libs(&mut state).unwrap();
    let kept = state.string_metatable().unwrap();
    assert!(std::rc::Rc::ptr_eq(&kept, &mt));
}
