use super::helpers::*;

#[test]
fn test_require_preload() {
    let r = run_lua(
        "local calls = 0
         package.preload.greet = function(name)
           calls = calls + 1
           return {hello = 'hi from ' .. name}
         end
         local a = require('greet')
         local b = require('greet')
         return a.hello, a == b, calls, package.loaded.greet == a",
    );
    assert_str(&r, 0, "hi from greet");
    assert_bool(&r, 1, true);
    assert_num(&r, 2, 1.0);
    assert_bool(&r, 3, true);
}

#[test]
fn test_require_module_without_result_is_true() {
    let r = run_lua(
        "package.preload.quiet = function() end
         return require('quiet')",
    );
    assert_bool(&r, 0, true);
}

#[test]
fn test_require_from_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("util")).unwrap();
    std::fs::write(
        dir.path().join("util").join("strings.lua"),
        "local name = ...\nreturn {name = name, shout = function(s) return s:upper() end}",
    )
    .unwrap();
    let pattern = lua_quote(&format!("{}/?.lua", dir.path().to_string_lossy()));
    let r = run_lua(&format!(
        "package.path = {pattern}
         local m = require('util.strings')
         return m.name, m.shout('ok')"
    ));
    assert_str(&r, 0, "util.strings");
    assert_str(&r, 1, "OK");
}

#[test]
fn test_require_compile_error_names_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.lua"), "return +").unwrap();
    let pattern = lua_quote(&format!("{}/?.lua", dir.path().to_string_lossy()));
    let mut state = new_state();
    let err = state
        .do_string(&format!("package.path = {pattern}\nrequire('broken')"))
        .unwrap_err()
        .to_string();
    assert!(err.contains("error loading module 'broken' from file"), "{err}");
}

#[test]
fn test_require_not_found_lists_attempts() {
    let err = run_lua_err("package.path = './?.lua'\nrequire('nope')");
    assert!(err.starts_with("<string>:2: module 'nope' not found:"), "{err}");
    assert!(err.contains("\n\tno field package.preload['nope']"), "{err}");
    assert!(err.contains("\n\tno file './nope.lua'"), "{err}");
}

#[test]
fn test_custom_loader() {
    let r = run_lua(
        "table.insert(package.loaders, function(name)
           if name == 'virtual' then
             return function() return 'made up' end
           end
         end)
         return require('virtual')",
    );
    assert_str(&r, 0, "made up");
}

#[test]
fn test_seeall_exposes_globals() {
    let r = run_lua(
        "local m = {}
         package.seeall(m)
         return m.print == print, rawget(m, 'print')",
    );
    assert_bool(&r, 0, true);
    assert_nil(&r, 1);
}
