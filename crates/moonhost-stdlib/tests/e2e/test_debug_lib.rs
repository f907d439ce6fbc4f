use super::helpers::*;

#[test]
fn test_traceback_from_script() {
    let r = run_lua(
        "local function inner()
           return debug.traceback('oops')
         end
         return inner()",
    );
    let trace = r[0].as_str().unwrap();
    assert!(trace.starts_with("oops\nstack traceback:\n\t<string>:2: in function 'inner'"), "{trace}");
    assert!(trace.ends_with("in main chunk"), "{trace}");
}

#[test]
fn test_traceback_passes_non_strings_through() {
    let r = run_lua("local t = {}\nreturn debug.traceback(t) == t");
    assert_bool(&r, 0, true);
}

#[test]
fn test_getinfo_levels() {
    let r = run_lua(
        "local function probe()
           local info = debug.getinfo(1)
           return info.currentline, info.what, info.name, info.short_src
         end
         local line, what, name, src = probe()
         local main = debug.getinfo(1)
         return line, what, name, src, main.what, debug.getinfo(50)",
    );
    assert_num(&r, 0, 2.0);
    assert_str(&r, 1, "Lua");
    assert_str(&r, 2, "probe");
    assert_str(&r, 3, "<string>");
    assert_str(&r, 4, "main");
    assert_nil(&r, 5);
}

#[test]
fn test_getinfo_function_argument() {
    let r = run_lua(
        "local function f() end
         local a = debug.getinfo(f)
         local b = debug.getinfo(print)
         return a.what, a.linedefined, a.func == f, b.what, b.short_src",
    );
    assert_str(&r, 0, "Lua");
    assert_num(&r, 1, 1.0);
    assert_bool(&r, 2, true);
    assert_str(&r, 3, "C");
    assert_str(&r, 4, "[C]");
}

#[test]
fn test_raw_metatable_access() {
    let r = run_lua(
        "local mt = {__metatable = 'hidden'}
         local t = setmetatable({}, mt)
         local ok = debug.setmetatable(t, nil)
         return debug.getmetatable(setmetatable({}, mt)) == mt, ok, getmetatable(t)",
    );
    assert_bool(&r, 0, true);
    assert_bool(&r, 1, true);
    assert_nil(&r, 2);
}
