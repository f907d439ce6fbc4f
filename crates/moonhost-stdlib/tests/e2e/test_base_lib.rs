use super::helpers::*;

#[test]
fn test_error_adds_position() {
    let err = run_lua_err("error('boom')");
    assert_eq!(err, "<string>:1: boom");
}

#[test]
fn test_error_level_zero_and_tables() {
    let r = run_lua(
        "local ok, e = pcall(error, 'plain', 0)
         local ok2, t = pcall(error, {code = 7})
         return ok, e, ok2, t.code",
    );
    assert_bool(&r, 0, false);
    assert_str(&r, 1, "plain");
    assert_bool(&r, 2, false);
    assert_num(&r, 3, 7.0);
}

#[test]
fn test_error_level_two_blames_caller() {
    let r = run_lua(
        "local function check(x) if not x then error('need x', 2) end end
         local ok, e = pcall(function()
           check(false)
         end)
         return e",
    );
    assert_str(&r, 0, "<string>:3: need x");
}

#[test]
fn test_pcall_and_xpcall() {
    let r = run_lua(
        "local ok, a, b = pcall(function(x, y) return x + y, x * y end, 3, 4)
         local ok2, h = xpcall(function() error('bad') end,
                               function(m) return 'handled: ' .. m end)
         return ok, a, b, ok2, h",
    );
    assert_bool(&r, 0, true);
    assert_num(&r, 1, 7.0);
    assert_num(&r, 2, 12.0);
    assert_bool(&r, 3, false);
    assert_str(&r, 4, "handled: <string>:2: bad");
}

#[test]
fn test_assert() {
    let r = run_lua("return assert(1, 'unused')");
    assert_num(&r, 0, 1.0);
    assert_eq!(run_lua_err("assert(false)"), "<string>:1: assertion failed!");
    assert_eq!(run_lua_err("assert(nil, 'custom')"), "<string>:1: custom");
    let err = run_lua_err("assert()");
    assert_eq!(err, "<string>:1: bad argument #1 to assert (value expected)");
}

#[test]
fn test_type_and_tostring() {
    let r = run_lua(
        "return type(nil), type(1), type('s'), type({}), type(print),
                tostring(10), tostring(true), tostring(nil)",
    );
    for (i, name) in ["nil", "number", "string", "table", "function"]
        .iter()
        .enumerate()
    {
        assert_str(&r, i, name);
    }
    assert_str(&r, 5, "10");
    assert_str(&r, 6, "true");
    assert_str(&r, 7, "nil");
}

#[test]
fn test_tostring_uses_metamethod() {
    let r = run_lua(
        "local t = setmetatable({}, {__tostring = function() return 'custom' end})
         return tostring(t)",
    );
    assert_str(&r, 0, "custom");
}

#[test]
fn test_tonumber() {
    let r = run_lua(
        "return tonumber('0x10'), tonumber(' 12 '), tonumber('z', 36),
                tonumber('ff', 16), tonumber('nope'), tonumber('-101', 2)",
    );
    assert_num(&r, 0, 16.0);
    assert_num(&r, 1, 12.0);
    assert_num(&r, 2, 35.0);
    assert_num(&r, 3, 255.0);
    assert_nil(&r, 4);
    assert_num(&r, 5, -5.0);
    let err = run_lua_err("tonumber('1', 99)");
    assert!(err.ends_with("bad argument #2 to tonumber (base out of range)"), "{err}");
}

#[test]
fn test_select() {
    let r = run_lua("return select('#', 1, nil, 3), select(2, 'a', 'b', 'c'), select(-1, 'x', 'y')");
    // Only the last call in an expression list expands.
    assert_eq!(r.len(), 3);
    assert_num(&r, 0, 3.0);
    assert_str(&r, 1, "b");
    assert_str(&r, 2, "y");
    let r = run_lua("return select(2, 'a', 'b', 'c')");
    assert_eq!(r.len(), 2);
    let err = run_lua_err("select(0, 1)");
    assert!(err.ends_with("(index out of range)"), "{err}");
}

#[test]
fn test_pairs_and_ipairs() {
    let r = run_lua(
        "local t = {10, 20, 30, x = 1, y = 2}
         local isum, icount = 0, 0
         for i, v in ipairs(t) do isum = isum + v; icount = icount + 1 end
         local keys = 0
         for k in pairs(t) do keys = keys + 1 end
         return isum, icount, keys, next({})",
    );
    assert_num(&r, 0, 60.0);
    assert_num(&r, 1, 3.0);
    assert_num(&r, 2, 5.0);
    assert_nil(&r, 3);
}

#[test]
fn test_raw_access_bypasses_metamethods() {
    let r = run_lua(
        "local t = setmetatable({}, {
           __index = function() return 'meta' end,
           __newindex = function() error('blocked') end,
         })
         rawset(t, 'k', 1)
         return t.k, t.other, rawget(t, 'other'), rawequal(t, t), rawequal(t, {})",
    );
    assert_num(&r, 0, 1.0);
    assert_str(&r, 1, "meta");
    assert_nil(&r, 2);
    assert_bool(&r, 3, true);
    assert_bool(&r, 4, false);
}

#[test]
fn test_protected_metatable() {
    let r = run_lua(
        "local t = setmetatable({}, {__metatable = 'locked'})
         local ok, e = pcall(setmetatable, t, {})
         return getmetatable(t), ok, e",
    );
    assert_str(&r, 0, "locked");
    assert_bool(&r, 1, false);
    assert_str(&r, 2, "cannot change a protected metatable");
}

#[test]
fn test_setmetatable_checks_second_argument() {
    let err = run_lua_err("setmetatable({}, 5)");
    assert!(
        err.ends_with("bad argument #2 to setmetatable (nil or table expected)"),
        "{err}"
    );
}

#[test]
fn test_unpack() {
    let r = run_lua("return unpack({1, 2, 3}, 2, 3)");
    assert_eq!(r.len(), 2);
    assert_num(&r, 0, 2.0);
    assert_num(&r, 1, 3.0);
    let r = run_lua("return unpack({1, nil, 3}, 1, 3)");
    assert_eq!(r.len(), 3);
    assert_nil(&r, 1);
}

#[test]
fn test_unpack_extreme_range_is_an_error() {
    let r = run_lua("return pcall(unpack, {}, -1e300, 1e300)");
    assert_bool(&r, 0, false);
    let message = r[1].as_str().unwrap_or_default().to_string();
    assert!(message.contains("too many results to unpack"), "{message}");

    let r = run_lua("return select('#', unpack({}, 1e300, -1e300))");
    assert_num(&r, 0, 0.0);
}

#[test]
fn test_loadstring_and_load_reader() {
    let r = run_lua(
        "local f = loadstring('return 1 + ...')
         local parts = {'return ', '40', ' + 2'}
         local i = 0
         local g = load(function() i = i + 1; return parts[i] end)
         local bad, msg = loadstring('return +', 'chunk')
         return f(2), g(), bad, msg",
    );
    assert_num(&r, 0, 3.0);
    assert_num(&r, 1, 42.0);
    assert_nil(&r, 2);
    let msg = r[3].as_str().unwrap();
    assert!(msg.starts_with("chunk:1:"), "{msg}");
}

#[test]
fn test_dofile_and_loadfile() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mod.lua");
    std::fs::write(&path, "return 'from file', ...").unwrap();
    let quoted = lua_quote(&path.to_string_lossy());
    let r = run_lua(&format!(
        "local f = loadfile({quoted})
         local missing, msg = loadfile('/no/such/file.lua')
         return dofile({quoted}), f('x'), missing, msg"
    ));
    assert_eq!(r.len(), 4);
    assert_str(&r, 0, "from file");
    assert_str(&r, 1, "from file");
    assert_nil(&r, 2);
    assert_str(&r, 3, "can not read /no/such/file.lua");
}

#[test]
fn test_pcall_catches_runaway_recursion_on_small_thread() {
    let worker = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| {
            let r = run_lua(
                "local function f(n) if n == 0 then return 0 end return 1 + f(n - 1) end
                 local ok, err = pcall(f, 1000)
                 return ok, err, f(150)",
            );
            (
                matches!(r[0], moonhost_vm::Value::Bool(false)),
                r[1].as_str().map(str::to_string),
                r[2].as_number(),
            )
        })
        .unwrap();
    let (failed, message, sum) = worker.join().unwrap();
    assert!(failed);
    assert_eq!(message.as_deref(), Some("stack overflow"));
    assert_eq!(sum, Some(150.0));
}
