use super::helpers::*;

#[test]
fn test_len_sub_and_case() {
    let r = run_lua(
        "local s = 'Hello'
         return string.len(s), s:sub(2, 3), s:sub(-3), s:sub(4, 2), s:upper(), s:lower()",
    );
    assert_num(&r, 0, 5.0);
    assert_str(&r, 1, "el");
    assert_str(&r, 2, "llo");
    assert_str(&r, 3, "");
    assert_str(&r, 4, "HELLO");
    assert_str(&r, 5, "hello");
}

#[test]
fn test_rep_and_reverse() {
    let r = run_lua("return ('ab'):rep(3), ('ab'):rep(0), ('abc'):reverse()");
    assert_str(&r, 0, "ababab");
    assert_str(&r, 1, "");
    assert_str(&r, 2, "cba");
}

#[test]
fn test_rep_too_large_is_catchable() {
    let err = run_lua_err("return string.rep('x', 1e18)");
    assert_eq!(err, "<string>:1: resulting string too large");

    let r = run_lua("local ok, e = pcall(string.rep, 'abc', 2^40)\nreturn ok, e");
    assert_bool(&r, 0, false);
    assert_str(&r, 1, "resulting string too large");
}

#[test]
fn test_byte_and_char() {
    let r = run_lua("return string.char(72, 105), ('ABC'):byte(), ('ABC'):byte(-1)");
    assert_str(&r, 0, "Hi");
    assert_num(&r, 1, 65.0);
    assert_num(&r, 2, 67.0);
    let r = run_lua("return ('ABC'):byte(1, 3)");
    assert_eq!(r.len(), 3);
    assert_num(&r, 2, 67.0);
    let err = run_lua_err("string.char(256)");
    assert!(err.ends_with("bad argument #1 to char (invalid value)"), "{err}");
}

#[test]
fn test_find_plain() {
    let r = run_lua(
        "local a, b = ('hello world'):find('o w')
         local c = ('hello'):find('l', 4)
         local d = ('hello'):find('z')
         return a, b, c, d",
    );
    assert_num(&r, 0, 5.0);
    assert_num(&r, 1, 7.0);
    assert_num(&r, 2, 4.0);
    assert_nil(&r, 3);
}

#[test]
fn test_format_numbers() {
    let r = run_lua(
        "return string.format('%5.2f', 3.14159), string.format('%05d', -42),
                string.format('%e', 12345.678), string.format('%g', 1e6),
                string.format('%x|%X|%o', 255, 255, 8), string.format('%+d', 7)",
    );
    assert_str(&r, 0, " 3.14");
    assert_str(&r, 1, "-0042");
    assert_str(&r, 2, "1.234568e+04");
    assert_str(&r, 3, "1e+06");
    assert_str(&r, 4, "ff|FF|10");
    assert_str(&r, 5, "+7");
}

#[test]
fn test_format_strings() {
    let r = run_lua(
        "return string.format('%-5s|', 'ab'), string.format('%5.1s|', 'abc'),
                string.format('%s and %s', 1, true), string.format('100%%'),
                string.format('%q', 'say \"hi\"'), string.format('%c', 65)",
    );
    assert_str(&r, 0, "ab   |");
    assert_str(&r, 1, "    a|");
    assert_str(&r, 2, "1 and true");
    assert_str(&r, 3, "100%");
    assert_str(&r, 4, "\"say \\\"hi\\\"\"");
    assert_str(&r, 5, "A");
}

#[test]
fn test_format_uses_tostring_metamethod() {
    let r = run_lua(
        "local p = setmetatable({}, {__tostring = function() return 'point' end})
         return string.format('<%s>', p)",
    );
    assert_str(&r, 0, "<point>");
}

#[test]
fn test_format_errors() {
    let err = run_lua_err("string.format('%d')");
    assert!(err.ends_with("bad argument #2 to format (no value)"), "{err}");
    let err = run_lua_err("string.format('%d', 'x')");
    assert!(
        err.ends_with("bad argument #2 to format (number expected, got string)"),
        "{err}"
    );
    let err = run_lua_err("string.format('%y', 1)");
    assert_eq!(err, "<string>:1: invalid option '%y' to 'format'");
    let err = run_lua_err("string.format('%100d', 1)");
    assert!(err.ends_with("invalid format (width or precision too long)"), "{err}");
}

#[test]
fn test_check_string_rejects_tables() {
    let err = run_lua_err("string.upper({})");
    assert_eq!(
        err,
        "<string>:1: bad argument #1 to upper (string expected, got table)"
    );
}
