use super::helpers::*;

#[test]
fn test_time_and_date_round_trip() {
    let r = run_lua(
        "local t = os.time({year = 2001, month = 2, day = 3, hour = 4, min = 5, sec = 6})
         local d = os.date('*t', t)
         return d.year, d.month, d.day, d.hour, d.min, d.sec",
    );
    let expected = [2001.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    for (i, n) in expected.iter().enumerate() {
        assert_num(&r, i, *n);
    }
}

#[test]
fn test_time_normalises_fields() {
    let r = run_lua(
        "return os.time({year = 2020, month = 13, day = 1})
             == os.time({year = 2021, month = 1, day = 1})",
    );
    assert_bool(&r, 0, true);
}

#[test]
fn test_time_requires_fields() {
    let err = run_lua_err("os.time({year = 2020, month = 1})");
    assert_eq!(err, "<string>:1: field 'day' missing in date table");
}

#[test]
fn test_date_utc_format() {
    let r = run_lua("return os.date('!%Y-%m-%d %H:%M:%S', 86400), os.date('!*t', 0).wday");
    assert_str(&r, 0, "1970-01-02 00:00:00");
    // 1970-01-01 was a Thursday.
    assert_num(&r, 1, 5.0);
}

#[test]
fn test_clock_and_difftime() {
    let r = run_lua("local c = os.clock()\nreturn c >= 0, os.difftime(10, 4), type(os.time())");
    assert_bool(&r, 0, true);
    assert_num(&r, 1, 6.0);
    assert_str(&r, 2, "number");
}

#[test]
fn test_getenv() {
    let r = run_lua("return os.getenv('MOONHOST_SURELY_UNSET_VARIABLE')");
    assert_nil(&r, 0);
}

#[test]
fn test_rename_and_remove() {
    let dir = tempfile::tempdir().unwrap();
    let from = dir.path().join("a.txt");
    let to = dir.path().join("b.txt");
    std::fs::write(&from, "x").unwrap();
    let from_q = lua_quote(&from.to_string_lossy());
    let to_q = lua_quote(&to.to_string_lossy());
    let r = run_lua(&format!(
        "local renamed = os.rename({from_q}, {to_q})
         local removed = os.remove({to_q})
         local again, msg = os.remove({to_q})
         return renamed, removed, again, msg"
    ));
    assert_bool(&r, 0, true);
    assert_bool(&r, 1, true);
    assert_nil(&r, 2);
    let msg = r[3].as_str().unwrap();
    assert!(msg.starts_with(&*to.to_string_lossy()), "{msg}");
    assert!(!to.exists());
}
