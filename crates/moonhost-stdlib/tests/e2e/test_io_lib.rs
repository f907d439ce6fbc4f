use super::helpers::*;
use std::io::Cursor;

fn temp_path(dir: &tempfile::TempDir, name: &str) -> String {
    lua_quote(&dir.path().join(name).to_string_lossy())
}

#[test]
fn test_write_then_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "out.txt");
    let r = run_lua(&format!(
        "local f = assert(io.open({path}, 'w'))
         f:write('line one\\n', 2, '\\n'):write('tail')
         f:close()
         local g = assert(io.open({path}))
         local first = g:read('*l')
         local n = g:read('*n')
         local rest = g:read('*a')
         g:close()
         return first, n, rest"
    ));
    assert_str(&r, 0, "line one");
    assert_num(&r, 1, 2.0);
    assert_str(&r, 2, "tail");
}

#[test]
fn test_lines_iterates_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("in.txt"), "a\nb\nc\n").unwrap();
    let path = temp_path(&dir, "in.txt");
    let r = run_lua(&format!(
        "local f = io.open({path})
         local out = {{}}
         for line in f:lines() do out[#out + 1] = line end
         f:close()
         return table.concat(out, '+'), #out"
    ));
    assert_str(&r, 0, "a+b+c");
    assert_num(&r, 1, 3.0);
}

#[test]
fn test_read_counts_and_eof() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("n.txt"), "abcdef").unwrap();
    let path = temp_path(&dir, "n.txt");
    let r = run_lua(&format!(
        "local f = io.open({path})
         local a = f:read(4)
         local b = f:read(10)
         local c = f:read(1)
         local d = f:read('*l')
         return a, b, c, d"
    ));
    assert_str(&r, 0, "abcd");
    assert_str(&r, 1, "ef");
    assert_nil(&r, 2);
    assert_nil(&r, 3);
}

#[test]
fn test_read_huge_count_returns_what_is_there() {
    let mut state = new_state();
    state.set_stdin(Box::new(Cursor::new(b"short".to_vec())));
    let r = state
        .do_string("return io.read(1e15), io.read(1e15)")
        .unwrap();
    assert_str(&r, 0, "short");
    assert_nil(&r, 1);
}

#[test]
fn test_open_failures() {
    let r = run_lua("return io.open('/no/such/dir/file.txt')");
    assert_nil(&r, 0);
    let msg = r[1].as_str().unwrap();
    assert!(msg.starts_with("/no/such/dir/file.txt: "), "{msg}");
    let err = run_lua_err("io.open('x', 'q')");
    assert!(err.ends_with("bad argument #2 to open (invalid mode 'q')"), "{err}");
}

#[test]
fn test_io_type_and_closed_handles() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "t.txt");
    let r = run_lua(&format!(
        "local f = io.open({path}, 'w')
         local open_kind = io.type(f)
         f:close()
         local ok, e = pcall(f.write, f, 'x')
         return open_kind, io.type(f), io.type(42), ok, e, tostring(f)"
    ));
    assert_str(&r, 0, "file");
    assert_str(&r, 1, "closed file");
    assert_nil(&r, 2);
    assert_bool(&r, 3, false);
    assert_str(&r, 4, "attempt to use a closed file");
    assert_str(&r, 5, "file (closed)");
}

#[test]
fn test_standard_handles_cannot_close() {
    let r = run_lua("return io.stdout:close()");
    assert_nil(&r, 0);
    assert_str(&r, 1, "cannot close standard file");
}

#[test]
fn test_io_read_uses_state_stdin() {
    let mut state = new_state();
    state.set_stdin(Box::new(Cursor::new(b"first\n42\nrest".to_vec())));
    let r = state
        .do_string("return io.read(), io.read('*n'), io.stdin:read('*a')")
        .unwrap();
    assert_str(&r, 0, "first");
    assert_num(&r, 1, 42.0);
    assert_str(&r, 2, "rest");
}

#[test]
fn test_bad_read_format() {
    let err = run_lua_err("io.read('*x')");
    assert!(err.ends_with("bad argument #1 to read (invalid format)"), "{err}");
}
