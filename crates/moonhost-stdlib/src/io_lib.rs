//! Lua 5.1 io library.
//!
//! File handles are userdata of type `FILE*`. Their metatable is the one
//! registered under that name, with the method table installed as `__index`.

use moonhost_vm::error::ErrorKind;
use moonhost_vm::value::UserData;
use moonhost_vm::{new_table, CallContext, FunctionSet, Kind, LuaError, State, TableRef, Value};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::rc::Rc;

/// Registered type name of file handles.
pub const FILE_TYPE: &str = "FILE*";

// ---------------------------------------------------------------------------
// LuaFile: the data stored inside userdata
// ---------------------------------------------------------------------------

/// Internal file representation for the io library.
pub struct LuaFile {
    pub inner: LuaFileInner,
    pub name: String,
}

/// Variants for the backing file stream.
pub enum LuaFileInner {
    /// Reads go to the owning state's standard input.
    Stdin,
    Stdout,
    Stderr,
    File(BufReader<File>),
    Closed,
}

impl LuaFile {
    fn new_file(file: File, name: String) -> Self {
        LuaFile {
            inner: LuaFileInner::File(BufReader::new(file)),
            name,
        }
    }

    fn std(inner: LuaFileInner, name: &str) -> Self {
        LuaFile {
            inner,
            name: name.to_string(),
        }
    }

    fn is_stdio(&self) -> bool {
        matches!(
            self.inner,
            LuaFileInner::Stdin | LuaFileInner::Stdout | LuaFileInner::Stderr
        )
    }

    fn is_closed(&self) -> bool {
        matches!(self.inner, LuaFileInner::Closed)
    }
}

impl Write for LuaFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            LuaFileInner::Stdout => io::stdout().write(buf),
            LuaFileInner::Stderr => io::stderr().write(buf),
            LuaFileInner::File(f) => f.get_mut().write(buf),
            LuaFileInner::Stdin | LuaFileInner::Closed => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "file not writable",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            LuaFileInner::Stdout => io::stdout().flush(),
            LuaFileInner::Stderr => io::stderr().flush(),
            LuaFileInner::File(f) => f.get_mut().flush(),
            LuaFileInner::Stdin | LuaFileInner::Closed => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

const IO_FUNCS: FunctionSet<'static> = &[
    ("open", native_io_open),
    ("close", native_io_close),
    ("read", native_io_read),
    ("write", native_io_write),
    ("type", native_io_type),
];

const FILE_METHODS: FunctionSet<'static> = &[
    ("read", native_file_read),
    ("write", native_file_write),
    ("lines", native_file_lines),
    ("close", native_file_close),
    ("flush", native_file_flush),
];

pub fn open(state: &mut State) -> Result<TableRef, LuaError> {
    let io = state.register_module("io", IO_FUNCS)?;

    let mt = state.new_type_metatable(FILE_TYPE);
    if mt.borrow().raw_get_str("__index").is_nil() {
        let methods = Value::Table(new_table(0, FILE_METHODS.len()));
        state.register_module_to_table(&methods, FILE_METHODS)?;
        let tostring = state.new_function("tostring", native_file_tostring);
        let mut mt = mt.borrow_mut();
        mt.raw_set_str("__index", methods);
        mt.raw_set_str("__tostring", tostring);
    }

    for (field, inner) in [
        ("stdin", LuaFileInner::Stdin),
        ("stdout", LuaFileInner::Stdout),
        ("stderr", LuaFileInner::Stderr),
    ] {
        if io.borrow().raw_get_str(field).is_nil() {
            let handle = state.new_userdata(LuaFile::std(inner, field), Some(FILE_TYPE));
            io.borrow_mut().raw_set_str(field, handle);
        }
    }
    Ok(io)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn io_field(state: &State, field: &str) -> Value {
    match state.loaded_modules().borrow().raw_get_str("io") {
        Value::Table(io) => io.borrow().raw_get_str(field),
        _ => Value::Nil,
    }
}

/// Argument `n` as an open file handle.
fn check_file(ctx: &CallContext, n: usize) -> Result<Rc<UserData>, LuaError> {
    let arg = ctx.arg(n);
    let ud = match &arg {
        Value::UserData(ud) if ud.is::<LuaFile>() => ud.clone(),
        other => {
            let detail = format!("{FILE_TYPE} expected, got {}", other.kind());
            return Err(ctx.arg_error_kind(ErrorKind::TypeMismatch, n, &detail));
        }
    };
    let closed = ud.borrow::<LuaFile>().map(|f| f.is_closed()).unwrap_or(true);
    if closed {
        return Err(ctx
            .state
            .raise(ErrorKind::Runtime, "attempt to use a closed file"));
    }
    Ok(ud)
}

/// `nil, message` pair for a failed io operation.
fn io_fail(prefix: Option<&str>, err: &io::Error) -> Vec<Value> {
    let mut message = err.to_string();
    if let Some(i) = message.find(" (os error") {
        message.truncate(i);
    }
    let message = match prefix {
        Some(p) => format!("{p}: {message}"),
        None => message,
    };
    vec![Value::Nil, Value::from(message)]
}

/// One read format against `reader`. `Ok(None)` means end of file.
fn read_one(reader: &mut dyn BufRead, format: &Value) -> io::Result<Option<Value>> {
    if let Value::Number(n) = format {
        let n = n.max(0.0) as u64;
        let mut buf = Vec::new();
        let filled = Read::take(&mut *reader, n).read_to_end(&mut buf)?;
        if filled == 0 && (n > 0 || reader.fill_buf()?.is_empty()) {
            return Ok(None);
        }
        return Ok(Some(Value::from(String::from_utf8_lossy(&buf).into_owned())));
    }
    let spec = format.as_str().unwrap_or("*l");
    let spec = spec.strip_prefix('*').unwrap_or(spec);
    match spec.chars().next() {
        Some('a') => {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf)?;
            Ok(Some(Value::from(String::from_utf8_lossy(&buf).into_owned())))
        }
        Some('n') => {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            Ok(Some(
                moonhost_vm::coerce::str_to_number(&line)
                    .map(Value::Number)
                    .unwrap_or_default(),
            ))
        }
        _ => {
            let mut buf = Vec::new();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                return Ok(None);
            }
            if buf.last() == Some(&b'\n') {
                buf.pop();
            }
            Ok(Some(Value::from(String::from_utf8_lossy(&buf).into_owned())))
        }
    }
}

fn validate_formats(ctx: &CallContext, first: usize) -> Result<Vec<Value>, LuaError> {
    let mut formats = Vec::new();
    for n in first..=ctx.arg_count() {
        let f = ctx.arg(n);
        match &f {
            Value::Number(_) => {}
            Value::String(s) => {
                let spec = s.strip_prefix('*').unwrap_or(s);
                if !matches!(spec.chars().next(), Some('a' | 'l' | 'n')) {
                    return Err(ctx.arg_error(n, "invalid format"));
                }
            }
            _ => return Err(ctx.arg_error(n, "invalid option")),
        }
        formats.push(f);
    }
    if formats.is_empty() {
        formats.push(Value::from("*l"));
    }
    Ok(formats)
}

fn read_formats(reader: &mut dyn BufRead, formats: &[Value]) -> Vec<Value> {
    let mut results = Vec::with_capacity(formats.len());
    for format in formats {
        match read_one(reader, format) {
            Ok(Some(v)) => results.push(v),
            Ok(None) => {
                results.push(Value::Nil);
                break;
            }
            Err(e) => return io_fail(None, &e),
        }
    }
    results
}

/// Read `formats` from the file userdata `ud`.
fn read_file(state: &mut State, ud: &UserData, formats: &[Value]) -> Vec<Value> {
    let reads_stdin = ud
        .borrow::<LuaFile>()
        .map(|f| matches!(f.inner, LuaFileInner::Stdin))
        .unwrap_or(false);
    if reads_stdin {
        return read_formats(state.stdin_mut(), formats);
    }
    let Some(mut file) = ud.borrow_mut::<LuaFile>() else {
        return vec![Value::Nil];
    };
    match &mut file.inner {
        LuaFileInner::File(reader) => read_formats(reader, formats),
        _ => io_fail(
            None,
            &io::Error::new(io::ErrorKind::Unsupported, "file not readable"),
        ),
    }
}

fn write_values(ctx: &CallContext, ud: &UserData, first: usize) -> Result<Option<io::Error>, LuaError> {
    let mut out = String::new();
    for n in first..=ctx.arg_count() {
        match ctx.arg(n) {
            Value::String(s) => out.push_str(&s),
            v @ Value::Number(_) => out.push_str(&v.to_string()),
            other => {
                let detail = format!("string expected, got {}", other.kind());
                return Err(ctx.arg_error_kind(ErrorKind::TypeMismatch, n, &detail));
            }
        }
    }
    let Some(mut file) = ud.borrow_mut::<LuaFile>() else {
        return Ok(None);
    };
    Ok(file.write_all(out.as_bytes()).err())
}

fn close_file(ud: &UserData) -> Vec<Value> {
    let Some(mut file) = ud.borrow_mut::<LuaFile>() else {
        return vec![Value::Nil];
    };
    if file.is_stdio() {
        return vec![Value::Nil, Value::from("cannot close standard file")];
    }
    let flushed = file.flush();
    file.inner = LuaFileInner::Closed;
    match flushed {
        Ok(()) => vec![Value::Bool(true)],
        Err(e) => io_fail(None, &e),
    }
}

// ---------------------------------------------------------------------------
// io.*
// ---------------------------------------------------------------------------

fn native_io_open(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let path = ctx.check_string(1)?;
    let mode = ctx.opt_string(2, "r")?;
    let mut options = OpenOptions::new();
    let plus = mode.contains('+');
    let valid = matches!(
        mode.trim_end_matches('b'),
        "r" | "w" | "a" | "r+" | "w+" | "a+"
    );
    if !valid {
        return Err(ctx.arg_error_kind(
            ErrorKind::InvalidOption,
            2,
            &format!("invalid mode '{mode}'"),
        ));
    }
    match mode.chars().next() {
        Some('w') => options.write(true).create(true).truncate(true).read(plus),
        Some('a') => options.append(true).create(true).read(plus),
        _ => options.read(true).write(plus),
    };
    match options.open(&*path) {
        Ok(file) => {
            let handle = ctx
                .state
                .new_userdata(LuaFile::new_file(file, path.to_string()), Some(FILE_TYPE));
            Ok(vec![handle])
        }
        Err(e) => Ok(io_fail(Some(&path), &e)),
    }
}

fn native_io_close(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    if ctx.arg(1).is_nil() {
        return match io_field(ctx.state, "stdout") {
            Value::UserData(ud) => Ok(close_file(&ud)),
            _ => Ok(vec![Value::Nil]),
        };
    }
    let ud = check_file(ctx, 1)?;
    Ok(close_file(&ud))
}

fn native_io_read(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let formats = validate_formats(ctx, 1)?;
    Ok(read_formats(ctx.state.stdin_mut(), &formats))
}

fn native_io_write(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let stdout = io_field(ctx.state, "stdout");
    let Value::UserData(ud) = &stdout else {
        return Ok(vec![Value::Nil]);
    };
    match write_values(ctx, ud, 1)? {
        None => Ok(vec![stdout.clone()]),
        Some(e) => Ok(io_fail(None, &e)),
    }
}

fn native_io_type(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    ctx.check_any(1)?;
    let kind = match ctx.arg(1) {
        Value::UserData(ud) => ud.borrow::<LuaFile>().map(|f| {
            if f.is_closed() {
                "closed file"
            } else {
                "file"
            }
        }),
        _ => None,
    };
    Ok(vec![kind.map(Value::from).unwrap_or_default()])
}

// ---------------------------------------------------------------------------
// FILE* methods
// ---------------------------------------------------------------------------

fn native_file_read(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let ud = check_file(ctx, 1)?;
    let formats = validate_formats(ctx, 2)?;
    Ok(read_file(ctx.state, &ud, &formats))
}

fn native_file_write(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let ud = check_file(ctx, 1)?;
    match write_values(ctx, &ud, 2)? {
        None => Ok(vec![ctx.arg(1)]),
        Some(e) => Ok(io_fail(None, &e)),
    }
}

fn native_file_lines(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    check_file(ctx, 1)?;
    let iter = ctx.state.new_function("lines_iter", native_file_lines_iter);
    Ok(vec![iter, ctx.arg(1)])
}

fn native_file_lines_iter(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let ud = check_file(ctx, 1)?;
    let mut line = read_file(ctx.state, &ud, &[Value::from("*l")]);
    line.truncate(1);
    Ok(line)
}

fn native_file_close(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let ud = check_file(ctx, 1)?;
    Ok(close_file(&ud))
}

fn native_file_flush(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let ud = check_file(ctx, 1)?;
    let flushed = match ud.borrow_mut::<LuaFile>() {
        Some(mut file) => file.flush(),
        None => Ok(()),
    };
    match flushed {
        Ok(()) => Ok(vec![ctx.arg(1)]),
        Err(e) => Ok(io_fail(None, &e)),
    }
}

fn native_file_tostring(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    ctx.check_kind(1, Kind::UserData)?;
    let v = ctx.arg(1);
    let closed = v
        .as_userdata()
        .and_then(|ud| ud.borrow::<LuaFile>().map(|f| f.is_closed()))
        .unwrap_or(false);
    let text = if closed {
        "file (closed)".to_string()
    } else {
        format!("file ({:#010x})", v.identity().unwrap_or_default())
    };
    Ok(vec![Value::from(text)])
}
