//! Lua 5.1 base library: the functions installed directly into `_G`.

use moonhost_vm::coerce;
use moonhost_vm::error::ErrorKind;
use moonhost_vm::{CallContext, FunctionSet, Kind, LuaError, State, TableRef, Value};
use std::io::Write;

const BASE_FUNCS: FunctionSet<'static> = &[
    ("assert", native_assert),
    ("error", native_error),
    ("pcall", native_pcall),
    ("xpcall", native_xpcall),
    ("print", native_print),
    ("type", native_type),
    ("tostring", native_tostring),
    ("tonumber", native_tonumber),
    ("ipairs", native_ipairs),
    ("pairs", native_pairs),
    ("next", native_next),
    ("select", native_select),
    ("rawget", native_rawget),
    ("rawset", native_rawset),
    ("rawequal", native_rawequal),
    ("setmetatable", native_setmetatable),
    ("getmetatable", native_getmetatable),
    ("unpack", native_unpack),
    ("load", native_load),
    ("loadstring", native_loadstring),
    ("loadfile", native_loadfile),
    ("dofile", native_dofile),
];

/// Install the base functions into the globals table itself.
pub fn open(state: &mut State) -> Result<TableRef, LuaError> {
    let globals = state.globals();
    state.set_global("_G", Value::Table(globals));
    let base = state.register_module("_G", BASE_FUNCS)?;
    state.set_global("_VERSION", Value::from("Lua 5.1"));
    Ok(base)
}

/// `nil, message` pair returned by the load family on failure.
fn fail(message: impl std::fmt::Display) -> Vec<Value> {
    vec![Value::Nil, Value::from(message.to_string())]
}

// ---------------------------------------------------------------------------
// Errors and protected calls
// ---------------------------------------------------------------------------

fn native_assert(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let v = ctx.check_any(1)?;
    if v.is_truthy() {
        return Ok(ctx.take_args());
    }
    let message = ctx.opt_string(2, "assertion failed!")?;
    Err(ctx.state.raise(ErrorKind::Runtime, &*message))
}

fn native_error(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let value = ctx.arg(1);
    let level = ctx.opt_int(2, 1)?;
    if let Value::String(s) = &value {
        if level > 0 {
            let position = ctx.state.location(level as usize);
            if !position.is_empty() {
                return Err(LuaError::Runtime(Value::from(format!("{position} {s}"))));
            }
        }
    }
    Err(LuaError::Runtime(value))
}

fn native_pcall(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let f = ctx.check_any(1)?;
    let mut args = ctx.take_args();
    args.remove(0);
    match ctx.state.pcall(&f, args) {
        Ok(mut results) => {
            results.insert(0, Value::Bool(true));
            Ok(results)
        }
        Err(e) => Ok(vec![Value::Bool(false), e.to_value()]),
    }
}

fn native_xpcall(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let f = ctx.check_any(1)?;
    let handler = ctx.check_any(2)?;
    match ctx.state.pcall(&f, Vec::new()) {
        Ok(mut results) => {
            results.insert(0, Value::Bool(true));
            Ok(results)
        }
        Err(e) => {
            let handled = ctx.state.call(&handler, vec![e.to_value()])?;
            Ok(vec![
                Value::Bool(false),
                handled.into_iter().next().unwrap_or_default(),
            ])
        }
    }
}

// ---------------------------------------------------------------------------
// Output and conversion
// ---------------------------------------------------------------------------

fn native_print(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let mut line = String::new();
    for (i, v) in ctx.take_args().iter().enumerate() {
        if i > 0 {
            line.push('\t');
        }
        match ctx.state.tostring(v)? {
            Value::String(s) => line.push_str(&s),
            other => line.push_str(&other.to_string()),
        }
    }
    line.push('\n');
    let mut out = std::io::stdout().lock();
    out.write_all(line.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|e| ctx.state.runtime_error(e.to_string()))?;
    Ok(vec![])
}

fn native_type(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let v = ctx.check_any(1)?;
    Ok(vec![Value::from(v.kind().name())])
}

fn native_tostring(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let v = ctx.check_any(1)?;
    Ok(vec![ctx.state.tostring(&v)?])
}

fn native_tonumber(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let base = ctx.opt_int(2, 10)?;
    if base == 10 {
        let v = ctx.check_any(1)?;
        return Ok(vec![coerce::to_number(&v)
            .map(Value::Number)
            .unwrap_or_default()]);
    }
    if !(2..=36).contains(&base) {
        return Err(ctx.arg_error(2, "base out of range"));
    }
    let s = ctx.check_string(1)?;
    let digits = s.trim().to_ascii_lowercase();
    let (neg, digits) = match digits.strip_prefix('-') {
        Some(rest) => (true, rest.to_string()),
        None => (false, digits),
    };
    let parsed = match i64::from_str_radix(&digits, base as u32) {
        Ok(n) if !digits.is_empty() => {
            let n = n as f64;
            Value::Number(if neg { -n } else { n })
        }
        _ => Value::Nil,
    };
    Ok(vec![parsed])
}

// ---------------------------------------------------------------------------
// Iteration
// ---------------------------------------------------------------------------

fn native_ipairs_aux(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let t = ctx.check_table(1)?;
    let i = ctx.check_int64(2)? + 1;
    let v = t.borrow().raw_get_int(i);
    if v.is_nil() {
        return Ok(vec![Value::Nil]);
    }
    Ok(vec![Value::from(i), v])
}

fn native_ipairs(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let t = ctx.check_any(1)?;
    let aux = ctx.state.new_function("ipairs_aux", native_ipairs_aux);
    Ok(vec![aux, t, Value::Number(0.0)])
}

fn native_pairs(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let t = ctx.check_table(1)?;
    let next = ctx.state.new_function("next", native_next);
    Ok(vec![next, Value::Table(t), Value::Nil])
}

fn native_next(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let t = ctx.check_table(1)?;
    let key = ctx.arg(2);
    let step = t.borrow().next(&key);
    match step {
        Ok(Some((k, v))) => Ok(vec![k, v]),
        Ok(None) => Ok(vec![Value::Nil]),
        Err(msg) => Err(ctx.state.raise(ErrorKind::Runtime, msg)),
    }
}

fn native_select(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let count = ctx.arg_count() as i64 - 1;
    if let Value::String(s) = ctx.arg(1) {
        if &*s == "#" {
            return Ok(vec![Value::from(count)]);
        }
    }
    let n = ctx.check_int64(1)?;
    let start = if n < 0 {
        count + n
    } else if n == 0 {
        return Err(ctx.arg_error(1, "index out of range"));
    } else {
        n - 1
    };
    if start < 0 {
        return Err(ctx.arg_error(1, "index out of range"));
    }
    let args = ctx.take_args();
    Ok(args.into_iter().skip(1 + start as usize).collect())
}

// ---------------------------------------------------------------------------
// Raw access and metatables
// ---------------------------------------------------------------------------

fn native_rawget(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let t = ctx.check_table(1)?;
    let k = ctx.check_any(2)?;
    let v = t.borrow().raw_get(&k);
    Ok(vec![v])
}

fn native_rawset(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let t = ctx.check_table(1)?;
    let k = ctx.check_any(2)?;
    let v = ctx.check_any(3)?;
    let result = t.borrow_mut().raw_set(k, v);
    result.map_err(|msg| ctx.state.raise(ErrorKind::Runtime, msg))?;
    Ok(vec![Value::Table(t)])
}

fn native_rawequal(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let a = ctx.check_any(1)?;
    let b = ctx.check_any(2)?;
    Ok(vec![Value::Bool(a.raw_equal(&b))])
}

fn native_setmetatable(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let t = ctx.check_table(1)?;
    ctx.check_kinds(2, &[Kind::Nil, Kind::Table])?;
    let target = Value::Table(t);
    if !ctx.state.get_meta_field(&target, "__metatable").is_nil() {
        return Err(ctx
            .state
            .raise(ErrorKind::Runtime, "cannot change a protected metatable"));
    }
    let mt = ctx.opt_table(2)?;
    ctx.state.set_metatable(&target, mt)?;
    Ok(vec![target])
}

fn native_getmetatable(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let v = ctx.check_any(1)?;
    let Some(mt) = ctx.state.metatable_of(&v) else {
        return Ok(vec![Value::Nil]);
    };
    let protected = mt.borrow().raw_get_str("__metatable");
    if !protected.is_nil() {
        return Ok(vec![protected]);
    }
    Ok(vec![Value::Table(mt)])
}

/// Most values `unpack` will produce in one call.
const MAX_UNPACK: i64 = 1_000_000;

fn native_unpack(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let t = ctx.check_table(1)?;
    let i = ctx.opt_int64(2, 1)?;
    let len = t.borrow().len() as i64;
    let j = ctx.opt_int64(3, len)?;
    if j >= i && j.checked_sub(i).map_or(true, |n| n >= MAX_UNPACK) {
        return Err(ctx.state.raise(ErrorKind::Runtime, "too many results to unpack"));
    }
    let values: Vec<Value> = {
        let t = t.borrow();
        (i..=j).map(|k| t.raw_get_int(k)).collect()
    };
    Ok(values)
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

fn native_load(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let chunk_name = ctx.opt_string(2, "(load)")?;
    let source = match ctx.arg(1) {
        Value::String(s) => s.as_bytes().to_vec(),
        Value::Function(_) => {
            // Call the reader until it returns nil or an empty string.
            let reader = ctx.arg(1);
            let mut source = Vec::new();
            loop {
                let piece = ctx.state.call(&reader, Vec::new())?;
                match piece.into_iter().next().unwrap_or_default() {
                    Value::Nil => break,
                    Value::String(s) if s.is_empty() => break,
                    Value::String(s) => source.extend_from_slice(s.as_bytes()),
                    _ => return Ok(fail("reader function must return a string")),
                }
            }
            source
        }
        other => {
            let detail = format!("function expected, got {}", other.kind());
            return Err(ctx.arg_error(1, &detail));
        }
    };
    match ctx.state.load_buffer(&source, &chunk_name) {
        Ok(f) => Ok(vec![Value::Function(f)]),
        Err(e) => Ok(fail(e)),
    }
}

fn native_loadstring(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let source = ctx.check_string(1)?;
    let result = match ctx.opt_value::<std::rc::Rc<str>>(2)? {
        Some(name) => ctx.state.load_buffer(source.as_bytes(), &name),
        None => ctx.state.load_string(&source),
    };
    match result {
        Ok(f) => Ok(vec![Value::Function(f)]),
        Err(e) => Ok(fail(e)),
    }
}

fn native_loadfile(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let path = ctx.opt_string(1, "")?;
    match ctx.state.load_file(&path) {
        Ok(f) => Ok(vec![Value::Function(f)]),
        Err(e) => Ok(fail(e)),
    }
}

fn native_dofile(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let path = ctx.opt_string(1, "")?;
    let chunk = ctx.state.load_file(&path)?;
    ctx.state.call(&Value::Function(chunk), Vec::new())
}
