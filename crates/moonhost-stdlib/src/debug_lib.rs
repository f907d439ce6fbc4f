//! Lua 5.1 debug library: tracebacks, frame introspection and raw
//! metatable access.

use moonhost_vm::{
    new_table, CallContext, FrameInfo, Function, FunctionSet, Kind, LuaError, State, TableRef,
    Value,
};

const DEBUG_FUNCS: FunctionSet<'static> = &[
    ("traceback", native_debug_traceback),
    ("getinfo", native_debug_getinfo),
    ("getmetatable", native_debug_getmetatable),
    ("setmetatable", native_debug_setmetatable),
];

pub fn open(state: &mut State) -> Result<TableRef, LuaError> {
    state.register_module("debug", DEBUG_FUNCS)
}

/// traceback([message [, level]])
///
/// A non-string message is returned untouched. Level 1, the default, is
/// the function that called `traceback`.
fn native_debug_traceback(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let message = ctx.arg(1);
    let message = match &message {
        Value::Nil => None,
        Value::String(s) => Some(s.clone()),
        _ => return Ok(vec![message]),
    };
    let level = ctx.opt_int(2, 1)?.max(0) as usize;
    let trace = ctx.state.traceback(message.as_deref(), level);
    Ok(vec![Value::from(trace)])
}

/// getinfo(level | function): a table with `source`, `short_src`,
/// `currentline`, `linedefined`, `what` and `name`. Nil for a level past
/// the outermost frame.
fn native_debug_getinfo(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    ctx.check_kinds(1, &[Kind::Number, Kind::Function])?;
    let info = new_table(0, 7);
    match ctx.arg(1) {
        Value::Function(f) => {
            let mut t = info.borrow_mut();
            match &*f {
                Function::Native(_) => {
                    t.raw_set_str("source", Value::from("=[C]"));
                    t.raw_set_str("short_src", Value::from("[C]"));
                    t.raw_set_str("what", Value::from("C"));
                    t.raw_set_str("linedefined", Value::Number(-1.0));
                }
                Function::Lua(closure) => {
                    t.raw_set_str("source", Value::from(closure.chunk.clone()));
                    t.raw_set_str("short_src", Value::from(closure.chunk.clone()));
                    let what = if closure.body.line == 0 { "main" } else { "Lua" };
                    t.raw_set_str("what", Value::from(what));
                    t.raw_set_str("linedefined", Value::from(closure.body.line as i64));
                }
            }
            t.raw_set_str("currentline", Value::Number(-1.0));
            t.raw_set_str("func", Value::Function(f.clone()));
        }
        _ => {
            let level = ctx.check_int(1)?;
            if level < 0 {
                return Ok(vec![Value::Nil]);
            }
            match ctx.state.frame_info(level as usize) {
                Some(frame) => fill_frame(&info, &frame),
                None => return Ok(vec![Value::Nil]),
            }
        }
    }
    Ok(vec![Value::Table(info)])
}

fn fill_frame(info: &TableRef, frame: &FrameInfo) {
    let mut t = info.borrow_mut();
    match &frame.source {
        Some(source) => {
            t.raw_set_str("source", Value::from(source.clone()));
            t.raw_set_str("short_src", Value::from(source.clone()));
        }
        None => {
            t.raw_set_str("source", Value::from("=[C]"));
            t.raw_set_str("short_src", Value::from("[C]"));
        }
    }
    let line = |l: Option<u32>| l.map_or(Value::Number(-1.0), |l| Value::from(l as i64));
    t.raw_set_str("currentline", line(frame.current_line));
    t.raw_set_str("linedefined", line(frame.line_defined));
    t.raw_set_str("what", Value::from(frame.what()));
    if let Some(name) = &frame.name {
        t.raw_set_str("name", Value::from(name.clone()));
    }
}

/// getmetatable(v), ignoring `__metatable`.
fn native_debug_getmetatable(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let v = ctx.check_any(1)?;
    Ok(vec![ctx
        .state
        .metatable_of(&v)
        .map_or(Value::Nil, Value::Table)])
}

/// setmetatable(v, t), for any value kind that carries a metatable.
fn native_debug_setmetatable(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let v = ctx.check_any(1)?;
    ctx.check_kinds(2, &[Kind::Nil, Kind::Table])?;
    let mt = ctx.arg(2).as_table().cloned();
    ctx.state.set_metatable(&v, mt)?;
    Ok(vec![Value::Bool(true)])
}
