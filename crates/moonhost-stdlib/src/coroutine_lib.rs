//! Lua 5.1 coroutine library.
//!
//! Only the main thread exists at this layer, so `running` always reports
//! nil and `status` knows one running thread; scheduling lives below the
//! host boundary.

use moonhost_vm::{CallContext, FunctionSet, LuaError, State, TableRef, Value};

const COROUTINE_FUNCS: FunctionSet<'static> = &[
    ("running", native_coroutine_running),
    ("status", native_coroutine_status),
];

pub fn open(state: &mut State) -> Result<TableRef, LuaError> {
    state.register_module("coroutine", COROUTINE_FUNCS)
}

/// coroutine.running(): nil when called from the main thread.
fn native_coroutine_running(_ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    Ok(vec![Value::Nil])
}

fn native_coroutine_status(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let co = ctx.check_thread(1)?;
    let status = match ctx.state.main_thread() {
        Value::Thread(main) if std::rc::Rc::ptr_eq(&main, &co) => "running",
        _ => "suspended",
    };
    Ok(vec![Value::from(status)])
}
