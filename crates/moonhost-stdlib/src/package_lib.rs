//! Lua 5.1 package library.
//!
//! Owns `package.loaded`, which is the registry's loaded-modules table, so
//! it must be opened before any other module registers itself.

use moonhost_vm::error::ErrorKind;
use moonhost_vm::{new_table, CallContext, FunctionSet, LuaError, State, TableRef, Value};
use std::path::Path;

/// Search path used when `LUA_PATH` is unset.
pub const DEFAULT_PATH: &str =
    "./?.lua;/usr/local/share/lua/5.1/?.lua;/usr/local/share/lua/5.1/?/init.lua";
pub const DEFAULT_CPATH: &str = "./?.so;/usr/local/lib/lua/5.1/?.so";

const PACKAGE_FUNCS: FunctionSet<'static> = &[("seeall", native_package_seeall)];

/// Register `package` and the global `require`.
pub fn open(state: &mut State) -> Result<TableRef, LuaError> {
    let package = state.register_module("package", PACKAGE_FUNCS)?;
    let loaded = state.loaded_modules();
    {
        let mut pkg = package.borrow_mut();
        pkg.raw_set_str("loaded", Value::Table(loaded));
        if pkg.raw_get_str("preload").is_nil() {
            pkg.raw_set_str("preload", Value::Table(new_table(0, 4)));
        }
        if pkg.raw_get_str("path").is_nil() {
            pkg.raw_set_str("path", Value::from(search_path("LUA_PATH", DEFAULT_PATH)));
        }
        if pkg.raw_get_str("cpath").is_nil() {
            pkg.raw_set_str("cpath", Value::from(search_path("LUA_CPATH", DEFAULT_CPATH)));
        }
        pkg.raw_set_str("config", Value::from("/\n;\n?\n!\n-"));
    }
    if package.borrow().raw_get_str("loaders").is_nil() {
        let loaders = new_table(2, 0);
        {
            let mut l = loaders.borrow_mut();
            l.raw_set_int(1, state.new_function("loader_preload", native_loader_preload));
            l.raw_set_int(2, state.new_function("loader_lua", native_loader_lua));
        }
        package
            .borrow_mut()
            .raw_set_str("loaders", Value::Table(loaders));
    }
    let require = state.new_function("require", native_require);
    state.set_global("require", require);
    Ok(package)
}

/// Value of environment variable `var`, with `;;` expanded to `default`.
fn search_path(var: &str, default: &str) -> String {
    match std::env::var(var) {
        Ok(path) => path.replace(";;", &format!(";{default};")),
        Err(_) => default.to_string(),
    }
}

fn package_field(state: &State, field: &str) -> Value {
    match state.loaded_modules().borrow().raw_get_str("package") {
        Value::Table(pkg) => pkg.borrow().raw_get_str(field),
        _ => Value::Nil,
    }
}

// ---------------------------------------------------------------------------
// require(name)
// ---------------------------------------------------------------------------

fn native_require(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let name = ctx.check_string(1)?;
    let loaded = ctx.state.loaded_modules();
    let existing = loaded.borrow().raw_get_str(&name);
    if existing.is_truthy() {
        return Ok(vec![existing]);
    }

    let loaders = match package_field(ctx.state, "loaders") {
        Value::Table(t) => t,
        _ => {
            return Err(ctx
                .state
                .raise(ErrorKind::Runtime, "'package.loaders' must be a table"))
        }
    };

    let mut messages = String::new();
    let mut index = 1;
    let loader = loop {
        let searcher = loaders.borrow().raw_get_int(index);
        if searcher.is_nil() {
            return Err(ctx.state.raise(
                ErrorKind::Runtime,
                format!("module '{name}' not found:{messages}"),
            ));
        }
        let found = ctx.state.call(&searcher, vec![Value::from(name.clone())])?;
        match found.into_iter().next().unwrap_or_default() {
            f @ Value::Function(_) => break f,
            Value::String(msg) => messages.push_str(&msg),
            _ => {}
        }
        index += 1;
    };

    let result = ctx
        .state
        .call(&loader, vec![Value::from(name.clone())])?
        .into_iter()
        .next()
        .unwrap_or_default();
    if !result.is_nil() {
        loaded.borrow_mut().raw_set_str(&name, result);
    }
    let mut module = loaded.borrow().raw_get_str(&name);
    if module.is_nil() {
        module = Value::Bool(true);
        loaded.borrow_mut().raw_set_str(&name, module.clone());
    }
    Ok(vec![module])
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

fn native_loader_preload(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let name = ctx.check_string(1)?;
    let preload = match package_field(ctx.state, "preload") {
        Value::Table(t) => t,
        _ => {
            return Err(ctx
                .state
                .raise(ErrorKind::Runtime, "'package.preload' must be a table"))
        }
    };
    let f = preload.borrow().raw_get_str(&name);
    if f.is_nil() {
        return Ok(vec![Value::from(format!(
            "\n\tno field package.preload['{name}']"
        ))]);
    }
    Ok(vec![f])
}

fn native_loader_lua(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let name = ctx.check_string(1)?;
    let path = match package_field(ctx.state, "path") {
        Value::String(s) => s,
        _ => {
            return Err(ctx
                .state
                .raise(ErrorKind::Runtime, "'package.path' must be a string"))
        }
    };
    let file_name = name.replace('.', "/");
    let mut tried = String::new();
    for template in path.split(';').filter(|t| !t.is_empty()) {
        let candidate = template.replace('?', &file_name);
        if Path::new(&candidate).is_file() {
            return match ctx.state.load_file(&candidate) {
                Ok(chunk) => Ok(vec![Value::Function(chunk)]),
                Err(e) => Err(ctx.state.raise(
                    ErrorKind::Runtime,
                    format!("error loading module '{name}' from file '{candidate}':\n\t{e}"),
                )),
            };
        }
        tried.push_str(&format!("\n\tno file '{candidate}'"));
    }
    Ok(vec![Value::from(tried)])
}

// ---------------------------------------------------------------------------
// package.seeall(module)
// ---------------------------------------------------------------------------

fn native_package_seeall(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let module = ctx.check_table(1)?;
    let mt = match module.borrow().metatable.clone() {
        Some(mt) => mt,
        None => new_table(0, 1),
    };
    mt.borrow_mut()
        .raw_set_str("__index", Value::Table(ctx.state.globals()));
    module.borrow_mut().metatable = Some(mt);
    Ok(vec![])
}
