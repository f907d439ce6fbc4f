//! Lua 5.1 table library.

use moonhost_vm::coerce;
use moonhost_vm::{CallContext, ErrorKind, FunctionSet, LuaError, State, TableRef, Value};

const TABLE_FUNCS: FunctionSet<'static> = &[
    ("insert", native_table_insert),
    ("remove", native_table_remove),
    ("concat", native_table_concat),
    ("sort", native_table_sort),
    ("maxn", native_table_maxn),
];

pub fn open(state: &mut State) -> Result<TableRef, LuaError> {
    state.register_module("table", TABLE_FUNCS)
}

/// table.insert(t [,pos], val)
fn native_table_insert(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let t = ctx.check_table(1)?;
    let len = t.borrow().len();
    match ctx.arg_count() {
        2 => {
            let v = ctx.arg(2);
            t.borrow_mut().raw_set_int(len as i64 + 1, v);
        }
        3 => {
            let pos = ctx.check_int(2)?;
            let v = ctx.arg(3);
            if pos < 1 {
                return Err(ctx.arg_error(2, "position out of bounds"));
            }
            let pos = pos as usize;
            let mut t = t.borrow_mut();
            if pos > len {
                t.raw_set_int(pos as i64, v);
            } else {
                t.insert(pos, v);
            }
        }
        _ => {
            return Err(ctx
                .state
                .raise(ErrorKind::Runtime, "wrong number of arguments to 'insert'"))
        }
    }
    Ok(vec![])
}

/// table.remove(t [,pos])
fn native_table_remove(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let t = ctx.check_table(1)?;
    let len = t.borrow().len();
    if len == 0 {
        return Ok(vec![]);
    }
    let pos = ctx.opt_int(2, len as isize)?;
    if pos < 1 || pos as usize > len {
        return Ok(vec![]);
    }
    let removed = t.borrow_mut().remove(pos as usize);
    Ok(vec![removed])
}

/// table.concat(t [,sep [,i [,j]]])
fn native_table_concat(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let t = ctx.check_table(1)?;
    let sep = ctx.opt_string(2, "")?;
    let i = ctx.opt_int(3, 1)?;
    let len = t.borrow().len() as isize;
    let j = ctx.opt_int(4, len)?;

    let mut out = String::new();
    let mut k = i;
    while k <= j {
        let v = t.borrow().raw_get_int(k as i64);
        match coerce::to_string_for_concat(&v) {
            Some(s) => out.push_str(&s),
            None => {
                return Err(ctx.state.raise(ErrorKind::Runtime, format!(
                    "invalid value (at index {k}) in table for 'concat'"
                )))
            }
        }
        if k < j {
            out.push_str(&sep);
        }
        k += 1;
    }
    Ok(vec![Value::from(out)])
}

/// table.sort(t [,comp])
///
/// Insertion sort over a snapshot of `t[1..n]`; the comparator may be a
/// script function, so every comparison can fail.
fn native_table_sort(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let t = ctx.check_table(1)?;
    let comp = if ctx.arg(2).is_nil() {
        None
    } else {
        Some(Value::Function(ctx.check_function(2)?))
    };

    let len = t.borrow().len();
    if len <= 1 {
        return Ok(vec![]);
    }
    let mut values: Vec<Value> = {
        let t = t.borrow();
        (1..=len).map(|i| t.raw_get_int(i as i64)).collect()
    };

    for i in 1..values.len() {
        let key = values[i].clone();
        let mut j = i;
        while j > 0 {
            let before = match &comp {
                Some(f) => {
                    let results = ctx.state.call(f, vec![key.clone(), values[j - 1].clone()])?;
                    results.first().is_some_and(Value::is_truthy)
                }
                None => ctx.state.less_than(&key, &values[j - 1])?,
            };
            if !before {
                break;
            }
            values[j] = values[j - 1].clone();
            j -= 1;
        }
        values[j] = key;
    }

    let mut t = t.borrow_mut();
    for (i, v) in values.into_iter().enumerate() {
        t.raw_set_int(i as i64 + 1, v);
    }
    Ok(vec![])
}

/// table.maxn(t): largest positive numeric key, or 0.
fn native_table_maxn(ctx: &mut CallContext) -> Result<Vec<Value>, LuaError> {
    let t = ctx.check_table(1)?;
    let max = t
        .borrow()
        .pairs()
        .filter_map(|(k, _)| k.as_number())
        .fold(0.0f64, f64::max);
    Ok(vec![Value::Number(max)])
}
