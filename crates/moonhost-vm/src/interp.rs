//! Tree-walking evaluator for parsed chunks.
//!
//! Every `local` statement opens a new [`Scope`] node, so a closure captures
//! exactly the bindings visible where it was created. Loop bodies get a fresh
//! node per iteration.

use crate::coerce;
use crate::error::LuaError;
use crate::metamethod::ArithOp;
use crate::state::{State, STACK_GROW_SIZE, STACK_RED_ZONE};
use crate::table::new_table;
use crate::value::{Function, LuaClosure, Value};
use moonhost_compiler::ast::{BinOp, Block, Expr, FuncBody, FuncName, Stat, TableField, UnOp};
use std::cell::RefCell;
use std::rc::Rc;

/// A set of local bindings introduced together, chained to the enclosing ones.
pub(crate) struct Scope {
    vars: Vec<(Rc<str>, Rc<RefCell<Value>>)>,
    parent: Option<Rc<Scope>>,
}

fn lookup(scope: &Option<Rc<Scope>>, name: &str) -> Option<Rc<RefCell<Value>>> {
    let mut current = scope.as_deref();
    while let Some(s) = current {
        if let Some((_, cell)) = s.vars.iter().rev().find(|(n, _)| &**n == name) {
            return Some(cell.clone());
        }
        current = s.parent.as_deref();
    }
    None
}

enum Flow {
    Normal,
    Break,
    Return(Vec<Value>),
}

/// Run a script function. The caller has already pushed its call frame.
pub(crate) fn call_closure(
    state: &mut State,
    closure: &LuaClosure,
    args: Vec<Value>,
) -> Result<Vec<Value>, LuaError> {
    let body = closure.body.clone();
    let mut args = args.into_iter();
    let vars = body
        .params
        .iter()
        .map(|p| (p.clone(), Rc::new(RefCell::new(args.next().unwrap_or_default()))))
        .collect();
    let varargs = if body.is_vararg {
        args.collect()
    } else {
        Vec::new()
    };
    let mut frame = Frame {
        state,
        scope: Some(Rc::new(Scope {
            vars,
            parent: closure.scope.clone(),
        })),
        varargs,
        chunk: closure.chunk.clone(),
    };
    match frame.exec_block(&body.block)? {
        Flow::Return(values) => Ok(values),
        Flow::Normal | Flow::Break => Ok(Vec::new()),
    }
}

/// Wrap a function body compiled under `chunk` as a top-level closure.
pub(crate) fn new_closure(body: Rc<FuncBody>, chunk: Rc<str>) -> Rc<Function> {
    Rc::new(Function::Lua(LuaClosure {
        body,
        chunk,
        scope: None,
    }))
}

struct Frame<'s> {
    state: &'s mut State,
    scope: Option<Rc<Scope>>,
    varargs: Vec<Value>,
    chunk: Rc<str>,
}

impl Frame<'_> {
    fn push_scope(&mut self, vars: Vec<(Rc<str>, Rc<RefCell<Value>>)>) {
        let parent = self.scope.take();
        self.scope = Some(Rc::new(Scope { vars, parent }));
    }

    fn closure(&self, body: &Rc<FuncBody>) -> Value {
        Value::Function(Rc::new(Function::Lua(LuaClosure {
            body: body.clone(),
            chunk: self.chunk.clone(),
            scope: self.scope.clone(),
        })))
    }

    fn error(&self, message: impl Into<String>) -> LuaError {
        self.state.runtime_error(message)
    }

    // ---- Statements ----

    fn exec_block(&mut self, block: &Block) -> Result<Flow, LuaError> {
        let saved = self.scope.clone();
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.exec_stats(&block.stats)
        });
        self.scope = saved;
        result
    }

    fn exec_stats(&mut self, stats: &[Stat]) -> Result<Flow, LuaError> {
        for stat in stats {
            match self.exec_stat(stat)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stat(&mut self, stat: &Stat) -> Result<Flow, LuaError> {
        let line = stat.line();
        if line > 0 {
            self.state.set_current_line(line);
        }
        match stat {
            Stat::Local { names, exprs, .. } => {
                let mut values = self.eval_list(exprs)?.into_iter();
                let vars = names
                    .iter()
                    .map(|n| (n.clone(), Rc::new(RefCell::new(values.next().unwrap_or_default()))))
                    .collect();
                self.push_scope(vars);
            }
            Stat::LocalFunction { name, body, .. } => {
                let cell = Rc::new(RefCell::new(Value::Nil));
                self.push_scope(vec![(name.clone(), cell.clone())]);
                *cell.borrow_mut() = self.closure(body);
            }
            Stat::Assign { targets, exprs, .. } => self.exec_assign(targets, exprs)?,
            Stat::Call { call, .. } => {
                self.eval_call(call)?;
            }
            Stat::Do(block) => return self.exec_block(block),
            Stat::While { cond, block, .. } => {
                while self.eval(cond)?.is_truthy() {
                    match self.exec_block(block)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        ret => return Ok(ret),
                    }
                }
            }
            Stat::Repeat { block, cond, .. } => loop {
                // The condition sees the body's locals.
                let saved = self.scope.clone();
                let flow = self.exec_stats(&block.stats);
                let done = match flow {
                    Ok(Flow::Normal) => self.eval(cond).map(|v| v.is_truthy()),
                    Ok(Flow::Break) => Ok(true),
                    Ok(ret) => {
                        self.scope = saved;
                        return Ok(ret);
                    }
                    Err(e) => Err(e),
                };
                self.scope = saved;
                if done? {
                    break;
                }
            },
            Stat::If {
                clauses,
                else_block,
                ..
            } => {
                for (cond, block) in clauses {
                    if self.eval(cond)?.is_truthy() {
                        return self.exec_block(block);
                    }
                }
                if let Some(block) = else_block {
                    return self.exec_block(block);
                }
            }
            Stat::NumericFor {
                var,
                start,
                limit,
                step,
                block,
                ..
            } => return self.exec_numeric_for(var, start, limit, step.as_ref(), block),
            Stat::GenericFor {
                names,
                exprs,
                block,
                ..
            } => return self.exec_generic_for(names, exprs, block),
            Stat::Function { name, body, .. } => {
                let f = self.closure(body);
                self.assign_function(name, f)?;
            }
            Stat::Return { exprs, .. } => return Ok(Flow::Return(self.eval_list(exprs)?)),
            Stat::Break { .. } => return Ok(Flow::Break),
        }
        Ok(Flow::Normal)
    }

    fn exec_assign(&mut self, targets: &[Expr], exprs: &[Expr]) -> Result<(), LuaError> {
        enum Place {
            Local(Rc<RefCell<Value>>),
            Global(Rc<str>),
            Field(Value, Value, Option<String>),
        }
        let mut places = Vec::with_capacity(targets.len());
        for target in targets {
            let place = match target {
                Expr::Name(n) => match lookup(&self.scope, n) {
                    Some(cell) => Place::Local(cell),
                    None => Place::Global(n.clone()),
                },
                Expr::Index { obj, key, .. } => {
                    let o = self.eval(obj)?;
                    let k = self.eval(key)?;
                    Place::Field(o, k, self.describe(obj))
                }
                _ => return Err(self.error("syntax error")),
            };
            places.push(place);
        }
        let mut values = self.eval_list(exprs)?.into_iter();
        for place in places {
            let v = values.next().unwrap_or_default();
            match place {
                Place::Local(cell) => *cell.borrow_mut() = v,
                Place::Global(name) => self.set_global(name, v)?,
                Place::Field(o, k, desc) => self.set_field(&o, k, v, desc)?,
            }
        }
        Ok(())
    }

    fn assign_function(&mut self, name: &FuncName, f: Value) -> Result<(), LuaError> {
        let root = &name.path[0];
        if name.path.len() == 1 && name.method.is_none() {
            match lookup(&self.scope, root) {
                Some(cell) => *cell.borrow_mut() = f,
                None => self.set_global(root.clone(), f)?,
            }
            return Ok(());
        }
        let mut obj = self.lookup_name(root)?;
        let mut desc = Some(self.describe_name(root));
        let (last, middle) = match &name.method {
            Some(m) => (m, &name.path[1..]),
            None => (&name.path[name.path.len() - 1], &name.path[1..name.path.len() - 1]),
        };
        for key in middle {
            obj = self.get_field(&obj, &Value::from(key.clone()), desc)?;
            desc = Some(format!("field '{key}'"));
        }
        self.set_field(&obj, Value::from(last.clone()), f, desc)
    }

    fn exec_numeric_for(
        &mut self,
        var: &Rc<str>,
        start: &Expr,
        limit: &Expr,
        step: Option<&Expr>,
        block: &Block,
    ) -> Result<Flow, LuaError> {
        let start = self.for_number(start, "initial value")?;
        let limit = self.for_number(limit, "limit")?;
        let step = match step {
            Some(e) => self.for_number(e, "step")?,
            None => 1.0,
        };
        let mut i = start;
        while (step > 0.0 && i <= limit) || (step <= 0.0 && i >= limit) {
            let saved = self.scope.clone();
            self.push_scope(vec![(var.clone(), Rc::new(RefCell::new(Value::Number(i))))]);
            let flow = self.exec_block(block);
            self.scope = saved;
            match flow? {
                Flow::Normal => {}
                Flow::Break => break,
                ret => return Ok(ret),
            }
            i += step;
        }
        Ok(Flow::Normal)
    }

    fn for_number(&mut self, expr: &Expr, what: &str) -> Result<f64, LuaError> {
        let v = self.eval(expr)?;
        coerce::to_number(&v).ok_or_else(|| self.error(format!("'for' {what} must be a number")))
    }

    fn exec_generic_for(
        &mut self,
        names: &[Rc<str>],
        exprs: &[Expr],
        block: &Block,
    ) -> Result<Flow, LuaError> {
        let mut init = self.eval_list(exprs)?.into_iter();
        let f = init.next().unwrap_or_default();
        let s = init.next().unwrap_or_default();
        let mut control = init.next().unwrap_or_default();
        loop {
            if !self.state.is_callable(&f) {
                return Err(self.error(format!("attempt to call a {} value", f.kind())));
            }
            let results = self.state.call(&f, vec![s.clone(), control.clone()])?;
            let mut results = results.into_iter();
            let first = results.next().unwrap_or_default();
            if first.is_nil() {
                break;
            }
            control = first.clone();
            let mut vars = vec![(names[0].clone(), Rc::new(RefCell::new(first)))];
            for n in &names[1..] {
                vars.push((n.clone(), Rc::new(RefCell::new(results.next().unwrap_or_default()))));
            }
            let saved = self.scope.clone();
            self.push_scope(vars);
            let flow = self.exec_block(block);
            self.scope = saved;
            match flow? {
                Flow::Normal => {}
                Flow::Break => break,
                ret => return Ok(ret),
            }
        }
        Ok(Flow::Normal)
    }

    // ---- Variables and fields ----

    fn lookup_name(&mut self, name: &Rc<str>) -> Result<Value, LuaError> {
        if let Some(cell) = lookup(&self.scope, name) {
            return Ok(cell.borrow().clone());
        }
        let globals = Value::Table(self.state.globals());
        self.state.index(&globals, &Value::from(name.clone()))
    }

    fn set_global(&mut self, name: Rc<str>, value: Value) -> Result<(), LuaError> {
        let globals = Value::Table(self.state.globals());
        self.state.set_index(&globals, Value::from(name), value)
    }

    fn indexable(&self, v: &Value, event: &str) -> bool {
        matches!(v, Value::Table(_)) || !self.state.get_meta_field(v, event).is_nil()
    }

    fn get_field(&mut self, obj: &Value, key: &Value, desc: Option<String>) -> Result<Value, LuaError> {
        if !self.indexable(obj, "__index") {
            return Err(self.index_error(obj, desc));
        }
        self.state.index(obj, key)
    }

    fn set_field(
        &mut self,
        obj: &Value,
        key: Value,
        value: Value,
        desc: Option<String>,
    ) -> Result<(), LuaError> {
        if !self.indexable(obj, "__newindex") {
            return Err(self.index_error(obj, desc));
        }
        self.state.set_index(obj, key, value)
    }

    fn index_error(&self, obj: &Value, desc: Option<String>) -> LuaError {
        match desc {
            Some(d) => self.error(format!("attempt to index {d} (a {} value)", obj.kind())),
            None => self.error(format!("attempt to index a {} value", obj.kind())),
        }
    }

    fn describe_name(&self, name: &str) -> String {
        if lookup(&self.scope, name).is_some() {
            format!("local '{name}'")
        } else {
            format!("global '{name}'")
        }
    }

    /// Variable description used in runtime error messages.
    fn describe(&self, expr: &Expr) -> Option<String> {
        match expr {
            Expr::Name(n) => Some(self.describe_name(n)),
            Expr::Index { key, .. } => match &**key {
                Expr::Str(s) => Some(format!("field '{s}'")),
                _ => None,
            },
            Expr::Method { name, .. } => Some(format!("method '{name}'")),
            _ => None,
        }
    }

    // ---- Expressions ----

    /// Evaluate `expr`, growing the native stack for deeply nested trees.
    fn eval(&mut self, expr: &Expr) -> Result<Value, LuaError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(expr))
    }

    fn eval_inner(&mut self, expr: &Expr) -> Result<Value, LuaError> {
        Ok(match expr {
            Expr::Nil => Value::Nil,
            Expr::True => Value::Bool(true),
            Expr::False => Value::Bool(false),
            Expr::Number(n) => Value::Number(*n),
            Expr::Str(s) => Value::String(s.clone()),
            Expr::Vararg => self.varargs.first().cloned().unwrap_or_default(),
            Expr::Function(body) => self.closure(body),
            Expr::Name(n) => self.lookup_name(n)?,
            Expr::Index { obj, key, line } => {
                let o = self.eval(obj)?;
                let k = self.eval(key)?;
                self.state.set_current_line(*line);
                let desc = self.describe(obj);
                self.get_field(&o, &k, desc)?
            }
            Expr::Call { .. } | Expr::Method { .. } => {
                self.eval_call(expr)?.into_iter().next().unwrap_or_default()
            }
            Expr::Table(fields) => self.eval_table(fields)?,
            Expr::Binary { op, lhs, rhs, line } => self.eval_binary(*op, lhs, rhs, *line)?,
            Expr::Unary { op, expr, line } => {
                let v = self.eval(expr)?;
                self.state.set_current_line(*line);
                match op {
                    UnOp::Neg => self.state.unm(&v)?,
                    UnOp::Not => Value::Bool(!v.is_truthy()),
                    UnOp::Len => self.state.len(&v)?,
                }
            }
            Expr::Paren(inner) => self.eval(inner)?,
        })
    }

    fn eval_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr, line: u32) -> Result<Value, LuaError> {
        let a = self.eval(lhs)?;
        match op {
            BinOp::And => return if a.is_truthy() { self.eval(rhs) } else { Ok(a) },
            BinOp::Or => return if a.is_truthy() { Ok(a) } else { self.eval(rhs) },
            _ => {}
        }
        let b = self.eval(rhs)?;
        self.state.set_current_line(line);
        let state = &mut *self.state;
        Ok(match op {
            BinOp::Add => state.arith(ArithOp::Add, &a, &b)?,
            BinOp::Sub => state.arith(ArithOp::Sub, &a, &b)?,
            BinOp::Mul => state.arith(ArithOp::Mul, &a, &b)?,
            BinOp::Div => state.arith(ArithOp::Div, &a, &b)?,
            BinOp::Mod => state.arith(ArithOp::Mod, &a, &b)?,
            BinOp::Pow => state.arith(ArithOp::Pow, &a, &b)?,
            BinOp::Concat => state.concat(&a, &b)?,
            BinOp::Eq => Value::Bool(state.equals(&a, &b)?),
            BinOp::Ne => Value::Bool(!state.equals(&a, &b)?),
            BinOp::Lt => Value::Bool(state.less_than(&a, &b)?),
            BinOp::Le => Value::Bool(state.less_equal(&a, &b)?),
            BinOp::Gt => Value::Bool(state.less_than(&b, &a)?),
            BinOp::Ge => Value::Bool(state.less_equal(&b, &a)?),
            BinOp::And | BinOp::Or => unreachable!(),
        })
    }

    fn eval_table(&mut self, fields: &[TableField]) -> Result<Value, LuaError> {
        let table = new_table(0, fields.len());
        let mut index = 1i64;
        for (i, field) in fields.iter().enumerate() {
            match field {
                TableField::Keyed(k, v) => {
                    let key = self.eval(k)?;
                    let value = self.eval(v)?;
                    let result = table.borrow_mut().raw_set(key, value);
                    result.map_err(|msg| self.error(msg))?;
                }
                TableField::Positional(e) if i + 1 == fields.len() && e.is_multi() => {
                    for value in self.eval_multi(e)? {
                        table.borrow_mut().raw_set_int(index, value);
                        index += 1;
                    }
                }
                TableField::Positional(e) => {
                    let value = self.eval(e)?;
                    table.borrow_mut().raw_set_int(index, value);
                    index += 1;
                }
            }
        }
        Ok(Value::Table(table))
    }

    /// Evaluate an expression that may yield several values.
    fn eval_multi(&mut self, expr: &Expr) -> Result<Vec<Value>, LuaError> {
        match expr {
            Expr::Call { .. } | Expr::Method { .. } => self.eval_call(expr),
            Expr::Vararg => Ok(self.varargs.clone()),
            other => Ok(vec![self.eval(other)?]),
        }
    }

    /// Evaluate an expression list, expanding only the last expression.
    fn eval_list(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, LuaError> {
        let mut values = Vec::with_capacity(exprs.len());
        for (i, e) in exprs.iter().enumerate() {
            if i + 1 == exprs.len() {
                values.extend(self.eval_multi(e)?);
            } else {
                values.push(self.eval(e)?);
            }
        }
        Ok(values)
    }

    fn eval_call(&mut self, expr: &Expr) -> Result<Vec<Value>, LuaError> {
        match expr {
            Expr::Call { func, args, line } => {
                let f = self.eval(func)?;
                let argv = self.eval_list(args)?;
                self.state.set_current_line(*line);
                if !self.state.is_callable(&f) {
                    return Err(self.call_error(&f, self.describe(func)));
                }
                self.state.call_named(&f, argv, call_site_name(func))
            }
            Expr::Method {
                obj,
                name,
                args,
                line,
            } => {
                let o = self.eval(obj)?;
                self.state.set_current_line(*line);
                let desc = self.describe(obj);
                let f = self.get_field(&o, &Value::from(name.clone()), desc)?;
                let mut argv = vec![o];
                argv.extend(self.eval_list(args)?);
                self.state.set_current_line(*line);
                if !self.state.is_callable(&f) {
                    return Err(self.call_error(&f, Some(format!("method '{name}'"))));
                }
                self.state.call_named(&f, argv, Some(name.clone()))
            }
            other => Ok(vec![self.eval(other)?]),
        }
    }

    fn call_error(&self, f: &Value, desc: Option<String>) -> LuaError {
        match desc {
            Some(d) => self.error(format!("attempt to call {d} (a {} value)", f.kind())),
            None => self.error(format!("attempt to call a {} value", f.kind())),
        }
    }
}

/// Name a callee was reached through, used in "bad argument" messages.
fn call_site_name(func: &Expr) -> Option<Rc<str>> {
    match func {
        Expr::Name(n) => Some(n.clone()),
        Expr::Index { key, .. } => match &**key {
            Expr::Str(s) => Some(s.clone()),
            _ => None,
        },
        _ => None,
    }
}
