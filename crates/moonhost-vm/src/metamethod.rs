//! Metamethod-aware primitive operations for Lua 5.1.

use crate::coerce;
use crate::error::LuaError;
use crate::state::State;
use crate::value::Value;

/// Max `__index` / `__newindex` chain length before giving up.
const MAX_TAG_LOOP: usize = 100;

/// Binary arithmetic operators that can dispatch to a metamethod.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl ArithOp {
    pub fn event(self) -> &'static str {
        match self {
            ArithOp::Add => "__add",
            ArithOp::Sub => "__sub",
            ArithOp::Mul => "__mul",
            ArithOp::Div => "__div",
            ArithOp::Mod => "__mod",
            ArithOp::Pow => "__pow",
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
            // Lua 5.1: a - floor(a/b)*b
            ArithOp::Mod => a - (a / b).floor() * b,
            ArithOp::Pow => a.powf(b),
        }
    }
}

impl State {
    /// Metamethod handler `event` for either operand (first wins).
    fn binary_handler(&self, a: &Value, b: &Value, event: &str) -> Option<Value> {
        let h = self.get_meta_field(a, event);
        if !h.is_nil() {
            return Some(h);
        }
        let h = self.get_meta_field(b, event);
        (!h.is_nil()).then_some(h)
    }

    fn first_result(&mut self, handler: &Value, args: Vec<Value>) -> Result<Value, LuaError> {
        Ok(self
            .call(handler, args)?
            .into_iter()
            .next()
            .unwrap_or(Value::Nil))
    }

    /// `t[k]` honoring `__index`.
    pub fn index(&mut self, obj: &Value, key: &Value) -> Result<Value, LuaError> {
        let mut current = obj.clone();
        for _ in 0..MAX_TAG_LOOP {
            let handler = match &current {
                Value::Table(t) => {
                    let v = t.borrow().raw_get(key);
                    if !v.is_nil() {
                        return Ok(v);
                    }
                    let h = self.get_meta_field(&current, "__index");
                    if h.is_nil() {
                        return Ok(Value::Nil);
                    }
                    h
                }
                other => {
                    let h = self.get_meta_field(other, "__index");
                    if h.is_nil() {
                        return Err(self.runtime_error(format!(
                            "attempt to index a {} value",
                            other.kind()
                        )));
                    }
                    h
                }
            };
            if let Value::Function(_) = handler {
                return self.first_result(&handler, vec![current, key.clone()]);
            }
            current = handler;
        }
        Err(self.runtime_error("loop in gettable"))
    }

    /// `t[k] = v` honoring `__newindex`.
    pub fn set_index(&mut self, obj: &Value, key: Value, value: Value) -> Result<(), LuaError> {
        let mut current = obj.clone();
        for _ in 0..MAX_TAG_LOOP {
            let handler = match &current {
                Value::Table(t) => {
                    let present = !t.borrow().raw_get(&key).is_nil();
                    let h = if present {
                        Value::Nil
                    } else {
                        self.get_meta_field(&current, "__newindex")
                    };
                    if h.is_nil() {
                        let result = t.borrow_mut().raw_set(key, value);
                        return result.map_err(|msg| self.runtime_error(msg));
                    }
                    h
                }
                other => {
                    let h = self.get_meta_field(other, "__newindex");
                    if h.is_nil() {
                        return Err(self.runtime_error(format!(
                            "attempt to index a {} value",
                            other.kind()
                        )));
                    }
                    h
                }
            };
            if let Value::Function(_) = handler {
                self.call(&handler, vec![current, key, value])?;
                return Ok(());
            }
            current = handler;
        }
        Err(self.runtime_error("loop in settable"))
    }

    pub fn arith(&mut self, op: ArithOp, a: &Value, b: &Value) -> Result<Value, LuaError> {
        if let (Some(x), Some(y)) = (coerce::to_number(a), coerce::to_number(b)) {
            return Ok(Value::Number(op.apply(x, y)));
        }
        if let Some(h) = self.binary_handler(a, b, op.event()) {
            return self.first_result(&h, vec![a.clone(), b.clone()]);
        }
        let culprit = if coerce::to_number(a).is_none() { a } else { b };
        Err(self.runtime_error(format!(
            "attempt to perform arithmetic on a {} value",
            culprit.kind()
        )))
    }

    pub fn unm(&mut self, a: &Value) -> Result<Value, LuaError> {
        if let Some(x) = coerce::to_number(a) {
            return Ok(Value::Number(-x));
        }
        let h = self.get_meta_field(a, "__unm");
        if !h.is_nil() {
            return self.first_result(&h, vec![a.clone(), a.clone()]);
        }
        Err(self.runtime_error(format!(
            "attempt to perform arithmetic on a {} value",
            a.kind()
        )))
    }

    pub fn concat(&mut self, a: &Value, b: &Value) -> Result<Value, LuaError> {
        if let (Some(x), Some(y)) = (
            coerce::to_string_for_concat(a),
            coerce::to_string_for_concat(b),
        ) {
            return Ok(Value::from(x + &y));
        }
        if let Some(h) = self.binary_handler(a, b, "__concat") {
            return self.first_result(&h, vec![a.clone(), b.clone()]);
        }
        let culprit = if coerce::to_string_for_concat(a).is_none() {
            a
        } else {
            b
        };
        Err(self.runtime_error(format!(
            "attempt to concatenate a {} value",
            culprit.kind()
        )))
    }

    /// `#v`: strings by byte length, tables by border, others via `__len`.
    pub fn len(&mut self, v: &Value) -> Result<Value, LuaError> {
        match v {
            Value::String(s) => Ok(Value::from(s.len())),
            Value::Table(t) => Ok(Value::from(t.borrow().len())),
            other => {
                let h = self.get_meta_field(other, "__len");
                if !h.is_nil() {
                    return self.first_result(&h, vec![other.clone()]);
                }
                Err(self.runtime_error(format!(
                    "attempt to get length of a {} value",
                    other.kind()
                )))
            }
        }
    }

    /// `a == b`: raw equality, then a shared `__eq` for two tables or two userdata.
    pub fn equals(&mut self, a: &Value, b: &Value) -> Result<bool, LuaError> {
        if a.raw_equal(b) {
            return Ok(true);
        }
        let same_kind = matches!(
            (a, b),
            (Value::Table(_), Value::Table(_)) | (Value::UserData(_), Value::UserData(_))
        );
        if !same_kind {
            return Ok(false);
        }
        let ha = self.get_meta_field(a, "__eq");
        let hb = self.get_meta_field(b, "__eq");
        if ha.is_nil() || !ha.raw_equal(&hb) {
            return Ok(false);
        }
        Ok(self.first_result(&ha, vec![a.clone(), b.clone()])?.is_truthy())
    }

    pub fn less_than(&mut self, a: &Value, b: &Value) -> Result<bool, LuaError> {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => Ok(x < y),
            (Value::String(x), Value::String(y)) => Ok(x.as_bytes() < y.as_bytes()),
            _ => match self.order_handler(a, b, "__lt") {
                Some(h) => Ok(self.first_result(&h, vec![a.clone(), b.clone()])?.is_truthy()),
                None => Err(self.compare_error(a, b)),
            },
        }
    }

    /// `a <= b`, falling back to `not (b < a)` when only `__lt` exists.
    pub fn less_equal(&mut self, a: &Value, b: &Value) -> Result<bool, LuaError> {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => Ok(x <= y),
            (Value::String(x), Value::String(y)) => Ok(x.as_bytes() <= y.as_bytes()),
            _ => {
                if let Some(h) = self.order_handler(a, b, "__le") {
                    return Ok(self.first_result(&h, vec![a.clone(), b.clone()])?.is_truthy());
                }
                if let Some(h) = self.order_handler(b, a, "__lt") {
                    return Ok(!self.first_result(&h, vec![b.clone(), a.clone()])?.is_truthy());
                }
                Err(self.compare_error(a, b))
            }
        }
    }

    /// Order metamethods apply only when both operands share the same handler.
    fn order_handler(&self, a: &Value, b: &Value, event: &str) -> Option<Value> {
        if a.kind() != b.kind() {
            return None;
        }
        let ha = self.get_meta_field(a, event);
        let hb = self.get_meta_field(b, event);
        (!ha.is_nil() && ha.raw_equal(&hb)).then_some(ha)
    }

    fn compare_error(&self, a: &Value, b: &Value) -> LuaError {
        let msg = if a.kind() == b.kind() {
            format!("attempt to compare two {} values", a.kind())
        } else {
            format!("attempt to compare {} with {}", a.kind(), b.kind())
        };
        self.runtime_error(msg)
    }

    /// `tostring(v)` honoring `__tostring`.
    pub fn tostring(&mut self, v: &Value) -> Result<Value, LuaError> {
        let h = self.get_meta_field(v, "__tostring");
        if h.is_nil() {
            return Ok(match v {
                Value::String(_) => v.clone(),
                other => Value::from(other.to_string()),
            });
        }
        let result = self.first_result(&h, vec![v.clone()])?;
        match result {
            Value::String(_) => Ok(result),
            _ => Err(self.runtime_error("'__tostring' must return a string")),
        }
    }

    /// Whether `v` is a function or has a `__call` handler.
    pub fn is_callable(&self, v: &Value) -> bool {
        matches!(v, Value::Function(_)) || !self.get_meta_field(v, "__call").is_nil()
    }
}
