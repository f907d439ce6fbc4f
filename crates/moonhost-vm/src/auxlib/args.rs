//! Argument extraction and validation for host functions.
//!
//! Every accessor takes a 1-based position. `check_*` forms fail when the
//! argument has the wrong kind; `opt_*` forms return the default only when
//! the argument is absent or nil and otherwise behave like `check_*`.

use crate::error::{ErrorKind, LuaError};
use crate::state::CallContext;
use crate::table::TableRef;
use crate::value::{Function, Kind, Thread, UserData, Value};
use std::rc::Rc;

/// A host type that can be extracted from exactly one script kind.
pub trait FromArg: Sized {
    const KIND: Kind;

    /// `None` when `v` is not of kind `KIND`.
    fn from_arg(v: &Value) -> Option<Self>;
}

impl FromArg for f64 {
    const KIND: Kind = Kind::Number;
    fn from_arg(v: &Value) -> Option<Self> {
        v.as_number()
    }
}

/// Truncates toward zero.
impl FromArg for i64 {
    const KIND: Kind = Kind::Number;
    fn from_arg(v: &Value) -> Option<Self> {
        v.as_number().map(|n| n as i64)
    }
}

impl FromArg for isize {
    const KIND: Kind = Kind::Number;
    fn from_arg(v: &Value) -> Option<Self> {
        v.as_number().map(|n| n as isize)
    }
}

impl FromArg for bool {
    const KIND: Kind = Kind::Bool;
    fn from_arg(v: &Value) -> Option<Self> {
        match v {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromArg for Rc<str> {
    const KIND: Kind = Kind::String;
    fn from_arg(v: &Value) -> Option<Self> {
        match v {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromArg for TableRef {
    const KIND: Kind = Kind::Table;
    fn from_arg(v: &Value) -> Option<Self> {
        v.as_table().cloned()
    }
}

impl FromArg for Rc<Function> {
    const KIND: Kind = Kind::Function;
    fn from_arg(v: &Value) -> Option<Self> {
        v.as_function().cloned()
    }
}

impl FromArg for Rc<UserData> {
    const KIND: Kind = Kind::UserData;
    fn from_arg(v: &Value) -> Option<Self> {
        v.as_userdata().cloned()
    }
}

impl FromArg for Rc<Thread> {
    const KIND: Kind = Kind::Thread;
    fn from_arg(v: &Value) -> Option<Self> {
        match v {
            Value::Thread(t) => Some(t.clone()),
            _ => None,
        }
    }
}

impl CallContext<'_> {
    /// The argument at `n`, which must have been passed (nil counts).
    pub fn check_any(&self, n: usize) -> Result<Value, LuaError> {
        if n == 0 || n > self.arg_count() {
            return Err(self.arg_error_kind(ErrorKind::ArgumentMissing, n, "value expected"));
        }
        Ok(self.arg(n))
    }

    pub fn check<T: FromArg>(&self, n: usize) -> Result<T, LuaError> {
        T::from_arg(&self.arg(n)).ok_or_else(|| self.type_error(n, T::KIND))
    }

    pub fn opt<T: FromArg>(&self, n: usize, default: T) -> Result<T, LuaError> {
        if self.arg(n).is_nil() {
            return Ok(default);
        }
        self.check(n)
    }

    /// Like [`opt`](Self::opt) with no default: `None` when absent or nil.
    pub fn opt_value<T: FromArg>(&self, n: usize) -> Result<Option<T>, LuaError> {
        if self.arg(n).is_nil() {
            return Ok(None);
        }
        self.check(n).map(Some)
    }

    pub fn check_number(&self, n: usize) -> Result<f64, LuaError> {
        self.check(n)
    }

    pub fn check_int(&self, n: usize) -> Result<isize, LuaError> {
        self.check(n)
    }

    pub fn check_int64(&self, n: usize) -> Result<i64, LuaError> {
        self.check(n)
    }

    pub fn check_string(&self, n: usize) -> Result<Rc<str>, LuaError> {
        self.check(n)
    }

    pub fn check_bool(&self, n: usize) -> Result<bool, LuaError> {
        self.check(n)
    }

    pub fn check_table(&self, n: usize) -> Result<TableRef, LuaError> {
        self.check(n)
    }

    pub fn check_function(&self, n: usize) -> Result<Rc<Function>, LuaError> {
        self.check(n)
    }

    pub fn check_userdata(&self, n: usize) -> Result<Rc<UserData>, LuaError> {
        self.check(n)
    }

    pub fn check_thread(&self, n: usize) -> Result<Rc<Thread>, LuaError> {
        self.check(n)
    }

    pub fn opt_number(&self, n: usize, default: f64) -> Result<f64, LuaError> {
        self.opt(n, default)
    }

    pub fn opt_int(&self, n: usize, default: isize) -> Result<isize, LuaError> {
        self.opt(n, default)
    }

    pub fn opt_int64(&self, n: usize, default: i64) -> Result<i64, LuaError> {
        self.opt(n, default)
    }

    pub fn opt_string(&self, n: usize, default: &str) -> Result<Rc<str>, LuaError> {
        if self.arg(n).is_nil() {
            return Ok(Rc::from(default));
        }
        self.check(n)
    }

    pub fn opt_bool(&self, n: usize, default: bool) -> Result<bool, LuaError> {
        self.opt(n, default)
    }

    pub fn opt_table(&self, n: usize) -> Result<Option<TableRef>, LuaError> {
        self.opt_value(n)
    }

    pub fn opt_function(&self, n: usize) -> Result<Option<Rc<Function>>, LuaError> {
        self.opt_value(n)
    }

    pub fn opt_userdata(&self, n: usize) -> Result<Option<Rc<UserData>>, LuaError> {
        self.opt_value(n)
    }

    /// Validate the kind of argument `n` without extracting it.
    pub fn check_kind(&self, n: usize, kind: Kind) -> Result<(), LuaError> {
        if self.arg(n).kind() != kind {
            return Err(self.arg_error_kind(
                ErrorKind::TypeMismatch,
                n,
                &format!("{kind} expected"),
            ));
        }
        Ok(())
    }

    /// Validate that argument `n` has one of `kinds`.
    pub fn check_kinds(&self, n: usize, kinds: &[Kind]) -> Result<(), LuaError> {
        let actual = self.arg(n).kind();
        if kinds.contains(&actual) {
            return Ok(());
        }
        let expected: Vec<&str> = kinds.iter().map(|k| k.name()).collect();
        Err(self.arg_error_kind(
            ErrorKind::TypeMismatch,
            n,
            &format!("{} expected", expected.join(" or ")),
        ))
    }

    /// Index of string argument `n` within `options`.
    pub fn check_option(&self, n: usize, options: &[&str]) -> Result<usize, LuaError> {
        let s = self.check_string(n)?;
        if let Some(i) = options.iter().position(|o| **o == *s) {
            return Ok(i);
        }
        Err(self.arg_error_kind(
            ErrorKind::InvalidOption,
            n,
            &format!("invalid option: {s} (must be one of {})", options.join(",")),
        ))
    }
}
