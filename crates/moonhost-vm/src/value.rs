//! Script values.
//!
//! `Value` is a closed tagged union over the eight script-visible kinds.
//! Reference kinds (table, function, userdata, thread) compare by identity.

use crate::coerce::number_to_string;
use crate::error::LuaError;
use crate::interp::Scope;
use crate::state::CallContext;
use crate::table::{Table, TableRef};
use moonhost_compiler::ast::FuncBody;
use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// Signature of a host function callable from scripts.
pub type NativeFn = fn(&mut CallContext<'_>) -> Result<Vec<Value>, LuaError>;

/// Dynamic kind of a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Nil,
    Bool,
    Number,
    String,
    Table,
    Function,
    UserData,
    Thread,
}

impl Kind {
    /// Script-visible name, as returned by `type()`.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Nil => "nil",
            Kind::Bool => "boolean",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Table => "table",
            Kind::Function => "function",
            Kind::UserData => "userdata",
            Kind::Thread => "thread",
        }
    }

    pub const ALL: [Kind; 8] = [
        Kind::Nil,
        Kind::Bool,
        Kind::Number,
        Kind::String,
        Kind::Table,
        Kind::Function,
        Kind::UserData,
        Kind::Thread,
    ];
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A host function wrapped as a script value.
pub struct NativeFunction {
    pub name: Rc<str>,
    pub func: NativeFn,
}

/// A script function: a parsed body plus the scope it closes over.
pub struct LuaClosure {
    pub body: Rc<FuncBody>,
    /// Chunk name the body was compiled under.
    pub chunk: Rc<str>,
    pub(crate) scope: Option<Rc<Scope>>,
}

pub enum Function {
    Native(NativeFunction),
    Lua(LuaClosure),
}

impl Function {
    pub fn is_native(&self) -> bool {
        matches!(self, Function::Native(_))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Native(native) => write!(f, "function: builtin {}", native.name),
            Function::Lua(closure) => write!(
                f,
                "function: {}:{}",
                closure.chunk, closure.body.line
            ),
        }
    }
}

/// Host data exposed to scripts, optionally typed through a metatable.
pub struct UserData {
    data: RefCell<Box<dyn Any>>,
    metatable: RefCell<Option<TableRef>>,
}

impl UserData {
    pub fn new<T: Any>(data: T) -> Self {
        UserData {
            data: RefCell::new(Box::new(data)),
            metatable: RefCell::new(None),
        }
    }

    pub fn is<T: Any>(&self) -> bool {
        (**self.data.borrow()).is::<T>()
    }

    pub fn borrow<T: Any>(&self) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.data.borrow(), |data| (**data).downcast_ref::<T>()).ok()
    }

    pub fn borrow_mut<T: Any>(&self) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.data.borrow_mut(), |data| (**data).downcast_mut::<T>()).ok()
    }

    pub fn metatable(&self) -> Option<TableRef> {
        self.metatable.borrow().clone()
    }

    pub fn set_metatable(&self, metatable: Option<TableRef>) {
        *self.metatable.borrow_mut() = metatable;
    }
}

/// Handle for a script thread. Only the main thread exists at this layer.
#[derive(Debug)]
pub struct Thread {
    pub id: usize,
}

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Table(TableRef),
    Function(Rc<Function>),
    UserData(Rc<UserData>),
    Thread(Rc<Thread>),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Nil => Kind::Nil,
            Value::Bool(_) => Kind::Bool,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Table(_) => Kind::Table,
            Value::Function(_) => Kind::Function,
            Value::UserData(_) => Kind::UserData,
            Value::Thread(_) => Kind::Thread,
        }
    }

    /// Wrap a fresh table.
    pub fn table(table: Table) -> Value {
        Value::Table(Rc::new(RefCell::new(table)))
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// `nil` and `false` are falsy; everything else is truthy.
    #[inline]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableRef> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<Function>> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_userdata(&self) -> Option<&Rc<UserData>> {
        match self {
            Value::UserData(u) => Some(u),
            _ => None,
        }
    }

    /// Address used for identity and for `table: 0x...` style rendering.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Table(t) => Some(Rc::as_ptr(t) as *const u8 as usize),
            Value::Function(f) => Some(Rc::as_ptr(f) as *const u8 as usize),
            Value::UserData(u) => Some(Rc::as_ptr(u) as *const u8 as usize),
            Value::Thread(t) => Some(Rc::as_ptr(t) as *const u8 as usize),
            _ => None,
        }
    }

    /// Primitive equality, bypassing `__eq`.
    pub fn raw_equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::UserData(a), Value::UserData(b)) => Rc::ptr_eq(a, b),
            (Value::Thread(a), Value::Thread(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::String(s)
    }
}

impl From<TableRef> for Value {
    fn from(t: TableRef) -> Self {
        Value::Table(t)
    }
}

impl From<Rc<Function>> for Value {
    fn from(f: Rc<Function>) -> Self {
        Value::Function(f)
    }
}

/// Raw rendering, without `__tostring`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&number_to_string(*n)),
            Value::String(s) => f.write_str(s),
            other => write!(
                f,
                "{}: {:#010x}",
                other.kind(),
                other.identity().unwrap_or_default()
            ),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            other => write!(f, "{other}"),
        }
    }
}
