//! Error types shared by the runtime and the host boundary.

use crate::value::Value;
use moonhost_compiler::CompileError;
use thiserror::Error;

/// Category of a [`LuaError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ArgumentMissing,
    TypeMismatch,
    InvalidOption,
    NameConflict,
    File,
    Compile,
    Runtime,
}

/// An error raised by script or host code.
///
/// Every variant travels the same channel: an `Err` propagated to the nearest
/// protected call, where [`LuaError::to_value`] turns it into the value a
/// script observes.
#[derive(Clone, Debug, Error)]
pub enum LuaError {
    /// A mandatory argument was not supplied.
    #[error("{0}")]
    ArgumentMissing(String),
    /// An argument had the wrong kind.
    #[error("{0}")]
    TypeMismatch(String),
    /// A string argument was not one of the accepted options.
    #[error("{0}")]
    InvalidOption(String),
    /// A module name is bound to a non-table global.
    #[error("{0}")]
    NameConflict(String),
    /// A source file could not be opened or read.
    #[error("{0}")]
    File(String),
    /// Source text failed to compile.
    #[error("{0}")]
    Compile(String),
    /// `error()` with an arbitrary value, or a runtime fault.
    #[error("{0}")]
    Runtime(Value),
    /// Too many nested calls.
    #[error("stack overflow")]
    StackOverflow,
}

impl LuaError {
    /// Runtime error carrying a string message.
    pub fn runtime(message: impl Into<String>) -> Self {
        LuaError::Runtime(Value::from(message.into()))
    }

    /// Build an error of `kind` carrying `message`.
    pub fn with_kind(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::ArgumentMissing => LuaError::ArgumentMissing(message),
            ErrorKind::TypeMismatch => LuaError::TypeMismatch(message),
            ErrorKind::InvalidOption => LuaError::InvalidOption(message),
            ErrorKind::NameConflict => LuaError::NameConflict(message),
            ErrorKind::File => LuaError::File(message),
            ErrorKind::Compile => LuaError::Compile(message),
            ErrorKind::Runtime => LuaError::runtime(message),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LuaError::ArgumentMissing(_) => ErrorKind::ArgumentMissing,
            LuaError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            LuaError::InvalidOption(_) => ErrorKind::InvalidOption,
            LuaError::NameConflict(_) => ErrorKind::NameConflict,
            LuaError::File(_) => ErrorKind::File,
            LuaError::Compile(_) => ErrorKind::Compile,
            LuaError::Runtime(_) | LuaError::StackOverflow => ErrorKind::Runtime,
        }
    }

    /// Convert this error into the value seen by `pcall`.
    pub fn to_value(&self) -> Value {
        match self {
            LuaError::Runtime(v) => v.clone(),
            other => Value::from(other.to_string()),
        }
    }
}

impl From<CompileError> for LuaError {
    fn from(e: CompileError) -> Self {
        LuaError::Compile(e.to_string())
    }
}
