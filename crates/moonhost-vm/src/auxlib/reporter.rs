//! Script-visible error construction with call-position context.

use crate::error::{ErrorKind, LuaError};
use crate::state::{CallContext, State};
use crate::value::Kind;

impl State {
    /// Position string for the frame `level` levels out from the innermost:
    /// `"chunk:line:"`, or empty for a host frame or a missing frame.
    pub fn location(&self, level: usize) -> String {
        match self.frame_info(level) {
            Some(info) => match (info.source, info.current_line) {
                (Some(source), Some(line)) => {
                    let source: &str = if source.is_empty() { "[G]" } else { &source };
                    format!("{source}:{line}:")
                }
                _ => String::new(),
            },
            None => String::new(),
        }
    }

    /// Error of `kind` positioned at the code that called the running host
    /// function.
    pub fn raise(&self, kind: ErrorKind, message: impl AsRef<str>) -> LuaError {
        LuaError::with_kind(kind, prefixed(self.location(1), message.as_ref()))
    }

    /// Runtime error positioned at the innermost frame.
    pub fn runtime_error(&self, message: impl Into<String>) -> LuaError {
        LuaError::runtime(prefixed(self.location(0), &message.into()))
    }

    /// Name the function at `level` was called under, or `?`.
    pub fn frame_function_name(&self, level: usize) -> String {
        self.frame_info(level)
            .and_then(|info| info.name)
            .map(|name| name.to_string())
            .unwrap_or_else(|| "?".to_string())
    }

    /// `stack traceback:` followed by one line per frame from `level` outwards.
    pub fn traceback(&self, message: Option<&str>, level: usize) -> String {
        let mut out = String::new();
        if let Some(msg) = message {
            out.push_str(msg);
            out.push('\n');
        }
        out.push_str("stack traceback:");
        let mut level = level;
        while let Some(info) = self.frame_info(level) {
            let place = match (&info.source, info.current_line) {
                (Some(_), Some(_)) => self.location(level),
                _ => "[C]:".to_string(),
            };
            let what = match (&info.name, info.what()) {
                (_, "main") => "main chunk".to_string(),
                (Some(name), _) => format!("function '{name}'"),
                (None, "C") => "?".to_string(),
                (None, _) => format!(
                    "function <{}:{}>",
                    info.source.as_deref().unwrap_or("?"),
                    info.line_defined.unwrap_or(0)
                ),
            };
            out.push_str(&format!("\n\t{place} in {what}"));
            level += 1;
        }
        out
    }
}

fn prefixed(position: String, message: &str) -> String {
    if position.is_empty() {
        message.to_string()
    } else {
        format!("{position} {message}")
    }
}

impl CallContext<'_> {
    /// `bad argument #n to f (detail)`.
    pub fn arg_error(&self, n: usize, detail: &str) -> LuaError {
        self.arg_error_kind(ErrorKind::Runtime, n, detail)
    }

    /// `bad argument #n to f (expected expected, got actual)`.
    pub fn type_error(&self, n: usize, expected: Kind) -> LuaError {
        let detail = format!("{expected} expected, got {}", self.arg(n).kind());
        self.arg_error_kind(ErrorKind::TypeMismatch, n, &detail)
    }

    /// `bad argument` error of a specific kind.
    pub fn arg_error_kind(&self, kind: ErrorKind, n: usize, detail: &str) -> LuaError {
        let fname = self.state.frame_function_name(0);
        self.state
            .raise(kind, format!("bad argument #{n} to {fname} ({detail})"))
    }
}
