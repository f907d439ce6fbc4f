//! Call frame information for the interpreter.

use std::rc::Rc;

#[derive(Clone, Debug)]
pub enum FrameKind {
    /// A script function compiled under `chunk`, defined at `line_defined`
    /// (0 for a main chunk).
    Lua { chunk: Rc<str>, line_defined: u32 },
    /// A host function.
    Native,
}

/// A call frame on the state's call stack.
#[derive(Clone, Debug)]
pub struct CallInfo {
    pub kind: FrameKind,
    /// Name the callee was invoked under at the call site, if known.
    pub name: Option<Rc<str>>,
    /// Line currently executing (script frames only).
    pub current_line: u32,
}

impl CallInfo {
    pub fn lua(chunk: Rc<str>, line_defined: u32, name: Option<Rc<str>>) -> Self {
        CallInfo {
            kind: FrameKind::Lua {
                chunk,
                line_defined,
            },
            name,
            current_line: line_defined,
        }
    }

    pub fn native(name: Option<Rc<str>>) -> Self {
        CallInfo {
            kind: FrameKind::Native,
            name,
            current_line: 0,
        }
    }

    #[inline]
    pub fn is_lua(&self) -> bool {
        matches!(self.kind, FrameKind::Lua { .. })
    }
}

/// Read-only view of one frame, as consumed by error formatting and the
/// debug library. Level 0 is the innermost (currently running) frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameInfo {
    pub name: Option<Rc<str>>,
    /// Chunk name for script frames; `None` for host frames.
    pub source: Option<Rc<str>>,
    pub current_line: Option<u32>,
    pub line_defined: Option<u32>,
}

impl FrameInfo {
    pub fn is_native(&self) -> bool {
        self.source.is_none()
    }

    /// `main`, `Lua` or `C`, as reported by `debug.getinfo`.
    pub fn what(&self) -> &'static str {
        match (self.source.is_some(), self.line_defined) {
            (false, _) => "C",
            (true, Some(0)) => "main",
            (true, _) => "Lua",
        }
    }
}

impl From<&CallInfo> for FrameInfo {
    fn from(ci: &CallInfo) -> Self {
        match &ci.kind {
            FrameKind::Lua {
                chunk,
                line_defined,
            } => FrameInfo {
                name: ci.name.clone(),
                source: Some(chunk.clone()),
                current_line: Some(ci.current_line),
                line_defined: Some(*line_defined),
            },
            FrameKind::Native => FrameInfo {
                name: ci.name.clone(),
                source: None,
                current_line: None,
                line_defined: None,
            },
        }
    }
}
