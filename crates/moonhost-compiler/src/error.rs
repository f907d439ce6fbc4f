use thiserror::Error;

/// A syntax error, reported as `<chunk>:<line>: <message>`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{chunk}:{line}: {message}")]
pub struct CompileError {
    pub chunk: String,
    pub line: u32,
    pub message: String,
}
