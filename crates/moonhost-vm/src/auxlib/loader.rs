//! Compiling source into chunks, and running them under protection.

use crate::error::LuaError;
use crate::interp;
use crate::state::State;
use crate::value::{Function, Value};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, warn};

/// Chunk name of string-sourced chunks.
pub const STRING_CHUNK: &str = "<string>";
/// Chunk name of chunks read from standard input.
pub const STDIN_CHUNK: &str = "<stdin>";

impl State {
    /// Compile an in-memory buffer into a callable chunk.
    pub fn load_buffer(&mut self, source: &[u8], chunk_name: &str) -> Result<Rc<Function>, LuaError> {
        debug!(chunk = chunk_name, bytes = source.len(), "loading chunk");
        let chunk = moonhost_compiler::compile(source, chunk_name)?;
        Ok(interp::new_closure(chunk.body, chunk.name))
    }

    /// Compile everything readable from `reader`.
    pub fn load<R: Read>(&mut self, mut reader: R, chunk_name: &str) -> Result<Rc<Function>, LuaError> {
        let mut source = Vec::new();
        reader
            .read_to_end(&mut source)
            .map_err(|_| LuaError::File(format!("can not read {chunk_name}")))?;
        self.load_buffer(&source, chunk_name)
    }

    pub fn load_string(&mut self, source: &str) -> Result<Rc<Function>, LuaError> {
        self.load_buffer(source.as_bytes(), STRING_CHUNK)
    }

    /// Compile the file at `path`, named by its base name. An empty path
    /// reads the state's standard input.
    pub fn load_file(&mut self, path: &str) -> Result<Rc<Function>, LuaError> {
        if path.is_empty() {
            let mut source = Vec::new();
            self.stdin_mut()
                .read_to_end(&mut source)
                .map_err(|_| LuaError::File(format!("can not read {STDIN_CHUNK}")))?;
            return self.load_buffer(&source, STDIN_CHUNK);
        }
        let read_error = || LuaError::File(format!("can not read {path}"));
        let mut source = Vec::new();
        {
            let mut file = File::open(path).map_err(|_| read_error())?;
            file.read_to_end(&mut source).map_err(|_| read_error())?;
        }
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        self.load_buffer(&source, &name)
    }

    /// Load and run a file. Runtime errors come back as `Err` values.
    pub fn do_file(&mut self, path: &str) -> Result<Vec<Value>, LuaError> {
        let chunk = self.load_file(path)?;
        self.run_protected(chunk, path)
    }

    /// Load and run a string. Nothing runs when compilation fails.
    pub fn do_string(&mut self, source: &str) -> Result<Vec<Value>, LuaError> {
        let chunk = self.load_string(source)?;
        self.run_protected(chunk, STRING_CHUNK)
    }

    fn run_protected(&mut self, chunk: Rc<Function>, origin: &str) -> Result<Vec<Value>, LuaError> {
        let result = self.pcall(&Value::Function(chunk), Vec::new());
        if let Err(e) = &result {
            warn!(origin, error = %e, "chunk failed");
        }
        result
    }
}
