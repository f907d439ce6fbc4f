//! moonhost compiler: lexer and parser for Lua 5.1 source.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use error::CompileError;

/// Compile `source` into a chunk reported under `chunk_name`.
pub fn compile(source: &[u8], chunk_name: &str) -> Result<ast::Chunk, CompileError> {
    parser::parse(source, chunk_name)
}
