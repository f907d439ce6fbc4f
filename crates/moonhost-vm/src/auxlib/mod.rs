//! The host-embedding boundary: what native functions use to read their
//! arguments, raise errors, publish modules and type metatables, and load
//! script source.
//!
//! Most operations are methods on [`State`](crate::State) or
//! [`CallContext`](crate::CallContext); this module groups their
//! implementations.

pub mod args;
pub mod loader;
pub mod metatable;
pub mod module;
pub mod path;
pub mod reporter;

pub use args::FromArg;
pub use loader::{STDIN_CHUNK, STRING_CHUNK};
pub use metatable::MetaField;
pub use module::{FunctionSet, LOADED_KEY};
pub use path::find_table;
