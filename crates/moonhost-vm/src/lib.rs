//! moonhost runtime: values, tables, the interpreter and the host-embedding
//! boundary in [`auxlib`].

pub mod auxlib;
pub mod callinfo;
pub mod coerce;
pub mod error;
mod interp;
pub mod metamethod;
pub mod state;
pub mod table;
pub mod value;

pub use auxlib::{find_table, FromArg, FunctionSet, MetaField};
pub use callinfo::FrameInfo;
pub use error::{ErrorKind, LuaError};
pub use metamethod::ArithOp;
pub use state::{CallContext, Options, State};
pub use table::{new_table, Table, TableRef};
pub use value::{Function, Kind, NativeFn, UserData, Value};

/// Run `source` in a fresh state with no libraries opened.
pub fn execute_source(source: &str) -> Result<Vec<Value>, LuaError> {
    let mut state = State::new();
    state.do_string(source)
}
