//! moonhost standard library: Lua 5.1 built-in modules and the bootstrap
//! that wires them into a fresh state.

pub mod base_lib;
pub mod coroutine_lib;
pub mod debug_lib;
pub mod io_lib;
pub mod math;
pub mod os_lib;
pub mod package_lib;
pub mod string_lib;
pub mod table_lib;

use moonhost_vm::{LuaError, Options, State};
use tracing::debug;

/// Open every built-in module, in the order they depend on each other.
///
/// `package` comes first because it owns the loaded-modules table the other
/// modules register through. Opening twice leaves the same module tables in
/// place.
pub fn open_libs(state: &mut State) -> Result<(), LuaError> {
    package_lib::open(state)?;
    base_lib::open(state)?;
    coroutine_lib::open(state)?;
    io_lib::open(state)?;
    string_lib::open(state)?;
    table_lib::open(state)?;
    math::open(state)?;
    os_lib::open(state)?;
    debug_lib::open(state)?;
    debug!("standard library opened");
    Ok(())
}

/// A state configured by `options`, with the standard library opened unless
/// `skip_open_libs` is set.
pub fn new_state(options: Options) -> Result<State, LuaError> {
    let skip = options.skip_open_libs;
    let mut state = State::with_options(options);
    if !skip {
        open_libs(&mut state)?;
    }
    Ok(state)
}
