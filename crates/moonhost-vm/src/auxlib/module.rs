//! Idempotent installation of named function sets.

use super::path::find_table;
use crate::error::{ErrorKind, LuaError};
use crate::state::State;
use crate::table::TableRef;
use crate::value::{NativeFn, Value};
use tracing::debug;

/// Registry key of the loaded-modules table.
pub const LOADED_KEY: &str = "_LOADED";

/// Name/function pairs installed by a module.
pub type FunctionSet<'a> = &'a [(&'a str, NativeFn)];

impl State {
    /// The registry's loaded-modules table, created on first use.
    pub fn loaded_modules(&self) -> TableRef {
        match find_table(&Value::Table(self.registry()), LOADED_KEY, 1) {
            Value::Table(t) => t,
            // The registry is not script-reachable, so the slot is always a table.
            _ => {
                let t = crate::table::new_table(0, 1);
                self.registry()
                    .borrow_mut()
                    .raw_set_str(LOADED_KEY, Value::Table(t.clone()));
                t
            }
        }
    }

    /// Install `funcs` as the global module `name` (dotted names nest).
    ///
    /// A module already recorded as loaded is returned unchanged. Fails with
    /// a name conflict when the global slot holds a non-table value.
    pub fn register_module(&mut self, name: &str, funcs: FunctionSet<'_>) -> Result<TableRef, LuaError> {
        let loaded = self.loaded_modules();
        if let Value::Table(existing) = loaded.borrow().raw_get_str(name) {
            return Ok(existing);
        }
        let module = match find_table(&Value::Table(self.globals()), name, funcs.len()) {
            Value::Table(t) => t,
            _ => {
                return Err(self.raise(
                    ErrorKind::NameConflict,
                    format!("name conflict for module({name})"),
                ))
            }
        };
        self.install(&module, funcs);
        loaded
            .borrow_mut()
            .raw_set_str(name, Value::Table(module.clone()));
        debug!(module = name, functions = funcs.len(), "registered module");
        Ok(module)
    }

    /// Install `funcs` directly into `target`, without any bookkeeping.
    pub fn register_module_to_table(
        &mut self,
        target: &Value,
        funcs: FunctionSet<'_>,
    ) -> Result<TableRef, LuaError> {
        let table = match target {
            Value::Table(t) => t.clone(),
            other => {
                let fname = self.frame_function_name(0);
                return Err(self.raise(
                    ErrorKind::TypeMismatch,
                    format!(
                        "bad argument #1 to {fname} (table expected, got {})",
                        other.kind()
                    ),
                ));
            }
        };
        self.install(&table, funcs);
        Ok(table)
    }

    fn install(&self, table: &TableRef, funcs: FunctionSet<'_>) {
        let mut t = table.borrow_mut();
        for (name, func) in funcs {
            t.raw_set_str(name, self.new_function(name, *func));
        }
    }
}
