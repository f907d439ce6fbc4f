//! Per-type metatables and metafield lookup.

use crate::error::LuaError;
use crate::state::State;
use crate::table::{new_table, TableRef};
use crate::value::{UserData, Value};
use std::any::Any;
use std::rc::Rc;
use tracing::debug;

/// Outcome of a metafield lookup, keeping apart the two ways it can miss.
#[derive(Clone, Debug)]
pub enum MetaField {
    /// The value has no metatable.
    NoMetatable,
    /// The metatable exists but has no such field.
    Missing,
    Found(Value),
}

impl MetaField {
    /// Collapse to the field value, nil for either miss.
    pub fn into_value(self) -> Value {
        match self {
            MetaField::Found(v) => v,
            MetaField::NoMetatable | MetaField::Missing => Value::Nil,
        }
    }
}

impl State {
    /// The metatable attached to `v`, if any. Strings share one per state.
    pub fn metatable_of(&self, v: &Value) -> Option<TableRef> {
        match v {
            Value::Table(t) => t.borrow().metatable.clone(),
            Value::UserData(u) => u.metatable(),
            Value::String(_) => self.string_metatable(),
            _ => None,
        }
    }

    /// Attach (or with `None`, detach) a metatable. Only tables and userdata
    /// carry their own.
    pub fn set_metatable(&mut self, v: &Value, metatable: Option<TableRef>) -> Result<(), LuaError> {
        match v {
            Value::Table(t) => t.borrow_mut().metatable = metatable,
            Value::UserData(u) => u.set_metatable(metatable),
            other => {
                return Err(self.runtime_error(format!(
                    "cannot set metatable of a {} value",
                    other.kind()
                )))
            }
        }
        Ok(())
    }

    /// The registered metatable for `type_name`, created empty on first use.
    pub fn new_type_metatable(&mut self, type_name: &str) -> TableRef {
        let registry = self.registry();
        if let Value::Table(existing) = registry.borrow().raw_get_str(type_name) {
            return existing;
        }
        let mt = new_table(0, 8);
        registry
            .borrow_mut()
            .raw_set_str(type_name, Value::Table(mt.clone()));
        debug!(type_name, "created type metatable");
        mt
    }

    /// The registered metatable for `type_name`, or nil. Never creates one.
    pub fn get_type_metatable(&self, type_name: &str) -> Value {
        self.registry().borrow().raw_get_str(type_name)
    }

    pub fn lookup_meta_field(&self, v: &Value, event: &str) -> MetaField {
        match self.metatable_of(v) {
            None => MetaField::NoMetatable,
            Some(mt) => match mt.borrow().raw_get_str(event) {
                Value::Nil => MetaField::Missing,
                found => MetaField::Found(found),
            },
        }
    }

    /// Field `event` of `v`'s metatable; nil when there is no metatable or
    /// no such field. Never invokes anything.
    pub fn get_meta_field(&self, v: &Value, event: &str) -> Value {
        self.lookup_meta_field(v, event).into_value()
    }

    /// Call metafield `event` with `v` as sole argument when it is a
    /// function, returning its first result; nil otherwise.
    pub fn call_meta(&mut self, v: &Value, event: &str) -> Result<Value, LuaError> {
        let handler = self.get_meta_field(v, event);
        if !matches!(handler, Value::Function(_)) {
            return Ok(Value::Nil);
        }
        let results = self.call(&handler, vec![v.clone()])?;
        Ok(results.into_iter().next().unwrap_or_default())
    }

    /// Wrap host data as userdata, typed by the metatable registered under
    /// `type_name` when given.
    pub fn new_userdata<T: Any>(&mut self, data: T, type_name: Option<&str>) -> Value {
        let ud = UserData::new(data);
        if let Some(name) = type_name {
            ud.set_metatable(Some(self.new_type_metatable(name)));
        }
        Value::UserData(Rc::new(ud))
    }
}
