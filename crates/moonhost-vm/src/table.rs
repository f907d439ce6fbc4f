//! Insertion-ordered hash table for Lua.

use crate::value::Value;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Shared handle to a table.
pub type TableRef = Rc<RefCell<Table>>;

/// Create a new empty table handle with size hints.
pub fn new_table(array_hint: usize, hash_hint: usize) -> TableRef {
    Rc::new(RefCell::new(Table::with_capacity(array_hint, hash_hint)))
}

/// A key in the hash part of a table. Never nil or NaN.
#[derive(Clone, Debug)]
pub struct TableKey(Value);

impl PartialEq for TableKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.raw_equal(&other.0)
    }
}

impl Eq for TableKey {}

impl Hash for TableKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0 {
            Value::Nil => 0u8.hash(state),
            Value::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Number(n) => {
                2u8.hash(state);
                // -0.0 and 0.0 are the same key
                let n = if *n == 0.0 { 0.0 } else { *n };
                n.to_bits().hash(state);
            }
            Value::String(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            other => {
                4u8.hash(state);
                other.identity().hash(state);
            }
        }
    }
}

/// A Lua table: hash map preserving insertion order for `next`.
///
/// Assigning nil to an existing key leaves a tombstone so that a traversal
/// in progress can continue past it.
#[derive(Default)]
pub struct Table {
    hash: IndexMap<TableKey, Value>,
    /// Metatable (if any).
    pub metatable: Option<TableRef>,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table: {:p}", self)
    }
}

impl Table {
    pub fn new() -> Self {
        Table::default()
    }

    /// Create a new empty table with size hints.
    pub fn with_capacity(array_hint: usize, hash_hint: usize) -> Self {
        Table {
            hash: IndexMap::with_capacity(array_hint + hash_hint),
            metatable: None,
        }
    }

    /// Raw get by value key.
    pub fn raw_get(&self, key: &Value) -> Value {
        if key.is_nil() {
            return Value::Nil;
        }
        self.hash
            .get(&TableKey(key.clone()))
            .cloned()
            .unwrap_or(Value::Nil)
    }

    pub fn raw_get_str(&self, key: &str) -> Value {
        self.raw_get(&Value::from(key))
    }

    pub fn raw_get_int(&self, key: i64) -> Value {
        self.raw_get(&Value::Number(key as f64))
    }

    /// Raw set by value key.
    pub fn raw_set(&mut self, key: Value, value: Value) -> Result<(), &'static str> {
        match &key {
            Value::Nil => return Err("table index is nil"),
            Value::Number(n) if n.is_nan() => return Err("table index is NaN"),
            _ => {}
        }
        let key = TableKey(key);
        if value.is_nil() {
            if let Some(slot) = self.hash.get_mut(&key) {
                *slot = Value::Nil;
            }
        } else {
            self.hash.insert(key, value);
        }
        Ok(())
    }

    pub fn raw_set_str(&mut self, key: &str, value: Value) {
        // String keys are never nil or NaN
        let _ = self.raw_set(Value::from(key), value);
    }

    pub fn raw_set_int(&mut self, key: i64, value: Value) {
        let _ = self.raw_set(Value::Number(key as f64), value);
    }

    /// Border of the sequence part: `n` with `t[n] ~= nil` and `t[n+1] == nil`.
    pub fn len(&self) -> usize {
        let mut n = 0;
        while !self.raw_get_int(n as i64 + 1).is_nil() {
            n += 1;
        }
        n
    }

    pub fn is_empty(&self) -> bool {
        self.hash.values().all(Value::is_nil)
    }

    /// Traversal step: the entry after `key` (nil starts), skipping tombstones.
    pub fn next(&self, key: &Value) -> Result<Option<(Value, Value)>, &'static str> {
        let start = if key.is_nil() {
            0
        } else {
            match self.hash.get_index_of(&TableKey(key.clone())) {
                Some(i) => i + 1,
                None => return Err("invalid key to 'next'"),
            }
        };
        for i in start..self.hash.len() {
            if let Some((k, v)) = self.hash.get_index(i) {
                if !v.is_nil() {
                    return Ok(Some((k.0.clone(), v.clone())));
                }
            }
        }
        Ok(None)
    }

    /// Live entries in insertion order.
    pub fn pairs(&self) -> impl Iterator<Item = (Value, Value)> + '_ {
        self.hash
            .iter()
            .filter(|(_, v)| !v.is_nil())
            .map(|(k, v)| (k.0.clone(), v.clone()))
    }

    /// Insert at 1-based `pos`, shifting `pos..=len` up by one.
    pub fn insert(&mut self, pos: usize, value: Value) {
        let len = self.len();
        let mut i = len;
        while i >= pos && i > 0 {
            let moved = self.raw_get_int(i as i64);
            self.raw_set_int(i as i64 + 1, moved);
            i -= 1;
        }
        self.raw_set_int(pos as i64, value);
    }

    /// Remove at 1-based `pos`, shifting the tail down. Returns the removed value.
    pub fn remove(&mut self, pos: usize) -> Value {
        let len = self.len();
        let removed = self.raw_get_int(pos as i64);
        for i in pos..len {
            let moved = self.raw_get_int(i as i64 + 1);
            self.raw_set_int(i as i64, moved);
        }
        if len >= pos {
            self.raw_set_int(len as i64, Value::Nil);
        }
        removed
    }
}
