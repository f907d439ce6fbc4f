//! Dotted-path lookup inside nested tables.

use crate::table::new_table;
use crate::value::Value;

/// Walk `path` (segments separated by `.`) from `root`, creating an empty
/// table with `size_hint` capacity for each missing segment.
///
/// Returns nil when `root` or any existing segment is not a table; such a
/// segment is left untouched. Only raw accesses are used.
pub fn find_table(root: &Value, path: &str, size_hint: usize) -> Value {
    let mut current = root.clone();
    for name in path.split('.') {
        let table = match &current {
            Value::Table(t) => t.clone(),
            _ => return Value::Nil,
        };
        let next = table.borrow().raw_get_str(name);
        current = match next {
            Value::Nil => {
                let created = new_table(0, size_hint);
                table
                    .borrow_mut()
                    .raw_set_str(name, Value::Table(created.clone()));
                Value::Table(created)
            }
            Value::Table(_) => next,
            _ => return Value::Nil,
        };
    }
    current
}
