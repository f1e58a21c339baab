//! Recursive string visitor shared by typed plans and raw JSON trees.

use serde_json::Value;

/// A tree whose string leaves can be visited and rewritten in place.
///
/// `path` is the dotted/indexed location of the node being visited
/// (`day.meals[2].ideas[0]`); the root is the empty string.
pub trait TextFields {
    fn visit_text_mut(&mut self, path: &str, visit: &mut dyn FnMut(&str, &mut String));
}

/// Join a parent path and a field name.
pub fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

impl TextFields for String {
    fn visit_text_mut(&mut self, path: &str, visit: &mut dyn FnMut(&str, &mut String)) {
        visit(path, self);
    }
}

impl<T: TextFields> TextFields for Option<T> {
    fn visit_text_mut(&mut self, path: &str, visit: &mut dyn FnMut(&str, &mut String)) {
        if let Some(inner) = self {
            inner.visit_text_mut(path, visit);
        }
    }
}

impl<T: TextFields> TextFields for Vec<T> {
    fn visit_text_mut(&mut self, path: &str, visit: &mut dyn FnMut(&str, &mut String)) {
        for (i, item) in self.iter_mut().enumerate() {
            item.visit_text_mut(&format!("{path}[{i}]"), visit);
        }
    }
}

/// Numbers, booleans and nulls pass through untouched.
impl TextFields for Value {
    fn visit_text_mut(&mut self, path: &str, visit: &mut dyn FnMut(&str, &mut String)) {
        match self {
            Value::String(s) => visit(path, s),
            Value::Array(items) => {
                for (i, item) in items.iter_mut().enumerate() {
                    item.visit_text_mut(&format!("{path}[{i}]"), visit);
                }
            }
            Value::Object(map) => {
                for (key, item) in map.iter_mut() {
                    item.visit_text_mut(&child_path(path, key), visit);
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }
}
