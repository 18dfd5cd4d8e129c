//! Per-call evaluation state
//!
//! A `DynamicContext` is created for every bind call and discarded with
//! it: the SQL text buffer the node tree appends into, the additional
//! bindings layered over the argument object, and a monotonic counter
//! for call-unique loop variable names. It is an explicit value threaded
//! through the evaluation call graph, never shared across calls.

use crate::eval::{Bindings, PropertyAccess};
use crate::types::Value;
use std::collections::HashMap;

/// Binding name under which the whole argument object is reachable
pub const PARAMETER_KEY: &str = "_parameter";

pub struct DynamicContext<'a> {
    statement: &'a str,
    parameter: &'a Value,
    access: &'a dyn PropertyAccess,
    bindings: HashMap<String, Value>,
    sql: String,
    unique: u32,
}

impl<'a> DynamicContext<'a> {
    pub fn new(statement: &'a str, parameter: &'a Value, access: &'a dyn PropertyAccess) -> Self {
        Self {
            statement,
            parameter,
            access,
            bindings: HashMap::new(),
            sql: String::new(),
            unique: 0,
        }
    }

    /// Statement id, for error attribution
    pub fn statement(&self) -> &str {
        self.statement
    }

    pub fn parameter(&self) -> &Value {
        self.parameter
    }

    /// Append a fragment to the SQL buffer. Fragments are joined with a
    /// single space; empty fragments are dropped.
    pub fn append(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        if !self.sql.is_empty() {
            self.sql.push(' ');
        }
        self.sql.push_str(fragment);
    }

    /// The accumulated SQL text, with outer whitespace trimmed
    pub fn sql(&self) -> String {
        self.sql.trim().to_string()
    }

    /// Swap the text buffer, returning the previous contents. Trim and
    /// foreach evaluate children into a scratch buffer this way while
    /// keeping one bindings table.
    pub fn swap_buffer(&mut self, replacement: String) -> String {
        std::mem::replace(&mut self.sql, replacement)
    }

    /// Store an additional binding, visible to everything evaluated after
    /// this point and carried onto the bound statement.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Next value of the per-call uniqueness counter
    pub fn next_unique(&mut self) -> u32 {
        let n = self.unique;
        self.unique += 1;
        n
    }

    /// The additional bindings accumulated so far
    pub fn bindings(&self) -> &HashMap<String, Value> {
        &self.bindings
    }

    pub fn into_bindings(self) -> HashMap<String, Value> {
        self.bindings
    }
}

impl Bindings for DynamicContext<'_> {
    /// Resolution order: exact additional-binding name, then a binding
    /// whose name is the path's first segment (descending the remainder),
    /// then the `_parameter` alias, then the argument object itself.
    fn resolve(&self, path: &str) -> Option<Value> {
        if let Some(value) = self.bindings.get(path) {
            return Some(value.clone());
        }
        if path == PARAMETER_KEY {
            return Some(self.parameter.clone());
        }
        let head_len = path.find(['.', '[']).unwrap_or(path.len());
        if head_len < path.len() {
            let (head, rest) = path.split_at(head_len);
            let rest = rest.strip_prefix('.').unwrap_or(rest);
            if let Some(root) = self.bindings.get(head) {
                return self.access.get_property(root, rest);
            }
            if head == PARAMETER_KEY {
                return self.access.get_property(self.parameter, rest);
            }
        }
        self.access.get_property(self.parameter, path)
    }
}
