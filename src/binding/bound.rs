//! Bound statements
//!
//! The final product of a bind call: SQL text with positional markers,
//! the ordered parameter mappings, and the additional named bindings
//! produced during dynamic evaluation (foreach items, bind variables).
//! Owned by one call, never shared.

use super::mapping::{ParameterMapping, ParameterMode};
use crate::error::{Error, Result};
use crate::eval::PropertyAccess;
use crate::types::Value;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundSql {
    /// Statement id this was bound for, carried for error attribution
    pub statement: String,
    /// Final SQL text with one `?` per parameter mapping
    pub sql: String,
    /// Descriptors in marker order
    pub parameter_mappings: Vec<ParameterMapping>,
    /// Named values produced during evaluation, absent from the argument
    /// object but resolvable at bind time
    pub additional_bindings: HashMap<String, Value>,
}

impl BoundSql {
    pub fn set_additional_binding(&mut self, name: impl Into<String>, value: Value) {
        self.additional_bindings.insert(name.into(), value);
    }

    /// Resolve every input-mode mapping to its value, in marker order.
    /// Resolution tries the additional bindings first (exact name, then
    /// the path's first segment), then the argument object; a scalar
    /// argument that cannot be decomposed resolves to itself.
    pub fn parameter_values(
        &self,
        arguments: &Value,
        access: &dyn PropertyAccess,
    ) -> Result<Vec<Value>> {
        self.parameter_mappings
            .iter()
            .filter(|m| m.mode != ParameterMode::Out)
            .map(|m| self.resolve_parameter(&m.property, arguments, access))
            .collect()
    }

    fn resolve_parameter(
        &self,
        property: &str,
        arguments: &Value,
        access: &dyn PropertyAccess,
    ) -> Result<Value> {
        if let Some(value) = self.additional_bindings.get(property) {
            return Ok(value.clone());
        }
        let head_len = property.find(['.', '[']).unwrap_or(property.len());
        if head_len < property.len() {
            let (head, rest) = property.split_at(head_len);
            let rest = rest.strip_prefix('.').unwrap_or(rest);
            if let Some(root) = self.additional_bindings.get(head) {
                return access.get_property(root, rest).ok_or_else(|| {
                    Error::PropertyNotFound {
                        statement: self.statement.clone(),
                        property: property.to_string(),
                    }
                });
            }
        }
        if property == crate::context::PARAMETER_KEY {
            return Ok(arguments.clone());
        }
        match arguments {
            // Structured arguments resolve by property lookup
            Value::Map(_) | Value::List(_) => {
                access
                    .get_property(arguments, property)
                    .ok_or_else(|| Error::PropertyNotFound {
                        statement: self.statement.clone(),
                        property: property.to_string(),
                    })
            }
            // A non-decomposable argument is the value itself
            scalar => Ok(scalar.clone()),
        }
    }
}
