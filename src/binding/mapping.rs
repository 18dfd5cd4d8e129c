//! Parameter mapping descriptors and converter selection
//!
//! A `ParameterMapping` links one positional marker in the final SQL
//! text to the property path that supplies its value, together with the
//! declared type and converter key the execution layer will use.
//! Selecting a converter is in scope here; running it is not.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Direction of a bound parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParameterMode {
    #[default]
    In,
    Out,
    InOut,
}

impl ParameterMode {
    /// Parse a markup attribute value, case-insensitive
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "in" => Some(ParameterMode::In),
            "out" => Some(ParameterMode::Out),
            "inout" => Some(ParameterMode::InOut),
            _ => None,
        }
    }
}

/// Descriptor for one positional parameter, in placeholder order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterMapping {
    /// Property path resolved at bind time
    pub property: String,
    /// Declared type from the `type=` attribute, if any
    pub declared_type: Option<String>,
    /// Converter key: explicit `converter=` attribute or registry lookup
    pub converter: Option<String>,
    pub mode: ParameterMode,
    /// Numeric scale from the `scale=` attribute, if any
    pub scale: Option<u32>,
}

impl ParameterMapping {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            declared_type: None,
            converter: None,
            mode: ParameterMode::In,
            scale: None,
        }
    }
}

/// Registry mapping declared types to converter keys. Consulted when a
/// placeholder names a type but no explicit converter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConverterRegistry {
    by_type: HashMap<String, String>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, declared_type: impl Into<String>, converter: impl Into<String>) {
        self.by_type.insert(declared_type.into(), converter.into());
    }

    pub fn converter_for(&self, declared_type: &str) -> Option<&str> {
        self.by_type.get(declared_type).map(String::as_str)
    }
}
