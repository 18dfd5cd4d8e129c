//! Parameter name resolution
//!
//! Maps a call signature's parameter list to named bindings. Two
//! parameter kinds are recognized as non-bindable (pagination bounds and
//! the row-streaming handler, both consumed by the execution layer) and
//! skipped; the rest are named by explicit declaration, recovered source
//! name, or position.

use crate::types::Value;
use std::collections::{BTreeMap, HashMap};

const GENERIC_NAME_PREFIX: &str = "param";

/// What a signature parameter is to the binding layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Carries a value to bind
    Bindable,
    /// Pagination bounds, consumed by the executor
    PageBounds,
    /// Result-streaming handler, consumed by the executor
    RowHandler,
}

/// One parameter of a call signature
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Explicitly declared binding name, if any
    pub explicit_name: Option<String>,
    /// Source-level parameter name, if recoverable
    pub source_name: Option<String>,
    pub kind: ParamKind,
}

impl ParamSpec {
    /// An unnamed bindable parameter
    pub fn bindable() -> Self {
        Self {
            explicit_name: None,
            source_name: None,
            kind: ParamKind::Bindable,
        }
    }

    /// A bindable parameter with an explicit declared name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            explicit_name: Some(name.into()),
            ..Self::bindable()
        }
    }

    /// A bindable parameter with a recoverable source name
    pub fn with_source_name(name: impl Into<String>) -> Self {
        Self {
            source_name: Some(name.into()),
            ..Self::bindable()
        }
    }

    pub fn page_bounds() -> Self {
        Self {
            explicit_name: None,
            source_name: None,
            kind: ParamKind::PageBounds,
        }
    }

    pub fn row_handler() -> Self {
        Self {
            explicit_name: None,
            source_name: None,
            kind: ParamKind::RowHandler,
        }
    }
}

/// A call signature's parameter list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSignature {
    pub params: Vec<ParamSpec>,
}

impl ParamSignature {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self { params }
    }
}

/// Ordered index→name table for one signature, immutable once resolved
#[derive(Debug, Clone)]
pub struct ParamNameResolver {
    names: BTreeMap<usize, String>,
    has_explicit_name: bool,
}

impl ParamNameResolver {
    /// Resolve names for a signature. `use_source_names` enables falling
    /// back to recovered source-level names before positional ones.
    pub fn new(signature: &ParamSignature, use_source_names: bool) -> Self {
        let mut names = BTreeMap::new();
        let mut has_explicit_name = false;
        for (index, param) in signature.params.iter().enumerate() {
            if param.kind != ParamKind::Bindable {
                continue;
            }
            let name = match &param.explicit_name {
                Some(explicit) => {
                    has_explicit_name = true;
                    explicit.clone()
                }
                None => match (use_source_names, &param.source_name) {
                    (true, Some(source)) => source.clone(),
                    // Positional fallback counts resolved names, not raw
                    // indices, so skipped parameters do not leave gaps.
                    _ => names.len().to_string(),
                },
            };
            names.insert(index, name);
        }
        Self {
            names,
            has_explicit_name,
        }
    }

    /// Resolved names in parameter order
    pub fn names(&self) -> Vec<&str> {
        self.names.values().map(String::as_str).collect()
    }

    /// Index→name pairs in parameter order
    pub fn table(&self) -> &BTreeMap<usize, String> {
        &self.names
    }

    /// Build the bound argument for a call. A single resolvable parameter
    /// with no explicit name is returned unwrapped; otherwise a map of
    /// resolved names plus `param1`, `param2`, ... generic aliases, where
    /// a resolved name always wins over a colliding alias.
    pub fn named_params(&self, args: &[Value]) -> Option<Value> {
        if args.is_empty() || self.names.is_empty() {
            return None;
        }
        if !self.has_explicit_name && self.names.len() == 1 {
            let index = self.names.keys().next().copied()?;
            return Some(args.get(index).cloned().unwrap_or(Value::Null));
        }
        let mut params = HashMap::new();
        for (position, (index, name)) in self.names.iter().enumerate() {
            let value = args.get(*index).cloned().unwrap_or(Value::Null);
            params.insert(name.clone(), value.clone());
            let generic = format!("{}{}", GENERIC_NAME_PREFIX, position + 1);
            if !self.names.values().any(|n| *n == generic) {
                params.insert(generic, value);
            }
        }
        Some(Value::Map(params))
    }
}
