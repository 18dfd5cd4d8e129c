//! Placeholder extraction pass
//!
//! A second scanner pass over evaluated statement text: every `#{...}`
//! token becomes one positional `?` marker, and one parameter mapping is
//! appended in left-to-right order. The enclosed expression is a
//! property path optionally followed by `key=value` attributes.

use super::mapping::{ConverterRegistry, ParameterMapping, ParameterMode};
use crate::error::{Error, Result};
use crate::parsing::token::TokenScanner;

/// Output of the extraction pass
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltSql {
    pub sql: String,
    pub mappings: Vec<ParameterMapping>,
}

/// Converts placeholder tokens into positional markers plus an ordered
/// parameter-mapping list.
pub struct SqlSourceBuilder<'a> {
    statement: &'a str,
    converters: &'a ConverterRegistry,
}

impl<'a> SqlSourceBuilder<'a> {
    pub fn new(statement: &'a str, converters: &'a ConverterRegistry) -> Self {
        Self {
            statement,
            converters,
        }
    }

    pub fn parse(&self, sql: &str) -> Result<BuiltSql> {
        let scanner = TokenScanner::new("#{", "}");
        let mut mappings = Vec::new();
        let sql = scanner.scan(sql, &mut |expression: &str| {
            mappings.push(self.build_mapping(expression)?);
            Ok("?".to_string())
        })?;
        Ok(BuiltSql { sql, mappings })
    }

    fn build_mapping(&self, expression: &str) -> Result<ParameterMapping> {
        let malformed = || Error::MalformedPlaceholder {
            statement: self.statement.to_string(),
            expression: expression.to_string(),
        };
        let mut parts = expression.split(',');
        let property = parts.next().unwrap_or("").trim();
        if property.is_empty() {
            return Err(malformed());
        }
        let mut mapping = ParameterMapping::new(property);
        for part in parts {
            let (key, value) = part.split_once('=').ok_or_else(malformed)?;
            let value = value.trim();
            match key.trim() {
                "type" => mapping.declared_type = Some(value.to_string()),
                "converter" => mapping.converter = Some(value.to_string()),
                "mode" => {
                    mapping.mode = ParameterMode::parse(value).ok_or_else(malformed)?;
                }
                "scale" => {
                    mapping.scale = Some(value.parse().map_err(|_| malformed())?);
                }
                other => {
                    return Err(Error::UnknownAttribute {
                        statement: self.statement.to_string(),
                        attribute: other.to_string(),
                    });
                }
            }
        }
        if mapping.converter.is_none() {
            if let Some(declared) = &mapping.declared_type {
                mapping.converter = self.converters.converter_for(declared).map(str::to_string);
            }
        }
        Ok(mapping)
    }
}
