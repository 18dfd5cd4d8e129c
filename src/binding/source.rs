//! Compiled statement sources
//!
//! A `StatementTemplate` is built once at configuration load and shared
//! read-only across calls. Static templates carry their final text and
//! mappings; dynamic templates re-evaluate the node tree and re-run the
//! placeholder pass on every bind.

use super::bound::BoundSql;
use super::builder::{BuiltSql, SqlSourceBuilder};
use super::mapping::{ConverterRegistry, ParameterMapping};
use crate::context::DynamicContext;
use crate::error::Result;
use crate::eval::{ExpressionEvaluator, PropertyAccess};
use crate::nodes::SqlNode;
use crate::types::Value;
use std::collections::HashMap;

/// Producer of the final bound statement
#[derive(Debug, Clone, PartialEq)]
pub enum SqlSource {
    /// Text and mappings fixed at build time
    Static {
        sql: String,
        mappings: Vec<ParameterMapping>,
    },
    /// Tree evaluation and placeholder extraction deferred to each call
    Dynamic {
        root: SqlNode,
        converters: ConverterRegistry,
    },
}

/// An immutable compiled statement, shared across concurrent callers
#[derive(Debug, Clone, PartialEq)]
pub struct StatementTemplate {
    pub id: String,
    /// Declared argument type, if the statement declares one
    pub parameter_type: Option<String>,
    source: SqlSource,
}

impl StatementTemplate {
    pub fn new_static(id: impl Into<String>, parameter_type: Option<&str>, built: BuiltSql) -> Self {
        Self {
            id: id.into(),
            parameter_type: parameter_type.map(str::to_string),
            source: SqlSource::Static {
                sql: built.sql,
                mappings: built.mappings,
            },
        }
    }

    pub fn new_dynamic(
        id: impl Into<String>,
        parameter_type: Option<&str>,
        root: SqlNode,
        converters: ConverterRegistry,
    ) -> Self {
        Self {
            id: id.into(),
            parameter_type: parameter_type.map(str::to_string),
            source: SqlSource::Dynamic { root, converters },
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.source, SqlSource::Dynamic { .. })
    }

    pub fn source(&self) -> &SqlSource {
        &self.source
    }

    /// Produce the bound statement for one call's arguments
    pub fn bind(
        &self,
        arguments: &Value,
        eval: &dyn ExpressionEvaluator,
        access: &dyn PropertyAccess,
    ) -> Result<BoundSql> {
        match &self.source {
            SqlSource::Static { sql, mappings } => Ok(BoundSql {
                statement: self.id.clone(),
                sql: sql.clone(),
                parameter_mappings: mappings.clone(),
                additional_bindings: HashMap::new(),
            }),
            SqlSource::Dynamic { root, converters } => {
                let mut ctx = DynamicContext::new(&self.id, arguments, access);
                root.apply(&mut ctx, eval)?;
                let rendered = ctx.sql();
                let built = SqlSourceBuilder::new(&self.id, converters).parse(&rendered)?;
                Ok(BoundSql {
                    statement: self.id.clone(),
                    sql: built.sql,
                    parameter_mappings: built.mappings,
                    additional_bindings: ctx.into_bindings(),
                })
            }
        }
    }
}
