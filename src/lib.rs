//! A dynamic SQL statement templating and binding engine
//!
//! This crate compiles statement templates — trees of literal text,
//! conditionals, loops and placeholder tokens — into concrete SQL text
//! plus an ordered list of bind-parameter descriptors, evaluated fresh
//! against a runtime argument set on every call:
//! - Templates are immutable after build and shared across callers
//! - Per-call state lives in an explicit context value, never shared
//! - Expression evaluation and property access are capability traits,
//!   so any bindings-aware engine can drive the tree
//!
//! Statement execution, result mapping and connection handling are the
//! embedding system's concern; this crate stops at the bound statement.

mod binding;
mod cache;
mod context;
mod error;
mod eval;
mod nodes;
mod parsing;
mod types;

pub use binding::{
    BoundSql, BuiltSql, ConverterRegistry, ParamKind, ParamNameResolver, ParamSignature,
    ParamSpec, ParameterMapping, ParameterMode, SqlSource, SqlSourceBuilder, StatementTemplate,
};
pub use cache::CachingCompiler;
pub use context::DynamicContext;
pub use error::{Error, Result};
pub use eval::{Bindings, ExpressionEvaluator, PropertyAccess, SimpleEvaluator, ValueAccess};
pub use nodes::{ForeachSpec, SqlNode, TrimSpec};
pub use parsing::{compile, MarkupNode, NodeBuilder, ScriptBuilder, ScriptConfig};
pub use parsing::{TokenHandler, TokenScanner};
pub use types::Value;
