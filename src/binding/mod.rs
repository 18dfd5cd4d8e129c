//! Parameter binding: placeholder extraction, mapping descriptors,
//! compiled sources and name resolution

pub mod bound;
pub mod builder;
pub mod mapping;
pub mod params;
pub mod source;

pub use bound::BoundSql;
pub use builder::{BuiltSql, SqlSourceBuilder};
pub use mapping::{ConverterRegistry, ParameterMapping, ParameterMode};
pub use params::{ParamKind, ParamNameResolver, ParamSignature, ParamSpec};
pub use source::{SqlSource, StatementTemplate};
