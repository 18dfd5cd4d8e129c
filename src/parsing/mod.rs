//! Statement markup parsing
//!
//! This module turns pre-parsed statement markup into compiled templates:
//! the escaping-aware token scanner, the markup input structure, and the
//! script builder with its static/dynamic classification.

pub mod markup;
pub mod script;
pub mod token;

pub use markup::MarkupNode;
pub use script::{compile, NodeBuilder, ScriptBuilder, ScriptConfig};
pub use token::{TokenHandler, TokenScanner};
