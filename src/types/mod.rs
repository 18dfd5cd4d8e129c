//! Value types shared across the templating engine

pub mod value;

pub use value::Value;
