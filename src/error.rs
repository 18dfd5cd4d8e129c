//! Error types for the templating engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Build-time errors (block template registration)
    #[error("Unknown element <{element}> in statement '{statement}'")]
    UnknownElement { statement: String, element: String },

    #[error("Too many default (otherwise) branches in choose element of statement '{0}'")]
    TooManyDefaults(String),

    #[error("Malformed placeholder expression '{expression}' in statement '{statement}'")]
    MalformedPlaceholder {
        statement: String,
        expression: String,
    },

    #[error("Unknown placeholder attribute '{attribute}' in statement '{statement}'")]
    UnknownAttribute {
        statement: String,
        attribute: String,
    },

    #[error("Missing required attribute '{attribute}' on <{element}> in statement '{statement}'")]
    MissingAttribute {
        statement: String,
        element: String,
        attribute: String,
    },

    // Bind-time errors (fatal for the current call only)
    #[error("No binding named '{name}' while rendering statement '{statement}'")]
    MissingBinding { statement: String, name: String },

    #[error("Foreach collection '{expression}' in statement '{statement}' is null or not iterable")]
    NotIterable {
        statement: String,
        expression: String,
    },

    #[error("Property '{property}' not found on argument to statement '{statement}'")]
    PropertyNotFound {
        statement: String,
        property: String,
    },

    #[error("Expression error in statement '{statement}': {message}")]
    Expression { statement: String, message: String },

    // Value errors
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
}

impl Error {
    /// Attach a statement id to errors raised below the template layer,
    /// which does not know which statement it is serving.
    pub(crate) fn in_statement(self, id: &str) -> Self {
        match self {
            Error::Expression { message, statement } if statement.is_empty() => Error::Expression {
                statement: id.to_string(),
                message,
            },
            other => other,
        }
    }
}
