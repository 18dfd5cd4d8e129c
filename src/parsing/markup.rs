//! Pre-parsed statement markup
//!
//! The compiler consumes an already-parsed markup tree; decoding raw
//! bytes into it is the loader's concern. Text nodes carry statement
//! text (possibly containing `#{}` / `${}` tokens), element nodes carry
//! a tag, attributes and children.

use std::collections::HashMap;

/// One node of statement markup
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Text(String),
    Element {
        tag: String,
        attributes: HashMap<String, String>,
        children: Vec<MarkupNode>,
    },
}

impl MarkupNode {
    /// Create a text node
    pub fn text(body: impl Into<String>) -> Self {
        MarkupNode::Text(body.into())
    }

    /// Create an element node
    pub fn element(
        tag: impl Into<String>,
        attributes: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
        children: Vec<MarkupNode>,
    ) -> Self {
        MarkupNode::Element {
            tag: tag.into(),
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            children,
        }
    }

    /// Look up an attribute on an element node
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match self {
            MarkupNode::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            MarkupNode::Text(_) => None,
        }
    }

    /// The element tag, if this is an element node
    pub fn tag(&self) -> Option<&str> {
        match self {
            MarkupNode::Element { tag, .. } => Some(tag.as_str()),
            MarkupNode::Text(_) => None,
        }
    }
}
