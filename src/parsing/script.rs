//! Script compilation
//!
//! `ScriptBuilder` turns pre-parsed statement markup into a `SqlNode`
//! tree, classifying the template as static or dynamic along the way.
//! Element tags dispatch through a registration table, so embedders can
//! add their own tags without touching the tree evaluator.

use super::markup::MarkupNode;
use super::token::TokenScanner;
use crate::binding::builder::SqlSourceBuilder;
use crate::binding::mapping::ConverterRegistry;
use crate::binding::source::StatementTemplate;
use crate::context::DynamicContext;
use crate::error::{Error, Result};
use crate::eval::{SimpleEvaluator, ValueAccess};
use crate::nodes::{ForeachSpec, SqlNode, TrimSpec};
use crate::types::Value;
use std::collections::HashMap;

/// Compiler configuration shared by all statements of one setup
#[derive(Debug, Clone, Default)]
pub struct ScriptConfig {
    /// Declared type → converter key lookups for placeholder extraction
    pub converters: ConverterRegistry,
    /// Collapse whitespace runs in static statement text
    pub shrink_whitespace: bool,
}

/// Compile statement markup into a reusable template. Static markup is
/// rendered and has its placeholders extracted immediately; dynamic
/// markup defers both to each bind call.
pub fn compile(
    id: &str,
    markup: &MarkupNode,
    parameter_type: Option<&str>,
    config: &ScriptConfig,
) -> Result<StatementTemplate> {
    let (root, dynamic) = ScriptBuilder::new(id, config).build(markup)?;
    if dynamic {
        return Ok(StatementTemplate::new_dynamic(
            id,
            parameter_type,
            root,
            config.converters.clone(),
        ));
    }
    // A purely static tree cannot consult arguments, so it renders the
    // same text on every call; extract once here and reuse.
    let arguments = Value::Null;
    let mut ctx = DynamicContext::new(id, &arguments, &ValueAccess);
    root.apply(&mut ctx, &SimpleEvaluator)?;
    let built = SqlSourceBuilder::new(id, &config.converters).parse(&ctx.sql())?;
    Ok(StatementTemplate::new_static(id, parameter_type, built))
}

/// Builds one element (or text) node of markup into a `SqlNode`
pub type NodeBuilder =
    fn(&mut ScriptBuilder<'_>, &HashMap<String, String>, &[MarkupNode]) -> Result<SqlNode>;

pub struct ScriptBuilder<'a> {
    statement: &'a str,
    config: &'a ScriptConfig,
    handlers: HashMap<String, NodeBuilder>,
    dynamic: bool,
}

impl<'a> ScriptBuilder<'a> {
    pub fn new(statement: &'a str, config: &'a ScriptConfig) -> Self {
        let mut builder = Self {
            statement,
            config,
            handlers: HashMap::new(),
            dynamic: false,
        };
        builder.register("trim", build_trim);
        builder.register("where", build_where);
        builder.register("set", build_set);
        builder.register("foreach", build_foreach);
        builder.register("if", build_if);
        builder.register("choose", build_choose);
        builder.register("when", build_if);
        builder.register("otherwise", build_otherwise);
        builder.register("bind", build_bind);
        builder
    }

    /// Register a tag handler. Built-in tags can be overridden.
    pub fn register(&mut self, tag: impl Into<String>, handler: NodeBuilder) {
        self.handlers.insert(tag.into(), handler);
    }

    /// Parse the markup root, returning the node tree and whether the
    /// template is dynamic.
    pub fn build(mut self, markup: &MarkupNode) -> Result<(SqlNode, bool)> {
        let root = match markup {
            MarkupNode::Element { children, .. } => self.parse_children(children)?,
            text @ MarkupNode::Text(_) => self.parse_children(std::slice::from_ref(text))?,
        };
        Ok((root, self.dynamic))
    }

    fn parse_children(&mut self, children: &[MarkupNode]) -> Result<SqlNode> {
        let mut contents = Vec::new();
        for child in children {
            match child {
                MarkupNode::Text(body) => {
                    let body = body.trim();
                    if body.is_empty() {
                        continue;
                    }
                    let body = if self.config.shrink_whitespace {
                        shrink_whitespace(body)
                    } else {
                        body.to_string()
                    };
                    if contains_substitution(&body) {
                        self.dynamic = true;
                        contents.push(SqlNode::Text(body));
                    } else {
                        contents.push(SqlNode::StaticText(body));
                    }
                }
                MarkupNode::Element {
                    tag,
                    attributes,
                    children,
                } => {
                    let handler = self.handlers.get(tag.as_str()).copied().ok_or_else(|| {
                        Error::UnknownElement {
                            statement: self.statement.to_string(),
                            element: tag.clone(),
                        }
                    })?;
                    let node = handler(self, attributes, children)?;
                    self.dynamic = true;
                    contents.push(node);
                }
            }
        }
        Ok(SqlNode::Mixed(contents))
    }

    fn require_attr(
        &self,
        element: &str,
        attributes: &HashMap<String, String>,
        name: &str,
    ) -> Result<String> {
        attributes
            .get(name)
            .cloned()
            .ok_or_else(|| Error::MissingAttribute {
                statement: self.statement.to_string(),
                element: element.to_string(),
                attribute: name.to_string(),
            })
    }
}

fn build_if(
    builder: &mut ScriptBuilder<'_>,
    attributes: &HashMap<String, String>,
    children: &[MarkupNode],
) -> Result<SqlNode> {
    let test = builder.require_attr("if", attributes, "test")?;
    let body = builder.parse_children(children)?;
    Ok(SqlNode::If {
        test,
        body: Box::new(body),
    })
}

fn build_where(
    builder: &mut ScriptBuilder<'_>,
    _attributes: &HashMap<String, String>,
    children: &[MarkupNode],
) -> Result<SqlNode> {
    Ok(SqlNode::Where(Box::new(builder.parse_children(children)?)))
}

fn build_set(
    builder: &mut ScriptBuilder<'_>,
    _attributes: &HashMap<String, String>,
    children: &[MarkupNode],
) -> Result<SqlNode> {
    Ok(SqlNode::Set(Box::new(builder.parse_children(children)?)))
}

fn build_trim(
    builder: &mut ScriptBuilder<'_>,
    attributes: &HashMap<String, String>,
    children: &[MarkupNode],
) -> Result<SqlNode> {
    let body = builder.parse_children(children)?;
    let spec = TrimSpec {
        prefix: attributes.get("prefix").cloned(),
        prefix_overrides: attributes
            .get("prefixOverrides")
            .map(|raw| TrimSpec::parse_overrides(raw))
            .unwrap_or_default(),
        suffix: attributes.get("suffix").cloned(),
        suffix_overrides: attributes
            .get("suffixOverrides")
            .map(|raw| TrimSpec::parse_overrides(raw))
            .unwrap_or_default(),
    };
    Ok(SqlNode::Trim {
        body: Box::new(body),
        spec,
    })
}

fn build_foreach(
    builder: &mut ScriptBuilder<'_>,
    attributes: &HashMap<String, String>,
    children: &[MarkupNode],
) -> Result<SqlNode> {
    let collection = builder.require_attr("foreach", attributes, "collection")?;
    let body = builder.parse_children(children)?;
    let spec = ForeachSpec {
        collection,
        item: attributes.get("item").cloned(),
        index: attributes.get("index").cloned(),
        open: attributes.get("open").cloned(),
        close: attributes.get("close").cloned(),
        separator: attributes.get("separator").cloned(),
    };
    Ok(SqlNode::Foreach {
        body: Box::new(body),
        spec,
    })
}

fn build_choose(
    builder: &mut ScriptBuilder<'_>,
    _attributes: &HashMap<String, String>,
    children: &[MarkupNode],
) -> Result<SqlNode> {
    let mut whens = Vec::new();
    let mut otherwise = None;
    for child in children {
        match child {
            MarkupNode::Element {
                tag,
                attributes,
                children,
            } if tag == "when" => {
                let test = builder.require_attr("when", attributes, "test")?;
                whens.push((test, builder.parse_children(children)?));
            }
            MarkupNode::Element { tag, children, .. } if tag == "otherwise" => {
                if otherwise.is_some() {
                    return Err(Error::TooManyDefaults(builder.statement.to_string()));
                }
                otherwise = Some(Box::new(builder.parse_children(children)?));
            }
            MarkupNode::Element { tag, .. } => {
                return Err(Error::UnknownElement {
                    statement: builder.statement.to_string(),
                    element: tag.clone(),
                });
            }
            // Stray text between branches carries no meaning
            MarkupNode::Text(_) => {}
        }
    }
    Ok(SqlNode::Choose { whens, otherwise })
}

fn build_otherwise(
    builder: &mut ScriptBuilder<'_>,
    _attributes: &HashMap<String, String>,
    children: &[MarkupNode],
) -> Result<SqlNode> {
    builder.parse_children(children)
}

fn build_bind(
    builder: &mut ScriptBuilder<'_>,
    attributes: &HashMap<String, String>,
    _children: &[MarkupNode],
) -> Result<SqlNode> {
    let name = builder.require_attr("bind", attributes, "name")?;
    let expression = builder.require_attr("bind", attributes, "value")?;
    Ok(SqlNode::Bind { name, expression })
}

/// True if the text contains an unescaped `${}` token
fn contains_substitution(text: &str) -> bool {
    let scanner = TokenScanner::new("${", "}");
    let mut found = false;
    let scanned = scanner.scan(text, &mut |_: &str| {
        found = true;
        Ok(String::new())
    });
    debug_assert!(scanned.is_ok());
    found
}

fn shrink_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
