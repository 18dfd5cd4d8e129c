//! Statement node tree
//!
//! A compiled template is a tree of `SqlNode` values. Every node
//! evaluates against the per-call `DynamicContext`, appending text
//! and/or mutating bindings, and reports whether it produced non-empty
//! content. The tree is immutable after build and shared across calls.

use crate::context::DynamicContext;
use crate::error::{Error, Result};
use crate::eval::{Bindings, ExpressionEvaluator};
use crate::parsing::token::TokenScanner;
use crate::types::Value;

/// Prefix for call-unique loop variable names injected by foreach
pub const ITEM_PREFIX: &str = "__frch_";

/// Prefix/suffix trimming configuration. Override candidates are matched
/// case-insensitively, first match wins, at most one removed per side.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrimSpec {
    pub prefix: Option<String>,
    pub prefix_overrides: Vec<String>,
    pub suffix: Option<String>,
    pub suffix_overrides: Vec<String>,
}

impl TrimSpec {
    /// Split a pipe-delimited override list as written in markup
    pub fn parse_overrides(raw: &str) -> Vec<String> {
        raw.split('|').map(str::to_string).collect()
    }

    fn for_where() -> Self {
        Self {
            prefix: Some("WHERE".to_string()),
            prefix_overrides: ["AND ", "OR ", "AND\n", "OR\n", "AND\r", "OR\r", "AND\t", "OR\t"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            suffix: None,
            suffix_overrides: Vec::new(),
        }
    }

    fn for_set() -> Self {
        Self {
            prefix: Some("SET".to_string()),
            prefix_overrides: vec![",".to_string()],
            suffix: None,
            suffix_overrides: vec![",".to_string()],
        }
    }
}

/// Iteration configuration for foreach nodes
#[derive(Debug, Clone, PartialEq)]
pub struct ForeachSpec {
    pub collection: String,
    pub item: Option<String>,
    pub index: Option<String>,
    pub open: Option<String>,
    pub close: Option<String>,
    pub separator: Option<String>,
}

/// One node of a compiled statement template
#[derive(Debug, Clone, PartialEq)]
pub enum SqlNode {
    /// Ordered children; content flag is the logical OR of theirs
    Mixed(Vec<SqlNode>),
    /// Fixed statement text
    StaticText(String),
    /// Statement text containing `${}` substitution tokens
    Text(String),
    /// Conditional inclusion gated on a test expression
    If { test: String, body: Box<SqlNode> },
    /// First matching branch wins; at most one default
    Choose {
        whens: Vec<(String, SqlNode)>,
        otherwise: Option<Box<SqlNode>>,
    },
    /// WHERE clause: strips one leading AND/OR, prepends WHERE
    Where(Box<SqlNode>),
    /// SET clause: strips one stray comma, prepends SET
    Set(Box<SqlNode>),
    /// General prefix/suffix trimming
    Trim { body: Box<SqlNode>, spec: TrimSpec },
    /// Iteration with collision-safe variable injection
    Foreach {
        body: Box<SqlNode>,
        spec: ForeachSpec,
    },
    /// Evaluate an expression and store it under a name
    Bind { name: String, expression: String },
}

impl SqlNode {
    /// Evaluate this node against the call context
    pub fn apply(
        &self,
        ctx: &mut DynamicContext<'_>,
        eval: &dyn ExpressionEvaluator,
    ) -> Result<bool> {
        match self {
            SqlNode::Mixed(children) => {
                let mut produced = false;
                for child in children {
                    produced |= child.apply(ctx, eval)?;
                }
                Ok(produced)
            }

            SqlNode::StaticText(text) => {
                ctx.append(text);
                Ok(!text.trim().is_empty())
            }

            SqlNode::Text(text) => apply_substitution(ctx, text),

            SqlNode::If { test, body } => {
                let passed = eval
                    .evaluate_bool(test, &*ctx)
                    .map_err(|e| e.in_statement(ctx.statement()))?;
                if passed {
                    body.apply(ctx, eval)
                } else {
                    Ok(false)
                }
            }

            SqlNode::Choose { whens, otherwise } => {
                for (test, branch) in whens {
                    let passed = eval
                        .evaluate_bool(test, &*ctx)
                        .map_err(|e| e.in_statement(ctx.statement()))?;
                    if passed {
                        return branch.apply(ctx, eval);
                    }
                }
                match otherwise {
                    Some(branch) => branch.apply(ctx, eval),
                    None => Ok(false),
                }
            }

            SqlNode::Where(body) => apply_trim(ctx, eval, body, &TrimSpec::for_where()),

            SqlNode::Set(body) => apply_trim(ctx, eval, body, &TrimSpec::for_set()),

            SqlNode::Trim { body, spec } => apply_trim(ctx, eval, body, spec),

            SqlNode::Foreach { body, spec } => apply_foreach(ctx, eval, body, spec),

            SqlNode::Bind { name, expression } => {
                let value = eval
                    .evaluate_value(expression, &*ctx)
                    .map_err(|e| e.in_statement(ctx.statement()))?;
                ctx.bind(name.clone(), value);
                Ok(false)
            }
        }
    }
}

/// `${}` substitution: each token is replaced inline with the literal
/// rendering of the named binding. A missing binding fails the call.
fn apply_substitution(ctx: &mut DynamicContext<'_>, text: &str) -> Result<bool> {
    let scanner = TokenScanner::new("${", "}");
    let rendered = {
        let ctx_ref: &DynamicContext<'_> = ctx;
        scanner.scan(text, &mut |expression: &str| {
            let name = expression.trim();
            match ctx_ref.resolve(name) {
                Some(value) => Ok(value.to_string()),
                None => Err(Error::MissingBinding {
                    statement: ctx_ref.statement().to_string(),
                    name: name.to_string(),
                }),
            }
        })?
    };
    let produced = !rendered.trim().is_empty();
    ctx.append(&rendered);
    Ok(produced)
}

fn apply_trim(
    ctx: &mut DynamicContext<'_>,
    eval: &dyn ExpressionEvaluator,
    body: &SqlNode,
    spec: &TrimSpec,
) -> Result<bool> {
    let saved = ctx.swap_buffer(String::new());
    body.apply(ctx, eval)?;
    let fragment = ctx.swap_buffer(saved);

    let mut text = fragment.trim().to_string();
    if text.is_empty() {
        return Ok(false);
    }
    // Candidates compare on bytes: string slicing at the candidate's byte
    // length could split a multibyte character in the fragment.
    for candidate in &spec.prefix_overrides {
        if text.len() >= candidate.len()
            && text.as_bytes()[..candidate.len()].eq_ignore_ascii_case(candidate.as_bytes())
        {
            text.drain(..candidate.len());
            break;
        }
    }
    for candidate in &spec.suffix_overrides {
        if text.len() >= candidate.len()
            && text.as_bytes()[text.len() - candidate.len()..]
                .eq_ignore_ascii_case(candidate.as_bytes())
        {
            text.truncate(text.len() - candidate.len());
            break;
        }
    }
    // Override removal may have emptied the fragment; an empty body gets
    // no prefix or suffix at all.
    if text.trim().is_empty() {
        return Ok(false);
    }
    let mut result = String::new();
    if let Some(prefix) = &spec.prefix {
        result.push_str(prefix);
        result.push(' ');
    }
    result.push_str(text.trim());
    if let Some(suffix) = &spec.suffix {
        result.push(' ');
        result.push_str(suffix);
    }
    ctx.append(&result);
    Ok(true)
}

fn apply_foreach(
    ctx: &mut DynamicContext<'_>,
    eval: &dyn ExpressionEvaluator,
    body: &SqlNode,
    spec: &ForeachSpec,
) -> Result<bool> {
    let collection = eval
        .evaluate_value(&spec.collection, &*ctx)
        .map_err(|e| e.in_statement(ctx.statement()))?;
    let entries: Vec<(Value, Value)> = match collection {
        Value::List(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (Value::I64(i as i64), v))
            .collect(),
        Value::Map(map) => {
            // Deterministic iteration order for key/value collections
            let mut pairs: Vec<_> = map.into_iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            pairs
                .into_iter()
                .map(|(k, v)| (Value::Str(k), v))
                .collect()
        }
        _ => {
            return Err(Error::NotIterable {
                statement: ctx.statement().to_string(),
                expression: spec.collection.clone(),
            });
        }
    };
    if entries.is_empty() {
        return Ok(false);
    }

    let mut joined = String::new();
    if let Some(open) = &spec.open {
        joined.push_str(open);
    }
    for (i, (key, item_value)) in entries.into_iter().enumerate() {
        let unique = ctx.next_unique();
        if let Some(index_name) = &spec.index {
            ctx.bind(index_name.clone(), key.clone());
            ctx.bind(itemize(index_name, unique), key);
        }
        if let Some(item_name) = &spec.item {
            ctx.bind(item_name.clone(), item_value.clone());
            ctx.bind(itemize(item_name, unique), item_value);
        }
        let saved = ctx.swap_buffer(String::new());
        body.apply(ctx, eval)?;
        let fragment = ctx.swap_buffer(saved);
        let fragment = rewrite_item_tokens(
            fragment.trim(),
            spec.item.as_deref(),
            spec.index.as_deref(),
            unique,
        )?;
        if i > 0 {
            if let Some(separator) = &spec.separator {
                joined.push_str(separator);
            }
        }
        joined.push_str(&fragment);
    }
    if let Some(close) = &spec.close {
        joined.push_str(close);
    }
    ctx.append(&joined);
    Ok(true)
}

fn itemize(name: &str, unique: u32) -> String {
    format!("{}{}_{}", ITEM_PREFIX, name, unique)
}

/// Rewrite `#{item...}` / `#{index...}` placeholder heads inside one
/// iteration's output to the call-unique itemized names, so the later
/// placeholder pass resolves them against the injected bindings.
fn rewrite_item_tokens(
    fragment: &str,
    item: Option<&str>,
    index: Option<&str>,
    unique: u32,
) -> Result<String> {
    if item.is_none() && index.is_none() {
        return Ok(fragment.to_string());
    }
    let scanner = TokenScanner::new("#{", "}");
    scanner.scan(fragment, &mut |expression: &str| {
        let rewritten = item
            .and_then(|name| rewrite_head(expression, name, unique))
            .or_else(|| index.and_then(|name| rewrite_head(expression, name, unique)))
            .unwrap_or_else(|| expression.to_string());
        Ok(format!("#{{{}}}", rewritten))
    })
}

/// Replace a leading variable name in a placeholder expression, only at
/// a path/attribute boundary ('.', ',', ':', whitespace or end).
fn rewrite_head(expression: &str, name: &str, unique: u32) -> Option<String> {
    let trimmed = expression.trim_start();
    let lead = &expression[..expression.len() - trimmed.len()];
    let rest = trimmed.strip_prefix(name)?;
    let boundary = match rest.chars().next() {
        None => true,
        Some(c) => matches!(c, '.' | ',' | ':') || c.is_whitespace(),
    };
    if boundary {
        Some(format!("{}{}{}", lead, itemize(name, unique), rest))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{SimpleEvaluator, ValueAccess};
    use std::collections::HashMap;

    fn args(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<HashMap<_, _>>(),
        )
    }

    fn render(node: &SqlNode, arguments: &Value) -> Result<String> {
        let mut ctx = DynamicContext::new("test.stmt", arguments, &ValueAccess);
        node.apply(&mut ctx, &SimpleEvaluator)?;
        Ok(ctx.sql())
    }

    fn text(s: &str) -> SqlNode {
        SqlNode::StaticText(s.to_string())
    }

    #[test]
    fn test_where_strips_leading_and() {
        let node = SqlNode::Where(Box::new(text("AND a=1")));
        assert_eq!(render(&node, &Value::Null).unwrap(), "WHERE a=1");
    }

    #[test]
    fn test_where_strips_leading_or_case_insensitive() {
        let node = SqlNode::Where(Box::new(text("or a=1")));
        assert_eq!(render(&node, &Value::Null).unwrap(), "WHERE a=1");
    }

    #[test]
    fn test_where_empty_child_contributes_nothing() {
        let node = SqlNode::Where(Box::new(text("   ")));
        assert_eq!(render(&node, &Value::Null).unwrap(), "");
    }

    #[test]
    fn test_set_strips_trailing_comma() {
        let node = SqlNode::Set(Box::new(text("a=1,")));
        assert_eq!(render(&node, &Value::Null).unwrap(), "SET a=1");
    }

    #[test]
    fn test_where_keeps_multibyte_fragment_intact() {
        // The prefix candidates are longer than the fragment's first
        // character; matching must not split it.
        let node = SqlNode::Where(Box::new(text("néé = 1")));
        assert_eq!(render(&node, &Value::Null).unwrap(), "WHERE néé = 1");
    }

    #[test]
    fn test_set_strips_comma_after_multibyte_text() {
        let node = SqlNode::Set(Box::new(text("nom = 'bébé',")));
        assert_eq!(render(&node, &Value::Null).unwrap(), "SET nom = 'bébé'");
    }

    #[test]
    fn test_trim_override_emptying_fragment_suppresses_affixes() {
        let node = SqlNode::Trim {
            body: Box::new(text("AND ")),
            spec: TrimSpec {
                prefix: Some("WHERE".into()),
                prefix_overrides: TrimSpec::parse_overrides("AND|OR"),
                suffix: None,
                suffix_overrides: vec![],
            },
        };
        assert_eq!(render(&node, &Value::Null).unwrap(), "");
    }

    #[test]
    fn test_if_gates_on_test() {
        let node = SqlNode::If {
            test: "id != null".into(),
            body: Box::new(text("id = 1")),
        };
        assert_eq!(
            render(&node, &args(vec![("id", Value::I64(1))])).unwrap(),
            "id = 1"
        );
        assert_eq!(render(&node, &args(vec![])).unwrap(), "");
    }

    #[test]
    fn test_choose_first_match_wins() {
        let node = SqlNode::Choose {
            whens: vec![
                ("id != null".into(), text("by id")),
                ("true".into(), text("fallback when")),
            ],
            otherwise: Some(Box::new(text("all"))),
        };
        assert_eq!(
            render(&node, &args(vec![("id", Value::I64(1))])).unwrap(),
            "by id"
        );
        assert_eq!(render(&node, &args(vec![])).unwrap(), "fallback when");
    }

    #[test]
    fn test_choose_without_match_or_default_is_noop() {
        let node = SqlNode::Choose {
            whens: vec![("id != null".into(), text("by id"))],
            otherwise: None,
        };
        assert_eq!(render(&node, &args(vec![])).unwrap(), "");
    }

    #[test]
    fn test_substitution_inlines_binding() {
        let node = SqlNode::Text("order by ${col}".into());
        assert_eq!(
            render(&node, &args(vec![("col", Value::Str("name".into()))])).unwrap(),
            "order by name"
        );
    }

    #[test]
    fn test_substitution_missing_binding_fails() {
        let node = SqlNode::Text("order by ${col}".into());
        let err = render(&node, &args(vec![])).unwrap_err();
        assert_eq!(
            err,
            Error::MissingBinding {
                statement: "test.stmt".into(),
                name: "col".into(),
            }
        );
    }

    #[test]
    fn test_bind_is_lexically_scoped() {
        let node = SqlNode::Mixed(vec![
            SqlNode::Bind {
                name: "pattern".into(),
                expression: "'%joe%'".into(),
            },
            SqlNode::Text("name like ${pattern}".into()),
        ]);
        assert_eq!(render(&node, &args(vec![])).unwrap(), "name like %joe%");
    }

    #[test]
    fn test_foreach_joins_and_itemizes() {
        let node = SqlNode::Foreach {
            body: Box::new(text("#{x}")),
            spec: ForeachSpec {
                collection: "ids".into(),
                item: Some("x".into()),
                index: None,
                open: Some("(".into()),
                close: Some(")".into()),
                separator: Some(",".into()),
            },
        };
        let arguments = args(vec![(
            "ids",
            Value::List(vec![Value::I64(1), Value::I64(2), Value::I64(3)]),
        )]);
        let mut ctx = DynamicContext::new("test.stmt", &arguments, &ValueAccess);
        let produced = node.apply(&mut ctx, &SimpleEvaluator).unwrap();
        assert!(produced);
        assert_eq!(ctx.sql(), "(#{__frch_x_0},#{__frch_x_1},#{__frch_x_2})");
        assert_eq!(ctx.bindings()["__frch_x_0"], Value::I64(1));
        assert_eq!(ctx.bindings()["__frch_x_1"], Value::I64(2));
        assert_eq!(ctx.bindings()["__frch_x_2"], Value::I64(3));
    }

    #[test]
    fn test_foreach_empty_collection_is_noop() {
        let node = SqlNode::Foreach {
            body: Box::new(text("#{x}")),
            spec: ForeachSpec {
                collection: "ids".into(),
                item: Some("x".into()),
                index: None,
                open: Some("(".into()),
                close: Some(")".into()),
                separator: Some(",".into()),
            },
        };
        let arguments = args(vec![("ids", Value::List(vec![]))]);
        assert_eq!(render(&node, &arguments).unwrap(), "");
    }

    #[test]
    fn test_foreach_null_collection_fails() {
        let node = SqlNode::Foreach {
            body: Box::new(text("#{x}")),
            spec: ForeachSpec {
                collection: "ids".into(),
                item: Some("x".into()),
                index: None,
                open: None,
                close: None,
                separator: None,
            },
        };
        let err = render(&node, &args(vec![])).unwrap_err();
        assert_eq!(
            err,
            Error::NotIterable {
                statement: "test.stmt".into(),
                expression: "ids".into(),
            }
        );
    }

    #[test]
    fn test_foreach_over_map_binds_keys_as_index() {
        let node = SqlNode::Foreach {
            body: Box::new(text("#{k} = #{v}")),
            spec: ForeachSpec {
                collection: "fields".into(),
                item: Some("v".into()),
                index: Some("k".into()),
                open: None,
                close: None,
                separator: Some(", ".into()),
            },
        };
        let arguments = args(vec![(
            "fields",
            Value::Map(HashMap::from([
                ("a".to_string(), Value::I64(1)),
                ("b".to_string(), Value::I64(2)),
            ])),
        )]);
        let mut ctx = DynamicContext::new("test.stmt", &arguments, &ValueAccess);
        node.apply(&mut ctx, &SimpleEvaluator).unwrap();
        assert_eq!(
            ctx.sql(),
            "#{__frch_k_0} = #{__frch_v_0}, #{__frch_k_1} = #{__frch_v_1}"
        );
        assert_eq!(ctx.bindings()["__frch_k_0"], Value::Str("a".into()));
        assert_eq!(ctx.bindings()["__frch_v_1"], Value::I64(2));
    }

    #[test]
    fn test_nested_foreach_names_stay_unique() {
        let inner = SqlNode::Foreach {
            body: Box::new(text("#{y}")),
            spec: ForeachSpec {
                collection: "x".into(),
                item: Some("y".into()),
                index: None,
                open: Some("(".into()),
                close: Some(")".into()),
                separator: Some(",".into()),
            },
        };
        let node = SqlNode::Foreach {
            body: Box::new(inner),
            spec: ForeachSpec {
                collection: "groups".into(),
                item: Some("x".into()),
                index: None,
                open: None,
                close: None,
                separator: Some(" ".into()),
            },
        };
        let arguments = args(vec![(
            "groups",
            Value::List(vec![
                Value::List(vec![Value::I64(1)]),
                Value::List(vec![Value::I64(2)]),
            ]),
        )]);
        let mut ctx = DynamicContext::new("test.stmt", &arguments, &ValueAccess);
        node.apply(&mut ctx, &SimpleEvaluator).unwrap();
        // Outer iterations take uniques 0 and 2, inner loops 1 and 3.
        assert_eq!(ctx.sql(), "(#{__frch_y_1}) (#{__frch_y_3})");
        assert_eq!(ctx.bindings()["__frch_y_1"], Value::I64(1));
        assert_eq!(ctx.bindings()["__frch_y_3"], Value::I64(2));
    }

    #[test]
    fn test_rewrite_respects_path_boundary() {
        assert_eq!(
            rewrite_head("x.name", "x", 4),
            Some("__frch_x_4.name".to_string())
        );
        assert_eq!(
            rewrite_head("x,type=INT", "x", 0),
            Some("__frch_x_0,type=INT".to_string())
        );
        // "xs" is a different variable, not a use of "x"
        assert_eq!(rewrite_head("xs", "x", 0), None);
    }

    #[test]
    fn test_where_with_dynamic_children() {
        let node = SqlNode::Where(Box::new(SqlNode::Mixed(vec![
            SqlNode::If {
                test: "id != null".into(),
                body: Box::new(text("AND id = #{id}")),
            },
            SqlNode::If {
                test: "name != null".into(),
                body: Box::new(text("AND name = #{name}")),
            },
        ])));
        assert_eq!(
            render(&node, &args(vec![("name", Value::Str("joe".into()))])).unwrap(),
            "WHERE name = #{name}"
        );
        assert_eq!(render(&node, &args(vec![])).unwrap(), "");
    }
}
