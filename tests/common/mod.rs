//! Common test utilities for templating integration tests
#![allow(dead_code)]

use dynsql::{
    compile, BoundSql, MarkupNode, Result, ScriptConfig, SimpleEvaluator, StatementTemplate,
    Value, ValueAccess,
};
use std::collections::HashMap;

/// Test context holding one compiler configuration
pub struct TestContext {
    pub config: ScriptConfig,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            config: ScriptConfig::default(),
        }
    }

    pub fn compile(&self, id: &str, markup: &MarkupNode) -> Result<StatementTemplate> {
        compile(id, markup, None, &self.config)
    }

    pub fn bind(&self, template: &StatementTemplate, arguments: &Value) -> Result<BoundSql> {
        template.bind(arguments, &SimpleEvaluator, &ValueAccess)
    }

    /// Compile and bind in one step
    pub fn render(&self, markup: &MarkupNode, arguments: &Value) -> Result<BoundSql> {
        let template = self.compile("test.stmt", markup)?;
        self.bind(&template, arguments)
    }
}

pub fn setup_test() -> TestContext {
    TestContext::new()
}

/// Shorthand element constructor
pub fn elem(tag: &str, attrs: &[(&str, &str)], children: Vec<MarkupNode>) -> MarkupNode {
    MarkupNode::element(tag, attrs.iter().copied(), children)
}

/// Shorthand text constructor
pub fn text(body: &str) -> MarkupNode {
    MarkupNode::text(body)
}

/// Build a map-shaped argument object
pub fn args(entries: Vec<(&str, Value)>) -> Value {
    Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<HashMap<_, _>>(),
    )
}
