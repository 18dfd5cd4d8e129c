//! Caching template compiler
//!
//! A capacity-bounded wrapper around `compile` that hands out shared
//! templates by statement id, recompiling only on a cache miss. Shared
//! hand-outs are `Arc`s; templates are immutable, so concurrent callers
//! bind against the same tree without locking.

use crate::binding::source::StatementTemplate;
use crate::error::Result;
use crate::parsing::{compile, MarkupNode, ScriptConfig};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default capacity for the template cache
const DEFAULT_CACHE_CAPACITY: usize = 1000;

pub struct CachingCompiler {
    config: ScriptConfig,
    cache: LruCache<String, Arc<StatementTemplate>>,
}

impl CachingCompiler {
    /// Create a caching compiler with default capacity
    pub fn new(config: ScriptConfig) -> Self {
        Self::with_capacity(config, DEFAULT_CACHE_CAPACITY)
    }

    /// Create a caching compiler with the given capacity
    pub fn with_capacity(config: ScriptConfig, capacity: usize) -> Self {
        Self {
            config,
            cache: LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(100).unwrap()),
            ),
        }
    }

    pub fn config(&self) -> &ScriptConfig {
        &self.config
    }

    /// Get the template for a statement id, compiling the markup on a miss
    pub fn get(
        &mut self,
        id: &str,
        markup: &MarkupNode,
        parameter_type: Option<&str>,
    ) -> Result<Arc<StatementTemplate>> {
        if let Some(template) = self.cache.get(id) {
            return Ok(template.clone());
        }
        let template = Arc::new(compile(id, markup, parameter_type, &self.config)?);
        self.cache.put(id.to_string(), template.clone());
        Ok(template)
    }

    /// Drop a cached template, forcing recompilation on next use
    pub fn invalidate(&mut self, id: &str) {
        self.cache.pop(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markup() -> MarkupNode {
        MarkupNode::element(
            "select",
            Vec::<(&str, &str)>::new(),
            vec![MarkupNode::text("select * from t where id = #{id}")],
        )
    }

    #[test]
    fn test_cache_hands_out_shared_template() {
        let mut compiler = CachingCompiler::new(ScriptConfig::default());
        let a = compiler.get("m.byId", &markup(), None).unwrap();
        let b = compiler.get("m.byId", &markup(), None).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_invalidate_forces_recompile() {
        let mut compiler = CachingCompiler::new(ScriptConfig::default());
        let a = compiler.get("m.byId", &markup(), None).unwrap();
        compiler.invalidate("m.byId");
        let b = compiler.get("m.byId", &markup(), None).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a, b);
    }

    #[test]
    fn test_capacity_evicts_least_recent() {
        let mut compiler = CachingCompiler::with_capacity(ScriptConfig::default(), 1);
        let a = compiler.get("m.first", &markup(), None).unwrap();
        compiler.get("m.second", &markup(), None).unwrap();
        let again = compiler.get("m.first", &markup(), None).unwrap();
        assert!(!Arc::ptr_eq(&a, &again));
    }
}
