//! Per-call injection context
//!
//! An `InjectionContext` carries all mutable state for one top-level
//! conversion call: the stack of in-progress type pairs, the store used for
//! recursive resolution, the target-instance cache that guards against cyclic
//! object graphs, and the culture used for primitive conversion. Contexts are
//! created fresh per call and must not be shared across threads; the compiled
//! injections themselves hold no mutable state.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::collections::TargetFinderStore;
use crate::error::{Error, Result};
use crate::injection::Injection;
use crate::store::InjectionStore;
use crate::types::{TypeCatalog, TypeName, TypePair};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Source-object field naming its concrete runtime type
pub const TYPE_FIELD: &str = "$type";
/// Source-object field giving the object a graph-wide identity
pub const ID_FIELD: &str = "$id";

/// Optional payload threaded through merge calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InjectionHint {
    #[default]
    None,
    /// Position of the element currently being processed in its source sequence
    CollectionIndex(usize),
}

/// Formatting conventions for culture-aware primitive conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Culture {
    pub decimal_separator: char,
    pub group_separator: Option<char>,
}

impl Culture {
    /// Invariant culture: '.' decimal point, no grouping
    pub fn invariant() -> Self {
        Culture {
            decimal_separator: '.',
            group_separator: None,
        }
    }

    pub fn new(decimal_separator: char, group_separator: Option<char>) -> Self {
        Culture {
            decimal_separator,
            group_separator,
        }
    }
}

impl Default for Culture {
    fn default() -> Self {
        Culture::invariant()
    }
}

/// Mutable state for one conversion call graph
pub struct InjectionContext {
    store: Arc<dyn InjectionStore>,
    catalog: Arc<TypeCatalog>,
    finders: Arc<TargetFinderStore>,
    culture: Culture,
    /// In-progress (source, target) pairs, outermost first
    frames: Vec<TypePair>,
    /// Converted targets keyed by (source `$id`, target type); a revisit
    /// returns the cached value instead of recursing again
    target_cache: HashMap<(String, TypeName), Value>,
}

impl InjectionContext {
    pub fn new(store: Arc<dyn InjectionStore>, catalog: Arc<TypeCatalog>) -> Self {
        InjectionContext {
            store,
            catalog,
            finders: Arc::new(TargetFinderStore::new()),
            culture: Culture::invariant(),
            frames: Vec::new(),
            target_cache: HashMap::new(),
        }
    }

    pub fn with_culture(mut self, culture: Culture) -> Self {
        self.culture = culture;
        self
    }

    pub fn with_finders(mut self, finders: Arc<TargetFinderStore>) -> Self {
        self.finders = finders;
        self
    }

    pub fn finders(&self) -> &TargetFinderStore {
        &self.finders
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn catalog_handle(&self) -> Arc<TypeCatalog> {
        Arc::clone(&self.catalog)
    }

    pub fn culture(&self) -> &Culture {
        &self.culture
    }

    pub fn store(&self) -> Arc<dyn InjectionStore> {
        Arc::clone(&self.store)
    }

    /// Resolve a compiled injection through the store chain, failing with
    /// `UnresolvedInjection` when no layer answers
    pub fn resolve_required(&self, pair: &TypePair) -> Result<Arc<dyn Injection>> {
        self.store
            .resolve(pair)
            .ok_or_else(|| Error::unresolved(pair.source.as_str(), pair.target.as_str()))
    }

    pub fn push_frame(&mut self, pair: TypePair) {
        self.frames.push(pair);
    }

    pub fn pop_frame(&mut self) -> Option<TypePair> {
        self.frames.pop()
    }

    /// How deep the current conversion call graph is
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[TypePair] {
        &self.frames
    }

    pub fn cached_target(&self, source_id: &str, target_type: &TypeName) -> Option<&Value> {
        self.target_cache
            .get(&(source_id.to_string(), target_type.clone()))
    }

    pub fn cache_target(&mut self, source_id: String, target_type: TypeName, target: Value) {
        self.target_cache.insert((source_id, target_type), target);
    }
}

/// Identity of a source value, when it carries one
pub fn source_identity(source: &Value) -> Option<&str> {
    source.get(ID_FIELD).and_then(Value::as_str)
}

/// Concrete runtime type of a value, when discriminated
pub fn runtime_type(value: &Value) -> Option<TypeName> {
    value
        .get(TYPE_FIELD)
        .and_then(Value::as_str)
        .map(TypeName::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CustomInjectionStore;
    use serde_json::json;

    fn empty_context() -> InjectionContext {
        InjectionContext::new(
            Arc::new(CustomInjectionStore::new()),
            Arc::new(TypeCatalog::with_primitives()),
        )
    }

    #[test]
    fn test_frame_stack() {
        let mut ctx = empty_context();
        assert_eq!(ctx.depth(), 0);
        ctx.push_frame(TypePair::new("A", "B"));
        ctx.push_frame(TypePair::new("C", "D"));
        assert_eq!(ctx.depth(), 2);
        assert_eq!(ctx.pop_frame(), Some(TypePair::new("C", "D")));
        assert_eq!(ctx.depth(), 1);
    }

    #[test]
    fn test_target_cache_roundtrip() {
        let mut ctx = empty_context();
        assert!(ctx.cached_target("p1", &"Dto".into()).is_none());
        ctx.cache_target("p1".to_string(), "Dto".into(), json!({"x": 1}));
        assert_eq!(ctx.cached_target("p1", &"Dto".into()), Some(&json!({"x": 1})));
        assert!(ctx.cached_target("p1", &"Other".into()).is_none());
    }

    #[test]
    fn test_resolve_required_fails_on_empty_store() {
        let ctx = empty_context();
        let err = ctx.resolve_required(&TypePair::new("A", "B")).unwrap_err();
        assert!(matches!(err, Error::UnresolvedInjection { .. }));
    }

    #[test]
    fn test_source_identity_and_runtime_type() {
        let v = json!({"$id": "42", "$type": "Admin", "Name": "x"});
        assert_eq!(source_identity(&v), Some("42"));
        assert_eq!(runtime_type(&v), Some(TypeName::from("Admin")));
        assert_eq!(source_identity(&json!({"Name": "x"})), None);
        assert_eq!(runtime_type(&json!(3)), None);
    }
}
