//! Collection merge engine
//!
//! Reconciles a source sequence against an existing target collection. A
//! pluggable `TargetFinder` locates the existing target element for each
//! source element by key; matched elements are merged in place (their
//! untouched state survives), unmatched ones are transformed fresh. The
//! result follows source order; existing elements with no source counterpart
//! are dropped.
//!
//! Value-semantics elements have no identity to preserve, so a
//! primitive-to-primitive merge skips finding entirely and repopulates by
//! straight conversion.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::context::{runtime_type, InjectionContext, InjectionHint};
use crate::error::Result;
use crate::types::TypePair;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Key-based matcher locating the existing target element for a source
/// element
pub trait TargetFinder: Send {
    /// Index the target elements as they stand before the merge mutates
    /// anything
    fn initialize(&mut self, existing: &[Value]);

    /// The existing target element matching `source`, if any
    fn find(&self, source: &Value) -> Option<Value>;
}

/// Default finder: never matches, forcing full replacement
#[derive(Debug, Default)]
pub struct NullTargetFinder;

impl TargetFinder for NullTargetFinder {
    fn initialize(&mut self, _existing: &[Value]) {}

    fn find(&self, _source: &Value) -> Option<Value> {
        None
    }
}

/// Finder matching on a key member of both element types.
///
/// Indexing is last-wins: when two existing elements share a key, the later
/// one shadows the earlier - the same duplicate policy the definition
/// registry applies to base lookups.
#[derive(Debug)]
pub struct KeyTargetFinder {
    source_key: String,
    target_key: String,
    index: HashMap<String, Value>,
}

impl KeyTargetFinder {
    pub fn new(source_key: impl Into<String>, target_key: impl Into<String>) -> Self {
        KeyTargetFinder {
            source_key: source_key.into(),
            target_key: target_key.into(),
            index: HashMap::new(),
        }
    }

    /// Same key member on both sides
    pub fn on(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(key.clone(), key)
    }
}

fn key_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl TargetFinder for KeyTargetFinder {
    fn initialize(&mut self, existing: &[Value]) {
        self.index.clear();
        for element in existing {
            if let Some(key) = element.get(&self.target_key) {
                self.index.insert(key_string(key), element.clone());
            }
        }
    }

    fn find(&self, source: &Value) -> Option<Value> {
        let key = source.get(&self.source_key)?;
        self.index.get(&key_string(key)).cloned()
    }
}

/// Factory producing a fresh finder per merge call
pub type FinderFactory = Arc<dyn Fn() -> Box<dyn TargetFinder> + Send + Sync>;

/// Registry of finder factories keyed by element type pair
#[derive(Default)]
pub struct TargetFinderStore {
    factories: HashMap<TypePair, FinderFactory>,
}

impl TargetFinderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, element_pair: TypePair, factory: FinderFactory) {
        self.factories.insert(element_pair, factory);
    }

    /// A fresh finder for `element_pair`, defaulting to `NullTargetFinder`
    pub fn create(&self, element_pair: &TypePair) -> Box<dyn TargetFinder> {
        match self.factories.get(element_pair) {
            Some(factory) => factory(),
            None => Box::new(NullTargetFinder),
        }
    }
}

impl std::fmt::Debug for TargetFinderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetFinderStore")
            .field("registered", &self.factories.len())
            .finish()
    }
}

/// Merge a source sequence into an existing target collection.
///
/// One linear pass: the finder captures the pre-merge target elements, the
/// collection is cleared, then each source element either merges into its
/// found counterpart or transforms fresh. Insertion order follows source
/// order. The collection-index hint is threaded into every element
/// conversion and its triggers.
pub fn merge_collections(
    source: &[Value],
    target: &mut Vec<Value>,
    element_pair: &TypePair,
    context: &mut InjectionContext,
) -> Result<()> {
    // Value types have no identity: clear and repopulate by conversion
    let both_primitive = context.catalog().is_primitive(&element_pair.source)
        && context.catalog().is_primitive(&element_pair.target);
    if both_primitive {
        target.clear();
        for (index, element) in source.iter().enumerate() {
            let unit = context.resolve_required(element_pair)?;
            let converted =
                unit.transform(element, context, InjectionHint::CollectionIndex(index))?;
            target.push(converted);
        }
        return Ok(());
    }

    let mut finder = context.finders().create(element_pair);
    let existing = std::mem::take(target);
    finder.initialize(&existing);

    for (index, element) in source.iter().enumerate() {
        let pair = element_runtime_pair(element, element_pair);
        let unit = context.resolve_required(&pair)?;
        let hint = InjectionHint::CollectionIndex(index);
        let converted = match finder.find(element) {
            Some(found) => {
                trace!(index, pair = %pair, "existing element matched; merging");
                unit.merge(element, found, context, hint)?.target
            }
            None => {
                trace!(index, pair = %pair, "no existing element; transforming");
                unit.transform(element, context, hint)?
            }
        };
        target.push(converted);
    }
    Ok(())
}

/// The pair to resolve for one element: the `$type` discriminator overrides
/// the declared source element type
pub(crate) fn element_runtime_pair(element: &Value, declared: &TypePair) -> TypePair {
    match runtime_type(element) {
        Some(actual) => TypePair::new(actual, declared.target.clone()),
        None => declared.clone(),
    }
}
