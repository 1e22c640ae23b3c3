//! Injection store chain
//!
//! Resolution of a runtime (source, target) pair to a compiled unit walks an
//! ordered chain of specialized stores, first answer wins: exact registered
//! definitions, then the convertible-primitive fallback, then the
//! sequence-to-array and sequence-to-sequence stores. Inner layers signal a
//! miss by returning `None`; only the composite front raises
//! `UnresolvedInjection`, and only when the whole chain is exhausted.
//!
//! The composite store also fronts the instance registry: compiled units and
//! wiring code reach both injection resolution and cross-cutting singletons
//! through the one facade.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::collections::{element_runtime_pair, merge_collections};
use crate::context::{InjectionContext, InjectionHint};
use crate::convert::convert_primitive;
use crate::error::{Error, Result};
use crate::forge::executor::default_value;
use crate::injection::{Injection, MergeOutcome, PostMergeAction};
use crate::instances::InstanceRegistry;
use crate::types::{TypeCatalog, TypeKind, TypePair};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::trace;

/// One layer of the resolution chain
pub trait InjectionStore: Send + Sync {
    /// The compiled unit for `pair`, or `None` when this layer cannot serve
    /// it
    fn resolve(&self, pair: &TypePair) -> Option<Arc<dyn Injection>>;
}

/// Exact-pair store of registered custom definitions. No inheritance-aware
/// matching happens at this layer; the pair must match the compiled unit's
/// exactly.
#[derive(Default)]
pub struct CustomInjectionStore {
    units: HashMap<TypePair, Arc<dyn Injection>>,
}

impl CustomInjectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compiled unit under its own pair; a later registration for
    /// the same pair replaces the earlier one
    pub fn register(&mut self, unit: Arc<dyn Injection>) {
        self.units.insert(unit.pair().clone(), unit);
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl InjectionStore for CustomInjectionStore {
    fn resolve(&self, pair: &TypePair) -> Option<Arc<dyn Injection>> {
        self.units.get(pair).cloned()
    }
}

/// Fallback for primitive targets: anything the standard conversion facility
/// can turn into a non-composite value
pub struct ConvertibleStore {
    catalog: Arc<TypeCatalog>,
}

impl ConvertibleStore {
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        ConvertibleStore { catalog }
    }
}

impl InjectionStore for ConvertibleStore {
    fn resolve(&self, pair: &TypePair) -> Option<Arc<dyn Injection>> {
        if !self.catalog.is_primitive(&pair.target) {
            return None;
        }
        Some(Arc::new(ConvertibleInjection { pair: pair.clone() }))
    }
}

struct ConvertibleInjection {
    pair: TypePair,
}

impl Injection for ConvertibleInjection {
    fn pair(&self) -> &TypePair {
        &self.pair
    }

    fn transform(
        &self,
        source: &Value,
        context: &mut InjectionContext,
        _hint: InjectionHint,
    ) -> Result<Value> {
        if source.is_null() {
            return Ok(default_value(context.catalog(), &self.pair.target));
        }
        convert_primitive(source, &self.pair.target, context.culture())
    }

    fn merge(
        &self,
        source: &Value,
        _existing: Value,
        context: &mut InjectionContext,
        hint: InjectionHint,
    ) -> Result<MergeOutcome> {
        // Primitives have no identity; a merge is a plain replacement
        let target = self.transform(source, context, hint)?;
        Ok(MergeOutcome {
            action: PostMergeAction::Replace,
            target,
        })
    }
}

/// Sequence source into a fixed array target: always rebuilt, never merged
pub struct SequenceToArrayStore {
    catalog: Arc<TypeCatalog>,
}

impl SequenceToArrayStore {
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        SequenceToArrayStore { catalog }
    }
}

impl InjectionStore for SequenceToArrayStore {
    fn resolve(&self, pair: &TypePair) -> Option<Arc<dyn Injection>> {
        sequence_injection(&self.catalog, pair, TypeKind::Array)
    }
}

/// Sequence source into a mergeable sequence target
pub struct SequenceToSequenceStore {
    catalog: Arc<TypeCatalog>,
}

impl SequenceToSequenceStore {
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        SequenceToSequenceStore { catalog }
    }
}

impl InjectionStore for SequenceToSequenceStore {
    fn resolve(&self, pair: &TypePair) -> Option<Arc<dyn Injection>> {
        sequence_injection(&self.catalog, pair, TypeKind::Sequence)
    }
}

fn sequence_injection(
    catalog: &TypeCatalog,
    pair: &TypePair,
    target_kind: TypeKind,
) -> Option<Arc<dyn Injection>> {
    let source = catalog.get(&pair.source)?;
    let target = catalog.get(&pair.target)?;
    if !matches!(source.kind, TypeKind::Sequence | TypeKind::Array) {
        return None;
    }
    if target.kind != target_kind {
        return None;
    }
    let element = TypePair::new(source.element.clone()?, target.element.clone()?);
    Some(Arc::new(SequenceInjection {
        pair: pair.clone(),
        element,
        target_kind,
    }))
}

struct SequenceInjection {
    pair: TypePair,
    element: TypePair,
    target_kind: TypeKind,
}

impl SequenceInjection {
    fn source_elements<'a>(&self, source: &'a Value) -> Result<&'a [Value]> {
        source.as_array().map(Vec::as_slice).ok_or_else(|| {
            Error::TypeMismatch {
                expected: format!("{} (array)", self.pair.source),
                actual: source.to_string(),
                context: "sequence injection".to_string(),
            }
        })
    }
}

impl Injection for SequenceInjection {
    fn pair(&self) -> &TypePair {
        &self.pair
    }

    fn transform(
        &self,
        source: &Value,
        context: &mut InjectionContext,
        _hint: InjectionHint,
    ) -> Result<Value> {
        if source.is_null() {
            return Ok(Value::Null);
        }
        let elements = self.source_elements(source)?;
        // A fresh empty target collection, populated in source order; each
        // element dispatches on its runtime type like the merge path does
        let mut target = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            let pair = element_runtime_pair(element, &self.element);
            let unit = context.resolve_required(&pair)?;
            target.push(unit.transform(
                element,
                context,
                InjectionHint::CollectionIndex(index),
            )?);
        }
        Ok(Value::Array(target))
    }

    fn merge(
        &self,
        source: &Value,
        existing: Value,
        context: &mut InjectionContext,
        hint: InjectionHint,
    ) -> Result<MergeOutcome> {
        if self.target_kind == TypeKind::Array || existing.is_null() {
            let target = self.transform(source, context, hint)?;
            return Ok(MergeOutcome {
                action: PostMergeAction::Replace,
                target,
            });
        }
        let elements = self.source_elements(source)?;
        let mut target = match existing {
            Value::Array(items) => items,
            other => {
                return Err(Error::TypeMismatch {
                    expected: format!("{} (array)", self.pair.target),
                    actual: other.to_string(),
                    context: "sequence merge".to_string(),
                })
            }
        };
        merge_collections(elements, &mut target, &self.element, context)?;
        Ok(MergeOutcome {
            action: PostMergeAction::UpdateInPlace,
            target: Value::Array(target),
        })
    }
}

/// The master store: the resolution chain plus the instance registry, behind
/// one facade
pub struct CompositeStore {
    chain: Vec<Arc<dyn InjectionStore>>,
    instances: RwLock<InstanceRegistry>,
}

impl CompositeStore {
    pub fn new(chain: Vec<Arc<dyn InjectionStore>>) -> Self {
        CompositeStore {
            chain,
            instances: RwLock::new(InstanceRegistry::new()),
        }
    }

    /// The standard chain over a compiled custom store: custom definitions,
    /// convertible primitives, sequence-to-array, sequence-to-sequence
    pub fn standard(custom: CustomInjectionStore, catalog: Arc<TypeCatalog>) -> Self {
        Self::new(vec![
            Arc::new(custom),
            Arc::new(ConvertibleStore::new(Arc::clone(&catalog))),
            Arc::new(SequenceToArrayStore::new(Arc::clone(&catalog))),
            Arc::new(SequenceToSequenceStore::new(catalog)),
        ])
    }

    /// Resolve through the chain, raising `UnresolvedInjection` on exhaustion
    pub fn resolve_required(&self, pair: &TypePair) -> Result<Arc<dyn Injection>> {
        self.resolve(pair)
            .ok_or_else(|| Error::unresolved(pair.source.as_str(), pair.target.as_str()))
    }

    pub fn register_instance<T: Any + Send + Sync>(&self, instance: Arc<T>) -> Result<()> {
        let mut guard = self
            .instances
            .write()
            .map_err(|_| Error::invalid_argument("instances", "instance registry lock poisoned"))?;
        guard.register(instance);
        Ok(())
    }

    pub fn resolve_instance<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        let guard = self
            .instances
            .read()
            .map_err(|_| Error::invalid_argument("instances", "instance registry lock poisoned"))?;
        guard.resolve::<T>()
    }

    pub fn resolve_all_instances<T: Any + Send + Sync>(&self) -> Vec<Arc<T>> {
        match self.instances.read() {
            Ok(guard) => guard.resolve_all::<T>(),
            Err(_) => Vec::new(),
        }
    }
}

impl InjectionStore for CompositeStore {
    fn resolve(&self, pair: &TypePair) -> Option<Arc<dyn Injection>> {
        for (position, store) in self.chain.iter().enumerate() {
            if let Some(unit) = store.resolve(pair) {
                trace!(pair = %pair, layer = position, "injection resolved");
                return Some(unit);
            }
        }
        None
    }
}
