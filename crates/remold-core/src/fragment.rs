//! Fragment model: immutable value objects describing one mapping decision
//!
//! A mapping definition is an ordered sequence of fragments. Each fragment
//! records a single configuration decision (how to construct the target, what
//! to do with a null source, how to auto-match members, which base definition
//! to inherit from, or an action to run at a lifecycle point) together with
//! the (source, target) type pair it belongs to.
//!
//! Fragment kinds form a closed enum; identity is the process-unique
//! `FragmentId` assigned at creation, which the compilation pipeline uses to
//! track already-processed fragments.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::automatch::AutoMatchStrategy;
use crate::context::InjectionContext;
use crate::error::{Error, Result};
use crate::injection::{TriggerCause, TriggerParams};
use crate::types::TypePair;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Factory producing a target value from (source, context)
pub type FactoryFn = Arc<dyn Fn(&Value, &mut InjectionContext) -> Result<Value> + Send + Sync>;

/// Caller-supplied exception constructor for the Throw null-source strategy
pub type ExceptionFn = Arc<dyn Fn() -> Error + Send + Sync>;

/// Action attached to a trigger fragment
pub type TriggerFn = Arc<dyn Fn(TriggerParams<'_>) -> Result<()> + Send + Sync>;

static NEXT_FRAGMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique fragment identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FragmentId(u64);

impl FragmentId {
    fn next() -> Self {
        FragmentId(NEXT_FRAGMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Closed set of fragment categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    Construction,
    NullSource,
    AutoMatch,
    Inherits,
    Trigger,
}

/// How the target instance is created
#[derive(Clone)]
pub enum ConstructionStrategy {
    /// Parameterless activation of the target type
    Activate,
    /// The target type's default (empty) value
    DefaultFactory,
    /// Caller-supplied factory invoked with (source, context)
    CustomFactory(FactoryFn),
}

impl fmt::Debug for ConstructionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructionStrategy::Activate => write!(f, "Activate"),
            ConstructionStrategy::DefaultFactory => write!(f, "DefaultFactory"),
            ConstructionStrategy::CustomFactory(_) => write!(f, "CustomFactory(<fn>)"),
        }
    }
}

/// What a compiled injection does when invoked with a null source
#[derive(Clone)]
pub enum NullSourceStrategy {
    /// Raise the caller-constructed error
    Throw(ExceptionFn),
    /// Yield the target type's default value
    DefaultValue,
    /// Caller-supplied factory invoked with (source, context)
    CustomFactory(FactoryFn),
}

impl fmt::Debug for NullSourceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NullSourceStrategy::Throw(_) => write!(f, "Throw(<fn>)"),
            NullSourceStrategy::DefaultValue => write!(f, "DefaultValue"),
            NullSourceStrategy::CustomFactory(_) => write!(f, "CustomFactory(<fn>)"),
        }
    }
}

/// Payload of one fragment
#[derive(Clone)]
pub enum FragmentBody {
    Construction(ConstructionStrategy),
    NullSource(NullSourceStrategy),
    AutoMatch(AutoMatchStrategy),
    Inherits { base: TypePair },
    Trigger { cause: TriggerCause, action: TriggerFn },
}

impl fmt::Debug for FragmentBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentBody::Construction(s) => f.debug_tuple("Construction").field(s).finish(),
            FragmentBody::NullSource(s) => f.debug_tuple("NullSource").field(s).finish(),
            FragmentBody::AutoMatch(s) => f.debug_tuple("AutoMatch").field(s).finish(),
            FragmentBody::Inherits { base } => f.debug_struct("Inherits").field("base", base).finish(),
            FragmentBody::Trigger { cause, .. } => {
                f.debug_struct("Trigger").field("cause", cause).finish()
            }
        }
    }
}

/// One immutable configuration decision for a (source, target) pair
#[derive(Debug, Clone)]
pub struct Fragment {
    id: FragmentId,
    pair: TypePair,
    inherited: bool,
    body: FragmentBody,
}

impl Fragment {
    /// A construction fragment. Construction never propagates to derived
    /// definitions; each level specifies its own or defaults to activation.
    pub fn construction(pair: TypePair, strategy: ConstructionStrategy) -> Self {
        Fragment {
            id: FragmentId::next(),
            pair,
            inherited: false,
            body: FragmentBody::Construction(strategy),
        }
    }

    pub fn null_source(pair: TypePair, strategy: NullSourceStrategy) -> Self {
        Fragment {
            id: FragmentId::next(),
            pair,
            inherited: true,
            body: FragmentBody::NullSource(strategy),
        }
    }

    pub fn auto_match(pair: TypePair, strategy: AutoMatchStrategy) -> Self {
        Fragment {
            id: FragmentId::next(),
            pair,
            inherited: true,
            body: FragmentBody::AutoMatch(strategy),
        }
    }

    pub fn inherits(pair: TypePair, base: TypePair) -> Self {
        Fragment {
            id: FragmentId::next(),
            pair,
            inherited: true,
            body: FragmentBody::Inherits { base },
        }
    }

    pub fn trigger(pair: TypePair, cause: TriggerCause, action: TriggerFn) -> Self {
        Fragment {
            id: FragmentId::next(),
            pair,
            inherited: true,
            body: FragmentBody::Trigger { cause, action },
        }
    }

    /// Mark the fragment as not propagating to derived definitions.
    /// No effect on construction fragments, which never propagate.
    pub fn not_inherited(mut self) -> Self {
        self.inherited = false;
        self
    }

    pub fn id(&self) -> FragmentId {
        self.id
    }

    pub fn pair(&self) -> &TypePair {
        &self.pair
    }

    pub fn is_inherited(&self) -> bool {
        self.inherited
    }

    pub fn body(&self) -> &FragmentBody {
        &self.body
    }

    pub fn kind(&self) -> FragmentKind {
        match &self.body {
            FragmentBody::Construction(_) => FragmentKind::Construction,
            FragmentBody::NullSource(_) => FragmentKind::NullSource,
            FragmentBody::AutoMatch(_) => FragmentKind::AutoMatch,
            FragmentBody::Inherits { .. } => FragmentKind::Inherits,
            FragmentBody::Trigger { .. } => FragmentKind::Trigger,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> TypePair {
        TypePair::new("Person", "PersonDto")
    }

    #[test]
    fn test_fragment_ids_are_unique() {
        let a = Fragment::construction(pair(), ConstructionStrategy::Activate);
        let b = Fragment::construction(pair(), ConstructionStrategy::Activate);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_construction_never_inherited() {
        let f = Fragment::construction(pair(), ConstructionStrategy::Activate);
        assert!(!f.is_inherited());
        assert_eq!(f.kind(), FragmentKind::Construction);
    }

    #[test]
    fn test_non_construction_inherited_by_default() {
        let f = Fragment::null_source(pair(), NullSourceStrategy::DefaultValue);
        assert!(f.is_inherited());
        assert!(!f.clone().not_inherited().is_inherited());
    }

    #[test]
    fn test_kind_mapping() {
        let base = TypePair::new("Base", "BaseDto");
        assert_eq!(Fragment::inherits(pair(), base).kind(), FragmentKind::Inherits);
        let t = Fragment::trigger(
            pair(),
            TriggerCause::InjectionEnded,
            Arc::new(|_| Ok(())),
        );
        assert_eq!(t.kind(), FragmentKind::Trigger);
    }

    #[test]
    fn test_debug_omits_function_bodies() {
        let f = Fragment::construction(
            pair(),
            ConstructionStrategy::CustomFactory(Arc::new(|_, _| Ok(Value::Null))),
        );
        let dbg = format!("{:?}", f);
        assert!(dbg.contains("CustomFactory(<fn>)"));
    }
}
