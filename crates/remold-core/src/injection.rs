//! Shared surface types for compiled injections
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::context::{InjectionContext, InjectionHint};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// What the caller should do with the merge result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostMergeAction {
    /// The existing target was updated; keep using it
    UpdateInPlace,
    /// The returned target replaces the existing one
    Replace,
}

impl fmt::Display for PostMergeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostMergeAction::UpdateInPlace => write!(f, "update-in-place"),
            PostMergeAction::Replace => write!(f, "replace"),
        }
    }
}

/// Result of a merge call: the action plus the (possibly new) target value
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub action: PostMergeAction,
    pub target: Value,
}

/// Lifecycle point a trigger fragment is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerCause {
    /// Fired once after member mapping for an injection completes
    InjectionEnded,
    /// Fired for each collection element after it was transformed or merged
    CollectionItemProcessed,
}

impl fmt::Display for TriggerCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerCause::InjectionEnded => write!(f, "injection-ended"),
            TriggerCause::CollectionItemProcessed => write!(f, "collection-item-processed"),
        }
    }
}

/// Parameters handed to a trigger action
pub struct TriggerParams<'a> {
    pub source: &'a Value,
    pub target: &'a mut Value,
    pub context: &'a mut InjectionContext,
    pub hint: InjectionHint,
}

impl fmt::Debug for dyn Injection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injection").field("pair", self.pair()).finish()
    }
}

/// A compiled, immutable transform/merge unit.
///
/// Implementations are `Send + Sync` and hold no mutable state of their own;
/// all per-call state lives in the `InjectionContext` supplied by the caller.
pub trait Injection: Send + Sync {
    /// The (source, target) pair this unit was compiled for, used as its
    /// store index
    fn pair(&self) -> &crate::types::TypePair;

    /// Produce a new target value from `source`
    fn transform(
        &self,
        source: &Value,
        context: &mut InjectionContext,
        hint: InjectionHint,
    ) -> crate::error::Result<Value>;

    /// Update `existing` from `source`, preserving its untouched state
    fn merge(
        &self,
        source: &Value,
        existing: Value,
        context: &mut InjectionContext,
        hint: InjectionHint,
    ) -> crate::error::Result<MergeOutcome>;
}
