//! Fluent configuration builder
//!
//! A thin wrapper over fragment creation: every method appends one fragment
//! to the definition being built, always with the definition's own
//! (source, target) pair. Errors raised by fragment construction are held
//! until `build()` so configuration reads as one fluent chain.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::automatch::AutoMatchStrategy;
use crate::context::InjectionContext;
use crate::definition::Definition;
use crate::error::{Error, Result};
use crate::fragment::{ConstructionStrategy, Fragment, NullSourceStrategy};
use crate::injection::{TriggerCause, TriggerParams};
use crate::types::{TypeName, TypePair};
use serde_json::Value;
use std::sync::Arc;

pub struct InjectionBuilder {
    definition: Definition,
    error: Option<Error>,
}

impl InjectionBuilder {
    pub fn new(source: impl Into<TypeName>, target: impl Into<TypeName>) -> Self {
        InjectionBuilder {
            definition: Definition::new(TypePair::new(source, target)),
            error: None,
        }
    }

    fn pair(&self) -> TypePair {
        self.definition.pair().clone()
    }

    fn push(mut self, fragment: Fragment) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.definition.add(fragment) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Parameterless activation of the target type
    pub fn activate(self) -> Self {
        let pair = self.pair();
        self.push(Fragment::construction(pair, ConstructionStrategy::Activate))
    }

    /// The target type's default value as the starting instance
    pub fn construct_default(self) -> Self {
        let pair = self.pair();
        self.push(Fragment::construction(
            pair,
            ConstructionStrategy::DefaultFactory,
        ))
    }

    /// A caller-supplied factory invoked with (source, context)
    pub fn construct_with<F>(self, factory: F) -> Self
    where
        F: Fn(&Value, &mut InjectionContext) -> Result<Value> + Send + Sync + 'static,
    {
        let pair = self.pair();
        self.push(Fragment::construction(
            pair,
            ConstructionStrategy::CustomFactory(Arc::new(factory)),
        ))
    }

    /// Raise a caller-constructed error when the source is null
    pub fn on_null_throw<F>(self, make_error: F) -> Self
    where
        F: Fn() -> Error + Send + Sync + 'static,
    {
        let pair = self.pair();
        self.push(Fragment::null_source(
            pair,
            NullSourceStrategy::Throw(Arc::new(make_error)),
        ))
    }

    /// Yield the target type's default value when the source is null
    pub fn on_null_default(self) -> Self {
        let pair = self.pair();
        self.push(Fragment::null_source(pair, NullSourceStrategy::DefaultValue))
    }

    /// A caller-supplied factory for the null-source case
    pub fn on_null_with<F>(self, factory: F) -> Self
    where
        F: Fn(&Value, &mut InjectionContext) -> Result<Value> + Send + Sync + 'static,
    {
        let pair = self.pair();
        self.push(Fragment::null_source(
            pair,
            NullSourceStrategy::CustomFactory(Arc::new(factory)),
        ))
    }

    /// Use the given auto-match strategy for member matching
    pub fn auto(self, strategy: AutoMatchStrategy) -> Self {
        let pair = self.pair();
        self.push(Fragment::auto_match(pair, strategy))
    }

    /// A raw pattern template over the general regex engine
    pub fn auto_pattern(self, template: &str, options: crate::automatch::AutoMatchOptions) -> Self {
        match AutoMatchStrategy::new(template, options) {
            Ok(strategy) => self.auto(strategy),
            Err(e) => self.fail(e),
        }
    }

    pub fn auto_exact(self) -> Self {
        self.auto(AutoMatchStrategy::exact())
    }

    pub fn auto_none(self) -> Self {
        self.auto(AutoMatchStrategy::none())
    }

    pub fn auto_prefix_source(self, prefix: &str) -> Self {
        match AutoMatchStrategy::prefix_source(prefix) {
            Ok(strategy) => self.auto(strategy),
            Err(e) => self.fail(e),
        }
    }

    pub fn auto_prefix_target(self, prefix: &str) -> Self {
        match AutoMatchStrategy::prefix_target(prefix) {
            Ok(strategy) => self.auto(strategy),
            Err(e) => self.fail(e),
        }
    }

    pub fn auto_suffix_source(self, suffix: &str) -> Self {
        match AutoMatchStrategy::suffix_source(suffix) {
            Ok(strategy) => self.auto(strategy),
            Err(e) => self.fail(e),
        }
    }

    pub fn auto_suffix_target(self, suffix: &str) -> Self {
        match AutoMatchStrategy::suffix_target(suffix) {
            Ok(strategy) => self.auto(strategy),
            Err(e) => self.fail(e),
        }
    }

    /// Pull in the fragments of a base definition
    pub fn inherits(
        self,
        base_source: impl Into<TypeName>,
        base_target: impl Into<TypeName>,
    ) -> Self {
        let pair = self.pair();
        self.push(Fragment::inherits(
            pair,
            TypePair::new(base_source, base_target),
        ))
    }

    /// Run `action` at the given lifecycle point
    pub fn on<F>(self, cause: TriggerCause, action: F) -> Self
    where
        F: Fn(TriggerParams<'_>) -> Result<()> + Send + Sync + 'static,
    {
        let pair = self.pair();
        self.push(Fragment::trigger(pair, cause, Arc::new(action)))
    }

    fn fail(mut self, error: Error) -> Self {
        if self.error.is_none() {
            self.error = Some(error);
        }
        self
    }

    /// Finish the definition, surfacing the first configuration error if one
    /// occurred along the chain
    pub fn build(self) -> Result<Definition> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.definition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::FragmentKind;

    #[test]
    fn test_fluent_chain_builds_ordered_fragments() {
        let definition = InjectionBuilder::new("Person", "PersonDto")
            .activate()
            .on_null_default()
            .auto_exact()
            .inherits("Base", "BaseDto")
            .build()
            .unwrap();

        let kinds: Vec<_> = definition.fragments().iter().map(|f| f.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                FragmentKind::Construction,
                FragmentKind::NullSource,
                FragmentKind::AutoMatch,
                FragmentKind::Inherits,
            ]
        );
        assert_eq!(definition.pair(), &TypePair::new("Person", "PersonDto"));
    }

    #[test]
    fn test_strategy_error_surfaces_at_build() {
        use crate::automatch::AutoMatchOptions;

        let bad = InjectionBuilder::new("A", "B")
            .auto_pattern("({name}", AutoMatchOptions::NONE)
            .auto_exact()
            .build();
        assert!(matches!(bad, Err(Error::InvalidArgument { .. })));

        let ok = InjectionBuilder::new("A", "B")
            .auto_pattern("{name}Dto", AutoMatchOptions::NONE)
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn test_trigger_fragment() {
        let definition = InjectionBuilder::new("A", "B")
            .on(TriggerCause::InjectionEnded, |_| Ok(()))
            .build()
            .unwrap();
        assert_eq!(definition.fragments()[0].kind(), FragmentKind::Trigger);
    }
}
