//! The forge: fragment-to-executable-transform compilation pipeline
//!
//! Compilation walks a fixed sequence of named stages over an ephemeral
//! `Scaffold`, lowering a definition's fragments (own plus inherited) into a
//! flat instruction list, then wraps the list as an immutable
//! `CompiledInjection` ready for store registration.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

pub mod executor;
pub mod instruction;
pub mod scaffold;
pub mod stages;

use crate::definition::{Definition, DefinitionRegistry};
use crate::error::Result;
use crate::types::TypeCatalog;
use std::sync::Arc;
use tracing::debug;

pub use executor::CompiledInjection;
pub use instruction::{Instruction, MemberResolution};
pub use scaffold::Scaffold;

/// One named compilation stage
#[derive(Clone, Copy)]
pub struct Stage {
    pub name: &'static str,
    pub run: fn(&mut Scaffold<'_>) -> Result<()>,
}

/// The authoritative stage sequence
pub const STAGES: [Stage; 8] = [
    Stage { name: "initialize", run: stages::initialize },
    Stage { name: "filter-uninheritable", run: stages::filter_uninheritable },
    Stage { name: "collect-candidates", run: stages::collect_candidates },
    Stage { name: "construction", run: stages::construction },
    Stage { name: "null-source", run: stages::null_source },
    Stage { name: "member-matching", run: stages::member_matching },
    Stage { name: "triggers", run: stages::triggers },
    Stage { name: "finalize", run: stages::finalize },
];

/// Compiles definitions against a registry and type catalog
pub struct Forge {
    registry: Arc<DefinitionRegistry>,
    catalog: Arc<TypeCatalog>,
}

impl Forge {
    pub fn new(registry: Arc<DefinitionRegistry>, catalog: Arc<TypeCatalog>) -> Self {
        Forge { registry, catalog }
    }

    /// Compile one definition into an executable injection.
    ///
    /// Compilation assumes a structurally valid definition (mismatched
    /// fragments were rejected at `Definition::add`); missing base
    /// definitions are tolerated and absent strategies are defaulted.
    pub fn compile(&self, definition: &Definition) -> Result<CompiledInjection> {
        let mut scaffold = Scaffold::new(definition, &self.registry, &self.catalog);
        for stage in STAGES {
            debug!(stage = stage.name, pair = %definition.pair(), "forge stage");
            (stage.run)(&mut scaffold)?;
        }
        Ok(CompiledInjection::new(
            definition.pair().clone(),
            scaffold.into_instructions(),
        ))
    }

    /// Compile every definition in the registry, in registration order
    pub fn compile_all(&self) -> Result<Vec<CompiledInjection>> {
        self.registry
            .definitions()
            .iter()
            .map(|d| self.compile(d))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automatch::AutoMatchStrategy;
    use crate::fragment::Fragment;
    use crate::types::{Member, TypeDescriptor, TypePair};

    #[test]
    fn test_compile_exposes_pair() {
        let pair = TypePair::new("Person", "PersonDto");
        let definition = Definition::new(pair.clone());
        let forge = Forge::new(
            Arc::new(DefinitionRegistry::new()),
            Arc::new(TypeCatalog::with_primitives()),
        );
        let unit = forge.compile(&definition).unwrap();
        use crate::injection::Injection;
        assert_eq!(unit.pair(), &pair);
    }

    #[test]
    fn test_compile_all_in_registration_order() {
        let mut catalog = TypeCatalog::with_primitives();
        catalog.register(TypeDescriptor::object("A", vec![Member::new("X", "i64")]));
        catalog.register(TypeDescriptor::object("B", vec![Member::new("X", "i64")]));

        let mut registry = DefinitionRegistry::new();
        let pair_a = TypePair::new("A", "B");
        let pair_b = TypePair::new("B", "A");
        let mut def_a = Definition::new(pair_a.clone());
        def_a
            .add(Fragment::auto_match(pair_a.clone(), AutoMatchStrategy::exact()))
            .unwrap();
        registry.register(def_a);
        registry.register(Definition::new(pair_b.clone()));

        let forge = Forge::new(Arc::new(registry), Arc::new(catalog));
        let units = forge.compile_all().unwrap();
        use crate::injection::Injection;
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].pair(), &pair_a);
        assert_eq!(units[1].pair(), &pair_b);
    }
}
