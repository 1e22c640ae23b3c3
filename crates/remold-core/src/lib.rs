//! Remold Core - fragment-driven object-to-object mapping engine
//!
//! This crate compiles declarative mapping definitions into reusable
//! transform/merge units. A definition is an ordered sequence of fragments
//! (construction strategy, null-source strategy, auto member matching,
//! inheritance links, lifecycle triggers) for one (source, target) type pair;
//! the forge lowers it into an executable instruction list, and an injection
//! store indexes the compiled units for recursive resolution at run time.
//!
//! # Main Components
//!
//! - **Fragment model**: immutable value objects describing one mapping decision
//! - **Definitions & Registry**: ordered fragment sets and their lookup table
//! - **Forge**: the staged compilation pipeline producing compiled injections
//! - **Collection merge**: identity-preserving reconciliation of sequences
//! - **Injection store**: the chain of resolvers consulted at run time
//!
//! # Example
//!
//! ```
//! use remold_core::{
//!     CompositeStore, CustomInjectionStore, DefinitionRegistry, Forge,
//!     InjectionBuilder, Member, Result, TypeCatalog, TypeDescriptor, TypePair,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! fn example() -> Result<()> {
//!     let mut catalog = TypeCatalog::with_primitives();
//!     catalog.register(TypeDescriptor::object(
//!         "Person",
//!         vec![Member::new("Name", "String")],
//!     ));
//!     catalog.register(TypeDescriptor::object(
//!         "PersonDto",
//!         vec![Member::new("Name", "String")],
//!     ));
//!     let catalog = Arc::new(catalog);
//!
//!     let definition = InjectionBuilder::new("Person", "PersonDto")
//!         .auto_exact()
//!         .build()?;
//!     let mut registry = DefinitionRegistry::new();
//!     let definition = registry.register(definition);
//!
//!     let forge = Forge::new(Arc::new(registry), Arc::clone(&catalog));
//!     let mut custom = CustomInjectionStore::new();
//!     custom.register(Arc::new(forge.compile(&definition)?));
//!     let store = Arc::new(CompositeStore::standard(custom, Arc::clone(&catalog)));
//!
//!     let pair = TypePair::new("Person", "PersonDto");
//!     let dto = remold_core::transform(&store, &catalog, &pair, &json!({"Name": "hi"}))?;
//!     assert_eq!(dto, json!({"Name": "hi"}));
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod automatch;
pub mod builder;
pub mod collections;
pub mod context;
pub mod convert;
pub mod definition;
pub mod error;
pub mod forge;
pub mod fragment;
pub mod injection;
pub mod instances;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use automatch::{AutoMatchOptions, AutoMatchStrategy, NAME_PLACEHOLDER};
pub use builder::InjectionBuilder;
pub use collections::{
    merge_collections, FinderFactory, KeyTargetFinder, NullTargetFinder, TargetFinder,
    TargetFinderStore,
};
pub use context::{Culture, InjectionContext, InjectionHint, ID_FIELD, TYPE_FIELD};
pub use convert::convert_primitive;
pub use definition::{Definition, DefinitionRegistry};
pub use error::{Error, Result};
pub use forge::{CompiledInjection, Forge, Instruction, MemberResolution};
pub use fragment::{
    ConstructionStrategy, Fragment, FragmentId, FragmentKind, NullSourceStrategy,
};
pub use injection::{Injection, MergeOutcome, PostMergeAction, TriggerCause, TriggerParams};
pub use instances::InstanceRegistry;
pub use store::{
    CompositeStore, ConvertibleStore, CustomInjectionStore, InjectionStore,
    SequenceToArrayStore, SequenceToSequenceStore,
};
pub use types::{Member, TypeCatalog, TypeDescriptor, TypeKind, TypeName, TypePair};

use serde_json::Value;
use std::sync::Arc;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn context_for(store: &Arc<CompositeStore>, catalog: &Arc<TypeCatalog>) -> InjectionContext {
    let mut context = InjectionContext::new(
        Arc::clone(store) as Arc<dyn InjectionStore>,
        Arc::clone(catalog),
    );
    if let Ok(finders) = store.resolve_instance::<TargetFinderStore>() {
        context = context.with_finders(finders);
    }
    context
}

/// Resolve and run a transform for `pair` with a fresh context
pub fn transform(
    store: &Arc<CompositeStore>,
    catalog: &Arc<TypeCatalog>,
    pair: &TypePair,
    source: &Value,
) -> Result<Value> {
    let unit = store.resolve_required(pair)?;
    let mut context = context_for(store, catalog);
    unit.transform(source, &mut context, InjectionHint::None)
}

/// Resolve and run a merge for `pair` with a fresh context
pub fn merge(
    store: &Arc<CompositeStore>,
    catalog: &Arc<TypeCatalog>,
    pair: &TypePair,
    source: &Value,
    existing: Value,
) -> Result<MergeOutcome> {
    let unit = store.resolve_required(pair)?;
    let mut context = context_for(store, catalog);
    unit.merge(source, existing, &mut context, InjectionHint::None)
}
