//! Mapping definitions and their registry
//!
//! A `Definition` is the ordered, append-only fragment list for one
//! (source, target) type pair. The `DefinitionRegistry` holds every live
//! definition and answers the reverse-order lookups the compilation pipeline
//! issues while resolving inheritance links.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::fragment::Fragment;
use crate::types::TypePair;
use std::sync::Arc;

/// Ordered fragment set for one (source, target) pair
#[derive(Debug, Clone)]
pub struct Definition {
    pair: TypePair,
    fragments: Vec<Arc<Fragment>>,
}

impl Definition {
    pub fn new(pair: TypePair) -> Self {
        Definition {
            pair,
            fragments: Vec::new(),
        }
    }

    pub fn pair(&self) -> &TypePair {
        &self.pair
    }

    /// Append a fragment. Fails with `InvalidArgument` unless the fragment's
    /// (source, target) pair equals the definition's: a mismatched fragment
    /// is a programming error in the mapping configuration and is rejected
    /// here rather than at compile time.
    pub fn add(&mut self, fragment: Fragment) -> Result<()> {
        if fragment.pair() != &self.pair {
            return Err(Error::invalid_argument(
                "fragment",
                format!(
                    "fragment pair {} does not match definition pair {}",
                    fragment.pair(),
                    self.pair
                ),
            ));
        }
        self.fragments.push(Arc::new(fragment));
        Ok(())
    }

    pub fn fragments(&self) -> &[Arc<Fragment>] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Append-only collection of all live definitions
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    definitions: Vec<Arc<Definition>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: Definition) -> Arc<Definition> {
        let definition = Arc::new(definition);
        self.definitions.push(Arc::clone(&definition));
        definition
    }

    /// Find the definition for `pair`, scanning in reverse insertion order:
    /// when several definitions were registered for the same pair, the most
    /// recent one wins. Inheritance resolution relies on this contract.
    pub fn find(&self, pair: &TypePair) -> Option<Arc<Definition>> {
        self.definitions
            .iter()
            .rev()
            .find(|d| d.pair() == pair)
            .cloned()
    }

    pub fn definitions(&self) -> &[Arc<Definition>] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
