//! Instance registry: type-keyed singleton carrier
//!
//! Cross-cutting collaborators (target-finder stores, sequence factories) are
//! registered here at configuration time and pulled out during store
//! construction. Multiple registrations per type are kept in order;
//! single-instance resolution returns the last registered one.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct InstanceRegistry {
    instances: HashMap<TypeId, Vec<Arc<dyn Any + Send + Sync>>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Any + Send + Sync>(&mut self, instance: Arc<T>) {
        self.instances
            .entry(TypeId::of::<T>())
            .or_default()
            .push(instance);
    }

    /// All registered instances of `T`, in registration order
    pub fn resolve_all<T: Any + Send + Sync>(&self) -> Vec<Arc<T>> {
        self.instances
            .get(&TypeId::of::<T>())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| Arc::clone(e).downcast::<T>().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The last registered instance of `T`; fails when none was registered
    pub fn resolve<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        self.instances
            .get(&TypeId::of::<T>())
            .and_then(|entries| entries.last())
            .and_then(|e| Arc::clone(e).downcast::<T>().ok())
            .ok_or_else(|| {
                Error::invalid_argument(
                    "type",
                    format!("no instance registered for {}", std::any::type_name::<T>()),
                )
            })
    }
}

impl std::fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("types", &self.instances.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_last_wins() {
        let mut registry = InstanceRegistry::new();
        registry.register(Arc::new("first".to_string()));
        registry.register(Arc::new("second".to_string()));

        let resolved = registry.resolve::<String>().unwrap();
        assert_eq!(*resolved, "second");
    }

    #[test]
    fn test_resolve_all_keeps_order() {
        let mut registry = InstanceRegistry::new();
        registry.register(Arc::new(1u32));
        registry.register(Arc::new(2u32));

        let all = registry.resolve_all::<u32>();
        assert_eq!(all.iter().map(|v| **v).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_resolve_missing_fails() {
        let registry = InstanceRegistry::new();
        assert!(matches!(
            registry.resolve::<String>(),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(registry.resolve_all::<String>().is_empty());
    }
}
