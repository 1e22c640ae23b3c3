//! Core type model for the Remold mapping engine
//!
//! Remold operates on dynamic `serde_json::Value` instances; the shape of the
//! application's data model is described by `TypeDescriptor`s registered in a
//! `TypeCatalog` at configuration time. Every mapping artifact (fragment,
//! definition, compiled injection, store entry) is indexed by a `TypePair`.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Name of a modelled type ("Person", "PersonDto", "i64", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(pub String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        TypeName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        TypeName(s.to_string())
    }
}

impl From<String> for TypeName {
    fn from(s: String) -> Self {
        TypeName(s)
    }
}

/// A (source type, target type) pair - the universal indexing key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypePair {
    pub source: TypeName,
    pub target: TypeName,
}

impl TypePair {
    pub fn new(source: impl Into<TypeName>, target: impl Into<TypeName>) -> Self {
        TypePair {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for TypePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// Kind of a modelled type, deciding which conversion machinery applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    /// Value semantics, no identity (numbers, strings, booleans)
    Primitive,
    /// Composite with named members
    Object,
    /// Growable, mergeable collection of elements
    Sequence,
    /// Fixed snapshot collection, always rebuilt rather than merged
    Array,
}

/// One member (field/property) of an `Object` type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Member name as it appears in instance values
    pub name: String,
    /// Declared type of the member's value
    pub type_name: TypeName,
    /// Whether the member can supply a value during matching
    #[serde(default = "default_true")]
    pub readable: bool,
    /// Whether the member can be assigned during injection
    #[serde(default = "default_true")]
    pub writable: bool,
}

fn default_true() -> bool {
    true
}

impl Member {
    pub fn new(name: impl Into<String>, type_name: impl Into<TypeName>) -> Self {
        Member {
            name: name.into(),
            type_name: type_name.into(),
            readable: true,
            writable: true,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.readable = false;
        self
    }
}

/// Description of one modelled type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: TypeName,
    pub kind: TypeKind,
    /// Members, for `Object` kinds; empty otherwise
    #[serde(default)]
    pub members: Vec<Member>,
    /// Element type, for `Sequence`/`Array` kinds
    #[serde(default)]
    pub element: Option<TypeName>,
    /// Sealed object types have no derived runtime types, so member
    /// resolution for them can stay static
    #[serde(default)]
    pub sealed: bool,
}

impl TypeDescriptor {
    /// Describe a primitive (value-semantics) type
    pub fn primitive(name: impl Into<TypeName>) -> Self {
        TypeDescriptor {
            name: name.into(),
            kind: TypeKind::Primitive,
            members: Vec::new(),
            element: None,
            sealed: true,
        }
    }

    /// Describe a composite object type with the given members
    pub fn object(name: impl Into<TypeName>, members: Vec<Member>) -> Self {
        TypeDescriptor {
            name: name.into(),
            kind: TypeKind::Object,
            members,
            element: None,
            sealed: false,
        }
    }

    /// Describe a mergeable sequence of `element` values
    pub fn sequence(name: impl Into<TypeName>, element: impl Into<TypeName>) -> Self {
        TypeDescriptor {
            name: name.into(),
            kind: TypeKind::Sequence,
            members: Vec::new(),
            element: Some(element.into()),
            sealed: true,
        }
    }

    /// Describe a fixed array of `element` values
    pub fn array(name: impl Into<TypeName>, element: impl Into<TypeName>) -> Self {
        TypeDescriptor {
            name: name.into(),
            kind: TypeKind::Array,
            members: Vec::new(),
            element: Some(element.into()),
            sealed: true,
        }
    }

    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Registry of all modelled types, built once at configuration time
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    descriptors: HashMap<TypeName, TypeDescriptor>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog pre-seeded with the standard primitive types
    pub fn with_primitives() -> Self {
        let mut catalog = Self::new();
        for name in ["bool", "i64", "u64", "f64", "String"] {
            catalog.register(TypeDescriptor::primitive(name));
        }
        catalog
    }

    /// Register a descriptor; a later registration for the same name replaces
    /// the earlier one
    pub fn register(&mut self, descriptor: TypeDescriptor) {
        self.descriptors.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, name: &TypeName) -> Option<&TypeDescriptor> {
        self.descriptors.get(name)
    }

    pub fn kind_of(&self, name: &TypeName) -> Option<TypeKind> {
        self.descriptors.get(name).map(|d| d.kind)
    }

    /// Whether `name` names a primitive (value-semantics) type
    pub fn is_primitive(&self, name: &TypeName) -> bool {
        matches!(self.kind_of(name), Some(TypeKind::Primitive))
    }

    /// Whether member values of this type can be resolved statically:
    /// primitives and sealed objects never carry a more-derived runtime type
    pub fn is_statically_resolvable(&self, name: &TypeName) -> bool {
        match self.get(name) {
            Some(d) => matches!(d.kind, TypeKind::Primitive) || d.sealed,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_pair_display() {
        let pair = TypePair::new("Person", "PersonDto");
        assert_eq!(pair.to_string(), "Person -> PersonDto");
    }

    #[test]
    fn test_catalog_lookup() {
        let mut catalog = TypeCatalog::with_primitives();
        catalog.register(TypeDescriptor::object(
            "Person",
            vec![Member::new("Name", "String"), Member::new("Age", "i64")],
        ));

        assert!(catalog.is_primitive(&"i64".into()));
        assert!(!catalog.is_primitive(&"Person".into()));
        let person = catalog.get(&"Person".into()).unwrap();
        assert_eq!(person.member("Name").unwrap().type_name, "String".into());
        assert!(person.member("Missing").is_none());
    }

    #[test]
    fn test_later_registration_replaces() {
        let mut catalog = TypeCatalog::new();
        catalog.register(TypeDescriptor::object("T", vec![Member::new("A", "String")]));
        catalog.register(TypeDescriptor::object("T", vec![Member::new("B", "String")]));
        let t = catalog.get(&"T".into()).unwrap();
        assert!(t.member("A").is_none());
        assert!(t.member("B").is_some());
    }

    #[test]
    fn test_static_resolvability() {
        let mut catalog = TypeCatalog::with_primitives();
        catalog.register(TypeDescriptor::object("Open", vec![]));
        catalog.register(TypeDescriptor::object("Closed", vec![]).sealed());

        assert!(catalog.is_statically_resolvable(&"f64".into()));
        assert!(catalog.is_statically_resolvable(&"Closed".into()));
        assert!(!catalog.is_statically_resolvable(&"Open".into()));
    }

    #[test]
    fn test_member_access_flags() {
        let m = Member::new("Secret", "String").write_only();
        assert!(!m.readable);
        assert!(m.writable);
    }
}
