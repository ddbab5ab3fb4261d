// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type descriptors describing the structure of runtime values.
//!
//! The graph never inspects values on its own: it asks a
//! [`TypeDescriptorProvider`] whether a type is a scalar, an atomic leaf, a
//! plain object with members, a collection or a dictionary. [`TypeRegistry`]
//! is the default provider, filled in code or loaded from a RON schema table.

use crate::error::{QuantumError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Names of the built-in types known by every [`TypeRegistry`]
pub mod builtin {
    /// Root of every type hierarchy
    pub const OBJECT: &str = "object";
    /// Boolean scalar
    pub const BOOL: &str = "bool";
    /// Signed integer scalar
    pub const INT: &str = "int";
    /// Unsigned integer scalar
    pub const UINT: &str = "uint";
    /// Floating point scalar
    pub const FLOAT: &str = "float";
    /// Character scalar
    pub const CHAR: &str = "char";
    /// Text string
    pub const STRING: &str = "string";
    /// Arbitrary-precision decimal
    pub const DECIMAL: &str = "decimal";
    /// Globally unique identifier
    pub const GUID: &str = "guid";

    /// Built-in scalar types
    pub const SCALARS: [&str; 5] = [BOOL, INT, UINT, FLOAT, CHAR];

    /// Atomic types always treated as primitive by the node builder
    pub const ATOMICS: [&str; 3] = [STRING, DECIMAL, GUID];
}

/// Name of a runtime type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeKey(pub String);

impl TypeKey {
    /// Create a type key
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The root `object` type
    pub fn object() -> Self {
        Self::new(builtin::OBJECT)
    }

    /// Type name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether this is the root `object` type
    pub fn is_object(&self) -> bool {
        self.0 == builtin::OBJECT
    }

    /// Check whether this names one of the built-in types
    pub fn is_builtin(&self) -> bool {
        self.is_object()
            || builtin::SCALARS.contains(&self.as_str())
            || builtin::ATOMICS.contains(&self.as_str())
    }
}

impl From<&str> for TypeKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named member of an object type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDescriptor {
    /// Member name
    pub name: String,
    /// Declared (static) type of the member
    pub ty: TypeKey,
}

impl MemberDescriptor {
    /// Create a member descriptor
    pub fn new(name: impl Into<String>, ty: impl Into<TypeKey>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// Structural category of a type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    /// Built-in scalar
    Scalar,
    /// Enumeration
    Enum {
        /// Variant names
        variants: Vec<String>,
    },
    /// Opaque leaf value without members
    Atomic,
    /// Plain object with named members
    Object {
        /// Members declared by this type, excluding base members
        members: Vec<MemberDescriptor>,
    },
    /// Sequence of items
    Collection {
        /// Declared item type
        element: TypeKey,
        /// Whether items can be addressed by position
        indexed: bool,
    },
    /// Key/value mapping
    Dictionary {
        /// Declared key type
        key: TypeKey,
        /// Declared value type
        value: TypeKey,
    },
}

/// Structural description of a runtime type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Type name
    pub key: TypeKey,
    /// Structural category
    pub kind: TypeKind,
    /// Whether instances have value semantics and cannot be aliased
    #[serde(default)]
    pub value_type: bool,
    /// Base type, for assignability checks
    #[serde(default)]
    pub base: Option<TypeKey>,
}

impl TypeDescriptor {
    fn with_kind(key: impl Into<TypeKey>, kind: TypeKind) -> Self {
        Self {
            key: key.into(),
            kind,
            value_type: false,
            base: None,
        }
    }

    /// Describe a built-in scalar
    pub fn scalar(key: impl Into<TypeKey>) -> Self {
        Self::with_kind(key, TypeKind::Scalar).as_value_type()
    }

    /// Describe an opaque atomic type
    pub fn atomic(key: impl Into<TypeKey>) -> Self {
        Self::with_kind(key, TypeKind::Atomic)
    }

    /// Describe an enumeration
    pub fn enumeration<S: Into<String>>(
        key: impl Into<TypeKey>,
        variants: impl IntoIterator<Item = S>,
    ) -> Self {
        let variants = variants.into_iter().map(Into::into).collect();
        Self::with_kind(key, TypeKind::Enum { variants }).as_value_type()
    }

    /// Describe a plain object type
    pub fn object(key: impl Into<TypeKey>, members: impl IntoIterator<Item = MemberDescriptor>) -> Self {
        Self::with_kind(
            key,
            TypeKind::Object {
                members: members.into_iter().collect(),
            },
        )
    }

    /// Describe an indexed collection type
    pub fn collection(key: impl Into<TypeKey>, element: impl Into<TypeKey>) -> Self {
        Self::with_kind(
            key,
            TypeKind::Collection {
                element: element.into(),
                indexed: true,
            },
        )
    }

    /// Describe a collection without positional access (sets, bags)
    pub fn unindexed_collection(key: impl Into<TypeKey>, element: impl Into<TypeKey>) -> Self {
        Self::with_kind(
            key,
            TypeKind::Collection {
                element: element.into(),
                indexed: false,
            },
        )
    }

    /// Describe a dictionary type
    pub fn dictionary(
        key: impl Into<TypeKey>,
        key_type: impl Into<TypeKey>,
        value_type: impl Into<TypeKey>,
    ) -> Self {
        Self::with_kind(
            key,
            TypeKind::Dictionary {
                key: key_type.into(),
                value: value_type.into(),
            },
        )
    }

    /// Mark as a value type
    pub fn as_value_type(mut self) -> Self {
        self.value_type = true;
        self
    }

    /// Set the base type
    pub fn with_base(mut self, base: impl Into<TypeKey>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Check whether this is a collection or a dictionary
    pub fn is_collection_like(&self) -> bool {
        matches!(self.kind, TypeKind::Collection { .. } | TypeKind::Dictionary { .. })
    }

    /// Item type of a collection, value type of a dictionary, the type itself otherwise
    pub fn inner_collection_type(&self) -> &TypeKey {
        match &self.kind {
            TypeKind::Collection { element, .. } => element,
            TypeKind::Dictionary { value, .. } => value,
            _ => &self.key,
        }
    }

    /// Element type of a collection or value type of a dictionary
    pub fn element_value_type(&self) -> Option<&TypeKey> {
        match &self.kind {
            TypeKind::Collection { element, .. } => Some(element),
            TypeKind::Dictionary { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Capability to describe runtime types
pub trait TypeDescriptorProvider: Send + Sync {
    /// Find the descriptor of a type
    fn find(&self, key: &TypeKey) -> Option<Arc<TypeDescriptor>>;

    /// Find the descriptor of a type, failing on unknown types
    fn describe(&self, key: &TypeKey) -> Result<Arc<TypeDescriptor>> {
        self.find(key)
            .ok_or_else(|| QuantumError::UnknownType(key.clone()))
    }

    /// Check whether a value of type `source` can be stored where `target` is declared
    fn is_assignable_from(&self, target: &TypeKey, source: &TypeKey) -> bool {
        if target == source || target.is_object() {
            return true;
        }

        let mut seen = HashSet::new();
        let mut current = self.find(source).and_then(|d| d.base.clone());
        while let Some(key) = current {
            if &key == target {
                return true;
            }
            if !seen.insert(key.clone()) {
                break;
            }
            current = self.find(&key).and_then(|d| d.base.clone());
        }
        false
    }

    /// Members of an object type, base members first
    fn members_of(&self, descriptor: &TypeDescriptor) -> Result<Vec<MemberDescriptor>> {
        let mut chain = vec![descriptor.key.clone()];
        let mut current = descriptor.base.clone();
        while let Some(key) = current {
            if chain.contains(&key) {
                return Err(QuantumError::consistency(
                    "an acyclic base type chain",
                    format!("a cycle through {key}"),
                ));
            }
            current = self.describe(&key)?.base.clone();
            chain.push(key);
        }

        let mut members = Vec::new();
        for key in chain.iter().rev() {
            let described = if key == &descriptor.key {
                None
            } else {
                Some(self.describe(key)?)
            };
            let kind = described.as_deref().map_or(&descriptor.kind, |d| &d.kind);
            if let TypeKind::Object { members: declared } = kind {
                members.extend(declared.iter().cloned());
            }
        }
        Ok(members)
    }

    /// Check whether a type is a collection or a dictionary
    fn is_collection_like(&self, key: &TypeKey) -> bool {
        self.find(key).is_some_and(|d| d.is_collection_like())
    }
}

/// Registry of type descriptors
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    /// Registered descriptors by type name
    types: IndexMap<TypeKey, Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    /// Create a registry containing the built-in types
    pub fn new() -> Self {
        let mut types = IndexMap::new();
        let builtins = std::iter::once(TypeDescriptor::object(builtin::OBJECT, Vec::new()))
            .chain(builtin::SCALARS.iter().map(|s| TypeDescriptor::scalar(*s)))
            .chain([
                TypeDescriptor::atomic(builtin::STRING),
                TypeDescriptor::atomic(builtin::DECIMAL).as_value_type(),
                TypeDescriptor::atomic(builtin::GUID).as_value_type(),
            ]);
        for descriptor in builtins {
            types.insert(descriptor.key.clone(), Arc::new(descriptor));
        }
        Self { types }
    }

    /// Register a type, replacing any previous user descriptor with the same name
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Result<()> {
        if descriptor.key.is_builtin() {
            return Err(QuantumError::operation(format!(
                "the built-in type {} cannot be redefined",
                descriptor.key
            )));
        }
        self.types.insert(descriptor.key.clone(), Arc::new(descriptor));
        Ok(())
    }

    /// Register a type, builder style
    pub fn with(mut self, descriptor: TypeDescriptor) -> Result<Self> {
        self.register(descriptor)?;
        Ok(self)
    }

    /// Get a descriptor by name
    pub fn get(&self, key: &str) -> Option<&Arc<TypeDescriptor>> {
        self.types.get(&TypeKey::new(key))
    }

    /// Get all registered descriptors
    pub fn types(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.types.values()
    }

    /// Get the number of registered types, built-ins included
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check whether only the built-in types are registered
    pub fn is_empty(&self) -> bool {
        self.types.keys().all(TypeKey::is_builtin)
    }

    /// Load a registry from a RON schema table (a list of descriptors)
    pub fn from_ron(ron_str: &str) -> Result<Self> {
        let descriptors: Vec<TypeDescriptor> = ron::from_str(ron_str)?;
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Write the user-defined descriptors as a RON schema table
    pub fn to_ron(&self) -> Result<String> {
        let descriptors: Vec<&TypeDescriptor> = self
            .types
            .values()
            .filter(|d| !d.key.is_builtin())
            .map(|d| &**d)
            .collect();
        Ok(ron::ser::to_string_pretty(
            &descriptors,
            ron::ser::PrettyConfig::default(),
        )?)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeDescriptorProvider for TypeRegistry {
    fn find(&self, key: &TypeKey) -> Option<Arc<TypeDescriptor>> {
        self.types.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with(TypeDescriptor::object(
                "Component",
                [MemberDescriptor::new("Enabled", builtin::BOOL)],
            ))
            .and_then(|r| {
                r.with(
                    TypeDescriptor::object(
                        "Light",
                        [MemberDescriptor::new("Intensity", builtin::FLOAT)],
                    )
                    .with_base("Component"),
                )
            })
            .unwrap()
    }

    #[test]
    fn test_builtins_registered() {
        let mut registry = TypeRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.get("int").unwrap().kind, TypeKind::Scalar);
        assert!(registry.get("int").unwrap().value_type);
        assert!(!registry.get("string").unwrap().value_type);
        assert!(registry.register(TypeDescriptor::atomic("string")).is_err());
    }

    #[test]
    fn test_assignability_follows_base_chain() {
        let registry = registry();
        let light = TypeKey::new("Light");
        let component = TypeKey::new("Component");
        assert!(registry.is_assignable_from(&component, &light));
        assert!(!registry.is_assignable_from(&light, &component));
        assert!(registry.is_assignable_from(&TypeKey::object(), &light));
    }

    #[test]
    fn test_members_include_base_first() {
        let registry = registry();
        let light = registry.describe(&TypeKey::new("Light")).unwrap();
        let names: Vec<_> = registry
            .members_of(&light)
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Enabled", "Intensity"]);
    }

    #[test]
    fn test_schema_serialization() {
        let registry = registry()
            .with(TypeDescriptor::dictionary("Lookup", builtin::STRING, "Light"))
            .unwrap();
        let ron = registry.to_ron().unwrap();
        let loaded = TypeRegistry::from_ron(&ron).unwrap();
        assert_eq!(loaded.len(), registry.len());
        assert_eq!(loaded.get("Lookup"), registry.get("Lookup"));
    }

    #[test]
    fn test_unknown_type() {
        let registry = TypeRegistry::new();
        assert!(matches!(
            registry.describe(&TypeKey::new("Missing")),
            Err(QuantumError::UnknownType(_))
        ));
    }
}
