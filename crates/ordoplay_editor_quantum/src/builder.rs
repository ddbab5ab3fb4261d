// SPDX-License-Identifier: MIT OR Apache-2.0
//! Construction of sealed object nodes from runtime values.
//!
//! The builder walks one root value top-down, keeping the nodes under
//! construction on an explicit context stack. Members are appended to the
//! object frame on top of the stack; once the walk of the root completes the
//! frame is popped and sealed.
//!
//! Values reached by reference are never expanded here: each member or item
//! holding an object only records an [`ObjectReference`], and the
//! [`NodeContainer`](crate::NodeContainer) builds the target nodes later. This
//! keeps a single build bounded even on cyclic structures.

use crate::container::ContainerShared;
use crate::descriptor::{builtin, TypeDescriptor, TypeDescriptorProvider, TypeKey, TypeKind};
use crate::error::{QuantumError, Result};
use crate::ident::NodeId;
use crate::index::NodeIndex;
use crate::node::{InitializingMemberNode, InitializingObjectNode, ObjectNode};
use crate::reference::{ObjectReference, Reference, ReferenceEnumerable};
use crate::value::{InstanceData, ObjectRef, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};

/// Node builder configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeBuilderSettings {
    /// Additional types treated as atomic leaves
    #[serde(default)]
    pub primitive_types: Vec<TypeKey>,
}

impl NodeBuilderSettings {
    /// Load settings from RON
    pub fn from_ron(ron_str: &str) -> Result<Self> {
        Ok(ron::from_str(ron_str)?)
    }
}

/// A node under construction
#[derive(Debug)]
enum ContextFrame {
    Object(InitializingObjectNode),
    Member(InitializingMemberNode),
}

/// Builds sealed [`ObjectNode`]s by introspecting values
pub struct NodeBuilder {
    /// Type introspection capability
    provider: Arc<dyn TypeDescriptorProvider>,
    /// Container the built nodes will belong to
    container: Weak<ContainerShared>,
    /// Nodes under construction, innermost last
    context_stack: Vec<ContextFrame>,
    /// Nodes of the last build holding references
    reference_contents: Vec<NodeId>,
    /// Types treated as atomic leaves besides scalars and enums
    primitive_types: Vec<TypeKey>,
    /// Identity assigned to the root of the current build
    root_id: NodeId,
}

impl NodeBuilder {
    /// Create a builder whose nodes do not belong to any container
    pub fn new(provider: Arc<dyn TypeDescriptorProvider>) -> Self {
        Self::with_container(provider, Weak::new())
    }

    pub(crate) fn with_container(
        provider: Arc<dyn TypeDescriptorProvider>,
        container: Weak<ContainerShared>,
    ) -> Self {
        Self {
            provider,
            container,
            context_stack: Vec::new(),
            reference_contents: Vec::new(),
            primitive_types: builtin::ATOMICS.iter().map(|t| TypeKey::new(*t)).collect(),
            root_id: NodeId::empty(),
        }
    }

    /// Apply builder settings
    pub fn apply_settings(&mut self, settings: &NodeBuilderSettings) {
        for ty in &settings.primitive_types {
            self.register_primitive_type(ty.clone());
        }
    }

    /// Type introspection capability used by this builder
    pub fn provider(&self) -> &Arc<dyn TypeDescriptorProvider> {
        &self.provider
    }

    /// Clear all traversal state so the builder can produce another graph
    pub fn reset(&mut self) {
        self.context_stack.clear();
        self.reference_contents.clear();
        self.root_id = NodeId::empty();
    }

    /// Nodes of the last build that hold references
    pub fn reference_contents(&self) -> &[NodeId] {
        &self.reference_contents
    }

    /// Treat a type (and the types assignable to it) as an atomic leaf
    pub fn register_primitive_type(&mut self, ty: TypeKey) {
        if self.is_intrinsic_primitive(&ty) || self.primitive_types.contains(&ty) {
            return;
        }
        self.primitive_types.push(ty);
    }

    /// Stop treating a registered type as an atomic leaf
    pub fn unregister_primitive_type(&mut self, ty: &TypeKey) -> Result<()> {
        if self.is_intrinsic_primitive(ty) || builtin::ATOMICS.contains(&ty.as_str()) {
            return Err(QuantumError::operation(format!(
                "the type {ty} cannot be unregistered from the list of primitive types"
            )));
        }
        self.primitive_types.retain(|t| t != ty);
        Ok(())
    }

    /// Check whether values of a type are atomic leaves of the graph
    pub fn is_primitive_type(&self, ty: &TypeKey) -> bool {
        self.is_intrinsic_primitive(ty)
            || self
                .primitive_types
                .iter()
                .any(|primitive| self.provider.is_assignable_from(primitive, ty))
    }

    fn is_intrinsic_primitive(&self, ty: &TypeKey) -> bool {
        self.provider
            .find(ty)
            .is_some_and(|d| matches!(d.kind, TypeKind::Scalar | TypeKind::Enum { .. }))
    }

    /// Build the sealed node of a root value
    pub fn build(&mut self, value: &Value, id: NodeId) -> Result<Arc<ObjectNode>> {
        if value.is_null() {
            return Err(QuantumError::argument("cannot build a node for a null value"));
        }
        self.reset();
        self.root_id = id;
        let result = self.visit_root(value);
        if result.is_err() {
            self.reset();
        }
        result
    }

    /// Decide how a slot holding `value` with declared type `ty` points to it
    ///
    /// Members hold an object reference whenever their declared type is not
    /// primitive. Other values hold item references when they are
    /// collections or dictionaries of non-primitive items.
    pub fn create_reference_for_node(
        &self,
        ty: &TypeKey,
        value: &Value,
        is_member: bool,
    ) -> Result<Option<Reference>> {
        if is_member {
            Ok(self.member_reference(ty, value)?.map(Reference::Object))
        } else {
            Ok(self.item_references(value)?.map(Reference::Enumerable))
        }
    }

    fn member_reference(&self, ty: &TypeKey, value: &Value) -> Result<Option<ObjectReference>> {
        if self.is_primitive_type(ty) {
            return Ok(None);
        }
        if let Some(actual) = value.type_key() {
            if !self.provider.is_assignable_from(ty, &actual) {
                return Err(QuantumError::argument(format!(
                    "a value of type {actual} cannot be stored in a member of type {ty}"
                )));
            }
        }
        Ok(Some(ObjectReference::new(
            value.clone(),
            ty.clone(),
            NodeIndex::Empty,
            true,
        )))
    }

    fn item_references(&self, value: &Value) -> Result<Option<ReferenceEnumerable>> {
        let Some(object) = value.as_object() else {
            return Ok(None);
        };
        let descriptor = self.provider.describe(&object.type_key())?;
        self.check_collection_shape(&descriptor)?;
        let Some(element) = descriptor.element_value_type() else {
            return Ok(None);
        };
        if self.is_primitive_type(element) {
            return Ok(None);
        }

        let items: Vec<(NodeIndex, Value)> = match &object.read().data {
            InstanceData::Items(items) => items
                .iter()
                .enumerate()
                .map(|(position, item)| (NodeIndex::Position(position), item.clone()))
                .collect(),
            InstanceData::Entries(entries) => entries
                .iter()
                .map(|(key, item)| (NodeIndex::Key(key.clone()), item.clone()))
                .collect(),
            InstanceData::Fields(_) => {
                return Err(QuantumError::consistency(
                    format!("items for collection type {}", descriptor.key),
                    "named fields",
                ))
            }
        };
        Ok(Some(ReferenceEnumerable::new(element.clone(), items)))
    }

    fn check_collection_shape(&self, descriptor: &TypeDescriptor) -> Result<()> {
        match &descriptor.kind {
            TypeKind::Collection { indexed: false, .. } => Err(QuantumError::consistency(
                "a collection with indexed item access",
                format!("{} without item indexer", descriptor.key),
            )),
            TypeKind::Dictionary { key, .. } if !self.is_primitive_type(key) => {
                Err(QuantumError::consistency(
                    "a dictionary with a primitive key type",
                    format!("{} keyed by {key}", descriptor.key),
                ))
            }
            _ => Ok(()),
        }
    }

    fn visit_root(&mut self, value: &Value) -> Result<Arc<ObjectNode>> {
        let ty = value
            .type_key()
            .ok_or_else(|| QuantumError::argument("cannot build a node for a null value"))?;
        let descriptor = self.provider.describe(&ty)?;
        let item_references = self.item_references(value)?;

        if item_references.is_some() && descriptor.value_type {
            return Err(QuantumError::consistency(
                "a collection type",
                format!("the structure type {ty}"),
            ));
        }
        if item_references.is_some() {
            self.reference_contents.push(self.root_id);
        }

        tracing::debug!(id = %self.root_id, ty = %ty, "building object node");
        self.context_stack.push(ContextFrame::Object(InitializingObjectNode {
            id: self.root_id,
            descriptor: descriptor.clone(),
            value: value.clone(),
            boxed: descriptor.value_type,
            item_references,
            members: Vec::new(),
        }));

        if !self.is_primitive_type(&ty) {
            self.visit(value, &descriptor, true)?;
        }

        match self.context_stack.pop() {
            Some(ContextFrame::Object(root)) if self.context_stack.is_empty() => {
                Ok(root.seal(self.container.clone()))
            }
            _ => Err(QuantumError::consistency(
                "the root object node on top of the context stack",
                "an unbalanced context stack",
            )),
        }
    }

    fn visit(&mut self, value: &Value, descriptor: &TypeDescriptor, visit_members: bool) -> Result<()> {
        match &descriptor.kind {
            TypeKind::Object { .. } if visit_members => self.visit_object_members(value, descriptor),
            TypeKind::Scalar | TypeKind::Enum { .. } | TypeKind::Atomic | TypeKind::Object { .. } => {
                Ok(())
            }
            TypeKind::Collection { element, .. } => {
                self.check_collection_shape(descriptor)?;
                // Items are only walked when they are collections themselves
                if self.provider.is_collection_like(element) {
                    for item in items_of(value, descriptor)? {
                        self.visit_nested(&item)?;
                    }
                }
                Ok(())
            }
            TypeKind::Dictionary { value: value_type, .. } => {
                self.check_collection_shape(descriptor)?;
                if self.provider.is_collection_like(value_type) {
                    for item in items_of(value, descriptor)? {
                        self.visit_nested(&item)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn visit_nested(&mut self, value: &Value) -> Result<()> {
        let Some(ty) = value.type_key() else {
            return Ok(());
        };
        if self.is_primitive_type(&ty) {
            return Ok(());
        }
        let descriptor = self.provider.describe(&ty)?;
        self.visit(value, &descriptor, false)
    }

    fn visit_object_members(&mut self, value: &Value, descriptor: &TypeDescriptor) -> Result<()> {
        let object = value.as_object().ok_or_else(|| {
            QuantumError::consistency(format!("an instance of {}", descriptor.key), value.to_string())
        })?;

        for member in self.provider.members_of(descriptor)? {
            let member_value = object.read().field(&member.name).cloned().unwrap_or_default();
            self.visit_object_member(object, &member.name, &member.ty, member_value)?;
        }
        Ok(())
    }

    fn visit_object_member(
        &mut self,
        owner_value: &ObjectRef,
        name: &str,
        ty: &TypeKey,
        value: Value,
    ) -> Result<()> {
        let owner = match self.context_stack.last() {
            Some(ContextFrame::Object(node)) => node.id,
            _ => {
                return Err(QuantumError::consistency(
                    "an object node owning the member",
                    format!("a member node owning {name}"),
                ))
            }
        };
        let descriptor = self.provider.describe(ty)?;
        let target_reference = self.member_reference(ty, &value)?;
        let id = NodeId::new();
        let is_reference = target_reference.is_some();
        if is_reference {
            self.reference_contents.push(id);
        }
        tracing::trace!(member = name, ty = %ty, is_reference, "discovered member");

        self.context_stack.push(ContextFrame::Member(InitializingMemberNode {
            id,
            name: name.to_string(),
            owner,
            owner_value: owner_value.clone(),
            descriptor,
            target_reference,
        }));
        if !is_reference {
            // Inline values are enriched in place; referenced ones are left to the container
            self.visit_nested(&value)?;
        }
        let Some(ContextFrame::Member(member)) = self.context_stack.pop() else {
            return Err(QuantumError::consistency(
                format!("the member node {name} on top of the context stack"),
                "an unbalanced context stack",
            ));
        };

        let sealed = member.seal(self.container.clone());
        match self.context_stack.last_mut() {
            Some(ContextFrame::Object(node)) => {
                node.add_member(sealed);
                Ok(())
            }
            _ => Err(QuantumError::consistency(
                "an object node owning the member",
                "an unbalanced context stack",
            )),
        }
    }
}

impl fmt::Debug for NodeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeBuilder")
            .field("primitive_types", &self.primitive_types)
            .field("depth", &self.context_stack.len())
            .field("reference_contents", &self.reference_contents.len())
            .finish()
    }
}

fn items_of(value: &Value, descriptor: &TypeDescriptor) -> Result<Vec<Value>> {
    let object = value.as_object().ok_or_else(|| {
        QuantumError::consistency(format!("an instance of {}", descriptor.key), value.to_string())
    })?;
    let instance = object.read();
    match &instance.data {
        InstanceData::Items(items) => Ok(items.clone()),
        InstanceData::Entries(entries) => Ok(entries.values().cloned().collect()),
        InstanceData::Fields(_) => Err(QuantumError::consistency(
            format!("items for collection type {}", descriptor.key),
            "named fields",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{MemberDescriptor, TypeRegistry};
    use crate::value::{IndexKey, Instance};

    fn provider() -> Arc<dyn TypeDescriptorProvider> {
        let mut registry = TypeRegistry::new();
        let types = [
            TypeDescriptor::object(
                "Transform",
                [
                    MemberDescriptor::new("X", builtin::FLOAT),
                    MemberDescriptor::new("Y", builtin::FLOAT),
                ],
            )
            .as_value_type(),
            TypeDescriptor::object(
                "Entity",
                [
                    MemberDescriptor::new("Name", builtin::STRING),
                    MemberDescriptor::new("Transform", "Transform"),
                    MemberDescriptor::new("Components", "ComponentList"),
                    MemberDescriptor::new("Layer", "Layer"),
                ],
            ),
            TypeDescriptor::object("Component", [MemberDescriptor::new("Enabled", builtin::BOOL)]),
            TypeDescriptor::enumeration("Layer", ["Default", "UI"]),
            TypeDescriptor::collection("ComponentList", "Component"),
            TypeDescriptor::collection("FloatList", builtin::FLOAT),
            TypeDescriptor::collection("Grid", "FloatList"),
            TypeDescriptor::collection("StructList", "Component").as_value_type(),
            TypeDescriptor::unindexed_collection("ComponentSet", "Component"),
            TypeDescriptor::collection("SetGrid", "ComponentSet"),
            TypeDescriptor::collection("MapGrid", "ByComponent"),
            TypeDescriptor::dictionary("ComponentMap", builtin::STRING, "Component"),
            TypeDescriptor::dictionary("ByComponent", "Component", builtin::INT),
        ];
        for ty in types {
            registry.register(ty).unwrap();
        }
        Arc::new(registry)
    }

    fn entity(name: &str) -> Value {
        Value::object(Instance::object(
            "Entity",
            [
                ("Name", Value::from(name)),
                (
                    "Transform",
                    Value::object(Instance::object(
                        "Transform",
                        [("X", Value::Float(1.0)), ("Y", Value::Float(2.0))],
                    )),
                ),
                (
                    "Components",
                    Value::object(Instance::collection(
                        "ComponentList",
                        [Value::object(Instance::object(
                            "Component",
                            [("Enabled", Value::Bool(true))],
                        ))],
                    )),
                ),
                ("Layer", Value::enumeration("Layer", "UI")),
            ],
        ))
    }

    #[test]
    fn test_build_object_members() {
        let mut builder = NodeBuilder::new(provider());
        let id = NodeId::new();
        let node = builder.build(&entity("Player"), id).unwrap();

        assert_eq!(node.id(), id);
        let names: Vec<_> = node.members().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["Name", "Transform", "Components", "Layer"]);
        assert!(!node.member("Name").unwrap().is_reference());
        assert!(node.member("Transform").unwrap().is_reference());
        assert!(node.member("Components").unwrap().is_reference());
        assert!(!node.member("Layer").unwrap().is_reference());
        assert!(node.members().iter().all(|m| m.owner_id() == id));
        assert_eq!(builder.reference_contents().len(), 2);
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut builder = NodeBuilder::new(provider());
        let first = builder.build(&entity("A"), NodeId::new()).unwrap();
        let second = builder.build(&entity("B"), NodeId::new()).unwrap();

        let shape = |node: &ObjectNode| -> Vec<(String, bool)> {
            node.members()
                .iter()
                .map(|m| (m.name().to_string(), m.is_reference()))
                .collect()
        };
        assert_eq!(shape(&first), shape(&second));
        assert_ne!(first.members()[0].id(), second.members()[0].id());
    }

    #[test]
    fn test_reference_classification_is_idempotent() {
        let builder = NodeBuilder::new(provider());
        let components = Value::object(Instance::collection("ComponentList", []));
        let ty = TypeKey::new("ComponentList");
        for _ in 0..3 {
            let member = builder.create_reference_for_node(&ty, &components, true).unwrap();
            assert!(matches!(member, Some(Reference::Object(_))));
            let standalone = builder.create_reference_for_node(&ty, &components, false).unwrap();
            assert!(matches!(standalone, Some(Reference::Enumerable(_))));
        }
        let floats = Value::object(Instance::collection("FloatList", [Value::Float(1.0)]));
        let standalone = builder
            .create_reference_for_node(&TypeKey::new("FloatList"), &floats, false)
            .unwrap();
        assert!(standalone.is_none());
        let primitive = builder
            .create_reference_for_node(&TypeKey::new("string"), &Value::from("a"), true)
            .unwrap();
        assert!(primitive.is_none());
    }

    #[test]
    fn test_collection_root_holds_item_references() {
        let mut builder = NodeBuilder::new(provider());
        let list = Value::object(Instance::collection(
            "ComponentList",
            [
                Value::object(Instance::object("Component", [("Enabled", Value::Bool(true))])),
                Value::Null,
            ],
        ));
        let node = builder.build(&list, NodeId::new()).unwrap();
        assert!(node.is_reference());
        assert!(node.members().is_empty());
        let references = node.item_references().unwrap();
        assert_eq!(references.len(), 2);
        assert!(references.get(&NodeIndex::Position(1)).unwrap().target_value().is_null());
    }

    #[test]
    fn test_nested_collections_are_visited() {
        let mut builder = NodeBuilder::new(provider());
        let row = Value::object(Instance::collection("FloatList", [Value::Float(0.5)]));
        let grid = Value::object(Instance::collection("Grid", [row]));
        let node = builder.build(&grid, NodeId::new()).unwrap();
        assert!(node.is_reference());
        assert_eq!(node.item_indices(), vec![NodeIndex::Position(0)]);
    }

    #[test]
    fn test_nested_collection_shapes_are_checked() {
        let mut builder = NodeBuilder::new(provider());
        let set = Value::object(Instance::collection("ComponentSet", []));
        let grid = Value::object(Instance::collection("SetGrid", [set]));
        let result = builder.build(&grid, NodeId::new());
        assert!(matches!(result, Err(QuantumError::Consistency { .. })));

        let map = Value::object(Instance::dictionary("ByComponent", []));
        let grid = Value::object(Instance::collection("MapGrid", [map]));
        let result = builder.build(&grid, NodeId::new());
        assert!(matches!(result, Err(QuantumError::Consistency { .. })));
        assert!(builder.reference_contents().is_empty());
    }

    #[test]
    fn test_unindexed_collection_rejected() {
        let mut builder = NodeBuilder::new(provider());
        let set = Value::object(Instance::collection("ComponentSet", []));
        let result = builder.build(&set, NodeId::new());
        assert!(matches!(result, Err(QuantumError::Consistency { .. })));
        assert!(builder.reference_contents().is_empty());
    }

    #[test]
    fn test_non_primitive_key_rejected() {
        let mut builder = NodeBuilder::new(provider());
        let map = Value::object(Instance::dictionary("ByComponent", []));
        let result = builder.build(&map, NodeId::new());
        assert!(matches!(result, Err(QuantumError::Consistency { .. })));
    }

    #[test]
    fn test_dictionary_items_keyed() {
        let mut builder = NodeBuilder::new(provider());
        let component = Value::object(Instance::object("Component", [("Enabled", Value::Bool(false))]));
        let map = Value::object(Instance::dictionary(
            "ComponentMap",
            [(IndexKey::String("light".to_string()), component.clone())],
        ));
        let node = builder.build(&map, NodeId::new()).unwrap();
        let index = NodeIndex::Key(IndexKey::String("light".to_string()));
        assert_eq!(node.retrieve(&index).unwrap(), component);
    }

    #[test]
    fn test_structure_collection_rejected() {
        let mut builder = NodeBuilder::new(provider());
        let list = Value::object(Instance::collection("StructList", []));
        let result = builder.build(&list, NodeId::new());
        assert!(matches!(result, Err(QuantumError::Consistency { .. })));
    }

    #[test]
    fn test_value_type_root_is_boxed() {
        let mut builder = NodeBuilder::new(provider());
        let transform = Value::object(Instance::object(
            "Transform",
            [("X", Value::Float(0.0)), ("Y", Value::Float(0.0))],
        ));
        let node = builder.build(&transform, NodeId::new()).unwrap();
        assert!(node.is_boxed());
        assert_eq!(node.members().len(), 2);
    }

    #[test]
    fn test_null_root_rejected() {
        let mut builder = NodeBuilder::new(provider());
        let result = builder.build(&Value::Null, NodeId::new());
        assert!(matches!(result, Err(QuantumError::Argument(_))));
    }

    #[test]
    fn test_member_type_mismatch_rejected() {
        let mut builder = NodeBuilder::new(provider());
        let value = Value::object(Instance::object(
            "Entity",
            [(
                "Transform",
                Value::object(Instance::object("Component", [("Enabled", Value::Bool(true))])),
            )],
        ));
        let result = builder.build(&value, NodeId::new());
        assert!(matches!(result, Err(QuantumError::Argument(_))));
    }

    #[test]
    fn test_primitive_type_registration() {
        let mut builder = NodeBuilder::new(provider());
        let transform = TypeKey::new("Transform");
        assert!(!builder.is_primitive_type(&transform));

        builder.register_primitive_type(transform.clone());
        assert!(builder.is_primitive_type(&transform));
        let node = builder.build(&entity("Atomic"), NodeId::new()).unwrap();
        assert!(!node.member("Transform").unwrap().is_reference());

        builder.unregister_primitive_type(&transform).unwrap();
        assert!(!builder.is_primitive_type(&transform));
    }

    #[test]
    fn test_builtin_primitives_cannot_be_unregistered() {
        let mut builder = NodeBuilder::new(provider());
        for ty in ["int", "string", "guid", "Layer"] {
            let result = builder.unregister_primitive_type(&TypeKey::new(ty));
            assert!(matches!(result, Err(QuantumError::Operation(_))));
        }
        builder.register_primitive_type(TypeKey::new("int"));
        assert!(builder.is_primitive_type(&TypeKey::new("int")));
    }

    #[test]
    fn test_settings_from_ron() {
        let settings = NodeBuilderSettings::from_ron("(primitive_types: [\"Transform\"])").unwrap();
        let mut builder = NodeBuilder::new(provider());
        builder.apply_settings(&settings);
        assert!(builder.is_primitive_type(&TypeKey::new("Transform")));
    }
}
