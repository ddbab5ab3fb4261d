// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the object graph.
//!
//! Nodes only exist in sealed form. The builder assembles an initializing
//! node (members appended one by one) and seals it into an [`ObjectNode`]
//! exactly once; nothing can append members afterwards.
//! Leaf values stay writable through [`ObjectNode::update`] and
//! [`MemberNode::update`].

use crate::container::{ContainerShared, NodeContainer};
use crate::descriptor::{TypeDescriptor, TypeKey};
use crate::error::{QuantumError, Result};
use crate::ident::NodeId;
use crate::index::NodeIndex;
use crate::reference::{ObjectReference, ReferenceEnumerable};
use crate::value::{Instance, InstanceData, ObjectRef, Value};
use std::sync::{Arc, Weak};

/// A node representing one non-primitive value: object, collection or dictionary
#[derive(Debug)]
pub struct ObjectNode {
    /// Unique node ID
    id: NodeId,
    /// Runtime type of the value
    descriptor: Arc<TypeDescriptor>,
    /// Backing value
    value: Value,
    /// Whether the value is a value type wrapped in its own node
    boxed: bool,
    /// References held by the items, for collections of objects
    item_references: Option<ReferenceEnumerable>,
    /// Member nodes, in declaration order
    members: Vec<Arc<MemberNode>>,
    /// Owning container
    container: Weak<ContainerShared>,
}

impl ObjectNode {
    /// Unique node ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Runtime type descriptor
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// Runtime type name
    pub fn type_key(&self) -> &TypeKey {
        &self.descriptor.key
    }

    /// Backing value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether this node wraps a value type
    pub fn is_boxed(&self) -> bool {
        self.boxed
    }

    /// Whether the items of this node are references to other objects
    pub fn is_reference(&self) -> bool {
        self.item_references.is_some()
    }

    /// References held by the items, if this is a collection of objects
    pub fn item_references(&self) -> Option<&ReferenceEnumerable> {
        self.item_references.as_ref()
    }

    /// Member nodes, in declaration order
    pub fn members(&self) -> &[Arc<MemberNode>] {
        &self.members
    }

    /// Get a member node by name
    pub fn member(&self, name: &str) -> Option<&Arc<MemberNode>> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Indices of the items currently stored in the backing collection
    pub fn item_indices(&self) -> Vec<NodeIndex> {
        let Some(object) = self.value.as_object() else {
            return Vec::new();
        };
        let instance = object.read();
        match &instance.data {
            InstanceData::Items(items) => (0..items.len()).map(NodeIndex::Position).collect(),
            InstanceData::Entries(entries) => entries.keys().cloned().map(NodeIndex::Key).collect(),
            InstanceData::Fields(_) => Vec::new(),
        }
    }

    /// Read the node value (empty index) or one of its items
    pub fn retrieve(&self, index: &NodeIndex) -> Result<Value> {
        if index.is_empty() {
            return Ok(self.value.clone());
        }
        let object = self.backing_object()?;
        let instance = object.read();
        read_item(&instance, index)
    }

    /// Write one of the items of this node
    pub fn update(&self, value: Value, index: &NodeIndex) -> Result<()> {
        if index.is_empty() {
            return Err(QuantumError::argument(format!(
                "the value of object node {} cannot be replaced, only its items",
                self.id
            )));
        }
        let object = self.backing_object()?;
        write_item(&mut object.write(), index, value.clone())?;

        if let Some(reference) = self.item_references.as_ref().and_then(|r| r.get(index)) {
            reference.retarget(value);
            refresh(&self.container, reference)?;
        }
        Ok(())
    }

    /// Node targeted by one of the items, resolving it if needed
    pub fn item_target(&self, index: &NodeIndex) -> Result<Option<Arc<ObjectNode>>> {
        match self.item_references.as_ref().and_then(|r| r.get(index)) {
            Some(reference) => target_of(&self.container, reference),
            None => Ok(None),
        }
    }

    fn backing_object(&self) -> Result<&ObjectRef> {
        self.value.as_object().ok_or_else(|| {
            QuantumError::argument(format!("object node {} has no items", self.id))
        })
    }
}

/// A node representing one named member of an object node
#[derive(Debug)]
pub struct MemberNode {
    /// Unique node ID
    id: NodeId,
    /// Member name
    name: String,
    /// Identity of the owning object node
    owner: NodeId,
    /// Object hosting the member value
    owner_value: ObjectRef,
    /// Declared type of the member
    descriptor: Arc<TypeDescriptor>,
    /// Reference to the member value, when it is an object
    target_reference: Option<ObjectReference>,
    /// Owning container
    container: Weak<ContainerShared>,
}

impl MemberNode {
    /// Unique node ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Member name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity of the owning object node
    pub fn owner_id(&self) -> NodeId {
        self.owner
    }

    /// Owning object node, looked up in the container
    pub fn owner(&self) -> Option<Arc<ObjectNode>> {
        self.container
            .upgrade()
            .and_then(|shared| NodeContainer::from_shared(shared).node(self.owner))
    }

    /// Declared type descriptor of the member
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// Declared type name of the member
    pub fn member_type(&self) -> &TypeKey {
        &self.descriptor.key
    }

    /// Whether the member value is reached by reference
    pub fn is_reference(&self) -> bool {
        self.target_reference.is_some()
    }

    /// Reference to the member value, if it is an object
    pub fn target_reference(&self) -> Option<&ObjectReference> {
        self.target_reference.as_ref()
    }

    /// Read the member value
    pub fn retrieve(&self) -> Value {
        self.owner_value
            .read()
            .field(&self.name)
            .cloned()
            .unwrap_or_default()
    }

    /// Write the member value
    pub fn update(&self, value: Value) -> Result<()> {
        self.owner_value.write().set_field(&self.name, value.clone())?;
        if let Some(reference) = &self.target_reference {
            reference.retarget(value);
            refresh(&self.container, reference)?;
        }
        Ok(())
    }

    /// Node targeted by the member, resolving it if needed
    pub fn target(&self) -> Result<Option<Arc<ObjectNode>>> {
        match &self.target_reference {
            Some(reference) => target_of(&self.container, reference),
            None => Ok(None),
        }
    }
}

/// Any node of the graph
#[derive(Debug, Clone)]
pub enum GraphNode {
    /// Object, collection or dictionary node
    Object(Arc<ObjectNode>),
    /// Member node
    Member(Arc<MemberNode>),
}

impl GraphNode {
    /// Unique node ID
    pub fn id(&self) -> NodeId {
        match self {
            Self::Object(node) => node.id(),
            Self::Member(node) => node.id(),
        }
    }

    /// Type descriptor: runtime type for objects, declared type for members
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        match self {
            Self::Object(node) => node.descriptor(),
            Self::Member(node) => node.descriptor(),
        }
    }

    /// Whether this node holds references to other objects
    pub fn is_reference(&self) -> bool {
        match self {
            Self::Object(node) => node.is_reference(),
            Self::Member(node) => node.is_reference(),
        }
    }

    /// Read the node value or one of its items
    pub fn retrieve(&self, index: &NodeIndex) -> Result<Value> {
        match self {
            Self::Object(node) => node.retrieve(index),
            Self::Member(node) if index.is_empty() => Ok(node.retrieve()),
            Self::Member(node) => Err(QuantumError::argument(format!(
                "member {} cannot be read with index {index}",
                node.name()
            ))),
        }
    }

    /// Get the object node, if this is one
    pub fn as_object(&self) -> Option<&Arc<ObjectNode>> {
        match self {
            Self::Object(node) => Some(node),
            Self::Member(_) => None,
        }
    }

    /// Get the member node, if this is one
    pub fn as_member(&self) -> Option<&Arc<MemberNode>> {
        match self {
            Self::Member(node) => Some(node),
            Self::Object(_) => None,
        }
    }
}

impl PartialEq for GraphNode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            (Self::Member(a), Self::Member(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for GraphNode {}

impl From<Arc<ObjectNode>> for GraphNode {
    fn from(value: Arc<ObjectNode>) -> Self {
        Self::Object(value)
    }
}

impl From<Arc<MemberNode>> for GraphNode {
    fn from(value: Arc<MemberNode>) -> Self {
        Self::Member(value)
    }
}

/// An object node whose members are still being discovered
#[derive(Debug)]
pub(crate) struct InitializingObjectNode {
    pub(crate) id: NodeId,
    pub(crate) descriptor: Arc<TypeDescriptor>,
    pub(crate) value: Value,
    pub(crate) boxed: bool,
    pub(crate) item_references: Option<ReferenceEnumerable>,
    pub(crate) members: Vec<Arc<MemberNode>>,
}

impl InitializingObjectNode {
    pub(crate) fn add_member(&mut self, member: Arc<MemberNode>) {
        self.members.push(member);
    }

    pub(crate) fn seal(self, container: Weak<ContainerShared>) -> Arc<ObjectNode> {
        Arc::new(ObjectNode {
            id: self.id,
            descriptor: self.descriptor,
            value: self.value,
            boxed: self.boxed,
            item_references: self.item_references,
            members: self.members,
            container,
        })
    }
}

/// A member node whose value is still being visited
#[derive(Debug)]
pub(crate) struct InitializingMemberNode {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) owner: NodeId,
    pub(crate) owner_value: ObjectRef,
    pub(crate) descriptor: Arc<TypeDescriptor>,
    pub(crate) target_reference: Option<ObjectReference>,
}

impl InitializingMemberNode {
    pub(crate) fn seal(self, container: Weak<ContainerShared>) -> Arc<MemberNode> {
        Arc::new(MemberNode {
            id: self.id,
            name: self.name,
            owner: self.owner,
            owner_value: self.owner_value,
            descriptor: self.descriptor,
            target_reference: self.target_reference,
            container,
        })
    }
}

fn read_item(instance: &Instance, index: &NodeIndex) -> Result<Value> {
    match (&instance.data, index) {
        (InstanceData::Items(items), NodeIndex::Position(position)) => items
            .get(*position)
            .cloned()
            .ok_or_else(|| out_of_range(&instance.ty, index)),
        (InstanceData::Entries(entries), NodeIndex::Key(key)) => entries
            .get(key)
            .cloned()
            .ok_or_else(|| out_of_range(&instance.ty, index)),
        _ => Err(mismatched_index(&instance.ty, index)),
    }
}

fn write_item(instance: &mut Instance, index: &NodeIndex, value: Value) -> Result<()> {
    let ty = instance.ty.clone();
    let slot = match (&mut instance.data, index) {
        (InstanceData::Items(items), NodeIndex::Position(position)) => items.get_mut(*position),
        (InstanceData::Entries(entries), NodeIndex::Key(key)) => entries.get_mut(key),
        _ => return Err(mismatched_index(&ty, index)),
    };
    let slot = slot.ok_or_else(|| out_of_range(&ty, index))?;
    *slot = value;
    Ok(())
}

fn out_of_range(ty: &TypeKey, index: &NodeIndex) -> QuantumError {
    QuantumError::argument(format!("{ty} has no item at {index}"))
}

fn mismatched_index(ty: &TypeKey, index: &NodeIndex) -> QuantumError {
    QuantumError::argument(format!("{ty} cannot be indexed with {index}"))
}

fn refresh(container: &Weak<ContainerShared>, reference: &ObjectReference) -> Result<()> {
    match container.upgrade() {
        Some(shared) => NodeContainer::from_shared(shared).resolve_reference(reference),
        None => Ok(()),
    }
}

fn target_of(
    container: &Weak<ContainerShared>,
    reference: &ObjectReference,
) -> Result<Option<Arc<ObjectNode>>> {
    let container = container
        .upgrade()
        .map(NodeContainer::from_shared)
        .ok_or(QuantumError::ContainerDropped)?;
    if let Some(node) = reference.target_id().and_then(|id| container.node(id)) {
        return Ok(Some(node));
    }
    container.resolve_reference(reference)?;
    Ok(reference.target_id().and_then(|id| container.node(id)))
}
