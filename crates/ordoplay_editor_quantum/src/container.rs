// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry owning every object node of a graph.

use crate::builder::{NodeBuilder, NodeBuilderSettings};
use crate::descriptor::{TypeDescriptorProvider, TypeKey};
use crate::error::Result;
use crate::ident::NodeId;
use crate::node::ObjectNode;
use crate::reference::ObjectReference;
use crate::value::{ObjectKey, ObjectRef, Value};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub(crate) struct ContainerShared {
    provider: Arc<dyn TypeDescriptorProvider>,
    builder: Mutex<NodeBuilder>,
    nodes: RwLock<IndexMap<NodeId, Arc<ObjectNode>>>,
    objects: RwLock<HashMap<ObjectKey, NodeId>>,
}

/// Owner of the object nodes built for a set of values
///
/// Each object instance gets at most one node. Targets of references are
/// built on demand and registered here, so shared and cyclic structures map
/// to a single node per instance. Cloning the container clones the handle.
#[derive(Clone)]
pub struct NodeContainer {
    shared: Arc<ContainerShared>,
}

impl NodeContainer {
    /// Create a new empty container
    pub fn new(provider: Arc<dyn TypeDescriptorProvider>) -> Self {
        let shared = Arc::new_cyclic(|weak| ContainerShared {
            provider: provider.clone(),
            builder: Mutex::new(NodeBuilder::with_container(provider.clone(), weak.clone())),
            nodes: RwLock::new(IndexMap::new()),
            objects: RwLock::new(HashMap::new()),
        });
        Self { shared }
    }

    /// Create a new empty container with builder settings
    pub fn with_settings(
        provider: Arc<dyn TypeDescriptorProvider>,
        settings: &NodeBuilderSettings,
    ) -> Self {
        let container = Self::new(provider);
        container.shared.builder.lock().apply_settings(settings);
        container
    }

    pub(crate) fn from_shared(shared: Arc<ContainerShared>) -> Self {
        Self { shared }
    }

    /// Type introspection capability used by this container
    pub fn provider(&self) -> &Arc<dyn TypeDescriptorProvider> {
        &self.shared.provider
    }

    /// Get the node of a value, building it and its reference targets if needed
    pub fn get_or_create_node(&self, value: &Value) -> Result<Option<Arc<ObjectNode>>> {
        if value.is_null() {
            return Ok(None);
        }
        if let Some(node) = self.get_node(value) {
            return Ok(Some(node));
        }
        self.create_root(value, NodeId::new()).map(Some)
    }

    /// Get the node of a root value, giving it a caller-chosen identity if it is built
    pub fn get_or_create_node_with_id(&self, value: &Value, id: NodeId) -> Result<Option<Arc<ObjectNode>>> {
        if value.is_null() {
            return Ok(None);
        }
        if let Some(node) = self.get_node(value) {
            return Ok(Some(node));
        }
        if let Some(node) = self.node(id) {
            tracing::warn!(%id, "node identity already in use, keeping the existing node");
            return Ok(Some(node));
        }
        self.create_root(value, id).map(Some)
    }

    /// Get the node already registered for an object value
    pub fn get_node(&self, value: &Value) -> Option<Arc<ObjectNode>> {
        let key = value.as_object()?.key();
        let id = self.shared.objects.read().get(&key).copied()?;
        self.node(id)
    }

    /// Get a node by ID
    pub fn node(&self, id: NodeId) -> Option<Arc<ObjectNode>> {
        self.shared.nodes.read().get(&id).cloned()
    }

    /// Get all registered nodes, in registration order
    pub fn nodes(&self) -> Vec<Arc<ObjectNode>> {
        self.shared.nodes.read().values().cloned().collect()
    }

    /// Get the number of registered nodes
    pub fn len(&self) -> usize {
        self.shared.nodes.read().len()
    }

    /// Check whether no node is registered
    pub fn is_empty(&self) -> bool {
        self.shared.nodes.read().is_empty()
    }

    /// Unregister a node
    pub fn remove(&self, id: NodeId) -> Option<Arc<ObjectNode>> {
        let mut nodes = self.shared.nodes.write();
        let mut objects = self.shared.objects.write();
        let node = nodes.shift_remove(&id)?;
        if let Some(key) = node.value().as_object().map(ObjectRef::key) {
            if objects.get(&key) == Some(&id) {
                objects.remove(&key);
            }
        }
        Some(node)
    }

    /// Unregister every node
    pub fn clear(&self) {
        let mut nodes = self.shared.nodes.write();
        let mut objects = self.shared.objects.write();
        nodes.clear();
        objects.clear();
    }

    /// Treat a type as an atomic leaf in nodes built from now on
    pub fn register_primitive_type(&self, ty: TypeKey) {
        self.shared.builder.lock().register_primitive_type(ty);
    }

    /// Stop treating a registered type as an atomic leaf
    pub fn unregister_primitive_type(&self, ty: &TypeKey) -> Result<()> {
        self.shared.builder.lock().unregister_primitive_type(ty)
    }

    /// Check whether values of a type are atomic leaves
    pub fn is_primitive_type(&self, ty: &TypeKey) -> bool {
        self.shared.builder.lock().is_primitive_type(ty)
    }

    /// Resolve the target node of a reference, building it if needed
    pub(crate) fn resolve_reference(&self, reference: &ObjectReference) -> Result<()> {
        let mut registered = Vec::new();
        let result = self.resolve_tracked(reference, &mut registered);
        if result.is_err() {
            self.discard(&registered);
        }
        result
    }

    /// Build a root and everything it reaches; nothing stays registered on failure
    fn create_root(&self, value: &Value, id: NodeId) -> Result<Arc<ObjectNode>> {
        let mut registered = Vec::new();
        let result = self.create_node(value, id, &mut registered);
        if result.is_err() {
            self.discard(&registered);
        }
        result
    }

    fn create_node(&self, value: &Value, id: NodeId, registered: &mut Vec<NodeId>) -> Result<Arc<ObjectNode>> {
        // The builder lock is released before resolving, which re-enters the container
        let built = self.shared.builder.lock().build(value, id)?;
        let (node, created) = self.register(built);
        if created {
            registered.push(node.id());
            self.update_references(&node, registered)?;
        }
        Ok(node)
    }

    fn register(&self, node: Arc<ObjectNode>) -> (Arc<ObjectNode>, bool) {
        let key = node.value().as_object().map(ObjectRef::key);
        let mut nodes = self.shared.nodes.write();
        let mut objects = self.shared.objects.write();

        if let Some(existing) = key
            .and_then(|key| objects.get(&key))
            .and_then(|id| nodes.get(id))
        {
            return (existing.clone(), false);
        }
        if let Some(existing) = nodes.get(&node.id()) {
            tracing::warn!(id = %node.id(), "node identity already in use, keeping the existing node");
            return (existing.clone(), false);
        }

        if let Some(key) = key {
            objects.insert(key, node.id());
        }
        nodes.insert(node.id(), node.clone());
        tracing::debug!(id = %node.id(), ty = %node.type_key(), "registered object node");
        (node, true)
    }

    fn update_references(&self, node: &ObjectNode, registered: &mut Vec<NodeId>) -> Result<()> {
        for member in node.members() {
            if let Some(reference) = member.target_reference() {
                self.resolve_tracked(reference, registered)?;
            }
        }
        if let Some(items) = node.item_references() {
            for reference in items.iter() {
                self.resolve_tracked(reference, registered)?;
            }
        }
        Ok(())
    }

    fn resolve_tracked(&self, reference: &ObjectReference, registered: &mut Vec<NodeId>) -> Result<()> {
        let value = reference.target_value();
        let target = match self.get_node(&value) {
            Some(node) => Some(node),
            None if value.is_null() => None,
            None => Some(self.create_node(&value, NodeId::new(), registered)?),
        };
        reference.resolve(&value, target.map(|node| node.id()));
        Ok(())
    }

    fn discard(&self, registered: &[NodeId]) {
        if registered.is_empty() {
            return;
        }
        for id in registered {
            self.remove(*id);
        }
        tracing::warn!(count = registered.len(), "discarded partially built graph");
    }
}

impl fmt::Debug for NodeContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeContainer")
            .field("nodes", &self.len())
            .finish()
    }
}
