// SPDX-License-Identifier: MIT OR Apache-2.0
//! Addressing of a single value slot in the graph.

use crate::descriptor::{TypeDescriptorProvider, TypeKey};
use crate::error::{QuantumError, Result};
use crate::index::NodeIndex;
use crate::node::GraphNode;
use crate::value::Value;
use std::fmt;

/// A node plus an optional item index, addressing one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAccessor {
    /// Addressed node
    node: GraphNode,
    /// Item index, empty for the node value itself
    index: NodeIndex,
}

impl NodeAccessor {
    /// Create a new accessor
    ///
    /// Member nodes have no items, so they only accept the empty index.
    pub fn new(node: impl Into<GraphNode>, index: NodeIndex) -> Result<Self> {
        let node = node.into();
        if let GraphNode::Member(member) = &node {
            if !index.is_empty() {
                return Err(QuantumError::argument(format!(
                    "member {} cannot be accessed with index {index}",
                    member.name()
                )));
            }
        }
        Ok(Self { node, index })
    }

    /// Create an accessor on the node value itself
    pub fn for_node(node: impl Into<GraphNode>) -> Self {
        Self {
            node: node.into(),
            index: NodeIndex::Empty,
        }
    }

    /// Addressed node
    pub fn node(&self) -> &GraphNode {
        &self.node
    }

    /// Item index
    pub fn index(&self) -> &NodeIndex {
        &self.index
    }

    /// Whether this addresses a member value
    pub fn is_member(&self) -> bool {
        matches!(self.node, GraphNode::Member(_))
    }

    /// Whether this addresses a collection item
    pub fn is_item(&self) -> bool {
        !self.index.is_empty()
    }

    /// Read the addressed value
    pub fn retrieve_value(&self) -> Result<Value> {
        self.node.retrieve(&self.index)
    }

    /// Write the addressed value
    pub fn update_value(&self, value: Value) -> Result<()> {
        match &self.node {
            GraphNode::Member(member) => member.update(value),
            GraphNode::Object(object) => object.update(value, &self.index),
        }
    }

    /// Whether values of `ty` can be written through this accessor
    pub fn accept_type(&self, provider: &dyn TypeDescriptorProvider, ty: &TypeKey) -> bool {
        provider.is_assignable_from(self.accepted_type(), ty)
    }

    /// Whether `value` can be written through this accessor
    pub fn accept_value(&self, provider: &dyn TypeDescriptorProvider, value: &Value) -> bool {
        match value.type_key() {
            Some(ty) => self.accept_type(provider, &ty),
            None => provider
                .describe(self.accepted_type())
                .is_ok_and(|descriptor| !descriptor.value_type),
        }
    }

    fn accepted_type(&self) -> &TypeKey {
        self.node.descriptor().inner_collection_type()
    }
}

impl fmt::Display for NodeAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            GraphNode::Member(member) => f.write_str(member.name()),
            GraphNode::Object(object) if self.index.is_empty() => write!(f, "{}", object.type_key()),
            GraphNode::Object(_) => write!(f, "{}", self.index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::NodeBuilder;
    use crate::descriptor::{builtin, MemberDescriptor, TypeDescriptor, TypeRegistry};
    use crate::ident::NodeId;
    use crate::node::ObjectNode;
    use crate::value::{IndexKey, Instance};
    use std::sync::Arc;

    fn registry() -> Arc<TypeRegistry> {
        let registry = TypeRegistry::new()
            .with(TypeDescriptor::object(
                "Settings",
                [
                    MemberDescriptor::new("Volume", builtin::FLOAT),
                    MemberDescriptor::new("Title", builtin::STRING),
                ],
            ))
            .and_then(|r| r.with(TypeDescriptor::collection("Scores", builtin::INT)))
            .and_then(|r| r.with(TypeDescriptor::dictionary("Labels", builtin::STRING, builtin::STRING)))
            .unwrap();
        Arc::new(registry)
    }

    fn build(registry: &Arc<TypeRegistry>, value: &Value) -> Arc<ObjectNode> {
        let mut builder = NodeBuilder::new(registry.clone());
        builder.build(value, NodeId::new()).unwrap()
    }

    #[test]
    fn test_member_round_trip() {
        let registry = registry();
        let settings = Value::object(Instance::object(
            "Settings",
            [("Volume", Value::Float(0.5)), ("Title", Value::from("Main"))],
        ));
        let node = build(&registry, &settings);
        let accessor = NodeAccessor::new(node.member("Volume").unwrap().clone(), NodeIndex::Empty).unwrap();

        assert!(accessor.is_member());
        assert!(!accessor.is_item());
        accessor.update_value(Value::Float(0.75)).unwrap();
        assert_eq!(accessor.retrieve_value().unwrap(), Value::Float(0.75));
        assert_eq!(accessor.to_string(), "Volume");
    }

    #[test]
    fn test_item_round_trip() {
        let registry = registry();
        let scores = Value::object(Instance::collection("Scores", [Value::Int(1), Value::Int(2)]));
        let node = build(&registry, &scores);
        let accessor = NodeAccessor::new(node.clone(), NodeIndex::Position(1)).unwrap();

        assert!(accessor.is_item());
        assert!(!accessor.is_member());
        accessor.update_value(Value::Int(9)).unwrap();
        assert_eq!(accessor.retrieve_value().unwrap(), Value::Int(9));
        assert_eq!(accessor.to_string(), "[1]");

        let missing = NodeAccessor::new(node, NodeIndex::Position(5)).unwrap();
        assert!(matches!(missing.retrieve_value(), Err(QuantumError::Argument(_))));
        assert!(matches!(missing.update_value(Value::Int(0)), Err(QuantumError::Argument(_))));
    }

    #[test]
    fn test_dictionary_entry_round_trip() {
        let registry = registry();
        let key = IndexKey::String("greeting".to_string());
        let labels = Value::object(Instance::dictionary(
            "Labels",
            [(key.clone(), Value::from("hello"))],
        ));
        let node = build(&registry, &labels);
        let accessor = NodeAccessor::new(node, NodeIndex::Key(key)).unwrap();
        accessor.update_value(Value::from("bye")).unwrap();
        assert_eq!(accessor.retrieve_value().unwrap(), Value::from("bye"));
    }

    #[test]
    fn test_member_with_index_rejected() {
        let registry = registry();
        let settings = Value::object(Instance::object("Settings", [("Volume", Value::Float(0.5))]));
        let node = build(&registry, &settings);
        let result = NodeAccessor::new(node.member("Volume").unwrap().clone(), NodeIndex::Position(0));
        assert!(matches!(result, Err(QuantumError::Argument(_))));
    }

    #[test]
    fn test_object_value_cannot_be_replaced() {
        let registry = registry();
        let scores = Value::object(Instance::collection("Scores", [Value::Int(1)]));
        let node = build(&registry, &scores);
        let accessor = NodeAccessor::for_node(node);
        assert_eq!(accessor.retrieve_value().unwrap(), scores);
        assert!(matches!(accessor.update_value(Value::Null), Err(QuantumError::Argument(_))));
    }

    #[test]
    fn test_accepted_types() {
        let registry = registry();
        let scores = Value::object(Instance::collection("Scores", [Value::Int(1)]));
        let node = build(&registry, &scores);
        let item = NodeAccessor::new(node, NodeIndex::Position(0)).unwrap();
        assert!(item.accept_type(registry.as_ref(), &TypeKey::new(builtin::INT)));
        assert!(!item.accept_type(registry.as_ref(), &TypeKey::new(builtin::STRING)));
        assert!(item.accept_value(registry.as_ref(), &Value::Int(4)));
        assert!(!item.accept_value(registry.as_ref(), &Value::Null));

        let settings = Value::object(Instance::object("Settings", [("Title", Value::from("a"))]));
        let node = build(&registry, &settings);
        let title = NodeAccessor::for_node(node.member("Title").unwrap().clone());
        assert!(title.accept_value(registry.as_ref(), &Value::Null));
        assert!(!title.accept_value(registry.as_ref(), &Value::Int(1)));

        let object = NodeAccessor::for_node(node);
        assert!(object.accept_value(registry.as_ref(), &Value::Null));
        assert!(!object.accept_value(&TypeRegistry::new(), &Value::Null));
    }
}
