// SPDX-License-Identifier: MIT OR Apache-2.0
//! Paths from a root object node to the node being visited.

use crate::accessor::NodeAccessor;
use crate::error::Result;
use crate::ident::NodeId;
use crate::index::NodeIndex;
use crate::node::{GraphNode, MemberNode, ObjectNode};
use std::fmt;
use std::sync::Arc;

/// One step of a [`GraphNodePath`]
#[derive(Debug, Clone)]
pub enum GraphNodePathElement {
    /// Into a member of the current object node
    Member(Arc<MemberNode>),
    /// Into the object node targeted by the current member or item
    Target(Arc<ObjectNode>),
    /// Onto an item of the current collection node
    Index(NodeIndex),
}

/// Ordered steps from a root object node
#[derive(Debug, Clone)]
pub struct GraphNodePath {
    /// Starting node
    root: Arc<ObjectNode>,
    /// Steps taken from the root
    elements: Vec<GraphNodePathElement>,
}

impl GraphNodePath {
    /// Create a new path at a root node
    pub fn new(root: Arc<ObjectNode>) -> Self {
        Self {
            root,
            elements: Vec::new(),
        }
    }

    /// Starting node
    pub fn root(&self) -> &Arc<ObjectNode> {
        &self.root
    }

    /// Steps taken from the root
    pub fn elements(&self) -> &[GraphNodePathElement] {
        &self.elements
    }

    /// Get the number of steps
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check whether this path is the root alone
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Step into a member
    pub fn push_member(&mut self, member: Arc<MemberNode>) {
        self.elements.push(GraphNodePathElement::Member(member));
    }

    /// Step into a target node
    pub fn push_target(&mut self, target: Arc<ObjectNode>) {
        self.elements.push(GraphNodePathElement::Target(target));
    }

    /// Step onto an item
    pub fn push_index(&mut self, index: NodeIndex) {
        self.elements.push(GraphNodePathElement::Index(index));
    }

    /// Remove the last step
    pub fn pop(&mut self) -> Option<GraphNodePathElement> {
        self.elements.pop()
    }

    /// Node reached by the path, ignoring a trailing index
    pub fn current_node(&self) -> GraphNode {
        self.elements
            .iter()
            .rev()
            .find_map(|element| match element {
                GraphNodePathElement::Member(member) => Some(GraphNode::Member(member.clone())),
                GraphNodePathElement::Target(target) => Some(GraphNode::Object(target.clone())),
                GraphNodePathElement::Index(_) => None,
            })
            .unwrap_or_else(|| GraphNode::Object(self.root.clone()))
    }

    /// Accessor on the value the path points to
    pub fn get_accessor(&self) -> Result<NodeAccessor> {
        match self.elements.last() {
            Some(GraphNodePathElement::Index(index)) => {
                NodeAccessor::new(self.current_node(), index.clone())
            }
            _ => Ok(NodeAccessor::for_node(self.current_node())),
        }
    }

    /// Whether an object node is the root or a target along the path
    pub fn contains(&self, id: NodeId) -> bool {
        self.root.id() == id
            || self.elements.iter().any(|element| {
                matches!(element, GraphNodePathElement::Target(target) if target.id() == id)
            })
    }
}

impl fmt::Display for GraphNodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root.type_key())?;
        for element in &self.elements {
            match element {
                GraphNodePathElement::Member(member) => write!(f, ".{}", member.name())?,
                GraphNodePathElement::Target(_) => {}
                GraphNodePathElement::Index(index) => write!(f, "{index}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::NodeContainer;
    use crate::descriptor::{builtin, MemberDescriptor, TypeDescriptor, TypeRegistry};
    use crate::value::{Instance, Value};

    #[test]
    fn test_path_display_and_accessor() {
        let registry = TypeRegistry::new()
            .with(TypeDescriptor::object(
                "Scene",
                [MemberDescriptor::new("Layers", "LayerList")],
            ))
            .and_then(|r| r.with(TypeDescriptor::collection("LayerList", builtin::STRING)))
            .unwrap();
        let container = NodeContainer::new(Arc::new(registry));
        let layers = Value::object(Instance::collection("LayerList", [Value::from("a"), Value::from("b")]));
        let scene = Value::object(Instance::object("Scene", [("Layers", layers)]));
        let root = container.get_or_create_node(&scene).unwrap().unwrap();

        let member = root.member("Layers").unwrap().clone();
        let target = member.target().unwrap().unwrap();
        let mut path = GraphNodePath::new(root.clone());
        path.push_member(member.clone());
        assert_eq!(path.current_node(), GraphNode::Member(member));
        path.push_target(target.clone());
        path.push_index(NodeIndex::Position(1));

        assert_eq!(path.to_string(), "Scene.Layers[1]");
        assert_eq!(path.current_node(), GraphNode::Object(target.clone()));
        assert!(path.contains(target.id()));

        let accessor = path.get_accessor().unwrap();
        assert!(accessor.is_item());
        assert_eq!(accessor.retrieve_value().unwrap(), Value::from("b"));

        path.pop();
        let accessor = path.get_accessor().unwrap();
        assert!(!accessor.is_item());
        assert_eq!(accessor.node(), &GraphNode::Object(target));
    }
}
