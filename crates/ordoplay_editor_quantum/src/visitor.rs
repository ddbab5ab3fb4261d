// SPDX-License-Identifier: MIT OR Apache-2.0
//! Depth-first traversal of a node graph.
//!
//! [`GraphVisitorBase`] owns the walk and the current [`GraphNodePath`];
//! a [`GraphVisitor`] only supplies hooks. Members of a node are visited in
//! declaration order, then its items. Targets are entered when the matching
//! hook allows it. A node already on the current path is never re-entered,
//! so cycles terminate, while a node shared by two distinct paths is visited
//! once per path.

use crate::error::Result;
use crate::index::NodeIndex;
use crate::node::{MemberNode, ObjectNode};
use crate::path::GraphNodePath;
use std::sync::Arc;

/// Hooks invoked while walking a graph
pub trait GraphVisitor {
    /// Called when entering an object node, the root included
    fn visit_node(&mut self, _node: &Arc<ObjectNode>, _path: &GraphNodePath) {}

    /// Called for every member, before its target is considered
    fn visit_member(&mut self, _member: &Arc<MemberNode>, _path: &GraphNodePath) {}

    /// Called for every item of a collection node; the path ends with the item index
    fn visit_item(&mut self, _collection: &Arc<ObjectNode>, _index: &NodeIndex, _path: &GraphNodePath) {}

    /// Whether to walk into the node targeted by a member
    fn should_visit_member_target(&mut self, _member: &MemberNode, _target: &ObjectNode) -> bool {
        true
    }

    /// Whether to walk into the node targeted by an item
    fn should_visit_target_item(
        &mut self,
        _collection: &ObjectNode,
        _index: &NodeIndex,
        _target: &ObjectNode,
    ) -> bool {
        true
    }
}

/// Traversal skeleton driving a [`GraphVisitor`]
pub struct GraphVisitorBase<'v, V: GraphVisitor + ?Sized> {
    visitor: &'v mut V,
}

impl<'v, V: GraphVisitor + ?Sized> GraphVisitorBase<'v, V> {
    /// Create a new traversal for a visitor
    pub fn new(visitor: &'v mut V) -> Self {
        Self { visitor }
    }

    /// Walk the graph reachable from `root`
    pub fn visit(&mut self, root: &Arc<ObjectNode>) -> Result<()> {
        let mut path = GraphNodePath::new(root.clone());
        self.visit_node(root, &mut path)
    }

    fn visit_node(&mut self, node: &Arc<ObjectNode>, path: &mut GraphNodePath) -> Result<()> {
        self.visitor.visit_node(node, path);

        for member in node.members() {
            path.push_member(member.clone());
            let result = self.visit_member(member, path);
            path.pop();
            result?;
        }

        for index in node.item_indices() {
            path.push_index(index.clone());
            let result = self.visit_item(node, &index, path);
            path.pop();
            result?;
        }
        Ok(())
    }

    fn visit_member(&mut self, member: &Arc<MemberNode>, path: &mut GraphNodePath) -> Result<()> {
        self.visitor.visit_member(member, path);

        let Some(target) = member.target()? else {
            return Ok(());
        };
        if path.contains(target.id()) || !self.visitor.should_visit_member_target(member, &target) {
            return Ok(());
        }
        self.visit_target(&target, path)
    }

    fn visit_item(
        &mut self,
        collection: &Arc<ObjectNode>,
        index: &NodeIndex,
        path: &mut GraphNodePath,
    ) -> Result<()> {
        self.visitor.visit_item(collection, index, path);

        let Some(target) = collection.item_target(index)? else {
            return Ok(());
        };
        if path.contains(target.id())
            || !self.visitor.should_visit_target_item(collection, index, &target)
        {
            return Ok(());
        }
        self.visit_target(&target, path)
    }

    fn visit_target(&mut self, target: &Arc<ObjectNode>, path: &mut GraphNodePath) -> Result<()> {
        path.push_target(target.clone());
        let result = self.visit_node(target, path);
        path.pop();
        result
    }
}
