// SPDX-License-Identifier: MIT OR Apache-2.0
//! Visitor surfacing every member and item holding an identifiable object.

use crate::definition::PropertyGraphDefinition;
use crate::identifiable::Identifiable;
use ordoplay_editor_quantum::{
    GraphNodePath, GraphVisitor, GraphVisitorBase, MemberNode, NodeIndex, ObjectNode, Result,
};
use std::sync::Arc;

/// Hooks invoked for each occurrence of an identifiable object
///
/// [`visit`](Self::visit) walks the graph depth-first from a root node and
/// calls the hooks at every member or item whose value is identifiable. It
/// never walks into targets that the definition marks as object references.
pub trait IdentifiableObjectVisitor {
    /// Called for a member holding an identifiable object; the path ends with the member
    fn process_identifiable_members(
        &mut self,
        identifiable: &Identifiable,
        member: &Arc<MemberNode>,
        path: &GraphNodePath,
    );

    /// Called for an item holding an identifiable object; the path ends with the item index
    fn process_identifiable_items(
        &mut self,
        identifiable: &Identifiable,
        collection: &Arc<ObjectNode>,
        index: &NodeIndex,
        path: &GraphNodePath,
    );

    /// Walk the graph reachable from `root`
    fn visit(&mut self, definition: &dyn PropertyGraphDefinition, root: &Arc<ObjectNode>) -> Result<()> {
        let mut walker = IdentifiableWalker {
            visitor: self,
            definition,
        };
        GraphVisitorBase::new(&mut walker).visit(root)
    }
}

/// Adapts an [`IdentifiableObjectVisitor`] to the graph traversal
struct IdentifiableWalker<'a, V: ?Sized> {
    visitor: &'a mut V,
    definition: &'a dyn PropertyGraphDefinition,
}

impl<V: IdentifiableObjectVisitor + ?Sized> GraphVisitor for IdentifiableWalker<'_, V> {
    fn visit_member(&mut self, member: &Arc<MemberNode>, path: &GraphNodePath) {
        if let Some(identifiable) = Identifiable::from_value(&member.retrieve()) {
            self.visitor.process_identifiable_members(&identifiable, member, path);
        }
    }

    fn visit_item(&mut self, collection: &Arc<ObjectNode>, index: &NodeIndex, path: &GraphNodePath) {
        let identifiable = collection
            .retrieve(index)
            .ok()
            .and_then(|value| Identifiable::from_value(&value));
        if let Some(identifiable) = identifiable {
            self.visitor.process_identifiable_items(&identifiable, collection, index, path);
        }
    }

    fn should_visit_member_target(&mut self, member: &MemberNode, target: &ObjectNode) -> bool {
        !self.definition.is_member_target_object_reference(member, target.value())
    }

    fn should_visit_target_item(
        &mut self,
        collection: &ObjectNode,
        index: &NodeIndex,
        target: &ObjectNode,
    ) -> bool {
        !self.definition.is_target_item_object_reference(collection, index, target.value())
    }
}
