// SPDX-License-Identifier: MIT OR Apache-2.0
//! Policies deciding which graph edges are object references.

use ordoplay_editor_quantum::{MemberNode, NodeIndex, ObjectNode, Value};

/// Decides whether an occurrence of a value is a reference to an object
/// living outside the analyzed subtree
///
/// Visitors never walk into such references. Both predicates default to
/// `false`, making every object owned by the subtree.
pub trait PropertyGraphDefinition: Send + Sync {
    /// Whether the value of `member` refers to an object outside the subtree
    fn is_member_target_object_reference(&self, _member: &MemberNode, _value: &Value) -> bool {
        false
    }

    /// Whether the item at `index` of `collection` refers to an object outside the subtree
    fn is_target_item_object_reference(
        &self,
        _collection: &ObjectNode,
        _index: &NodeIndex,
        _value: &Value,
    ) -> bool {
        false
    }
}

/// Definition treating every object as owned
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPropertyGraphDefinition;

impl PropertyGraphDefinition for DefaultPropertyGraphDefinition {}
