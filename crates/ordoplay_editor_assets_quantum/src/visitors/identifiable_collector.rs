// SPDX-License-Identifier: MIT OR Apache-2.0
//! Collection of the identifiable objects owned by a subtree.

use super::identifiable::IdentifiableObjectVisitor;
use crate::definition::PropertyGraphDefinition;
use crate::identifiable::Identifiable;
use indexmap::IndexMap;
use ordoplay_editor_quantum::{GraphNodePath, MemberNode, NodeIndex, ObjectNode, Result};
use std::sync::Arc;
use uuid::Uuid;

/// Collects the identifiable objects reached through owning occurrences
///
/// The root counts as owned. Objects only reached through references are
/// left out.
pub struct IdentifiableObjectCollector<'d> {
    definition: &'d dyn PropertyGraphDefinition,
    collected: IndexMap<Uuid, Identifiable>,
}

impl<'d> IdentifiableObjectCollector<'d> {
    /// Identifiable objects owned by `root`, by identifier
    pub fn collect(
        definition: &'d dyn PropertyGraphDefinition,
        root: &Arc<ObjectNode>,
    ) -> Result<IndexMap<Uuid, Identifiable>> {
        let mut collector = Self {
            definition,
            collected: IndexMap::new(),
        };
        if let Some(identifiable) = Identifiable::from_value(root.value()) {
            collector.add(identifiable);
        }
        collector.visit(definition, root)?;
        Ok(collector.collected)
    }

    fn add(&mut self, identifiable: Identifiable) {
        if let Some(previous) = self.collected.get(&identifiable.id()) {
            if previous != &identifiable {
                tracing::warn!(id = %identifiable.id(), "distinct objects share an identifier");
            }
            return;
        }
        self.collected.insert(identifiable.id(), identifiable);
    }
}

impl IdentifiableObjectVisitor for IdentifiableObjectCollector<'_> {
    fn process_identifiable_members(
        &mut self,
        identifiable: &Identifiable,
        member: &Arc<MemberNode>,
        _path: &GraphNodePath,
    ) {
        if !self
            .definition
            .is_member_target_object_reference(member, &identifiable.to_value())
        {
            self.add(identifiable.clone());
        }
    }

    fn process_identifiable_items(
        &mut self,
        identifiable: &Identifiable,
        collection: &Arc<ObjectNode>,
        index: &NodeIndex,
        _path: &GraphNodePath,
    ) {
        if !self
            .definition
            .is_target_item_object_reference(collection, index, &identifiable.to_value())
        {
            self.add(identifiable.clone());
        }
    }
}
