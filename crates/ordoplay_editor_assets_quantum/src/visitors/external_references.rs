// SPDX-License-Identifier: MIT OR Apache-2.0
//! Collection of the identifiable objects referenced from outside a subtree.

use super::identifiable::IdentifiableObjectVisitor;
use crate::definition::PropertyGraphDefinition;
use crate::identifiable::Identifiable;
use indexmap::{IndexMap, IndexSet};
use ordoplay_editor_quantum::{GraphNodePath, MemberNode, NodeAccessor, NodeIndex, ObjectNode, Result};
use std::sync::Arc;

/// Partitions the identifiable objects reachable from a root into internal
/// and external ones
///
/// An object is external when every occurrence of it is a reference
/// according to the definition. A single owning occurrence makes it
/// internal, however many references to it exist.
pub struct ExternalReferenceCollector<'d> {
    definition: &'d dyn PropertyGraphDefinition,
    internal: IndexSet<Identifiable>,
    external: IndexSet<Identifiable>,
    accessors: IndexMap<Identifiable, Vec<NodeAccessor>>,
}

impl<'d> ExternalReferenceCollector<'d> {
    fn new(definition: &'d dyn PropertyGraphDefinition) -> Self {
        Self {
            definition,
            internal: IndexSet::new(),
            external: IndexSet::new(),
            accessors: IndexMap::new(),
        }
    }

    /// Identifiable objects referenced from `root` but not owned by it
    pub fn get_external_references(
        definition: &'d dyn PropertyGraphDefinition,
        root: &Arc<ObjectNode>,
    ) -> Result<IndexSet<Identifiable>> {
        let mut collector = Self::new(definition);
        collector.collect(root)?;
        Ok(collector.external)
    }

    /// Identifiable objects referenced from `root` but not owned by it, with
    /// the accessor of every referencing slot
    pub fn get_external_reference_accessors(
        definition: &'d dyn PropertyGraphDefinition,
        root: &Arc<ObjectNode>,
    ) -> Result<IndexMap<Identifiable, Vec<NodeAccessor>>> {
        let mut collector = Self::new(definition);
        collector.collect(root)?;
        Ok(collector.accessors)
    }

    fn collect(&mut self, root: &Arc<ObjectNode>) -> Result<()> {
        let definition = self.definition;
        self.visit(definition, root)?;

        // Owned objects are never external, whatever the order they were met in
        let internal = &self.internal;
        self.external.retain(|identifiable| !internal.contains(identifiable));
        self.accessors.retain(|identifiable, _| !internal.contains(identifiable));

        tracing::debug!(
            root = %root.id(),
            internal = self.internal.len(),
            external = self.external.len(),
            "collected external references"
        );
        Ok(())
    }

    fn add_occurrence(&mut self, identifiable: &Identifiable, is_reference: bool, path: &GraphNodePath) {
        if !is_reference {
            self.internal.insert(identifiable.clone());
            return;
        }

        self.external.insert(identifiable.clone());
        match path.get_accessor() {
            Ok(accessor) => self
                .accessors
                .entry(identifiable.clone())
                .or_default()
                .push(accessor),
            Err(error) => tracing::warn!(path = %path, %error, "cannot address external reference"),
        }
    }
}

impl IdentifiableObjectVisitor for ExternalReferenceCollector<'_> {
    fn process_identifiable_members(
        &mut self,
        identifiable: &Identifiable,
        member: &Arc<MemberNode>,
        path: &GraphNodePath,
    ) {
        let is_reference = self
            .definition
            .is_member_target_object_reference(member, &identifiable.to_value());
        self.add_occurrence(identifiable, is_reference, path);
    }

    fn process_identifiable_items(
        &mut self,
        identifiable: &Identifiable,
        collection: &Arc<ObjectNode>,
        index: &NodeIndex,
        path: &GraphNodePath,
    ) {
        let is_reference = self
            .definition
            .is_target_item_object_reference(collection, index, &identifiable.to_value());
        self.add_occurrence(identifiable, is_reference, path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::DefaultPropertyGraphDefinition;
    use crate::visitors::fixtures::{asset, container, list, part, set, ReferencePolicy};
    use ordoplay_editor_quantum::{GraphNode, Value};

    #[test]
    fn test_owned_plain_object_has_no_external_references() {
        let container = container();
        let root = part("A");
        set(&root, "Inner", part("B"));
        let node = container.get_or_create_node(&root.into()).unwrap().unwrap();

        let external = ExternalReferenceCollector::get_external_references(&ReferencePolicy, &node).unwrap();
        assert!(external.is_empty());
    }

    #[test]
    fn test_referenced_object_is_external() {
        let container = container();
        let root = part("A");
        let target = asset("X");
        set(&root, "Ref", target.clone());
        let node = container.get_or_create_node(&root.into()).unwrap().unwrap();

        let external = ExternalReferenceCollector::get_external_references(&ReferencePolicy, &node).unwrap();
        let expected = Identifiable::from_value(&target.into()).unwrap();
        assert_eq!(external.len(), 1);
        assert!(external.contains(&expected));

        let accessors =
            ExternalReferenceCollector::get_external_reference_accessors(&ReferencePolicy, &node).unwrap();
        let paths = &accessors[&expected];
        assert_eq!(paths.len(), 1);
        assert!(paths[0].is_member());
        assert_eq!(paths[0].to_string(), "Ref");
        assert_eq!(paths[0].node(), &GraphNode::Member(node.member("Ref").unwrap().clone()));
    }

    #[test]
    fn test_owned_occurrence_wins_over_reference() {
        let container = container();
        let root = part("A");
        let shared = asset("X");
        set(&root, "Inner", shared.clone());
        set(
            &root,
            "Refs",
            list(
                "RefList",
                [
                    Value::from(part("r0")),
                    Value::from(part("r1")),
                    Value::Null,
                    Value::from(shared.clone()),
                ],
            ),
        );
        let node = container.get_or_create_node(&root.into()).unwrap().unwrap();

        let external = ExternalReferenceCollector::get_external_references(&ReferencePolicy, &node).unwrap();
        assert!(external.is_empty());
        let accessors =
            ExternalReferenceCollector::get_external_reference_accessors(&ReferencePolicy, &node).unwrap();
        assert!(accessors.is_empty());
    }

    #[test]
    fn test_reference_met_before_owner_is_still_internal() {
        let container = container();
        let root = part("A");
        let shared = asset("X");
        // Declaration order puts the reference first
        set(&root, "Ref", shared.clone());
        set(&root, "Refs", list("RefList", []));
        set(&root, "Parts", list("PartList", [Value::from(shared.clone())]));
        let node = container.get_or_create_node(&root.into()).unwrap().unwrap();

        let external = ExternalReferenceCollector::get_external_references(&ReferencePolicy, &node).unwrap();
        assert!(external.is_empty());
    }

    #[test]
    fn test_every_external_path_is_kept() {
        let container = container();
        let root = part("A");
        let target = asset("X");
        let other = asset("Y");
        set(&root, "Ref", target.clone());
        set(
            &root,
            "Refs",
            list("RefList", [Value::from(other.clone()), Value::from(target.clone())]),
        );
        let node = container.get_or_create_node(&root.into()).unwrap().unwrap();

        let accessors =
            ExternalReferenceCollector::get_external_reference_accessors(&ReferencePolicy, &node).unwrap();
        let target = Identifiable::from_value(&target.into()).unwrap();
        let other = Identifiable::from_value(&other.into()).unwrap();
        assert_eq!(accessors.keys().cloned().collect::<Vec<_>>(), vec![target.clone(), other.clone()]);

        let paths: Vec<String> = accessors[&target].iter().map(ToString::to_string).collect();
        assert_eq!(paths, vec!["Ref", "[1]"]);
        assert!(accessors[&target][1].is_item());
        assert_eq!(accessors[&target][1].retrieve_value().unwrap(), target.to_value());
        assert_eq!(accessors[&other].len(), 1);
    }

    #[test]
    fn test_writing_back_through_accessors_changes_nothing() {
        let container = container();
        let root = part("A");
        let target = asset("X");
        let other = asset("Y");
        set(&root, "Inner", part("B"));
        set(&root, "Ref", target.clone());
        set(
            &root,
            "Refs",
            list("RefList", [Value::from(target), Value::Null, Value::from(other)]),
        );
        let node = container.get_or_create_node(&root.clone().into()).unwrap().unwrap();
        let nodes_before = container.len();
        let snapshot = format!("{:?}", root.read());

        let accessors =
            ExternalReferenceCollector::get_external_reference_accessors(&ReferencePolicy, &node).unwrap();
        let mut count = 0;
        for accessor in accessors.values().flatten() {
            let value = accessor.retrieve_value().unwrap();
            accessor.update_value(value.clone()).unwrap();
            assert_eq!(accessor.retrieve_value().unwrap(), value);
            count += 1;
        }
        assert_eq!(count, 3);
        assert_eq!(container.len(), nodes_before);
        assert_eq!(format!("{:?}", root.read()), snapshot);
        assert!(Arc::ptr_eq(
            &node.member("Ref").unwrap().target().unwrap().unwrap(),
            &container.get_node(&node.member("Ref").unwrap().retrieve()).unwrap(),
        ));
    }

    #[test]
    fn test_default_definition_owns_everything() {
        let container = container();
        let root = part("A");
        set(&root, "Ref", asset("X"));
        let node = container.get_or_create_node(&root.into()).unwrap().unwrap();

        let external =
            ExternalReferenceCollector::get_external_references(&DefaultPropertyGraphDefinition, &node).unwrap();
        assert!(external.is_empty());
    }
}
