// SPDX-License-Identifier: MIT OR Apache-2.0
//! References from graph slots to other object nodes.
//!
//! A reference names its target, it never owns it. The target node is
//! resolved lazily by the [`NodeContainer`](crate::NodeContainer), and
//! refreshed whenever the slot holding the reference is updated.

use crate::descriptor::TypeKey;
use crate::ident::NodeId;
use crate::index::NodeIndex;
use crate::value::Value;
use indexmap::IndexMap;
use parking_lot::RwLock;

#[derive(Debug, Clone)]
struct ReferenceTarget {
    value: Value,
    node: Option<NodeId>,
}

/// Reference to a single target object
#[derive(Debug)]
pub struct ObjectReference {
    /// Index of the referencing slot in its node
    index: NodeIndex,
    /// Whether the referencing slot is a member
    is_data_member: bool,
    /// Declared type of the referencing slot
    declared_type: TypeKey,
    /// Current target
    target: RwLock<ReferenceTarget>,
}

impl ObjectReference {
    pub(crate) fn new(value: Value, declared_type: TypeKey, index: NodeIndex, is_data_member: bool) -> Self {
        Self {
            index,
            is_data_member,
            declared_type,
            target: RwLock::new(ReferenceTarget { value, node: None }),
        }
    }

    /// Index of the referencing slot in its node
    pub fn index(&self) -> &NodeIndex {
        &self.index
    }

    /// Whether the referencing slot is a member (as opposed to a collection item)
    pub fn is_data_member(&self) -> bool {
        self.is_data_member
    }

    /// Declared type of the referencing slot
    pub fn declared_type(&self) -> &TypeKey {
        &self.declared_type
    }

    /// Value currently referenced
    pub fn target_value(&self) -> Value {
        self.target.read().value.clone()
    }

    /// Identity of the target node, once resolved
    pub fn target_id(&self) -> Option<NodeId> {
        self.target.read().node
    }

    /// Point to a new value; the target node must be resolved again
    pub(crate) fn retarget(&self, value: Value) {
        let mut target = self.target.write();
        target.value = value;
        target.node = None;
    }

    /// Record the node resolved for `value`, unless the reference moved on meanwhile
    pub(crate) fn resolve(&self, value: &Value, node: Option<NodeId>) {
        let mut target = self.target.write();
        if &target.value == value {
            target.node = node;
        }
    }
}

/// References held by the items of a collection or dictionary
#[derive(Debug)]
pub struct ReferenceEnumerable {
    /// Declared item type
    element_type: TypeKey,
    /// One reference per item
    items: IndexMap<NodeIndex, ObjectReference>,
}

impl ReferenceEnumerable {
    pub(crate) fn new(element_type: TypeKey, items: impl IntoIterator<Item = (NodeIndex, Value)>) -> Self {
        let items = items
            .into_iter()
            .map(|(index, value)| {
                let reference = ObjectReference::new(value, element_type.clone(), index.clone(), false);
                (index, reference)
            })
            .collect();
        Self { element_type, items }
    }

    /// Declared item type
    pub fn element_type(&self) -> &TypeKey {
        &self.element_type
    }

    /// Get the reference of an item
    pub fn get(&self, index: &NodeIndex) -> Option<&ObjectReference> {
        self.items.get(index)
    }

    /// Get all item references, in item order
    pub fn iter(&self) -> impl Iterator<Item = &ObjectReference> {
        self.items.values()
    }

    /// Get all item indices, in item order
    pub fn indices(&self) -> impl Iterator<Item = &NodeIndex> {
        self.items.keys()
    }

    /// Get the number of item references
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check whether there are no item references
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// How a slot points to other objects
#[derive(Debug)]
pub enum Reference {
    /// The slot holds a single object
    Object(ObjectReference),
    /// The slot holds a collection whose items are objects
    Enumerable(ReferenceEnumerable),
}

impl Reference {
    /// Get the single object reference, if any
    pub fn as_object(&self) -> Option<&ObjectReference> {
        match self {
            Self::Object(reference) => Some(reference),
            Self::Enumerable(_) => None,
        }
    }

    /// Get the item references, if any
    pub fn as_enumerable(&self) -> Option<&ReferenceEnumerable> {
        match self {
            Self::Enumerable(references) => Some(references),
            Self::Object(_) => None,
        }
    }

    /// Every object reference carried by this reference
    pub fn object_references(&self) -> Box<dyn Iterator<Item = &ObjectReference> + '_> {
        match self {
            Self::Object(reference) => Box::new(std::iter::once(reference)),
            Self::Enumerable(references) => Box::new(references.iter()),
        }
    }
}
