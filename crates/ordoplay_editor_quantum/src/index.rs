// SPDX-License-Identifier: MIT OR Apache-2.0
//! Item coordinates inside collection and dictionary nodes.

use crate::value::IndexKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of an item in a collection or dictionary node
///
/// `Empty` addresses the node itself rather than one of its items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeIndex {
    /// The node itself
    #[default]
    Empty,
    /// Position of a collection item
    Position(usize),
    /// Key of a dictionary entry
    Key(IndexKey),
}

impl NodeIndex {
    /// Check whether this index addresses the node itself
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<usize> for NodeIndex {
    fn from(value: usize) -> Self {
        Self::Position(value)
    }
}

impl From<IndexKey> for NodeIndex {
    fn from(value: IndexKey) -> Self {
        Self::Key(value)
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Position(position) => write!(f, "[{position}]"),
            Self::Key(key) => write!(f, "[{key}]"),
        }
    }
}
