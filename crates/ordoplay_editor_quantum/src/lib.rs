// SPDX-License-Identifier: MIT OR Apache-2.0
//! Introspected object graph for `OrdoPlay` Editor.
//!
//! This crate mirrors arbitrary runtime values as a graph of nodes that
//! powers:
//! - Property grids and inspectors
//! - Undoable edits through uniform value accessors
//! - Asset analysis (identifiable objects, external references)
//!
//! ## Architecture
//!
//! The framework is built on a pluggable type model with:
//! - Type descriptors supplied by a [`TypeDescriptorProvider`]
//! - Sealed object and member nodes produced by the [`NodeBuilder`]
//! - Lazily resolved references, owned by a [`NodeContainer`]
//! - Accessors, paths and a depth-first visitor skeleton

pub mod accessor;
pub mod builder;
pub mod container;
pub mod descriptor;
pub mod error;
pub mod ident;
pub mod index;
pub mod node;
pub mod path;
pub mod reference;
pub mod signal;
pub mod value;
pub mod visitor;

pub use accessor::NodeAccessor;
pub use builder::{NodeBuilder, NodeBuilderSettings};
pub use container::NodeContainer;
pub use descriptor::{MemberDescriptor, TypeDescriptor, TypeDescriptorProvider, TypeKey, TypeKind, TypeRegistry};
pub use error::{QuantumError, Result};
pub use ident::NodeId;
pub use index::NodeIndex;
pub use node::{GraphNode, MemberNode, ObjectNode};
pub use path::{GraphNodePath, GraphNodePathElement};
pub use reference::{ObjectReference, Reference, ReferenceEnumerable};
pub use signal::AsyncAutoResetEvent;
pub use value::{IndexKey, Instance, InstanceData, ObjectKey, ObjectRef, Value};
pub use visitor::{GraphVisitor, GraphVisitorBase};
