// SPDX-License-Identifier: MIT OR Apache-2.0
//! Asset-level analysis over the `OrdoPlay` Editor object graph.
//!
//! This crate classifies the identifiable objects reachable from a node:
//! - Identifiable-object visitors surfacing every member and item holding one
//! - External-reference collection (objects referenced from outside a subtree)
//! - Collection of the identifiable objects owned by a subtree
//!
//! What counts as a reference crossing the subtree boundary is decided by a
//! [`PropertyGraphDefinition`] supplied by the caller.

pub mod definition;
pub mod identifiable;
pub mod visitors;

pub use definition::{DefaultPropertyGraphDefinition, PropertyGraphDefinition};
pub use identifiable::Identifiable;
pub use visitors::{ExternalReferenceCollector, IdentifiableObjectCollector, IdentifiableObjectVisitor};
