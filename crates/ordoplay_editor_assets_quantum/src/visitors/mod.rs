// SPDX-License-Identifier: MIT OR Apache-2.0
//! Visitors classifying identifiable objects.

mod external_references;
mod identifiable;
mod identifiable_collector;

pub use external_references::ExternalReferenceCollector;
pub use identifiable::IdentifiableObjectVisitor;
pub use identifiable_collector::IdentifiableObjectCollector;
