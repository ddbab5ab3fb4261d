// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors raised while building, reading or updating a node graph.

use crate::descriptor::TypeKey;
use thiserror::Error;

/// Node graph errors
#[derive(Debug, Error)]
pub enum QuantumError {
    /// A structural invariant of the graph would be violated
    #[error("Consistency error: expected {expected}, found {actual}")]
    Consistency {
        /// What the graph requires
        expected: String,
        /// What was actually encountered
        actual: String,
    },

    /// The caller supplied an invalid handle or argument
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// The caller attempted an unsupported operation
    #[error("Invalid operation: {0}")]
    Operation(String),

    /// The type descriptor provider does not know this type
    #[error("Unknown type: {0}")]
    UnknownType(TypeKey),

    /// The node container owning this graph has been dropped
    #[error("The node container of this graph no longer exists")]
    ContainerDropped,

    /// A schema or settings document could not be parsed
    #[error("Schema error: {0}")]
    Schema(#[from] ron::error::SpannedError),

    /// A schema or settings document could not be written
    #[error("Serialization error: {0}")]
    Serialization(#[from] ron::Error),
}

impl QuantumError {
    /// Create a consistency error
    pub fn consistency(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::Consistency {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an argument error
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }

    /// Create an operation error
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation(message.into())
    }
}

/// Result type for node graph operations
pub type Result<T> = std::result::Result<T, QuantumError>;
