//! Core error types for tessera-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failure modes of the model graph and its change application.

use thiserror::Error;

use crate::id::{EdgeKey, Iri};

/// Core errors produced by the tessera-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A node IRI was not found in the model.
    #[error("node not found: {iri}")]
    NodeNotFound { iri: Iri },

    /// No fact exists for the given triple.
    #[error("edge not found: {key}")]
    EdgeNotFound { key: EdgeKey },

    /// A node with this IRI already exists in the model.
    #[error("identifier already in use: {iri}")]
    IdentifierConflict { iri: Iri },

    /// A change could not be applied to the current graph state.
    #[error("invalid change: {reason}")]
    InvalidChange { reason: String },

    /// A snapshot could not be (de)serialized.
    #[error("snapshot serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        CoreError::InvalidChange {
            reason: reason.into(),
        }
    }
}
