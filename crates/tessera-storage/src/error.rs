//! Storage error types for tessera-storage.
//!
//! [`StorageError`] covers the failure modes of the storage layer: SQLite and
//! migration failures, snapshot (de)serialization, missing models, and
//! snapshots that no longer rebuild into a valid graph.

use tessera_core::{CoreError, ModelId};
use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An underlying SQLite call failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A schema migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No model with the given id is stored.
    #[error("model not found: {0}")]
    ModelNotFound(ModelId),

    /// A stored snapshot could not be turned back into a graph.
    #[error("reconstruction error: {0}")]
    Reconstruction(#[from] CoreError),
}
