//! Application state shared by the axum handlers.
//!
//! The engine does its own locking (one `RwLock` per model, a `Mutex` around
//! the store), so [`AppState`] only holds an `Arc<BatchEngine>` and handlers
//! never serialize on a global lock.

use std::sync::Arc;

use tessera_storage::{InMemoryStore, ModelStore, SqliteStore};

use crate::config::EngineConfig;
use crate::error::ApiError;
use crate::registry::ModelRegistry;
use crate::service::BatchEngine;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BatchEngine>,
}

impl AppState {
    /// Builds the engine for `config`: a SQLite store when `db_path` is set,
    /// an in-memory store otherwise. Stored models are opened right away.
    pub fn new(config: EngineConfig) -> Result<Self, ApiError> {
        let store: Box<dyn ModelStore + Send> = match &config.db_path {
            Some(path) => Box::new(SqliteStore::new(path)?),
            None => Box::new(InMemoryStore::new()),
        };
        let registry = Arc::new(ModelRegistry::new(config.undo_capacity));
        let engine = BatchEngine::new(config, registry, store);
        engine.load_stored()?;
        Ok(Self::with_engine(engine))
    }

    /// State with default configuration and an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, ApiError> {
        Self::new(EngineConfig::default())
    }

    pub fn with_engine(engine: BatchEngine) -> Self {
        AppState {
            engine: Arc::new(engine),
        }
    }
}
