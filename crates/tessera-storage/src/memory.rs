//! In-memory implementation of [`ModelStore`].
//!
//! [`InMemoryStore`] is a first-class backend for tests and for servers
//! started without a database path. It keeps serialized snapshots so that
//! a load always returns an independent copy, with the same semantics as the
//! SQLite backend.

use std::collections::BTreeMap;

use tessera_core::{ModelId, ModelSnapshot};

use crate::error::StorageError;
use crate::traits::ModelStore;
use crate::types::ModelSummary;

/// Snapshots held in memory, keyed by model id.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    models: BTreeMap<ModelId, (ModelSummary, String)>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    /// Number of stored models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl ModelStore for InMemoryStore {
    fn save(&mut self, snapshot: &ModelSnapshot) -> Result<(), StorageError> {
        let json = serde_json::to_string(snapshot)?;
        self.models
            .insert(snapshot.id.clone(), (ModelSummary::of(snapshot), json));
        Ok(())
    }

    fn load(&self, id: &ModelId) -> Result<ModelSnapshot, StorageError> {
        let (_, json) = self
            .models
            .get(id)
            .ok_or_else(|| StorageError::ModelNotFound(id.clone()))?;
        Ok(serde_json::from_str(json)?)
    }

    fn list(&self) -> Result<Vec<ModelSummary>, StorageError> {
        Ok(self.models.values().map(|(summary, _)| summary.clone()).collect())
    }

    fn delete(&mut self, id: &ModelId) -> Result<(), StorageError> {
        self.models
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::ModelNotFound(id.clone()))
    }
}
