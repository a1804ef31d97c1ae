//! The [`ModelStore`] trait defining the storage contract for models.
//!
//! A store persists whole-model snapshots keyed by model id. Saving a model
//! that is already stored overwrites it. All backends implement this trait,
//! so they can be swapped without changing the engine.

use tessera_core::{ModelId, ModelSnapshot};

use crate::error::StorageError;
use crate::types::ModelSummary;

/// The storage contract for models.
///
/// The trait is synchronous; callers serialize access (the server keeps its
/// store behind a mutex).
pub trait ModelStore {
    /// Saves or overwrites a model.
    fn save(&mut self, snapshot: &ModelSnapshot) -> Result<(), StorageError>;

    /// Loads a stored model.
    fn load(&self, id: &ModelId) -> Result<ModelSnapshot, StorageError>;

    /// Lists all stored models, ordered by id.
    fn list(&self) -> Result<Vec<ModelSummary>, StorageError>;

    /// Deletes a stored model.
    fn delete(&mut self, id: &ModelId) -> Result<(), StorageError>;

    /// Loads every stored model, in id order.
    fn load_all(&self) -> Result<Vec<ModelSnapshot>, StorageError> {
        self.list()?
            .into_iter()
            .map(|summary| self.load(&summary.id))
            .collect()
    }
}
