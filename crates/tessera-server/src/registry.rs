//! The set of open models.
//!
//! [`ModelRegistry`] maps model ids to [`ModelContainer`]s (graph plus undo
//! history), each behind its own `RwLock` so that batches on different models
//! run in parallel. The registry is created once per process and handed to
//! the engine.

use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use uuid::Uuid;

use tessera_core::{Iri, ModelGraph, ModelId, ModelSnapshot};
use tessera_storage::ModelStore;

use crate::error::ApiError;
use crate::undo::UndoManager;

/// Prefix of generated model ids.
pub const MODEL_ID_PREFIX: &str = "model";

/// A model with its per-user history.
#[derive(Debug, Clone)]
pub struct ModelContainer {
    pub graph: ModelGraph,
    pub history: UndoManager,
}

impl ModelContainer {
    pub fn new(graph: ModelGraph, undo_capacity: usize) -> Self {
        ModelContainer {
            graph,
            history: UndoManager::new(undo_capacity),
        }
    }

    pub fn id(&self) -> &ModelId {
        self.graph.id()
    }
}

pub type ModelHandle = Arc<RwLock<ModelContainer>>;

pub struct ModelRegistry {
    models: DashMap<ModelId, ModelHandle>,
    undo_capacity: usize,
}

impl ModelRegistry {
    pub fn new(undo_capacity: usize) -> Self {
        ModelRegistry {
            models: DashMap::new(),
            undo_capacity,
        }
    }

    /// Fixes the model of a batch. The first call looks `requested` up and
    /// stores it in `current`; later calls only check that the same model is
    /// named (or none).
    pub fn resolve(
        &self,
        current: &mut Option<ModelId>,
        requested: Option<&str>,
    ) -> Result<ModelId, ApiError> {
        match (current.as_ref(), requested) {
            (Some(id), None) => Ok(id.clone()),
            (Some(id), Some(other)) if id.as_str() == other => Ok(id.clone()),
            (Some(id), Some(other)) => Err(ApiError::MultipleModelIds(format!(
                "{} and {}",
                id, other
            ))),
            (None, None) => Err(ApiError::MissingParameter("model_id".to_string())),
            (None, Some(requested)) => {
                let id = ModelId::from(requested);
                if !self.models.contains_key(&id) {
                    return Err(ApiError::UnknownIdentifier(format!("model {}", requested)));
                }
                *current = Some(id.clone());
                Ok(id)
            }
        }
    }

    pub fn handle(&self, id: &ModelId) -> Result<ModelHandle, ApiError> {
        self.models
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ApiError::UnknownIdentifier(format!("model {}", id)))
    }

    pub fn contains(&self, id: &ModelId) -> bool {
        self.models.contains_key(id)
    }

    /// A new, unregistered empty model with an id and an IRI under `base`.
    pub fn create_blank(&self, base: &str) -> ModelContainer {
        let local = Uuid::new_v4().simple().to_string();
        let id = ModelId::new(format!("{}:{}", MODEL_ID_PREFIX, local));
        let iri = Iri::new(format!("{}{}", base, local));
        ModelContainer::new(ModelGraph::new(id, iri), self.undo_capacity)
    }

    /// A new, unregistered model rebuilt from a snapshot.
    pub fn import(&self, snapshot: &ModelSnapshot) -> Result<ModelContainer, ApiError> {
        if self.contains(&snapshot.id) {
            return Err(ApiError::IdentifierConflict(format!(
                "model {} already exists",
                snapshot.id
            )));
        }
        let graph = ModelGraph::from_snapshot(snapshot)?;
        Ok(ModelContainer::new(graph, self.undo_capacity))
    }

    /// Registers a model; fails if its id is taken.
    pub fn insert(&self, container: ModelContainer) -> Result<ModelHandle, ApiError> {
        use dashmap::mapref::entry::Entry;

        match self.models.entry(container.id().clone()) {
            Entry::Occupied(entry) => Err(ApiError::IdentifierConflict(format!(
                "model {} already exists",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                let handle = Arc::new(RwLock::new(container));
                entry.insert(Arc::clone(&handle));
                Ok(handle)
            }
        }
    }

    /// Ids of all open models, sorted.
    pub fn model_ids(&self) -> Vec<ModelId> {
        let mut ids: Vec<ModelId> = self.models.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Opens every stored model that is not open yet. Returns how many were
    /// loaded.
    pub fn load_all(&self, store: &dyn ModelStore) -> Result<usize, ApiError> {
        let mut loaded = 0;
        for snapshot in store.load_all()? {
            if self.contains(&snapshot.id) {
                continue;
            }
            let graph = ModelGraph::from_snapshot(&snapshot)?;
            self.insert(ModelContainer::new(graph, self.undo_capacity))?;
            loaded += 1;
        }
        tracing::info!(models = loaded, "loaded stored models");
        Ok(loaded)
    }

    /// Snapshot of a model's current state. The read lock is released before
    /// returning, so callers may take the store lock afterwards.
    pub fn snapshot(&self, id: &ModelId) -> Result<ModelSnapshot, ApiError> {
        let handle = self.handle(id)?;
        let container = read(&handle)?;
        Ok(container.graph.snapshot())
    }

    /// Writes the current state of a model to the store.
    pub fn save(&self, id: &ModelId, store: &mut dyn ModelStore) -> Result<(), ApiError> {
        let snapshot = self.snapshot(id)?;
        store.save(&snapshot)?;
        tracing::info!(model = %id, "model saved");
        Ok(())
    }
}

/// Read-locks a model.
pub fn read(handle: &ModelHandle) -> Result<std::sync::RwLockReadGuard<'_, ModelContainer>, ApiError> {
    handle
        .read()
        .map_err(|_| ApiError::InternalError("model lock poisoned".to_string()))
}

/// Write-locks a model.
pub fn write(
    handle: &ModelHandle,
) -> Result<std::sync::RwLockWriteGuard<'_, ModelContainer>, ApiError> {
    handle
        .write()
        .map_err(|_| ApiError::InternalError("model lock poisoned".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_storage::InMemoryStore;

    #[test]
    fn resolve_fixes_the_first_model() {
        let registry = ModelRegistry::new(10);
        let container = registry.create_blank("http://x/model/");
        let id = container.id().clone();
        registry.insert(container).unwrap();

        let mut current = None;
        assert_eq!(registry.resolve(&mut current, Some(id.as_str())).unwrap(), id);
        assert_eq!(current.as_ref(), Some(&id));
        assert_eq!(registry.resolve(&mut current, None).unwrap(), id);
        let err = registry
            .resolve(&mut current, Some("model:other"))
            .unwrap_err();
        assert!(matches!(err, ApiError::MultipleModelIds(_)));
    }

    #[test]
    fn resolve_reports_missing_and_unknown() {
        let registry = ModelRegistry::new(10);
        let mut current = None;
        assert!(matches!(
            registry.resolve(&mut current, None),
            Err(ApiError::MissingParameter(_))
        ));
        assert!(matches!(
            registry.resolve(&mut current, Some("model:nope")),
            Err(ApiError::UnknownIdentifier(_))
        ));
        assert!(current.is_none());
    }

    #[test]
    fn insert_rejects_duplicates() {
        let registry = ModelRegistry::new(10);
        let container = registry.create_blank("http://x/model/");
        registry.insert(container.clone()).unwrap();
        assert!(matches!(
            registry.insert(container),
            Err(ApiError::IdentifierConflict(_))
        ));
    }

    #[test]
    fn save_and_load_all() {
        let registry = ModelRegistry::new(10);
        let container = registry.create_blank("http://x/model/");
        let id = container.id().clone();
        registry.insert(container).unwrap();
        let mut store = InMemoryStore::new();
        registry.save(&id, &mut store).unwrap();

        let fresh = ModelRegistry::new(10);
        assert_eq!(fresh.load_all(&store).unwrap(), 1);
        assert_eq!(fresh.model_ids(), vec![id]);
        assert_eq!(fresh.load_all(&store).unwrap(), 0);
    }
}
