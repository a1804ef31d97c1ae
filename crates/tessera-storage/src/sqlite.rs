//! SQLite implementation of [`ModelStore`].
//!
//! [`SqliteStore`] keeps one row per model holding the JSON snapshot, plus
//! the model's imports in a side table. Every write runs in a transaction.

use rusqlite::{params, Connection, OptionalExtension};

use tessera_core::{ModelId, ModelSnapshot};

use crate::error::StorageError;
use crate::traits::ModelStore;
use crate::types::ModelSummary;

/// SQLite-backed implementation of [`ModelStore`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteStore { conn })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore { conn })
    }

    /// Ids of stored models that import `iri`.
    pub fn models_importing(&self, iri: &str) -> Result<Vec<ModelId>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT DISTINCT model_id FROM model_imports WHERE import_iri = ?1 ORDER BY model_id",
        )?;
        let rows = stmt.query_map(params![iri], |row| row.get::<_, String>(0))?;
        let mut result = Vec::new();
        for row in rows {
            result.push(ModelId(row?));
        }
        Ok(result)
    }
}

impl ModelStore for SqliteStore {
    fn save(&mut self, snapshot: &ModelSnapshot) -> Result<(), StorageError> {
        let json = serde_json::to_string(snapshot)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO models (id, iri, snapshot, individuals, facts)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                iri = excluded.iri,
                snapshot = excluded.snapshot,
                individuals = excluded.individuals,
                facts = excluded.facts,
                saved_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')",
            params![
                snapshot.id.as_str(),
                snapshot.iri.as_str(),
                json,
                snapshot.individuals.len() as i64,
                snapshot.facts.len() as i64,
            ],
        )?;
        tx.execute(
            "DELETE FROM model_imports WHERE model_id = ?1",
            params![snapshot.id.as_str()],
        )?;
        for (position, import) in snapshot.imports.iter().enumerate() {
            tx.execute(
                "INSERT INTO model_imports (model_id, position, import_iri) VALUES (?1, ?2, ?3)",
                params![snapshot.id.as_str(), position as i64, import.as_str()],
            )?;
        }
        tx.commit()?;
        tracing::debug!(model = %snapshot.id, "model snapshot written");
        Ok(())
    }

    fn load(&self, id: &ModelId) -> Result<ModelSnapshot, StorageError> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT snapshot FROM models WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let json = json.ok_or_else(|| StorageError::ModelNotFound(id.clone()))?;
        Ok(serde_json::from_str(&json)?)
    }

    fn list(&self) -> Result<Vec<ModelSummary>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, iri, individuals, facts FROM models ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let iri: String = row.get(1)?;
            let individuals: i64 = row.get(2)?;
            let facts: i64 = row.get(3)?;
            Ok(ModelSummary {
                id: ModelId(id),
                iri: tessera_core::Iri(iri),
                individuals: individuals as usize,
                facts: facts as usize,
            })
        })?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn delete(&mut self, id: &ModelId) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        let deleted = tx.execute("DELETE FROM models WHERE id = ?1", params![id.as_str()])?;
        if deleted == 0 {
            return Err(StorageError::ModelNotFound(id.clone()));
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{Annotation, FactSnapshot, Individual, Iri, Shorthand};

    fn snapshot(id: &str, imports: &[&str]) -> ModelSnapshot {
        ModelSnapshot {
            id: ModelId::from(id),
            iri: Iri::new(format!("http://x/{}", id)),
            imports: imports.iter().map(|i| Iri::from(*i)).collect(),
            annotations: vec![Annotation::shorthand(Shorthand::Title, "t")],
            individuals: vec![
                Individual::new("http://x/a".into()),
                Individual::new("http://x/b".into()),
            ],
            facts: vec![FactSnapshot {
                subject: "http://x/a".into(),
                relation: "RO:1".into(),
                object: "http://x/b".into(),
                annotations: vec![],
            }],
        }
    }

    #[test]
    fn roundtrip_and_overwrite() {
        let mut store = SqliteStore::in_memory().unwrap();
        let snap = snapshot("model:1", &["http://go"]);
        store.save(&snap).unwrap();
        assert_eq!(store.load(&snap.id).unwrap(), snap);

        let mut changed = snap.clone();
        changed.facts.clear();
        changed.imports.clear();
        store.save(&changed).unwrap();
        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].facts, 0);
        assert!(store.models_importing("http://go").unwrap().is_empty());
    }

    #[test]
    fn imports_are_indexed() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.save(&snapshot("model:1", &["http://go"])).unwrap();
        store.save(&snapshot("model:2", &["http://go", "http://ro"])).unwrap();
        store.save(&snapshot("model:3", &["http://ro"])).unwrap();
        let ids = store.models_importing("http://go").unwrap();
        assert_eq!(ids, vec![ModelId::from("model:1"), ModelId::from("model:2")]);
    }

    #[test]
    fn delete_cascades_imports() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.save(&snapshot("model:1", &["http://go"])).unwrap();
        store.delete(&ModelId::from("model:1")).unwrap();
        assert!(store.models_importing("http://go").unwrap().is_empty());
        assert!(matches!(
            store.load(&ModelId::from("model:1")),
            Err(StorageError::ModelNotFound(_))
        ));
        assert!(matches!(
            store.delete(&ModelId::from("model:1")),
            Err(StorageError::ModelNotFound(_))
        ));
    }
}
