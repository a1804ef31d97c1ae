//! Storage-layer metadata about stored models.

use serde::{Deserialize, Serialize};

use tessera_core::{Iri, ModelId, ModelSnapshot};

/// Summary of a stored model (for listing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub id: ModelId,
    pub iri: Iri,
    /// Number of individuals at save time.
    pub individuals: usize,
    /// Number of facts at save time.
    pub facts: usize,
}

impl ModelSummary {
    pub fn of(snapshot: &ModelSnapshot) -> Self {
        ModelSummary {
            id: snapshot.id.clone(),
            iri: snapshot.iri.clone(),
            individuals: snapshot.individuals.len(),
            facts: snapshot.facts.len(),
        }
    }
}
