//! Ordered, serializable renderings of a whole model.
//!
//! A [`ModelSnapshot`] lists individuals sorted by IRI and facts sorted by
//! key, so two graphs with the same content produce equal snapshots no matter
//! in which order their nodes and edges were created. Snapshots are the form
//! models take on the wire (import/export) and in the store.

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, AnnotationTarget};
use crate::change::GraphChange;
use crate::error::CoreError;
use crate::graph::ModelGraph;
use crate::id::{EdgeKey, Iri, ModelId};
use crate::node::Individual;

/// A fact with its endpoints spelled out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactSnapshot {
    pub subject: Iri,
    pub relation: Iri,
    pub object: Iri,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl FactSnapshot {
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(
            self.subject.clone(),
            self.relation.clone(),
            self.object.clone(),
        )
    }
}

/// The complete content of one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub id: ModelId,
    pub iri: Iri,
    #[serde(default)]
    pub imports: Vec<Iri>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub individuals: Vec<Individual>,
    #[serde(default)]
    pub facts: Vec<FactSnapshot>,
}

impl ModelSnapshot {
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl ModelGraph {
    /// Renders the model into a snapshot.
    pub fn snapshot(&self) -> ModelSnapshot {
        let mut individuals: Vec<Individual> = self.individuals().cloned().collect();
        individuals.sort_by(|a, b| a.iri.cmp(&b.iri));

        let mut facts: Vec<FactSnapshot> = self
            .facts()
            .map(|(key, fact)| FactSnapshot {
                subject: key.subject,
                relation: key.relation,
                object: key.object,
                annotations: fact.annotations.clone(),
            })
            .collect();
        facts.sort_by(|a, b| a.key().cmp(&b.key()));

        ModelSnapshot {
            id: self.id().clone(),
            iri: self.iri().clone(),
            imports: self.imports().to_vec(),
            annotations: self.annotations().to_vec(),
            individuals,
            facts,
        }
    }

    /// Rebuilds a graph from a snapshot. Facts must reference listed
    /// individuals; duplicate individuals or facts are rejected.
    pub fn from_snapshot(snapshot: &ModelSnapshot) -> Result<ModelGraph, CoreError> {
        let mut graph = ModelGraph::new(snapshot.id.clone(), snapshot.iri.clone());
        if !snapshot.imports.is_empty() {
            graph.apply(&GraphChange::ImportsReplaced {
                previous: Vec::new(),
                next: snapshot.imports.clone(),
            })?;
        }
        if !snapshot.annotations.is_empty() {
            graph.apply(&GraphChange::AnnotationsInserted {
                target: AnnotationTarget::Model,
                entries: snapshot.annotations.iter().cloned().enumerate().collect(),
            })?;
        }
        for individual in &snapshot.individuals {
            graph.apply(&GraphChange::NodeCreated {
                individual: individual.clone(),
            })?;
        }
        for fact in &snapshot.facts {
            graph.apply(&GraphChange::EdgeAdded {
                key: fact.key(),
                annotations: fact.annotations.clone(),
            })?;
        }
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Shorthand;
    use crate::expr::ClassExpr;
    use crate::mutation::GraphEditor;

    fn sample() -> ModelGraph {
        let mut g = ModelGraph::new("model:1".into(), "http://x/model/1".into());
        let mut changes = Vec::new();
        let mut ed = GraphEditor::new(&mut g, &mut changes);
        ed.create_node(Some("b".into()), vec![]).unwrap();
        ed.create_node(Some("a".into()), vec![]).unwrap();
        ed.add_type(&"a".into(), ClassExpr::named("GO:1")).unwrap();
        ed.add_edge(
            EdgeKey::new("a".into(), "r".into(), "b".into()),
            vec![Annotation::shorthand(Shorthand::Comment, "c")],
        )
        .unwrap();
        ed.add_annotations(
            &AnnotationTarget::Model,
            vec![Annotation::shorthand(Shorthand::Title, "t")],
        )
        .unwrap();
        g
    }

    #[test]
    fn snapshot_is_sorted() {
        let snap = sample().snapshot();
        let iris: Vec<&str> = snap.individuals.iter().map(|i| i.iri.as_str()).collect();
        assert_eq!(iris, vec!["a", "b"]);
        assert_eq!(snap.facts.len(), 1);
    }

    #[test]
    fn rebuild_from_snapshot() {
        let snap = sample().snapshot();
        let json = snap.to_json().unwrap();
        let back = ModelSnapshot::from_json(&json).unwrap();
        let rebuilt = ModelGraph::from_snapshot(&back).unwrap();
        assert_eq!(rebuilt.snapshot(), snap);
    }

    #[test]
    fn dangling_fact_is_rejected() {
        let mut snap = sample().snapshot();
        snap.individuals.retain(|i| i.iri.as_str() != "b");
        let err = ModelGraph::from_snapshot(&snap).unwrap_err();
        assert!(matches!(err, CoreError::NodeNotFound { .. }));
    }

    #[test]
    fn bad_json_is_a_snapshot_error() {
        let err = ModelSnapshot::from_json("{").unwrap_err();
        assert!(matches!(err, CoreError::Snapshot(_)));
    }
}
