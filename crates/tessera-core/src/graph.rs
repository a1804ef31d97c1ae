//! ModelGraph: the node/edge container for one model.
//!
//! Nodes ([`Individual`]) and facts ([`Fact`]) live in a petgraph
//! `StableGraph`, so node indices stay valid across removals. An `IndexMap`
//! maps node IRIs to their indices in insertion order.
//!
//! All mutations go through [`ModelGraph::apply`], which validates a
//! [`GraphChange`] strictly against the current state before performing it.
//! A change that does not fit the current state (a type already present, an
//! annotation not at the recorded position, a node with remaining edges) is
//! rejected with [`CoreError::InvalidChange`] and leaves the graph untouched.

use indexmap::IndexMap;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableGraph;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::{Directed, Direction};
use uuid::Uuid;

use crate::annotation::{Annotation, AnnotationTarget};
use crate::change::GraphChange;
use crate::error::CoreError;
use crate::id::{EdgeKey, Iri, ModelId};
use crate::node::{Fact, Individual};

/// The graph of one model, with model-level annotations and imports.
#[derive(Debug, Clone)]
pub struct ModelGraph {
    id: ModelId,
    iri: Iri,
    graph: StableGraph<Individual, Fact, Directed, u32>,
    index: IndexMap<Iri, NodeIndex<u32>>,
    annotations: Vec<Annotation>,
    imports: Vec<Iri>,
}

impl ModelGraph {
    /// Creates an empty model.
    pub fn new(id: ModelId, iri: Iri) -> Self {
        ModelGraph {
            id,
            iri,
            graph: StableGraph::default(),
            index: IndexMap::new(),
            annotations: Vec::new(),
            imports: Vec::new(),
        }
    }

    pub fn id(&self) -> &ModelId {
        &self.id
    }

    pub fn iri(&self) -> &Iri {
        &self.iri
    }

    pub fn imports(&self) -> &[Iri] {
        &self.imports
    }

    /// Model-level annotations, in order.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn contains_node(&self, iri: &Iri) -> bool {
        self.index.contains_key(iri)
    }

    pub fn individual(&self, iri: &Iri) -> Option<&Individual> {
        self.index.get(iri).and_then(|idx| self.graph.node_weight(*idx))
    }

    /// All nodes in insertion order.
    pub fn individuals(&self) -> impl Iterator<Item = &Individual> {
        self.index.values().filter_map(|idx| self.graph.node_weight(*idx))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn fact(&self, key: &EdgeKey) -> Option<&Fact> {
        self.find_edge(key).and_then(|e| self.graph.edge_weight(e))
    }

    /// All facts with their keys.
    pub fn facts(&self) -> impl Iterator<Item = (EdgeKey, &Fact)> + '_ {
        self.graph.edge_references().filter_map(move |edge| {
            let subject = &self.graph.node_weight(edge.source())?.iri;
            let object = &self.graph.node_weight(edge.target())?.iri;
            let fact = edge.weight();
            Some((
                EdgeKey::new(subject.clone(), fact.relation.clone(), object.clone()),
                fact,
            ))
        })
    }

    /// Keys of every fact the node is subject or object of.
    pub fn edges_of(&self, iri: &Iri) -> Vec<EdgeKey> {
        let Some(&idx) = self.index.get(iri) else {
            return Vec::new();
        };
        let mut keys = Vec::new();
        for direction in [Direction::Outgoing, Direction::Incoming] {
            for edge in self.graph.edges_directed(idx, direction) {
                if let Some(key) = self.key_of(edge.id()) {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
            }
        }
        keys
    }

    /// The annotation list of a node, fact or the model.
    pub fn annotations_of(&self, target: &AnnotationTarget) -> Result<&[Annotation], CoreError> {
        match target {
            AnnotationTarget::Node { iri } => self
                .individual(iri)
                .map(|ind| ind.annotations.as_slice())
                .ok_or_else(|| CoreError::NodeNotFound { iri: iri.clone() }),
            AnnotationTarget::Edge { key } => self
                .fact(key)
                .map(|fact| fact.annotations.as_slice())
                .ok_or_else(|| CoreError::EdgeNotFound { key: key.clone() }),
            AnnotationTarget::Model => Ok(&self.annotations),
        }
    }

    /// Targets other than `iri` itself that carry an annotation whose value is `iri`.
    pub fn referencing_targets(&self, iri: &Iri) -> Vec<AnnotationTarget> {
        let refers = |anns: &[Annotation]| anns.iter().any(|a| a.value.as_iri() == Some(iri));
        let mut targets = Vec::new();
        for ind in self.individuals() {
            if &ind.iri != iri && refers(&ind.annotations) {
                targets.push(AnnotationTarget::node(ind.iri.clone()));
            }
        }
        for (key, fact) in self.facts() {
            if refers(&fact.annotations) {
                targets.push(AnnotationTarget::edge(key));
            }
        }
        if refers(&self.annotations) {
            targets.push(AnnotationTarget::Model);
        }
        targets
    }

    /// Returns `true` if the node is an edge endpoint or the value of an
    /// annotation on another node, a fact or the model. The node's own
    /// annotations do not count.
    pub fn is_referenced(&self, iri: &Iri) -> bool {
        if let Some(&idx) = self.index.get(iri) {
            if self.graph.edges_directed(idx, Direction::Outgoing).next().is_some()
                || self.graph.edges_directed(idx, Direction::Incoming).next().is_some()
            {
                return true;
            }
        }
        !self.referencing_targets(iri).is_empty()
    }

    /// A fresh node IRI under this model's IRI.
    pub fn mint_node_iri(&self) -> Iri {
        loop {
            let candidate = Iri::new(format!("{}/{}", self.iri, Uuid::new_v4().simple()));
            if !self.contains_node(&candidate) {
                return candidate;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Applies a single change, validating it against the current state first.
    pub fn apply(&mut self, change: &GraphChange) -> Result<(), CoreError> {
        match change {
            GraphChange::NodeCreated { individual } => {
                if self.contains_node(&individual.iri) {
                    return Err(CoreError::IdentifierConflict {
                        iri: individual.iri.clone(),
                    });
                }
                let idx = self.graph.add_node(individual.clone());
                self.index.insert(individual.iri.clone(), idx);
            }
            GraphChange::NodeDeleted { individual } => {
                let idx = self.node_index(&individual.iri)?;
                if self.graph.node_weight(idx) != Some(individual) {
                    return Err(CoreError::invalid(format!(
                        "node {} differs from the recorded state",
                        individual.iri
                    )));
                }
                if !self.edges_of(&individual.iri).is_empty() {
                    return Err(CoreError::invalid(format!(
                        "node {} still has edges",
                        individual.iri
                    )));
                }
                self.graph.remove_node(idx);
                self.index.shift_remove(&individual.iri);
            }
            GraphChange::TypeAdded { node, expr } => {
                let ind = self.individual_mut(node)?;
                if !ind.types.insert(expr.clone()) {
                    return Err(CoreError::invalid(format!("{} already has type {}", node, expr)));
                }
            }
            GraphChange::TypeRemoved { node, expr } => {
                let ind = self.individual_mut(node)?;
                if !ind.types.remove(expr) {
                    return Err(CoreError::invalid(format!("{} has no type {}", node, expr)));
                }
            }
            GraphChange::AnnotationsInserted { target, entries } => {
                let list = self.annotations_mut(target)?;
                let mut last: Option<usize> = None;
                for (pos, _) in entries {
                    if last.is_some_and(|l| *pos <= l) {
                        return Err(CoreError::invalid(format!(
                            "annotation insert position {} out of order",
                            pos
                        )));
                    }
                    last = Some(*pos);
                }
                // Positions past the end append; the list may have shrunk
                // since the entries were recorded.
                for (pos, annotation) in entries {
                    let at = (*pos).min(list.len());
                    list.insert(at, annotation.clone());
                }
            }
            GraphChange::AnnotationsRemoved { target, entries } => {
                let list = self.annotations_mut(target)?;
                let mut claimed: Vec<usize> = Vec::with_capacity(entries.len());
                for (pos, annotation) in entries {
                    // The recorded position first, then any other unclaimed
                    // occurrence of the same value.
                    let found = if list.get(*pos) == Some(annotation) && !claimed.contains(pos) {
                        Some(*pos)
                    } else {
                        (0..list.len()).find(|i| &list[*i] == annotation && !claimed.contains(i))
                    };
                    match found {
                        Some(i) => claimed.push(i),
                        None => {
                            return Err(CoreError::invalid(format!(
                                "annotation recorded at position {} is no longer present",
                                pos
                            )));
                        }
                    }
                }
                claimed.sort_unstable();
                for i in claimed.into_iter().rev() {
                    list.remove(i);
                }
            }
            GraphChange::EdgeAdded { key, annotations } => {
                let subject = self.node_index(&key.subject)?;
                let object = self.node_index(&key.object)?;
                if self.find_edge(key).is_some() {
                    return Err(CoreError::invalid(format!("edge {} already exists", key)));
                }
                self.graph.add_edge(
                    subject,
                    object,
                    Fact::new(key.relation.clone(), annotations.clone()),
                );
            }
            GraphChange::EdgeRemoved { key, annotations } => {
                let edge = self
                    .find_edge(key)
                    .ok_or_else(|| CoreError::EdgeNotFound { key: key.clone() })?;
                if self.graph.edge_weight(edge).map(|f| &f.annotations) != Some(annotations) {
                    return Err(CoreError::invalid(format!(
                        "edge {} differs from the recorded state",
                        key
                    )));
                }
                self.graph.remove_edge(edge);
            }
            GraphChange::LiteralAdded {
                node,
                property,
                literal,
            } => {
                let ind = self.individual_mut(node)?;
                if !ind
                    .literals
                    .entry(property.clone())
                    .or_default()
                    .insert(literal.clone())
                {
                    return Err(CoreError::invalid(format!(
                        "{} already has {} = {}",
                        node, property, literal.lexical
                    )));
                }
            }
            GraphChange::LiteralRemoved {
                node,
                property,
                literal,
            } => {
                let ind = self.individual_mut(node)?;
                let removed = match ind.literals.get_mut(property) {
                    Some(values) => values.remove(literal),
                    None => false,
                };
                if !removed {
                    return Err(CoreError::invalid(format!(
                        "{} has no {} = {}",
                        node, property, literal.lexical
                    )));
                }
                if ind.literals.get(property).is_some_and(|v| v.is_empty()) {
                    ind.literals.remove(property);
                }
            }
            GraphChange::ImportsReplaced { previous, next } => {
                if &self.imports != previous {
                    return Err(CoreError::invalid("imports differ from the recorded state"));
                }
                self.imports = next.clone();
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn node_index(&self, iri: &Iri) -> Result<NodeIndex<u32>, CoreError> {
        self.index
            .get(iri)
            .copied()
            .ok_or_else(|| CoreError::NodeNotFound { iri: iri.clone() })
    }

    fn individual_mut(&mut self, iri: &Iri) -> Result<&mut Individual, CoreError> {
        let idx = self.node_index(iri)?;
        self.graph
            .node_weight_mut(idx)
            .ok_or_else(|| CoreError::NodeNotFound { iri: iri.clone() })
    }

    fn annotations_mut(
        &mut self,
        target: &AnnotationTarget,
    ) -> Result<&mut Vec<Annotation>, CoreError> {
        match target {
            AnnotationTarget::Node { iri } => Ok(&mut self.individual_mut(iri)?.annotations),
            AnnotationTarget::Edge { key } => {
                let edge = self
                    .find_edge(key)
                    .ok_or_else(|| CoreError::EdgeNotFound { key: key.clone() })?;
                self.graph
                    .edge_weight_mut(edge)
                    .map(|fact| &mut fact.annotations)
                    .ok_or_else(|| CoreError::EdgeNotFound { key: key.clone() })
            }
            AnnotationTarget::Model => Ok(&mut self.annotations),
        }
    }

    fn find_edge(&self, key: &EdgeKey) -> Option<EdgeIndex<u32>> {
        let subject = *self.index.get(&key.subject)?;
        let object = *self.index.get(&key.object)?;
        self.graph
            .edges_directed(subject, Direction::Outgoing)
            .find(|e| e.target() == object && e.weight().relation == key.relation)
            .map(|e| e.id())
    }

    fn key_of(&self, edge: EdgeIndex<u32>) -> Option<EdgeKey> {
        let (source, target) = self.graph.edge_endpoints(edge)?;
        let fact = self.graph.edge_weight(edge)?;
        Some(EdgeKey::new(
            self.graph.node_weight(source)?.iri.clone(),
            fact.relation.clone(),
            self.graph.node_weight(target)?.iri.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ClassExpr;

    fn model() -> ModelGraph {
        ModelGraph::new("model:1".into(), "http://x/model/1".into())
    }

    fn create(graph: &mut ModelGraph, iri: &str) {
        graph
            .apply(&GraphChange::NodeCreated {
                individual: Individual::new(iri.into()),
            })
            .unwrap();
    }

    #[test]
    fn create_and_lookup() {
        let mut g = model();
        create(&mut g, "a");
        assert!(g.contains_node(&"a".into()));
        assert_eq!(g.node_count(), 1);
        let err = g
            .apply(&GraphChange::NodeCreated {
                individual: Individual::new("a".into()),
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::IdentifierConflict { .. }));
    }

    #[test]
    fn edge_requires_endpoints() {
        let mut g = model();
        create(&mut g, "a");
        let key = EdgeKey::new("a".into(), "r".into(), "b".into());
        let err = g
            .apply(&GraphChange::EdgeAdded {
                key: key.clone(),
                annotations: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::NodeNotFound { .. }));
        create(&mut g, "b");
        g.apply(&GraphChange::EdgeAdded {
            key: key.clone(),
            annotations: vec![],
        })
        .unwrap();
        assert!(g.fact(&key).is_some());
        assert_eq!(g.edges_of(&"b".into()), vec![key]);
        assert!(g.is_referenced(&"a".into()));
    }

    #[test]
    fn node_with_edges_cannot_be_deleted() {
        let mut g = model();
        create(&mut g, "a");
        create(&mut g, "b");
        g.apply(&GraphChange::EdgeAdded {
            key: EdgeKey::new("a".into(), "r".into(), "b".into()),
            annotations: vec![],
        })
        .unwrap();
        let err = g
            .apply(&GraphChange::NodeDeleted {
                individual: Individual::new("a".into()),
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidChange { .. }));
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn duplicate_type_is_rejected() {
        let mut g = model();
        create(&mut g, "a");
        let change = GraphChange::TypeAdded {
            node: "a".into(),
            expr: ClassExpr::named("GO:1"),
        };
        g.apply(&change).unwrap();
        assert!(g.apply(&change).is_err());
    }

    #[test]
    fn annotation_positions_restore_order() {
        let mut g = model();
        let p: Iri = "p".into();
        let anns: Vec<Annotation> = ["a", "b", "a", "c"]
            .iter()
            .map(|v| Annotation::literal(p.clone(), *v))
            .collect();
        g.apply(&GraphChange::AnnotationsInserted {
            target: AnnotationTarget::Model,
            entries: anns.iter().cloned().enumerate().collect(),
        })
        .unwrap();
        let removal = GraphChange::AnnotationsRemoved {
            target: AnnotationTarget::Model,
            entries: vec![(0, anns[0].clone()), (2, anns[2].clone())],
        };
        g.apply(&removal).unwrap();
        assert_eq!(g.annotations(), &[anns[1].clone(), anns[3].clone()]);
        g.apply(&removal.inverse()).unwrap();
        assert_eq!(g.annotations(), anns.as_slice());
    }

    #[test]
    fn removal_follows_a_shifted_annotation() {
        let mut g = model();
        let p: Iri = "p".into();
        let anns: Vec<Annotation> = ["a", "b", "c"]
            .iter()
            .map(|v| Annotation::literal(p.clone(), *v))
            .collect();
        g.apply(&GraphChange::AnnotationsInserted {
            target: AnnotationTarget::Model,
            entries: anns.iter().cloned().enumerate().collect(),
        })
        .unwrap();
        // "c" was recorded at 2; removing "a" moved it to 1.
        g.apply(&GraphChange::AnnotationsRemoved {
            target: AnnotationTarget::Model,
            entries: vec![(0, anns[0].clone())],
        })
        .unwrap();
        g.apply(&GraphChange::AnnotationsRemoved {
            target: AnnotationTarget::Model,
            entries: vec![(2, anns[2].clone())],
        })
        .unwrap();
        assert_eq!(g.annotations(), &[anns[1].clone()]);

        // Reinsertion past the end appends.
        g.apply(&GraphChange::AnnotationsInserted {
            target: AnnotationTarget::Model,
            entries: vec![(2, anns[2].clone())],
        })
        .unwrap();
        assert_eq!(g.annotations(), &[anns[1].clone(), anns[2].clone()]);
    }

    #[test]
    fn removal_keeps_multiplicity() {
        let mut g = model();
        let a = Annotation::literal("p".into(), "a");
        g.apply(&GraphChange::AnnotationsInserted {
            target: AnnotationTarget::Model,
            entries: vec![(0, a.clone()), (1, a.clone())],
        })
        .unwrap();
        g.apply(&GraphChange::AnnotationsRemoved {
            target: AnnotationTarget::Model,
            entries: vec![(5, a.clone())],
        })
        .unwrap();
        assert_eq!(g.annotations(), &[a.clone()]);
        let err = g
            .apply(&GraphChange::AnnotationsRemoved {
                target: AnnotationTarget::Model,
                entries: vec![(0, a.clone()), (1, a)],
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidChange { .. }));
        assert_eq!(g.annotations().len(), 1);
    }

    #[test]
    fn mismatched_removal_is_rejected() {
        let mut g = model();
        let err = g
            .apply(&GraphChange::AnnotationsRemoved {
                target: AnnotationTarget::Model,
                entries: vec![(0, Annotation::literal("p".into(), "v"))],
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidChange { .. }));
    }

    #[test]
    fn referencing_ignores_own_annotations() {
        let mut g = model();
        g.apply(&GraphChange::NodeCreated {
            individual: Individual::with_annotations(
                "a".into(),
                vec![Annotation::reference("p".into(), "a".into())],
            ),
        })
        .unwrap();
        assert!(!g.is_referenced(&"a".into()));
        g.apply(&GraphChange::AnnotationsInserted {
            target: AnnotationTarget::Model,
            entries: vec![(0, Annotation::reference("p".into(), "a".into()))],
        })
        .unwrap();
        assert!(g.is_referenced(&"a".into()));
        assert_eq!(g.referencing_targets(&"a".into()), vec![AnnotationTarget::Model]);
    }

    #[test]
    fn minted_iris_live_under_the_model() {
        let g = model();
        let iri = g.mint_node_iri();
        assert!(iri.as_str().starts_with("http://x/model/1/"));
    }
}
