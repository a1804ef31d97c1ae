//! GraphEditor: primitive, invertible graph mutations.
//!
//! A [`GraphEditor`] borrows a [`ModelGraph`] and a change buffer. Every
//! mutation is turned into one or more [`GraphChange`]s, applied through
//! `ModelGraph::apply` and appended to the buffer, so the buffer always holds
//! exactly what has to be inverted to undo the work done through the editor.
//!
//! Operations that would not change anything (adding a type that is already
//! present, removing an absent literal) record nothing.
//!
//! # Cascade
//!
//! Removing an edge or an annotation can leave auxiliary nodes (typically
//! evidence) unreferenced. [`GraphEditor::cascade`] takes the IRIs freed by a
//! removal and deletes every candidate that is a node of the model, has no
//! edges, and is not the value of any remaining annotation. A removed node's
//! own annotation values become new candidates. Candidates are only enqueued
//! when a node is removed and each node is removed at most once, so the
//! worklist terminates on reference cycles.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use crate::annotation::{iri_values, Annotation, AnnotationTarget, Literal};
use crate::change::GraphChange;
use crate::error::CoreError;
use crate::expr::ClassExpr;
use crate::graph::ModelGraph;
use crate::id::{EdgeKey, Iri};
use crate::node::Individual;

/// What a node deletion touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    /// Surviving nodes that lost an edge or an annotation.
    pub touched_nodes: Vec<Iri>,
    /// Surviving facts that lost an annotation.
    pub touched_edges: Vec<EdgeKey>,
    /// The deleted node first, then every node removed by the cascade.
    pub removed_nodes: Vec<Iri>,
}

/// Mutating view over a model graph that records every change it makes.
pub struct GraphEditor<'a> {
    graph: &'a mut ModelGraph,
    changes: &'a mut Vec<GraphChange>,
}

impl<'a> GraphEditor<'a> {
    pub fn new(graph: &'a mut ModelGraph, changes: &'a mut Vec<GraphChange>) -> Self {
        GraphEditor { graph, changes }
    }

    /// Read access to the graph being edited.
    pub fn graph(&self) -> &ModelGraph {
        &*self.graph
    }

    fn record(&mut self, change: GraphChange) -> Result<(), CoreError> {
        self.graph.apply(&change)?;
        self.changes.push(change);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    /// Creates a node. When `iri` is `None` a fresh IRI is minted under the
    /// model IRI.
    pub fn create_node(
        &mut self,
        iri: Option<Iri>,
        annotations: Vec<Annotation>,
    ) -> Result<Iri, CoreError> {
        let iri = match iri {
            Some(iri) => iri,
            None => self.graph.mint_node_iri(),
        };
        if self.graph.contains_node(&iri) {
            return Err(CoreError::IdentifierConflict { iri });
        }
        self.record(GraphChange::NodeCreated {
            individual: Individual::with_annotations(iri.clone(), annotations),
        })?;
        Ok(iri)
    }

    /// Deletes a node together with its edges and every annotation that
    /// refers to it, then cascades over the IRIs this freed.
    pub fn delete_node(&mut self, iri: &Iri) -> Result<DeletionReport, CoreError> {
        if !self.graph.contains_node(iri) {
            return Err(CoreError::NodeNotFound { iri: iri.clone() });
        }
        let mut report = DeletionReport::default();
        let mut freed: Vec<Iri> = Vec::new();

        for key in self.graph.edges_of(iri) {
            let other = if &key.subject == iri {
                &key.object
            } else {
                &key.subject
            };
            if other != iri && !report.touched_nodes.contains(other) {
                report.touched_nodes.push(other.clone());
            }
            freed.extend(self.remove_edge(&key)?);
        }

        for target in self.graph.referencing_targets(iri) {
            let reference = |a: &Annotation| a.value.as_iri() == Some(iri);
            let entries = self.entries_matching(&target, reference)?;
            self.record(GraphChange::AnnotationsRemoved {
                target: target.clone(),
                entries,
            })?;
            match target {
                AnnotationTarget::Node { iri: node } => {
                    if !report.touched_nodes.contains(&node) {
                        report.touched_nodes.push(node);
                    }
                }
                AnnotationTarget::Edge { key } => {
                    if !report.touched_edges.contains(&key) {
                        report.touched_edges.push(key);
                    }
                }
                AnnotationTarget::Model => {}
            }
        }

        let individual = self
            .graph
            .individual(iri)
            .cloned()
            .ok_or_else(|| CoreError::NodeNotFound { iri: iri.clone() })?;
        freed.extend(iri_values(&individual.annotations));
        self.record(GraphChange::NodeDeleted { individual })?;
        report.removed_nodes.push(iri.clone());

        freed.retain(|candidate| candidate != iri);
        report.removed_nodes.extend(self.cascade(freed)?);

        let removed = &report.removed_nodes;
        report.touched_nodes.retain(|n| !removed.contains(n));
        let graph = &*self.graph;
        report.touched_edges.retain(|k| graph.fact(k).is_some());
        Ok(report)
    }

    /// Adds a type; returns `false` (recording nothing) if already present.
    pub fn add_type(&mut self, node: &Iri, expr: ClassExpr) -> Result<bool, CoreError> {
        let ind = self.require_node(node)?;
        if ind.types.contains(&expr) {
            return Ok(false);
        }
        self.record(GraphChange::TypeAdded {
            node: node.clone(),
            expr,
        })?;
        Ok(true)
    }

    /// Removes a type; returns `false` (recording nothing) if absent.
    pub fn remove_type(&mut self, node: &Iri, expr: &ClassExpr) -> Result<bool, CoreError> {
        let ind = self.require_node(node)?;
        if !ind.types.contains(expr) {
            return Ok(false);
        }
        self.record(GraphChange::TypeRemoved {
            node: node.clone(),
            expr: expr.clone(),
        })?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Edges
    // -----------------------------------------------------------------------

    /// Adds a fact. If the triple already exists the annotations are appended
    /// to it and `false` is returned.
    pub fn add_edge(&mut self, key: EdgeKey, annotations: Vec<Annotation>) -> Result<bool, CoreError> {
        self.require_node(&key.subject)?;
        self.require_node(&key.object)?;
        if self.graph.fact(&key).is_some() {
            self.add_annotations(&AnnotationTarget::edge(key), annotations)?;
            return Ok(false);
        }
        self.record(GraphChange::EdgeAdded { key, annotations })?;
        Ok(true)
    }

    /// Removes a fact and returns the IRI values of its annotations.
    pub fn remove_edge(&mut self, key: &EdgeKey) -> Result<Vec<Iri>, CoreError> {
        let annotations = self
            .graph
            .fact(key)
            .map(|fact| fact.annotations.clone())
            .ok_or_else(|| CoreError::EdgeNotFound { key: key.clone() })?;
        let freed = iri_values(&annotations);
        self.record(GraphChange::EdgeRemoved {
            key: key.clone(),
            annotations,
        })?;
        Ok(freed)
    }

    // -----------------------------------------------------------------------
    // Annotations
    // -----------------------------------------------------------------------

    /// Appends annotations to a node, fact or the model.
    pub fn add_annotations(
        &mut self,
        target: &AnnotationTarget,
        annotations: Vec<Annotation>,
    ) -> Result<(), CoreError> {
        let len = self.graph.annotations_of(target)?.len();
        if annotations.is_empty() {
            return Ok(());
        }
        let entries = annotations
            .into_iter()
            .enumerate()
            .map(|(i, a)| (len + i, a))
            .collect();
        self.record(GraphChange::AnnotationsInserted {
            target: target.clone(),
            entries,
        })
    }

    /// Removes every occurrence equal to one of `annotations` and returns the
    /// IRI values of what was removed.
    pub fn remove_annotations(
        &mut self,
        target: &AnnotationTarget,
        annotations: &[Annotation],
    ) -> Result<Vec<Iri>, CoreError> {
        let entries = self.entries_matching(target, |a| annotations.contains(a))?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let freed = iri_values(entries.iter().map(|(_, a)| a));
        self.record(GraphChange::AnnotationsRemoved {
            target: target.clone(),
            entries,
        })?;
        Ok(freed)
    }

    /// Replaces every annotation with the same property by `annotation`.
    pub fn upsert_annotation(
        &mut self,
        target: &AnnotationTarget,
        annotation: Annotation,
    ) -> Result<(), CoreError> {
        let existing = self.graph.annotations_of(target)?;
        if existing.iter().filter(|a| a.property == annotation.property).count() == 1
            && existing.contains(&annotation)
        {
            return Ok(());
        }
        let property = annotation.property.clone();
        let entries = self.entries_matching(target, |a| a.property == property)?;
        if !entries.is_empty() {
            self.record(GraphChange::AnnotationsRemoved {
                target: target.clone(),
                entries,
            })?;
        }
        self.add_annotations(target, vec![annotation])
    }

    // -----------------------------------------------------------------------
    // Literals and imports
    // -----------------------------------------------------------------------

    /// Adds literal property values; values already present are skipped.
    pub fn add_literals(
        &mut self,
        node: &Iri,
        literals: &BTreeMap<Iri, BTreeSet<Literal>>,
    ) -> Result<(), CoreError> {
        for (property, values) in literals {
            for literal in values {
                let present = self
                    .require_node(node)?
                    .literals
                    .get(property)
                    .is_some_and(|v| v.contains(literal));
                if !present {
                    self.record(GraphChange::LiteralAdded {
                        node: node.clone(),
                        property: property.clone(),
                        literal: literal.clone(),
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Removes literal property values; absent values are skipped.
    pub fn remove_literals(
        &mut self,
        node: &Iri,
        literals: &BTreeMap<Iri, BTreeSet<Literal>>,
    ) -> Result<(), CoreError> {
        for (property, values) in literals {
            for literal in values {
                let present = self
                    .require_node(node)?
                    .literals
                    .get(property)
                    .is_some_and(|v| v.contains(literal));
                if present {
                    self.record(GraphChange::LiteralRemoved {
                        node: node.clone(),
                        property: property.clone(),
                        literal: literal.clone(),
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Replaces the model's import list; returns `false` if unchanged.
    pub fn set_imports(&mut self, imports: Vec<Iri>) -> Result<bool, CoreError> {
        if self.graph.imports() == imports.as_slice() {
            return Ok(false);
        }
        let previous = self.graph.imports().to_vec();
        self.record(GraphChange::ImportsReplaced {
            previous,
            next: imports,
        })?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Cascade
    // -----------------------------------------------------------------------

    /// Deletes every candidate that is an unreferenced node, transitively.
    /// Returns the removed IRIs in removal order.
    pub fn cascade(&mut self, candidates: Vec<Iri>) -> Result<Vec<Iri>, CoreError> {
        let mut worklist: VecDeque<Iri> = candidates.into();
        let mut removed_set: HashSet<Iri> = HashSet::new();
        let mut removed = Vec::new();

        while let Some(candidate) = worklist.pop_front() {
            if removed_set.contains(&candidate) {
                continue;
            }
            let Some(individual) = self.graph.individual(&candidate) else {
                continue;
            };
            if self.graph.is_referenced(&candidate) {
                continue;
            }
            let individual = individual.clone();
            let next = iri_values(&individual.annotations);
            self.record(GraphChange::NodeDeleted { individual })?;
            removed_set.insert(candidate.clone());
            removed.push(candidate);
            worklist.extend(next);
        }
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn require_node(&self, iri: &Iri) -> Result<&Individual, CoreError> {
        self.graph
            .individual(iri)
            .ok_or_else(|| CoreError::NodeNotFound { iri: iri.clone() })
    }

    fn entries_matching(
        &self,
        target: &AnnotationTarget,
        predicate: impl Fn(&Annotation) -> bool,
    ) -> Result<Vec<(usize, Annotation)>, CoreError> {
        Ok(self
            .graph
            .annotations_of(target)?
            .iter()
            .enumerate()
            .filter(|(_, a)| predicate(a))
            .map(|(i, a)| (i, a.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Shorthand;

    fn model() -> ModelGraph {
        ModelGraph::new("model:1".into(), "http://x/model/1".into())
    }

    fn evidence(target: &str) -> Annotation {
        Annotation::reference(Shorthand::Evidence.property(), target.into())
    }

    #[test]
    fn create_mints_iri_and_detects_conflicts() {
        let mut g = model();
        let mut changes = Vec::new();
        let mut ed = GraphEditor::new(&mut g, &mut changes);
        let minted = ed.create_node(None, vec![]).unwrap();
        assert!(minted.as_str().starts_with("http://x/model/1/"));
        let err = ed.create_node(Some(minted.clone()), vec![]).unwrap_err();
        assert!(matches!(err, CoreError::IdentifierConflict { .. }));
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn noop_type_changes_record_nothing() {
        let mut g = model();
        let mut changes = Vec::new();
        let mut ed = GraphEditor::new(&mut g, &mut changes);
        let n = ed.create_node(Some("n".into()), vec![]).unwrap();
        assert!(ed.add_type(&n, ClassExpr::named("GO:1")).unwrap());
        assert!(!ed.add_type(&n, ClassExpr::named("GO:1")).unwrap());
        assert!(!ed.remove_type(&n, &ClassExpr::named("GO:2")).unwrap());
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn duplicate_edge_appends_annotations() {
        let mut g = model();
        let mut changes = Vec::new();
        let mut ed = GraphEditor::new(&mut g, &mut changes);
        ed.create_node(Some("a".into()), vec![]).unwrap();
        ed.create_node(Some("b".into()), vec![]).unwrap();
        let key = EdgeKey::new("a".into(), "r".into(), "b".into());
        let c1 = Annotation::shorthand(Shorthand::Comment, "one");
        let c2 = Annotation::shorthand(Shorthand::Comment, "two");
        assert!(ed.add_edge(key.clone(), vec![c1.clone()]).unwrap());
        assert!(!ed.add_edge(key.clone(), vec![c2.clone()]).unwrap());
        assert_eq!(ed.graph().fact(&key).unwrap().annotations, vec![c1, c2]);
        assert_eq!(ed.graph().edge_count(), 1);
    }

    #[test]
    fn remove_annotations_removes_all_occurrences() {
        let mut g = model();
        let mut changes = Vec::new();
        let mut ed = GraphEditor::new(&mut g, &mut changes);
        let c = Annotation::shorthand(Shorthand::Comment, "dup");
        let other = Annotation::shorthand(Shorthand::Title, "t");
        ed.create_node(Some("n".into()), vec![c.clone(), other.clone(), c.clone()])
            .unwrap();
        let target = AnnotationTarget::node("n".into());
        ed.remove_annotations(&target, &[c]).unwrap();
        assert_eq!(ed.graph().annotations_of(&target).unwrap(), &[other]);
    }

    #[test]
    fn upsert_replaces_same_property() {
        let mut g = model();
        let mut changes = Vec::new();
        let mut ed = GraphEditor::new(&mut g, &mut changes);
        let target = AnnotationTarget::Model;
        ed.upsert_annotation(&target, Annotation::shorthand(Shorthand::Date, "2024-01-01"))
            .unwrap();
        ed.add_annotations(&target, vec![Annotation::shorthand(Shorthand::Title, "t")])
            .unwrap();
        ed.upsert_annotation(&target, Annotation::shorthand(Shorthand::Date, "2024-02-02"))
            .unwrap();
        let dates: Vec<_> = ed
            .graph()
            .annotations()
            .iter()
            .filter(|a| a.kind() == Some(Shorthand::Date))
            .map(|a| a.value.lexical().to_string())
            .collect();
        assert_eq!(dates, vec!["2024-02-02"]);
    }

    #[test]
    fn delete_node_cascades_to_evidence() {
        let mut g = model();
        let mut changes = Vec::new();
        let mut ed = GraphEditor::new(&mut g, &mut changes);
        ed.create_node(Some("a".into()), vec![]).unwrap();
        ed.create_node(Some("b".into()), vec![]).unwrap();
        ed.create_node(Some("ev".into()), vec![]).unwrap();
        let key = EdgeKey::new("a".into(), "r".into(), "b".into());
        ed.add_edge(key, vec![evidence("ev")]).unwrap();

        let report = ed.delete_node(&"a".into()).unwrap();
        assert_eq!(report.removed_nodes, vec![Iri::from("a"), Iri::from("ev")]);
        assert_eq!(report.touched_nodes, vec![Iri::from("b")]);
        assert!(!ed.graph().contains_node(&"ev".into()));
        assert!(ed.graph().contains_node(&"b".into()));
    }

    #[test]
    fn delete_node_strips_references_elsewhere() {
        let mut g = model();
        let mut changes = Vec::new();
        let mut ed = GraphEditor::new(&mut g, &mut changes);
        ed.create_node(Some("ev".into()), vec![]).unwrap();
        ed.create_node(Some("n".into()), vec![evidence("ev")]).unwrap();
        let report = ed.delete_node(&"ev".into()).unwrap();
        assert_eq!(report.touched_nodes, vec![Iri::from("n")]);
        assert!(ed
            .graph()
            .individual(&"n".into())
            .unwrap()
            .annotations
            .is_empty());
    }

    #[test]
    fn cascade_keeps_nodes_with_edges() {
        let mut g = model();
        let mut changes = Vec::new();
        let mut ed = GraphEditor::new(&mut g, &mut changes);
        ed.create_node(Some("ev".into()), vec![]).unwrap();
        ed.create_node(Some("other".into()), vec![]).unwrap();
        ed.add_edge(EdgeKey::new("ev".into(), "r".into(), "other".into()), vec![])
            .unwrap();
        let removed = ed.cascade(vec!["ev".into(), "missing".into()]).unwrap();
        assert!(removed.is_empty());
        assert!(ed.graph().contains_node(&"ev".into()));
    }

    #[test]
    fn cascade_follows_chains_and_terminates_on_cycles() {
        let mut g = model();
        let mut changes = Vec::new();
        let mut ed = GraphEditor::new(&mut g, &mut changes);
        // x -> y -> z -> y (cycle between y and z through evidence values)
        ed.create_node(Some("x".into()), vec![evidence("y")]).unwrap();
        ed.create_node(Some("y".into()), vec![evidence("z")]).unwrap();
        ed.create_node(Some("z".into()), vec![evidence("y")]).unwrap();
        let report = ed.delete_node(&"x".into()).unwrap();
        // y is still referenced by z and z by y, so the cycle survives.
        assert_eq!(report.removed_nodes, vec![Iri::from("x")]);
        assert_eq!(ed.graph().node_count(), 2);

        // A chain without a cycle is removed completely.
        ed.create_node(Some("c3".into()), vec![]).unwrap();
        ed.create_node(Some("c2".into()), vec![evidence("c3")]).unwrap();
        ed.create_node(Some("c1".into()), vec![evidence("c2")]).unwrap();
        let removed = ed.cascade(vec!["c1".into(), "c1".into()]).unwrap();
        assert_eq!(
            removed,
            vec![Iri::from("c1"), Iri::from("c2"), Iri::from("c3")]
        );
    }

    #[test]
    fn undoing_a_deletion_restores_the_graph() {
        let mut g = model();
        let mut setup = Vec::new();
        {
            let mut ed = GraphEditor::new(&mut g, &mut setup);
            ed.create_node(Some("a".into()), vec![Annotation::shorthand(Shorthand::Comment, "c")])
                .unwrap();
            ed.create_node(Some("b".into()), vec![]).unwrap();
            ed.create_node(Some("ev".into()), vec![]).unwrap();
            ed.add_type(&"a".into(), ClassExpr::named("GO:1")).unwrap();
            ed.add_edge(
                EdgeKey::new("a".into(), "r".into(), "b".into()),
                vec![evidence("ev")],
            )
            .unwrap();
        }
        let before = g.snapshot();
        let mut changes = Vec::new();
        GraphEditor::new(&mut g, &mut changes)
            .delete_node(&"a".into())
            .unwrap();
        assert_ne!(g.snapshot(), before);
        for change in changes.iter().rev() {
            g.apply(&change.inverse()).unwrap();
        }
        assert_eq!(g.snapshot(), before);
    }
}
