//! Invertible primitive graph changes.
//!
//! Every mutation of a [`ModelGraph`](crate::graph::ModelGraph) is expressed as
//! a [`GraphChange`] and applied through `ModelGraph::apply`. Each change
//! carries enough state to build its exact inverse: applying a change and then
//! its inverse restores the prior graph, including annotation order and
//! multiplicity.

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, AnnotationTarget, Literal};
use crate::expr::ClassExpr;
use crate::id::{EdgeKey, Iri};
use crate::node::Individual;

/// A single invertible mutation of a model graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum GraphChange {
    /// A node was added with the given initial state.
    NodeCreated { individual: Individual },
    /// A node was removed; `individual` is its full state at removal time.
    NodeDeleted { individual: Individual },
    TypeAdded { node: Iri, expr: ClassExpr },
    TypeRemoved { node: Iri, expr: ClassExpr },
    /// Annotations inserted at the given positions, indices ascending and
    /// relative to the list as it grows.
    AnnotationsInserted {
        target: AnnotationTarget,
        entries: Vec<(usize, Annotation)>,
    },
    /// Annotations removed from the given positions, indices ascending and
    /// relative to the list before removal. An entry whose position no longer
    /// holds its value removes another occurrence of that value instead.
    AnnotationsRemoved {
        target: AnnotationTarget,
        entries: Vec<(usize, Annotation)>,
    },
    EdgeAdded {
        key: EdgeKey,
        annotations: Vec<Annotation>,
    },
    EdgeRemoved {
        key: EdgeKey,
        annotations: Vec<Annotation>,
    },
    LiteralAdded {
        node: Iri,
        property: Iri,
        literal: Literal,
    },
    LiteralRemoved {
        node: Iri,
        property: Iri,
        literal: Literal,
    },
    /// The model's import list was replaced.
    ImportsReplaced { previous: Vec<Iri>, next: Vec<Iri> },
}

impl GraphChange {
    /// Returns the change that undoes this one.
    pub fn inverse(&self) -> GraphChange {
        match self.clone() {
            GraphChange::NodeCreated { individual } => GraphChange::NodeDeleted { individual },
            GraphChange::NodeDeleted { individual } => GraphChange::NodeCreated { individual },
            GraphChange::TypeAdded { node, expr } => GraphChange::TypeRemoved { node, expr },
            GraphChange::TypeRemoved { node, expr } => GraphChange::TypeAdded { node, expr },
            GraphChange::AnnotationsInserted { target, entries } => {
                GraphChange::AnnotationsRemoved { target, entries }
            }
            GraphChange::AnnotationsRemoved { target, entries } => {
                GraphChange::AnnotationsInserted { target, entries }
            }
            GraphChange::EdgeAdded { key, annotations } => {
                GraphChange::EdgeRemoved { key, annotations }
            }
            GraphChange::EdgeRemoved { key, annotations } => {
                GraphChange::EdgeAdded { key, annotations }
            }
            GraphChange::LiteralAdded {
                node,
                property,
                literal,
            } => GraphChange::LiteralRemoved {
                node,
                property,
                literal,
            },
            GraphChange::LiteralRemoved {
                node,
                property,
                literal,
            } => GraphChange::LiteralAdded {
                node,
                property,
                literal,
            },
            GraphChange::ImportsReplaced { previous, next } => GraphChange::ImportsReplaced {
                previous: next,
                next: previous,
            },
        }
    }

    /// The node IRIs this change directly touches.
    pub fn nodes(&self) -> Vec<&Iri> {
        match self {
            GraphChange::NodeCreated { individual } | GraphChange::NodeDeleted { individual } => {
                vec![&individual.iri]
            }
            GraphChange::TypeAdded { node, .. }
            | GraphChange::TypeRemoved { node, .. }
            | GraphChange::LiteralAdded { node, .. }
            | GraphChange::LiteralRemoved { node, .. } => vec![node],
            GraphChange::AnnotationsInserted { target, .. }
            | GraphChange::AnnotationsRemoved { target, .. } => match target {
                AnnotationTarget::Node { iri } => vec![iri],
                AnnotationTarget::Edge { key } => vec![&key.subject, &key.object],
                AnnotationTarget::Model => Vec::new(),
            },
            GraphChange::EdgeAdded { key, .. } | GraphChange::EdgeRemoved { key, .. } => {
                vec![&key.subject, &key.object]
            }
            GraphChange::ImportsReplaced { .. } => Vec::new(),
        }
    }

    /// One-line human-readable description, used in logs and history listings.
    pub fn summary(&self) -> String {
        match self {
            GraphChange::NodeCreated { individual } => format!("create {}", individual.iri),
            GraphChange::NodeDeleted { individual } => format!("delete {}", individual.iri),
            GraphChange::TypeAdded { node, expr } => format!("add type {} to {}", expr, node),
            GraphChange::TypeRemoved { node, expr } => {
                format!("remove type {} from {}", expr, node)
            }
            GraphChange::AnnotationsInserted { target, entries } => {
                format!("add {} annotation(s) to {}", entries.len(), describe(target))
            }
            GraphChange::AnnotationsRemoved { target, entries } => {
                format!("remove {} annotation(s) from {}", entries.len(), describe(target))
            }
            GraphChange::EdgeAdded { key, .. } => format!("add edge {}", key),
            GraphChange::EdgeRemoved { key, .. } => format!("remove edge {}", key),
            GraphChange::LiteralAdded { node, property, .. } => {
                format!("add {} value to {}", property, node)
            }
            GraphChange::LiteralRemoved { node, property, .. } => {
                format!("remove {} value from {}", property, node)
            }
            GraphChange::ImportsReplaced { next, .. } => format!("set {} import(s)", next.len()),
        }
    }
}

fn describe(target: &AnnotationTarget) -> String {
    match target {
        AnnotationTarget::Node { iri } => iri.to_string(),
        AnnotationTarget::Edge { key } => key.to_string(),
        AnnotationTarget::Model => "model".to_string(),
    }
}
