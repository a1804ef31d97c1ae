//! Node and edge weights of the model graph.
//!
//! [`Individual`] is the weight of a node; [`Fact`] is the weight of an edge.
//! The subject and object of a fact are the edge endpoints, so a `Fact` only
//! carries the relation and its annotations.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, Literal};
use crate::expr::ClassExpr;
use crate::id::Iri;

/// A typed, annotated node of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    pub iri: Iri,
    #[serde(default)]
    pub types: BTreeSet<ClassExpr>,
    /// Ordered multiset; duplicates are kept.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Typed literal properties (data property -> values).
    #[serde(default)]
    pub literals: BTreeMap<Iri, BTreeSet<Literal>>,
}

impl Individual {
    /// A bare node with no types, annotations or literals.
    pub fn new(iri: Iri) -> Self {
        Individual {
            iri,
            types: BTreeSet::new(),
            annotations: Vec::new(),
            literals: BTreeMap::new(),
        }
    }

    pub fn with_annotations(iri: Iri, annotations: Vec<Annotation>) -> Self {
        Individual {
            annotations,
            ..Individual::new(iri)
        }
    }

    /// Returns `true` when the node carries no types, annotations or literals.
    pub fn is_bare(&self) -> bool {
        self.types.is_empty() && self.annotations.is_empty() && self.literals.is_empty()
    }
}

/// The weight of an edge: relation plus edge annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub relation: Iri,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl Fact {
    pub fn new(relation: Iri, annotations: Vec<Annotation>) -> Self {
        Fact {
            relation,
            annotations,
        }
    }
}
