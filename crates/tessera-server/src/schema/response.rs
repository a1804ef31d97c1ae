//! Batch response types.
//!
//! Responses render identifiers in compact form. `signal` tells the client
//! how to apply the payload: `merge` the listed individuals into its view,
//! `rebuild` it from the full model, or treat the response as `meta` data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::resolver::Term;
use crate::schema::batch::ExpressionPayload;
use crate::undo::HistoryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Merge,
    Rebuild,
    Meta,
}

/// Response body of a successful batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intention: Option<String>,
    pub signal: Signal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    /// Individuals touched by the batch (`merge`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub individuals: Option<Vec<IndividualView>>,
    /// The whole model (`rebuild`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undo: Option<Vec<HistoryEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redo: Option<Vec<HistoryEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commentary: Option<String>,
}

/// An annotation or literal as key/value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationView {
    pub key: String,
    pub value: String,
    #[serde(rename = "value-type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndividualView {
    pub id: String,
    #[serde(rename = "type")]
    pub types: Vec<ExpressionPayload>,
    pub annotations: Vec<AnnotationView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub literals: Vec<AnnotationView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactView {
    pub subject: String,
    pub property: String,
    pub object: String,
    pub annotations: Vec<AnnotationView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelView {
    pub id: String,
    pub imports: Vec<String>,
    pub annotations: Vec<AnnotationView>,
    pub individuals: Vec<IndividualView>,
    pub facts: Vec<FactView>,
}

/// Server-wide metadata returned by `meta get`.
#[derive(Debug, Clone, Serialize)]
pub struct MetaView {
    pub relations: Vec<TermView>,
    pub data_properties: Vec<TermView>,
    pub evidence: Vec<TermView>,
    /// Accepted annotation shorthand keys.
    pub shorthands: Vec<String>,
    pub model_ids: Vec<String>,
    /// Per model: annotation key -> values.
    pub models_meta: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermView {
    pub id: String,
    pub label: String,
}

impl TermView {
    pub fn of(term: &Term, id: String) -> Self {
        TermView {
            id,
            label: term.label.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Model listing
// ---------------------------------------------------------------------------

/// Response of `GET /models`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelListResponse {
    pub models: Vec<ModelListEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelListEntry {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub individuals: usize,
    pub facts: usize,
}
