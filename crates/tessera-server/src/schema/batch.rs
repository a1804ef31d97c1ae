//! Batch request types.
//!
//! A batch is an ordered list of operations, each naming an entity kind, an
//! operation and its arguments. All arguments are optional on the wire; the
//! engine reports the ones an operation needs as `MissingParameter`.

use serde::{Deserialize, Serialize};

/// Request body of `POST /batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Client correlation id, echoed in the response.
    #[serde(default)]
    pub uid: Option<String>,
    /// Client intention (e.g. "action", "query"), echoed in the response.
    #[serde(default)]
    pub intention: Option<String>,
    pub requests: Vec<OperationRequest>,
}

/// The kind of thing an operation acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Individual,
    Edge,
    Model,
    Meta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Get,
    Add,
    Remove,
    AddType,
    RemoveType,
    AddAnnotation,
    RemoveAnnotation,
    Import,
    Export,
    ExportLegacy,
    Store,
    UpdateImports,
    Undo,
    Redo,
    GetUndoRedo,
}

/// One operation of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRequest {
    pub entity: Entity,
    pub operation: Operation,
    #[serde(default)]
    pub arguments: Arguments,
}

impl OperationRequest {
    pub fn new(entity: Entity, operation: Operation, arguments: Arguments) -> Self {
        OperationRequest {
            entity,
            operation,
            arguments,
        }
    }

    /// Operations that only read the model.
    pub fn is_read_only(&self) -> bool {
        matches!(
            (self.entity, self.operation),
            (Entity::Individual, Operation::Get)
                | (Entity::Model, Operation::Get)
                | (Entity::Model, Operation::GetUndoRedo)
                | (Entity::Model, Operation::Export)
                | (Entity::Model, Operation::ExportLegacy)
                | (Entity::Meta, Operation::Get)
        )
    }

    /// Operations that may not be mixed with model edits or renders.
    pub fn is_meta(&self) -> bool {
        matches!(
            (self.entity, self.operation),
            (Entity::Model, Operation::GetUndoRedo)
                | (Entity::Model, Operation::Export)
                | (Entity::Model, Operation::ExportLegacy)
                | (Entity::Meta, Operation::Get)
        )
    }

    /// Operations that bring a new model into the batch.
    pub fn creates_model(&self) -> bool {
        matches!(
            (self.entity, self.operation),
            (Entity::Model, Operation::Add) | (Entity::Model, Operation::Import)
        )
    }
}

/// Operation arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Arguments {
    pub model_id: Option<String>,
    /// Existing individual (id or variable).
    pub individual: Option<String>,
    /// Explicit IRI for a new individual.
    pub individual_iri: Option<String>,
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub object: Option<String>,
    pub expressions: Option<Vec<ExpressionPayload>>,
    pub values: Option<Vec<ValuePayload>>,
    pub assign_to_variable: Option<String>,
    /// Serialized model for `model import`.
    pub import_model: Option<String>,
    /// Format for `model export-legacy`.
    pub format: Option<String>,
    /// New import list for `model update-imports`.
    pub imports: Option<Vec<String>>,
}

/// A class expression on the wire.
///
/// `type` is one of `class`, `svf` (some values from), `intersection`,
/// `union`, `complement`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionPayload {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<Box<ExpressionPayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filler: Option<Box<ExpressionPayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expressions: Option<Vec<ExpressionPayload>>,
}

impl ExpressionPayload {
    pub fn class(id: impl Into<String>) -> Self {
        ExpressionPayload {
            kind: Some("class".to_string()),
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn svf(property: impl Into<String>, filler: ExpressionPayload) -> Self {
        ExpressionPayload {
            kind: Some("svf".to_string()),
            property: Some(Box::new(ExpressionPayload {
                kind: Some("property".to_string()),
                id: Some(property.into()),
                ..Default::default()
            })),
            filler: Some(Box::new(filler)),
            ..Default::default()
        }
    }
}

/// A key/value pair of an annotation or literal property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuePayload {
    pub key: Option<String>,
    pub value: Option<String>,
    /// `"IRI"` for references; otherwise a datatype for typed literals.
    #[serde(alias = "value-type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
}

impl ValuePayload {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        ValuePayload {
            key: Some(key.into()),
            value: Some(value.into()),
            value_type: None,
        }
    }

    pub fn iri(key: impl Into<String>, value: impl Into<String>) -> Self {
        ValuePayload {
            value_type: Some("IRI".to_string()),
            ..ValuePayload::new(key, value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names() {
        let json = r#"{
            "uid": "u1",
            "requests": [
                {"entity": "individual", "operation": "add-type",
                 "arguments": {"model_id": "model:1", "individual": "x",
                               "expressions": [{"type": "class", "id": "GO:1"}]}},
                {"entity": "model", "operation": "get-undo-redo"}
            ]
        }"#;
        let batch: BatchRequest = serde_json::from_str(json).unwrap();
        assert_eq!(batch.requests[0].operation, Operation::AddType);
        assert_eq!(batch.requests[1].entity, Entity::Model);
        assert!(batch.requests[1].is_meta());
        assert!(batch.requests[1].arguments.model_id.is_none());
    }

    #[test]
    fn value_type_accepts_kebab_alias() {
        let value: ValuePayload =
            serde_json::from_str(r#"{"key": "evidence", "value": "e1", "value-type": "IRI"}"#)
                .unwrap();
        assert_eq!(value, ValuePayload::iri("evidence", "e1"));
    }
}
