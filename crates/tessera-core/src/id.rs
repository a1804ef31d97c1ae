//! Identifier newtypes for models, nodes, relations and users.
//!
//! All identifiers are distinct newtype wrappers over `String`, so that a
//! [`ModelId`] cannot be passed where an [`Iri`] is expected. [`EdgeKey`] is the
//! identity of a fact: facts are unique per (subject, relation, object) triple.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical identifier of a node, relation, class or annotation property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Iri(pub String);

/// Compact identifier of a model (e.g. `model:5f2c...`), unique among active models.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(pub String);

/// Identity of an acting user. Undo history is kept per (model, user).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl Iri {
    pub fn new(value: impl Into<String>) -> Self {
        Iri(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ModelId {
    pub fn new(value: impl Into<String>) -> Self {
        ModelId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        UserId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Iri {
    fn from(value: &str) -> Self {
        Iri(value.to_string())
    }
}

impl From<&str> for ModelId {
    fn from(value: &str) -> Self {
        ModelId(value.to_string())
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        UserId(value.to_string())
    }
}

// Display implementations -- just print the inner value.

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identity of a fact (edge) within one model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub subject: Iri,
    pub relation: Iri,
    pub object: Iri,
}

impl EdgeKey {
    pub fn new(subject: Iri, relation: Iri, object: Iri) -> Self {
        EdgeKey {
            subject,
            relation,
            object,
        }
    }

    /// Returns `true` if `node` is the subject or the object of this fact.
    pub fn mentions(&self, node: &Iri) -> bool {
        &self.subject == node || &self.object == node
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.subject, self.relation, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iri_display() {
        assert_eq!(format!("{}", Iri::new("http://x/a")), "http://x/a");
    }

    #[test]
    fn edge_key_display_and_mentions() {
        let key = EdgeKey::new("s".into(), "r".into(), "o".into());
        assert_eq!(key.to_string(), "(s r o)");
        assert!(key.mentions(&Iri::from("s")));
        assert!(key.mentions(&Iri::from("o")));
        assert!(!key.mentions(&Iri::from("r")));
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&ModelId::from("model:1")).unwrap();
        assert_eq!(json, "\"model:1\"");
        let back: UserId = serde_json::from_str("\"alice\"").unwrap();
        assert_eq!(back, UserId::from("alice"));
    }
}
