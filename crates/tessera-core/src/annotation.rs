//! Annotations, literals and the well-known annotation shorthands.
//!
//! An [`Annotation`] is a (property, value) pair attached to a node, a fact or
//! the model itself. Values are either literals or IRIs; an IRI value that names
//! a node of the model is a node reference (the evidence role).
//!
//! The shorthand table is a closed enum: [`Shorthand::from_key`] matches keys
//! exactly and case-sensitively, first match wins.

use serde::{Deserialize, Serialize};

use crate::id::{EdgeKey, Iri};

// ---------------------------------------------------------------------------
// Literals and values
// ---------------------------------------------------------------------------

/// A lexical value with an optional datatype IRI.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<Iri>,
}

impl Literal {
    pub fn plain(lexical: impl Into<String>) -> Self {
        Literal {
            lexical: lexical.into(),
            datatype: None,
        }
    }

    pub fn typed(lexical: impl Into<String>, datatype: Iri) -> Self {
        Literal {
            lexical: lexical.into(),
            datatype: Some(datatype),
        }
    }
}

/// The value side of an annotation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum AnnotationValue {
    Literal(Literal),
    Iri(Iri),
}

impl AnnotationValue {
    /// Returns the IRI if this value is a reference.
    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            AnnotationValue::Iri(iri) => Some(iri),
            AnnotationValue::Literal(_) => None,
        }
    }

    /// Returns the lexical form (literal text or IRI string).
    pub fn lexical(&self) -> &str {
        match self {
            AnnotationValue::Literal(lit) => &lit.lexical,
            AnnotationValue::Iri(iri) => iri.as_str(),
        }
    }
}

/// A (property, value) pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Annotation {
    pub property: Iri,
    pub value: AnnotationValue,
}

impl Annotation {
    pub fn new(property: Iri, value: AnnotationValue) -> Self {
        Annotation { property, value }
    }

    pub fn literal(property: Iri, lexical: impl Into<String>) -> Self {
        Annotation::new(property, AnnotationValue::Literal(Literal::plain(lexical)))
    }

    pub fn reference(property: Iri, target: Iri) -> Self {
        Annotation::new(property, AnnotationValue::Iri(target))
    }

    /// Builds a plain-literal annotation for a shorthand property.
    pub fn shorthand(shorthand: Shorthand, lexical: impl Into<String>) -> Self {
        Annotation::literal(shorthand.property(), lexical)
    }

    /// Returns the shorthand this annotation's property corresponds to, if any.
    pub fn kind(&self) -> Option<Shorthand> {
        Shorthand::from_property(&self.property)
    }
}

/// Collects the IRI values of the given annotations, in order, without duplicates.
pub fn iri_values<'a>(annotations: impl IntoIterator<Item = &'a Annotation>) -> Vec<Iri> {
    let mut out: Vec<Iri> = Vec::new();
    for annotation in annotations {
        if let Some(iri) = annotation.value.as_iri() {
            if !out.contains(iri) {
                out.push(iri.clone());
            }
        }
    }
    out
}

/// What an annotation is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "lowercase")]
pub enum AnnotationTarget {
    Node { iri: Iri },
    Edge { key: EdgeKey },
    Model,
}

impl AnnotationTarget {
    pub fn node(iri: Iri) -> Self {
        AnnotationTarget::Node { iri }
    }

    pub fn edge(key: EdgeKey) -> Self {
        AnnotationTarget::Edge { key }
    }
}

// ---------------------------------------------------------------------------
// Shorthands
// ---------------------------------------------------------------------------

/// Well-known annotation properties addressable by a short key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Shorthand {
    LayoutX,
    LayoutY,
    Comment,
    Evidence,
    Date,
    Source,
    Contributor,
    Title,
    Deprecated,
}

impl Shorthand {
    /// Every shorthand, in lookup order.
    pub const ALL: [Shorthand; 9] = [
        Shorthand::LayoutX,
        Shorthand::LayoutY,
        Shorthand::Comment,
        Shorthand::Evidence,
        Shorthand::Date,
        Shorthand::Source,
        Shorthand::Contributor,
        Shorthand::Title,
        Shorthand::Deprecated,
    ];

    /// The primary key clients use for this shorthand.
    pub fn key(self) -> &'static str {
        match self {
            Shorthand::LayoutX => "layout-x",
            Shorthand::LayoutY => "layout-y",
            Shorthand::Comment => "comment",
            Shorthand::Evidence => "evidence",
            Shorthand::Date => "date",
            Shorthand::Source => "source",
            Shorthand::Contributor => "contributor",
            Shorthand::Title => "title",
            Shorthand::Deprecated => "deprecated",
        }
    }

    /// Older client keys still accepted for the layout hints.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Shorthand::LayoutX => &["hint-layout-x", "x"],
            Shorthand::LayoutY => &["hint-layout-y", "y"],
            _ => &[],
        }
    }

    /// The annotation property IRI this shorthand stands for.
    pub fn property_str(self) -> &'static str {
        match self {
            Shorthand::LayoutX => "http://tessera.dev/vocab/hint/layout/x",
            Shorthand::LayoutY => "http://tessera.dev/vocab/hint/layout/y",
            Shorthand::Comment => "http://www.w3.org/2000/01/rdf-schema#comment",
            Shorthand::Evidence => "http://tessera.dev/vocab/evidence",
            Shorthand::Date => "http://purl.org/dc/elements/1.1/date",
            Shorthand::Source => "http://purl.org/dc/elements/1.1/source",
            Shorthand::Contributor => "http://purl.org/dc/elements/1.1/contributor",
            Shorthand::Title => "http://purl.org/dc/elements/1.1/title",
            Shorthand::Deprecated => "http://www.w3.org/2002/07/owl#deprecated",
        }
    }

    pub fn property(self) -> Iri {
        Iri::new(self.property_str())
    }

    /// Looks up a shorthand by key or alias (exact, case-sensitive).
    pub fn from_key(key: &str) -> Option<Shorthand> {
        Shorthand::ALL
            .into_iter()
            .find(|s| s.key() == key || s.aliases().contains(&key))
    }

    /// Looks up a shorthand by its property IRI.
    pub fn from_property(property: &Iri) -> Option<Shorthand> {
        Shorthand::ALL
            .into_iter()
            .find(|s| s.property_str() == property.as_str())
    }
}
