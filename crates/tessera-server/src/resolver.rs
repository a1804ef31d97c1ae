//! Compact identifier resolution.
//!
//! Clients name classes, relations and nodes by compact ids (`GO:0003674`,
//! `model:1a2b/3c4d`) or by full IRIs. An [`IdentifierResolver`] translates
//! between both forms and checks ids against a model. The default
//! [`CurieResolver`] applies explicit prefixes first, then the OBO rule
//! `PREFIX:LOCAL` <-> `http://purl.obolibrary.org/obo/PREFIX_LOCAL`. Bare
//! words without a colon are looked up as relation labels in the
//! [`Vocabulary`].

use serde::Serialize;

use tessera_core::{Iri, ModelGraph};

use crate::error::ApiError;

pub const OBO_PREFIX: &str = "http://purl.obolibrary.org/obo/";

/// Translation between compact ids and canonical IRIs.
pub trait IdentifierResolver: Send + Sync {
    fn to_canonical(&self, compact: &str) -> Result<Iri, ApiError>;

    fn to_compact(&self, iri: &Iri) -> String;

    /// The node named by `iri`, if the model has one.
    fn lookup_node(&self, iri: &Iri, model: &ModelGraph) -> Option<Iri>;

    /// The relation named by `compact`, if it is acceptable as an edge
    /// predicate.
    fn lookup_relation(&self, compact: &str, model: &ModelGraph) -> Option<Iri>;

    fn vocabulary(&self) -> &Vocabulary;
}

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// A labelled vocabulary term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Term {
    pub iri: Iri,
    pub label: String,
}

/// Relations, data properties and evidence classes known to the server.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    relations: Vec<Term>,
    data_properties: Vec<Term>,
    evidence: Vec<Term>,
    strict: bool,
}

impl Vocabulary {
    pub fn new() -> Self {
        Vocabulary::default()
    }

    /// A small set of commonly used relations and evidence codes.
    pub fn standard() -> Self {
        let obo = |local: &str| Iri::new(format!("{}{}", OBO_PREFIX, local));
        let mut vocabulary = Vocabulary::new();
        for (local, label) in [
            ("BFO_0000050", "part of"),
            ("BFO_0000051", "has part"),
            ("BFO_0000066", "occurs in"),
            ("RO_0002211", "regulates"),
            ("RO_0002212", "negatively regulates"),
            ("RO_0002213", "positively regulates"),
            ("RO_0002233", "has input"),
            ("RO_0002234", "has output"),
            ("RO_0002333", "enabled by"),
            ("RO_0002411", "causally upstream of"),
        ] {
            vocabulary = vocabulary.with_relation(obo(local), label);
        }
        for (local, label) in [
            ("ECO_0000314", "direct assay evidence used in manual assertion"),
            ("ECO_0000315", "mutant phenotype evidence used in manual assertion"),
            ("ECO_0000353", "physical interaction evidence used in manual assertion"),
            ("ECO_0000501", "evidence used in automatic assertion"),
        ] {
            vocabulary = vocabulary.with_evidence(obo(local), label);
        }
        vocabulary
    }

    pub fn with_relation(mut self, iri: Iri, label: impl Into<String>) -> Self {
        self.relations.push(Term {
            iri,
            label: label.into(),
        });
        self
    }

    pub fn with_data_property(mut self, iri: Iri, label: impl Into<String>) -> Self {
        self.data_properties.push(Term {
            iri,
            label: label.into(),
        });
        self
    }

    pub fn with_evidence(mut self, iri: Iri, label: impl Into<String>) -> Self {
        self.evidence.push(Term {
            iri,
            label: label.into(),
        });
        self
    }

    /// When strict, only listed relations are accepted as edge predicates.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn relations(&self) -> &[Term] {
        &self.relations
    }

    pub fn data_properties(&self) -> &[Term] {
        &self.data_properties
    }

    pub fn evidence(&self) -> &[Term] {
        &self.evidence
    }

    pub fn is_relation(&self, iri: &Iri) -> bool {
        self.relations.iter().any(|t| &t.iri == iri)
    }

    pub fn is_data_property(&self, iri: &Iri) -> bool {
        self.data_properties.iter().any(|t| &t.iri == iri)
    }

    fn by_label(&self, label: &str) -> Option<&Iri> {
        self.relations
            .iter()
            .chain(&self.data_properties)
            .find(|t| t.label == label)
            .map(|t| &t.iri)
    }
}

// ---------------------------------------------------------------------------
// CurieResolver
// ---------------------------------------------------------------------------

/// Prefix-map resolver with the OBO fallback rule.
#[derive(Debug, Clone)]
pub struct CurieResolver {
    prefixes: Vec<(String, String)>,
    vocabulary: Vocabulary,
}

impl CurieResolver {
    /// Resolver with the `xsd`, `rdf`, `rdfs`, `owl` and `dc` prefixes.
    pub fn new(vocabulary: Vocabulary) -> Self {
        CurieResolver {
            prefixes: vec![
                ("xsd".into(), "http://www.w3.org/2001/XMLSchema#".into()),
                ("rdf".into(), "http://www.w3.org/1999/02/22-rdf-syntax-ns#".into()),
                ("rdfs".into(), "http://www.w3.org/2000/01/rdf-schema#".into()),
                ("owl".into(), "http://www.w3.org/2002/07/owl#".into()),
                ("dc".into(), "http://purl.org/dc/elements/1.1/".into()),
            ],
            vocabulary,
        }
    }

    /// Registers (or replaces) an explicit prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>, base: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefixes.retain(|(p, _)| p != &prefix);
        self.prefixes.push((prefix, base.into()));
        self
    }

    fn expand(&self, prefix: &str, local: &str) -> Iri {
        match self.prefixes.iter().find(|(p, _)| p == prefix) {
            Some((_, base)) => Iri::new(format!("{}{}", base, local)),
            None => Iri::new(format!("{}{}_{}", OBO_PREFIX, prefix, local)),
        }
    }
}

fn is_full_iri(id: &str) -> bool {
    id.starts_with("http://") || id.starts_with("https://") || id.starts_with("urn:")
}

impl IdentifierResolver for CurieResolver {
    fn to_canonical(&self, compact: &str) -> Result<Iri, ApiError> {
        let id = compact.trim();
        if id.is_empty() {
            return Err(ApiError::UnknownIdentifier("empty identifier".to_string()));
        }
        if is_full_iri(id) {
            return Ok(Iri::new(id));
        }
        match id.split_once(':') {
            Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => {
                Ok(self.expand(prefix, local))
            }
            Some(_) => Err(ApiError::UnknownIdentifier(id.to_string())),
            None => self
                .vocabulary
                .by_label(id)
                .cloned()
                .ok_or_else(|| ApiError::UnknownIdentifier(id.to_string())),
        }
    }

    fn to_compact(&self, iri: &Iri) -> String {
        let full = iri.as_str();
        let explicit = self
            .prefixes
            .iter()
            .filter(|(_, base)| full.len() > base.len() && full.starts_with(base.as_str()))
            .max_by_key(|(_, base)| base.len());
        if let Some((prefix, base)) = explicit {
            return format!("{}:{}", prefix, &full[base.len()..]);
        }
        if let Some(local) = full.strip_prefix(OBO_PREFIX) {
            if let Some(fragment) = local.strip_prefix('#') {
                return fragment.to_string();
            }
            if let Some((prefix, rest)) = local.split_once('_') {
                return format!("{}:{}", prefix, rest);
            }
            return local.to_string();
        }
        full.to_string()
    }

    fn lookup_node(&self, iri: &Iri, model: &ModelGraph) -> Option<Iri> {
        model.contains_node(iri).then(|| iri.clone())
    }

    fn lookup_relation(&self, compact: &str, _model: &ModelGraph) -> Option<Iri> {
        let iri = self.to_canonical(compact).ok()?;
        if self.vocabulary.is_relation(&iri) || !self.vocabulary.is_strict() {
            Some(iri)
        } else {
            None
        }
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> CurieResolver {
        CurieResolver::new(Vocabulary::standard()).with_prefix("model", "http://tessera.dev/model/")
    }

    #[test]
    fn obo_rule_round_trips() {
        let r = resolver();
        let iri = r.to_canonical("GO:0003674").unwrap();
        assert_eq!(iri.as_str(), "http://purl.obolibrary.org/obo/GO_0003674");
        assert_eq!(r.to_compact(&iri), "GO:0003674");
    }

    #[test]
    fn only_the_first_colon_is_rewritten() {
        let r = resolver();
        let iri = r.to_canonical("X:a:b").unwrap();
        assert_eq!(iri.as_str(), "http://purl.obolibrary.org/obo/X_a:b");
    }

    #[test]
    fn explicit_prefixes_win() {
        let r = resolver();
        let iri = r.to_canonical("model:abc/def").unwrap();
        assert_eq!(iri.as_str(), "http://tessera.dev/model/abc/def");
        assert_eq!(r.to_compact(&iri), "model:abc/def");
    }

    #[test]
    fn full_iris_pass_through() {
        let r = resolver();
        let iri = r.to_canonical("http://example.org/x").unwrap();
        assert_eq!(iri.as_str(), "http://example.org/x");
        assert_eq!(r.to_compact(&iri), "http://example.org/x");
    }

    #[test]
    fn fragment_after_obo_prefix_is_stripped() {
        let r = resolver();
        let iri = Iri::from("http://purl.obolibrary.org/obo/#thing");
        assert_eq!(r.to_compact(&iri), "thing");
    }

    #[test]
    fn labels_resolve_to_relations() {
        let r = resolver();
        let iri = r.to_canonical("enabled by").unwrap();
        assert_eq!(r.to_compact(&iri), "RO:0002333");
        assert!(r.to_canonical("no such label").is_err());
    }

    #[test]
    fn strict_vocabulary_rejects_unknown_relations() {
        let model = ModelGraph::new("model:m".into(), "http://tessera.dev/model/m".into());
        let lenient = resolver();
        assert!(lenient.lookup_relation("RO:9999999", &model).is_some());
        let strict = CurieResolver::new(Vocabulary::standard().strict(true));
        assert!(strict.lookup_relation("RO:9999999", &model).is_none());
        assert!(strict.lookup_relation("BFO:0000050", &model).is_some());
    }
}
