//! Rendering of model content into response views with compact ids.

use std::collections::BTreeMap;

use tessera_core::{Annotation, AnnotationValue, EdgeKey, Fact, Individual, ModelGraph, Shorthand};

use crate::expression::render_expression;
use crate::resolver::IdentifierResolver;
use crate::schema::response::{AnnotationView, FactView, IndividualView, ModelView};

/// Shorthand key when there is one, otherwise the compact property id.
pub fn annotation_key(annotation: &Annotation, resolver: &dyn IdentifierResolver) -> String {
    match annotation.kind() {
        Some(shorthand) => shorthand.key().to_string(),
        None => resolver.to_compact(&annotation.property),
    }
}

pub fn annotation_view(annotation: &Annotation, resolver: &dyn IdentifierResolver) -> AnnotationView {
    let key = annotation_key(annotation, resolver);
    match &annotation.value {
        AnnotationValue::Iri(iri) => AnnotationView {
            key,
            value: resolver.to_compact(iri),
            value_type: Some("IRI".to_string()),
        },
        AnnotationValue::Literal(literal) => AnnotationView {
            key,
            value: literal.lexical.clone(),
            value_type: literal.datatype.as_ref().map(|d| resolver.to_compact(d)),
        },
    }
}

pub fn individual_view(individual: &Individual, resolver: &dyn IdentifierResolver) -> IndividualView {
    let literals = individual
        .literals
        .iter()
        .flat_map(|(property, values)| {
            values.iter().map(move |literal| AnnotationView {
                key: resolver.to_compact(property),
                value: literal.lexical.clone(),
                value_type: literal.datatype.as_ref().map(|d| resolver.to_compact(d)),
            })
        })
        .collect();
    IndividualView {
        id: resolver.to_compact(&individual.iri),
        types: individual
            .types
            .iter()
            .map(|t| render_expression(t, resolver))
            .collect(),
        annotations: individual
            .annotations
            .iter()
            .map(|a| annotation_view(a, resolver))
            .collect(),
        literals,
    }
}

pub fn fact_view(key: &EdgeKey, fact: &Fact, resolver: &dyn IdentifierResolver) -> FactView {
    FactView {
        subject: resolver.to_compact(&key.subject),
        property: resolver.to_compact(&key.relation),
        object: resolver.to_compact(&key.object),
        annotations: fact
            .annotations
            .iter()
            .map(|a| annotation_view(a, resolver))
            .collect(),
    }
}

/// The whole model, individuals and facts in snapshot order.
pub fn model_view(graph: &ModelGraph, resolver: &dyn IdentifierResolver) -> ModelView {
    let snapshot = graph.snapshot();
    ModelView {
        id: graph.id().to_string(),
        imports: snapshot.imports.iter().map(|i| resolver.to_compact(i)).collect(),
        annotations: snapshot
            .annotations
            .iter()
            .map(|a| annotation_view(a, resolver))
            .collect(),
        individuals: snapshot
            .individuals
            .iter()
            .map(|i| individual_view(i, resolver))
            .collect(),
        facts: snapshot
            .facts
            .iter()
            .map(|f| {
                fact_view(
                    &f.key(),
                    &Fact::new(f.relation.clone(), f.annotations.clone()),
                    resolver,
                )
            })
            .collect(),
    }
}

/// Model annotations grouped by key, for `meta get`.
pub fn annotation_pairs(
    annotations: &[Annotation],
    resolver: &dyn IdentifierResolver,
) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for annotation in annotations {
        let view = annotation_view(annotation, resolver);
        out.entry(view.key).or_default().push(view.value);
    }
    out
}

/// First title annotation of a model, if any.
pub fn title(graph: &ModelGraph) -> Option<String> {
    graph
        .annotations()
        .iter()
        .find(|a| a.kind() == Some(Shorthand::Title))
        .map(|a| a.value.lexical().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{CurieResolver, Vocabulary};
    use tessera_core::{Iri, Literal};

    #[test]
    fn annotation_views_use_shorthand_keys_and_compact_ids() {
        let resolver = CurieResolver::new(Vocabulary::new());
        let evidence = Annotation::reference(
            Shorthand::Evidence.property(),
            Iri::from("http://purl.obolibrary.org/obo/ECO_0000314"),
        );
        let view = annotation_view(&evidence, &resolver);
        assert_eq!(view.key, "evidence");
        assert_eq!(view.value, "ECO:0000314");
        assert_eq!(view.value_type.as_deref(), Some("IRI"));

        let typed = Annotation::new(
            Iri::from("http://www.w3.org/2000/01/rdf-schema#label"),
            AnnotationValue::Literal(Literal::typed(
                "3",
                Iri::from("http://www.w3.org/2001/XMLSchema#integer"),
            )),
        );
        let view = annotation_view(&typed, &resolver);
        assert_eq!(view.key, "rdfs:label");
        assert_eq!(view.value_type.as_deref(), Some("xsd:integer"));
    }
}
