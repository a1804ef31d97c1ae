//! Model validation run before `store` when enabled.

use tessera_core::{AnnotationTarget, ModelGraph, Shorthand};

/// Checks a model and reports human-readable issues; an empty list means the
/// model may be saved.
pub trait ModelValidator: Send + Sync {
    fn validate(&self, model: &ModelGraph) -> Vec<String>;
}

/// Structural checks: every individual has a type, and every evidence
/// annotation names an individual of the model.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl ModelValidator for StructuralValidator {
    fn validate(&self, model: &ModelGraph) -> Vec<String> {
        let mut issues = Vec::new();
        for individual in model.individuals() {
            if individual.types.is_empty() {
                issues.push(format!("individual {} has no type", individual.iri));
            }
        }

        let mut targets: Vec<AnnotationTarget> = vec![AnnotationTarget::Model];
        targets.extend(model.individuals().map(|i| AnnotationTarget::node(i.iri.clone())));
        targets.extend(model.facts().map(|(key, _)| AnnotationTarget::edge(key)));
        for target in targets {
            let Ok(annotations) = model.annotations_of(&target) else {
                continue;
            };
            for annotation in annotations {
                if annotation.kind() != Some(Shorthand::Evidence) {
                    continue;
                }
                match annotation.value.as_iri() {
                    Some(iri) if model.contains_node(iri) => {}
                    _ => issues.push(format!(
                        "evidence {} on {} does not name an individual",
                        annotation.value.lexical(),
                        describe(&target)
                    )),
                }
            }
        }
        issues
    }
}

fn describe(target: &AnnotationTarget) -> String {
    match target {
        AnnotationTarget::Node { iri } => iri.to_string(),
        AnnotationTarget::Edge { key } => key.to_string(),
        AnnotationTarget::Model => "the model".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{Annotation, ClassExpr, GraphEditor};

    #[test]
    fn reports_untyped_and_dangling_evidence() {
        let mut g = ModelGraph::new("model:m".into(), "http://x/m".into());
        let mut changes = Vec::new();
        let mut ed = GraphEditor::new(&mut g, &mut changes);
        ed.create_node(
            Some("a".into()),
            vec![Annotation::literal(Shorthand::Evidence.property(), "e1")],
        )
        .unwrap();
        ed.create_node(Some("b".into()), vec![]).unwrap();
        ed.add_type(&"b".into(), ClassExpr::named("GO:1")).unwrap();

        let issues = StructuralValidator.validate(&g);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("has no type"));
        assert!(issues[1].contains("evidence e1"));
    }

    #[test]
    fn clean_model_has_no_issues() {
        let g = ModelGraph::new("model:m".into(), "http://x/m".into());
        assert!(StructuralValidator.validate(&g).is_empty());
    }
}
