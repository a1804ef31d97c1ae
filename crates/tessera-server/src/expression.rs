//! Conversion between wire class expressions and [`ClassExpr`].

use tessera_core::{ClassExpr, ModelGraph};

use crate::error::ApiError;
use crate::resolver::IdentifierResolver;
use crate::schema::batch::ExpressionPayload;

/// Parses a wire expression. Intersections and unions need at least one
/// operand; a single operand stands for itself.
pub fn parse_expression(
    payload: &ExpressionPayload,
    resolver: &dyn IdentifierResolver,
    model: &ModelGraph,
) -> Result<ClassExpr, ApiError> {
    let kind = payload
        .kind
        .as_deref()
        .ok_or_else(|| ApiError::MissingParameter("expression type".to_string()))?;
    match kind {
        "class" => {
            let id = payload
                .id
                .as_deref()
                .ok_or_else(|| ApiError::MissingParameter("class id".to_string()))?;
            Ok(ClassExpr::named(resolver.to_canonical(id)?))
        }
        "svf" => {
            let property = payload
                .property
                .as_ref()
                .and_then(|p| p.id.as_deref())
                .ok_or_else(|| ApiError::MissingParameter("svf property".to_string()))?;
            let property = resolver
                .lookup_relation(property, model)
                .ok_or_else(|| ApiError::UnknownIdentifier(format!("relation {}", property)))?;
            let filler = payload
                .filler
                .as_ref()
                .ok_or_else(|| ApiError::MissingParameter("svf filler".to_string()))?;
            Ok(ClassExpr::some_values_from(
                property,
                parse_expression(filler, resolver, model)?,
            ))
        }
        "intersection" | "union" => {
            let operands = payload
                .expressions
                .as_deref()
                .filter(|ops| !ops.is_empty())
                .ok_or_else(|| ApiError::MissingParameter(format!("{} operands", kind)))?;
            let mut parsed = operands
                .iter()
                .map(|op| parse_expression(op, resolver, model))
                .collect::<Result<Vec<_>, _>>()?;
            if parsed.len() == 1 {
                return Ok(parsed.remove(0));
            }
            Ok(if kind == "union" {
                ClassExpr::Union { operands: parsed }
            } else {
                ClassExpr::Intersection { operands: parsed }
            })
        }
        "complement" => {
            let operand = payload
                .filler
                .as_ref()
                .ok_or_else(|| ApiError::MissingParameter("complement filler".to_string()))?;
            Ok(ClassExpr::Complement {
                operand: Box::new(parse_expression(operand, resolver, model)?),
            })
        }
        other => Err(ApiError::BadRequest(format!(
            "unknown expression type '{}'",
            other
        ))),
    }
}

/// Parses every expression of an argument list.
pub fn parse_all(
    payloads: &[ExpressionPayload],
    resolver: &dyn IdentifierResolver,
    model: &ModelGraph,
) -> Result<Vec<ClassExpr>, ApiError> {
    payloads
        .iter()
        .map(|p| parse_expression(p, resolver, model))
        .collect()
}

/// Renders an expression with compact ids.
pub fn render_expression(expr: &ClassExpr, resolver: &dyn IdentifierResolver) -> ExpressionPayload {
    match expr {
        ClassExpr::Named { id } => ExpressionPayload::class(resolver.to_compact(id)),
        ClassExpr::SomeValuesFrom { property, filler } => ExpressionPayload::svf(
            resolver.to_compact(property),
            render_expression(filler, resolver),
        ),
        ClassExpr::Intersection { operands } | ClassExpr::Union { operands } => {
            let kind = if matches!(expr, ClassExpr::Union { .. }) {
                "union"
            } else {
                "intersection"
            };
            ExpressionPayload {
                kind: Some(kind.to_string()),
                expressions: Some(
                    operands
                        .iter()
                        .map(|op| render_expression(op, resolver))
                        .collect(),
                ),
                ..Default::default()
            }
        }
        ClassExpr::Complement { operand } => ExpressionPayload {
            kind: Some("complement".to_string()),
            filler: Some(Box::new(render_expression(operand, resolver))),
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{CurieResolver, Vocabulary};

    fn model() -> ModelGraph {
        ModelGraph::new("model:m".into(), "http://x/m".into())
    }

    #[test]
    fn parses_nested_restriction() {
        let resolver = CurieResolver::new(Vocabulary::standard());
        let payload = ExpressionPayload::svf("BFO:0000050", ExpressionPayload::class("GO:0005634"));
        let expr = parse_expression(&payload, &resolver, &model()).unwrap();
        assert_eq!(
            expr,
            ClassExpr::some_values_from(
                "http://purl.obolibrary.org/obo/BFO_0000050",
                ClassExpr::named("http://purl.obolibrary.org/obo/GO_0005634"),
            )
        );
        assert_eq!(render_expression(&expr, &resolver), payload);
    }

    #[test]
    fn single_operand_collapses() {
        let resolver = CurieResolver::new(Vocabulary::new());
        let payload = ExpressionPayload {
            kind: Some("union".to_string()),
            expressions: Some(vec![ExpressionPayload::class("GO:1")]),
            ..Default::default()
        };
        let expr = parse_expression(&payload, &resolver, &model()).unwrap();
        assert!(expr.is_named());
    }

    #[test]
    fn missing_parts_are_reported() {
        let resolver = CurieResolver::new(Vocabulary::new());
        let payload = ExpressionPayload {
            kind: Some("intersection".to_string()),
            expressions: Some(vec![]),
            ..Default::default()
        };
        let err = parse_expression(&payload, &resolver, &model()).unwrap_err();
        assert!(matches!(err, ApiError::MissingParameter(_)));

        let err = parse_expression(&ExpressionPayload::default(), &resolver, &model()).unwrap_err();
        assert!(matches!(err, ApiError::MissingParameter(_)));
    }

    #[test]
    fn strict_relations_reject_unknown_svf_property() {
        let resolver = CurieResolver::new(Vocabulary::standard().strict(true));
        let payload = ExpressionPayload::svf("RO:0000000", ExpressionPayload::class("GO:1"));
        let err = parse_expression(&payload, &resolver, &model()).unwrap_err();
        assert!(matches!(err, ApiError::UnknownIdentifier(_)));
    }
}
