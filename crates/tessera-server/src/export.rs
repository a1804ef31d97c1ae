//! Serialized forms of a model for `export` and `export-legacy`.
//!
//! [`JsonExporter`] renders the model snapshot as pretty JSON, which `model
//! import` accepts back. Its legacy format is a tab-separated fact table.

use tessera_core::{ModelSnapshot, Shorthand};

use crate::error::ApiError;

pub trait Exporter: Send + Sync {
    fn render(&self, snapshot: &ModelSnapshot) -> Result<String, ApiError>;

    fn render_legacy(&self, snapshot: &ModelSnapshot, format: Option<&str>) -> Result<String, ApiError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

pub const LEGACY_FORMATS: &[&str] = &["tsv"];

impl Exporter for JsonExporter {
    fn render(&self, snapshot: &ModelSnapshot) -> Result<String, ApiError> {
        serde_json::to_string_pretty(snapshot)
            .map_err(|e| ApiError::InternalError(format!("export failed: {}", e)))
    }

    fn render_legacy(&self, snapshot: &ModelSnapshot, format: Option<&str>) -> Result<String, ApiError> {
        let format = format.ok_or_else(|| ApiError::MissingParameter("format".to_string()))?;
        if !LEGACY_FORMATS.contains(&format) {
            return Err(ApiError::UnknownIdentifier(format!(
                "legacy export format '{}'",
                format
            )));
        }

        let mut out = String::from("subject\trelation\tobject\tevidence\tdate\n");
        for fact in &snapshot.facts {
            let values = |shorthand: Shorthand| {
                fact.annotations
                    .iter()
                    .filter(|a| a.kind() == Some(shorthand))
                    .map(|a| a.value.lexical())
                    .collect::<Vec<_>>()
                    .join("|")
            };
            out.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\n",
                fact.subject,
                fact.relation,
                fact.object,
                values(Shorthand::Evidence),
                values(Shorthand::Date),
            ));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{Annotation, FactSnapshot, Iri};

    fn snapshot() -> ModelSnapshot {
        ModelSnapshot {
            id: "model:m".into(),
            iri: "http://x/m".into(),
            imports: vec![],
            annotations: vec![],
            individuals: vec![],
            facts: vec![FactSnapshot {
                subject: Iri::from("a"),
                relation: Iri::from("r"),
                object: Iri::from("b"),
                annotations: vec![
                    Annotation::reference(Shorthand::Evidence.property(), "e1".into()),
                    Annotation::shorthand(Shorthand::Date, "2024-01-01"),
                ],
            }],
        }
    }

    #[test]
    fn json_export_round_trips() {
        let text = JsonExporter.render(&snapshot()).unwrap();
        assert_eq!(ModelSnapshot::from_json(&text).unwrap(), snapshot());
    }

    #[test]
    fn tsv_lists_facts() {
        let text = JsonExporter.render_legacy(&snapshot(), Some("tsv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "a\tr\tb\te1\t2024-01-01");
    }

    #[test]
    fn legacy_format_is_checked() {
        assert!(matches!(
            JsonExporter.render_legacy(&snapshot(), None),
            Err(ApiError::MissingParameter(_))
        ));
        assert!(matches!(
            JsonExporter.render_legacy(&snapshot(), Some("gaf")),
            Err(ApiError::UnknownIdentifier(_))
        ));
    }
}
