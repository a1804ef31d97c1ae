//! Annotation lifecycle: turning client key/value pairs into annotations
//! and literals, provenance stamping, and cleanup after removals.
//!
//! Provenance follows two rules: `date` is replaced on every stamp, while
//! `contributor` accumulates one entry per stamping operation. Removals never
//! record a contributor on what they removed; the surviving targets of a
//! removal are stamped instead.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use tessera_core::{
    Annotation, AnnotationTarget, AnnotationValue, DeletionReport, GraphEditor, Iri, Literal,
    ModelGraph, Shorthand, UserId,
};

use crate::bindings::VariableBindings;
use crate::error::ApiError;
use crate::resolver::IdentifierResolver;
use crate::schema::batch::ValuePayload;

/// How an annotation key is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyClass {
    Shorthand(Shorthand),
    /// A registered data property; the value becomes a literal on the node.
    TypedLiteralProperty(Iri),
    ArbitraryAnnotation(Iri),
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the current time for date stamps and history entries.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// AnnotationLifecycle
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AnnotationLifecycle {
    resolver: Arc<dyn IdentifierResolver>,
    clock: Arc<dyn Clock>,
    record_users: bool,
}

impl AnnotationLifecycle {
    pub fn new(
        resolver: Arc<dyn IdentifierResolver>,
        clock: Arc<dyn Clock>,
        record_users: bool,
    ) -> Self {
        AnnotationLifecycle {
            resolver,
            clock,
            record_users,
        }
    }

    /// Today's date as `YYYY-MM-DD` (UTC).
    pub fn today(&self) -> String {
        self.clock.now().format("%Y-%m-%d").to_string()
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    /// Shorthands match exactly (keys and aliases); any other key is resolved
    /// and checked against the registered data properties.
    pub fn classify(&self, key: &str) -> Result<KeyClass, ApiError> {
        if let Some(shorthand) = Shorthand::from_key(key) {
            return Ok(KeyClass::Shorthand(shorthand));
        }
        let iri = self.resolver.to_canonical(key)?;
        if self.resolver.vocabulary().is_data_property(&iri) {
            Ok(KeyClass::TypedLiteralProperty(iri))
        } else {
            Ok(KeyClass::ArbitraryAnnotation(iri))
        }
    }

    /// Builds the annotations named by `values`, skipping incomplete pairs and
    /// data properties. Evidence values must name a node (or a variable bound
    /// to one). A contributor is appended when `user` is given and users are
    /// recorded.
    pub fn extract_annotations(
        &self,
        values: &[ValuePayload],
        user: Option<&UserId>,
        bindings: &VariableBindings,
        model: &ModelGraph,
    ) -> Result<Vec<Annotation>, ApiError> {
        let mut out: Vec<Annotation> = Vec::new();
        for payload in values {
            let (Some(key), Some(value)) = (payload.key.as_deref(), payload.value.as_deref())
            else {
                continue;
            };
            let annotation = match self.classify(key)? {
                KeyClass::Shorthand(Shorthand::Evidence) => {
                    let node = bindings.resolve_node(value, model, self.resolver.as_ref())?;
                    Annotation::reference(Shorthand::Evidence.property(), node)
                }
                KeyClass::Shorthand(shorthand) => {
                    self.annotation(shorthand.property(), value, payload.value_type.as_deref())?
                }
                KeyClass::TypedLiteralProperty(_) => continue,
                KeyClass::ArbitraryAnnotation(property) => {
                    self.annotation(property, value, payload.value_type.as_deref())?
                }
            };
            if !out.contains(&annotation) {
                out.push(annotation);
            }
        }
        if let Some(contributor) = self.contributor(user) {
            out.push(contributor);
        }
        Ok(out)
    }

    /// Collects the data-property values of `values`.
    pub fn extract_literals(
        &self,
        values: &[ValuePayload],
    ) -> Result<BTreeMap<Iri, BTreeSet<Literal>>, ApiError> {
        let mut out: BTreeMap<Iri, BTreeSet<Literal>> = BTreeMap::new();
        for payload in values {
            let (Some(key), Some(value)) = (payload.key.as_deref(), payload.value.as_deref())
            else {
                continue;
            };
            if let KeyClass::TypedLiteralProperty(property) = self.classify(key)? {
                let literal = match payload.value_type.as_deref() {
                    Some(datatype) if datatype != "IRI" => {
                        Literal::typed(value, self.resolver.to_canonical(datatype)?)
                    }
                    _ => Literal::plain(value),
                };
                out.entry(property).or_default().insert(literal);
            }
        }
        Ok(out)
    }

    fn annotation(
        &self,
        property: Iri,
        value: &str,
        value_type: Option<&str>,
    ) -> Result<Annotation, ApiError> {
        Ok(match value_type {
            Some("IRI") => Annotation::reference(property, self.resolver.to_canonical(value)?),
            Some(datatype) => Annotation::new(
                property,
                AnnotationValue::Literal(Literal::typed(
                    value,
                    self.resolver.to_canonical(datatype)?,
                )),
            ),
            None => Annotation::literal(property, value),
        })
    }

    pub fn contributor(&self, user: Option<&UserId>) -> Option<Annotation> {
        match user {
            Some(user) if self.record_users => Some(Annotation::shorthand(
                Shorthand::Contributor,
                user.as_str(),
            )),
            _ => None,
        }
    }

    pub fn date(&self) -> Annotation {
        Annotation::shorthand(Shorthand::Date, self.today())
    }

    // -----------------------------------------------------------------------
    // Stamping
    // -----------------------------------------------------------------------

    /// Replaces the target's date with today's.
    pub fn stamp_date(
        &self,
        editor: &mut GraphEditor<'_>,
        target: &AnnotationTarget,
    ) -> Result<(), ApiError> {
        editor.upsert_annotation(target, self.date())?;
        Ok(())
    }

    /// Stamps the date and appends a contributor.
    pub fn stamp_provenance(
        &self,
        editor: &mut GraphEditor<'_>,
        target: &AnnotationTarget,
        user: Option<&UserId>,
    ) -> Result<(), ApiError> {
        self.stamp_date(editor, target)?;
        self.add_contributor(editor, target, user)
    }

    /// Model-level provenance after a mutating operation.
    pub fn stamp_model(
        &self,
        editor: &mut GraphEditor<'_>,
        user: Option<&UserId>,
    ) -> Result<(), ApiError> {
        self.add_contributor(editor, &AnnotationTarget::Model, user)?;
        self.stamp_date(editor, &AnnotationTarget::Model)
    }

    /// Appends the user as contributor.
    fn add_contributor(
        &self,
        editor: &mut GraphEditor<'_>,
        target: &AnnotationTarget,
        user: Option<&UserId>,
    ) -> Result<(), ApiError> {
        let Some(contributor) = self.contributor(user) else {
            return Ok(());
        };
        editor.add_annotations(target, vec![contributor])?;
        Ok(())
    }

    /// Stamps every survivor a deletion touched.
    pub fn stamp_after_delete(
        &self,
        editor: &mut GraphEditor<'_>,
        report: &DeletionReport,
        user: Option<&UserId>,
    ) -> Result<(), ApiError> {
        for node in &report.touched_nodes {
            if editor.graph().contains_node(node) {
                self.stamp_provenance(editor, &AnnotationTarget::node(node.clone()), user)?;
            }
        }
        for key in &report.touched_edges {
            if editor.graph().fact(key).is_some() {
                self.stamp_provenance(editor, &AnnotationTarget::edge(key.clone()), user)?;
            }
        }
        Ok(())
    }

    /// Deletes nodes left unreferenced by a removal.
    pub fn cleanup_after_removal(
        &self,
        editor: &mut GraphEditor<'_>,
        freed: Vec<Iri>,
    ) -> Result<Vec<Iri>, ApiError> {
        if freed.is_empty() {
            return Ok(Vec::new());
        }
        let removed = editor
            .cascade(freed)
            .map_err(|e| ApiError::InternalError(format!("cascade failed: {}", e)))?;
        if !removed.is_empty() {
            tracing::debug!(count = removed.len(), "cascade removed orphaned nodes");
        }
        Ok(removed)
    }
}
