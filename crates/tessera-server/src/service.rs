//! BatchEngine: the coordinator that runs client batches against models.
//!
//! A batch is an ordered list of operations that all act on one model. The
//! engine locks that model for the whole batch (a read lock when every
//! operation only reads), dispatches the operations in order, records one
//! [`ChangeEvent`] per mutating operation for the acting user, and renders
//! the response.
//!
//! # Atomicity
//!
//! With `atomic_batches` (the default) the batch works on a clone of the
//! locked container (graph and history) that is swapped in only when every
//! operation succeeded, and models created by the batch are registered on
//! commit. Without it, operations apply in place and earlier operations
//! survive a later failure. Either way a failing operation rolls back its own
//! partial changes before the error is reported.
//!
//! Saves requested by `model store` are written after the commit in atomic
//! mode, immediately otherwise.

use std::sync::{Arc, Mutex, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexSet;

use tessera_core::{
    AnnotationTarget, EdgeKey, GraphChange, GraphEditor, Iri, ModelGraph, ModelId, ModelSnapshot,
    Shorthand, UserId,
};
use tessera_storage::ModelStore;

use crate::annotations::{AnnotationLifecycle, Clock, SystemClock};
use crate::bindings::VariableBindings;
use crate::config::EngineConfig;
use crate::error::{ApiError, BatchFailure};
use crate::export::{Exporter, JsonExporter};
use crate::expression::parse_all;
use crate::registry::{self, ModelContainer, ModelHandle, ModelRegistry, MODEL_ID_PREFIX};
use crate::render;
use crate::resolver::{CurieResolver, IdentifierResolver, Term, Vocabulary};
use crate::schema::batch::{Arguments, BatchRequest, Entity, Operation, OperationRequest};
use crate::schema::response::{
    BatchResponse, MetaView, ModelListEntry, Signal, TermView,
};
use crate::undo::{ChangeEvent, HistoryEntry};
use crate::validation::{ModelValidator, StructuralValidator};

/// History key of batches sent without a user id.
pub const ANONYMOUS_USER: &str = "anonymous";

pub struct BatchEngine {
    config: EngineConfig,
    registry: Arc<ModelRegistry>,
    resolver: Arc<dyn IdentifierResolver>,
    clock: Arc<dyn Clock>,
    lifecycle: AnnotationLifecycle,
    validator: Box<dyn ModelValidator>,
    exporter: Box<dyn Exporter>,
    store: Mutex<Box<dyn ModelStore + Send>>,
}

impl BatchEngine {
    /// Creates an engine with the default collaborators: a [`CurieResolver`]
    /// over the standard vocabulary (with the `model` prefix mapped to the
    /// configured id base), the system clock, the structural validator and
    /// the JSON exporter.
    pub fn new(
        config: EngineConfig,
        registry: Arc<ModelRegistry>,
        store: Box<dyn ModelStore + Send>,
    ) -> Self {
        let resolver: Arc<dyn IdentifierResolver> = Arc::new(
            CurieResolver::new(Vocabulary::standard().strict(config.strict_relations))
                .with_prefix(MODEL_ID_PREFIX, config.id_base.clone()),
        );
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let lifecycle =
            AnnotationLifecycle::new(Arc::clone(&resolver), Arc::clone(&clock), config.record_users);
        BatchEngine {
            config,
            registry,
            resolver,
            clock,
            lifecycle,
            validator: Box::new(StructuralValidator),
            exporter: Box::new(JsonExporter),
            store: Mutex::new(store),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn IdentifierResolver>) -> Self {
        self.resolver = resolver;
        self.rebuild_lifecycle();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self.rebuild_lifecycle();
        self
    }

    pub fn with_validator(mut self, validator: Box<dyn ModelValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_exporter(mut self, exporter: Box<dyn Exporter>) -> Self {
        self.exporter = exporter;
        self
    }

    fn rebuild_lifecycle(&mut self) {
        self.lifecycle = AnnotationLifecycle::new(
            Arc::clone(&self.resolver),
            Arc::clone(&self.clock),
            self.config.record_users,
        );
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &dyn IdentifierResolver {
        self.resolver.as_ref()
    }

    // -----------------------------------------------------------------------
    // Store access
    // -----------------------------------------------------------------------

    /// Opens every stored model. Returns how many were loaded.
    pub fn load_stored(&self) -> Result<usize, ApiError> {
        let store = self.lock_store()?;
        self.registry.load_all(&**store)
    }

    /// Writes an open model to the store. The model lock is released before
    /// the store lock is taken, the order every batch follows.
    pub fn save_model(&self, id: &ModelId) -> Result<(), ApiError> {
        let snapshot = self.registry.snapshot(id)?;
        self.persist(&snapshot)
    }

    fn persist(&self, snapshot: &ModelSnapshot) -> Result<(), ApiError> {
        self.lock_store()?.save(snapshot)?;
        tracing::info!(model = %snapshot.id, "model saved");
        Ok(())
    }

    fn lock_store(&self) -> Result<std::sync::MutexGuard<'_, Box<dyn ModelStore + Send>>, ApiError> {
        self.store
            .lock()
            .map_err(|_| ApiError::InternalError("store lock poisoned".to_string()))
    }

    /// Open models with their titles and sizes.
    pub fn list_models(&self) -> Result<Vec<ModelListEntry>, ApiError> {
        let mut entries = Vec::new();
        for id in self.registry.model_ids() {
            let Ok(handle) = self.registry.handle(&id) else {
                continue;
            };
            let container = registry::read(&handle)?;
            entries.push(ModelListEntry {
                id: id.to_string(),
                title: render::title(&container.graph),
                individuals: container.graph.node_count(),
                facts: container.graph.edge_count(),
            });
        }
        Ok(entries)
    }

    // -----------------------------------------------------------------------
    // Batch execution
    // -----------------------------------------------------------------------

    /// Runs a batch for `user`. The first failing operation aborts the batch.
    pub fn execute(
        &self,
        request: BatchRequest,
        user: Option<UserId>,
    ) -> Result<BatchResponse, BatchFailure> {
        if request.requests.is_empty() {
            return Err(BatchFailure::on_commit(ApiError::MissingParameter(
                "requests".to_string(),
            )));
        }

        let prefetched = self.prefetch(&request.requests);
        let read_only = request.requests.iter().all(OperationRequest::is_read_only);
        let mut batch = Batch::new(user, prefetched.as_ref(), read_only);

        for (index, op) in request.requests.iter().enumerate() {
            if let Err(error) = self.dispatch(&mut batch, op) {
                tracing::warn!(
                    operation = index,
                    entity = ?op.entity,
                    op = ?op.operation,
                    error = %error,
                    "batch operation failed"
                );
                self.abort(batch);
                return Err(BatchFailure::at(index, error));
            }
        }

        let response = self
            .respond(&batch, request.uid, request.intention)
            .map_err(BatchFailure::on_commit)?;
        let model = batch.model.clone();
        let operations = request.requests.len();
        let user = batch.history_user.clone();
        let to_save = self.commit(batch).map_err(BatchFailure::on_commit)?;
        if let Some(snapshot) = to_save {
            self.persist(&snapshot).map_err(BatchFailure::on_commit)?;
        }
        tracing::info!(model = ?model, operations, user = %user, "batch committed");
        Ok(response)
    }

    /// The handle of the first existing model the batch names, unless the
    /// batch starts by creating one.
    fn prefetch(&self, requests: &[OperationRequest]) -> Option<(ModelId, ModelHandle)> {
        let id = requests
            .iter()
            .find_map(|op| {
                if op.creates_model() {
                    Some(None)
                } else {
                    op.arguments
                        .model_id
                        .as_deref()
                        .map(|id| Some(ModelId::from(id)))
                }
            })
            .flatten()?;
        let handle = self.registry.handle(&id).ok()?;
        Some((id, handle))
    }

    fn dispatch<'h>(&self, batch: &mut Batch<'h>, op: &OperationRequest) -> Result<(), ApiError> {
        if op.is_meta() {
            if batch.non_meta {
                return Err(ApiError::UnsupportedOperationCombination(format!(
                    "{:?} {:?} cannot follow model edits in the same batch",
                    op.entity, op.operation
                )));
            }
            batch.meta_ran = true;
        } else {
            if batch.meta_ran {
                return Err(ApiError::UnsupportedOperationCombination(format!(
                    "{:?} {:?} cannot follow meta operations in the same batch",
                    op.entity, op.operation
                )));
            }
            batch.non_meta = true;
        }
        tracing::debug!(entity = ?op.entity, operation = ?op.operation, "dispatch");

        let args = &op.arguments;
        match op.entity {
            Entity::Individual => self.individual_op(batch, op.operation, args),
            Entity::Edge => self.edge_op(batch, op.operation, args),
            Entity::Model => self.model_op(batch, op.operation, args),
            Entity::Meta => self.meta_op(batch, op.operation),
        }
    }

    // -----------------------------------------------------------------------
    // Model binding
    // -----------------------------------------------------------------------

    /// Fixes the batch's model and takes its lock on first use.
    fn open_model<'h>(&self, batch: &mut Batch<'h>, args: &Arguments) -> Result<(), ApiError> {
        let id = self.registry.resolve(&mut batch.model, args.model_id.as_deref())?;
        if !matches!(batch.workspace, Workspace::Unbound) {
            return Ok(());
        }
        let handle = match batch.prefetched {
            Some((prefetched, handle)) if prefetched == &id => handle,
            _ => return Err(ApiError::UnknownIdentifier(format!("model {}", id))),
        };
        batch.workspace = if batch.read_only {
            Workspace::Shared(registry::read(handle)?)
        } else {
            let guard = registry::write(handle)?;
            let scratch = self.config.atomic_batches.then(|| (*guard).clone());
            Workspace::Exclusive { guard, scratch }
        };
        Ok(())
    }

    /// Makes a model created by this batch the batch's model.
    fn start_model(&self, batch: &mut Batch<'_>, container: ModelContainer) -> Result<(), ApiError> {
        if let Some(current) = &batch.model {
            return Err(ApiError::MultipleModelIds(format!(
                "{} and new model {}",
                current,
                container.id()
            )));
        }
        batch.model = Some(container.id().clone());
        batch.workspace = Workspace::Created(container);
        Ok(())
    }

    /// Runs one mutating operation through a graph editor and records its
    /// changes as one event. On error the operation's own changes are
    /// reverted.
    ///
    /// Model-level provenance is stamped after the operation but kept out of
    /// the event, so a later stamp by another user never blocks an undo.
    fn mutate<T>(
        &self,
        batch: &mut Batch<'_>,
        description: impl Into<String>,
        stamp_model: bool,
        f: impl FnOnce(&mut GraphEditor<'_>, &mut Scope) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let user = batch.user.clone();
        let history_user = batch.history_user.clone();
        let time = self.lifecycle.now_millis();
        let container = batch.workspace.container_mut()?;
        let mut changes: Vec<GraphChange> = Vec::new();

        let result = {
            let mut editor = GraphEditor::new(&mut container.graph, &mut changes);
            f(&mut editor, &mut batch.scope)
        }
        .and_then(|value| {
            if stamp_model {
                self.stamp_model(&mut container.graph, user.as_ref())?;
            }
            Ok(value)
        });

        match result {
            Ok(value) => {
                container
                    .history
                    .record(ChangeEvent::new(history_user, time, description, changes));
                Ok(value)
            }
            Err(err) => {
                revert(&mut container.graph, &changes)?;
                Err(err)
            }
        }
    }

    /// Stamps model provenance without recording it. Partial stamps are
    /// reverted on error.
    fn stamp_model(&self, graph: &mut ModelGraph, user: Option<&UserId>) -> Result<(), ApiError> {
        let mut stamps: Vec<GraphChange> = Vec::new();
        let result = {
            let mut editor = GraphEditor::new(graph, &mut stamps);
            self.lifecycle.stamp_model(&mut editor, user)
        };
        if result.is_err() {
            revert(graph, &stamps)?;
        }
        result
    }

    // -----------------------------------------------------------------------
    // Individuals
    // -----------------------------------------------------------------------

    fn individual_op(
        &self,
        batch: &mut Batch<'_>,
        operation: Operation,
        args: &Arguments,
    ) -> Result<(), ApiError> {
        self.open_model(batch, args)?;
        let user = batch.user.clone();
        let user = user.as_ref();
        let resolver = self.resolver.as_ref();
        let lifecycle = &self.lifecycle;
        let values = args.values.as_deref().unwrap_or_default();

        match operation {
            Operation::Get => {
                let id = required(&args.individual, "individual")?;
                let container = batch.workspace.container()?;
                let iri = batch
                    .scope
                    .bindings
                    .resolve_node(id, &container.graph, resolver)?;
                batch.scope.relevant.insert(iri);
                Ok(())
            }
            Operation::Add => {
                let expressions = required(&args.expressions, "expressions")?;
                self.mutate(batch, "add individual", true, |editor, scope| {
                    let types = parse_all(expressions, resolver, editor.graph())?;
                    // A variable names a node this batch created; any other
                    // id must name a node already in the model.
                    let existing = match args.individual.as_deref() {
                        Some(id) => Some((
                            !scope.bindings.is_variable(id),
                            scope.bindings.resolve_node(id, editor.graph(), resolver)?,
                        )),
                        None => None,
                    };
                    let stamp_contributor = matches!(existing, Some((true, _)));
                    let iri = match existing {
                        Some((_, iri)) => iri,
                        None => {
                            let annotations = lifecycle.extract_annotations(
                                values,
                                user,
                                &scope.bindings,
                                editor.graph(),
                            )?;
                            let iri = args
                                .individual_iri
                                .as_deref()
                                .map(|id| resolver.to_canonical(id))
                                .transpose()?;
                            editor.create_node(iri, annotations)?
                        }
                    };
                    for expr in types {
                        editor.add_type(&iri, expr)?;
                    }
                    let literals = lifecycle.extract_literals(values)?;
                    editor.add_literals(&iri, &literals)?;
                    let target = AnnotationTarget::node(iri.clone());
                    if stamp_contributor {
                        lifecycle.stamp_provenance(editor, &target, user)?;
                    } else {
                        lifecycle.stamp_date(editor, &target)?;
                    }
                    scope.bindings.bind_opt(args.assign_to_variable.as_deref(), &iri);
                    scope.relevant.insert(iri);
                    Ok(())
                })
            }
            Operation::Remove => {
                let id = required(&args.individual, "individual")?;
                self.mutate(batch, format!("remove individual {}", id), true, |editor, scope| {
                    let iri = scope.bindings.resolve_node(id, editor.graph(), resolver)?;
                    let report = editor.delete_node(&iri)?;
                    tracing::debug!(removed = report.removed_nodes.len(), "individual deleted");
                    lifecycle.stamp_after_delete(editor, &report, user)?;
                    scope.render_full = true;
                    Ok(())
                })
            }
            Operation::AddType | Operation::RemoveType => {
                let id = required(&args.individual, "individual")?;
                let expressions = required(&args.expressions, "expressions")?;
                let adding = operation == Operation::AddType;
                let description = if adding { "add type" } else { "remove type" };
                self.mutate(batch, description, true, |editor, scope| {
                    let iri = scope.bindings.resolve_node(id, editor.graph(), resolver)?;
                    for expr in parse_all(expressions, resolver, editor.graph())? {
                        if adding {
                            editor.add_type(&iri, expr)?;
                        } else {
                            editor.remove_type(&iri, &expr)?;
                        }
                    }
                    lifecycle.stamp_provenance(editor, &AnnotationTarget::node(iri.clone()), user)?;
                    scope.bindings.bind_opt(args.assign_to_variable.as_deref(), &iri);
                    scope.relevant.insert(iri);
                    Ok(())
                })
            }
            Operation::AddAnnotation => {
                let id = required(&args.individual, "individual")?;
                let values = required(&args.values, "values")?;
                self.mutate(batch, "add individual annotation", true, |editor, scope| {
                    let iri = scope.bindings.resolve_node(id, editor.graph(), resolver)?;
                    let annotations =
                        lifecycle.extract_annotations(values, user, &scope.bindings, editor.graph())?;
                    let literals = lifecycle.extract_literals(values)?;
                    let target = AnnotationTarget::node(iri.clone());
                    editor.add_annotations(&target, annotations)?;
                    editor.add_literals(&iri, &literals)?;
                    lifecycle.stamp_date(editor, &target)?;
                    scope.bindings.bind_opt(args.assign_to_variable.as_deref(), &iri);
                    scope.relevant.insert(iri);
                    Ok(())
                })
            }
            Operation::RemoveAnnotation => {
                let id = required(&args.individual, "individual")?;
                let values = required(&args.values, "values")?;
                self.mutate(batch, "remove individual annotation", true, |editor, scope| {
                    let iri = scope.bindings.resolve_node(id, editor.graph(), resolver)?;
                    let annotations =
                        lifecycle.extract_annotations(values, None, &scope.bindings, editor.graph())?;
                    let literals = lifecycle.extract_literals(values)?;
                    let target = AnnotationTarget::node(iri.clone());
                    let freed = editor.remove_annotations(&target, &annotations)?;
                    editor.remove_literals(&iri, &literals)?;
                    if !lifecycle.cleanup_after_removal(editor, freed)?.is_empty() {
                        scope.render_full = true;
                    }
                    if editor.graph().contains_node(&iri) {
                        lifecycle.stamp_date(editor, &target)?;
                        scope.bindings.bind_opt(args.assign_to_variable.as_deref(), &iri);
                        scope.relevant.insert(iri);
                    }
                    Ok(())
                })
            }
            other => Err(unsupported(Entity::Individual, other)),
        }
    }

    // -----------------------------------------------------------------------
    // Edges
    // -----------------------------------------------------------------------

    fn edge_op(
        &self,
        batch: &mut Batch<'_>,
        operation: Operation,
        args: &Arguments,
    ) -> Result<(), ApiError> {
        if !matches!(
            operation,
            Operation::Add
                | Operation::Remove
                | Operation::AddAnnotation
                | Operation::RemoveAnnotation
        ) {
            return Err(unsupported(Entity::Edge, operation));
        }
        self.open_model(batch, args)?;
        let user = batch.user.clone();
        let user = user.as_ref();
        let resolver = self.resolver.as_ref();
        let lifecycle = &self.lifecycle;
        let triple = (
            required(&args.subject, "subject")?,
            required(&args.predicate, "predicate")?,
            required(&args.object, "object")?,
        );

        match operation {
            Operation::Add => {
                let values = args.values.as_deref().unwrap_or_default();
                self.mutate(batch, "add edge", true, |editor, scope| {
                    let key = resolve_edge(resolver, editor.graph(), scope, triple)?;
                    let annotations =
                        lifecycle.extract_annotations(values, user, &scope.bindings, editor.graph())?;
                    editor.add_edge(key.clone(), annotations)?;
                    lifecycle.stamp_date(editor, &AnnotationTarget::edge(key))
                })
            }
            Operation::Remove => self.mutate(batch, "remove edge", true, |editor, scope| {
                let key = resolve_edge(resolver, editor.graph(), scope, triple)?;
                let freed = editor.remove_edge(&key)?;
                if !freed.is_empty() {
                    scope.render_full = true;
                    lifecycle.cleanup_after_removal(editor, freed)?;
                }
                Ok(())
            }),
            Operation::AddAnnotation => {
                let values = required(&args.values, "values")?;
                self.mutate(batch, "add edge annotation", true, |editor, scope| {
                    let key = resolve_edge(resolver, editor.graph(), scope, triple)?;
                    let annotations =
                        lifecycle.extract_annotations(values, user, &scope.bindings, editor.graph())?;
                    let target = AnnotationTarget::edge(key);
                    editor.add_annotations(&target, annotations)?;
                    lifecycle.stamp_date(editor, &target)
                })
            }
            Operation::RemoveAnnotation => {
                let values = required(&args.values, "values")?;
                self.mutate(batch, "remove edge annotation", true, |editor, scope| {
                    let key = resolve_edge(resolver, editor.graph(), scope, triple)?;
                    let annotations =
                        lifecycle.extract_annotations(values, None, &scope.bindings, editor.graph())?;
                    let target = AnnotationTarget::edge(key);
                    let freed = editor.remove_annotations(&target, &annotations)?;
                    if !lifecycle.cleanup_after_removal(editor, freed)?.is_empty() {
                        scope.render_full = true;
                    }
                    lifecycle.stamp_date(editor, &target)
                })
            }
            other => Err(unsupported(Entity::Edge, other)),
        }
    }

    // -----------------------------------------------------------------------
    // Models
    // -----------------------------------------------------------------------

    fn model_op(
        &self,
        batch: &mut Batch<'_>,
        operation: Operation,
        args: &Arguments,
    ) -> Result<(), ApiError> {
        let user = batch.user.clone();
        let user = user.as_ref();
        let lifecycle = &self.lifecycle;
        let values = args.values.as_deref().unwrap_or_default();

        match operation {
            Operation::Add | Operation::Import => {
                let container = match operation {
                    Operation::Import => {
                        let payload = required(&args.import_model, "import_model")?;
                        let snapshot = ModelSnapshot::from_json(payload)?;
                        self.registry.import(&snapshot)?
                    }
                    _ => {
                        let mut container = self.registry.create_blank(&self.config.id_base);
                        let imports = self.canonical_all(&self.config.default_imports)?;
                        if !imports.is_empty() {
                            container.graph.apply(&GraphChange::ImportsReplaced {
                                previous: Vec::new(),
                                next: imports,
                            })?;
                        }
                        container
                    }
                };
                self.start_model(batch, container)?;
                let description = if operation == Operation::Import {
                    "import model"
                } else {
                    "create model"
                };
                self.mutate(batch, description, true, |editor, scope| {
                    let annotations =
                        lifecycle.extract_annotations(values, None, &scope.bindings, editor.graph())?;
                    editor.add_annotations(&AnnotationTarget::Model, annotations)?;
                    scope.render_full = true;
                    Ok(())
                })
            }
            Operation::Get => {
                self.open_model(batch, args)?;
                batch.scope.render_full = true;
                Ok(())
            }
            Operation::AddAnnotation => {
                self.open_model(batch, args)?;
                let values = required(&args.values, "values")?;
                self.mutate(batch, "add model annotation", true, |editor, scope| {
                    let annotations =
                        lifecycle.extract_annotations(values, None, &scope.bindings, editor.graph())?;
                    editor.add_annotations(&AnnotationTarget::Model, annotations)?;
                    Ok(())
                })
            }
            Operation::RemoveAnnotation => {
                self.open_model(batch, args)?;
                let values = required(&args.values, "values")?;
                self.mutate(batch, "remove model annotation", true, |editor, scope| {
                    let annotations =
                        lifecycle.extract_annotations(values, None, &scope.bindings, editor.graph())?;
                    let freed = editor.remove_annotations(&AnnotationTarget::Model, &annotations)?;
                    lifecycle.cleanup_after_removal(editor, freed)?;
                    scope.render_full = true;
                    Ok(())
                })
            }
            Operation::UpdateImports => {
                self.open_model(batch, args)?;
                let imports = match &args.imports {
                    Some(imports) => self.canonical_all(imports)?,
                    None => self.canonical_all(&self.config.default_imports)?,
                };
                self.mutate(batch, "update imports", false, |editor, scope| {
                    editor.set_imports(imports)?;
                    scope.render_full = true;
                    Ok(())
                })
            }
            Operation::Store => {
                self.open_model(batch, args)?;
                let issues = self.validator.validate(&batch.workspace.container()?.graph);
                if !issues.is_empty() {
                    if self.config.validate_before_save {
                        return Err(ApiError::ValidationFailure(issues));
                    }
                    // Saved anyway; the issues travel back as commentary.
                    batch.output.commentary = Some(issues.join("\n"));
                }
                if !values.is_empty() {
                    self.mutate(batch, "store model", false, |editor, scope| {
                        let annotations =
                            lifecycle.extract_annotations(values, user, &scope.bindings, editor.graph())?;
                        editor.add_annotations(&AnnotationTarget::Model, annotations)?;
                        Ok(())
                    })?;
                }
                batch.scope.render_full = true;
                if self.config.atomic_batches {
                    batch.output.pending_save = true;
                } else {
                    let snapshot = batch.workspace.container()?.graph.snapshot();
                    self.persist(&snapshot)?;
                }
                Ok(())
            }
            Operation::Undo | Operation::Redo => {
                self.open_model(batch, args)?;
                let history_user = batch.history_user.clone();
                let container = batch.workspace.container_mut()?;
                if operation == Operation::Undo {
                    container.history.undo(&mut container.graph, &history_user)?;
                } else {
                    container.history.redo(&mut container.graph, &history_user)?;
                }
                self.stamp_model(&mut container.graph, user)?;
                batch.scope.render_full = true;
                Ok(())
            }
            Operation::Export | Operation::ExportLegacy => {
                self.open_model(batch, args)?;
                let snapshot = batch.workspace.container()?.graph.snapshot();
                let text = if operation == Operation::Export {
                    self.exporter.render(&snapshot)?
                } else {
                    self.exporter.render_legacy(&snapshot, args.format.as_deref())?
                };
                batch.output.export = Some(text);
                Ok(())
            }
            Operation::GetUndoRedo => {
                self.open_model(batch, args)?;
                let now = self.lifecycle.now_millis();
                let (undo, redo) = batch.workspace.container()?.history.peek_history(now);
                batch.output.undo = Some(undo);
                batch.output.redo = Some(redo);
                Ok(())
            }
            other => Err(unsupported(Entity::Model, other)),
        }
    }

    fn canonical_all(&self, ids: &[String]) -> Result<Vec<Iri>, ApiError> {
        ids.iter().map(|id| self.resolver.to_canonical(id)).collect()
    }

    // -----------------------------------------------------------------------
    // Meta
    // -----------------------------------------------------------------------

    fn meta_op(&self, batch: &mut Batch<'_>, operation: Operation) -> Result<(), ApiError> {
        if operation != Operation::Get {
            return Err(unsupported(Entity::Meta, operation));
        }
        let resolver = self.resolver.as_ref();
        let vocabulary = resolver.vocabulary();
        let terms = |list: &[Term]| -> Vec<TermView> {
            list.iter()
                .map(|t| TermView::of(t, resolver.to_compact(&t.iri)))
                .collect()
        };

        let mut models_meta = std::collections::BTreeMap::new();
        let model_ids = self.registry.model_ids();
        for id in &model_ids {
            let pairs = match (&batch.model, batch.workspace.container()) {
                (Some(current), Ok(container)) if current == id => {
                    render::annotation_pairs(container.graph.annotations(), resolver)
                }
                _ => {
                    // Other models are only read when their lock is free.
                    let Ok(handle) = self.registry.handle(id) else {
                        continue;
                    };
                    let Ok(container) = handle.try_read() else {
                        continue;
                    };
                    render::annotation_pairs(container.graph.annotations(), resolver)
                }
            };
            models_meta.insert(id.to_string(), pairs);
        }

        batch.output.meta = Some(MetaView {
            relations: terms(vocabulary.relations()),
            data_properties: terms(vocabulary.data_properties()),
            evidence: terms(vocabulary.evidence()),
            shorthands: Shorthand::ALL.iter().map(|s| s.key().to_string()).collect(),
            model_ids: model_ids.iter().map(|id| id.to_string()).collect(),
            models_meta,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Response, commit, abort
    // -----------------------------------------------------------------------

    fn respond(
        &self,
        batch: &Batch<'_>,
        uid: Option<String>,
        intention: Option<String>,
    ) -> Result<BatchResponse, ApiError> {
        let resolver = self.resolver.as_ref();
        let signal = if !batch.non_meta {
            Signal::Meta
        } else if batch.scope.render_full {
            Signal::Rebuild
        } else {
            Signal::Merge
        };

        let mut model = None;
        let mut individuals = None;
        if batch.non_meta {
            let graph = &batch.workspace.container()?.graph;
            if batch.scope.render_full {
                model = Some(render::model_view(graph, resolver));
            } else {
                individuals = Some(
                    batch
                        .scope
                        .relevant
                        .iter()
                        .filter_map(|iri| graph.individual(iri))
                        .map(|i| render::individual_view(i, resolver))
                        .collect(),
                );
            }
        }

        Ok(BatchResponse {
            uid,
            intention,
            signal,
            model_id: batch.model.as_ref().map(|id| id.to_string()),
            individuals,
            model,
            undo: batch.output.undo.clone(),
            redo: batch.output.redo.clone(),
            export: batch.output.export.clone(),
            meta: batch.output.meta.clone(),
            commentary: batch.output.commentary.clone(),
        })
    }

    /// Publishes the batch's work. Returns the snapshot to save, if a save
    /// was deferred to the commit.
    fn commit(&self, batch: Batch<'_>) -> Result<Option<ModelSnapshot>, ApiError> {
        let pending_save = batch.output.pending_save;
        let snapshot_of = |c: &ModelContainer| pending_save.then(|| c.graph.snapshot());
        match batch.workspace {
            Workspace::Exclusive {
                mut guard,
                scratch: Some(scratch),
            } => {
                *guard = scratch;
                Ok(snapshot_of(&*guard))
            }
            Workspace::Exclusive {
                guard,
                scratch: None,
            } => Ok(snapshot_of(&*guard)),
            Workspace::Created(container) => {
                let snapshot = snapshot_of(&container);
                self.registry.insert(container)?;
                Ok(snapshot)
            }
            Workspace::Shared(_) | Workspace::Unbound => Ok(None),
        }
    }

    /// Drops the batch's work in atomic mode. In eager mode the changes are
    /// already in place, and a model the batch created is registered.
    fn abort(&self, batch: Batch<'_>) {
        if self.config.atomic_batches {
            return;
        }
        if let Workspace::Created(container) = batch.workspace {
            let id = container.id().clone();
            if let Err(err) = self.registry.insert(container) {
                tracing::warn!(model = %id, error = %err, "could not register model of failed batch");
            }
        }
    }
}

fn required<'a, T: ?Sized>(
    value: &'a Option<impl std::ops::Deref<Target = T>>,
    name: &str,
) -> Result<&'a T, ApiError> {
    value
        .as_deref()
        .ok_or_else(|| ApiError::MissingParameter(name.to_string()))
}

/// Applies the inverses of `changes`, newest first.
fn revert(graph: &mut ModelGraph, changes: &[GraphChange]) -> Result<(), ApiError> {
    for change in changes.iter().rev() {
        graph
            .apply(&change.inverse())
            .map_err(|e| ApiError::InternalError(format!("rollback failed: {}", e)))?;
    }
    Ok(())
}

/// Resolves the (subject, predicate, object) of an edge operation and marks
/// both endpoints relevant.
fn resolve_edge(
    resolver: &dyn IdentifierResolver,
    graph: &ModelGraph,
    scope: &mut Scope,
    (subject, predicate, object): (&str, &str, &str),
) -> Result<EdgeKey, ApiError> {
    let s = scope.bindings.resolve_node(subject, graph, resolver)?;
    let o = scope.bindings.resolve_node(object, graph, resolver)?;
    let relation = resolver
        .lookup_relation(predicate, graph)
        .ok_or_else(|| ApiError::UnknownIdentifier(format!("relation {}", predicate)))?;
    scope.relevant.insert(s.clone());
    scope.relevant.insert(o.clone());
    Ok(EdgeKey::new(s, relation, o))
}

fn unsupported(entity: Entity, operation: Operation) -> ApiError {
    ApiError::BadRequest(format!(
        "operation {:?} is not defined for {:?}",
        operation, entity
    ))
}

// ---------------------------------------------------------------------------
// Per-batch state
// ---------------------------------------------------------------------------

/// State shared by the operations of a batch and handed to edits.
#[derive(Default)]
struct Scope {
    bindings: VariableBindings,
    relevant: IndexSet<Iri>,
    render_full: bool,
}

#[derive(Default)]
struct Output {
    undo: Option<Vec<HistoryEntry>>,
    redo: Option<Vec<HistoryEntry>>,
    export: Option<String>,
    meta: Option<MetaView>,
    commentary: Option<String>,
    pending_save: bool,
}

/// The model a batch works on.
enum Workspace<'h> {
    Unbound,
    Shared(RwLockReadGuard<'h, ModelContainer>),
    /// `scratch` is the working copy in atomic mode.
    Exclusive {
        guard: RwLockWriteGuard<'h, ModelContainer>,
        scratch: Option<ModelContainer>,
    },
    /// A model created by the batch, not registered yet.
    Created(ModelContainer),
}

impl Workspace<'_> {
    fn container(&self) -> Result<&ModelContainer, ApiError> {
        match self {
            Workspace::Unbound => Err(ApiError::MissingParameter("model_id".to_string())),
            Workspace::Shared(guard) => Ok(&**guard),
            Workspace::Exclusive {
                scratch: Some(scratch),
                ..
            } => Ok(scratch),
            Workspace::Exclusive { guard, .. } => Ok(&**guard),
            Workspace::Created(container) => Ok(container),
        }
    }

    fn container_mut(&mut self) -> Result<&mut ModelContainer, ApiError> {
        match self {
            Workspace::Unbound => Err(ApiError::MissingParameter("model_id".to_string())),
            Workspace::Shared(_) => Err(ApiError::InternalError(
                "model is locked for reading".to_string(),
            )),
            Workspace::Exclusive {
                scratch: Some(scratch),
                ..
            } => Ok(scratch),
            Workspace::Exclusive { guard, .. } => Ok(&mut **guard),
            Workspace::Created(container) => Ok(container),
        }
    }
}

struct Batch<'h> {
    user: Option<UserId>,
    history_user: UserId,
    model: Option<ModelId>,
    non_meta: bool,
    meta_ran: bool,
    read_only: bool,
    prefetched: Option<&'h (ModelId, ModelHandle)>,
    workspace: Workspace<'h>,
    scope: Scope,
    output: Output,
}

impl<'h> Batch<'h> {
    fn new(
        user: Option<UserId>,
        prefetched: Option<&'h (ModelId, ModelHandle)>,
        read_only: bool,
    ) -> Self {
        let history_user = user
            .clone()
            .unwrap_or_else(|| UserId::from(ANONYMOUS_USER));
        Batch {
            user,
            history_user,
            model: None,
            non_meta: false,
            meta_ran: false,
            read_only,
            prefetched,
            workspace: Workspace::Unbound,
            scope: Scope::default(),
            output: Output::default(),
        }
    }
}
