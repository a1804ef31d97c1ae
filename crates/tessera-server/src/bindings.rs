//! Batch-scoped variable bindings.
//!
//! An operation can bind the node it creates or touches to a variable name
//! (`assign_to_variable`); later operations of the same batch refer to the
//! node by that name. Variables shadow identifiers: an id is first looked up
//! as a variable, then resolved as a node of the model.

use std::collections::HashMap;

use tessera_core::{Iri, ModelGraph};

use crate::error::ApiError;
use crate::resolver::IdentifierResolver;

#[derive(Debug, Clone, Default)]
pub struct VariableBindings {
    vars: HashMap<String, Iri>,
}

impl VariableBindings {
    pub fn new() -> Self {
        VariableBindings::default()
    }

    /// Binds `name`, replacing any earlier binding.
    pub fn bind(&mut self, name: impl Into<String>, iri: Iri) {
        self.vars.insert(name.into(), iri);
    }

    /// Binds when a name is given.
    pub fn bind_opt(&mut self, name: Option<&str>, iri: &Iri) {
        if let Some(name) = name {
            self.bind(name, iri.clone());
        }
    }

    pub fn resolve(&self, name: &str) -> Option<&Iri> {
        self.vars.get(name)
    }

    pub fn is_variable(&self, id: &str) -> bool {
        self.vars.contains_key(id)
    }

    /// Resolves `id` to a node of `model`: variable first, then the resolver.
    pub fn resolve_node(
        &self,
        id: &str,
        model: &ModelGraph,
        resolver: &dyn IdentifierResolver,
    ) -> Result<Iri, ApiError> {
        if let Some(iri) = self.resolve(id) {
            return Ok(iri.clone());
        }
        let iri = resolver.to_canonical(id)?;
        resolver
            .lookup_node(&iri, model)
            .ok_or_else(|| ApiError::UnknownIdentifier(format!("no individual {}", id)))
    }
}
