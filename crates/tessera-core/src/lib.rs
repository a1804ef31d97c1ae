//! Core data model for tessera: identifiers, class expressions, annotations,
//! the model graph, invertible changes and the graph editor.

pub mod annotation;
pub mod change;
pub mod error;
pub mod expr;
pub mod graph;
pub mod id;
pub mod mutation;
pub mod node;
pub mod snapshot;

// Re-export commonly used types
pub use annotation::{Annotation, AnnotationTarget, AnnotationValue, Literal, Shorthand};
pub use change::GraphChange;
pub use error::CoreError;
pub use expr::ClassExpr;
pub use graph::ModelGraph;
pub use id::{EdgeKey, Iri, ModelId, UserId};
pub use mutation::{DeletionReport, GraphEditor};
pub use node::{Fact, Individual};
pub use snapshot::{FactSnapshot, ModelSnapshot};
