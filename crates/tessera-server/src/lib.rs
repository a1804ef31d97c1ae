//! Batch transaction engine and HTTP/JSON API for collaborative editing of
//! tessera models.
//!
//! Clients send batches of operations on individuals, edges, models and
//! metadata. The [`service::BatchEngine`] runs each batch against one model
//! under that model's lock, records per-user undo history and renders the
//! response. The HTTP layer is a thin axum router on top of the engine.

pub mod annotations;
pub mod bindings;
pub mod config;
pub mod error;
pub mod export;
pub mod expression;
pub mod handlers;
pub mod registry;
pub mod render;
pub mod resolver;
pub mod router;
pub mod schema;
pub mod service;
pub mod state;
pub mod undo;
pub mod validation;
