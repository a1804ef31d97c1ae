//! HTTP handler modules for the tessera API.
//!
//! Handlers are thin: they extract the request, hand it to the
//! [`BatchEngine`](crate::service::BatchEngine) on the blocking pool, and
//! return JSON. No business logic lives in handlers.

pub mod batch;
pub mod models;
