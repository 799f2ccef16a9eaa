//! # Middleware
//!
//! Tower layers shared by every route: request counters and tracing spans.
//! Admin authentication lives in [`crate::auth`].

pub mod metrics;
pub mod tracing_layer;
