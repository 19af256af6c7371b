// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod classify;
pub mod config;
pub mod enrich;
pub mod metrics;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod shutdown;
pub mod sources;
pub mod store;
pub mod text;

// ---- Re-exports for stable public API ----
pub use crate::config::Settings;
pub use crate::models::{Origin, TrendItem};
pub use crate::pipeline::{Pipeline, RunReport};
