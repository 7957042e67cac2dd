//! diagrameval-core: diagram grouping, prompt payloads and agreement scoring.
//!
//! This crate defines the data model, the per-diagram pipeline stages, and
//! the scoring report that the rest of diagrameval builds on.

pub mod align;
pub mod confusion;
pub mod cost;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod payload;
pub mod report;
pub mod request;
pub mod sampler;
pub mod setting;
pub mod statistics;
pub mod store;
