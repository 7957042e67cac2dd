//! diagrameval-batch: batch file formats and project configuration.
//!
//! Reads and writes the JSONL request and response files exchanged with a
//! batch endpoint, names batch files, loads `diagrameval.toml`, and provides
//! an oracle responder for offline runs.

pub mod config;
pub mod error;
pub mod naming;
pub mod oracle;
pub mod responses;
pub mod wire;

pub use config::{load_config, load_config_from, DiagramEvalConfig, ModelConfig};
pub use error::BatchError;
pub use naming::{parse_strategy_flags, BatchDescriptor};
pub use oracle::OracleResponder;
pub use responses::{load_response_file, ResponseFile, ResponseRecord, TokenUsage};
pub use wire::{read_requests, write_requests};
