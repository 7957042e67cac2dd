//! Scoring error types.
//!
//! Every variant is fatal to the single item being processed (one diagram,
//! one response file) and names that item, so batch callers can log it,
//! skip it, and report a failure summary at the end.

use thiserror::Error;

/// Errors raised by the grouping, payload, alignment, and scoring stages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    /// A row group did not resolve to a valid diagram shape.
    #[error("malformed diagram {diagram_id}: {reason}")]
    MalformedRow { diagram_id: String, reason: String },

    /// Not enough eligible diagrams to draw the requested sample.
    #[error("cannot draw {requested} diagrams for text '{text_name}': only {available} eligible")]
    InsufficientPool {
        text_name: String,
        requested: usize,
        available: usize,
    },

    /// The model response has no box for a field present in the diagram.
    #[error("response for {diagram_id} is missing Box_{field_number}")]
    Alignment { diagram_id: String, field_number: u8 },

    /// A value outside the two labels of a confusion dimension.
    #[error("cannot classify {dimension} row of {diagram_id}: human={ground_truth}, model={predicted}")]
    UnclassifiableRow {
        diagram_id: String,
        dimension: String,
        ground_truth: String,
        predicted: String,
    },

    /// No price entry for the model.
    #[error("no price entry for model '{0}'")]
    UnknownModel(String),

    /// No reference template for the source text.
    #[error("no reference template for text '{0}'")]
    UnknownText(String),

    /// A response refers to a diagram that is not in the store.
    #[error("diagram '{0}' not found in the dataset")]
    UnknownDiagram(String),

    /// Cost per diagram requested for a batch with no diagrams.
    #[error("cannot compute cost per diagram for an empty batch")]
    EmptyBatch,
}

impl ScoringError {
    /// The identifier of the item this error belongs to, when it has one.
    pub fn item_id(&self) -> Option<&str> {
        match self {
            ScoringError::MalformedRow { diagram_id, .. }
            | ScoringError::Alignment { diagram_id, .. }
            | ScoringError::UnclassifiableRow { diagram_id, .. } => Some(diagram_id),
            ScoringError::UnknownDiagram(id) => Some(id),
            ScoringError::InsufficientPool { text_name, .. } => Some(text_name),
            ScoringError::UnknownText(text) => Some(text),
            ScoringError::UnknownModel(model) => Some(model),
            ScoringError::EmptyBatch => None,
        }
    }
}
