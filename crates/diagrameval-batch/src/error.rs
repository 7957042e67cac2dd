//! Batch file error types.

use thiserror::Error;

/// Errors raised while reading or naming batch files.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatchError {
    /// A JSONL line could not be decoded.
    #[error("line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    /// A response line carries no message content.
    #[error("line {line}: response for '{custom_id}' has no message content")]
    MissingContent { line: usize, custom_id: String },

    /// A batch file name does not follow `{date}_{setting}_{model}_n{n}`.
    #[error("invalid batch file name '{name}': {reason}")]
    InvalidFileName { name: String, reason: String },
}

impl BatchError {
    /// The 1-based line number, for line-level errors.
    pub fn line(&self) -> Option<usize> {
        match self {
            BatchError::MalformedLine { line, .. } | BatchError::MissingContent { line, .. } => {
                Some(*line)
            }
            BatchError::InvalidFileName { .. } => None,
        }
    }
}
