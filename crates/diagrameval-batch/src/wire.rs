//! JSONL request files.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use diagrameval_core::request::EvaluationRequest;

use crate::error::BatchError;

/// Render requests as JSONL, one request per line.
pub fn requests_to_jsonl(requests: &[EvaluationRequest]) -> Result<String> {
    let mut out = String::new();
    for request in requests {
        let line = serde_json::to_string(request)
            .with_context(|| format!("failed to serialize request {}", request.custom_id))?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Write a request file, creating parent directories as needed.
pub fn write_requests(path: &Path, requests: &[EvaluationRequest]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let jsonl = requests_to_jsonl(requests)?;
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(jsonl.as_bytes())
        .with_context(|| format!("failed to write requests to {}", path.display()))?;
    tracing::debug!(path = %path.display(), count = requests.len(), "wrote request file");
    Ok(())
}

/// Parse a JSONL request file body. Blank lines are skipped.
pub fn parse_requests_str(content: &str) -> Result<Vec<EvaluationRequest>, BatchError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| BatchError::MalformedLine {
                line: i + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Read a request file.
pub fn read_requests(path: &Path) -> Result<Vec<EvaluationRequest>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request file: {}", path.display()))?;
    parse_requests_str(&content).with_context(|| format!("in {}", path.display()))
}
