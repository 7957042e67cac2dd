//! Response files as returned by the batch endpoint.
//!
//! Each line wraps one chat completion whose message content is the model's
//! structured answer, itself a JSON string:
//!
//! ```text
//! {"custom_id": "request-1_3A_Beton",
//!  "response": {"body": {"choices": [{"message": {"content": "{\"Box_1\": ...}"}}],
//!                        "usage": {"prompt_tokens": 812, "completion_tokens": 96}}}}
//! ```

use std::io::Write;
use std::ops::AddAssign;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use diagrameval_core::engine::{DiagramResponse, ItemFailure};
use diagrameval_core::model::ModelResponse;
use diagrameval_core::request::{diagram_id_from_custom_id, CUSTOM_ID_PREFIX};

use crate::error::BatchError;

/// Token counts reported for one response line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens += rhs.prompt_tokens;
        self.completion_tokens += rhs.completion_tokens;
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ResponseLine {
    custom_id: String,
    response: ResponseEnvelope,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResponseEnvelope {
    body: ResponseBody,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: TokenUsage,
}

#[derive(Debug, Serialize, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// One decoded response line.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRecord {
    pub diagram_id: String,
    pub response: ModelResponse,
    pub usage: TokenUsage,
}

impl From<ResponseRecord> for DiagramResponse {
    fn from(record: ResponseRecord) -> Self {
        DiagramResponse {
            diagram_id: record.diagram_id,
            response: record.response,
        }
    }
}

/// Every decodable line of a response file.
///
/// Lines that fail to decode land in `failures` keyed by their custom id (or
/// `line {n}` when even that is unreadable); token usage is summed over all
/// lines that carry it, decoded or not.
#[derive(Debug, Clone, Default)]
pub struct ResponseFile {
    pub records: Vec<ResponseRecord>,
    pub failures: Vec<ItemFailure>,
    pub usage: TokenUsage,
}

impl ResponseFile {
    /// Records converted for the scoring engine.
    pub fn responses(&self) -> Vec<DiagramResponse> {
        self.records.iter().cloned().map(Into::into).collect()
    }
}

/// Custom id, usage, and the decoded content (or why it failed).
type DecodedLine = (String, TokenUsage, Result<ModelResponse, BatchError>);

fn decode_line(line_no: usize, line: &str) -> Result<DecodedLine, BatchError> {
    let parsed: ResponseLine =
        serde_json::from_str(line).map_err(|e| BatchError::MalformedLine {
            line: line_no,
            reason: e.to_string(),
        })?;

    let usage = parsed.response.body.usage;
    let custom_id = parsed.custom_id;
    let content = parsed
        .response
        .body
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content);

    let response = match content {
        None => Err(BatchError::MissingContent {
            line: line_no,
            custom_id: custom_id.clone(),
        }),
        Some(content) => {
            serde_json::from_str::<ModelResponse>(&content).map_err(|e| {
                BatchError::MalformedLine {
                    line: line_no,
                    reason: format!("model content for '{custom_id}' is not a diagram response: {e}"),
                }
            })
        }
    };

    Ok((custom_id, usage, response))
}

/// Parse a response file body.
pub fn parse_responses_str(content: &str) -> ResponseFile {
    let mut file = ResponseFile::default();

    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = i + 1;
        match decode_line(line_no, line) {
            Ok((custom_id, usage, response)) => {
                file.usage += usage;
                let diagram_id = diagram_id_from_custom_id(&custom_id)
                    .unwrap_or(custom_id.as_str())
                    .to_string();
                match response {
                    Ok(response) => file.records.push(ResponseRecord {
                        diagram_id,
                        response,
                        usage,
                    }),
                    Err(e) => {
                        tracing::warn!(id = %diagram_id, error = %e, "undecodable response");
                        file.failures.push(ItemFailure {
                            id: diagram_id,
                            error: e.to_string(),
                        });
                    }
                }
            }
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "malformed response line");
                file.failures.push(ItemFailure {
                    id: format!("line {line_no}"),
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::debug!(
        records = file.records.len(),
        failures = file.failures.len(),
        "parsed response file"
    );
    file
}

/// Load a response file.
pub fn load_response_file(path: &Path) -> Result<ResponseFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read response file: {}", path.display()))?;
    Ok(parse_responses_str(&content))
}

/// Render records in the endpoint's response line format.
pub fn responses_to_jsonl(records: &[ResponseRecord]) -> Result<String> {
    let mut out = String::new();
    for record in records {
        let content = serde_json::to_string(&record.response)
            .with_context(|| format!("failed to serialize response for {}", record.diagram_id))?;
        let line = ResponseLine {
            custom_id: format!("{CUSTOM_ID_PREFIX}{}", record.diagram_id),
            response: ResponseEnvelope {
                body: ResponseBody {
                    choices: vec![Choice {
                        message: Message {
                            content: Some(content),
                        },
                    }],
                    usage: record.usage,
                },
            },
        };
        out.push_str(&serde_json::to_string(&line)?);
        out.push('\n');
    }
    Ok(out)
}

/// Write records as a response file.
pub fn write_responses(path: &Path, records: &[ResponseRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let jsonl = responses_to_jsonl(records)?;
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(jsonl.as_bytes())
        .with_context(|| format!("failed to write responses to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use diagrameval_core::model::{CorrectPosition, Extraction, PositionCode, ResponseBox};

    const LINE: &str = r#"{"custom_id": "request-1_3A_Beton", "response": {"body": {"choices": [{"message": {"content": "{\"Box_1\": {\"Extraction\": \"good\", \"Position\": 1, \"Correct Position\": 1}, \"Box_2\": {\"Extraction\": \"commission\", \"Position\": 2, \"Correct Position\": \"unknown\"}, \"Box_3\": {\"Extraction\": \"commission\", \"Position\": 2, \"Correct Position\": 3}, \"Box_4\": {\"Extraction\": \"good\", \"Position\": 1, \"Correct Position\": 4}}"}}], "usage": {"prompt_tokens": 800, "completion_tokens": 90}}}}"#;

    #[test]
    fn decodes_nested_content() {
        let file = parse_responses_str(LINE);
        assert!(file.failures.is_empty());
        assert_eq!(file.records.len(), 1);
        let record = &file.records[0];
        assert_eq!(record.diagram_id, "1_3A_Beton");
        let box2 = record.response.get(2).unwrap();
        assert_eq!(box2.extraction, Extraction::Commission);
        assert_eq!(box2.correct_position, CorrectPosition::Unknown);
        assert_eq!(file.usage.prompt_tokens, 800);
        assert_eq!(file.usage.completion_tokens, 90);
    }

    #[test]
    fn bad_lines_become_failures() {
        let missing = r#"{"custom_id": "request-2_3A_Beton", "response": {"body": {"choices": [], "usage": {"prompt_tokens": 10, "completion_tokens": 0}}}}"#;
        let content = format!("{LINE}\nnot json\n{missing}\n");
        let file = parse_responses_str(&content);

        assert_eq!(file.records.len(), 1);
        assert_eq!(file.failures.len(), 2);
        assert_eq!(file.failures[0].id, "line 2");
        assert_eq!(file.failures[1].id, "2_3A_Beton");
        assert!(file.failures[1].error.contains("no message content"));
        assert_eq!(file.usage.prompt_tokens, 810);
    }

    #[test]
    fn written_file_reads_back() {
        let mut response = ModelResponse::default();
        for n in 1..=4 {
            response.set(
                n,
                ResponseBox {
                    extraction: Extraction::Good,
                    position: PositionCode::LinksSelf,
                    correct_position: CorrectPosition::Field(n),
                },
            );
        }
        let record = ResponseRecord {
            diagram_id: "5_1B_Suez".into(),
            response,
            usage: TokenUsage {
                prompt_tokens: 3,
                completion_tokens: 4,
            },
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        write_responses(&path, std::slice::from_ref(&record)).unwrap();
        let file = load_response_file(&path).unwrap();
        assert_eq!(file.records, vec![record]);
    }
}
