//! Evaluation request records and model-family dispatch.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Seed sent with every request.
pub const DEFAULT_REQUEST_SEED: u64 = 1_234_567;

/// Endpoint every request line targets.
pub const DEFAULT_ENDPOINT: &str = "/v1/chat/completions";

/// Prefix of `custom_id`; the rest is the diagram id.
pub const CUSTOM_ID_PREFIX: &str = "request-";

/// Recover the diagram id from a request or response `custom_id`.
pub fn diagram_id_from_custom_id(custom_id: &str) -> Option<&str> {
    custom_id
        .strip_prefix(CUSTOM_ID_PREFIX)
        .filter(|id| !id.is_empty())
}

/// Reasoning effort for reasoning-family models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

impl ReasoningEffort {
    /// Parse user input, falling back to `medium` on anything unrecognized.
    pub fn parse_or_default(input: &str) -> Self {
        input.parse().unwrap_or_else(|e| {
            tracing::warn!("{e}; using medium");
            ReasoningEffort::Medium
        })
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReasoningEffort::Low => write!(f, "low"),
            ReasoningEffort::Medium => write!(f, "medium"),
            ReasoningEffort::High => write!(f, "high"),
        }
    }
}

impl FromStr for ReasoningEffort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(ReasoningEffort::Low),
            "medium" => Ok(ReasoningEffort::Medium),
            "high" => Ok(ReasoningEffort::High),
            other => Err(format!("invalid reasoning effort '{other}'")),
        }
    }
}

/// How a model family takes its generation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    /// Fixed temperature 0, no effort parameter.
    #[default]
    Standard,
    /// Reasoning effort, no temperature.
    Reasoning,
}

/// Model name or name prefix → family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityTable {
    entries: BTreeMap<String, ModelFamily>,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        let entries = ["o1", "o3", "o4", "gpt-5"]
            .into_iter()
            .map(|prefix| (prefix.to_string(), ModelFamily::Reasoning))
            .collect();
        Self { entries }
    }
}

impl CapabilityTable {
    /// A table with no entries; every model is standard.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, family: ModelFamily) {
        self.entries.insert(name.into(), family);
    }

    /// Exact name first, then the longest matching prefix, else standard.
    pub fn family(&self, model: &str) -> ModelFamily {
        if let Some(family) = self.entries.get(model) {
            return *family;
        }
        self.entries
            .iter()
            .filter(|(prefix, _)| model.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, family)| *family)
            .unwrap_or_default()
    }

    pub fn is_reasoning(&self, model: &str) -> bool {
        self.family(model) == ModelFamily::Reasoning
    }
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Body of one request line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub seed: u64,
    pub response_format: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
}

/// One evaluation request, serialized as a single JSONL line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub custom_id: String,
    pub method: String,
    pub url: String,
    pub body: RequestBody,
}

impl EvaluationRequest {
    pub fn diagram_id(&self) -> Option<&str> {
        diagram_id_from_custom_id(&self.custom_id)
    }

    fn message(&self, role: &str) -> Option<&str> {
        self.body
            .messages
            .iter()
            .find(|m| m.role == role)
            .map(|m| m.content.as_str())
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.message("system")
    }

    pub fn user_prompt(&self) -> Option<&str> {
        self.message("user")
    }
}

/// Parts of the user prompt, in the order they are sent.
#[derive(Debug, Clone, Default)]
pub struct UserPromptSections<'a> {
    pub instructions: Option<&'a str>,
    pub original_text: &'a str,
    /// Rendered `# Input` block.
    pub input: &'a str,
    /// Rendered `# Examples` block; empty when the setting has none.
    pub examples: &'a str,
    pub notes: Option<&'a str>,
}

impl UserPromptSections<'_> {
    /// Join the non-empty sections with blank lines.
    pub fn assemble(&self) -> String {
        let original = if self.original_text.trim().is_empty() {
            String::new()
        } else {
            format!("# Original Text\n{}", self.original_text)
        };
        [
            self.instructions.unwrap_or(""),
            original.as_str(),
            self.input,
            self.examples,
            self.notes.unwrap_or(""),
        ]
        .into_iter()
        .map(str::trim_end)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
    }
}

/// Builds request lines with a fixed seed and endpoint.
#[derive(Debug, Clone)]
pub struct BatchRequestBuilder {
    pub seed: u64,
    pub endpoint: String,
    pub capabilities: CapabilityTable,
}

impl Default for BatchRequestBuilder {
    fn default() -> Self {
        Self {
            seed: DEFAULT_REQUEST_SEED,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            capabilities: CapabilityTable::default(),
        }
    }
}

impl BatchRequestBuilder {
    pub fn build(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema: &serde_json::Value,
        diagram_id: &str,
        model: &str,
        reasoning_effort: Option<ReasoningEffort>,
    ) -> EvaluationRequest {
        let (temperature, reasoning_effort) = match self.capabilities.family(model) {
            ModelFamily::Reasoning => (None, Some(reasoning_effort.unwrap_or_default())),
            ModelFamily::Standard => (Some(0.0), None),
        };

        EvaluationRequest {
            custom_id: format!("{CUSTOM_ID_PREFIX}{diagram_id}"),
            method: "POST".to_string(),
            url: self.endpoint.clone(),
            body: RequestBody {
                model: model.to_string(),
                messages: vec![
                    ChatMessage {
                        role: "system".to_string(),
                        content: system_prompt.to_string(),
                    },
                    ChatMessage {
                        role: "user".to_string(),
                        content: user_prompt.to_string(),
                    },
                ],
                seed: self.seed,
                response_format: schema.clone(),
                temperature,
                reasoning_effort,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> serde_json::Value {
        json!({"type": "json_schema", "json_schema": {"name": "diagram"}})
    }

    #[test]
    fn capability_lookup_prefers_longest_prefix() {
        let mut table = CapabilityTable::default();
        assert!(table.is_reasoning("o4-mini-2025-04-16"));
        assert!(table.is_reasoning("gpt-5-mini"));
        assert!(!table.is_reasoning("gpt-4o-2024-08-06"));

        table.insert("gpt-5-chat", ModelFamily::Standard);
        assert!(!table.is_reasoning("gpt-5-chat-latest"));
        assert!(table.is_reasoning("gpt-5-nano"));

        table.insert("gpt-4o-2024-08-06", ModelFamily::Reasoning);
        assert!(table.is_reasoning("gpt-4o-2024-08-06"));
        assert!(!table.is_reasoning("gpt-4o"));
    }

    #[test]
    fn standard_model_gets_temperature_only() {
        let builder = BatchRequestBuilder::default();
        let request = builder.build(
            "sys",
            "user",
            &schema(),
            "1_3A_Beton",
            "gpt-4o-2024-08-06",
            Some(ReasoningEffort::High),
        );
        assert_eq!(request.custom_id, "request-1_3A_Beton");
        assert_eq!(request.body.temperature, Some(0.0));
        assert_eq!(request.body.reasoning_effort, None);

        let value = serde_json::to_value(&request).unwrap();
        assert!(value["body"].get("reasoning_effort").is_none());
        assert_eq!(value["body"]["seed"], 1_234_567);
        assert_eq!(value["url"], "/v1/chat/completions");
    }

    #[test]
    fn reasoning_model_gets_effort_and_no_temperature() {
        let builder = BatchRequestBuilder::default();
        let request = builder.build("sys", "user", &schema(), "1_3A_Beton", "o4-mini", None);
        assert_eq!(request.body.temperature, None);
        assert_eq!(request.body.reasoning_effort, Some(ReasoningEffort::Medium));

        let value = serde_json::to_value(&request).unwrap();
        assert!(value["body"].get("temperature").is_none());
        assert_eq!(value["body"]["reasoning_effort"], "medium");
    }

    #[test]
    fn request_survives_serialization() {
        let builder = BatchRequestBuilder::default();
        let request = builder.build(
            "You code diagrams.",
            "# Original Text\nConcrete",
            &schema(),
            "12_3A_Beton",
            "gpt-5",
            Some(ReasoningEffort::Low),
        );
        let line = serde_json::to_string(&request).unwrap();
        let back: EvaluationRequest = serde_json::from_str(&line).unwrap();
        assert_eq!(back, request);
        assert_eq!(back.body.model, "gpt-5");
        assert_eq!(back.body.seed, DEFAULT_REQUEST_SEED);
        assert_eq!(back.system_prompt(), Some("You code diagrams."));
        assert_eq!(back.user_prompt(), Some("# Original Text\nConcrete"));
        assert_eq!(back.diagram_id(), Some("12_3A_Beton"));
    }

    #[test]
    fn effort_falls_back_to_medium() {
        assert_eq!(ReasoningEffort::parse_or_default("HIGH"), ReasoningEffort::High);
        assert_eq!(ReasoningEffort::parse_or_default("extreme"), ReasoningEffort::Medium);
    }

    #[test]
    fn user_prompt_sections_in_order() {
        let sections = UserPromptSections {
            instructions: Some("Code each box."),
            original_text: "Concrete",
            input: "# Input\n{}",
            examples: "",
            notes: Some("Notes:\n- be strict\n"),
        };
        assert_eq!(
            sections.assemble(),
            "Code each box.\n\n# Original Text\nConcrete\n\n# Input\n{}\n\nNotes:\n- be strict"
        );

        let bare = UserPromptSections {
            original_text: "Concrete",
            input: "# Input\n{}",
            ..Default::default()
        };
        assert_eq!(bare.assemble(), "# Original Text\nConcrete\n\n# Input\n{}");
    }

    #[test]
    fn blank_original_text_drops_its_header() {
        let sections = UserPromptSections {
            instructions: Some("Code each box."),
            original_text: "  \n",
            input: "# Input\n{}",
            ..Default::default()
        };
        let prompt = sections.assemble();
        assert!(!prompt.contains("# Original Text"));
        assert_eq!(prompt, "Code each box.\n\n# Input\n{}");
    }

    #[test]
    fn custom_id_parsing() {
        assert_eq!(diagram_id_from_custom_id("request-1_3A_Beton"), Some("1_3A_Beton"));
        assert_eq!(diagram_id_from_custom_id("request-"), None);
        assert_eq!(diagram_id_from_custom_id("1_3A_Beton"), None);
    }
}
