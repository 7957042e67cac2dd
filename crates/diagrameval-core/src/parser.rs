//! Input loaders: coded rows, reference templates, prompts, schemas and
//! settings catalogs.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{RawRow, ReferenceTemplate};
use crate::setting::ExperimentSetting;

/// Load coded rows from a JSON array or JSONL file.
pub fn load_rows(path: &Path) -> Result<Vec<RawRow>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read rows file: {}", path.display()))?;

    parse_rows_str(&content, path)
}

/// Parse rows from a string (useful for testing).
pub fn parse_rows_str(content: &str, source_path: &Path) -> Result<Vec<RawRow>> {
    if content.trim_start().starts_with('[') {
        return serde_json::from_str(content)
            .with_context(|| format!("failed to parse rows JSON: {}", source_path.display()));
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| {
                format!("failed to parse row at {}:{}", source_path.display(), i + 1)
            })
        })
        .collect()
}

/// Load reference templates keyed by text name.
pub fn load_templates(path: &Path) -> Result<BTreeMap<String, ReferenceTemplate>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read templates file: {}", path.display()))?;

    parse_templates_str(&content, path)
}

/// Parse reference templates from a string (useful for testing).
pub fn parse_templates_str(
    content: &str,
    source_path: &Path,
) -> Result<BTreeMap<String, ReferenceTemplate>> {
    serde_json::from_str(content)
        .with_context(|| format!("failed to parse templates JSON: {}", source_path.display()))
}

/// Read a prompt text file from `dir`.
pub fn load_prompt(dir: &Path, id: &str) -> Result<String> {
    let path = dir.join(id);
    std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read prompt: {}", path.display()))
}

/// Read a response schema from `dir`.
pub fn load_schema(dir: &Path, id: &str) -> Result<serde_json::Value> {
    let path = dir.join(id);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read schema: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse schema JSON: {}", path.display()))
}

#[derive(Debug, Deserialize)]
struct TomlSettingsFile {
    #[serde(default)]
    settings: Vec<SettingEntry>,
}

/// One `[[settings]]` table as written in TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingEntry {
    pub name: String,
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default)]
    pub user_prompt: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub truth: bool,
    #[serde(default)]
    pub examples: usize,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default)]
    pub diagram_creation: bool,
}

fn default_prompt() -> String {
    "base_prompt.txt".to_string()
}

fn default_schema() -> String {
    "response_schema_v0.1.json".to_string()
}

impl From<SettingEntry> for ExperimentSetting {
    fn from(entry: SettingEntry) -> Self {
        ExperimentSetting {
            name: entry.name,
            prompt_id: entry.prompt,
            user_prompt_id: entry.user_prompt,
            notes_id: entry.notes,
            truth_given: entry.truth,
            example_count: entry.examples,
            schema_id: entry.schema,
            diagram_creation: entry.diagram_creation,
        }
    }
}

impl From<&ExperimentSetting> for SettingEntry {
    fn from(setting: &ExperimentSetting) -> Self {
        SettingEntry {
            name: setting.name.clone(),
            prompt: setting.prompt_id.clone(),
            user_prompt: setting.user_prompt_id.clone(),
            notes: setting.notes_id.clone(),
            truth: setting.truth_given,
            examples: setting.example_count,
            schema: setting.schema_id.clone(),
            diagram_creation: setting.diagram_creation,
        }
    }
}

/// Parse a settings catalog with `[[settings]]` tables.
pub fn parse_settings_str(content: &str, source_path: &Path) -> Result<Vec<ExperimentSetting>> {
    let parsed: TomlSettingsFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;
    Ok(parsed.settings.into_iter().map(Into::into).collect())
}

/// Load a settings catalog from a TOML file.
pub fn load_settings(path: &Path) -> Result<Vec<ExperimentSetting>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file: {}", path.display()))?;

    parse_settings_str(&content, path)
}
