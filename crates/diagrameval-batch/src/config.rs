//! Project configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use diagrameval_core::cost::{ModelPrice, PriceTable};
use diagrameval_core::engine::EngineConfig;
use diagrameval_core::parser::SettingEntry;
use diagrameval_core::request::{
    BatchRequestBuilder, CapabilityTable, ModelFamily, DEFAULT_ENDPOINT, DEFAULT_REQUEST_SEED,
};
use diagrameval_core::setting::{builtin_settings, ExperimentSetting};
use diagrameval_core::store::{GroupingPolicy, StoreOptions};

/// Per-model overrides. Prices are per 1,000,000 tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub reasoning: Option<bool>,
    #[serde(default)]
    pub input_cost: Option<f64>,
    #[serde(default)]
    pub output_cost: Option<f64>,
}

/// Top-level diagrameval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramEvalConfig {
    /// Coded rows (JSON array or JSONL).
    #[serde(default = "default_rows")]
    pub rows: PathBuf,
    /// Reference templates keyed by text name.
    #[serde(default = "default_templates")]
    pub templates: PathBuf,
    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: PathBuf,
    #[serde(default = "default_schemas_dir")]
    pub schemas_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Only rows of this dataset are grouped into diagrams.
    #[serde(default = "default_target_dataset")]
    pub target_dataset: String,
    /// Global seed for diagram selection and example sampling.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Seed written into every request body.
    #[serde(default = "default_request_seed")]
    pub request_seed: u64,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Max concurrent diagram tasks.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Reject diagrams that do not have all four fields.
    #[serde(default = "default_true")]
    pub require_complete_diagrams: bool,
    #[serde(default)]
    pub models: BTreeMap<String, ModelConfig>,
    /// Settings catalog; the built-in nine when empty.
    #[serde(default)]
    pub settings: Vec<SettingEntry>,
}

fn default_rows() -> PathBuf {
    PathBuf::from("data/rows.json")
}
fn default_templates() -> PathBuf {
    PathBuf::from("data/templates.json")
}
fn default_prompts_dir() -> PathBuf {
    PathBuf::from("prompts")
}
fn default_schemas_dir() -> PathBuf {
    PathBuf::from("schemas")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./diagrameval-results")
}
fn default_target_dataset() -> String {
    "target".to_string()
}
fn default_seed() -> u64 {
    42
}
fn default_request_seed() -> u64 {
    DEFAULT_REQUEST_SEED
}
fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_parallelism() -> usize {
    4
}
fn default_true() -> bool {
    true
}

impl Default for DiagramEvalConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            templates: default_templates(),
            prompts_dir: default_prompts_dir(),
            schemas_dir: default_schemas_dir(),
            output_dir: default_output_dir(),
            target_dataset: default_target_dataset(),
            seed: default_seed(),
            request_seed: default_request_seed(),
            endpoint: default_endpoint(),
            parallelism: default_parallelism(),
            require_complete_diagrams: true,
            models: BTreeMap::new(),
            settings: Vec::new(),
        }
    }
}

impl DiagramEvalConfig {
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            target_dataset: self.target_dataset.clone(),
            policy: if self.require_complete_diagrams {
                GroupingPolicy::Strict
            } else {
                GroupingPolicy::Lenient
            },
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            parallelism: self.parallelism.max(1),
        }
    }

    /// Default capability table plus `[models.*] reasoning` overrides.
    pub fn capability_table(&self) -> CapabilityTable {
        let mut table = CapabilityTable::default();
        for (name, model) in &self.models {
            if let Some(reasoning) = model.reasoning {
                let family = if reasoning {
                    ModelFamily::Reasoning
                } else {
                    ModelFamily::Standard
                };
                table.insert(name.clone(), family);
            }
        }
        table
    }

    /// Default price table plus `[models.*]` prices.
    ///
    /// A model with only one of the two prices keeps the default for the
    /// other, or 0 when it has no default.
    pub fn price_table(&self) -> PriceTable {
        let mut table = PriceTable::default();
        for (name, model) in &self.models {
            if model.input_cost.is_none() && model.output_cost.is_none() {
                continue;
            }
            let base = table
                .get(name)
                .copied()
                .unwrap_or(ModelPrice { input: 0.0, output: 0.0 });
            table.insert(
                name.clone(),
                ModelPrice {
                    input: model.input_cost.unwrap_or(base.input),
                    output: model.output_cost.unwrap_or(base.output),
                },
            );
        }
        table
    }

    pub fn request_builder(&self) -> BatchRequestBuilder {
        BatchRequestBuilder {
            seed: self.request_seed,
            endpoint: self.endpoint.clone(),
            capabilities: self.capability_table(),
        }
    }

    /// Configured settings, or the built-in catalog when none are configured.
    pub fn settings(&self) -> Vec<ExperimentSetting> {
        if self.settings.is_empty() {
            builtin_settings()
        } else {
            self.settings.iter().cloned().map(Into::into).collect()
        }
    }

    pub fn find_setting(&self, name: &str) -> Option<ExperimentSetting> {
        self.settings().into_iter().find(|s| s.name == name)
    }

    /// Resolve relative paths against `base` (the config file's directory).
    fn rebase(&mut self, base: &Path) {
        for path in [
            &mut self.rows,
            &mut self.templates,
            &mut self.prompts_dir,
            &mut self.schemas_dir,
            &mut self.output_dir,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    fn resolve_env(&mut self) {
        for path in [
            &mut self.rows,
            &mut self.templates,
            &mut self.prompts_dir,
            &mut self.schemas_dir,
            &mut self.output_dir,
        ] {
            let resolved = resolve_env_vars(&path.to_string_lossy());
            *path = PathBuf::from(resolved);
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Parse a config body. Relative paths are resolved against `base`.
pub fn parse_config_str(content: &str, base: &Path) -> Result<DiagramEvalConfig> {
    let mut config: DiagramEvalConfig =
        toml::from_str(content).context("failed to parse config TOML")?;
    config.resolve_env();
    config.rebase(base);
    Ok(config)
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `diagrameval.toml` in the current directory
/// 2. `~/.config/diagrameval/config.toml`
///
/// Environment variable override: `DIAGRAMEVAL_SEED`.
pub fn load_config() -> Result<DiagramEvalConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<DiagramEvalConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("diagrameval.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let base = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            tracing::debug!(path = %path.display(), "loaded config");
            parse_config_str(&content, &base)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => DiagramEvalConfig::default(),
    };

    if let Ok(seed) = std::env::var("DIAGRAMEVAL_SEED") {
        config.seed = seed
            .trim()
            .parse()
            .with_context(|| format!("DIAGRAMEVAL_SEED is not an integer: {seed}"))?;
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("diagrameval"))
}

/// Starter config written by `diagrameval init`.
pub const STARTER_CONFIG: &str = r#"# diagrameval configuration

rows = "data/rows.json"
templates = "data/templates.json"
prompts_dir = "prompts"
schemas_dir = "schemas"
output_dir = "diagrameval-results"

target_dataset = "target"
seed = 42
request_seed = 1234567
parallelism = 4
require_complete_diagrams = true

# Extra models or price overrides, per 1,000,000 tokens.
# [models."gpt-4.1"]
# reasoning = false
# input_cost = 1.0
# output_cost = 4.0

# Leave [[settings]] out to use the nine built-in settings.
# [[settings]]
# name = "V1.1_wTruth_5Examples_allUserPrompt"
# prompt = "base_prompt.txt"
# user_prompt = "prompt_v1.1_wTruth_allUserPrompt.txt"
# notes = "prompt_v1.1_woTruth_allUserPrompt_NOTES.txt"
# truth = true
# examples = 5
# schema = "response_schema_v0.1.json"
"#;
