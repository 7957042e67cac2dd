//! Experiment settings and strategy classification.

use serde::{Deserialize, Serialize};

/// Example counts the strategy table knows about.
pub const SUPPORTED_EXAMPLE_COUNTS: [usize; 3] = [0, 5, 25];

/// One experimental configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentSetting {
    /// Unique name, also used in batch file names.
    pub name: String,
    /// System prompt file.
    pub prompt_id: String,
    /// Task instructions placed at the top of the user prompt.
    #[serde(default)]
    pub user_prompt_id: Option<String>,
    /// Trailing notes placed at the end of the user prompt.
    #[serde(default)]
    pub notes_id: Option<String>,
    /// Whether the reference diagram keeps its ground-truth boxes.
    pub truth_given: bool,
    /// Number of worked examples per request.
    pub example_count: usize,
    /// Response schema file.
    pub schema_id: String,
    /// Whether the schema asks the model to construct the diagram too.
    #[serde(default)]
    pub diagram_creation: bool,
}

impl ExperimentSetting {
    pub fn flags(&self) -> StrategyFlags {
        StrategyFlags {
            truth_given: self.truth_given,
            diagram_creation: self.diagram_creation,
            example_count: self.example_count,
        }
    }

    /// Strategy number S1 to S9, if the combination is in the table.
    pub fn strategy(&self) -> Option<u8> {
        self.flags().strategy()
    }
}

/// The three factors that define an experimental strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyFlags {
    pub truth_given: bool,
    pub diagram_creation: bool,
    pub example_count: usize,
}

impl StrategyFlags {
    /// Map the flags to strategy 1 to 9.
    ///
    /// | truth | creation | examples | strategy |
    /// |-------|----------|----------|----------|
    /// | no    | no       | 0/5/25   | 1/2/3    |
    /// | yes   | no       | 0/5/25   | 4/5/6    |
    /// | no    | yes      | 0/5/25   | 7/8/9    |
    pub fn strategy(&self) -> Option<u8> {
        let offset = SUPPORTED_EXAMPLE_COUNTS
            .iter()
            .position(|&n| n == self.example_count)? as u8;
        let base = match (self.truth_given, self.diagram_creation) {
            (false, false) => 1,
            (true, false) => 4,
            (false, true) => 7,
            (true, true) => return None,
        };
        Some(base + offset)
    }

    /// Inverse of [`StrategyFlags::strategy`].
    pub fn from_strategy(strategy: u8) -> Option<Self> {
        if !(1..=9).contains(&strategy) {
            return None;
        }
        let group = (strategy - 1) / 3;
        Some(Self {
            truth_given: group == 1,
            diagram_creation: group == 2,
            example_count: SUPPORTED_EXAMPLE_COUNTS[usize::from((strategy - 1) % 3)],
        })
    }
}

/// The nine settings of the original study.
pub fn builtin_settings() -> Vec<ExperimentSetting> {
    let mut settings = Vec::new();
    for diagram_creation in [false, true] {
        for truth_given in [false, true] {
            if diagram_creation && truth_given {
                continue;
            }
            for example_count in SUPPORTED_EXAMPLE_COUNTS {
                let truth = if truth_given { "wTruth" } else { "woTruth" };
                let mut name = format!("V1.1_{truth}_{example_count}Examples_allUserPrompt");
                let schema_id = if diagram_creation {
                    name.push_str("_wDiagramCreation");
                    "response_schema_v0.1_wDiagramCreation.json"
                } else {
                    "response_schema_v0.1.json"
                };
                settings.push(ExperimentSetting {
                    name,
                    prompt_id: "base_prompt.txt".into(),
                    user_prompt_id: Some(format!("prompt_v1.1_{truth}_allUserPrompt.txt")),
                    notes_id: Some("prompt_v1.1_woTruth_allUserPrompt_NOTES.txt".into()),
                    truth_given,
                    example_count,
                    schema_id: schema_id.into(),
                    diagram_creation,
                });
            }
        }
    }
    settings
}

/// A warning from settings validation.
#[derive(Debug, Clone)]
pub struct SettingWarning {
    pub setting: String,
    pub message: String,
}

/// Check a settings catalog for common issues.
pub fn validate_settings(settings: &[ExperimentSetting]) -> Vec<SettingWarning> {
    let mut warnings = Vec::new();

    let mut seen = std::collections::HashSet::new();
    for s in settings {
        if !seen.insert(&s.name) {
            warnings.push(SettingWarning {
                setting: s.name.clone(),
                message: format!("duplicate setting name: {}", s.name),
            });
        }
        if s.strategy().is_none() {
            warnings.push(SettingWarning {
                setting: s.name.clone(),
                message: format!(
                    "no strategy for truth_given={}, diagram_creation={}, examples={}",
                    s.truth_given, s.diagram_creation, s.example_count
                ),
            });
        }
        if s.name.contains(char::is_whitespace) {
            warnings.push(SettingWarning {
                setting: s.name.clone(),
                message: "setting name contains whitespace".into(),
            });
        }
    }

    warnings
}
