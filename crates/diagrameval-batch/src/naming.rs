//! Batch file names and the strategy metadata encoded in them.
//!
//! Batch files are named `{YYYY-mm-dd}_{setting}_{model}_n{n}.jsonl`. Setting
//! names contain underscores, model names do not, so the name is split from
//! both ends.

use std::fmt;

use chrono::NaiveDate;

use diagrameval_core::setting::StrategyFlags;

use crate::error::BatchError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Identity of one batch: when it was prepared, for which setting and model,
/// over how many diagrams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDescriptor {
    pub date: NaiveDate,
    pub setting: String,
    pub model: String,
    pub n: usize,
}

impl BatchDescriptor {
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}_{}_n{}",
            self.date.format(DATE_FORMAT),
            self.setting,
            self.model,
            self.n
        )
    }

    pub fn file_name(&self) -> String {
        format!("{}.jsonl", self.file_stem())
    }

    /// Parse a file name (with or without directory and extension).
    pub fn parse(name: &str) -> Result<Self, BatchError> {
        let invalid = |reason: &str| BatchError::InvalidFileName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
        let stem = base.strip_suffix(".jsonl").unwrap_or(base);

        let (rest, n_part) = stem
            .rsplit_once('_')
            .ok_or_else(|| invalid("missing diagram count"))?;
        let n = n_part
            .strip_prefix('n')
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| invalid("last segment must be n{count}"))?;

        let (rest, model) = rest
            .rsplit_once('_')
            .ok_or_else(|| invalid("missing model segment"))?;
        let (date, setting) = rest
            .split_once('_')
            .ok_or_else(|| invalid("missing setting segment"))?;
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|e| invalid(&format!("bad date '{date}': {e}")))?;

        if model.is_empty() || setting.is_empty() {
            return Err(invalid("empty setting or model"));
        }

        Ok(Self {
            date,
            setting: setting.to_string(),
            model: model.to_string(),
            n,
        })
    }

    pub fn strategy_flags(&self) -> Option<StrategyFlags> {
        parse_strategy_flags(&self.setting)
    }
}

impl fmt::Display for BatchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_stem())
    }
}

/// Recover strategy flags from the segments of a setting or file name.
///
/// Needs a `wTruth`/`woTruth` segment and an `{N}Examples` segment; a
/// `wDiagramCreation` segment marks the creation variant.
pub fn parse_strategy_flags(name: &str) -> Option<StrategyFlags> {
    let mut truth_given = None;
    let mut example_count = None;
    let mut diagram_creation = false;

    for segment in name.split(['_', '.', '/']) {
        match segment {
            "wTruth" => truth_given = Some(true),
            "woTruth" => truth_given = Some(false),
            "wDiagramCreation" => diagram_creation = true,
            s => {
                if let Some(n) = s.strip_suffix("Examples").and_then(|n| n.parse().ok()) {
                    example_count = Some(n);
                }
            }
        }
    }

    Some(StrategyFlags {
        truth_given: truth_given?,
        diagram_creation,
        example_count: example_count?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> BatchDescriptor {
        BatchDescriptor {
            date: NaiveDate::from_ymd_opt(2025, 9, 14).unwrap(),
            setting: "V1.1_wTruth_5Examples_allUserPrompt".into(),
            model: "gpt-5-mini".into(),
            n: 120,
        }
    }

    #[test]
    fn file_name_layout() {
        assert_eq!(
            descriptor().file_name(),
            "2025-09-14_V1.1_wTruth_5Examples_allUserPrompt_gpt-5-mini_n120.jsonl"
        );
    }

    #[test]
    fn parse_inverts_file_name() {
        let d = descriptor();
        let path = format!("batches/{}", d.file_name());
        assert_eq!(BatchDescriptor::parse(&path).unwrap(), d);
        assert_eq!(BatchDescriptor::parse(&d.file_stem()).unwrap(), d);
    }

    #[test]
    fn parse_rejects_bad_names() {
        for name in [
            "results.jsonl",
            "2025-09-14_setting_gpt-5_120.jsonl",
            "yesterday_setting_gpt-5_n3.jsonl",
            "2025-09-14_gpt-5_n3.jsonl",
        ] {
            assert!(
                matches!(
                    BatchDescriptor::parse(name),
                    Err(BatchError::InvalidFileName { .. })
                ),
                "{name} should not parse"
            );
        }
    }

    #[test]
    fn strategy_from_setting_name() {
        let flags = descriptor().strategy_flags().unwrap();
        assert!(flags.truth_given);
        assert!(!flags.diagram_creation);
        assert_eq!(flags.example_count, 5);
        assert_eq!(flags.strategy(), Some(5));

        let flags =
            parse_strategy_flags("V1.1_woTruth_25Examples_allUserPrompt_wDiagramCreation").unwrap();
        assert_eq!(flags.strategy(), Some(9));

        assert_eq!(parse_strategy_flags("custom_setting"), None);
    }
}
