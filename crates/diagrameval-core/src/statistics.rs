//! Agreement metrics and descriptive dataset statistics.
//!
//! Metrics follow the usual definitions over a 2×2 confusion matrix. Every
//! ratio with a zero denominator resolves to 0, so empty dimensions produce
//! an all-zero summary instead of NaN.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::align::ComparisonRow;
use crate::confusion::ConfusionCounts;
use crate::model::{Code, RawRow};
use crate::store::StoreOptions;

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Accuracy, precision, recall, F1 and Cohen's kappa for one dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AgreementMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub kappa: f64,
}

impl AgreementMetrics {
    pub fn compute(counts: &ConfusionCounts) -> Self {
        let tp = counts.true_positive as f64;
        let fn_ = counts.false_negative as f64;
        let fp = counts.false_positive as f64;
        let tn = counts.true_negative as f64;
        let n = counts.total() as f64;

        let accuracy = ratio(tp + tn, n);
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = ratio(2.0 * precision * recall, precision + recall);

        // Expected agreement from the two raters' marginals.
        let p_yes = ratio(tp + fn_, n) * ratio(tp + fp, n);
        let p_no = ratio(fp + tn, n) * ratio(fn_ + tn, n);
        let p_e = p_yes + p_no;
        let kappa = ratio(accuracy - p_e, 1.0 - p_e);

        Self {
            accuracy,
            precision,
            recall,
            f1,
            kappa,
        }
    }
}

/// Counts and metrics of one scoring dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionSummary {
    pub counts: ConfusionCounts,
    pub metrics: AgreementMetrics,
}

impl DimensionSummary {
    pub fn from_counts(counts: ConfusionCounts) -> Self {
        Self {
            counts,
            metrics: AgreementMetrics::compute(&counts),
        }
    }

    /// Extraction summary over every row.
    pub fn extraction(rows: &[ComparisonRow]) -> Self {
        Self::from_counts(ConfusionCounts::tally(
            rows.iter().map(|r| r.extraction_label),
        ))
    }

    /// Position summary over the rows in Position scope.
    pub fn position(rows: &[ComparisonRow]) -> Self {
        Self::from_counts(ConfusionCounts::tally(
            rows.iter().filter_map(|r| r.position_code_label),
        ))
    }
}

/// Round for presentation only.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Line, diagram and participant counts for one slice of the data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsetCounts {
    pub lines: usize,
    pub diagrams: usize,
    pub participants: usize,
}

impl SubsetCounts {
    fn from_rows<'a>(rows: impl IntoIterator<Item = &'a RawRow>) -> Self {
        let mut lines = 0;
        let mut diagrams = BTreeSet::new();
        let mut participants = BTreeSet::new();
        for row in rows {
            lines += 1;
            diagrams.insert(row.diagram_id());
            participants.insert(row.participant_id());
        }
        Self {
            lines,
            diagrams: diagrams.len(),
            participants: participants.len(),
        }
    }
}

/// Answer length in words.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WordStats {
    pub min: usize,
    pub max: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub sd: f64,
}

impl WordStats {
    pub fn from_lengths(lengths: &[usize]) -> Option<Self> {
        let min = *lengths.iter().min()?;
        let max = *lengths.iter().max()?;
        let n = lengths.len() as f64;
        let mean = lengths.iter().sum::<usize>() as f64 / n;
        let variance = lengths
            .iter()
            .map(|&l| (l as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        Some(Self {
            min,
            max,
            mean,
            sd: variance.sqrt(),
        })
    }
}

/// Good/commission balance for one text, or `"All"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBalance {
    pub text_name: String,
    pub good: usize,
    pub commission: usize,
}

impl CodeBalance {
    pub fn good_pct(&self) -> f64 {
        ratio(self.good as f64 * 100.0, (self.good + self.commission) as f64)
    }

    pub fn commission_pct(&self) -> f64 {
        ratio(
            self.commission as f64 * 100.0,
            (self.good + self.commission) as f64,
        )
    }
}

/// Descriptive overview of a loaded dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub target_dataset: String,
    /// Rows of the target dataset, any code.
    pub unfiltered: SubsetCounts,
    /// Rows of the target dataset coded good or commission.
    pub filtered: SubsetCounts,
    pub answer_words: Option<WordStats>,
    /// `"All"` first, then one entry per text in name order.
    pub code_balance: Vec<CodeBalance>,
}

impl DatasetSummary {
    pub fn from_rows(rows: &[RawRow], options: &StoreOptions) -> Self {
        let in_dataset: Vec<&RawRow> = rows
            .iter()
            .filter(|r| r.dataset == options.target_dataset)
            .collect();
        let coded: Vec<(&RawRow, Code)> = in_dataset
            .iter()
            .filter_map(|r| r.code.parse::<Code>().ok().map(|c| (*r, c)))
            .collect();

        let lengths: Vec<usize> = coded
            .iter()
            .map(|(r, _)| r.text.split_whitespace().count())
            .collect();

        let mut all = CodeBalance {
            text_name: "All".into(),
            good: 0,
            commission: 0,
        };
        let mut per_text: BTreeMap<&str, CodeBalance> = BTreeMap::new();
        for (row, code) in &coded {
            let entry = per_text
                .entry(row.text_name.as_str())
                .or_insert_with(|| CodeBalance {
                    text_name: row.text_name.clone(),
                    good: 0,
                    commission: 0,
                });
            for balance in [&mut all, entry] {
                match code {
                    Code::Good => balance.good += 1,
                    Code::Commission => balance.commission += 1,
                }
            }
        }

        let mut code_balance = vec![all];
        code_balance.extend(per_text.into_values());

        Self {
            target_dataset: options.target_dataset.clone(),
            unfiltered: SubsetCounts::from_rows(in_dataset.iter().copied()),
            filtered: SubsetCounts::from_rows(coded.iter().map(|(r, _)| *r)),
            answer_words: WordStats::from_lengths(&lengths),
            code_balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{full_diagram_rows, row};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn worked_example_metrics() {
        let m = AgreementMetrics::compute(&ConfusionCounts::new(2, 1, 0, 1));
        assert!(close(m.accuracy, 0.75));
        assert!(close(m.precision, 1.0));
        assert!(close(m.recall, 2.0 / 3.0));
        assert!(close(m.f1, 0.8));
        // p_e = 0.75 * 0.5 + 0.25 * 0.5 = 0.5
        assert!(close(m.kappa, 0.5));
    }

    #[test]
    fn empty_counts_are_all_zero() {
        let m = AgreementMetrics::compute(&ConfusionCounts::default());
        assert_eq!(m, AgreementMetrics::default());
    }

    #[test]
    fn perfect_agreement_with_both_classes_is_kappa_one() {
        let m = AgreementMetrics::compute(&ConfusionCounts::new(7, 0, 0, 3));
        assert_eq!(m.kappa, 1.0);
        assert_eq!(m.accuracy, 1.0);
    }

    #[test]
    fn single_class_agreement_has_zero_kappa() {
        let m = AgreementMetrics::compute(&ConfusionCounts::new(5, 0, 0, 0));
        assert_eq!(m.kappa, 0.0);
        assert_eq!(m.accuracy, 1.0);
        let m = AgreementMetrics::compute(&ConfusionCounts::new(0, 0, 0, 4));
        assert_eq!(m.kappa, 0.0);
        assert_eq!(m.precision, 0.0);
    }

    #[test]
    fn metrics_stay_in_range_for_small_matrices() {
        for tp in 0..6 {
            for fn_ in 0..6 {
                for fp in 0..6 {
                    for tn in 0..6 {
                        let counts = ConfusionCounts::new(tp, fn_, fp, tn);
                        let m = AgreementMetrics::compute(&counts);
                        for v in [m.accuracy, m.precision, m.recall, m.f1] {
                            assert!((0.0..=1.0).contains(&v), "{counts:?} -> {m:?}");
                        }
                        assert!(m.kappa <= 1.0 + 1e-12, "{counts:?} -> {m:?}");
                        assert!(m.kappa.is_finite());
                        if fn_ == 0 && fp == 0 && tp > 0 && tn > 0 {
                            assert!(close(m.kappa, 1.0));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn rounding_is_presentation_only() {
        assert_eq!(round_to(2.0 / 3.0, 3), 0.667);
        assert_eq!(round_to(0.12346, 4), 0.1235);
    }

    #[test]
    fn word_stats_population_sd() {
        let stats = WordStats::from_lengths(&[2, 4, 4, 4, 5, 5, 7, 9]).unwrap();
        assert_eq!(stats.min, 2);
        assert_eq!(stats.max, 9);
        assert!(close(stats.mean, 5.0));
        assert!(close(stats.sd, 2.0));
        assert!(WordStats::from_lengths(&[]).is_none());
    }

    #[test]
    fn dataset_summary_counts_slices() {
        let mut rows = full_diagram_rows("1", "Beton");
        rows.extend(full_diagram_rows("1", "Suez"));
        rows.push(row("2", "Beton", 1, None, "o"));
        let mut pilot = row("3", "Beton", 1, Some(1), "good");
        pilot.dataset = "pilot".into();
        rows.push(pilot);

        let summary = DatasetSummary::from_rows(&rows, &StoreOptions::default());
        assert_eq!(
            summary.unfiltered,
            SubsetCounts {
                lines: 9,
                diagrams: 3,
                participants: 2
            }
        );
        assert_eq!(
            summary.filtered,
            SubsetCounts {
                lines: 8,
                diagrams: 2,
                participants: 1
            }
        );
        assert_eq!(summary.code_balance[0].text_name, "All");
        assert_eq!(summary.code_balance[0].good, 6);
        assert_eq!(summary.code_balance[0].commission, 2);
        assert!(close(summary.code_balance[0].good_pct(), 75.0));
        assert_eq!(summary.code_balance[1].text_name, "Beton");
        assert_eq!(summary.code_balance.len(), 3);
        // "answer 1 2" style texts are three words long.
        assert_eq!(summary.answer_words.unwrap().max, 3);
    }
}
