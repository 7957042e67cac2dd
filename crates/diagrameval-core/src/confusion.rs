//! Confusion-matrix classification for the two scoring dimensions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ScoringError;
use crate::model::{Code, Extraction, PositionCode};

/// Outcome of one (ground truth, prediction) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfusionLabel {
    TP,
    FN,
    FP,
    TN,
}

impl ConfusionLabel {
    pub fn is_agreement(self) -> bool {
        matches!(self, ConfusionLabel::TP | ConfusionLabel::TN)
    }
}

impl fmt::Display for ConfusionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfusionLabel::TP => "TP",
            ConfusionLabel::FN => "FN",
            ConfusionLabel::FP => "FP",
            ConfusionLabel::TN => "TN",
        };
        f.write_str(s)
    }
}

/// Classify a pair against a positive and a negative label.
///
/// Returns `None` when either value is neither label.
pub fn classify<T: PartialEq>(
    ground_truth: &T,
    predicted: &T,
    positive: &T,
    negative: &T,
) -> Option<ConfusionLabel> {
    let gt_positive = if ground_truth == positive {
        true
    } else if ground_truth == negative {
        false
    } else {
        return None;
    };
    let pred_positive = if predicted == positive {
        true
    } else if predicted == negative {
        false
    } else {
        return None;
    };

    Some(match (gt_positive, pred_positive) {
        (true, true) => ConfusionLabel::TP,
        (true, false) => ConfusionLabel::FN,
        (false, true) => ConfusionLabel::FP,
        (false, false) => ConfusionLabel::TN,
    })
}

/// A scoring dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    /// Content: good (positive) vs commission (negative).
    Extraction,
    /// Structure: links to itself (positive) vs elsewhere (negative).
    Position,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Extraction => write!(f, "Extraction"),
            Dimension::Position => write!(f, "Position"),
        }
    }
}

fn unclassifiable(
    diagram_id: &str,
    dimension: Dimension,
    ground_truth: impl fmt::Display,
    predicted: impl fmt::Display,
) -> ScoringError {
    ScoringError::UnclassifiableRow {
        diagram_id: diagram_id.to_string(),
        dimension: dimension.to_string(),
        ground_truth: ground_truth.to_string(),
        predicted: predicted.to_string(),
    }
}

/// Label an Extraction pair.
pub fn classify_extraction(
    diagram_id: &str,
    human: Code,
    model: Extraction,
) -> Result<ConfusionLabel, ScoringError> {
    classify(
        &Extraction::from(human),
        &model,
        &Extraction::Good,
        &Extraction::Commission,
    )
    .ok_or_else(|| unclassifiable(diagram_id, Dimension::Extraction, human, model))
}

/// Label a Position pair.
pub fn classify_position(
    diagram_id: &str,
    human: PositionCode,
    model: PositionCode,
) -> Result<ConfusionLabel, ScoringError> {
    classify(
        &human,
        &model,
        &PositionCode::LinksSelf,
        &PositionCode::LinksElsewhere,
    )
    .ok_or_else(|| unclassifiable(diagram_id, Dimension::Position, human, model))
}

/// `{TP, FN, FP, TN}` for one dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    #[serde(rename = "TP")]
    pub true_positive: u64,
    #[serde(rename = "FN")]
    pub false_negative: u64,
    #[serde(rename = "FP")]
    pub false_positive: u64,
    #[serde(rename = "TN")]
    pub true_negative: u64,
}

impl ConfusionCounts {
    pub fn new(tp: u64, fn_: u64, fp: u64, tn: u64) -> Self {
        Self {
            true_positive: tp,
            false_negative: fn_,
            false_positive: fp,
            true_negative: tn,
        }
    }

    pub fn tally(labels: impl IntoIterator<Item = ConfusionLabel>) -> Self {
        let mut counts = Self::default();
        for label in labels {
            counts.add(label);
        }
        counts
    }

    pub fn add(&mut self, label: ConfusionLabel) {
        match label {
            ConfusionLabel::TP => self.true_positive += 1,
            ConfusionLabel::FN => self.false_negative += 1,
            ConfusionLabel::FP => self.false_positive += 1,
            ConfusionLabel::TN => self.true_negative += 1,
        }
    }

    pub fn merge(&mut self, other: &ConfusionCounts) {
        self.true_positive += other.true_positive;
        self.false_negative += other.false_negative;
        self.false_positive += other.false_positive;
        self.true_negative += other.true_negative;
    }

    pub fn total(&self) -> u64 {
        self.true_positive + self.false_negative + self.false_positive + self.true_negative
    }
}
