//! Scoring report types with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::align::ComparisonRow;
use crate::cost::CostBreakdown;
use crate::engine::{ItemFailure, ScoredBatch};
use crate::statistics::{round_to, DimensionSummary};

/// Decimal places for metrics and costs.
pub const METRIC_DECIMALS: i32 = 3;
/// Decimal places for the per-diagram cost.
pub const PER_DIAGRAM_DECIMALS: i32 = 4;

/// What a report was computed from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSource {
    /// Response file name.
    pub file: String,
    pub setting: Option<String>,
    pub model: String,
    /// Strategy number 1 to 9, when the setting is known.
    pub strategy: Option<u8>,
}

/// Scores for one response file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub source: ReportSource,
    /// Diagrams the batch was sent for.
    pub n_diagrams: usize,
    pub scored_diagrams: usize,
    pub extraction: DimensionSummary,
    pub position: DimensionSummary,
    pub cost: Option<CostBreakdown>,
    pub rows: Vec<ComparisonRow>,
    pub failures: Vec<ItemFailure>,
}

/// One line of the measures table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureRow {
    pub measure: String,
    pub value: String,
}

impl MeasureRow {
    fn new(measure: &str, value: impl ToString) -> Self {
        Self {
            measure: measure.to_string(),
            value: value.to_string(),
        }
    }

    fn heading(title: &str) -> Self {
        Self::new(title, "")
    }
}

fn dimension_rows(title: &str, summary: &DimensionSummary) -> Vec<MeasureRow> {
    let m = &summary.metrics;
    let c = &summary.counts;
    vec![
        MeasureRow::heading(title),
        MeasureRow::new("Accuracy", round_to(m.accuracy, METRIC_DECIMALS)),
        MeasureRow::new("F1", round_to(m.f1, METRIC_DECIMALS)),
        MeasureRow::new("Precision", round_to(m.precision, METRIC_DECIMALS)),
        MeasureRow::new("Recall", round_to(m.recall, METRIC_DECIMALS)),
        MeasureRow::new("Kappa", round_to(m.kappa, METRIC_DECIMALS)),
        MeasureRow::new("TP", c.true_positive),
        MeasureRow::new("FN", c.false_negative),
        MeasureRow::new("FP", c.false_positive),
        MeasureRow::new("TN", c.true_negative),
    ]
}

impl ScoringReport {
    pub fn new(
        source: ReportSource,
        n_diagrams: usize,
        scored: ScoredBatch,
        cost: Option<CostBreakdown>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            source,
            n_diagrams,
            scored_diagrams: scored.scored_diagrams,
            extraction: DimensionSummary::extraction(&scored.rows),
            position: DimensionSummary::position(&scored.rows),
            cost,
            rows: scored.rows,
            failures: scored.failures,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: ScoringReport = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse report JSON in {}", path.display()))?;
        Ok(report)
    }

    /// Metrics per dimension and the cost breakdown, rounded for display.
    pub fn measures_table(&self) -> Vec<MeasureRow> {
        let mut rows = dimension_rows("EXTRACTION", &self.extraction);
        rows.push(MeasureRow::heading(""));
        rows.extend(dimension_rows("POSITION", &self.position));
        if let Some(cost) = &self.cost {
            rows.push(MeasureRow::heading(""));
            rows.push(MeasureRow::heading("COSTS"));
            rows.push(MeasureRow::new("Input", round_to(cost.input_cost, METRIC_DECIMALS)));
            rows.push(MeasureRow::new("Output", round_to(cost.output_cost, METRIC_DECIMALS)));
            rows.push(MeasureRow::new("Total", round_to(cost.total_cost, METRIC_DECIMALS)));
            rows.push(MeasureRow::new(
                "Per Diagram",
                round_to(cost.per_diagram, PER_DIAGRAM_DECIMALS),
            ));
        }
        rows
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("## {}\n\n", self.source.file));
        md.push_str(&format!(
            "**Model:** {} | **Setting:** {} | **Diagrams:** {} scored of {}\n\n",
            self.source.model,
            self.source.setting.as_deref().unwrap_or("unknown"),
            self.scored_diagrams,
            self.n_diagrams
        ));

        md.push_str("| Measure | Extraction | Position |\n");
        md.push_str("|---------|------------|----------|\n");
        let pairs = dimension_rows("", &self.extraction)
            .into_iter()
            .zip(dimension_rows("", &self.position))
            .skip(1);
        for (e, p) in pairs {
            md.push_str(&format!("| {} | {} | {} |\n", e.measure, e.value, p.value));
        }
        md.push('\n');

        if let Some(cost) = &self.cost {
            md.push_str(&format!(
                "**Cost:** ${:.3} total (${:.3} input, ${:.3} output), ${:.4} per diagram\n\n",
                cost.total_cost, cost.input_cost, cost.output_cost, cost.per_diagram
            ));
        }

        if !self.failures.is_empty() {
            md.push_str("### Failures\n\n");
            for f in &self.failures {
                md.push_str(&format!("- `{}`: {}\n", f.id, f.error));
            }
        }

        md
    }
}
