//! Cross-setting comparison: one row per scoring report plus an average row.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use diagrameval_core::confusion::ConfusionCounts;
use diagrameval_core::cost::CostBreakdown;
use diagrameval_core::report::{ScoringReport, METRIC_DECIMALS, PER_DIAGRAM_DECIMALS};
use diagrameval_core::setting::StrategyFlags;
use diagrameval_core::statistics::{round_to, AgreementMetrics, DimensionSummary};

use crate::html::{html_escape, page_start, PAGE_END, SORT_SCRIPT};

const NOT_AVAILABLE: &str = "n/a";

/// Metric and count columns of one dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionColumns {
    pub accuracy: f64,
    pub f1: f64,
    pub precision: f64,
    pub recall: f64,
    pub kappa: f64,
    pub tp: f64,
    #[serde(rename = "fn")]
    pub fn_: f64,
    pub fp: f64,
    pub tn: f64,
}

impl From<&DimensionSummary> for DimensionColumns {
    fn from(s: &DimensionSummary) -> Self {
        let AgreementMetrics {
            accuracy,
            precision,
            recall,
            f1,
            kappa,
        } = s.metrics;
        let ConfusionCounts {
            true_positive,
            false_negative,
            false_positive,
            true_negative,
        } = s.counts;
        Self {
            accuracy,
            f1,
            precision,
            recall,
            kappa,
            tp: true_positive as f64,
            fn_: false_negative as f64,
            fp: false_positive as f64,
            tn: true_negative as f64,
        }
    }
}

impl DimensionColumns {
    fn mean(columns: &[DimensionColumns]) -> Self {
        let n = columns.len().max(1) as f64;
        let sum = |f: fn(&DimensionColumns) -> f64| columns.iter().map(f).sum::<f64>() / n;
        Self {
            accuracy: sum(|c| c.accuracy),
            f1: sum(|c| c.f1),
            precision: sum(|c| c.precision),
            recall: sum(|c| c.recall),
            kappa: sum(|c| c.kappa),
            tp: sum(|c| c.tp),
            fn_: sum(|c| c.fn_),
            fp: sum(|c| c.fp),
            tn: sum(|c| c.tn),
        }
    }

    fn cells(&self) -> Vec<String> {
        [
            self.accuracy,
            self.f1,
            self.precision,
            self.recall,
            self.kappa,
            self.tp,
            self.fn_,
            self.fp,
            self.tn,
        ]
        .iter()
        .map(|v| round_to(*v, METRIC_DECIMALS).to_string())
        .collect()
    }
}

/// One report in the overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewRow {
    pub setting: String,
    pub model: String,
    pub strategy: Option<u8>,
    /// Strategy factors, when the strategy is known.
    pub flags: Option<StrategyFlags>,
    pub extraction: DimensionColumns,
    pub position: DimensionColumns,
    pub cost: Option<CostBreakdown>,
}

impl OverviewRow {
    pub fn from_report(report: &ScoringReport) -> Self {
        Self {
            setting: report
                .source
                .setting
                .clone()
                .unwrap_or_else(|| report.source.file.clone()),
            model: report.source.model.clone(),
            strategy: report.source.strategy,
            flags: report.source.strategy.and_then(StrategyFlags::from_strategy),
            extraction: DimensionColumns::from(&report.extraction),
            position: DimensionColumns::from(&report.position),
            cost: report.cost,
        }
    }

    fn cells(&self) -> Vec<String> {
        let yes_no = |b: bool| if b { "yes" } else { "no" }.to_string();
        let mut cells = vec![self.setting.clone(), self.model.clone()];
        match &self.flags {
            Some(flags) => {
                cells.push(yes_no(flags.truth_given));
                cells.push(yes_no(flags.diagram_creation));
                cells.push(flags.example_count.to_string());
            }
            None => cells.extend(std::iter::repeat(NOT_AVAILABLE.to_string()).take(3)),
        }
        cells.extend(self.extraction.cells());
        cells.extend(self.position.cells());
        cells.extend(cost_cells(self.cost.as_ref()));
        cells
    }
}

fn cost_cells(cost: Option<&CostBreakdown>) -> Vec<String> {
    match cost {
        Some(c) => vec![
            round_to(c.input_cost, METRIC_DECIMALS).to_string(),
            round_to(c.output_cost, METRIC_DECIMALS).to_string(),
            round_to(c.total_cost, METRIC_DECIMALS).to_string(),
            round_to(c.per_diagram, PER_DIAGRAM_DECIMALS).to_string(),
        ],
        None => vec![NOT_AVAILABLE.to_string(); 4],
    }
}

/// Column headers, in display order.
pub const OVERVIEW_HEADERS: [&str; 27] = [
    "Setting",
    "Model",
    "Model Diagram",
    "Diagram Creation",
    "Examples",
    "Accuracy E",
    "F1 E",
    "Precision E",
    "Recall E",
    "Kappa E",
    "TP E",
    "FN E",
    "FP E",
    "TN E",
    "Accuracy P",
    "F1 P",
    "Precision P",
    "Recall P",
    "Kappa P",
    "TP P",
    "FN P",
    "FP P",
    "TN P",
    "Input Cost",
    "Output Cost",
    "Total Cost",
    "Cost per Diagram",
];

/// All reports side by side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsOverview {
    pub rows: Vec<OverviewRow>,
}

impl SettingsOverview {
    /// Rows ordered by strategy (unknown last), then setting, then model.
    pub fn from_reports(reports: &[ScoringReport]) -> Self {
        let mut rows: Vec<OverviewRow> = reports.iter().map(OverviewRow::from_report).collect();
        rows.sort_by(|a, b| {
            (a.strategy.is_none(), a.strategy, &a.setting, &a.model).cmp(&(
                b.strategy.is_none(),
                b.strategy,
                &b.setting,
                &b.model,
            ))
        });
        Self { rows }
    }

    /// Column means over all rows; cost means over rows that have costs.
    pub fn average(&self) -> Option<(DimensionColumns, DimensionColumns, Option<CostBreakdown>)> {
        if self.rows.is_empty() {
            return None;
        }
        let extraction: Vec<_> = self.rows.iter().map(|r| r.extraction).collect();
        let position: Vec<_> = self.rows.iter().map(|r| r.position).collect();
        let costs: Vec<&CostBreakdown> = self.rows.iter().filter_map(|r| r.cost.as_ref()).collect();

        let cost = (!costs.is_empty()).then(|| {
            let n = costs.len() as f64;
            let mean = |f: fn(&CostBreakdown) -> f64| costs.iter().map(|c| f(c)).sum::<f64>() / n;
            CostBreakdown {
                input_tokens: costs.iter().map(|c| c.input_tokens).sum::<u64>() / costs.len() as u64,
                output_tokens: costs.iter().map(|c| c.output_tokens).sum::<u64>()
                    / costs.len() as u64,
                input_cost: mean(|c| c.input_cost),
                output_cost: mean(|c| c.output_cost),
                total_cost: mean(|c| c.total_cost),
                per_diagram: mean(|c| c.per_diagram),
            }
        });

        Some((
            DimensionColumns::mean(&extraction),
            DimensionColumns::mean(&position),
            cost,
        ))
    }

    /// Display cells for every row, followed by the `Avg.` row.
    pub fn table(&self) -> Vec<Vec<String>> {
        let mut table: Vec<Vec<String>> = self.rows.iter().map(OverviewRow::cells).collect();
        if let Some((extraction, position, cost)) = self.average() {
            let mut avg = vec!["Avg.".to_string()];
            avg.extend(std::iter::repeat(NOT_AVAILABLE.to_string()).take(4));
            avg.extend(extraction.cells());
            avg.extend(position.cells());
            avg.extend(cost_cells(cost.as_ref()));
            table.push(avg);
        }
        table
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::from("## Settings Overview\n\n");
        md.push_str(&format!("| {} |\n", OVERVIEW_HEADERS.join(" | ")));
        md.push_str(&format!("|{}\n", "---|".repeat(OVERVIEW_HEADERS.len())));
        for row in self.table() {
            md.push_str(&format!("| {} |\n", row.join(" | ")));
        }
        md
    }

    pub fn to_html(&self) -> String {
        let mut html = page_start("diagrameval settings overview");
        html.push_str("<h1>Settings Overview</h1>\n");
        html.push_str(&format!(
            "<p class=\"meta\">{} reports | generated {}</p>\n",
            self.rows.len(),
            chrono::Utc::now().format("%Y-%m-%d %H:%M UTC")
        ));
        html.push_str("<table class=\"sortable\">\n<thead><tr>");
        for header in OVERVIEW_HEADERS {
            html.push_str(&format!("<th>{header}</th>"));
        }
        html.push_str("</tr></thead>\n<tbody>\n");
        for row in self.table() {
            html.push_str("<tr>");
            for cell in row {
                html.push_str(&format!("<td>{}</td>", html_escape(&cell)));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody></table>\n");
        html.push_str(&format!("<script>{SORT_SCRIPT}</script>\n"));
        html.push_str(PAGE_END);
        html
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize overview")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write overview to {}", path.display()))?;
        tracing::debug!(path = %path.display(), rows = self.rows.len(), "wrote overview");
        Ok(())
    }
}
