//! Self-contained HTML pages for scoring reports.

use std::path::Path;

use anyhow::{Context, Result};

use diagrameval_core::align::ComparisonRow;
use diagrameval_core::report::{ScoringReport, METRIC_DECIMALS, PER_DIAGRAM_DECIMALS};
use diagrameval_core::statistics::{round_to, DimensionSummary};

pub(crate) fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `<!DOCTYPE>` through the opening `<body>`, with the shared stylesheet.
pub(crate) fn page_start(title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n",
        html_escape(title)
    )
}

pub(crate) const PAGE_END: &str = "</body>\n</html>\n";

fn metric(value: f64) -> f64 {
    round_to(value, METRIC_DECIMALS)
}

/// Landis and Koch reading of a kappa value.
fn kappa_band(kappa: f64) -> &'static str {
    match kappa {
        k if k > 0.8 => "almost perfect",
        k if k > 0.6 => "substantial",
        k if k > 0.4 => "moderate",
        k if k > 0.2 => "fair",
        k if k >= 0.0 => "slight",
        _ => "poor",
    }
}

/// Render one scoring report.
pub fn generate_html(report: &ScoringReport) -> String {
    let mut html = page_start(&format!("diagrameval: {}", report.source.file));
    html.push_str(&source_header(report));
    html.push_str(&measures_section(report));
    if let Some(cost) = &report.cost {
        html.push_str("<h2>Costs</h2>\n<table class=\"narrow\"><tbody>\n");
        let lines = [
            (format!("Input ({} tokens)", cost.input_tokens), metric(cost.input_cost)),
            (format!("Output ({} tokens)", cost.output_tokens), metric(cost.output_cost)),
            ("Total".to_string(), metric(cost.total_cost)),
            (
                "Per Diagram".to_string(),
                round_to(cost.per_diagram, PER_DIAGRAM_DECIMALS),
            ),
        ];
        for (label, value) in lines {
            html.push_str(&format!("<tr><td>{label}</td><td>${value}</td></tr>\n"));
        }
        html.push_str("</tbody></table>\n");
    }
    html.push_str(&comparison_section(&report.rows));

    if !report.failures.is_empty() {
        html.push_str(&format!(
            "<h2>Failures ({})</h2>\n<ul class=\"failures\">\n",
            report.failures.len()
        ));
        for f in &report.failures {
            html.push_str(&format!(
                "<li><code>{}</code> {}</li>\n",
                html_escape(&f.id),
                html_escape(&f.error)
            ));
        }
        html.push_str("</ul>\n");
    }

    // the full record, for copying into other tools
    if let Ok(json) = serde_json::to_string_pretty(report) {
        html.push_str("<details><summary>Report JSON</summary>\n<pre>");
        html.push_str(&html_escape(&json));
        html.push_str("</pre></details>\n");
    }

    html.push_str(&format!("<script>{SORT_SCRIPT}</script>\n"));
    html.push_str(PAGE_END);
    html
}

/// Write [`generate_html`] output to `path`, creating parent directories.
pub fn write_html_report(report: &ScoringReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, generate_html(report))
        .with_context(|| format!("failed to write HTML report to {}", path.display()))
}

fn source_header(report: &ScoringReport) -> String {
    let strategy = report
        .source
        .strategy
        .map_or_else(|| "n/a".to_string(), |s| format!("S{s}"));
    let facts = [
        ("Model", html_escape(&report.source.model)),
        (
            "Setting",
            html_escape(report.source.setting.as_deref().unwrap_or("unknown")),
        ),
        ("Strategy", strategy),
        (
            "Scored",
            format!("{} of {} diagrams", report.scored_diagrams, report.n_diagrams),
        ),
        (
            "Created",
            report.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        ),
    ];

    let mut out = format!("<h1>{}</h1>\n<dl class=\"facts\">\n", html_escape(&report.source.file));
    for (term, value) in facts {
        out.push_str(&format!("<dt>{term}</dt><dd>{value}</dd>\n"));
    }
    out.push_str("</dl>\n");
    out
}

fn measures_section(report: &ScoringReport) -> String {
    let mut out = String::from(
        "<h2>Measures</h2>\n<table class=\"narrow\">\n\
         <thead><tr><th>Measure</th><th>Extraction</th><th>Position</th></tr></thead>\n<tbody>\n",
    );
    for (name, e, p) in measure_pairs(&report.extraction, &report.position) {
        out.push_str(&format!("<tr><td>{name}</td><td>{e}</td><td>{p}</td></tr>\n"));
    }
    out.push_str("</tbody></table>\n");

    out.push_str("<div class=\"gauges\">\n");
    for (name, summary) in [("Extraction", &report.extraction), ("Position", &report.position)] {
        out.push_str(&kappa_gauge(name, summary));
    }
    out.push_str("</div>\n");
    out
}

/// A bar scaled to kappa in [0, 1], labelled with its agreement band.
fn kappa_gauge(name: &str, summary: &DimensionSummary) -> String {
    let kappa = summary.metrics.kappa;
    let percent = (kappa.clamp(0.0, 1.0) * 100.0).round();
    let band = kappa_band(kappa);
    format!(
        "<div class=\"gauge\"><span class=\"label\">{name} kappa {}</span>\
         <span class=\"track\"><span class=\"fill {}\" style=\"width:{percent}%\"></span></span>\
         <span class=\"band\">{band}</span></div>\n",
        metric(kappa),
        band.replace(' ', "-"),
    )
}

const COMPARISON_HEADERS: [&str; 15] = [
    "Dataset",
    "Diagram",
    "Field Text",
    "Human Code",
    "Model Code",
    "Extraction Agreement",
    "Extraction Label",
    "Field",
    "Link",
    "Position Code",
    "Model Position Code",
    "Model Correct Position",
    "Position Code Agreement",
    "Position Code Label",
    "Position Agreement",
];

fn comparison_section(rows: &[ComparisonRow]) -> String {
    let mut out = String::from("<h2>Comparison</h2>\n<table class=\"sortable\">\n<thead><tr>");
    for header in COMPARISON_HEADERS {
        out.push_str(&format!("<th>{header}</th>"));
    }
    out.push_str("</tr></thead>\n<tbody>\n");
    for row in rows {
        out.push_str(&comparison_row(row));
    }
    out.push_str("</tbody></table>\n");
    out
}

fn comparison_row(row: &ComparisonRow) -> String {
    let dash = || "-".to_string();
    let cells = [
        html_escape(&row.dataset),
        html_escape(&row.diagram_id),
        html_escape(&row.field_text),
        row.human_code.to_string(),
        row.model_code.to_string(),
        row.extraction_agreement.to_string(),
        row.extraction_label.to_string(),
        row.field_number.to_string(),
        row.link_number
            .map_or_else(|| "none".to_string(), |n| n.to_string()),
        row.position_code.to_string(),
        row.model_position_code.to_string(),
        row.model_correct_position.to_string(),
        row.position_code_agreement
            .map_or_else(dash, |a| a.to_string()),
        row.position_code_label.map_or_else(dash, |l| l.to_string()),
        row.position_agreement.to_string(),
    ];

    let class = if row.extraction_agreement { "agree" } else { "disagree" };
    let mut tr = format!("<tr class=\"{class}\">");
    for cell in cells {
        tr.push_str("<td>");
        tr.push_str(&cell);
        tr.push_str("</td>");
    }
    tr.push_str("</tr>\n");
    tr
}

fn measure_pairs(e: &DimensionSummary, p: &DimensionSummary) -> Vec<(&'static str, String, String)> {
    let column = |s: &DimensionSummary| {
        [
            metric(s.metrics.accuracy).to_string(),
            metric(s.metrics.f1).to_string(),
            metric(s.metrics.precision).to_string(),
            metric(s.metrics.recall).to_string(),
            metric(s.metrics.kappa).to_string(),
            s.counts.true_positive.to_string(),
            s.counts.false_negative.to_string(),
            s.counts.false_positive.to_string(),
            s.counts.true_negative.to_string(),
        ]
    };
    ["Accuracy", "F1", "Precision", "Recall", "Kappa", "TP", "FN", "FP", "TN"]
        .into_iter()
        .zip(column(e).into_iter().zip(column(p)))
        .map(|(name, (e, p))| (name, e, p))
        .collect()
}

pub(crate) const STYLE: &str = r#"
body { font: 14px/1.5 system-ui, sans-serif; max-width: 1400px; margin: 0 auto; padding: 1.5rem; color: #222; }
h1 { font-size: 1.3rem; word-break: break-all; }
h2 { font-size: 1.1rem; border-bottom: 2px solid #ccd; padding-bottom: .2rem; margin-top: 2rem; }
dl.facts { display: grid; grid-template-columns: max-content 1fr; gap: .1rem 1rem; }
dl.facts dt { font-weight: 600; }
dl.facts dd { margin: 0; }
table { border-collapse: collapse; margin: .75rem 0; width: 100%; }
table.narrow { width: auto; }
th, td { border: 1px solid #ccd; padding: .25rem .6rem; vertical-align: top; }
th { background: #eef; text-align: left; }
table.sortable th { cursor: pointer; user-select: none; }
tr.agree td { background: #eefaf0; }
tr.disagree td { background: #fbeeee; }
.meta { color: #667; }
.gauges { margin: 1rem 0; }
.gauge { display: flex; align-items: center; gap: .75rem; margin: .3rem 0; }
.gauge .label { width: 13rem; text-align: right; }
.gauge .track { width: 24rem; height: 1rem; background: #eee; border-radius: 3px; overflow: hidden; }
.gauge .fill { display: block; height: 100%; background: #c33; }
.gauge .fill.almost-perfect { background: #2a8a3e; }
.gauge .fill.substantial { background: #7bb33a; }
.gauge .fill.moderate { background: #d6a51c; }
.gauge .fill.fair { background: #e07b24; }
ul.failures code { font-weight: 600; }
pre { background: #f6f6fa; padding: .75rem; overflow-x: auto; font-size: 12px; }
"#;

pub(crate) const SORT_SCRIPT: &str = r#"
document.querySelectorAll('table.sortable').forEach(function (table) {
  var body = table.tBodies[0];
  table.querySelectorAll('th').forEach(function (th, col) {
    th.addEventListener('click', function () {
      var desc = th.getAttribute('data-dir') === 'asc';
      table.querySelectorAll('th').forEach(function (h) { h.removeAttribute('data-dir'); });
      th.setAttribute('data-dir', desc ? 'desc' : 'asc');
      var rows = Array.prototype.slice.call(body.rows);
      rows.sort(function (a, b) {
        var cmp = a.cells[col].innerText.localeCompare(b.cells[col].innerText, undefined, { numeric: true });
        return desc ? -cmp : cmp;
      });
      rows.forEach(function (r) { body.appendChild(r); });
    });
  });
});
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::sample_report;

    #[test]
    fn page_carries_source_measures_and_rows() {
        let mut report = sample_report("V1.1_wTruth_5Examples_allUserPrompt", "gpt-5-mini", 0);
        report.id = uuid::Uuid::nil();
        let html = generate_html(&report);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.trim_end().ends_with("</html>"));
        assert!(html.contains("gpt-5-mini"));
        assert!(html.contains("<dd>S5</dd>"));
        assert!(html.contains("1_3A_Beton"));
        assert!(html.contains("<td>Kappa</td>"));
        assert!(html.contains("Per Diagram"));
        assert!(html.contains("00000000-0000-0000-0000-000000000000"));
        assert!(!html.contains("Failures"));
    }

    #[test]
    fn field_text_is_escaped() {
        let mut report = sample_report("V1.1_woTruth_0Examples_allUserPrompt", "gpt-5", 0);
        report.rows[0].field_text = "<b>cement</b> & 'water'".into();
        let html = generate_html(&report);
        assert!(html.contains("&lt;b&gt;cement&lt;/b&gt; &amp; &#39;water&#39;"));
        assert!(!html.contains("<b>cement</b>"));
    }

    #[test]
    fn kappa_bands_follow_landis_koch() {
        assert_eq!(kappa_band(1.0), "almost perfect");
        assert_eq!(kappa_band(0.7), "substantial");
        assert_eq!(kappa_band(0.5), "moderate");
        assert_eq!(kappa_band(0.3), "fair");
        assert_eq!(kappa_band(0.0), "slight");
        assert_eq!(kappa_band(-0.2), "poor");
    }

    #[test]
    fn worked_example_gauge_is_moderate() {
        // extraction kappa of the worked example is 0.5
        let report = sample_report("V1.1_woTruth_0Examples_allUserPrompt", "gpt-5", 0);
        let html = generate_html(&report);
        assert!(html.contains("Extraction kappa 0.5"));
        assert!(html.contains("fill moderate\" style=\"width:50%\""));
    }

    #[test]
    fn write_creates_parent_dirs() {
        let report = sample_report("V1.1_woTruth_0Examples_allUserPrompt", "gpt-5", 1);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("html").join("report.html");

        write_html_report(&report, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Failures (1)"));
    }
}
