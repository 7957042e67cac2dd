//! The `diagrameval score` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use diagrameval_batch::config::load_config_from;
use diagrameval_batch::{load_response_file, parse_strategy_flags, BatchDescriptor};
use diagrameval_core::cost::CostBreakdown;
use diagrameval_core::engine::Engine;
use diagrameval_core::report::{ReportSource, ScoringReport};
use diagrameval_report::html::write_html_report;

use super::{build_store, file_name, load_rows, ConsoleReporter};

pub struct ScoreArgs {
    pub config: Option<PathBuf>,
    pub responses: PathBuf,
    pub model: Option<String>,
    pub setting: Option<String>,
    pub output: Option<PathBuf>,
    pub format: String,
}

pub async fn execute(args: ScoreArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;

    let source_file = file_name(&args.responses);
    let descriptor = match BatchDescriptor::parse(&source_file) {
        Ok(d) => Some(d),
        Err(e) => {
            tracing::debug!("no batch metadata in file name: {e}");
            None
        }
    };

    let model = args
        .model
        .or_else(|| descriptor.as_ref().map(|d| d.model.clone()))
        .with_context(|| {
            format!("cannot tell the model from '{source_file}'; pass --model")
        })?;
    let setting = args
        .setting
        .or_else(|| descriptor.as_ref().map(|d| d.setting.clone()));
    let strategy = setting.as_deref().and_then(|name| {
        config
            .find_setting(name)
            .and_then(|s| s.strategy())
            .or_else(|| parse_strategy_flags(name).and_then(|f| f.strategy()))
    });

    let response_file = load_response_file(&args.responses)?;
    let n_diagrams = descriptor
        .as_ref()
        .map(|d| d.n)
        .unwrap_or(response_file.records.len() + response_file.failures.len());

    // Unpriced models and empty batches are fatal to the file.
    let usage = response_file.usage;
    let cost = config
        .price_table()
        .estimate(usage.prompt_tokens, usage.completion_tokens, &model)
        .and_then(|estimate| {
            CostBreakdown::new(
                usage.prompt_tokens,
                usage.completion_tokens,
                estimate,
                n_diagrams,
            )
        })
        .with_context(|| format!("cannot score '{source_file}'"))?;

    let rows = load_rows(&config)?;
    let store = Arc::new(build_store(&config, &rows));

    let engine = Engine::new(config.engine_config());
    let mut scored = engine
        .score(
            store,
            response_file.responses(),
            &ConsoleReporter::new("scoring"),
        )
        .await?;
    scored.failures.extend(response_file.failures.iter().cloned());
    scored.failures.sort_by(|a, b| a.id.cmp(&b.id));

    let report = ScoringReport::new(
        ReportSource {
            file: source_file,
            setting,
            model,
            strategy,
        },
        n_diagrams,
        scored,
        Some(cost),
    );

    print_measures(&report);

    let dir = args.output.unwrap_or_else(|| config.output_dir.join("reports"));
    let stem = args
        .responses
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());

    let formats: Vec<&str> = if args.format == "all" {
        vec!["json", "html", "markdown"]
    } else {
        args.format.split(',').map(str::trim).collect()
    };

    for fmt in &formats {
        match *fmt {
            "json" => {
                let path = dir.join(format!("{stem}.json"));
                report.save_json(&path)?;
                eprintln!("Report saved to: {}", path.display());
            }
            "html" => {
                let path = dir.join(format!("{stem}.html"));
                write_html_report(&report, &path)?;
                eprintln!("HTML report: {}", path.display());
            }
            "markdown" | "md" => {
                let path = dir.join(format!("{stem}.md"));
                std::fs::create_dir_all(&dir)?;
                std::fs::write(&path, report.to_markdown())
                    .with_context(|| format!("failed to write {}", path.display()))?;
                eprintln!("Markdown report: {}", path.display());
            }
            _ => {
                eprintln!("Unknown format: {fmt}");
            }
        }
    }

    if !report.failures.is_empty() {
        eprintln!("{} item(s) failed:", report.failures.len());
        for f in &report.failures {
            eprintln!("  {}: {}", f.id, f.error);
        }
    }

    Ok(())
}

fn print_measures(report: &ScoringReport) {
    let mut table = Table::new();
    table.set_header(vec!["Measure", "Value"]);
    for row in report.measures_table() {
        table.add_row(vec![Cell::new(&row.measure), Cell::new(&row.value)]);
    }
    println!(
        "{} | {} | {} of {} diagrams scored",
        report.source.file, report.source.model, report.scored_diagrams, report.n_diagrams
    );
    println!("{table}");
}
