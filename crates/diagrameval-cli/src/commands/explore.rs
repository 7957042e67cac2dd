//! The `diagrameval explore` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use diagrameval_batch::config::load_config_from;
use diagrameval_core::statistics::{round_to, DatasetSummary};

use super::{build_store, load_rows};

pub fn execute(config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let rows = load_rows(&config)?;
    let summary = DatasetSummary::from_rows(&rows, &config.store_options());

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let store = build_store(&config, &rows);

    println!("Dataset: {} ({} rows loaded)", summary.target_dataset, rows.len());

    let mut counts = Table::new();
    counts.set_header(vec!["", "Lines", "Diagrams", "Participants"]);
    for (label, c) in [("Unfiltered", summary.unfiltered), ("Filtered", summary.filtered)] {
        counts.add_row(vec![
            Cell::new(label),
            Cell::new(c.lines),
            Cell::new(c.diagrams),
            Cell::new(c.participants),
        ]);
    }
    println!("{counts}");
    println!("Complete diagrams: {}", store.len());

    if let Some(words) = summary.answer_words {
        println!(
            "Answer length (words): min {}, max {}, mean {}, sd {}",
            words.min,
            words.max,
            round_to(words.mean, 2),
            round_to(words.sd, 2)
        );
    }

    let mut balance = Table::new();
    balance.set_header(vec!["Text", "Good", "Good %", "Commission", "Commission %"]);
    for b in &summary.code_balance {
        balance.add_row(vec![
            Cell::new(&b.text_name),
            Cell::new(b.good),
            Cell::new(round_to(b.good_pct(), 2)),
            Cell::new(b.commission),
            Cell::new(round_to(b.commission_pct(), 2)),
        ]);
    }
    println!("{balance}");

    Ok(())
}
