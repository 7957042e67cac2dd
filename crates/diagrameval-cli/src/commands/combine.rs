//! The `diagrameval combine` command.

use std::path::PathBuf;

use anyhow::Result;

use diagrameval_report::combined::{combine, write_combined_jsonl};

use super::load_reports;

pub fn execute(reports: Vec<PathBuf>, output: PathBuf) -> Result<()> {
    let reports = load_reports(&reports)?;
    let rows = combine(&reports);
    write_combined_jsonl(&rows, &output)?;
    println!(
        "Combined {} rows from {} report(s) into {}",
        rows.len(),
        reports.len(),
        output.display()
    );
    Ok(())
}
