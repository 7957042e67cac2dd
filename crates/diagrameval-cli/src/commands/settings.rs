//! The `diagrameval settings` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::Table;

use diagrameval_batch::config::load_config_from;
use diagrameval_core::setting::validate_settings;

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let settings = config.settings();

    let mut table = Table::new();
    table.set_header(vec![
        "Setting",
        "Strategy",
        "Model Diagram",
        "Diagram Creation",
        "Examples",
        "Schema",
    ]);
    for s in &settings {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        table.add_row(vec![
            s.name.clone(),
            s.strategy()
                .map_or_else(|| "n/a".to_string(), |n| format!("S{n}")),
            yes_no(s.truth_given).to_string(),
            yes_no(s.diagram_creation).to_string(),
            s.example_count.to_string(),
            s.schema_id.clone(),
        ]);
    }
    println!("{} setting(s)", settings.len());
    println!("{table}");

    let warnings = validate_settings(&settings);
    for w in &warnings {
        println!("  [{}] WARNING: {}", w.setting, w.message);
    }
    if warnings.is_empty() {
        println!("All settings valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
