//! The `diagrameval simulate` command.

use std::path::PathBuf;

use anyhow::Result;

use diagrameval_batch::config::load_config_from;
use diagrameval_batch::responses::write_responses;
use diagrameval_batch::{read_requests, OracleResponder};

use super::{build_store, file_name, load_rows};

pub fn execute(
    config_path: Option<PathBuf>,
    requests_path: PathBuf,
    flip_rate: f64,
    output: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(
        (0.0..=1.0).contains(&flip_rate),
        "flip rate must be between 0.0 and 1.0"
    );

    let config = load_config_from(config_path.as_deref())?;
    let requests = read_requests(&requests_path)?;
    let rows = load_rows(&config)?;
    let store = build_store(&config, &rows);

    let oracle = OracleResponder::new(flip_rate, config.seed);
    let records = oracle.respond(&store, &requests);

    let path = output.unwrap_or_else(|| {
        config
            .output_dir
            .join("responses")
            .join(file_name(&requests_path))
    });
    write_responses(&path, &records)?;

    println!(
        "Wrote {} of {} responses to {}",
        records.len(),
        requests.len(),
        path.display()
    );
    Ok(())
}
