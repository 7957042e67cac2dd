//! Command-line entry point for preparing batches and scoring responses.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "diagrameval",
    version,
    about = "Batch construction and agreement scoring for coded student diagrams"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a batch request file for one setting and model
    Prepare {
        /// Setting name (see `diagrameval settings`)
        #[arg(long)]
        setting: String,

        /// Target model, e.g. "gpt-5-mini"
        #[arg(long)]
        model: String,

        /// Number of diagrams to evaluate (default: all)
        #[arg(long)]
        n: Option<usize>,

        /// Reasoning effort for reasoning models: low, medium, high
        #[arg(long)]
        effort: Option<String>,

        /// Date stamped into the file name (default: today)
        #[arg(long)]
        date: Option<chrono::NaiveDate>,

        /// Output directory (default: `<output_dir>/batches`)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Score a response file against the human codes
    Score {
        /// Response JSONL file
        #[arg(long)]
        responses: PathBuf,

        /// Model name, if the file name does not carry it
        #[arg(long)]
        model: Option<String>,

        /// Setting name, if the file name does not carry it
        #[arg(long)]
        setting: Option<String>,

        /// Output directory (default: `<output_dir>/reports`)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: json, html, markdown, all (comma-separated)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Compare scoring reports across settings and models
    Compare {
        /// Report JSON files or directories containing them
        #[arg(required = true)]
        reports: Vec<PathBuf>,

        /// Output format: text, markdown, json, html
        #[arg(long, default_value = "text")]
        format: String,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Merge the comparison rows of many reports into one JSONL table
    Combine {
        /// Report JSON files or directories containing them
        #[arg(required = true)]
        reports: Vec<PathBuf>,

        /// Output JSONL file
        #[arg(long)]
        output: PathBuf,
    },

    /// Describe the loaded dataset
    Explore {
        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// List and check the configured settings
    Settings,

    /// Answer a request file from the human codes, offline
    Simulate {
        /// Request JSONL file produced by `prepare`
        #[arg(long)]
        requests: PathBuf,

        /// Share of codes to flip, 0.0 to 1.0
        #[arg(long, default_value = "0.0")]
        flip_rate: f64,

        /// Output file (default: `<output_dir>/responses/<request file name>`)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Create a starter config and input directories
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("diagrameval=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Prepare {
            setting,
            model,
            n,
            effort,
            date,
            output,
        } => {
            commands::prepare::execute(commands::prepare::PrepareArgs {
                config,
                setting,
                model,
                n,
                effort,
                date,
                output,
            })
            .await
        }
        Commands::Score {
            responses,
            model,
            setting,
            output,
            format,
        } => {
            commands::score::execute(commands::score::ScoreArgs {
                config,
                responses,
                model,
                setting,
                output,
                format,
            })
            .await
        }
        Commands::Compare {
            reports,
            format,
            output,
        } => commands::compare::execute(reports, format, output),
        Commands::Combine { reports, output } => commands::combine::execute(reports, output),
        Commands::Explore { json } => commands::explore::execute(config, json),
        Commands::Settings => commands::settings::execute(config),
        Commands::Simulate {
            requests,
            flip_rate,
            output,
        } => commands::simulate::execute(config, requests, flip_rate, output),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
