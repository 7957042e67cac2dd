//! The `diagrameval prepare` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use diagrameval_batch::config::load_config_from;
use diagrameval_batch::{write_requests, BatchDescriptor};
use diagrameval_core::engine::{Engine, ExperimentContext, PromptTexts};
use diagrameval_core::parser;
use diagrameval_core::payload::PromptPayloadBuilder;
use diagrameval_core::request::ReasoningEffort;
use diagrameval_core::sampler::select_for_evaluation;

use super::{build_store, load_rows, ConsoleReporter};

pub struct PrepareArgs {
    pub config: Option<PathBuf>,
    pub setting: String,
    pub model: String,
    pub n: Option<usize>,
    pub effort: Option<String>,
    pub date: Option<chrono::NaiveDate>,
    pub output: Option<PathBuf>,
}

pub async fn execute(args: PrepareArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;

    let setting = config.find_setting(&args.setting).with_context(|| {
        let names: Vec<String> = config.settings().into_iter().map(|s| s.name).collect();
        format!(
            "unknown setting '{}'. Available: {}",
            args.setting,
            names.join(", ")
        )
    })?;

    let rows = load_rows(&config)?;
    let store = build_store(&config, &rows);
    anyhow::ensure!(!store.is_empty(), "no complete diagrams in {}", config.rows.display());

    let n = args.n.unwrap_or(store.len());
    let ids = select_for_evaluation(&store, n, config.seed)?;

    let templates = parser::load_templates(&config.templates)?;
    let prompts = PromptTexts {
        system: parser::load_prompt(&config.prompts_dir, &setting.prompt_id)?,
        instructions: setting
            .user_prompt_id
            .as_deref()
            .map(|id| parser::load_prompt(&config.prompts_dir, id))
            .transpose()?,
        notes: setting
            .notes_id
            .as_deref()
            .map(|id| parser::load_prompt(&config.prompts_dir, id))
            .transpose()?,
    };
    let schema = parser::load_schema(&config.schemas_dir, &setting.schema_id)?;

    let requests = config.request_builder();
    let reasoning_effort = if requests.capabilities.is_reasoning(&args.model) {
        Some(
            args.effort
                .as_deref()
                .map(ReasoningEffort::parse_or_default)
                .unwrap_or_default(),
        )
    } else {
        if args.effort.is_some() {
            eprintln!(
                "Warning: '{}' is not a reasoning model, ignoring --effort",
                args.model
            );
        }
        None
    };

    let descriptor = BatchDescriptor {
        date: args
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive()),
        setting: setting.name.clone(),
        model: args.model.clone(),
        n,
    };

    eprintln!(
        "diagrameval v{}: preparing {} diagrams for {} with {} (strategy {})",
        env!("CARGO_PKG_VERSION"),
        n,
        setting.name,
        args.model,
        setting
            .strategy()
            .map_or_else(|| "n/a".to_string(), |s| format!("S{s}")),
    );

    let ctx = Arc::new(ExperimentContext {
        store,
        payloads: PromptPayloadBuilder::new(templates),
        setting,
        prompts,
        schema,
        model: args.model,
        reasoning_effort,
        seed: config.seed,
        requests,
    });

    let engine = Engine::new(config.engine_config());
    let batch = engine
        .prepare(ctx, ids, &ConsoleReporter::new("building"))
        .await?;

    let dir = args.output.unwrap_or_else(|| config.output_dir.join("batches"));
    let path = dir.join(descriptor.file_name());
    write_requests(&path, &batch.requests)?;

    println!("Wrote {} requests to {}", batch.requests.len(), path.display());
    if !batch.failures.is_empty() {
        println!("{} diagram(s) failed:", batch.failures.len());
        for f in &batch.failures {
            println!("  {}: {}", f.id, f.error);
        }
    }

    Ok(())
}
