//! Per-diagram orchestration of request preparation and response scoring.
//!
//! Every diagram is an independent work item. Items run on blocking tasks
//! bounded by a semaphore and are collected as they finish; the output is
//! sorted by diagram id afterwards, so it never depends on completion order.
//! A failing item is logged and recorded, never fatal to the batch.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::align::{align, ComparisonRow};
use crate::error::ScoringError;
use crate::model::ModelResponse;
use crate::payload::{render_examples, render_input, PromptPayloadBuilder};
use crate::request::{BatchRequestBuilder, EvaluationRequest, ReasoningEffort, UserPromptSections};
use crate::sampler::{derive_seed, sample};
use crate::setting::ExperimentSetting;
use crate::store::DiagramStore;

/// Configuration for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum diagrams processed at once.
    pub parallelism: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { parallelism: 4 }
    }
}

/// Loaded prompt files for one setting.
#[derive(Debug, Clone, Default)]
pub struct PromptTexts {
    pub system: String,
    pub instructions: Option<String>,
    pub notes: Option<String>,
}

/// Everything needed to build requests for one (setting, model) batch.
#[derive(Debug, Clone)]
pub struct ExperimentContext {
    pub store: DiagramStore,
    pub payloads: PromptPayloadBuilder,
    pub setting: ExperimentSetting,
    pub prompts: PromptTexts,
    pub schema: serde_json::Value,
    pub model: String,
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Global seed for example sampling.
    pub seed: u64,
    pub requests: BatchRequestBuilder,
}

impl ExperimentContext {
    /// Build the request line for one diagram.
    pub fn build_request(&self, diagram_id: &str) -> Result<EvaluationRequest> {
        let diagram = self
            .store
            .get(diagram_id)
            .ok_or_else(|| ScoringError::UnknownDiagram(diagram_id.to_string()))?;

        let reference = self.payloads.build_reference(diagram, &self.setting)?;
        let input = render_input(&reference)?;

        let examples = if self.setting.example_count > 0 {
            let ids = sample(
                &self.store,
                &diagram.id,
                &diagram.text_name,
                self.setting.example_count,
                derive_seed(self.seed, &diagram.id),
            )?;
            let (inputs, outputs) = self.payloads.build_examples(&self.store, &ids, &self.setting)?;
            render_examples(&inputs, &outputs)?
        } else {
            String::new()
        };

        let user_prompt = UserPromptSections {
            instructions: self.prompts.instructions.as_deref(),
            original_text: self.payloads.source_text(&diagram.text_name)?,
            input: &input,
            examples: &examples,
            notes: self.prompts.notes.as_deref(),
        }
        .assemble();

        tracing::debug!(diagram = %diagram.id, examples = self.setting.example_count, "built request");

        Ok(self.requests.build(
            &self.prompts.system,
            &user_prompt,
            &self.schema,
            &diagram.id,
            &self.model,
            self.reasoning_effort,
        ))
    }
}

/// A model response addressed to one diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramResponse {
    pub diagram_id: String,
    pub response: ModelResponse,
}

/// An item that could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub id: String,
    pub error: String,
}

/// Requests built for one batch.
#[derive(Debug, Clone, Default)]
pub struct PreparedBatch {
    /// Sorted by diagram id.
    pub requests: Vec<EvaluationRequest>,
    pub failures: Vec<ItemFailure>,
}

/// Comparison rows for every scored diagram.
#[derive(Debug, Clone, Default)]
pub struct ScoredBatch {
    /// Sorted by diagram id, then field number.
    pub rows: Vec<ComparisonRow>,
    pub scored_diagrams: usize,
    pub failures: Vec<ItemFailure>,
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_item_start(&self, id: &str);
    fn on_item_complete(&self, id: &str);
    fn on_item_error(&self, id: &str, error: &str);
    fn on_batch_complete(&self, total: usize, completed: usize, failed: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_item_start(&self, _: &str) {}
    fn on_item_complete(&self, _: &str) {}
    fn on_item_error(&self, _: &str, _: &str) {}
    fn on_batch_complete(&self, _: usize, _: usize, _: usize, _: Duration) {}
}

/// Per-diagram fan-out/fan-in engine.
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Build one request per diagram id.
    pub async fn prepare(
        &self,
        ctx: Arc<ExperimentContext>,
        diagram_ids: Vec<String>,
        progress: &dyn ProgressReporter,
    ) -> Result<PreparedBatch> {
        let items = diagram_ids.into_iter().map(|id| (id, ())).collect();
        let (done, failures) = self
            .run_items(items, progress, move |id, ()| ctx.build_request(id))
            .await?;

        Ok(PreparedBatch {
            requests: done.into_iter().map(|(_, request)| request).collect(),
            failures,
        })
    }

    /// Align every response with its diagram.
    ///
    /// Responses for ids missing from the store fail with `UnknownDiagram`;
    /// repeated ids keep the first response.
    pub async fn score(
        &self,
        store: Arc<DiagramStore>,
        responses: Vec<DiagramResponse>,
        progress: &dyn ProgressReporter,
    ) -> Result<ScoredBatch> {
        let mut seen = BTreeSet::new();
        let mut items = Vec::with_capacity(responses.len());
        for r in responses {
            if seen.insert(r.diagram_id.clone()) {
                items.push((r.diagram_id, r.response));
            } else {
                tracing::warn!("ignoring repeated response for {}", r.diagram_id);
            }
        }

        let (done, failures) = self
            .run_items(items, progress, move |id, response: ModelResponse| {
                let diagram = store
                    .get(id)
                    .ok_or_else(|| ScoringError::UnknownDiagram(id.to_string()))?;
                Ok(align(diagram, &response)?)
            })
            .await?;

        let scored_diagrams = done.len();
        Ok(ScoredBatch {
            rows: done.into_iter().flat_map(|(_, rows)| rows).collect(),
            scored_diagrams,
            failures,
        })
    }

    async fn run_items<I, T, F>(
        &self,
        items: Vec<(String, I)>,
        progress: &dyn ProgressReporter,
        work: F,
    ) -> Result<(Vec<(String, T)>, Vec<ItemFailure>)>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(&str, I) -> Result<T> + Send + Sync + 'static,
    {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));
        let work = Arc::new(work);
        let total = items.len();

        let mut futures = FuturesUnordered::new();
        for (id, item) in items {
            progress.on_item_start(&id);
            let semaphore = Arc::clone(&semaphore);
            let work = Arc::clone(&work);
            futures.push(async move {
                let task_id = id.clone();
                let result = async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| anyhow::anyhow!("semaphore closed"))?;
                    tokio::task::spawn_blocking(move || (*work)(&task_id, item))
                        .await
                        .map_err(|e| anyhow::anyhow!("worker panicked: {e}"))?
                }
                .await;
                (id, result)
            });
        }

        let mut done = Vec::with_capacity(total);
        let mut failures = Vec::new();
        while let Some((id, result)) = futures.next().await {
            match result {
                Ok(value) => {
                    progress.on_item_complete(&id);
                    done.push((id, value));
                }
                Err(e) => {
                    tracing::error!("{id} failed: {e:#}");
                    progress.on_item_error(&id, &format!("{e:#}"));
                    failures.push(ItemFailure {
                        id,
                        error: format!("{e:#}"),
                    });
                }
            }
        }

        done.sort_by(|a, b| a.0.cmp(&b.0));
        failures.sort_by(|a, b| a.id.cmp(&b.id));

        progress.on_batch_complete(total, done.len(), failures.len(), start.elapsed());
        Ok((done, failures))
    }
}
