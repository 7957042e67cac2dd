//! Scoring and overview integration tests.
//!
//! Scores the fixture responses through the library, then checks that
//! reports survive a JSON round trip and line up in the settings overview.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use diagrameval_batch::{load_config_from, load_response_file, BatchDescriptor, DiagramEvalConfig};
use diagrameval_core::engine::{Engine, NoopReporter};
use diagrameval_core::model::Extraction;
use diagrameval_core::parser::load_rows;
use diagrameval_core::report::{ReportSource, ScoringReport};
use diagrameval_core::store::DiagramStore;
use diagrameval_report::combined::combine;
use diagrameval_report::overview::SettingsOverview;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures")
}

fn fixture_config() -> DiagramEvalConfig {
    load_config_from(Some(fixtures().join("diagrameval.toml").as_path())).unwrap()
}

fn fixture_store(config: &DiagramEvalConfig) -> Arc<DiagramStore> {
    let rows = load_rows(&config.rows).unwrap();
    Arc::new(DiagramStore::from_rows(&rows, &config.store_options()).store)
}

fn fixture_response_path() -> PathBuf {
    fixtures()
        .join("responses")
        .join("2025-09-14_V1.1_woTruth_0Examples_allUserPrompt_gpt-4o-2024-08-06_n2.jsonl")
}

async fn score_fixture(setting: &str, strategy: u8, flip_first_box: bool) -> ScoringReport {
    let config = fixture_config();
    let store = fixture_store(&config);
    let file = load_response_file(&fixture_response_path()).unwrap();

    let mut responses = file.responses();
    if flip_first_box {
        for r in &mut responses {
            let mut first = *r.response.get(1).unwrap();
            first.extraction = match first.extraction {
                Extraction::Good => Extraction::Commission,
                _ => Extraction::Good,
            };
            r.response.set(1, first);
        }
    }

    let scored = Engine::new(config.engine_config())
        .score(store, responses, &NoopReporter)
        .await
        .unwrap();

    let cost = config
        .price_table()
        .estimate(file.usage.prompt_tokens, file.usage.completion_tokens, "gpt-4o-2024-08-06")
        .ok();

    ScoringReport::new(
        ReportSource {
            file: format!("2025-09-14_{setting}_gpt-4o-2024-08-06_n2.jsonl"),
            setting: Some(setting.to_string()),
            model: "gpt-4o-2024-08-06".to_string(),
            strategy: Some(strategy),
        },
        2,
        scored,
        cost.and_then(|estimate| {
            diagrameval_core::cost::CostBreakdown::new(
                file.usage.prompt_tokens,
                file.usage.completion_tokens,
                estimate,
                2,
            )
            .ok()
        }),
    )
}

#[test]
fn fixture_file_name_describes_batch() {
    let descriptor = BatchDescriptor::parse(&fixture_response_path().to_string_lossy()).unwrap();
    assert_eq!(descriptor.setting, "V1.1_woTruth_0Examples_allUserPrompt");
    assert_eq!(descriptor.model, "gpt-4o-2024-08-06");
    assert_eq!(descriptor.n, 2);
    assert_eq!(descriptor.strategy_flags().unwrap().strategy(), Some(1));
}

#[tokio::test]
async fn perfect_responses_agree_fully() {
    let report = score_fixture("V1.1_woTruth_0Examples_allUserPrompt", 1, false).await;

    assert_eq!(report.scored_diagrams, 2);
    assert!(report.failures.is_empty());
    assert_eq!(report.rows.len(), 8);
    assert_eq!(report.extraction.metrics.accuracy, 1.0);
    assert_eq!(report.extraction.counts.false_positive, 0);
    assert_eq!(report.extraction.counts.false_negative, 0);
    assert_eq!(report.position.metrics.accuracy, 1.0);
    assert!(report.cost.is_some());
}

#[tokio::test]
async fn report_json_roundtrip() {
    let report = score_fixture("V1.1_woTruth_0Examples_allUserPrompt", 1, false).await;

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("report.json");
    report.save_json(&path).unwrap();
    let loaded = ScoringReport::load_json(&path).unwrap();

    assert_eq!(loaded.id, report.id);
    assert_eq!(loaded.source, report.source);
    assert_eq!(loaded.rows, report.rows);
    assert_eq!(loaded.extraction.counts, report.extraction.counts);
    assert_eq!(loaded.measures_table().len(), report.measures_table().len());
}

#[tokio::test]
async fn overview_orders_settings_by_strategy() {
    let worse = score_fixture("V1.1_wTruth_0Examples_allUserPrompt", 4, true).await;
    let perfect = score_fixture("V1.1_woTruth_0Examples_allUserPrompt", 1, false).await;

    assert!(worse.extraction.metrics.accuracy < perfect.extraction.metrics.accuracy);

    let overview = SettingsOverview::from_reports(&[worse, perfect]);
    assert_eq!(overview.rows.len(), 2);
    assert_eq!(overview.rows[0].strategy, Some(1));
    assert_eq!(overview.rows[1].strategy, Some(4));

    let markdown = overview.to_markdown();
    assert!(markdown.contains("V1.1_woTruth_0Examples_allUserPrompt"));
    assert!(markdown.contains("Avg."));
}

#[tokio::test]
async fn combined_rows_keep_report_origin() {
    let a = score_fixture("V1.1_woTruth_0Examples_allUserPrompt", 1, false).await;
    let b = score_fixture("V1.1_wTruth_0Examples_allUserPrompt", 4, true).await;

    let rows = combine(&[a, b]);
    assert_eq!(rows.len(), 16);
    assert!(rows[..8].iter().all(|r| r.strategy == Some(1)));
    assert!(rows[8..].iter().all(|r| r.strategy == Some(4)));
    assert!(rows.iter().all(|r| r.model == "gpt-4o-2024-08-06"));
}
