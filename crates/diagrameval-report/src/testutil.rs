use diagrameval_core::align::align;
use diagrameval_core::cost::{CostBreakdown, PriceTable};
use diagrameval_core::engine::{ItemFailure, ScoredBatch};
use diagrameval_core::model::{
    Code, CorrectPosition, Diagram, Extraction, Field, ModelResponse, PositionCode, ResponseBox,
};
use diagrameval_core::report::{ReportSource, ScoringReport};
use diagrameval_core::setting::builtin_settings;

fn diagram() -> Diagram {
    let fields = [
        (1, Some(1), Code::Good),
        (2, Some(1), Code::Good),
        (3, Some(3), Code::Commission),
        (4, Some(4), Code::Good),
    ]
    .into_iter()
    .map(|(n, link, code)| Field {
        text: format!("answer 1 {n}"),
        field_number: n,
        link_number: link,
        code,
    })
    .collect();
    Diagram {
        id: "1_3A_Beton".into(),
        student_id: "1".into(),
        class_id: "3A".into(),
        text_name: "Beton".into(),
        dataset: "target".into(),
        fields,
    }
}

fn response() -> ModelResponse {
    let boxes = [
        (Extraction::Good, PositionCode::LinksSelf, 1),
        (Extraction::Commission, PositionCode::LinksElsewhere, 1),
        (Extraction::Commission, PositionCode::NotApplicable, 3),
        (Extraction::Good, PositionCode::LinksSelf, 4),
    ];
    let mut response = ModelResponse::default();
    for (n, (extraction, position, correct)) in (1..=4).zip(boxes) {
        response.set(
            n,
            ResponseBox {
                extraction,
                position,
                correct_position: CorrectPosition::Field(correct),
            },
        );
    }
    response
}

/// One-diagram report: Extraction TP 2, FN 1, FP 0, TN 1; Position TP 2.
///
/// Priced at 2,000,000 input and 100,000 output tokens when the model has a
/// default price.
pub(crate) fn sample_report(setting: &str, model: &str, failures: usize) -> ScoringReport {
    let failures: Vec<ItemFailure> = (0..failures)
        .map(|i| ItemFailure {
            id: format!("{}_3A_Beton", i + 2),
            error: format!("response for {}_3A_Beton is missing Box_3", i + 2),
        })
        .collect();
    let n_diagrams = 1 + failures.len();
    let scored = ScoredBatch {
        rows: align(&diagram(), &response()).unwrap(),
        scored_diagrams: 1,
        failures,
    };
    let cost = PriceTable::default()
        .estimate(2_000_000, 100_000, model)
        .ok()
        .map(|estimate| CostBreakdown::new(2_000_000, 100_000, estimate, n_diagrams).unwrap());
    let strategy = builtin_settings()
        .into_iter()
        .find(|s| s.name == setting)
        .and_then(|s| s.strategy());

    ScoringReport::new(
        ReportSource {
            file: format!("2025-09-14_{setting}_{model}_n{n_diagrams}.jsonl"),
            setting: Some(setting.to_string()),
            model: model.to_string(),
            strategy,
        },
        n_diagrams,
        scored,
        cost,
    )
}
