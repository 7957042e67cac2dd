use criterion::{black_box, criterion_group, criterion_main, Criterion};

use diagrameval_core::align::align;
use diagrameval_core::confusion::ConfusionCounts;
use diagrameval_core::model::{
    Code, CorrectPosition, Diagram, Extraction, Field, ModelResponse, PositionCode, ResponseBox,
};
use diagrameval_core::statistics::{AgreementMetrics, DimensionSummary};

fn make_diagram(i: usize) -> Diagram {
    let fields = (1..=4u8)
        .map(|n| Field {
            text: format!("answer {i} {n}"),
            field_number: n,
            link_number: Some(if n == 2 { 1 } else { n }),
            code: if (i + n as usize) % 5 == 0 {
                Code::Commission
            } else {
                Code::Good
            },
        })
        .collect();
    Diagram {
        id: format!("{i}_3A_Beton"),
        student_id: i.to_string(),
        class_id: "3A".into(),
        text_name: "Beton".into(),
        dataset: "target".into(),
        fields,
    }
}

fn make_response(i: usize) -> ModelResponse {
    let mut response = ModelResponse::default();
    for n in 1..=4u8 {
        let good = (i + n as usize) % 3 != 0;
        response.set(
            n,
            ResponseBox {
                extraction: if good {
                    Extraction::Good
                } else {
                    Extraction::Commission
                },
                position: if good {
                    PositionCode::LinksSelf
                } else {
                    PositionCode::NotApplicable
                },
                correct_position: CorrectPosition::Field(n),
            },
        );
    }
    response
}

fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("agreement_metrics");

    group.bench_function("balanced", |b| {
        let counts = ConfusionCounts::new(120, 30, 25, 80);
        b.iter(|| AgreementMetrics::compute(black_box(&counts)))
    });

    group.bench_function("empty", |b| {
        let counts = ConfusionCounts::default();
        b.iter(|| AgreementMetrics::compute(black_box(&counts)))
    });

    group.finish();
}

fn bench_align(c: &mut Criterion) {
    let mut group = c.benchmark_group("align");

    let pairs: Vec<(Diagram, ModelResponse)> =
        (0..500).map(|i| (make_diagram(i), make_response(i))).collect();

    group.bench_function("single_diagram", |b| {
        let (diagram, response) = &pairs[0];
        b.iter(|| align(black_box(diagram), black_box(response)))
    });

    group.bench_function("500_diagrams_with_summary", |b| {
        b.iter(|| {
            let rows: Vec<_> = pairs
                .iter()
                .filter_map(|(d, r)| align(d, r).ok())
                .flatten()
                .collect();
            (
                DimensionSummary::extraction(black_box(&rows)),
                DimensionSummary::position(black_box(&rows)),
            )
        })
    });

    group.finish();
}

criterion_group!(benches, bench_metrics, bench_align);
criterion_main!(benches);
