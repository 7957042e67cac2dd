use criterion::{black_box, criterion_group, criterion_main, Criterion};

use diagrameval_core::model::RawRow;
use diagrameval_core::sampler::{derive_seed, sample};
use diagrameval_core::store::{DiagramStore, StoreOptions};

const TEXTS: [&str; 6] = ["Beton", "Botox", "Geld", "Metro", "Muziek", "Suez"];

fn make_rows(students: usize) -> Vec<RawRow> {
    let mut rows = Vec::with_capacity(students * TEXTS.len() * 4);
    for s in 0..students {
        for text in TEXTS {
            for n in 1..=4u8 {
                rows.push(RawRow {
                    student_id: s.to_string(),
                    class_id: format!("{}A", s % 4 + 1),
                    text_name: text.to_string(),
                    field_number: n,
                    link_number: Some(n),
                    text: format!("student {s} wrote something about {text} in box {n}"),
                    code: if (s + n as usize) % 4 == 0 { "c" } else { "g" }.to_string(),
                    dataset: "target".to_string(),
                });
            }
        }
    }
    rows
}

fn bench_grouping(c: &mut Criterion) {
    let mut group = c.benchmark_group("grouping");
    let options = StoreOptions::default();

    for students in [50, 500] {
        let rows = make_rows(students);
        group.bench_function(format!("{students}_students"), |b| {
            b.iter(|| DiagramStore::from_rows(black_box(&rows), black_box(&options)))
        });
    }

    group.finish();
}

fn bench_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampling");
    let store = DiagramStore::from_rows(&make_rows(500), &StoreOptions::default()).store;

    for k in [5, 25] {
        group.bench_function(format!("k={k}"), |b| {
            b.iter(|| {
                sample(
                    black_box(&store),
                    "17_2A_Beton",
                    "Beton",
                    k,
                    derive_seed(42, "17_2A_Beton"),
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_grouping, bench_sampling);
criterion_main!(benches);
