use collabdown_engine::sync::{Position, Snapshot, offset_to_position, position_to_offset};
use criterion::{Criterion, criterion_group, criterion_main};

fn generate_document(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("- item {i} with some **bold** text and a [[link-{i}]]"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn bench_translation(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate");

    for lines in [100, 1_000, 10_000] {
        let text = generate_document(lines);
        let snapshot = Snapshot::from_text(&text);
        let end = snapshot.len_chars();
        let last_row = snapshot.line_count() - 1;

        group.bench_function(format!("snapshot_{lines}_lines"), |b| {
            b.iter(|| Snapshot::from_text(std::hint::black_box(&text)));
        });
        group.bench_function(format!("offset_to_position_end_{lines}_lines"), |b| {
            b.iter(|| offset_to_position(&snapshot, std::hint::black_box(end)));
        });
        group.bench_function(format!("position_to_offset_end_{lines}_lines"), |b| {
            b.iter(|| {
                position_to_offset(&snapshot, std::hint::black_box(Position::new(last_row, 0)))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_translation);
criterion_main!(benches);
