//! Benchmarks for sam_mini command throughput.

use std::io;
use std::time::Duration;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use sam_mini::{EngineState, File, handle_command_with_output};

fn generate_sample_text(lines: usize) -> String {
    let mut text = String::new();
    for i in 0..lines {
        text.push_str(&format!(
            "Line {i}: the quick brown fox jumps over the lazy dog\n"
        ));
    }
    text
}

fn state_with(text: &str) -> EngineState {
    EngineState {
        files: vec![File::from_text(0, text)],
        active_file: 0,
    }
}

fn run(state: EngineState, command: &str) -> EngineState {
    let mut out = io::sink();
    handle_command_with_output(state, command, &mut out)
        .expect("benchmark command should succeed")
        .expect("benchmark command should not quit")
}

fn benchmark_line_addressing(c: &mut Criterion) {
    let text = generate_sample_text(10_000);

    c.bench_function("line addressing (10k lines)", |b| {
        b.iter(|| {
            let state = state_with(&text);
            black_box(run(state, black_box("5000")))
        });
    });
}

fn benchmark_regex_addressing(c: &mut Criterion) {
    let text = generate_sample_text(10_000);

    c.bench_function("regex addressing (10k lines)", |b| {
        b.iter(|| {
            let state = state_with(&text);
            black_box(run(state, black_box("/Line 9999/")))
        });
    });
}

fn benchmark_repeated_appends(c: &mut Criterion) {
    let text = generate_sample_text(1_000);

    c.bench_function("append with snapshot (x100)", |b| {
        b.iter(|| {
            let mut state = state_with(&text);
            for _ in 0..100 {
                state = run(state, black_box("a/more text/"));
            }
            black_box(state)
        });
    });
}

fn benchmark_substitute(c: &mut Criterion) {
    let text = generate_sample_text(1_000);

    c.bench_function("substitute over whole buffer", |b| {
        b.iter(|| {
            let state = state_with(&text);
            black_box(run(state, black_box(",s/fox/cat/")))
        });
    });
}

fn benchmark_for_each_rewrite(c: &mut Criterion) {
    let text = generate_sample_text(200);

    c.bench_function("for-each rewrite (200 matches)", |b| {
        b.iter(|| {
            let state = state_with(&text);
            black_box(run(state, black_box(",x/fox/ c/cat/")))
        });
    });
}

fn benchmark_undo_redo_cycle(c: &mut Criterion) {
    let text = generate_sample_text(1_000);
    let mut seeded = state_with(&text);
    for _ in 0..20 {
        seeded = run(seeded, "a/more/");
    }

    c.bench_function("undo/redo cycle (20 deep)", |b| {
        b.iter(|| {
            let state = run(seeded.clone(), black_box("u 20"));
            black_box(run(state, black_box("R 20")))
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets = benchmark_line_addressing,
              benchmark_regex_addressing,
              benchmark_repeated_appends,
              benchmark_substitute,
              benchmark_for_each_rewrite,
              benchmark_undo_redo_cycle
}
criterion_main!(benches);
