//! Benchmarks for command extraction from responder text.
//!
//! The parser runs once per responder reply, so it should stay well below
//! a millisecond even for long replies with nested arguments.

use std::time::Duration;

use conduit_chat::CommandParser;
use criterion::{criterion_group, criterion_main, Criterion};

/// Long narrative reply with an execute command near the end.
fn generate_reply_with_command(index: usize) -> String {
    format!(
        "The square is quiet this morning. A cart rattles past the mill and \
         the smell of bread drifts over from the market stalls. Ada pauses by \
         the well, turning over what the miller said yesterday about the \
         bridge and the coming storm. She decides it is worth writing down \
         before the details fade.\n\
         action-execute remember {{\"content\": \"Miller warned about the bridge, note {}\", \
         \"importance\": 0.7, \"tags\": {{\"place\": \"mill\", \"kind\": \"warning\"}}}}\n\
         Then she heads on.",
        index
    )
}

/// Same shape without any command (baseline).
fn generate_plain_reply(index: usize) -> String {
    format!(
        "The square is quiet this morning. A cart rattles past the mill and \
         the smell of bread drifts over from the market stalls. Ada pauses by \
         the well, turning over what the miller said yesterday about the \
         bridge and the coming storm. Reply {}.",
        index
    )
}

/// Reply whose arguments contain many stray closing braces.
fn generate_brace_heavy_reply(index: usize) -> String {
    let text = "} ".repeat(50);
    format!(
        "action-execute echo {{\"text\": \"{}\", \"n\": {}}}",
        text, index
    )
}

fn bench_parse(c: &mut Criterion) {
    let parser = CommandParser::new();
    let with_command: Vec<String> = (0..1000).map(generate_reply_with_command).collect();
    let plain: Vec<String> = (0..1000).map(generate_plain_reply).collect();
    let brace_heavy: Vec<String> = (0..100).map(generate_brace_heavy_reply).collect();

    let mut group = c.benchmark_group("command_parser");
    group.sample_size(200);
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("execute_in_narrative", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let parsed = parser.parse(&with_command[idx % with_command.len()]);
            idx += 1;
            parsed
        });
    });

    group.bench_function("plain_text", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let parsed = parser.parse(&plain[idx % plain.len()]);
            idx += 1;
            parsed
        });
    });

    group.bench_function("brace_heavy_arguments", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let parsed = parser.parse(&brace_heavy[idx % brace_heavy.len()]);
            idx += 1;
            parsed
        });
    });

    group.finish();
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
