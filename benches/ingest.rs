//! Ingestion throughput benchmarks
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use dumpdex::config::IngestConfig;
use dumpdex::ingest::run_ingest;
use dumpdex::output::Console;
use dumpdex::source::{Pull, RecordSource, WikimediaOptions, WikimediaSource};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Synthetic dump with `pages` articles of a few hundred words each
fn synthetic_dump(pages: usize) -> String {
    const WORDS: &[&str] = &[
        "analytical", "engine", "turing", "machine", "lambda", "calculus", "compiler",
        "history", "europe", "river", "mountain", "population", "century", "language",
    ];

    let mut xml = String::from("<mediawiki>\n");
    for i in 0..pages {
        let mut body = String::new();
        for j in 0..300 {
            let _ = write!(body, "{} ", WORDS[(i * 7 + j * 13) % WORDS.len()]);
        }
        let _ = write!(
            xml,
            "<page><title>Article {i}</title><ns>0</ns><id>{id}</id><revision><id>{rev}</id>\
             <timestamp>2024-01-01T00:00:00Z</timestamp><text>{body}</text></revision></page>\n",
            id = i + 1,
            rev = 1_000_000 + i,
        );
    }
    xml.push_str("</mediawiki>\n");
    xml
}

fn write_dump(pages: usize) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("enwiki-bench.xml");
    fs::write(&path, synthetic_dump(pages)).expect("Failed to write dump");
    (temp_dir, path)
}

fn bench_dump_parsing(c: &mut Criterion) {
    let (_temp_dir, dump) = write_dump(1_000);
    let size = fs::metadata(&dump).map(|m| m.len()).unwrap_or(0);

    let mut group = c.benchmark_group("dump_parsing");
    group.throughput(Throughput::Bytes(size));
    group.bench_function("1k_pages", |b| {
        b.iter(|| {
            let mut source = WikimediaSource::open(&dump, WikimediaOptions::default())
                .expect("Failed to open dump");
            let mut count = 0u64;
            while let Ok(Pull::Record(record)) = source.next_record() {
                black_box(record);
                count += 1;
            }
            count
        })
    });
    group.finish();
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");
    group.sample_size(10);

    for pages in [500usize, 2_000] {
        let (temp_dir, dump) = write_dump(pages);
        let out = temp_dir.path().join("index");

        group.throughput(Throughput::Elements(pages as u64));
        group.bench_with_input(BenchmarkId::from_parameter(pages), &pages, |b, _| {
            let config = IngestConfig {
                commit_interval: 1_000,
                ..IngestConfig::default()
            };
            b.iter(|| {
                run_ingest(&config, &dump, &out, Console::silent()).expect("Failed to ingest")
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dump_parsing, bench_ingest);
criterion_main!(benches);
