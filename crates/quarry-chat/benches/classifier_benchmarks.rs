//! Benchmarks for streamed narration classification.
//!
//! Measures the per-delta cost of `StreamClassifier::feed` on realistic agent
//! output cut into provider-sized chunks, including chunkings that split the
//! delimiters, and the cost of artifact enrichment on tool results.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use quarry_chat::artifact::{extract_from_html, ArtifactEnricher};
use quarry_chat::classifier::{Delimiters, StreamClassifier};
use quarry_core::config::ArtifactConfig;

/// One exchange's worth of agent text with two narration regions.
fn generate_transcript(index: usize) -> String {
    format!(
        "<thinking>The question asks for revenue per region in quarter {}. \
         I should aggregate the sales table by region and compare totals \
         before plotting anything.</thinking>Revenue is concentrated in the \
         north and west regions, which together account for most of the \
         quarter's sales. <thinking>A bar chart will make the comparison \
         clear; sorting descending keeps the leader first.</thinking>The \
         chart below ranks every region by total revenue, reference {}.",
        index % 4 + 1,
        index
    )
}

/// Cut `text` into chunks of roughly `size` bytes on char boundaries.
fn chunk(text: &str, size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if current.len() >= size {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn classify(chunks: &[String]) -> usize {
    let mut classifier = StreamClassifier::new(Delimiters::default());
    let mut emitted = 0;
    for delta in chunks {
        emitted += classifier.feed(delta).len();
    }
    emitted + usize::from(classifier.flush().is_some())
}

fn bench_stream_classification(c: &mut Criterion) {
    let transcripts: Vec<String> = (0..100).map(generate_transcript).collect();
    let small: Vec<Vec<String>> = transcripts.iter().map(|t| chunk(t, 3)).collect();
    let typical: Vec<Vec<String>> = transcripts.iter().map(|t| chunk(t, 24)).collect();
    let whole: Vec<Vec<String>> = transcripts.iter().map(|t| vec![t.clone()]).collect();

    let mut group = c.benchmark_group("stream_classification");
    group.sample_size(200);
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("three_byte_deltas", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let emitted = classify(&small[idx % small.len()]);
            idx += 1;
            emitted
        });
    });

    group.bench_function("token_sized_deltas", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let emitted = classify(&typical[idx % typical.len()]);
            idx += 1;
            emitted
        });
    });

    // Baseline: one delta per exchange
    group.bench_function("single_delta", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let emitted = classify(&whole[idx % whole.len()]);
            idx += 1;
            emitted
        });
    });

    group.bench_function("split_narration_complete_text", |b| {
        let delimiters = Delimiters::default();
        let mut idx = 0usize;
        b.iter(|| {
            let split = delimiters.split_narration(&transcripts[idx % transcripts.len()]);
            idx += 1;
            split
        });
    });

    group.finish();
}

fn bench_artifact_enrichment(c: &mut Criterion) {
    let enricher = ArtifactEnricher::new(&ArtifactConfig::default(), std::env::temp_dir());
    let table_result = "Table created: Top customers\nSaved to: output/top_customers.csv\nShape: 10 rows x 3 columns";
    let plain_result = "Query executed successfully.\nResult: 12 rows x 4 columns";

    let points: Vec<String> = (0..500).map(|i| i.to_string()).collect();
    let chart_html = format!(
        "<html><body><div id=\"g\"></div><script>Plotly.newPlot(\"g\", [{{\"type\": \"bar\", \"y\": [{}]}}], {{\"title\": \"Sales\"}})</script></body></html>",
        points.join(",")
    );

    let mut group = c.benchmark_group("artifact_enrichment");
    group.sample_size(200);

    group.bench_function("table_reference", |b| {
        b.iter(|| enricher.enrich("visualize", table_result));
    });

    group.bench_function("plain_result", |b| {
        b.iter(|| enricher.enrich("query_data", plain_result));
    });

    group.bench_function("chart_extraction_500_points", |b| {
        b.iter(|| extract_from_html(&chart_html));
    });

    group.finish();
}

criterion_group!(benches, bench_stream_classification, bench_artifact_enrichment);
criterion_main!(benches);
