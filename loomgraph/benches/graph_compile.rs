//! Benchmarks `GraphBuilder::compile`'s structural validation — edge-list
//! scanning, entry/unknown-vertex checks, and the cycle/reachability
//! diagnostics — across linear chains of increasing vertex count.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use loomgraph::graphs::GraphBuilder;
use loomgraph::message::Message;
use loomgraph::state::{JsonState, JsonUpdate};
use loomgraph::types::VertexId;
use loomgraph::vertex::transform::TransformConfig;
use loomgraph::vertex::{Vertex, VertexKind};
use std::sync::Arc;

fn noop(id: String) -> Vertex<JsonState> {
    Vertex::new(
        id,
        VertexKind::Transform(TransformConfig::new(Arc::new(
            |_s: &JsonState, _m: &[Message]| JsonUpdate::empty(),
        ))),
    )
}

fn linear_chain(len: usize) -> GraphBuilder<JsonState> {
    let mut builder = GraphBuilder::new();
    for i in 0..len {
        builder = builder.add_vertex(noop(format!("v{i}")));
    }
    builder = builder.entry("v0");
    for i in 0..len.saturating_sub(1) {
        builder = builder.add_edge(format!("v{i}"), format!("v{}", i + 1));
    }
    builder.add_edge(format!("v{}", len - 1), VertexId::end())
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_compile");
    for size in [8usize, 64, 512] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || linear_chain(size),
                |builder| builder.compile().unwrap(),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
