use cardshot::memory::MemoryBackend;
use cardshot::{
    BrowserPool, CardRenderer, PoolConfig, RenderConfig, RenderRequest, StaticConsumerConfig,
};
use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn dynamic_request() -> RenderRequest {
    RenderRequest::new(
        "dynamic",
        json!({
            "id_str": "1",
            "type": "DYNAMIC_TYPE_DRAW",
            "modules": {
                "module_author": {"name": "A", "face": "f", "pub_ts": 1700000000},
                "module_dynamic": {
                    "desc": {"rich_text_nodes": [
                        {"type": "RICH_TEXT_NODE_TYPE_TEXT", "text": "hello "},
                        {"type": "RICH_TEXT_NODE_TYPE_AT", "text": "@u"}
                    ]},
                    "major": {"type": "MAJOR_TYPE_DRAW", "draw": {"items": [
                        {"src": "a"}, {"src": "b"}, {"src": "c"}, {"src": "d"}
                    ]}}
                },
                "module_stat": {"like": {"count": 12}, "comment": {"count": 3}, "forward": {"count": 1}}
            }
        }),
    )
    .expect("valid request")
}

fn renderer() -> CardRenderer {
    let pool = BrowserPool::new(PoolConfig::default(), MemoryBackend::new()).expect("pool");
    CardRenderer::new(pool, Arc::new(StaticConsumerConfig::new())).with_config(RenderConfig {
        settle_delay: Duration::ZERO,
        ..RenderConfig::default()
    })
}

fn bench_prepare(c: &mut Criterion) {
    let renderer = renderer();
    let request = dynamic_request();
    c.bench_function("prepare_dynamic_document", |b| {
        b.iter(|| renderer.prepare(&request).expect("prepare"))
    });
}

fn bench_render_memory(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let renderer = renderer();
    let request = dynamic_request();
    c.bench_function("render_dynamic_memory_backend", |b| {
        b.iter(|| rt.block_on(renderer.render(&request)).expect("render"))
    });
    rt.block_on(renderer.pool().shutdown()).expect("shutdown");
}

criterion_group!(benches, bench_prepare, bench_render_memory);
criterion_main!(benches);
