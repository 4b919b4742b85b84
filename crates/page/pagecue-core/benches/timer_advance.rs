use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pagecue_core::{Config, MemoryDocument, PageContext, PageSpec, Viewport};
use pagecue_test_fixtures::pages;

fn long_list() -> PageSpec {
    pages::load("long-list").expect("long-list fixture")
}

fn bench_stagger_drain(c: &mut Criterion) {
    let page = long_list();
    let mut group = c.benchmark_group("timer_advance");

    for step in [1u64, 16, 100] {
        group.bench_with_input(BenchmarkId::new("reveal_list", step), &step, |b, &step| {
            b.iter(|| {
                let (doc, _) = MemoryDocument::from_page(&page);
                let mut ctx = PageContext::new(Config::default(), doc).unwrap();
                ctx.init().unwrap();
                // a tall viewport sees every card at once
                ctx.set_viewport(Viewport::new(1280.0, 30_000.0));
                while ctx.pending_tasks() > 0 {
                    ctx.advance(step);
                }
                black_box(ctx.now_ms())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_stagger_drain);
criterion_main!(benches);
