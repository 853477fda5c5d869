#![allow(
    clippy::string_slice,
    clippy::tests_outside_test_module,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    reason = "benchmark"
)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use switchplate::{Json, SwitchplateEngine, SwitchplateInterface, Template, render_document};

mod utils;

const TEMPLATE: &str = include_str!("../tests/templates/cluster.json.tmpl");

fn switchplate_benchmark(c: &mut Criterion) {
    let engine = SwitchplateEngine::new();
    engine.add_template("cluster", TEMPLATE).unwrap();

    // Generate 100 random contexts
    let contexts = utils::generate_random_contexts(100);

    let mut group = c.benchmark_group("Template Rendering");
    group.sample_size(50);

    group.bench_function("load", |b| {
        b.iter(|| black_box(Template::load(black_box(TEMPLATE)).unwrap()));
    });

    group.bench_function("render_validated", |b| {
        b.iter(|| {
            for context in &contexts {
                black_box(engine.render("cluster", context).unwrap());
            }
        });
    });

    let template = Template::load(TEMPLATE).unwrap();
    group.bench_function("render_without_registry", |b| {
        b.iter(|| {
            for context in &contexts {
                black_box(render_document(&template, context, &Json).unwrap());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, switchplate_benchmark);
criterion_main!(benches);
