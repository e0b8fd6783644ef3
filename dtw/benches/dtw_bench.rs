use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use phonex_cluster::{build_codebook, SearchConfig, SearchRegistry};
use phonex_dtw::{align, AlignmentMode, DtwConfig, Reference};
use phonex_features::{Extractor, FeatureConfig};

fn chirp(len: usize, base: f32) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = i as f32 / 16000.0;
            (2.0 * std::f32::consts::PI * (base + 400.0 * t) * t).sin()
        })
        .collect()
}

fn bench_align(c: &mut Criterion) {
    let extractor = Extractor::new(FeatureConfig {
        delta_delta: true,
        ..Default::default()
    })
    .unwrap();
    let a = extractor.extract_set(&chirp(4000, 300.0)).unwrap();
    let b = extractor.extract_set(&chirp(4800, 320.0)).unwrap();
    let cfg = DtwConfig::default();

    c.bench_function("align_raw", |bench| {
        bench.iter(|| align(black_box(&a), Reference::Prototype(&b), AlignmentMode::Raw, &cfg).unwrap())
    });
    c.bench_function("align_delta_delta", |bench| {
        bench.iter(|| {
            align(black_box(&a), Reference::Prototype(&b), AlignmentMode::DeltaDelta, &cfg).unwrap()
        })
    });

    let registry = Arc::new(SearchRegistry::new());
    let search = SearchConfig {
        seed: Some(5),
        ..Default::default()
    };
    let book = build_codebook(&[b.mfcc.values()], b.mfcc.coefficients(), 2, 0, &registry, &search).unwrap();
    c.bench_function("align_quantized", |bench| {
        bench.iter(|| align(black_box(&a), Reference::Codebook(&book), AlignmentMode::Quantized, &cfg).unwrap())
    });
}

criterion_group!(benches, bench_align);
criterion_main!(benches);
