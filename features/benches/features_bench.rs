use criterion::{black_box, criterion_group, criterion_main, Criterion};
use phonex_features::{delta, Extractor, FeatureConfig};

fn tone(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = i as f32 / 16000.0;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.6
                + (2.0 * std::f32::consts::PI * 1900.0 * t).sin() * 0.3
        })
        .collect()
}

fn bench_extract(c: &mut Criterion) {
    let extractor = Extractor::new(FeatureConfig::default()).unwrap();
    let signal = tone(2048);

    c.bench_function("extract_2048_samples", |b| {
        b.iter(|| extractor.extract(black_box(&signal)).unwrap())
    });
}

fn bench_extract_set(c: &mut Criterion) {
    let extractor = Extractor::new(FeatureConfig {
        delta_delta: true,
        descriptors: true,
        ..Default::default()
    })
    .unwrap();
    let signal = tone(2048);

    c.bench_function("extract_set_with_streams", |b| {
        b.iter(|| extractor.extract_set(black_box(&signal)).unwrap())
    });
}

fn bench_delta(c: &mut Criterion) {
    let extractor = Extractor::new(FeatureConfig::default()).unwrap();
    let seq = extractor.extract(&tone(16000)).unwrap();

    c.bench_function("delta_one_second", |b| b.iter(|| delta(black_box(&seq)).unwrap()));
}

criterion_group!(benches, bench_extract, bench_extract_set, bench_delta);
criterion_main!(benches);
