use automl_select::pipeline::{cross_validate, default_candidates};
use automl_select::training::StratifiedKFold;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_classification_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let x = Array2::from_shape_fn((n_rows, n_features), |_| rng.gen_range(-2.0..2.0));
    let y: Array1<f64> = x
        .rows()
        .into_iter()
        .map(|row| if row[0] + 0.5 * row[1] > 0.0 { 1.0 } else { 0.0 })
        .collect();

    (x, y)
}

fn bench_cross_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cross_validation");
    group.sample_size(10); // Fewer samples for training benchmarks

    let registry = default_candidates(42);

    for n_rows in [100, 300].iter() {
        let (x, y) = create_classification_data(*n_rows, 13);
        let splits = StratifiedKFold::new(5).with_random_state(7).split(&y).unwrap();

        for candidate in registry.iter() {
            group.bench_with_input(
                BenchmarkId::new(candidate.name.as_str(), n_rows),
                &(&x, &y),
                |b, (x, y)| {
                    b.iter(|| cross_validate(&candidate.pipeline, black_box(x), black_box(y), &splits).unwrap())
                },
            );
        }
    }

    group.finish();
}

fn bench_fold_partition(c: &mut Criterion) {
    let (_, y) = create_classification_data(10_000, 2);

    c.bench_function("stratified_kfold_10k", |b| {
        b.iter(|| StratifiedKFold::new(5).with_random_state(7).split(black_box(&y)).unwrap())
    });
}

criterion_group!(benches, bench_cross_validation, bench_fold_partition);
criterion_main!(benches);
