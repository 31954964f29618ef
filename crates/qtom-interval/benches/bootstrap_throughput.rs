use criterion::{criterion_group, criterion_main, Criterion};

use qtom_est::{EstimatorMode, StateTomograph};
use qtom_interval::{BootstrapConfig, BootstrapInterval, IntervalEstimator};
use qtom_measure::MeasurementDesign;
use qtom_qobj::Qobj;

fn bootstrap_setup(c: &mut Criterion) {
    let mut tmg = StateTomograph::new(Qobj::fully_mixed(1)).with_seed(1);
    tmg.experiment(1000, MeasurementDesign::pauli_projective(1))
        .unwrap();
    let view = tmg.view(EstimatorMode::ProjectedLinear).unwrap();
    let target = Qobj::fully_mixed(1);

    c.bench_function("bootstrap_100_replicas", |bencher| {
        bencher.iter(|| {
            let config = BootstrapConfig {
                replicas: 100,
                seed: 99,
            };
            let mut interval =
                BootstrapInterval::new(view.clone(), target.clone(), config).unwrap();
            interval.setup().unwrap();
            interval.estimate(&[0.68, 0.95]).unwrap()
        })
    });
}

criterion_group!(benches, bootstrap_setup);
criterion_main!(benches);
