use nalgebra::DMatrix;
use num_complex::Complex;

use qtom_core::QtomError;
use qtom_est::{EstimatorMode, ObjectKind, StateTomograph, TomographyView};
use qtom_interval::{
    BootstrapConfig, BootstrapInterval, HolderInterval, IntervalEstimator, MhmcConfig,
    MhmcInterval, PolytopeInterval, SugiyamaInterval,
};
use qtom_measure::MeasurementDesign;
use qtom_qobj::{Complex64, Qobj};

/// Binary projective settings onto |0⟩, |1⟩, |+⟩ and |+i⟩.
fn projector_settings() -> MeasurementDesign {
    let r = 1.0 / 2.0_f64.sqrt();
    let amplitude_sets: [[Complex64; 2]; 4] = [
        [Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)],
        [Complex::new(0.0, 0.0), Complex::new(1.0, 0.0)],
        [Complex::new(r, 0.0), Complex::new(r, 0.0)],
        [Complex::new(r, 0.0), Complex::new(0.0, r)],
    ];
    let settings = amplitude_sets
        .iter()
        .map(|amps| {
            let proj = Qobj::pure(amps).unwrap();
            let complement = DMatrix::<Complex64>::identity(2, 2) - proj.matrix();
            vec![proj, Qobj::from_matrix(complement).unwrap()]
        })
        .collect();
    MeasurementDesign::from_settings(settings).unwrap()
}

fn mixed_state_view(shots: u64) -> TomographyView {
    let mut tmg = StateTomograph::new(Qobj::fully_mixed(1)).with_seed(17);
    tmg.experiment(shots, projector_settings()).unwrap();
    tmg.view(EstimatorMode::ProjectedLinear).unwrap()
}

fn fast_bootstrap() -> BootstrapConfig {
    BootstrapConfig {
        replicas: 60,
        seed: 4242,
    }
}

fn fast_mhmc() -> MhmcConfig {
    MhmcConfig {
        chains: 2,
        steps: 400,
        burn_in: 100,
        thinning: 5,
        step_size: 0.05,
        seed: 777,
    }
}

fn widths(report: &qtom_interval::ConfidenceReport) -> Vec<f64> {
    report
        .fidelity_min
        .iter()
        .zip(report.fidelity_max.iter())
        .map(|(lo, hi)| hi - lo)
        .collect()
}

#[test]
fn holder_brackets_self_fidelity_of_the_mixed_state() {
    // 1000 shots per setting from the maximally mixed state; the target is
    // the state itself, so the bounds must bracket fidelity one.
    let view = mixed_state_view(1000);
    let target = Qobj::fully_mixed(1);
    let bloch = view.estimate().bloch();
    let norm = (bloch[1] * bloch[1] + bloch[2] * bloch[2] + bloch[3] * bloch[3]).sqrt();
    assert!(norm < 0.2, "estimate Bloch norm {norm}");

    let mut interval = HolderInterval::new(view, target).unwrap();
    interval.setup().unwrap();
    let report = interval.estimate(&[0.68, 0.95]).unwrap();
    for (lo, hi) in report.fidelity_min.iter().zip(report.fidelity_max.iter()) {
        assert!(*lo <= 1.0 && 1.0 <= *hi, "interval [{lo}, {hi}] misses 1.0");
    }
}

#[test]
fn estimate_before_setup_is_not_ready_for_every_method() {
    let view = mixed_state_view(300);
    let target = Qobj::fully_mixed(1);
    let levels = [0.9];

    let polytope = PolytopeInterval::new(view.clone(), target.clone()).unwrap();
    assert!(matches!(
        polytope.estimate(&levels),
        Err(QtomError::NotReady(_))
    ));
    let holder = HolderInterval::new(view.clone(), target.clone()).unwrap();
    assert!(matches!(
        holder.estimate(&levels),
        Err(QtomError::NotReady(_))
    ));
    let sugiyama = SugiyamaInterval::new(view.clone(), target.clone()).unwrap();
    assert!(matches!(
        sugiyama.estimate(&levels),
        Err(QtomError::NotReady(_))
    ));
    let bootstrap =
        BootstrapInterval::new(view.clone(), target.clone(), fast_bootstrap()).unwrap();
    assert!(matches!(
        bootstrap.estimate(&levels),
        Err(QtomError::NotReady(_))
    ));
    let mhmc = MhmcInterval::new(view, target, fast_mhmc()).unwrap();
    assert!(matches!(mhmc.estimate(&levels), Err(QtomError::NotReady(_))));
}

#[test]
fn bootstrap_reports_replay_for_a_fixed_seed() {
    let view = mixed_state_view(500);
    let target = Qobj::fully_mixed(1);
    let mut first = BootstrapInterval::new(view.clone(), target.clone(), fast_bootstrap()).unwrap();
    let mut second = BootstrapInterval::new(view, target, fast_bootstrap()).unwrap();
    first.setup().unwrap();
    second.setup().unwrap();
    let a = first.estimate(&[0.68, 0.95]).unwrap();
    let b = second.estimate(&[0.68, 0.95]).unwrap();
    assert_eq!(a, b);
}

#[test]
fn mhmc_reports_replay_for_a_fixed_seed() {
    let view = mixed_state_view(500);
    let target = Qobj::fully_mixed(1);
    let mut first = MhmcInterval::new(view.clone(), target.clone(), fast_mhmc()).unwrap();
    let mut second = MhmcInterval::new(view, target, fast_mhmc()).unwrap();
    first.setup().unwrap();
    second.setup().unwrap();
    let a = first.estimate(&[0.9]).unwrap();
    let b = second.estimate(&[0.9]).unwrap();
    assert_eq!(a, b);
}

#[test]
fn higher_confidence_is_never_narrower_for_any_method() {
    let view = mixed_state_view(1000);
    let target = Qobj::fully_mixed(1);
    let levels = [0.5, 0.9, 0.99];

    let reports = {
        let mut holder = HolderInterval::new(view.clone(), target.clone()).unwrap();
        holder.setup().unwrap();
        let mut sugiyama = SugiyamaInterval::new(view.clone(), target.clone()).unwrap();
        sugiyama.setup().unwrap();
        let mut polytope = PolytopeInterval::new(view.clone(), target.clone()).unwrap();
        polytope.setup().unwrap();
        let mut bootstrap =
            BootstrapInterval::new(view.clone(), target.clone(), fast_bootstrap()).unwrap();
        bootstrap.setup().unwrap();
        let mut mhmc = MhmcInterval::new(view, target, fast_mhmc()).unwrap();
        mhmc.setup().unwrap();
        vec![
            holder.estimate(&levels).unwrap(),
            sugiyama.estimate(&levels).unwrap(),
            polytope.estimate(&levels).unwrap(),
            bootstrap.estimate(&levels).unwrap(),
            mhmc.estimate(&levels).unwrap(),
        ]
    };
    for report in reports {
        let w = widths(&report);
        for pair in w.windows(2) {
            assert!(
                pair[1] >= pair[0] - 1e-12,
                "widths {w:?} not monotone in confidence ({:?})",
                report.diagnostics
            );
        }
    }
}

#[test]
fn holder_is_never_narrower_than_polytope_or_sugiyama() {
    let view = mixed_state_view(1000);
    let target = Qobj::fully_mixed(1);
    let levels = [0.68, 0.95];

    let mut holder = HolderInterval::new(view.clone(), target.clone()).unwrap();
    holder.setup().unwrap();
    let mut polytope = PolytopeInterval::new(view.clone(), target.clone()).unwrap();
    polytope.setup().unwrap();
    let mut sugiyama = SugiyamaInterval::new(view, target).unwrap();
    sugiyama.setup().unwrap();

    let holder_widths = widths(&holder.estimate(&levels).unwrap());
    let polytope_widths = widths(&polytope.estimate(&levels).unwrap());
    let sugiyama_widths = widths(&sugiyama.estimate(&levels).unwrap());
    for ((h, p), s) in holder_widths
        .iter()
        .zip(polytope_widths.iter())
        .zip(sugiyama_widths.iter())
    {
        assert!(h + 1e-12 >= *p, "holder {h} narrower than polytope {p}");
        assert!(h + 1e-12 >= *s, "holder {h} narrower than sugiyama {s}");
    }
}

#[test]
fn deterministic_widths_shrink_with_more_shots() {
    let target = Qobj::fully_mixed(1);
    let levels = [0.9];
    let mut small_holder = HolderInterval::new(mixed_state_view(1000), target.clone()).unwrap();
    let mut large_holder = HolderInterval::new(mixed_state_view(4000), target.clone()).unwrap();
    small_holder.setup().unwrap();
    large_holder.setup().unwrap();
    let small = widths(&small_holder.estimate(&levels).unwrap())[0];
    let large = widths(&large_holder.estimate(&levels).unwrap())[0];
    assert!(large < small, "holder width grew with shots: {large} vs {small}");

    let mut small_polytope = PolytopeInterval::new(mixed_state_view(1000), target.clone()).unwrap();
    let mut large_polytope = PolytopeInterval::new(mixed_state_view(4000), target).unwrap();
    small_polytope.setup().unwrap();
    large_polytope.setup().unwrap();
    let small = widths(&small_polytope.estimate(&levels).unwrap())[0];
    let large = widths(&large_polytope.estimate(&levels).unwrap())[0];
    assert!(large < small, "polytope width grew with shots: {large} vs {small}");
}

#[test]
fn contradictory_counts_make_the_polytope_infeasible() {
    // Two settings measuring the same projector with opposite outcomes leave
    // no Bloch vector inside both slabs.
    let up = Qobj::pure(&[Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)]).unwrap();
    let complement =
        Qobj::from_matrix(DMatrix::<Complex64>::identity(2, 2) - up.matrix()).unwrap();
    let effects = vec![
        vec![up.clone(), complement.clone()],
        vec![up, complement],
    ];
    let counts = vec![vec![999, 1], vec![1, 999]];
    let view =
        TomographyView::new(effects, counts, EstimatorMode::LinearInversion, ObjectKind::State)
            .unwrap();
    let target = Qobj::fully_mixed(1);
    let mut interval = PolytopeInterval::new(view, target).unwrap();
    interval.setup().unwrap();
    assert!(matches!(
        interval.estimate(&[0.68]),
        Err(QtomError::InfeasibleRegion(_))
    ));
}

#[test]
fn bootstrap_interval_tracks_a_pure_target() {
    // Tomograph a |0⟩-like state and ask for fidelity bounds against |0⟩.
    let up = Qobj::pure(&[Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)]).unwrap();
    let mut tmg = StateTomograph::new(up.clone()).with_seed(23);
    tmg.experiment(1000, projector_settings()).unwrap();
    let view = tmg.view(EstimatorMode::ProjectedLinear).unwrap();
    let mut interval = BootstrapInterval::new(view, up, fast_bootstrap()).unwrap();
    interval.setup().unwrap();
    let report = interval.estimate(&[0.95]).unwrap();
    assert!(report.fidelity_max[0] > 0.95, "{report:?}");
    assert!(report.fidelity_min[0] > 0.8, "{report:?}");
}
