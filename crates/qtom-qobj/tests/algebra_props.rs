use proptest::prelude::*;

use qtom_qobj::Qobj;

fn physical_bloch() -> impl Strategy<Value = [f64; 3]> {
    // Components bounded so the Bloch norm stays inside the unit ball.
    (-0.55..0.55, -0.55..0.55, -0.55..0.55).prop_map(|(x, y, z)| [x, y, z])
}

proptest! {
    #[test]
    fn bloch_round_trips(components in physical_bloch()) {
        let bloch = [1.0, components[0], components[1], components[2]];
        let state = Qobj::from_bloch(&bloch).unwrap();
        let back = state.bloch();
        for (a, b) in bloch.iter().zip(back.iter()) {
            prop_assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn physical_states_have_unit_trace_and_self_fidelity(components in physical_bloch()) {
        let bloch = [1.0, components[0], components[1], components[2]];
        let state = Qobj::from_bloch(&bloch).unwrap();
        prop_assert!(state.is_physical_state(1e-10, 1e-9));
        let fid = state.fidelity(&state).unwrap();
        prop_assert!((fid - 1.0).abs() < 1e-8);
    }

    #[test]
    fn purity_matches_the_bloch_norm(components in physical_bloch()) {
        let bloch = [1.0, components[0], components[1], components[2]];
        let state = Qobj::from_bloch(&bloch).unwrap();
        let norm_sq: f64 = components.iter().map(|c| c * c).sum();
        let expected = (1.0 + norm_sq) / 2.0;
        prop_assert!((state.purity() - expected).abs() < 1e-10);
    }

    #[test]
    fn fidelity_is_symmetric(a in physical_bloch(), b in physical_bloch()) {
        let first = Qobj::from_bloch(&[1.0, a[0], a[1], a[2]]).unwrap();
        let second = Qobj::from_bloch(&[1.0, b[0], b[1], b[2]]).unwrap();
        let forward = first.fidelity(&second).unwrap();
        let backward = second.fidelity(&first).unwrap();
        prop_assert!((forward - backward).abs() < 1e-8);
    }
}
