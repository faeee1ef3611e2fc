//! Property-based tests for the parameter store and derivative evaluation.
//!
//! Run with: cargo test -p sim-fiber-muscle -- proptest

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use sim_fiber_muscle::{
    find_fiber_equilibrium, EquilibriumConfig, FiberLengthMuscle, FixedPath, HillFiberConfig,
    HillFiberLaw, MuscleDefaults, StateSystem,
};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn arb_preset() -> impl Strategy<Value = HillFiberConfig> {
    prop_oneof![
        Just(HillFiberConfig::biceps()),
        Just(HillFiberConfig::quadriceps()),
        Just(HillFiberConfig::gastrocnemius()),
        Just(HillFiberConfig::soleus()),
    ]
}

// =============================================================================
// Parameter store
// =============================================================================

proptest! {
    #[test]
    fn proptest_defaults_round_trip(activation in 1e-6..10.0f64, length in 1e-6..10.0f64) {
        let mut defaults = MuscleDefaults::default();
        defaults.set_default_activation(activation).unwrap();
        defaults.set_default_fiber_length(length).unwrap();

        prop_assert_eq!(defaults.default_activation(), activation);
        prop_assert_eq!(defaults.default_fiber_length(), length);
    }

    #[test]
    fn proptest_rejected_defaults_keep_previous(bad in -10.0..=0.0f64) {
        let mut defaults = MuscleDefaults::default();
        let before = defaults;

        prop_assert!(defaults.set_default_activation(bad).is_err());
        prop_assert!(defaults.set_default_fiber_length(bad).is_err());
        prop_assert_eq!(defaults, before);
    }
}

// =============================================================================
// Derivative evaluation
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn proptest_derivatives_do_not_touch_values(
        config in arb_preset(),
        excitation in 0.0..=1.0f64,
        activation in 0.01..=1.0f64,
        stretch in 0.7..1.3f64,
    ) {
        let l_opt = config.optimal_fiber_length;
        let path = FixedPath::new(config.reference_path_length()).unwrap();
        let mut law = HillFiberLaw::new(config).unwrap();
        law.set_excitation(excitation).unwrap();

        let mut muscle = FiberLengthMuscle::new("m", law, path);
        muscle.set_default_activation(activation).unwrap();
        muscle.set_default_fiber_length(stretch * l_opt).unwrap();

        let mut system = StateSystem::new();
        muscle.declare_state_variables(&mut system).unwrap();
        let mut state = system.make_state();
        let values = state.values().clone();

        let first = muscle.compute_state_variable_derivatives(&mut state).unwrap();
        let second = muscle.compute_state_variable_derivatives(&mut state).unwrap();

        prop_assert_eq!(first, second);
        prop_assert_eq!(state.values(), &values);
        prop_assert!(first.fiber_velocity.is_finite());
        prop_assert_eq!(first.activation_rate > 0.0, excitation > activation);
    }

    #[test]
    fn proptest_isometric_force_grows_with_activation(
        config in arb_preset(),
        low in 0.05..0.5f64,
        high in 0.5..=1.0f64,
    ) {
        let l_opt = config.optimal_fiber_length;
        let path = FixedPath::new(config.reference_path_length()).unwrap();
        let mut muscle = FiberLengthMuscle::new("m", HillFiberLaw::new(config).unwrap(), path);
        muscle.set_default_fiber_length(l_opt).unwrap();

        let mut system = StateSystem::new();
        muscle.declare_state_variables(&mut system).unwrap();
        let state = system.make_state();

        let f_low = muscle.compute_isometric_force(&state, low).unwrap();
        let f_high = muscle.compute_isometric_force(&state, high).unwrap();
        prop_assert!(f_high >= f_low);
    }
}

// =============================================================================
// Equilibrium search
// =============================================================================

proptest! {
    #[test]
    fn proptest_linear_root_found_from_any_start(
        root in 0.02..0.4f64,
        start in 0.011..0.5f64,
    ) {
        let config = EquilibriumConfig::default();
        let eq = find_fiber_equilibrium(|l| Ok(root - l), start, (0.01, 0.5), &config).unwrap();

        prop_assert!((eq.fiber_length - root).abs() <= 10.0 * config.tolerance);
        prop_assert!(eq.residual_velocity.abs() <= 10.0 * config.tolerance);
    }
}
