use approx::assert_relative_eq;
use nalgebra::{Vector1, Vector2};
use spacetwin::integrator::{ButcherTableau, BOGACKI_SHAMPINE_32, DORMAND_PRINCE_5, RUNGE_KUTTA_FEHLBERG_45};
use spacetwin::*;

/// `dx/dt = -k x`
struct Decay {
    k: f64,
}

impl Ode<1> for Decay {
    fn derivative(&self, _time: f64, state: &Vector1<f64>) -> Vector1<f64> {
        state * -self.k
    }
}

struct Still;

impl Ode<1> for Still {
    fn derivative(&self, _time: f64, _state: &Vector1<f64>) -> Vector1<f64> {
        Vector1::zeros()
    }
}

struct Oscillator;

impl Ode<2> for Oscillator {
    fn derivative(&self, _time: f64, state: &Vector2<f64>) -> Vector2<f64> {
        Vector2::new(state[1], -state[0])
    }
}

fn one_step_error(tableau: &'static ButcherTableau, step_width_s: f64) -> f64 {
    let mut rk = EmbeddedRungeKutta::new(tableau, step_width_s, Decay { k: 1.0 }).unwrap();
    rk.set_state(0.0, Vector1::new(1.0));
    rk.integrate();
    rk.local_truncation_error()
}

#[test]
fn test_dormand_prince_error_scales_with_fifth_power() {
    let errors: Vec<f64> = [0.1, 0.05, 0.025]
        .iter()
        .map(|h| one_step_error(&DORMAND_PRINCE_5, *h))
        .collect();

    for pair in errors.windows(2) {
        let ratio = pair[0] / pair[1];
        assert!((25.0..40.0).contains(&ratio), "ratio {ratio}");
    }
}

#[test]
fn test_fehlberg_error_scales_with_fifth_power() {
    let ratio = one_step_error(&RUNGE_KUTTA_FEHLBERG_45, 0.1) / one_step_error(&RUNGE_KUTTA_FEHLBERG_45, 0.05);
    assert!((25.0..40.0).contains(&ratio), "ratio {ratio}");
}

#[test]
fn test_bogacki_shampine_error_scales_with_cube() {
    let ratio = one_step_error(&BOGACKI_SHAMPINE_32, 0.1) / one_step_error(&BOGACKI_SHAMPINE_32, 0.05);
    assert!((6.0..10.0).contains(&ratio), "ratio {ratio}");
}

#[test]
fn test_decay_tracks_exact_solution() {
    let mut rk = EmbeddedRungeKutta::new(&DORMAND_PRINCE_5, 0.1, Decay { k: 0.5 }).unwrap();
    rk.set_state(0.0, Vector1::new(2.0));

    for _ in 0..20 {
        rk.integrate();
    }

    assert_relative_eq!(rk.current_time_s(), 2.0, epsilon = 1e-12);
    assert_relative_eq!(rk.state()[0], 2.0 * (-1.0_f64).exp(), max_relative = 1e-9);
}

#[test]
fn test_control_grows_step_when_error_below_tolerance() {
    let mut rk = EmbeddedRungeKutta::new(&DORMAND_PRINCE_5, 0.1, Decay { k: 1.0 }).unwrap();
    rk.set_state(0.0, Vector1::new(1.0));
    rk.integrate();
    assert!(rk.local_truncation_error() < 1e-6);

    let updated = rk.control_step_width(1e-6);

    assert!(updated > 0.1);
    assert_eq!(rk.step_width_s(), updated);
}

#[test]
fn test_control_shrinks_step_when_error_above_tolerance() {
    let mut rk = EmbeddedRungeKutta::new(&DORMAND_PRINCE_5, 0.1, Decay { k: 1.0 }).unwrap();
    rk.set_state(0.0, Vector1::new(1.0));
    rk.integrate();
    assert!(rk.local_truncation_error() > 1e-12);

    let updated = rk.control_step_width(1e-12);

    assert!(updated < 0.1);
    assert!(updated >= rk.limits().min_s);
}

#[test]
fn test_zero_error_selects_maximum_step() {
    let limits = StepLimits::new(1e-3, 5.0).unwrap();
    let mut rk = EmbeddedRungeKutta::new(&DORMAND_PRINCE_5, 0.1, Still).unwrap().with_limits(limits);
    rk.set_state(0.0, Vector1::new(4.0));
    rk.integrate();
    assert_eq!(rk.local_truncation_error(), 0.0);

    let updated = rk.control_step_width(1e-9);

    assert_eq!(updated, 5.0);
    assert!(updated.is_finite() && updated > 0.0);
}

#[test]
fn test_zero_tolerance_clamps_to_minimum() {
    let limits = StepLimits::new(1e-3, 5.0).unwrap();
    let mut rk = EmbeddedRungeKutta::new(&DORMAND_PRINCE_5, 0.1, Decay { k: 1.0 })
        .unwrap()
        .with_limits(limits);
    rk.set_state(0.0, Vector1::new(1.0));
    rk.integrate();

    assert_eq!(rk.control_step_width(0.0), 1e-3);
}

#[test]
fn test_invalid_tolerance_keeps_step_with_zero_error() {
    let limits = StepLimits::new(1e-3, 5.0).unwrap();
    let mut rk = EmbeddedRungeKutta::new(&DORMAND_PRINCE_5, 0.1, Still).unwrap().with_limits(limits);
    rk.set_state(0.0, Vector1::new(4.0));
    rk.integrate();
    assert_eq!(rk.local_truncation_error(), 0.0);

    assert_eq!(rk.control_step_width(-1e-9), 0.1);
    assert_eq!(rk.control_step_width(f64::NAN), 0.1);
    assert_eq!(rk.control_step_width(f64::INFINITY), 0.1);
    assert_eq!(rk.step_width_s(), 0.1);
}

#[test]
fn test_adaptive_run_holds_oscillator_energy() {
    let mut rk = EmbeddedRungeKutta::new(&DORMAND_PRINCE_5, 0.01, Oscillator).unwrap();
    rk.set_state(0.0, Vector2::new(1.0, 0.0));

    while rk.current_time_s() < 10.0 {
        rk.integrate();
        rk.control_step_width(1e-10);
    }

    let state = rk.state();
    let energy = state[0] * state[0] + state[1] * state[1];
    assert_relative_eq!(energy, 1.0, max_relative = 1e-6);
    assert!(rk.step_count() < 1000);
}

#[test]
fn test_schemes_select_their_tables() {
    assert_eq!(Scheme::DormandPrince5.tableau().name, DORMAND_PRINCE_5.name);
    assert_eq!(Scheme::BogackiShampine32.tableau().order, 2);

    let rk = EmbeddedRungeKutta::<1, _>::new(Scheme::RungeKuttaFehlberg45.tableau(), 1.0, Still).unwrap();
    assert_eq!(rk.order(), 4);
    assert_eq!(rk.tableau().stages(), 6);
}
