//! Euler and RK4 integrators (C9): the shared per-step physics and the two
//! stepping schemes built on top of it.

use ballistics_core::{BallisticsError, Config, Vector3, WindSock};

use crate::dense::BaseTrajData;
use crate::shot::ShotProps;
use crate::trajectory::TerminationReason;

/// Which stepping scheme `Engine` should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegratorKind {
    Euler,
    Rk4,
}

/// Returned by a `StepHandler` to tell the integrator whether to keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    Stop,
}

/// Receives every raw sample the integrator produces, in order, including
/// the initial muzzle sample at `t = 0`.
pub trait StepHandler {
    fn on_sample(&mut self, sample: BaseTrajData) -> Result<ControlFlow, BallisticsError>;
}

/// Pure rate-of-change evaluation: drag (from the current relative Mach),
/// gravity, and Coriolis, all re-evaluated at each call. Shared by every
/// integrator stage so Euler and RK4 only differ in how they combine it.
fn acceleration(position: Vector3, velocity: Vector3, shot: &ShotProps, wind: &mut WindSock, config: &Config) -> (Vector3, f64) {
    let alt_ft = shot.alt0_ft + position.y;
    let (density_ratio, mach1_fps) = shot.atmosphere.update(alt_ft);

    let wind_vec = wind.vector_for_range(position.x);
    let relative = velocity - wind_vec;
    let speed = relative.norm();
    let mach = speed / mach1_fps.max(1e-9);

    let drag_factor = shot.drag_curve.drag_factor(mach, shot.bc);
    let km = density_ratio * speed * drag_factor;

    let gravity = Vector3::new(0.0, config.gravity_constant, 0.0);
    let accel = relative.scale(-km) + gravity + shot.coriolis.acceleration(velocity);
    (accel, mach)
}

struct State {
    position: Vector3,
    velocity: Vector3,
    time: f64,
}

fn initial_state(shot: &ShotProps) -> State {
    State { position: shot.initial_position(), velocity: shot.initial_velocity(), time: 0.0 }
}

/// Safety backstop against a runaway loop (e.g. misconfigured thresholds that
/// never trip); not a spec-mandated bound, just a defensive cap.
const MAX_STEPS: u64 = 2_000_000;

fn should_terminate(state: &State, shot: &ShotProps, config: &Config, range_limit_ft: f64) -> Option<TerminationReason> {
    if state.position.x >= range_limit_ft {
        return Some(TerminationReason::RangeLimitReached);
    }
    if state.velocity.norm() < config.minimum_velocity {
        return Some(TerminationReason::MinimumVelocity);
    }
    if state.position.y < config.maximum_drop {
        return Some(TerminationReason::MaximumDrop);
    }
    if shot.alt0_ft + state.position.y < config.minimum_altitude {
        return Some(TerminationReason::MinimumAltitude);
    }
    None
}

/// Run the configured integrator from the muzzle out to `range_limit_ft`
/// (or until a termination condition/handler stop fires), feeding every
/// sample to `handler`.
pub fn run(
    config: &Config,
    shot: &ShotProps,
    kind: IntegratorKind,
    range_limit_ft: f64,
    handler: &mut dyn StepHandler,
) -> Result<TerminationReason, BallisticsError> {
    let mut wind = shot.wind_sock();
    let mut state = initial_state(shot);
    let calc_step = shot.calc_step * config.step_multiplier;

    for _ in 0..MAX_STEPS {
        let (accel, mach) = acceleration(state.position, state.velocity, shot, &mut wind, config);
        let sample = BaseTrajData { time: state.time, position: state.position, velocity: state.velocity, mach };

        if handler.on_sample(sample)? == ControlFlow::Stop {
            return Ok(TerminationReason::HandlerRequestedStop);
        }
        if let Some(reason) = should_terminate(&state, shot, config, range_limit_ft) {
            return Ok(reason);
        }

        match kind {
            IntegratorKind::Euler => step_euler(&mut state, accel, calc_step),
            IntegratorKind::Rk4 => step_rk4(&mut state, shot, &mut wind, config, calc_step),
        }
    }

    Err(BallisticsError::SolverRuntimeError(format!(
        "integration exceeded the {MAX_STEPS} step safety cap without terminating"
    )))
}

fn step_euler(state: &mut State, accel: Vector3, calc_step: f64) {
    let dt = calc_step / state.velocity.x.abs().max(1.0);
    state.position += state.velocity.scale(dt);
    state.velocity += accel.scale(dt);
    state.time += dt;
}

fn step_rk4(state: &mut State, shot: &ShotProps, wind: &mut WindSock, config: &Config, calc_step: f64) {
    let dt = config.default_time_step * calc_step;

    let eval = |p: Vector3, v: Vector3, wind: &mut WindSock| -> (Vector3, Vector3) {
        let (a, _mach) = acceleration(p, v, shot, wind, config);
        (v, a)
    };

    let (k1v, k1a) = eval(state.position, state.velocity, wind);
    let (k2v, k2a) = eval(state.position + k1v.scale(0.5 * dt), state.velocity + k1a.scale(0.5 * dt), wind);
    let (k3v, k3a) = eval(state.position + k2v.scale(0.5 * dt), state.velocity + k2a.scale(0.5 * dt), wind);
    let (k4v, k4a) = eval(state.position + k3v.scale(dt), state.velocity + k3a.scale(dt), wind);

    state.position += (k1v + k2v.scale(2.0) + k3v.scale(2.0) + k4v).scale(dt / 6.0);
    state.velocity += (k1a + k2a.scale(2.0) + k3a.scale(2.0) + k4a).scale(dt / 6.0);
    state.time += dt;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballistics_core::{Atmosphere, Coriolis};
    use ballistics_models::tables::G7_KNOTS;
    use ballistics_models::DragCurve;
    use crate::filter::TrajFlag;

    struct Collector(Vec<BaseTrajData>);
    impl StepHandler for Collector {
        fn on_sample(&mut self, sample: BaseTrajData) -> Result<ControlFlow, BallisticsError> {
            self.0.push(sample);
            Ok(ControlFlow::Continue)
        }
    }

    fn flat_shot() -> ShotProps {
        ShotProps::new(
            0.22,
            0.0,
            12.0,
            1.2,
            0.308,
            175.0,
            0.0,
            0.0,
            2.0 / 12.0,
            0.0,
            0.0,
            1.0 / 15.0,
            2600.0,
            TrajFlag::RANGE,
            DragCurve::new(G7_KNOTS).unwrap(),
            Atmosphere::standard(),
            Coriolis::none(),
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn rk4_trajectory_is_monotone_downrange_and_terminates_in_range() {
        let shot = flat_shot();
        let config = Config::default();
        let mut collector = Collector(Vec::new());
        let reason = run(&config, &shot, IntegratorKind::Rk4, 3000.0, &mut collector).unwrap();
        assert_eq!(reason, TerminationReason::RangeLimitReached);
        assert!(collector.0.len() > 2);
        for w in collector.0.windows(2) {
            assert!(w[1].position.x >= w[0].position.x);
        }
    }

    #[test]
    fn euler_also_reaches_the_range_limit() {
        let shot = flat_shot();
        let config = Config::default();
        let mut collector = Collector(Vec::new());
        let reason = run(&config, &shot, IntegratorKind::Euler, 1000.0, &mut collector).unwrap();
        assert_eq!(reason, TerminationReason::RangeLimitReached);
    }

    #[test]
    fn handler_stop_halts_integration_immediately() {
        struct StopAfterTwo(u32);
        impl StepHandler for StopAfterTwo {
            fn on_sample(&mut self, _sample: BaseTrajData) -> Result<ControlFlow, BallisticsError> {
                self.0 += 1;
                Ok(if self.0 >= 2 { ControlFlow::Stop } else { ControlFlow::Continue })
            }
        }
        let shot = flat_shot();
        let config = Config::default();
        let mut stopper = StopAfterTwo(0);
        let reason = run(&config, &shot, IntegratorKind::Rk4, 100_000.0, &mut stopper).unwrap();
        assert_eq!(reason, TerminationReason::HandlerRequestedStop);
        assert_eq!(stopper.0, 2);
    }
}
