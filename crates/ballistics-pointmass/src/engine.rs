//! Engine facade (C10): owns one shot's config and properties behind a
//! reentrant lock so the search layer can temporarily override a couple of
//! fields across nested calls without ever observing a half-written state.

use std::cell::RefCell;

use ballistics_core::{BallisticsError, Config};
use parking_lot::ReentrantMutex;

use crate::dense::{BaseTrajData, DenseBuffer, InterpKey};
use crate::filter::EventFilter;
use crate::integrator::{self, ControlFlow, IntegratorKind, StepHandler};
use crate::shot::ShotProps;
use crate::trajectory::{derive_row, HitResult, TerminationReason, TrajectoryData};

struct EngineState {
    config: Config,
    shot: ShotProps,
}

/// Owns one shot's config and properties for the lifetime of however many
/// `integrate`/`integrate_at`/search calls the caller makes against it.
pub struct Engine {
    integrator: IntegratorKind,
    state: ReentrantMutex<RefCell<EngineState>>,
}

/// Output of one `integrate` call: the sparse event rows plus, if requested,
/// every raw sample the integrator produced.
pub struct IntegrateOutput {
    pub hit: HitResult,
    pub dense: Option<DenseBuffer>,
}

impl Engine {
    pub fn new(config: Config, shot: ShotProps, integrator: IntegratorKind) -> Self {
        Self { integrator, state: ReentrantMutex::new(RefCell::new(EngineState { config, shot })) }
    }

    pub fn config(&self) -> Config {
        let guard = self.state.lock();
        guard.borrow().config
    }

    pub fn shot(&self) -> ShotProps {
        let guard = self.state.lock();
        guard.borrow().shot.clone()
    }

    fn snapshot(&self) -> (Config, ShotProps) {
        let guard = self.state.lock();
        let s = guard.borrow();
        (s.config, s.shot.clone())
    }

    /// Temporarily overwrite `barrel_elevation_rad` (if `angle` is `Some`)
    /// and, if `relaxed`, disable the velocity/drop termination thresholds
    /// for the duration of `f`, restoring both afterward. Reentrant: `f` is
    /// free to call back into `Engine` (e.g. `integrate`) without deadlocking.
    pub fn with_override<R>(
        &self,
        angle: Option<f64>,
        filter_flags: Option<crate::filter::TrajFlag>,
        relaxed: bool,
        f: impl FnOnce() -> R,
    ) -> R {
        let guard = self.state.lock();
        let (saved_angle, saved_flags, saved_config) = {
            let mut s = guard.borrow_mut();
            let saved_angle = s.shot.barrel_elevation_rad;
            let saved_flags = s.shot.filter_flags;
            let saved_config = s.config;
            if let Some(a) = angle {
                s.shot.barrel_elevation_rad = a;
            }
            if let Some(flags) = filter_flags {
                s.shot.filter_flags = flags;
            }
            if relaxed {
                s.config.minimum_velocity = 0.0;
                s.config.maximum_drop = f64::NEG_INFINITY;
            }
            (saved_angle, saved_flags, saved_config)
        };

        let result = f();

        let mut s = guard.borrow_mut();
        s.shot.barrel_elevation_rad = saved_angle;
        s.shot.filter_flags = saved_flags;
        s.config = saved_config;
        result
    }

    /// Integrate the whole trajectory out to `range_limit_ft`, sampling event
    /// rows every `range_step_ft` (0 disables range sampling) and, if
    /// `time_step > 0`, every `time_step` seconds too. When `want_dense` is
    /// set, every raw sample is also retained for later `DenseBuffer` queries.
    pub fn integrate(&self, range_limit_ft: f64, range_step_ft: f64, time_step: f64, want_dense: bool) -> Result<IntegrateOutput, BallisticsError> {
        let (config, shot) = self.snapshot();
        let mut filter = EventFilter::new(&shot, range_step_ft, range_limit_ft, time_step, config.separate_row_time_delta);
        let mut dense = want_dense.then(DenseBuffer::new);
        let mut last_sample: Option<BaseTrajData> = None;

        let termination = {
            let mut handler = IntegrateHandler { filter: &mut filter, dense: dense.as_mut(), last_sample: &mut last_sample };
            integrator::run(&config, &shot, self.integrator, range_limit_ft, &mut handler)?
        };

        if let Some(last) = last_sample {
            filter.finalize(last)?;
        }

        Ok(IntegrateOutput { hit: HitResult { rows: filter.into_rows(), termination }, dense })
    }

    /// Integrate until `key` crosses `target_value`, returning the
    /// interpolated raw sample and its derived row. Errors with
    /// `InterceptionError` if the trajectory ends without crossing.
    pub fn integrate_at(&self, key: InterpKey, target_value: f64) -> Result<(BaseTrajData, TrajectoryData), BallisticsError> {
        let (config, shot) = self.snapshot();
        let mut interceptor = SinglePointInterceptor::new(key, target_value);
        integrator::run(&config, &shot, self.integrator, config.max_integration_range, &mut interceptor)?;

        let base = interceptor
            .result
            .ok_or_else(|| BallisticsError::InterceptionError(format!("{key:?} never crossed {target_value}")))?;
        let row = derive_row(base, &shot, crate::filter::TrajFlag::NONE);
        Ok((base, row))
    }
}

struct IntegrateHandler<'a, 'b> {
    filter: &'a mut EventFilter<'b>,
    dense: Option<&'a mut DenseBuffer>,
    last_sample: &'a mut Option<BaseTrajData>,
}

impl<'a, 'b> StepHandler for IntegrateHandler<'a, 'b> {
    fn on_sample(&mut self, sample: BaseTrajData) -> Result<ControlFlow, BallisticsError> {
        self.filter.push(sample)?;
        if let Some(dense) = self.dense.as_deref_mut() {
            dense.push(sample);
        }
        *self.last_sample = Some(sample);
        Ok(ControlFlow::Continue)
    }
}

/// Watches a scalar key cross `target_value` across a three-sample rolling
/// window, stopping the integrator as soon as it happens (spec §4.5).
struct SinglePointInterceptor {
    key: InterpKey,
    target: f64,
    window: Vec<BaseTrajData>,
    result: Option<BaseTrajData>,
}

impl SinglePointInterceptor {
    fn new(key: InterpKey, target: f64) -> Self {
        Self { key, target, window: Vec::with_capacity(3), result: None }
    }
}

impl StepHandler for SinglePointInterceptor {
    fn on_sample(&mut self, sample: BaseTrajData) -> Result<ControlFlow, BallisticsError> {
        if (self.key.extract(&sample) - self.target).abs() <= 1e-9 {
            self.result = Some(sample);
            return Ok(ControlFlow::Stop);
        }

        if let Some(&prev) = self.window.last() {
            let a = self.key.extract(&prev);
            let b = self.key.extract(&sample);
            if (a < self.target && b > self.target) || (a > self.target && b < self.target) {
                let interpolated = if self.window.len() >= 2 {
                    let extra = self.window[self.window.len() - 2];
                    crate::dense::three_point_interp_generic([extra, prev, sample], |s| self.key.extract(s), self.target)?
                } else {
                    crate::dense::linear_interp_generic(prev, sample, |s| self.key.extract(s), self.target)
                };
                self.result = Some(interpolated);
                return Ok(ControlFlow::Stop);
            }
        }

        self.window.push(sample);
        if self.window.len() > 3 {
            self.window.remove(0);
        }
        Ok(ControlFlow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballistics_core::{Atmosphere, Coriolis};
    use ballistics_models::tables::G7_KNOTS;
    use ballistics_models::DragCurve;
    use crate::filter::TrajFlag;

    fn flat_shot(elevation_rad: f64, flags: TrajFlag) -> ShotProps {
        ShotProps::new(
            0.22,
            0.0,
            12.0,
            1.2,
            0.308,
            175.0,
            elevation_rad,
            0.0,
            2.0 / 12.0,
            0.0,
            0.0,
            1.0 / 15.0,
            2600.0,
            flags,
            DragCurve::new(G7_KNOTS).unwrap(),
            Atmosphere::standard(),
            Coriolis::none(),
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn integrate_produces_range_rows_and_terminates_at_limit() {
        let shot = flat_shot(0.0, TrajFlag::RANGE);
        let engine = Engine::new(Config::default(), shot, IntegratorKind::Rk4);
        let out = engine.integrate(1000.0, 100.0, 0.0, false).unwrap();
        assert_eq!(out.hit.termination, TerminationReason::RangeLimitReached);
        assert!(out.hit.rows.len() >= 10);
        assert!(out.dense.is_none());
    }

    #[test]
    fn integrate_with_dense_retains_every_sample() {
        let shot = flat_shot(0.0, TrajFlag::RANGE);
        let engine = Engine::new(Config::default(), shot, IntegratorKind::Rk4);
        let out = engine.integrate(500.0, 0.0, 0.0, true).unwrap();
        assert!(out.dense.unwrap().len() > 2);
    }

    #[test]
    fn integrate_at_finds_mach_one_crossing() {
        let shot = flat_shot(0.01, TrajFlag::NONE);
        let engine = Engine::new(Config::default(), shot, IntegratorKind::Rk4);
        let (base, row) = engine.integrate_at(InterpKey::Mach, 1.0).unwrap();
        assert!((base.mach - 1.0).abs() < 1e-6);
        assert!((row.mach - 1.0).abs() < 1e-6);
    }

    #[test]
    fn with_override_restores_barrel_elevation_after_use() {
        let shot = flat_shot(0.0, TrajFlag::NONE);
        let engine = Engine::new(Config::default(), shot, IntegratorKind::Rk4);
        let before = engine.shot().barrel_elevation_rad;
        engine.with_override(Some(0.1), None, false, || {
            assert_eq!(engine.shot().barrel_elevation_rad, 0.1);
        });
        assert_eq!(engine.shot().barrel_elevation_rad, before);
    }
}
