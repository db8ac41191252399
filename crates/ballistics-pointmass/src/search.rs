//! Search layer (C11): apex/range/zero-angle queries built on top of
//! `Engine::integrate`/`integrate_at`.

use log::{debug, warn};

use ballistics_core::BallisticsError;

use crate::dense::{BaseTrajData, InterpKey};
use crate::engine::Engine;
use crate::filter::TrajFlag;

/// Ridder's method root-finder: requires `f(lo)` and `f(hi)` to bracket a
/// root (opposite signs), converges once `|f(x)| <= tol`.
fn ridder(
    f: impl Fn(f64) -> Result<f64, BallisticsError>,
    lo: f64,
    hi: f64,
    tol: f64,
    max_iterations: u32,
) -> Result<f64, BallisticsError> {
    let mut lo = lo;
    let mut hi = hi;
    let mut flo = f(lo)?;
    let mut fhi = f(hi)?;
    if flo.abs() <= tol {
        return Ok(lo);
    }
    if fhi.abs() <= tol {
        return Ok(hi);
    }
    if flo.signum() == fhi.signum() {
        return Err(BallisticsError::ZeroFindingError { last_error: fhi, iterations: 0, last_angle_rad: hi });
    }

    let mut last_error = fhi;
    let mut last_angle = hi;

    for iter in 0..max_iterations {
        let mid = 0.5 * (lo + hi);
        let fmid = f(mid)?;
        let s = (fmid * fmid - flo * fhi).sqrt();
        if s == 0.0 {
            return Err(BallisticsError::ZeroFindingError { last_error: fmid, iterations: iter, last_angle_rad: mid });
        }
        let sign = if flo < fhi { 1.0 } else { -1.0 };
        let next_angle = mid + (mid - lo) * sign * fmid / s;
        let next_error = f(next_angle)?;
        last_error = next_error;
        last_angle = next_angle;

        if next_error.abs() <= tol {
            return Ok(next_angle);
        }

        if fmid.signum() != next_error.signum() {
            lo = mid;
            flo = fmid;
            hi = next_angle;
            fhi = next_error;
        } else if flo.signum() != next_error.signum() {
            hi = next_angle;
            fhi = next_error;
        } else {
            lo = next_angle;
            flo = next_error;
        }

        if (hi - lo).abs() < 1e-12 {
            break;
        }
    }

    Err(BallisticsError::ZeroFindingError { last_error, iterations: max_iterations, last_angle_rad: last_angle })
}

/// Downrange distance at which the trajectory crosses the line of sight
/// going down, firing at `angle_rad`, spec §4.9. Integrates to
/// `max_integration_range` with the termination thresholds relaxed, since a
/// search probe angle may otherwise fall short or overshoot wildly.
pub fn range_for_angle(engine: &Engine, angle_rad: f64) -> Result<f64, BallisticsError> {
    let max_range = engine.config().max_integration_range;
    engine.with_override(Some(angle_rad), Some(TrajFlag::ZERO_DOWN), true, || {
        let out = engine.integrate(max_range, 0.0, 0.0, false)?;
        match out.hit.find(TrajFlag::ZERO_DOWN) {
            Some(row) => Ok(row.position.x),
            None => Ok(out.hit.last().map(|r| r.position.x).unwrap_or(0.0)),
        }
    })
}

/// Slant height at `distance_ft` firing at `angle_rad`: the residual
/// `find_zero_angle`/`zero_angle` drive to zero, spec §4.9.
pub fn error_at_distance(engine: &Engine, angle_rad: f64, distance_ft: f64) -> Result<f64, BallisticsError> {
    engine.with_override(Some(angle_rad), None, true, || {
        let (base, _row) = engine.integrate_at(InterpKey::PosX, distance_ft)?;
        let look = engine.shot().look_angle_rad;
        Ok(base.position.y * look.cos() - base.position.x * look.sin())
    })
}

/// Golden-section search for the elevation angle (within `bracket`) that
/// maximizes `range_for_angle`, spec §4.9. Returns `(range_ft, angle_rad)`.
pub fn find_max_range(engine: &Engine, bracket: (f64, f64)) -> Result<(f64, f64), BallisticsError> {
    let config = engine.config();
    let (mut lo, mut hi) = bracket;
    let inv_phi = (5f64.sqrt() - 1.0) / 2.0;

    let mut c = hi - inv_phi * (hi - lo);
    let mut d = lo + inv_phi * (hi - lo);
    let mut fc = range_for_angle(engine, c)?;
    let mut fd = range_for_angle(engine, d)?;

    for iteration in 0..config.max_iterations {
        if (hi - lo).abs() < 1e-7 {
            break;
        }
        debug!("find_max_range: iteration {iteration}, bracket [{lo}, {hi}]");
        if fc > fd {
            hi = d;
            d = c;
            fd = fc;
            c = hi - inv_phi * (hi - lo);
            fc = range_for_angle(engine, c)?;
        } else {
            lo = c;
            c = d;
            fc = fd;
            d = lo + inv_phi * (hi - lo);
            fd = range_for_angle(engine, d)?;
        }
    }

    let best_angle = 0.5 * (lo + hi);
    let best_range = range_for_angle(engine, best_angle)?;
    Ok((best_range, best_angle))
}

/// Robust zero-angle solve via Ridder's method, spec §4.9. Errors
/// `OutOfRangeError` if `zero_distance_ft` is beyond the shot's max range.
pub fn find_zero_angle(engine: &Engine, zero_distance_ft: f64) -> Result<f64, BallisticsError> {
    let config = engine.config();
    let shot = engine.shot();

    let (max_range, max_angle) = find_max_range(engine, (shot.look_angle_rad, shot.look_angle_rad + std::f64::consts::FRAC_PI_4))?;
    if zero_distance_ft > max_range {
        return Err(BallisticsError::OutOfRangeError {
            requested_distance_ft: zero_distance_ft,
            max_range_ft: max_range,
            look_angle_rad: shot.look_angle_rad,
        });
    }

    let iteration = std::cell::Cell::new(0u32);
    ridder(
        |angle| {
            let residual = error_at_distance(engine, angle, zero_distance_ft)?;
            debug!("find_zero_angle: iteration {}, angle {angle} rad, residual {residual} ft", iteration.get());
            iteration.set(iteration.get() + 1);
            Ok(residual)
        },
        shot.look_angle_rad,
        max_angle,
        ballistics_core::config::ALLOWED_ZERO_ERROR_FEET,
        config.max_iterations,
    )
}

/// Fast secant-based zero solve, spec §4.9. Falls back to the robust
/// `find_zero_angle` Ridder search if the secant iteration diverges instead
/// of converging toward `config.zero_finding_accuracy`.
pub fn zero_angle(engine: &Engine, zero_distance_ft: f64) -> Result<f64, BallisticsError> {
    let config = engine.config();
    let shot = engine.shot();

    let mut angle = shot.look_angle_rad + (shot.sight_height_ft / zero_distance_ft.max(1.0)).atan();
    let mut error = error_at_distance(engine, angle, zero_distance_ft)?;

    for iteration in 0..config.max_iterations {
        debug!("zero_angle: iteration {iteration}, angle {angle} rad, residual {error} ft");
        if error.abs() <= config.zero_finding_accuracy {
            return Ok(angle);
        }

        let probe_delta = 1e-5;
        let probe_error = error_at_distance(engine, angle + probe_delta, zero_distance_ft)?;
        let derivative = (probe_error - error) / probe_delta;
        if derivative.abs() < 1e-12 {
            break;
        }

        let next_angle = angle - error / derivative;
        let next_error = error_at_distance(engine, next_angle, zero_distance_ft)?;

        if next_error.abs() > error.abs() && iteration > 2 {
            break;
        }

        angle = next_angle;
        error = next_error;
    }

    if error.abs() <= config.zero_finding_accuracy {
        Ok(angle)
    } else {
        warn!("zero_angle: secant search diverged after {} iterations, falling back to find_zero_angle", config.max_iterations);
        find_zero_angle(engine, zero_distance_ft)
    }
}

/// The apex (highest point) of the trajectory, spec §4.9: the raw sample
/// where vertical velocity crosses from positive to non-positive. Errors
/// `ZeroFindingError` if the shot never climbs (vy never changes sign).
pub fn find_apex(engine: &Engine) -> Result<BaseTrajData, BallisticsError> {
    let max_range = engine.config().max_integration_range;
    engine.with_override(None, Some(TrajFlag::APEX), true, || {
        let out = engine.integrate(max_range, 0.0, 0.0, false)?;
        let row = out.hit.find(TrajFlag::APEX).ok_or_else(|| {
            let last_vy = out.hit.last().map(|r| r.velocity.y).unwrap_or(0.0);
            BallisticsError::ZeroFindingError {
                last_error: last_vy,
                iterations: 0,
                last_angle_rad: engine.shot().barrel_elevation_rad,
            }
        })?;
        Ok(BaseTrajData { time: row.time, position: row.position, velocity: row.velocity, mach: row.mach })
    })
}
