//! Tunable engine thresholds (C13).
//!
//! Built once, passed by value into `Engine::new` — no hidden singletons, no
//! env-var reads. A shot that wants different search tolerances just builds
//! a second `Config`.

/// Engine-wide tunables, spec §6.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Scales the integrator's `calc_step`.
    pub step_multiplier: f64,
    /// Vertical error threshold for `zero_angle`'s fast secant path.
    pub zero_finding_accuracy: f64,
    /// Terminate the step loop once speed drops below this (fps).
    pub minimum_velocity: f64,
    /// Terminate once height drops below this, relative to launch (ft; negative).
    pub maximum_drop: f64,
    /// Terminate once absolute altitude (alt0 + height) drops below this (ft).
    pub minimum_altitude: f64,
    /// Gravitational acceleration (ft/s², negative = down).
    pub gravity_constant: f64,
    /// Cap on search-loop iterations (Ridder, secant, golden-section).
    pub max_iterations: u32,
    /// Event-union window: interpolated event timestamps within this many seconds merge.
    pub separate_row_time_delta: f64,
    /// Upper safety bound on `integrate_at`'s range.
    pub max_integration_range: f64,
    /// Base RK4 time-step factor (multiplied by `calc_step`).
    pub default_time_step: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            step_multiplier: 1.0,
            zero_finding_accuracy: 5e-6,
            minimum_velocity: 50.0,
            maximum_drop: -15_000.0,
            minimum_altitude: -1_500.0,
            gravity_constant: -32.17405,
            max_iterations: 50,
            separate_row_time_delta: 1e-5,
            max_integration_range: 9e9,
            default_time_step: 0.5,
        }
    }
}

/// Feet-allowed vertical error for `find_zero_angle`'s Ridder convergence test, spec §4.9.
pub const ALLOWED_ZERO_ERROR_FEET: f64 = 1e-2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let c = Config::default();
        assert_eq!(c.step_multiplier, 1.0);
        assert_eq!(c.zero_finding_accuracy, 5e-6);
        assert_eq!(c.minimum_velocity, 50.0);
        assert_eq!(c.maximum_drop, -15_000.0);
        assert_eq!(c.minimum_altitude, -1_500.0);
        assert_eq!(c.gravity_constant, -32.17405);
        assert_eq!(c.max_iterations, 50);
        assert_eq!(c.separate_row_time_delta, 1e-5);
        assert_eq!(c.max_integration_range, 9e9);
        assert_eq!(c.default_time_step, 0.5);
    }
}
