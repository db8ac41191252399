//! Structured error taxonomy shared by every crate in the workspace.
//!
//! Low-level functions (interpolation, atmosphere, drag lookups) return one
//! of these directly. The search layer in `ballistics-pointmass` catches the
//! recoverable integrator terminations itself and only ever surfaces
//! `ZeroFindingError` / `OutOfRangeError` / `InterceptionError` /
//! `SolverRuntimeError` to its own callers.

use thiserror::Error;

/// Every fallible outcome in the engine, per spec §7.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BallisticsError {
    /// Malformed drag table, non-positive BC, or other degenerate shot input.
    #[error("input error: {0}")]
    InputError(String),

    /// Three-point interpolation was asked to use a degenerate (non-distinct) abscissa.
    #[error("zero division in interpolation: {0}")]
    ZeroDivisionError(String),

    /// Interpolation requested with fewer than 3 samples, or an out-of-range center index.
    #[error("index error: {0}")]
    IndexError(String),

    /// Unknown interpolation key requested against `BaseTrajData`.
    #[error("unknown base trajectory interpolation key: {0}")]
    BaseTrajInterpKeyError(String),

    /// Requested zero/search distance exceeds the computed max range.
    #[error(
        "requested distance {requested_distance_ft} ft exceeds max range {max_range_ft} ft \
         at look angle {look_angle_rad} rad"
    )]
    OutOfRangeError {
        requested_distance_ft: f64,
        max_range_ft: f64,
        look_angle_rad: f64,
    },

    /// Ridder/secant search failed to converge within the iteration budget.
    #[error(
        "zero-finding failed to converge after {iterations} iterations \
         (last residual {last_error}, last angle {last_angle_rad} rad)"
    )]
    ZeroFindingError {
        last_error: f64,
        iterations: u32,
        last_angle_rad: f64,
    },

    /// `integrate_at` ran to the end of the trajectory without the watched key crossing target.
    #[error("interception error: {0}")]
    InterceptionError(String),

    /// Integrator terminated before a solver step could complete (e.g. trajectory too short).
    #[error("solver runtime error: {0}")]
    SolverRuntimeError(String),

    /// Dense buffer (or other) allocation failed; fatal for the current integration.
    #[error("memory error: {0}")]
    MemoryError(String),
}

pub type BallisticsResult<T> = Result<T, BallisticsError>;
