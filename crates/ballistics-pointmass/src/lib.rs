//! Point-mass (3-DoF) exterior ballistics engine.
//!
//! Integrates a single bullet's trajectory (downrange `x`, vertical `y`,
//! crossrange `z`) under drag, wind, gravity, optional Coriolis, and spin
//! drift, via Euler or classical RK4 stepping. On top of the integrator
//! sits a dense raw-sample buffer, a sparse flagged event stream (zero
//! crossings, Mach crossings, apex, range/time sampling), and a root-finding
//! search layer for zero angle / max range / apex queries.

pub mod dense;
pub mod engine;
pub mod filter;
pub mod integrator;
pub mod search;
pub mod shot;
pub mod trajectory;

pub use dense::{BaseTrajData, DenseBuffer, InterpKey};
pub use engine::{Engine, IntegrateOutput};
pub use filter::{EventFilter, TrajFlag};
pub use integrator::{ControlFlow, IntegratorKind, StepHandler};
pub use search::{error_at_distance, find_apex, find_max_range, find_zero_angle, range_for_angle, zero_angle};
pub use shot::ShotProps;
pub use trajectory::{derive_row, HitResult, TerminationReason, TrajectoryData};
