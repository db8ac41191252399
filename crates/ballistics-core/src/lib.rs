//! Core math, atmosphere, wind, Coriolis, PCHIP interpolation primitives,
//! error taxonomy, and configuration shared by the ballistics workspace.
//!
//! Unit-of-measure conversions and drag-table catalogs are deliberately not
//! part of this crate — callers hand in canonical-unit (feet, fps, radians)
//! values already, and drag knot tables are caller-supplied input data (see
//! `ballistics-models` for a ready-made G1/G7 fixture set used in tests).

pub mod atmosphere;
pub mod config;
pub mod coriolis;
pub mod error;
pub mod interp;
pub mod vector;
pub mod wind;

pub use atmosphere::Atmosphere;
pub use config::Config;
pub use coriolis::Coriolis;
pub use error::{BallisticsError, BallisticsResult};
pub use vector::Vector3;
pub use wind::{WindSegment, WindSock};
