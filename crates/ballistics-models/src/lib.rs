//! PCHIP drag curve (C2) and G1/G7 fixture tables for the ballistics workspace.
//!
//! The production drag table itself is caller-supplied input data (spec
//! §1); this crate only owns the `Cd(Mach)` interpolation machinery plus a
//! coarse fixture table used by its own tests and by
//! `ballistics-pointmass`'s integration tests.

pub mod drag_curve;
pub mod tables;

pub use drag_curve::{DragCurve, MachList, FOLDED_DRAG_CONSTANT};
