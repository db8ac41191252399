//! Piecewise-cubic (PCHIP) `Cd(Mach)` drag curve (C2).

use ballistics_core::error::BallisticsError;
use ballistics_core::interp::{hermite_segment_eval, locate_segment, pchip_slopes};

/// The folded drag-factor unit constant from spec §4.1: the integrator
/// consumes `Cd(M) * FOLDED_DRAG_CONSTANT / BC`.
pub const FOLDED_DRAG_CONSTANT: f64 = 2.08551e-4;

/// Knot Mach values, kept separate from `DragCurve` per spec §3 so callers
/// can binary-search the table independently of a curve instance if needed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MachList(Vec<f64>);

impl MachList {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Segment index such that `machs[i] <= mach <= machs[i+1]`, clamped at
    /// the ends (spec §4.1's "clamp to nearest endpoint segment").
    pub fn locate(&self, mach: f64) -> usize {
        locate_segment(&self.0, mach)
    }
}

/// A prepared piecewise-cubic drag curve: `(mach_i, cd_i)` knots with
/// strictly increasing Mach, monotone-preserving PCHIP interpolation
/// between them, and nearest-segment clamping outside the knot range.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DragCurve {
    machs: MachList,
    cds: Vec<f64>,
    slopes: Vec<f64>,
}

impl DragCurve {
    /// Build from a knot list. Requires at least 2 knots, strictly
    /// increasing `mach`, and `cd >= 0`; spec §4.1.
    pub fn new(knots: &[(f64, f64)]) -> Result<Self, BallisticsError> {
        if knots.len() < 2 {
            return Err(BallisticsError::InputError(format!(
                "drag curve needs at least 2 knots, got {}",
                knots.len()
            )));
        }
        let mut machs = Vec::with_capacity(knots.len());
        let mut cds = Vec::with_capacity(knots.len());
        let mut prev_mach = f64::NEG_INFINITY;
        for &(mach, cd) in knots {
            if mach <= prev_mach {
                return Err(BallisticsError::InputError(
                    "drag curve mach knots must be strictly increasing".into(),
                ));
            }
            if cd < 0.0 {
                return Err(BallisticsError::InputError(format!("drag coefficient must be >= 0, got {cd}")));
            }
            machs.push(mach);
            cds.push(cd);
            prev_mach = mach;
        }
        let slopes = pchip_slopes(&machs, &cds);
        Ok(Self { machs: MachList(machs), cds, slopes })
    }

    /// `Cd(mach)`, clamped to the nearest segment outside the knot range.
    pub fn cd(&self, mach: f64) -> f64 {
        let seg = self.machs.locate(mach);
        hermite_segment_eval(self.machs.as_slice(), &self.cds, &self.slopes, seg, mach).max(0.0)
    }

    /// `Cd(M) * FOLDED_DRAG_CONSTANT / bc`, the per-step drag factor the
    /// integrator multiplies by relative-velocity magnitude, spec §4.1/§4.7.
    pub fn drag_factor(&self, mach: f64, bc: f64) -> f64 {
        self.cd(mach) * FOLDED_DRAG_CONSTANT / bc
    }

    pub fn mach_list(&self) -> &MachList {
        &self.machs
    }
}
