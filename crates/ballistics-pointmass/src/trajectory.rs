//! Derived trajectory rows (C14): the public, human-meaningful view of a
//! dense sample, plus the overall result of one `integrate` call.

use crate::dense::BaseTrajData;
use crate::filter::TrajFlag;
use crate::shot::ShotProps;
use ballistics_core::Vector3;

/// One row of derived trajectory data, spec §3/§4.10.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrajectoryData {
    pub time: f64,
    pub position: Vector3,
    pub velocity: Vector3,
    pub velocity_fps: f64,
    pub mach: f64,

    pub height_ft: f64,
    pub slant_height_ft: f64,
    pub drop_angle_rad: f64,
    pub windage_ft: f64,
    pub windage_angle_rad: f64,
    pub slant_distance_ft: f64,
    pub angle_rad: f64,

    pub density_ratio: f64,
    pub drag: f64,
    pub energy_ft_lb: f64,
    pub ogw_lb: f64,

    pub flag: TrajFlag,
}

/// Optimal game weight, the traditional (non-physical) "how much animal this
/// load can ethically take" heuristic some range cards still carry, spec §4.10.
fn optimal_game_weight(weight_grains: f64, velocity_fps: f64) -> f64 {
    weight_grains.powi(2) * velocity_fps.powi(3) * 1.5e-12
}

/// Kinetic energy in ft-lb from grains and fps.
fn kinetic_energy_ft_lb(weight_grains: f64, velocity_fps: f64) -> f64 {
    weight_grains * velocity_fps.powi(2) / 450_400.0
}

/// Derive a full `TrajectoryData` row from one raw sample, spec §4.10.
pub fn derive_row(base: BaseTrajData, shot: &ShotProps, flag: TrajFlag) -> TrajectoryData {
    let look = shot.look_angle_rad;
    let height_ft = base.position.y;
    let slant_height_ft = height_ft * look.cos() - base.position.x * look.sin();
    let slant_distance_ft = base.position.x * look.cos() + height_ft * look.sin();

    // `flat_fire_only` Coriolis skips step-loop accumulation entirely
    // (`Coriolis::acceleration` returns zero); its effect is instead folded
    // in once here, at row derivation, via the closed-form offset.
    let coriolis_offset = shot.coriolis.flat_fire_offset(base.time);
    let height_ft = height_ft + coriolis_offset.y;
    let slant_height_ft = slant_height_ft + coriolis_offset.y * look.cos();
    let windage_ft = base.position.z + shot.spin_drift_ft(base.time) + coriolis_offset.z;
    let windage_angle_rad = if base.position.x.abs() < 1e-9 { 0.0 } else { (windage_ft / base.position.x).atan() };

    let drop_angle_rad = slant_height_ft.atan2(slant_distance_ft);
    let angle_rad = base.velocity.y.atan2(base.velocity.x);

    let velocity_fps = base.velocity.norm();
    let (density_ratio, _mach1) = shot.atmosphere.update(shot.alt0_ft + height_ft);
    let drag = shot.drag_curve.drag_factor(base.mach, shot.bc);

    TrajectoryData {
        time: base.time,
        position: base.position,
        velocity: base.velocity,
        velocity_fps,
        mach: base.mach,
        height_ft,
        slant_height_ft,
        drop_angle_rad,
        windage_ft,
        windage_angle_rad,
        slant_distance_ft,
        angle_rad,
        density_ratio,
        drag,
        energy_ft_lb: kinetic_energy_ft_lb(shot.weight_grains, velocity_fps),
        ogw_lb: optimal_game_weight(shot.weight_grains, velocity_fps),
        flag,
    }
}

/// Why the integrator stopped producing samples, spec §4.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    RangeLimitReached,
    MinimumVelocity,
    MaximumDrop,
    MinimumAltitude,
    HandlerRequestedStop,
}

/// The full result of one `integrate` call.
#[derive(Debug, Clone)]
pub struct HitResult {
    pub rows: Vec<TrajectoryData>,
    pub termination: TerminationReason,
}

impl HitResult {
    /// The last row, if any rows were recorded.
    pub fn last(&self) -> Option<&TrajectoryData> {
        self.rows.last()
    }

    /// First row whose flag contains `flag`.
    pub fn find(&self, flag: TrajFlag) -> Option<&TrajectoryData> {
        self.rows.iter().find(|r| r.flag.contains(flag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballistics_core::{Atmosphere, Coriolis, Vector3};
    use ballistics_models::tables::G7_KNOTS;
    use ballistics_models::DragCurve;

    fn shot() -> ShotProps {
        ShotProps::new(
            0.22,
            0.0,
            12.0,
            1.2,
            0.308,
            175.0,
            0.02,
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
    fn derived_fields_are_finite_and_energy_is_positive() {
        let shot = shot();
        let base = BaseTrajData { time: 1.0, position: Vector3::new(1000.0, -5.0, 1.0), velocity: Vector3::new(1800.0, -20.0, 2.0), mach: 1.6 };
        let row = derive_row(base, &shot, TrajFlag::RANGE);
        assert!(row.energy_ft_lb.is_finite() && row.energy_ft_lb > 0.0);
        assert!(row.ogw_lb.is_finite() && row.ogw_lb > 0.0);
        assert!(row.velocity_fps > 0.0);
    }

    #[test]
    fn slant_height_matches_height_at_zero_look_angle() {
        let shot = shot();
        let base = BaseTrajData { time: 0.5, position: Vector3::new(500.0, -2.0, 0.0), velocity: Vector3::new(2000.0, -10.0, 0.0), mach: 1.8 };
        let row = derive_row(base, &shot, TrajFlag::NONE);
        assert_eq!(row.slant_height_ft, row.height_ft);
        assert_eq!(row.slant_distance_ft, row.position.x);
    }
}
