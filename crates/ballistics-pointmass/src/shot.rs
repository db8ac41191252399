//! `ShotProps` (C6): the aggregated, mostly-immutable input bundle the
//! engine owns for the duration of one `integrate` call.

use ballistics_core::{Atmosphere, BallisticsError, Coriolis, Vector3, WindSegment, WindSock};
use ballistics_models::DragCurve;
use std::cell::Cell;

use crate::filter::TrajFlag;

/// Everything the integrator and search layer need about one shot, in
/// canonical units (feet, fps, radians, grains, inches).
///
/// Immutable during a single `integrate` call except `barrel_elevation_rad`,
/// which the search layer overwrites between iterations via `Engine`'s
/// reentrant-locked state (spec §3, §5).
#[derive(Debug, Clone)]
pub struct ShotProps {
    pub bc: f64,
    pub look_angle_rad: f64,
    pub twist_inches: f64,
    pub length_in: f64,
    pub diameter_in: f64,
    pub weight_grains: f64,
    pub barrel_elevation_rad: f64,
    pub barrel_azimuth_rad: f64,
    pub sight_height_ft: f64,
    pub cant_sine: f64,
    pub cant_cosine: f64,
    pub alt0_ft: f64,
    pub calc_step: f64,
    pub muzzle_velocity_fps: f64,
    pub filter_flags: TrajFlag,

    pub drag_curve: DragCurve,
    pub atmosphere: Atmosphere,
    pub coriolis: Coriolis,
    wind_segments: Vec<WindSegment>,

    stability_coefficient: Cell<Option<f64>>,
}

impl ShotProps {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bc: f64,
        look_angle_rad: f64,
        twist_inches: f64,
        length_in: f64,
        diameter_in: f64,
        weight_grains: f64,
        barrel_elevation_rad: f64,
        barrel_azimuth_rad: f64,
        sight_height_ft: f64,
        cant_angle_rad: f64,
        alt0_ft: f64,
        calc_step: f64,
        muzzle_velocity_fps: f64,
        filter_flags: TrajFlag,
        drag_curve: DragCurve,
        atmosphere: Atmosphere,
        coriolis: Coriolis,
        wind_segments: Vec<WindSegment>,
    ) -> Result<Self, BallisticsError> {
        if bc <= 0.0 {
            return Err(BallisticsError::InputError(format!("ballistic coefficient must be > 0, got {bc}")));
        }
        if weight_grains <= 0.0 || diameter_in <= 0.0 || muzzle_velocity_fps <= 0.0 || calc_step <= 0.0 {
            return Err(BallisticsError::InputError(
                "weight, diameter, muzzle velocity, and calc_step must all be positive".into(),
            ));
        }
        Ok(Self {
            bc,
            look_angle_rad,
            twist_inches,
            length_in,
            diameter_in,
            weight_grains,
            barrel_elevation_rad,
            barrel_azimuth_rad,
            sight_height_ft,
            cant_sine: cant_angle_rad.sin(),
            cant_cosine: cant_angle_rad.cos(),
            alt0_ft,
            calc_step,
            muzzle_velocity_fps,
            filter_flags,
            drag_curve,
            atmosphere,
            coriolis,
            wind_segments,
            stability_coefficient: Cell::new(None),
        })
    }

    pub fn wind_sock(&self) -> WindSock {
        WindSock::new(self.wind_segments.clone())
    }

    /// Gyroscopic stability coefficient (Miller formula), computed lazily
    /// and cached on first access, spec §4.10.
    pub fn stability_coefficient(&self) -> f64 {
        if let Some(sg) = self.stability_coefficient.get() {
            return sg;
        }
        let sg = self.compute_stability_coefficient();
        self.stability_coefficient.set(Some(sg));
        sg
    }

    fn compute_stability_coefficient(&self) -> f64 {
        if self.twist_inches == 0.0 {
            return 0.0;
        }
        let twist_calibers = self.twist_inches.abs() / self.diameter_in;
        let l = self.length_in / self.diameter_in;
        let (t0_f, p0_inhg) = (self.atmosphere.t0_f, self.atmosphere.p0_inhg);

        (30.0 * self.weight_grains)
            / (twist_calibers.powi(2) * self.diameter_in.powi(3) * l * (1.0 + l * l))
            * (self.muzzle_velocity_fps / 2800.0).powf(1.0 / 3.0)
            * ((t0_f + 460.0) / 519.0)
            * (29.92 / p0_inhg)
    }

    /// Litz spin-drift offset at time `t`, spec §4.10. Zero unless the
    /// barrel has rifling (`twist_inches != 0`) and the bullet is stable.
    pub fn spin_drift_ft(&self, time_s: f64) -> f64 {
        let sg = self.stability_coefficient();
        if self.twist_inches == 0.0 || sg == 0.0 {
            return 0.0;
        }
        self.twist_inches.signum() * 1.25 * (sg + 1.2) * time_s.powf(1.83) / 12.0
    }

    /// Initial muzzle position: the bullet starts `sight_height_ft` below
    /// (and, if the rifle is canted, to the side of) the line of sight, so
    /// that `slant_height_ft` starts negative for a normally elevated zero
    /// shot (spec §4.6's zero-crossing arm/disarm condition relies on this).
    pub fn initial_position(&self) -> Vector3 {
        Vector3::new(0.0, -self.sight_height_ft * self.cant_cosine, -self.sight_height_ft * self.cant_sine)
    }

    /// Initial muzzle velocity from barrel elevation/azimuth.
    pub fn initial_velocity(&self) -> Vector3 {
        let ce = self.barrel_elevation_rad.cos();
        let se = self.barrel_elevation_rad.sin();
        let ca = self.barrel_azimuth_rad.cos();
        let sa = self.barrel_azimuth_rad.sin();
        Vector3::new(
            self.muzzle_velocity_fps * ce * ca,
            self.muzzle_velocity_fps * se,
            self.muzzle_velocity_fps * ce * sa,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ballistics_models::tables::G7_KNOTS;

    fn sample_shot(elevation_rad: f64) -> ShotProps {
        ShotProps::new(
            0.22,
            0.0,
            -10.0,
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
            TrajFlag::RANGE,
            DragCurve::new(G7_KNOTS).unwrap(),
            Atmosphere::standard(),
            Coriolis::none(),
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_non_positive_bc() {
        let err = ShotProps::new(
            0.0,
            0.0,
            0.0,
            1.0,
            0.3,
            150.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.05,
            2600.0,
            TrajFlag::NONE,
            DragCurve::new(G7_KNOTS).unwrap(),
            Atmosphere::standard(),
            Coriolis::none(),
            Vec::new(),
        );
        assert!(matches!(err, Err(BallisticsError::InputError(_))));
    }

    #[test]
    fn stability_coefficient_is_cached_and_nonzero_for_rifled_barrel() {
        let shot = sample_shot(0.02);
        let sg1 = shot.stability_coefficient();
        let sg2 = shot.stability_coefficient();
        assert_eq!(sg1, sg2);
        assert!(sg1 > 0.0);
    }

    #[test]
    fn zero_twist_has_zero_stability_and_spin_drift() {
        let mut shot = sample_shot(0.02);
        shot.twist_inches = 0.0;
        assert_eq!(shot.stability_coefficient(), 0.0);
        assert_eq!(shot.spin_drift_ft(1.0), 0.0);
    }

    #[test]
    fn initial_position_is_below_sight_height_with_no_cant() {
        let shot = sample_shot(0.02);
        let p = shot.initial_position();
        assert_relative_eq!(p.y, -shot.sight_height_ft);
        assert_relative_eq!(p.z, 0.0);
    }
}
