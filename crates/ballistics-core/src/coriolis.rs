//! Optional local-frame Coriolis acceleration (C5).
//!
//! Precomputes sin/cos of latitude and barrel azimuth once per shot so the
//! step loop only ever does a cross product and two frame rotations.

use crate::vector::Vector3;

/// Earth's angular rotation rate, rad/s.
const OMEGA_EARTH: f64 = 7.292_115e-5;

/// Coriolis parameters for one shot. `flat_fire_only`, per spec §4.4 and the
/// open question in §9, switches the engine from step-loop accumulation to a
/// simplified offset applied once at event-interpolation time; see
/// `flat_fire_offset` and DESIGN.md for exactly what that offset covers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coriolis {
    sin_lat: f64,
    cos_lat: f64,
    sin_az: f64,
    cos_az: f64,
    muzzle_velocity_fps: f64,
    pub flat_fire_only: bool,
}

impl Coriolis {
    /// `latitude_rad` positive north, `azimuth_rad` compass bearing of the
    /// shot (0 = north, increasing clockwise/east).
    pub fn new(latitude_rad: f64, azimuth_rad: f64, muzzle_velocity_fps: f64, flat_fire_only: bool) -> Self {
        Self {
            sin_lat: latitude_rad.sin(),
            cos_lat: latitude_rad.cos(),
            sin_az: azimuth_rad.sin(),
            cos_az: azimuth_rad.cos(),
            muzzle_velocity_fps,
            flat_fire_only,
        }
    }

    /// No Coriolis effect at all (e.g. latitude unknown/irrelevant).
    pub fn none() -> Self {
        Self::new(0.0, 0.0, 0.0, true)
    }

    /// Step-loop Coriolis acceleration in the (downrange, up, crossrange)
    /// frame. Zero when `flat_fire_only` is set — see `flat_fire_offset`.
    pub fn acceleration(&self, velocity_ground: Vector3) -> Vector3 {
        if self.flat_fire_only {
            return Vector3::ZERO;
        }

        // Rotate velocity into local ENU using the precomputed azimuth.
        let v_e = self.sin_az * velocity_ground.x + self.cos_az * velocity_ground.z;
        let v_n = self.cos_az * velocity_ground.x - self.sin_az * velocity_ground.z;
        let v_u = velocity_ground.y;

        // Earth's rotation vector in local ENU at this latitude.
        let omega_e = 0.0;
        let omega_n = OMEGA_EARTH * self.cos_lat;
        let omega_u = OMEGA_EARTH * self.sin_lat;

        let cross_e = omega_n * v_u - omega_u * v_n;
        let cross_n = omega_u * v_e - omega_e * v_u;
        let cross_u = omega_e * v_n - omega_n * v_e;

        let a_e = -2.0 * cross_e;
        let a_n = -2.0 * cross_n;
        let a_u = -2.0 * cross_u;

        // Rotate back into the (downrange, up, crossrange) frame.
        Vector3::new(self.sin_az * a_e + self.cos_az * a_n, a_u, self.cos_az * a_e - self.sin_az * a_n)
    }

    /// Simplified flat-fire offset applied once at event-interpolation time
    /// instead of accumulated in the step loop, spec §4.4. This is the
    /// classic small-angle approximation (crossrange drift from the
    /// vertical Earth-rotation component, vertical Eötvös deflection from
    /// the horizontal component) and is only documented for flat,
    /// short-time-of-flight shots; per the open question in §9 this is not
    /// extended to shots whose slant angle exceeds 15°.
    pub fn flat_fire_offset(&self, time_s: f64) -> Vector3 {
        if !self.flat_fire_only {
            return Vector3::ZERO;
        }
        let vt2 = self.muzzle_velocity_fps * time_s * time_s;
        Vector3::new(0.0, OMEGA_EARTH * self.cos_lat * self.sin_az * vt2, OMEGA_EARTH * self.sin_lat * vt2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use core::f64::consts::FRAC_PI_2;

    #[test]
    fn none_has_zero_acceleration_and_offset() {
        let c = Coriolis::none();
        assert_eq!(c.acceleration(Vector3::new(2000.0, 0.0, 0.0)), Vector3::ZERO);
        assert_eq!(c.flat_fire_offset(1.0), Vector3::ZERO);
    }

    #[test]
    fn full_model_is_zero_at_equator_facing_north_for_vertical_motion() {
        // At the equator the rotation vector is purely horizontal (north);
        // pure vertical motion then has zero Coriolis acceleration along y.
        let c = Coriolis::new(0.0, 0.0, 2600.0, false);
        let a = c.acceleration(Vector3::new(0.0, 100.0, 0.0));
        assert_relative_eq!(a.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn flat_fire_only_suppresses_step_loop_acceleration() {
        let c = Coriolis::new(0.7, FRAC_PI_2, 2600.0, true);
        assert_eq!(c.acceleration(Vector3::new(2000.0, 10.0, 0.0)), Vector3::ZERO);
        assert!(c.flat_fire_offset(1.0).z.abs() > 0.0);
    }
}
