//! Standard atmosphere (C3): density ratio and speed-of-sound vs. altitude.

use crate::error::BallisticsError;

/// Lapse rate, °F per ft (spec §4.2).
const LAPSE_FAHRENHEIT_PER_FOOT: f64 = -0.00356616;
/// Barometric pressure exponent for `P(a) = P0 * (T0/T)^exponent`.
const PRESSURE_EXPONENT: f64 = 5.255876;
/// `sqrt(R_specific * gamma)`-style constant folding °R -> fps speed of sound.
const SPEED_OF_SOUND_IMPERIAL: f64 = 49.0223;
/// Standard sea-level density, lb/ft^3, used to normalize the density ratio.
const STANDARD_DENSITY_LB_FT3: f64 = 0.076474;
/// Gas constant for dry air in imperial units (ft·lbf/(lb·°R)) folded with unit conversions.
const AIR_GAS_CONSTANT: f64 = 53.35;

/// Floor below which temperature is clamped (°F), spec §3's `cLowestTempC` in imperial units.
pub const LOWEST_TEMPERATURE_FAHRENHEIT: f64 = -130.0;

/// Base atmospheric state a shot is prepared against, plus a prepared
/// (density_ratio, mach1_fps) pair at the base altitude. Deterministic,
/// side-effect free: `update` is a pure function of altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Atmosphere {
    /// Base temperature, °F.
    pub t0_f: f64,
    /// Base altitude, ft.
    pub a0_ft: f64,
    /// Base station pressure, inHg.
    pub p0_inhg: f64,
    prepared_density_ratio: f64,
    prepared_mach1_fps: f64,
}

impl Atmosphere {
    /// Construct and prepare the base (density_ratio, mach1) pair at `a0_ft`.
    ///
    /// Fails `InputError` if pressure is non-positive or the base temperature
    /// is already below the floor.
    pub fn new(t0_f: f64, a0_ft: f64, p0_inhg: f64) -> Result<Self, BallisticsError> {
        if p0_inhg <= 0.0 {
            return Err(BallisticsError::InputError(format!(
                "atmosphere base pressure must be positive, got {p0_inhg}"
            )));
        }
        if t0_f < LOWEST_TEMPERATURE_FAHRENHEIT {
            return Err(BallisticsError::InputError(format!(
                "atmosphere base temperature {t0_f} is below the floor {LOWEST_TEMPERATURE_FAHRENHEIT}"
            )));
        }
        let mut atmo = Self { t0_f, a0_ft, p0_inhg, prepared_density_ratio: 1.0, prepared_mach1_fps: 0.0 };
        let (density_ratio, mach1_fps) = atmo.compute(a0_ft);
        atmo.prepared_density_ratio = density_ratio;
        atmo.prepared_mach1_fps = mach1_fps;
        Ok(atmo)
    }

    /// Standard ICAO-ish atmosphere at sea level: 59°F, 0 ft, 29.92 inHg.
    pub fn standard() -> Self {
        Self::new(59.0, 0.0, 29.92).expect("standard atmosphere constants are always valid")
    }

    /// (density_ratio, mach1_fps) prepared at the base altitude.
    pub fn prepared(&self) -> (f64, f64) {
        (self.prepared_density_ratio, self.prepared_mach1_fps)
    }

    /// Recompute (density_ratio, mach1_fps) at a new altitude, spec §4.2.
    pub fn update(&self, alt_ft: f64) -> (f64, f64) {
        self.compute(alt_ft)
    }

    fn temperature_at(&self, alt_ft: f64) -> f64 {
        let t = self.t0_f + LAPSE_FAHRENHEIT_PER_FOOT * (alt_ft - self.a0_ft);
        t.max(LOWEST_TEMPERATURE_FAHRENHEIT)
    }

    fn pressure_at(&self, t_f: f64) -> f64 {
        let t0_rankine = self.t0_f + 459.67;
        let t_rankine = t_f + 459.67;
        self.p0_inhg * (t0_rankine / t_rankine).powf(PRESSURE_EXPONENT)
    }

    fn compute(&self, alt_ft: f64) -> (f64, f64) {
        let t_f = self.temperature_at(alt_ft);
        let p_inhg = self.pressure_at(t_f);
        let t_rankine = t_f + 459.67;

        // density (lb/ft^3) from ideal gas law in imperial units, then ratio to standard.
        let p_psf = p_inhg * 70.726_16; // inHg -> lb/ft^2
        let density_lb_ft3 = p_psf / (AIR_GAS_CONSTANT * t_rankine);
        let density_ratio = density_lb_ft3 / STANDARD_DENSITY_LB_FT3;

        let mach1_fps = (t_rankine).sqrt() * SPEED_OF_SOUND_IMPERIAL;
        (density_ratio, mach1_fps)
    }
}
