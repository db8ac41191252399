//! Dense trajectory buffer (C7): every raw integrator sample, plus the
//! scalar-key interpolation machinery shared with the event filter.

use ballistics_core::interp::three_point_pchip;
use ballistics_core::{BallisticsError, Vector3};

/// One raw integrator sample: time, position, velocity, and the Mach number
/// of the bullet's velocity relative to the wind at that instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseTrajData {
    pub time: f64,
    pub position: Vector3,
    pub velocity: Vector3,
    pub mach: f64,
}

/// Scalar fields of `BaseTrajData` that can be used as an interpolation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpKey {
    Time,
    Mach,
    PosX,
    PosY,
    PosZ,
    VelX,
    VelY,
    VelZ,
}

impl InterpKey {
    pub fn extract(self, s: &BaseTrajData) -> f64 {
        match self {
            InterpKey::Time => s.time,
            InterpKey::Mach => s.mach,
            InterpKey::PosX => s.position.x,
            InterpKey::PosY => s.position.y,
            InterpKey::PosZ => s.position.z,
            InterpKey::VelX => s.velocity.x,
            InterpKey::VelY => s.velocity.y,
            InterpKey::VelZ => s.velocity.z,
        }
    }
}

/// Interpolate every field of a three-sample bracket against a caller-chosen
/// abscissa (`abscissa(&sample)`), evaluating each at `target`. Used both by
/// `DenseBuffer::interpolate_at` (abscissa = an `InterpKey`) and by the
/// slant-height / event-filter call sites (abscissa = a derived scalar).
pub(crate) fn three_point_interp_generic(
    window: [BaseTrajData; 3],
    abscissa: impl Fn(&BaseTrajData) -> f64,
    target: f64,
) -> Result<BaseTrajData, BallisticsError> {
    let xs = [abscissa(&window[0]), abscissa(&window[1]), abscissa(&window[2])];
    let field = |ys: [f64; 3]| three_point_pchip(xs, ys, target);

    Ok(BaseTrajData {
        time: field([window[0].time, window[1].time, window[2].time])?,
        position: Vector3::new(
            field([window[0].position.x, window[1].position.x, window[2].position.x])?,
            field([window[0].position.y, window[1].position.y, window[2].position.y])?,
            field([window[0].position.z, window[1].position.z, window[2].position.z])?,
        ),
        velocity: Vector3::new(
            field([window[0].velocity.x, window[1].velocity.x, window[2].velocity.x])?,
            field([window[0].velocity.y, window[1].velocity.y, window[2].velocity.y])?,
            field([window[0].velocity.z, window[1].velocity.z, window[2].velocity.z])?,
        ),
        mach: field([window[0].mach, window[1].mach, window[2].mach])?,
    })
}

/// Linear fallback for brackets with only two samples (the very first
/// integrator step, before a third point exists for Fritsch-Carlson slopes).
pub(crate) fn linear_interp_generic(
    a: BaseTrajData,
    b: BaseTrajData,
    abscissa: impl Fn(&BaseTrajData) -> f64,
    target: f64,
) -> BaseTrajData {
    let (xa, xb) = (abscissa(&a), abscissa(&b));
    let t = if (xb - xa).abs() < f64::EPSILON { 0.0 } else { (target - xa) / (xb - xa) };
    let lerp = |p: f64, q: f64| p + (q - p) * t;
    BaseTrajData {
        time: lerp(a.time, b.time),
        position: Vector3::new(
            lerp(a.position.x, b.position.x),
            lerp(a.position.y, b.position.y),
            lerp(a.position.z, b.position.z),
        ),
        velocity: Vector3::new(
            lerp(a.velocity.x, b.velocity.x),
            lerp(a.velocity.y, b.velocity.y),
            lerp(a.velocity.z, b.velocity.z),
        ),
        mach: lerp(a.mach, b.mach),
    }
}

/// Every raw sample the integrator produced during one `integrate` call,
/// kept around so the caller can later query arbitrary scalar crossings
/// without re-running the integrator (spec §4.5).
#[derive(Debug, Clone, Default)]
pub struct DenseBuffer {
    samples: Vec<BaseTrajData>,
}

impl DenseBuffer {
    pub fn new() -> Self {
        Self { samples: Vec::new() }
    }

    pub fn with_capacity(n: usize) -> Self {
        Self { samples: Vec::with_capacity(n) }
    }

    pub fn push(&mut self, sample: BaseTrajData) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[BaseTrajData] {
        &self.samples
    }

    /// Negative-indexed accessor (`-1` is the last sample), spec §4.5.
    pub fn get(&self, index: isize) -> Option<BaseTrajData> {
        let len = self.samples.len() as isize;
        let i = if index < 0 { len + index } else { index };
        if i < 0 || i >= len {
            None
        } else {
            Some(self.samples[i as usize])
        }
    }

    /// Locate and interpolate the sample where `key` first crosses `value`,
    /// searching forward from the first sample with `time >= start_from_time`.
    pub fn get_at(&self, key: InterpKey, value: f64, start_from_time: f64) -> Result<BaseTrajData, BallisticsError> {
        if self.samples.len() < 2 {
            return Err(BallisticsError::IndexError("dense buffer needs at least 2 samples to search".into()));
        }
        let start = self.samples.partition_point(|s| s.time < start_from_time);

        for i in start..self.samples.len() {
            if (key.extract(&self.samples[i]) - value).abs() <= 1e-9 {
                return Ok(self.samples[i]);
            }
        }

        for i in start..self.samples.len().saturating_sub(1) {
            let a = key.extract(&self.samples[i]);
            let b = key.extract(&self.samples[i + 1]);
            if (a < value && b >= value) || (a > value && b <= value) {
                return self.interpolate_bracket(i, key, value);
            }
        }

        Err(BallisticsError::IndexError(format!(
            "value {value} for {key:?} is not bracketed by any dense sample from t >= {start_from_time}"
        )))
    }

    /// Same as `get_at`, but the key is the derived slant-height scalar
    /// `y*cos(look_angle) - x*sin(look_angle)` rather than a raw field,
    /// spec §4.6 (this is what the zero-crossing event reuses).
    pub fn get_at_slant_height(&self, look_angle_rad: f64, value: f64) -> Result<BaseTrajData, BallisticsError> {
        if self.samples.len() < 2 {
            return Err(BallisticsError::IndexError("dense buffer needs at least 2 samples to search".into()));
        }
        let slant = |s: &BaseTrajData| s.position.y * look_angle_rad.cos() - s.position.x * look_angle_rad.sin();

        for i in 0..self.samples.len() - 1 {
            let a = slant(&self.samples[i]);
            let b = slant(&self.samples[i + 1]);
            if (a <= value && b >= value) || (a >= value && b <= value) {
                if i == 0 {
                    return Ok(linear_interp_generic(self.samples[0], self.samples[1], slant, value));
                }
                let window = [self.samples[i - 1], self.samples[i], self.samples[i + 1]];
                return three_point_interp_generic(window, slant, value);
            }
        }

        Err(BallisticsError::IndexError(format!("slant height {value} ft is never bracketed")))
    }

    /// Interpolate within the bracket `[idx, idx+1]`, using `idx-1` as the
    /// extra Fritsch-Carlson point when available, else a linear fallback.
    pub fn interpolate_at(&self, idx: usize, key: InterpKey, value: f64) -> Result<BaseTrajData, BallisticsError> {
        self.interpolate_bracket(idx, key, value)
    }

    fn interpolate_bracket(&self, idx: usize, key: InterpKey, value: f64) -> Result<BaseTrajData, BallisticsError> {
        if idx + 1 >= self.samples.len() {
            return Err(BallisticsError::IndexError(format!(
                "interpolation bracket index {idx} out of range for {} samples",
                self.samples.len()
            )));
        }
        let abscissa = |s: &BaseTrajData| key.extract(s);
        if idx == 0 {
            let mut result = linear_interp_generic(self.samples[0], self.samples[1], abscissa, value);
            key_overwrite(key, &mut result, value);
            return Ok(result);
        }
        let window = [self.samples[idx - 1], self.samples[idx], self.samples[idx + 1]];
        let mut result = three_point_interp_generic(window, abscissa, value)?;
        key_overwrite(key, &mut result, value);
        Ok(result)
    }
}

fn key_overwrite(key: InterpKey, sample: &mut BaseTrajData, value: f64) {
    match key {
        InterpKey::Time => sample.time = value,
        InterpKey::Mach => sample.mach = value,
        InterpKey::PosX => sample.position.x = value,
        InterpKey::PosY => sample.position.y = value,
        InterpKey::PosZ => sample.position.z = value,
        InterpKey::VelX => sample.velocity.x = value,
        InterpKey::VelY => sample.velocity.y = value,
        InterpKey::VelZ => sample.velocity.z = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample(t: f64, x: f64, y: f64) -> BaseTrajData {
        BaseTrajData { time: t, position: Vector3::new(x, y, 0.0), velocity: Vector3::new(1000.0 - t, 0.0, 0.0), mach: 2.0 - 0.1 * t }
    }

    #[test]
    fn negative_index_returns_last_sample() {
        let mut buf = DenseBuffer::new();
        buf.push(sample(0.0, 0.0, 0.0));
        buf.push(sample(1.0, 100.0, -1.0));
        assert_eq!(buf.get(-1).unwrap().time, 1.0);
        assert_eq!(buf.get(-2).unwrap().time, 0.0);
        assert!(buf.get(-3).is_none());
    }

    #[test]
    fn get_at_finds_range_crossing_via_interpolation() {
        let mut buf = DenseBuffer::new();
        for i in 0..5 {
            buf.push(sample(i as f64, (i * 100) as f64, -(i as f64)));
        }
        let hit = buf.get_at(InterpKey::PosX, 250.0, 0.0).unwrap();
        assert_relative_eq!(hit.position.x, 250.0, epsilon = 1e-6);
        assert_relative_eq!(hit.time, 2.5, epsilon = 0.05);
    }

    #[test]
    fn get_at_errors_when_value_never_bracketed() {
        let mut buf = DenseBuffer::new();
        buf.push(sample(0.0, 0.0, 0.0));
        buf.push(sample(1.0, 100.0, -1.0));
        assert!(buf.get_at(InterpKey::PosX, 999.0, 0.0).is_err());
    }

    #[test]
    fn slant_height_crossing_is_bracketed_correctly() {
        let mut buf = DenseBuffer::new();
        buf.push(sample(0.0, 0.0, -0.2));
        buf.push(sample(0.1, 50.0, -0.05));
        buf.push(sample(0.2, 100.0, 0.1));
        buf.push(sample(0.3, 150.0, 0.2));
        let hit = buf.get_at_slant_height(0.0, 0.0).unwrap();
        assert!(hit.time > 0.1 && hit.time < 0.2);
    }
}
