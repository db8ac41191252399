//! Piecewise-constant wind segments indexed by downrange distance (C4).

use crate::vector::Vector3;

/// One wind segment: constant velocity/direction until `until_distance_ft`.
/// The last segment in a `WindSock` uses `f64::INFINITY` as its sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindSegment {
    pub velocity_fps: f64,
    pub direction_from_rad: f64,
    pub until_distance_ft: f64,
}

impl WindSegment {
    /// Wind vector, spec §3: `(-v*cos(dir), 0, -v*sin(dir))`.
    pub fn vector(&self) -> Vector3 {
        Vector3::new(
            -self.velocity_fps * self.direction_from_rad.cos(),
            0.0,
            -self.velocity_fps * self.direction_from_rad.sin(),
        )
    }
}

/// Ordered wind segments plus a monotonically advancing cursor and the
/// cached vector for the segment currently in effect.
#[derive(Debug, Clone)]
pub struct WindSock {
    segments: Vec<WindSegment>,
    cursor: usize,
    cached_vector: Vector3,
    next_range: f64,
}

impl WindSock {
    /// Build a sock from caller-supplied segments. An empty list is valid
    /// (zero wind everywhere).
    pub fn new(segments: Vec<WindSegment>) -> Self {
        let cached_vector = segments.first().map(WindSegment::vector).unwrap_or(Vector3::ZERO);
        let next_range = segments.first().map(|s| s.until_distance_ft).unwrap_or(f64::INFINITY);
        Self { segments, cursor: 0, cached_vector, next_range }
    }

    /// No wind anywhere.
    pub fn calm() -> Self {
        Self::new(Vec::new())
    }

    /// Advance the cursor (never rewinds) and return the wind vector in
    /// effect at `current_x_ft`, spec §4.3.
    pub fn vector_for_range(&mut self, current_x_ft: f64) -> Vector3 {
        while self.cursor < self.segments.len() && current_x_ft >= self.segments[self.cursor].until_distance_ft {
            self.cursor += 1;
            if self.cursor < self.segments.len() {
                self.cached_vector = self.segments[self.cursor].vector();
                self.next_range = self.segments[self.cursor].until_distance_ft;
            } else {
                self.cached_vector = Vector3::ZERO;
                self.next_range = f64::INFINITY;
            }
        }
        self.cached_vector
    }

    /// Distance at which the cursor will next advance (`+inf` once exhausted).
    pub fn next_range(&self) -> f64 {
        self.next_range
    }
}
