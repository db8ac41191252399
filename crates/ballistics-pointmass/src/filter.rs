//! Event filter (C8): the sparse, flagged row stream derived from the dense
//! buffer's raw samples as the integrator runs.

use ballistics_core::BallisticsError;

use crate::dense::{linear_interp_generic, three_point_interp_generic, BaseTrajData};
use crate::shot::ShotProps;
use crate::trajectory::{derive_row, TrajectoryData};

bitflags::bitflags! {
    /// Which kind of event (or sampling reason) produced a row, spec §4.6.
    /// `RANGE` and `MRT` mark step-sampled rows; the rest mark detected
    /// zero-crossings of a physically meaningful scalar.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TrajFlag: u32 {
        const NONE      = 0;
        const ZERO_UP   = 1 << 0;
        const ZERO_DOWN = 1 << 1;
        const MACH      = 1 << 2;
        const RANGE     = 1 << 3;
        const APEX      = 1 << 4;
        /// Row sampled because a time-step threshold elapsed, not a range step.
        const MRT       = 1 << 5;
        const ZERO      = Self::ZERO_UP.bits() | Self::ZERO_DOWN.bits();
    }
}

/// Builds the sparse `TrajectoryData` row stream for one `integrate` call,
/// consuming raw dense samples one at a time as the integrator produces them.
pub struct EventFilter<'a> {
    shot: &'a ShotProps,
    window: Vec<BaseTrajData>,
    rows: Vec<TrajectoryData>,

    range_step_ft: f64,
    range_limit_ft: f64,
    time_step: f64,
    separate_row_time_delta: f64,

    next_range_k: u64,
    next_time_threshold: f64,

    zero_armed: bool,
    first_interval_seen: bool,
    prev_slant: Option<f64>,
    prev_mach: Option<f64>,
    prev_vy: Option<f64>,
}

impl<'a> EventFilter<'a> {
    pub fn new(
        shot: &'a ShotProps,
        range_step_ft: f64,
        range_limit_ft: f64,
        time_step: f64,
        separate_row_time_delta: f64,
    ) -> Self {
        Self {
            shot,
            window: Vec::with_capacity(3),
            rows: Vec::new(),
            range_step_ft,
            range_limit_ft,
            time_step,
            separate_row_time_delta,
            next_range_k: 0,
            next_time_threshold: time_step,
            zero_armed: false,
            first_interval_seen: false,
            prev_slant: None,
            prev_mach: None,
            prev_vy: None,
        }
    }

    pub fn into_rows(self) -> Vec<TrajectoryData> {
        self.rows
    }

    pub fn rows(&self) -> &[TrajectoryData] {
        &self.rows
    }

    /// Feed the next raw integrator sample.
    pub fn push(&mut self, sample: BaseTrajData) -> Result<(), BallisticsError> {
        if self.window.is_empty() {
            let s0 = self.slant(&sample);
            self.zero_armed = s0 <= 0.0 && self.shot.barrel_elevation_rad > self.shot.look_angle_rad;
            self.prev_slant = Some(s0);
            self.prev_mach = Some(sample.mach);
            self.prev_vy = Some(sample.velocity.y);
            self.maybe_emit_range_rows(None, sample)?;
            self.maybe_emit_time_rows(None, sample)?;
            self.push_window(sample);
            return Ok(());
        }

        let prev = *self.window.last().unwrap();
        self.maybe_emit_range_rows(Some(prev), sample)?;
        self.maybe_emit_time_rows(Some(prev), sample)?;
        self.maybe_emit_zero_crossing(prev, sample)?;
        self.maybe_emit_mach_crossing(prev, sample)?;
        self.maybe_emit_apex(prev, sample)?;

        self.first_interval_seen = true;
        self.prev_slant = Some(self.slant(&sample));
        self.prev_mach = Some(sample.mach);
        self.prev_vy = Some(sample.velocity.y);
        self.push_window(sample);
        Ok(())
    }

    /// Flush a final row for the last sample if it wasn't already recorded.
    pub fn finalize(&mut self, last: BaseTrajData) -> Result<(), BallisticsError> {
        let already_recorded = self.rows.last().is_some_and(|r| (r.time - last.time).abs() <= self.separate_row_time_delta);
        if !already_recorded {
            let flag = if self.range_step_ft > 0.0 && is_multiple_of(last.position.x, self.range_step_ft) {
                TrajFlag::RANGE
            } else {
                TrajFlag::NONE
            };
            self.insert_row(derive_row(last, self.shot, flag));
        }
        Ok(())
    }

    fn push_window(&mut self, sample: BaseTrajData) {
        self.window.push(sample);
        if self.window.len() > 3 {
            self.window.remove(0);
        }
    }

    fn slant(&self, s: &BaseTrajData) -> f64 {
        s.position.y * self.shot.look_angle_rad.cos() - s.position.x * self.shot.look_angle_rad.sin()
    }

    fn interp(
        &self,
        prev: BaseTrajData,
        cur: BaseTrajData,
        abscissa: impl Fn(&BaseTrajData) -> f64,
        target: f64,
    ) -> Result<BaseTrajData, BallisticsError> {
        if self.window.len() >= 2 {
            let extra = self.window[self.window.len() - 2];
            three_point_interp_generic([extra, prev, cur], abscissa, target)
        } else {
            Ok(linear_interp_generic(prev, cur, abscissa, target))
        }
    }

    fn maybe_emit_range_rows(
        &mut self,
        prev: Option<BaseTrajData>,
        cur: BaseTrajData,
    ) -> Result<(), BallisticsError> {
        if self.range_step_ft <= 0.0 {
            return Ok(());
        }
        loop {
            let threshold = self.next_range_k as f64 * self.range_step_ft;
            if threshold > self.range_limit_ft {
                break;
            }
            match prev {
                None => {
                    if threshold == 0.0 {
                        self.insert_row(derive_row(cur, self.shot, TrajFlag::RANGE));
                        self.next_range_k += 1;
                        continue;
                    }
                    break;
                }
                Some(p) => {
                    if cur.position.x < threshold {
                        break;
                    }
                    let row = if p.position.x >= threshold {
                        p
                    } else {
                        self.interp(p, cur, |s| s.position.x, threshold)?
                    };
                    self.insert_row(derive_row(row, self.shot, TrajFlag::RANGE));
                    self.next_range_k += 1;
                }
            }
        }
        Ok(())
    }

    fn maybe_emit_time_rows(&mut self, prev: Option<BaseTrajData>, cur: BaseTrajData) -> Result<(), BallisticsError> {
        if self.time_step <= 0.0 {
            return Ok(());
        }
        let Some(p) = prev else { return Ok(()) };
        while cur.time >= self.next_time_threshold {
            let row = self.interp(p, cur, |s| s.time, self.next_time_threshold)?;
            self.insert_row(derive_row(row, self.shot, TrajFlag::MRT));
            self.next_time_threshold += self.time_step;
        }
        Ok(())
    }

    fn maybe_emit_zero_crossing(&mut self, prev: BaseTrajData, cur: BaseTrajData) -> Result<(), BallisticsError> {
        if !self.shot.filter_flags.intersects(TrajFlag::ZERO) {
            return Ok(());
        }
        let s_prev = self.prev_slant.unwrap_or_else(|| self.slant(&prev));
        let s_cur = self.slant(&cur);
        let eligible = self.first_interval_seen || self.zero_armed;

        if eligible && s_prev <= 0.0 && s_cur > 0.0 && self.shot.filter_flags.contains(TrajFlag::ZERO_UP) {
            let row = self.interp(prev, cur, |s| self.slant(s), 0.0)?;
            self.insert_row(derive_row(row, self.shot, TrajFlag::ZERO_UP));
        } else if eligible && s_prev > 0.0 && s_cur <= 0.0 && self.shot.filter_flags.contains(TrajFlag::ZERO_DOWN) {
            let row = self.interp(prev, cur, |s| self.slant(s), 0.0)?;
            self.insert_row(derive_row(row, self.shot, TrajFlag::ZERO_DOWN));
        }
        Ok(())
    }

    fn maybe_emit_mach_crossing(&mut self, prev: BaseTrajData, cur: BaseTrajData) -> Result<(), BallisticsError> {
        if !self.shot.filter_flags.contains(TrajFlag::MACH) {
            return Ok(());
        }
        let m_prev = self.prev_mach.unwrap_or(prev.mach);
        if m_prev > 1.0 && cur.mach <= 1.0 {
            let row = self.interp(prev, cur, |s| s.mach, 1.0)?;
            self.insert_row(derive_row(row, self.shot, TrajFlag::MACH));
        }
        Ok(())
    }

    fn maybe_emit_apex(&mut self, prev: BaseTrajData, cur: BaseTrajData) -> Result<(), BallisticsError> {
        if !self.shot.filter_flags.contains(TrajFlag::APEX) {
            return Ok(());
        }
        let vy_prev = self.prev_vy.unwrap_or(prev.velocity.y);
        if vy_prev > 0.0 && cur.velocity.y <= 0.0 {
            let row = self.interp(prev, cur, |s| s.velocity.y, 0.0)?;
            self.insert_row(derive_row(row, self.shot, TrajFlag::APEX));
        }
        Ok(())
    }

    /// Merge-insert: if a row with a timestamp within `separate_row_time_delta`
    /// already exists, OR the flags together instead of inserting a duplicate.
    fn insert_row(&mut self, row: TrajectoryData) {
        match self.rows.binary_search_by(|r| r.time.partial_cmp(&row.time).unwrap()) {
            Ok(i) => self.rows[i].flag |= row.flag,
            Err(i) => {
                if i > 0 && (row.time - self.rows[i - 1].time).abs() <= self.separate_row_time_delta {
                    self.rows[i - 1].flag |= row.flag;
                } else if i < self.rows.len() && (self.rows[i].time - row.time).abs() <= self.separate_row_time_delta {
                    self.rows[i].flag |= row.flag;
                } else {
                    self.rows.insert(i, row);
                }
            }
        }
    }
}

fn is_multiple_of(value: f64, step: f64) -> bool {
    if step <= 0.0 {
        return false;
    }
    let k = (value / step).round();
    (value - k * step).abs() <= 1e-6 * step.max(1.0)
}
