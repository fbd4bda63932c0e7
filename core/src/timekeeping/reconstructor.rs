//! Rebuilds absolute timestamps from a log clock that only knows the time of
//! day.
//!
//! Lines carry `HH:MM:SS.mmm` since local midnight and may arrive a few
//! seconds out of order. The reconstructor anchors a base date from the
//! clock source (re-anchoring on every AreaEntered), then applies a
//! two-phase midnight scheme: crossing the last minute of the day arms
//! `near_midnight`, and the rollover commits only once a line lands at least
//! half the threshold into the new day. A single threshold would oscillate
//! when late arrivals straddle midnight.

use std::sync::Arc;

use crate::combat_log::CombatEvent;
use crate::pipeline::{Plugin, PluginContext};

use super::clock::{ClockSource, MS_PER_DAY};

#[cfg(test)]
mod tests;

pub const MIDNIGHT_THRESHOLD_MS: i64 = 60_000;

/// Per-stream counters, exposed to the host's statistics report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconstructorStats {
    pub lines_processed: u64,
    pub area_events: u64,
    pub midnight_rollovers: u64,
    pub time_jumps: u64,
    pub late_arrival_total_ms: i64,
    pub max_late_arrival_ms: i64,
}

/// Assigns `epoch_ms` to every event. Runs as the manager-driven built-in at
/// priority -10, ahead of everything else.
pub struct TimeReconstructor {
    clock: Arc<dyn ClockSource>,
    late_arrival_adjustment: bool,
    initialized: bool,
    near_midnight: bool,
    base_date_epoch_ms: i64,
    last_combat_ms: u32,
    last_epoch_ms: i64,
    stats: ReconstructorStats,
}

impl TimeReconstructor {
    pub fn new(clock: Arc<dyn ClockSource>) -> Self {
        Self {
            clock,
            late_arrival_adjustment: true,
            initialized: false,
            near_midnight: false,
            base_date_epoch_ms: 0,
            last_combat_ms: 0,
            last_epoch_ms: 0,
            stats: ReconstructorStats::default(),
        }
    }

    /// Disable the late-arrival clamp to observe raw anchoring. With the
    /// clamp off the emitted sequence is no longer guaranteed monotone.
    pub fn with_late_arrival_adjustment(mut self, enabled: bool) -> Self {
        self.late_arrival_adjustment = enabled;
        self
    }

    pub fn stats(&self) -> ReconstructorStats {
        self.stats
    }

    pub fn base_date_epoch_ms(&self) -> i64 {
        self.base_date_epoch_ms
    }

    pub fn last_combat_ms(&self) -> u32 {
        self.last_combat_ms
    }

    pub fn reset(&mut self) {
        self.initialized = false;
        self.near_midnight = false;
        self.base_date_epoch_ms = 0;
        self.last_combat_ms = 0;
        self.last_epoch_ms = 0;
        self.stats = ReconstructorStats::default();
    }

    /// Assign `epoch_ms` for one event and advance the rollover state.
    pub fn process(&mut self, event: &mut CombatEvent<'_>) {
        let combat_ms = event.time.combat_ms as i64;

        // AreaEntered events re-anchor the base date; anything else only
        // anchors on first sight.
        if event.is_area_entered() {
            self.anchor_base_date(combat_ms);
            self.stats.area_events += 1;
        } else if !self.initialized {
            self.anchor_base_date(combat_ms);
        }

        let mut epoch_ms = if self.near_midnight && combat_ms < 2 * MIDNIGHT_THRESHOLD_MS {
            // already past midnight, rollover not committed yet
            self.base_date_epoch_ms + MS_PER_DAY + combat_ms
        } else {
            self.base_date_epoch_ms + combat_ms
        };

        if event.time.combat_ms < self.last_combat_ms {
            self.stats.time_jumps += 1;
        }

        if self.late_arrival_adjustment && self.stats.lines_processed > 0 && epoch_ms < self.last_epoch_ms
        {
            let adjustment = self.last_epoch_ms - epoch_ms;
            self.stats.late_arrival_total_ms += adjustment;
            self.stats.max_late_arrival_ms = self.stats.max_late_arrival_ms.max(adjustment);
            epoch_ms = self.last_epoch_ms;
        }

        event.time.epoch_ms = epoch_ms;
        self.last_combat_ms = event.time.combat_ms;

        if combat_ms > MS_PER_DAY - MIDNIGHT_THRESHOLD_MS {
            self.near_midnight = true;
        } else if self.near_midnight
            && combat_ms > MIDNIGHT_THRESHOLD_MS / 2
            && combat_ms < MS_PER_DAY - MIDNIGHT_THRESHOLD_MS
        {
            // committed: the whole stream is in the new day now
            self.near_midnight = false;
            self.base_date_epoch_ms += MS_PER_DAY;
            self.stats.midnight_rollovers += 1;
        }

        self.last_epoch_ms = epoch_ms;
        self.stats.lines_processed += 1;
    }

    /// Midnight of "today" per the clock source, rolled back a day while the
    /// line would otherwise land in the future (a log started just before
    /// midnight, read just after it).
    fn anchor_base_date(&mut self, combat_ms: i64) {
        let now = self.clock.now_local_epoch_ms();
        let mut base = self.clock.truncate_to_midnight(now);
        while base + combat_ms > now {
            base -= MS_PER_DAY;
        }
        self.base_date_epoch_ms = base;
        self.near_midnight = false;
        self.initialized = true;
    }
}

impl Plugin for TimeReconstructor {
    fn name(&self) -> &str {
        "time reconstructor"
    }

    fn priority(&self) -> i32 {
        -10
    }

    fn ingest(&mut self, _ctx: &PluginContext<'_>, event: &mut CombatEvent<'_>) {
        self.process(event);
    }

    fn reset(&mut self) {
        TimeReconstructor::reset(self);
    }
}
