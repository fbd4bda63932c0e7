//! Clock abstraction the time reconstructor anchors against.

use std::time::{SystemTime, UNIX_EPOCH};

pub const MS_PER_DAY: i64 = 86_400_000;

/// Source of "now" in the host's local timezone.
///
/// "Local epoch ms" here means Unix epoch milliseconds with the local UTC
/// offset already added, so midnight truncation is plain integer math. The
/// offset is treated as immutable while an encounter is being processed; a
/// re-synchronization never rewrites already-emitted timestamps.
pub trait ClockSource: Send + Sync {
    /// Current local wall-clock time as epoch milliseconds.
    fn now_local_epoch_ms(&self) -> i64;

    /// Offset added to UTC to obtain local time, in milliseconds.
    fn utc_offset_ms(&self) -> i64;

    /// Whether the source has successfully synchronized against an external
    /// reference. An unsynchronized source reports raw host time.
    fn is_synchronized(&self) -> bool;

    /// Midnight of the day containing `epoch_ms`.
    fn truncate_to_midnight(&self, epoch_ms: i64) -> i64 {
        epoch_ms - epoch_ms.rem_euclid(MS_PER_DAY)
    }
}

/// The host clock, shifted into local time via chrono's timezone offset.
/// Never "synchronized": there is no external reference.
#[derive(Debug, Clone)]
pub struct SystemClock {
    zone_offset_ms: i64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            zone_offset_ms: local_utc_offset_ms(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for SystemClock {
    fn now_local_epoch_ms(&self) -> i64 {
        utc_now_ms() + self.zone_offset_ms
    }

    fn utc_offset_ms(&self) -> i64 {
        self.zone_offset_ms
    }

    fn is_synchronized(&self) -> bool {
        false
    }
}

pub(crate) fn utc_now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

pub(crate) fn local_utc_offset_ms() -> i64 {
    chrono::Local::now().offset().local_minus_utc() as i64 * 1000
}
