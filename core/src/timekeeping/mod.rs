mod clock;
mod ntp;
mod reconstructor;

pub use clock::{ClockSource, SystemClock, MS_PER_DAY};
pub use ntp::{ClockError, NtpResult, NtpTimeKeeper, DEFAULT_NTP_SERVERS, DEFAULT_NTP_TIMEOUT_MS};
pub use reconstructor::{ReconstructorStats, TimeReconstructor, MIDNIGHT_THRESHOLD_MS};
