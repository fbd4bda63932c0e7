//! RFC 5905 client-mode time queries and the cached offset they produce.
//!
//! One 48-byte request per server, first byte 0x1B (LI=0, VN=3, Mode=3),
//! everything else zero. Servers are tried in order until one returns a
//! mode-4 response with a usable stratum. Synchronization happens out of
//! band (typically once at startup); the ingestion path only ever reads the
//! cached offset.

use std::net::{ToSocketAddrs, UdpSocket};
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use super::clock::{local_utc_offset_ms, utc_now_ms, ClockSource};

const NTP_PORT: u16 = 123;
const NTP_PACKET_LEN: usize = 48;
/// Seconds between the NTP epoch (1900) and the Unix epoch (1970).
const NTP_EPOCH_OFFSET_S: i64 = 2_208_988_800;
const MAX_OFFSET_MS: i64 = 24 * 3600 * 1000;
const MAX_ROUND_TRIP_MS: i64 = 10_000;

pub const DEFAULT_NTP_TIMEOUT_MS: u64 = 5_000;

pub const DEFAULT_NTP_SERVERS: [&str; 8] = [
    "0.pool.ntp.org",
    "1.pool.ntp.org",
    "2.pool.ntp.org",
    "3.pool.ntp.org",
    "time.windows.com",
    "time-a-g.nist.gov",
    "time-b-g.nist.gov",
    "time-c-g.nist.gov",
];

/// A failed NTP exchange. Never fatal to ingestion: the keeper keeps its
/// prior offset (zero on first use).
#[derive(Debug, Error)]
pub enum ClockError {
    #[error("failed to reach {server}: {message}")]
    Query { server: String, message: String },

    #[error("invalid NTP response from {server}: {message}")]
    InvalidResponse { server: String, message: String },

    #[error("all NTP servers failed")]
    AllServersFailed,
}

/// Outcome of the most recent query attempt.
#[derive(Debug, Clone)]
pub struct NtpResult {
    pub server: String,
    pub offset_ms: i64,
    pub round_trip_ms: i64,
    pub queried_at_epoch_ms: i64,
    pub error: Option<String>,
}

impl NtpResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Default)]
struct NtpState {
    synchronized: bool,
    offset_ms: i64,
    zone_offset_ms: i64,
    last_result: Option<NtpResult>,
}

/// Queries NTP servers and holds the resulting offset to the host clock.
///
/// The offset is the only process-wide mutable state in the system; all
/// access goes through the internal lock.
pub struct NtpTimeKeeper {
    servers: Vec<String>,
    timeout: Duration,
    state: Mutex<NtpState>,
}

impl NtpTimeKeeper {
    pub fn new(servers: Vec<String>, timeout_ms: u64) -> Self {
        let servers = if servers.is_empty() {
            DEFAULT_NTP_SERVERS.iter().map(|s| s.to_string()).collect()
        } else {
            servers
        };
        Self {
            servers,
            timeout: Duration::from_millis(timeout_ms),
            state: Mutex::new(NtpState {
                zone_offset_ms: local_utc_offset_ms(),
                ..NtpState::default()
            }),
        }
    }

    /// Walk the server list until one answers sanely, then cache its offset.
    /// Idempotent unless `force` is set. A failure leaves the prior offset in
    /// place and is recorded in [`NtpTimeKeeper::last_result`].
    pub fn synchronize(&self, force: bool) -> Result<i64, ClockError> {
        let zone = local_utc_offset_ms();
        let mut state = self.lock();
        state.zone_offset_ms = zone;
        if state.synchronized && !force {
            return Ok(state.offset_ms);
        }

        for server in &self.servers {
            match self.query_server(server) {
                Ok(result) => {
                    debug!(
                        server,
                        offset_ms = result.offset_ms,
                        round_trip_ms = result.round_trip_ms,
                        "ntp synchronized"
                    );
                    state.offset_ms = result.offset_ms;
                    state.synchronized = true;
                    state.last_result = Some(result.clone());
                    return Ok(result.offset_ms);
                }
                Err(err) => {
                    warn!(server, %err, "ntp query failed");
                    state.last_result = Some(NtpResult {
                        server: server.clone(),
                        offset_ms: 0,
                        round_trip_ms: 0,
                        queried_at_epoch_ms: utc_now_ms(),
                        error: Some(err.to_string()),
                    });
                }
            }
        }
        Err(ClockError::AllServersFailed)
    }

    pub fn offset_ms(&self) -> i64 {
        self.lock().offset_ms
    }

    pub fn last_result(&self) -> Option<NtpResult> {
        self.lock().last_result.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NtpState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn query_server(&self, server: &str) -> Result<NtpResult, ClockError> {
        let query_err = |message: String| ClockError::Query {
            server: server.to_string(),
            message,
        };
        let bad_response = |message: String| ClockError::InvalidResponse {
            server: server.to_string(),
            message,
        };

        let addr = (server, NTP_PORT)
            .to_socket_addrs()
            .map_err(|e| query_err(format!("dns lookup failed: {e}")))?
            .next()
            .ok_or_else(|| query_err("dns lookup returned no addresses".into()))?;

        let socket =
            UdpSocket::bind(("0.0.0.0", 0)).map_err(|e| query_err(format!("bind failed: {e}")))?;
        socket
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| query_err(format!("timeout setup failed: {e}")))?;
        socket
            .set_write_timeout(Some(self.timeout))
            .map_err(|e| query_err(format!("timeout setup failed: {e}")))?;

        let mut request = [0u8; NTP_PACKET_LEN];
        request[0] = 0x1B; // LI=0, VN=3, Mode=3 (client)

        let t1 = utc_now_ms();
        socket
            .send_to(&request, addr)
            .map_err(|e| query_err(format!("send failed: {e}")))?;

        let mut response = [0u8; NTP_PACKET_LEN];
        let (received, _) = socket
            .recv_from(&mut response)
            .map_err(|e| query_err(format!("receive failed: {e}")))?;
        let t4 = utc_now_ms();

        if received < NTP_PACKET_LEN {
            return Err(bad_response(format!("short packet ({received} bytes)")));
        }
        let mode = response[0] & 0x07;
        if mode != 4 {
            return Err(bad_response(format!("mode {mode}, expected server (4)")));
        }
        let stratum = response[1];
        if stratum == 0 || stratum >= 16 {
            return Err(bad_response(format!("server unsynchronized (stratum {stratum})")));
        }

        // receive timestamp at offset 32, transmit at offset 40
        let t2 = ntp_to_epoch_ms(be_u32(&response[32..36]), be_u32(&response[36..40]));
        let t3 = ntp_to_epoch_ms(be_u32(&response[40..44]), be_u32(&response[44..48]));

        let offset_ms = ((t2 - t1) + (t3 - t4)) / 2;
        let round_trip_ms = (t4 - t1) - (t3 - t2);

        if offset_ms.abs() > MAX_OFFSET_MS {
            return Err(bad_response(format!("offset unreasonably large: {offset_ms}ms")));
        }
        if !(0..=MAX_ROUND_TRIP_MS).contains(&round_trip_ms) {
            return Err(bad_response(format!(
                "round-trip delay unreasonable: {round_trip_ms}ms"
            )));
        }

        Ok(NtpResult {
            server: server.to_string(),
            offset_ms,
            round_trip_ms,
            queried_at_epoch_ms: t1,
            error: None,
        })
    }
}

impl Default for NtpTimeKeeper {
    fn default() -> Self {
        Self::new(Vec::new(), DEFAULT_NTP_TIMEOUT_MS)
    }
}

impl ClockSource for NtpTimeKeeper {
    fn now_local_epoch_ms(&self) -> i64 {
        let state = self.lock();
        utc_now_ms() + state.offset_ms + state.zone_offset_ms
    }

    fn utc_offset_ms(&self) -> i64 {
        self.lock().zone_offset_ms
    }

    fn is_synchronized(&self) -> bool {
        self.lock().synchronized
    }
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// NTP seconds-since-1900 plus a 2^32 fraction, as Unix epoch milliseconds.
fn ntp_to_epoch_ms(seconds: u32, fraction: u32) -> i64 {
    let unix_seconds = seconds as i64 - NTP_EPOCH_OFFSET_S;
    let frac_ms = ((fraction as u64 * 1000) >> 32) as i64;
    unix_seconds * 1000 + frac_ms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ntp_timestamp_conversion() {
        // 1900-01-01 + NTP_EPOCH_OFFSET_S seconds == the Unix epoch
        assert_eq!(ntp_to_epoch_ms(NTP_EPOCH_OFFSET_S as u32, 0), 0);
        // half of 2^32 is half a second
        assert_eq!(ntp_to_epoch_ms(NTP_EPOCH_OFFSET_S as u32, 1 << 31), 500);
    }

    #[test]
    fn unsynchronized_keeper_reports_host_time() {
        let keeper = NtpTimeKeeper::default();
        assert!(!keeper.is_synchronized());
        assert_eq!(keeper.offset_ms(), 0);
        let now = keeper.now_local_epoch_ms();
        let host = utc_now_ms() + keeper.utc_offset_ms();
        assert!((now - host).abs() < 2_000);
    }

    #[test]
    fn midnight_truncation() {
        let keeper = NtpTimeKeeper::default();
        let midnight = keeper.truncate_to_midnight(1_735_725_600_123);
        assert_eq!(midnight % super::super::clock::MS_PER_DAY, 0);
        assert!(midnight <= 1_735_725_600_123);
        assert!(1_735_725_600_123 - midnight < super::super::clock::MS_PER_DAY);
    }
}
