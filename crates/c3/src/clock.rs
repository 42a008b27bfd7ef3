//! Wall-clock seconds shared by every service.
//!
//! The RTC is read once at startup to align the OS clock (`main.rs`); every
//! service thereafter reads the system clock rather than the RTC device
//! directly, the same boot-time-align-then-use-system-clock split the
//! reference daemon draws between its RTC subsystem and its services.

use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_unix_s() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}
