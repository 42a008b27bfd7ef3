//! `c3_core::hal::Rtc` over the hardware real-time clock: `since_epoch` via
//! sysfs for reads, `RTC_SET_TIME` on `/dev/rtc` for writes (§6, §11.3).

use c3_core::hal::Rtc;
use c3_core::C3Error;
use chrono::{DateTime, Datelike, Timelike};
use std::fs::{self, OpenOptions};
use std::os::unix::io::AsRawFd;

/// Mirrors `struct rtc_time` from `<linux/rtc.h>`: nine `c_int` fields in
/// the same order `gmtime(3)` fills a `struct tm`.
#[repr(C)]
#[derive(Default, Clone, Copy)]
struct RtcTime {
    tm_sec: i32,
    tm_min: i32,
    tm_hour: i32,
    tm_mday: i32,
    tm_mon: i32,
    tm_year: i32,
    tm_wday: i32,
    tm_yday: i32,
    tm_isdst: i32,
}

// RTC_SET_TIME = _IOW('p', 0x0a, struct rtc_time), historically encoded as
// the fixed request number 0x4024700A.
nix::ioctl_write_ptr_bad!(rtc_set_time, 0x4024_700A, RtcTime);

pub struct LinuxRtc {
    device: String,
    since_epoch_path: String,
}

impl LinuxRtc {
    pub fn new(rtc_index: u8) -> Self {
        Self {
            device: format!("/dev/rtc{rtc_index}"),
            since_epoch_path: format!("/sys/class/rtc/rtc{rtc_index}/since_epoch"),
        }
    }
}

impl Rtc for LinuxRtc {
    fn unix_time(&self) -> Result<u32, C3Error> {
        let raw = fs::read_to_string(&self.since_epoch_path).map_err(|_| C3Error::Rtc("since_epoch read failed"))?;
        raw.trim().parse().map_err(|_| C3Error::Rtc("since_epoch not a valid integer"))
    }

    fn set_unix_time(&mut self, seconds: u32) -> Result<(), C3Error> {
        let dt = DateTime::from_timestamp(seconds as i64, 0).ok_or(C3Error::Rtc("timestamp out of range"))?;
        let tm = RtcTime {
            tm_sec: dt.second() as i32,
            tm_min: dt.minute() as i32,
            tm_hour: dt.hour() as i32,
            tm_mday: dt.day() as i32,
            tm_mon: dt.month0() as i32,
            tm_year: dt.year() - 1900,
            tm_wday: 0,
            tm_yday: 0,
            tm_isdst: 0,
        };

        let file = OpenOptions::new()
            .write(true)
            .open(&self.device)
            .map_err(|_| C3Error::Rtc("failed to open rtc device"))?;
        // SAFETY: `tm` is a valid, fully-initialized `rtc_time` and the fd stays
        // open for the duration of the call.
        unsafe { rtc_set_time(file.as_raw_fd(), &tm) }.map_err(|_| C3Error::Rtc("RTC_SET_TIME ioctl failed"))?;
        Ok(())
    }
}

/// Applies a unix timestamp to the OS wall clock, used once at startup to
/// align the system clock to the RTC before any service reads the time
/// (§11.3). Requires `CAP_SYS_TIME`; on a non-root mock run this is expected
/// to fail and the caller should treat it as non-fatal.
pub fn align_system_clock(unix_s: u32) -> Result<(), C3Error> {
    let ts = nix::sys::time::TimeSpec::new(unix_s as i64, 0);
    nix::sys::time::clock_settime(nix::sys::time::ClockId::CLOCK_REALTIME, ts)
        .map_err(|_| C3Error::Rtc("clock_settime failed"))
}
