//! Crate-wide error taxonomy.
//!
//! A single enum covers every failure class named in the error-handling
//! design: protocol-layer codec failures, dispatch failures, Object
//! Dictionary failures, and HAL/driver failures. Narrower subsystem errors
//! convert into this one at the point where they cross into a service's
//! `on_loop`, the same shape as the teacher's `PowerlinkError`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum C3Error {
    // --- EDL codec / protocol errors (never produce a response, §7) ---
    #[error("EDL frame shorter than the minimum frame length")]
    BadFraming,
    #[error("EDL frame CRC mismatch")]
    BadCrc,
    #[error("EDL frame MAC authentication failed")]
    BadAuth,
    #[error("EDL sequence number is not strictly greater than the persisted counter")]
    BadSequence,

    // --- Dispatch errors ---
    #[error("unknown EDL command id {0:#04x}")]
    UnknownCommand(u8),
    #[error("EDL command request payload malformed for command id {0:#04x}")]
    BadRequest(u8),
    /// A handler failed and the command's response schema carries an SDO-style
    /// abort code (only SDO_READ/SDO_WRITE use this, §4.2).
    #[error("handler aborted with code {0:#010x}")]
    HandlerAborted(u32),

    // --- Object Dictionary errors ---
    #[error("no OD entry at index {0:#06x}")]
    NoSuchEntry(u16),
    #[error("OD entry {0:#06x} has a different declared type than the value written")]
    TypeMismatch(u16),
    #[error("value is not a member of the declared enumeration for entry {0:#06x}")]
    InvalidEnumValue(u16),
    #[error("OD entry {0:#06x} is read-only")]
    ReadOnly(u16),

    // --- HAL / driver errors ---
    #[error("I2C transaction failed on bus {bus} address {addr:#04x}: {reason}")]
    I2c {
        bus: u8,
        addr: u8,
        reason: &'static str,
    },
    #[error("GPIO error on pin {0}: {1}")]
    Gpio(&'static str, &'static str),
    #[error("ADC read failed on channel {0}")]
    Adc(u8),
    #[error("RTC access failed: {0}")]
    Rtc(&'static str),
    #[error("non-volatile store access failed: {0}")]
    Storage(&'static str),
    #[error("network I/O failed: {0}")]
    Io(&'static str),

    // --- Node manager ---
    #[error("no node named {0}")]
    NoSuchNode(&'static str),
    #[error("no node at power-domain address {0:#04x}")]
    NoSuchOpdAddress(u8),
    #[error("OPD subsystem is considered dead")]
    OpdDead,

    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl From<std::io::Error> for C3Error {
    fn from(_: std::io::Error) -> Self {
        C3Error::Io("OS I/O error")
    }
}

pub type Result<T> = core::result::Result<T, C3Error>;
