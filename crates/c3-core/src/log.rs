//! Structured logging helpers shared by every service.
//!
//! Wraps the `log` facade with a small set of macros that prepend per-call
//! context (which service, which node) instead of relying on a global logger
//! configured once at startup.

/// Metadata a caller can attach to a log line without formatting it by hand.
pub trait LogMetadata {
    fn meta(&self) -> String;
}

/// Generic "service + optional node" context used by most call sites.
pub struct LogContext {
    pub service: &'static str,
    pub node: Option<&'static str>,
}

impl LogMetadata for LogContext {
    fn meta(&self) -> String {
        match self.node {
            Some(node) => format!("service={} node={}", self.service, node),
            None => format!("service={}", self.service),
        }
    }
}

// ===== c3_info! =====
macro_rules! c3_info {
    ($ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        log::info!(concat!("[{}] ", $fmt), meta $(, $($arg)+)?);
    }};
    ($fmt:literal $(, $($arg:tt)+)?) => {{
        log::info!($fmt $(, $($arg)+)?);
    }};
}

// ===== c3_warn! =====
macro_rules! c3_warn {
    ($ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        log::warn!(concat!("[{}] ", $fmt), meta $(, $($arg)+)?);
    }};
    ($fmt:literal $(, $($arg:tt)+)?) => {{
        log::warn!($fmt $(, $($arg)+)?);
    }};
}

// ===== c3_error! =====
macro_rules! c3_error {
    ($ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        log::error!(concat!("[{}] ", $fmt), meta $(, $($arg)+)?);
    }};
    ($fmt:literal $(, $($arg:tt)+)?) => {{
        log::error!($fmt $(, $($arg)+)?);
    }};
}

// ===== c3_debug! =====
macro_rules! c3_debug {
    ($ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        log::debug!(concat!("[{}] ", $fmt), meta $(, $($arg)+)?);
    }};
    ($fmt:literal $(, $($arg:tt)+)?) => {{
        log::debug!($fmt $(, $($arg)+)?);
    }};
}

// Re-export macros for use in other files
pub(crate) use c3_debug;
pub(crate) use c3_error;
pub(crate) use c3_info;
pub(crate) use c3_warn;
