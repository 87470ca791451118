//! Logging macros gated on a per-module `ENABLE_LOGS` const.
//!
//! A module that wants these defines `const ENABLE_LOGS: bool = ...;` and
//! imports the macros from the crate root. Flipping the const silences the
//! module without touching call sites.

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
