#![deny(missing_docs)]
//! Shared logging utilities for the relay workspace.
//!
//! This crate provides the `relay_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every line is tagged
//! with the id of the sync run that produced it, so interleaved runs in one log
//! file can be told apart.

use std::cell::Cell;

#[doc(hidden)]
pub use log;

thread_local! {
    /// Thread-local storage for the id of the sync run in progress.
    static RUN_ID: Cell<u64> = const { Cell::new(0) };
}

/// Sets the run id for the current thread.
/// The binary calls this once before starting a sync pass.
pub fn set_run_id(run_id: u64) {
    RUN_ID.with(|v| v.set(run_id));
}

/// Retrieves the run id for the current thread.
/// Returns 0 if no run has been started.
pub fn run_id() -> u64 {
    RUN_ID.with(|v| v.get())
}

/// Logs a trace-level message tagged with the current run id.
#[macro_export]
macro_rules! relay_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!("run={} {}", $crate::run_id(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message tagged with the current run id.
#[macro_export]
macro_rules! relay_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!("run={} {}", $crate::run_id(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message tagged with the current run id.
#[macro_export]
macro_rules! relay_info {
    ($($arg:tt)*) => {{
        $crate::log::info!("run={} {}", $crate::run_id(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message tagged with the current run id.
#[macro_export]
macro_rules! relay_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!("run={} {}", $crate::run_id(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message tagged with the current run id.
#[macro_export]
macro_rules! relay_error {
    ($($arg:tt)*) => {{
        $crate::log::error!("run={} {}", $crate::run_id(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
