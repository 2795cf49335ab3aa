//! Verbosity-gated logging macros for the optimizer.
//!
//! Zero-cost when disabled (verbosity=0). Levels:
//! - 0: SILENT
//! - 1: CHANGES (placements, failures, algorithm dispatch, early stops)
//! - 2: CHECKS (skipped tasks, dependency gating, generation progress)
//! - 3: DEBUG (per-day allocation steps, decode cache traffic)

/// Verbosity levels, compared against `OptimizeParams::verbosity`.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: task placements and failures, search stop reasons.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            eprintln!("[workplan] {}", format_args!($($arg)*));
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: skip reasons and dependency gating.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            eprintln!("[workplan]   {}", format_args!($($arg)*));
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
///
/// Used for: per-day allocation steps and decode cache traffic.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            eprintln!("[workplan]     {}", format_args!($($arg)*));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(VERBOSITY_SILENT < VERBOSITY_CHANGES);
        assert!(VERBOSITY_CHANGES < VERBOSITY_CHECKS);
        assert!(VERBOSITY_CHECKS < VERBOSITY_DEBUG);
    }

    #[test]
    fn test_log_macros_silent() {
        let verbosity = VERBOSITY_SILENT;
        log_changes!(verbosity, "placed {}", "a");
        log_checks!(verbosity, "skipped {}", "b");
        log_debug!(verbosity, "{:.1}h on {}", 2.0, "2025-01-01");
    }
}
