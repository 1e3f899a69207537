//! Logging facilities for arbor.
//!
//! This module provides:
//! - Target and span names for filtering `tracing` output by subsystem
//! - [`PerfSpan`], a guard that times an operation inside a tracing span
//! - [`WarnOnce`], the logger service that reports each distinct misuse once
//!
//! # Tracing Integration
//!
//! arbor uses the `tracing` crate for instrumentation. To see logs, install a
//! subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("arbor_grid::selection=debug")
//!     .init();
//! ```

use std::collections::HashSet;
use std::fmt;

use parking_lot::Mutex;

/// Span names used throughout arbor for tracing.
pub mod span_names {
    /// Full row data replacement.
    pub const SET_ROW_DATA: &str = "arbor::set_row_data";
    /// Immutable (diffing) row data replacement.
    pub const SET_IMMUTABLE_ROW_DATA: &str = "arbor::set_immutable_row_data";
    /// Incremental add/update/remove transaction.
    pub const TRANSACTION: &str = "arbor::transaction";
    /// Row model pipeline refresh.
    pub const REFRESH_MODEL: &str = "arbor::refresh_model";
    /// Select-all / deselect-all over a scope.
    pub const SELECT_ALL: &str = "arbor::select_all";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core infrastructure target.
    pub const CORE: &str = "arbor_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "arbor_core::signal";
    /// Performance spans target.
    pub const PERF: &str = "arbor::perf";
    /// Grid facade target.
    pub const GRID: &str = "arbor_grid";
    /// Node manager (leaf array and id index) target.
    pub const NODE_MANAGER: &str = "arbor_grid::node_manager";
    /// Client-side row model pipeline target.
    pub const ROW_MODEL: &str = "arbor_grid::row_model";
    /// Selection engine target.
    pub const SELECTION: &str = "arbor_grid::selection";
    /// Range selection context target.
    pub const RANGE_SELECTION: &str = "arbor_grid::range_selection";
    /// Select-all header feature target.
    pub const SELECT_ALL: &str = "arbor_grid::select_all";
    /// Configuration loading target.
    pub const CONFIG: &str = "arbor_grid::options";
}

/// A guard that emits a tracing span when dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "arbor::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Logger service that emits each warning at most once per key.
///
/// Keys identify the call site, optionally refined with the offending value
/// (for example `"row-not-found:7"`), so a batch containing many malformed
/// items still logs each distinct problem a single time.
///
/// One instance is normally shared by every component of a grid; tests build
/// their own and call [`reset`](Self::reset) between cases.
#[derive(Default)]
pub struct WarnOnce {
    seen: Mutex<HashSet<String>>,
}

impl fmt::Debug for WarnOnce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarnOnce")
            .field("warned", &self.warned_count())
            .finish()
    }
}

impl WarnOnce {
    /// Create a logger that has not warned about anything yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `message` as a warning unless `key` has already been reported.
    ///
    /// Returns `true` if the warning was emitted by this call.
    pub fn warn_once(&self, key: &str, message: impl fmt::Display) -> bool {
        let first = self.seen.lock().insert(key.to_owned());
        if first {
            tracing::warn!(target: targets::CORE, key, "{}", message);
        }
        first
    }

    /// Whether a warning with this key has been emitted.
    pub fn has_warned(&self, key: &str) -> bool {
        self.seen.lock().contains(key)
    }

    /// Number of distinct keys warned about.
    pub fn warned_count(&self) -> usize {
        self.seen.lock().len()
    }

    /// Forget every key, so each warning may be emitted again.
    pub fn reset(&self) {
        self.seen.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn_once_dedups_by_key() {
        let logger = WarnOnce::new();

        assert!(logger.warn_once("duplicate-id:1", "duplicate node id 1"));
        assert!(!logger.warn_once("duplicate-id:1", "duplicate node id 1"));
        assert!(logger.warn_once("duplicate-id:2", "duplicate node id 2"));

        assert!(logger.has_warned("duplicate-id:1"));
        assert!(!logger.has_warned("pinned-row"));
        assert_eq!(logger.warned_count(), 2);
    }

    #[test]
    fn test_reset_allows_warning_again() {
        let logger = WarnOnce::new();
        logger.warn_once("pinned-row", "cannot select pinned rows");
        logger.reset();

        assert_eq!(logger.warned_count(), 0);
        assert!(logger.warn_once("pinned-row", "cannot select pinned rows"));
    }

    #[test]
    fn test_perf_span_enters_and_drops() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let span = PerfSpan::new(span_names::REFRESH_MODEL);
        drop(span);
    }
}
