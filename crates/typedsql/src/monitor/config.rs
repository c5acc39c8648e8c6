use super::types::LogFlags;
use std::time::Duration;

/// Execution settings carried by a [`crate::Db`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbConfig {
    /// Applied to every call made through the handle. `None` means no timeout.
    pub query_timeout: Option<Duration>,
    /// Calls slower than this are reported as slow by loggers that care.
    pub slow_query_threshold: Option<Duration>,
    /// How many fetched rows to include in the results preview.
    pub results_preview_rows: usize,
    pub log_flags: LogFlags,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            query_timeout: None,
            slow_query_threshold: None,
            results_preview_rows: 5,
            log_flags: LogFlags::COMPACT,
        }
    }
}

impl DbConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    pub fn with_results_preview_rows(mut self, rows: usize) -> Self {
        self.results_preview_rows = rows;
        self
    }

    pub fn with_log_flags(mut self, flags: LogFlags) -> Self {
        self.log_flags = flags;
        self
    }
}
