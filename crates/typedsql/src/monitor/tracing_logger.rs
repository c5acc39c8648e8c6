use super::truncate_sql_bytes;
use super::types::{LogFlags, QueryLogger, QueryStats};
use crate::context::Context;
use crate::render::interpolate;
use std::borrow::Cow;
use std::time::Duration;
use tracing::Level;

/// Emits one `tracing` event per call on target `typedsql.query`.
///
/// Failed calls are emitted at ERROR and calls slower than the slow
/// threshold at WARN; everything else uses the configured level.
///
/// Enable via the crate feature: `typedsql = { features = ["tracing"] }`.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
    pub slow_threshold: Option<Duration>,
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
            slow_threshold: None,
        }
    }
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    fn truncate_sql<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => {
                Cow::Owned(format!("{}...", truncate_sql_bytes(sql, max)))
            }
            _ => Cow::Borrowed(sql),
        }
    }

    fn level_for(&self, stats: &QueryStats<'_>) -> Level {
        if stats.error.is_some() {
            Level::ERROR
        } else if self.slow_threshold.is_some_and(|t| stats.time_taken >= t) {
            Level::WARN
        } else {
            self.level
        }
    }
}

impl QueryLogger for TracingLogger {
    fn log_query_stats(&self, _ctx: &Context, stats: &QueryStats<'_>) {
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let interpolated;
        let sql = if stats.log_flags.contains(LogFlags::INTERPOLATE) {
            interpolated = interpolate(stats.dialect, stats.query, stats.args)
                .unwrap_or_else(|_| stats.query.to_owned());
            self.truncate_sql(&interpolated)
        } else {
            self.truncate_sql(stats.query)
        };
        let caller = stats
            .caller
            .map(|c| format!("{}:{}", c.file(), c.line()))
            .unwrap_or_default();
        let error = stats.error.map(ToString::to_string).unwrap_or_default();

        emit_at_level!(
            self.level_for(stats),
            target: "typedsql.query",
            query_type = ?stats.query_type(),
            dialect = %stats.dialect,
            elapsed_us = u64::try_from(stats.time_taken.as_micros()).unwrap_or(u64::MAX),
            row_count = stats.row_count,
            rows_affected = stats.rows_affected,
            arg_count = stats.args.len(),
            caller = %caller,
            error = %error,
            sql = %sql,
        );
    }
}
