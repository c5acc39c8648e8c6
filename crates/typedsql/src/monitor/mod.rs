//! Structured execution logging.
//!
//! Every fetch, exec and exists call made through a handle that carries a
//! [`QueryLogger`] produces one [`QueryStats`] record: dialect, SQL,
//! arguments, timing, row counts, caller location and an optional preview of
//! the fetched rows.
//!
//! # Example
//!
//! ```rust,ignore
//! use typedsql::{Db, DbConfig, LogFlags, StatsLogger, TracingLogger, CompositeLogger};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let stats = Arc::new(StatsLogger::new());
//! let logger = CompositeLogger::new()
//!     .add(TracingLogger::new().with_slow_threshold(Duration::from_millis(200)))
//!     .add_arc(stats.clone());
//!
//! let db = Db::new(client)
//!     .with_logger(logger)
//!     .with_config(DbConfig::new().with_log_flags(LogFlags::VERBOSE));
//! ```

mod config;
mod format;
mod loggers;
mod types;

#[cfg(feature = "tracing")]
mod tracing_logger;


pub use config::DbConfig;
pub use format::format_stats;
pub use loggers::{CompositeLogger, NoopLogger, StatsLogger, StatsSnapshot, StderrLogger};
pub use types::{ExecFlags, LogFlags, QueryLogger, QueryStats, QueryType};

#[cfg(feature = "tracing")]
pub use tracing_logger::TracingLogger;

/// Longest prefix of `sql` within `max_bytes` that ends on a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
