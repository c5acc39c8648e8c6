use super::format::format_stats_truncated;
use super::types::{QueryLogger, QueryStats, QueryType};
use crate::context::Context;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// A logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl QueryLogger for NoopLogger {
    fn log_query_stats(&self, _ctx: &Context, _stats: &QueryStats<'_>) {}
}

/// Prints [`crate::format_stats`] lines to stderr.
#[derive(Debug, Clone)]
pub struct StderrLogger {
    /// Only log calls at least this slow.
    pub min_duration: Option<Duration>,
    pub max_sql_length: Option<usize>,
    pub prefix: String,
}

impl Default for StderrLogger {
    fn default() -> Self {
        Self {
            min_duration: None,
            max_sql_length: None,
            prefix: "[typedsql]".to_string(),
        }
    }
}

impl StderrLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_duration(mut self, duration: Duration) -> Self {
        self.min_duration = Some(duration);
        self
    }

    pub fn with_max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

impl QueryLogger for StderrLogger {
    fn log_query_stats(&self, _ctx: &Context, stats: &QueryStats<'_>) {
        if self.min_duration.is_some_and(|min| stats.time_taken < min) {
            return;
        }
        eprintln!(
            "{} {}",
            self.prefix,
            format_stats_truncated(stats, self.max_sql_length)
        );
    }
}

/// Aggregates counters across every logged call.
#[derive(Debug, Default)]
pub struct StatsLogger {
    total_queries: AtomicU64,
    failed_queries: AtomicU64,
    total_duration_nanos: AtomicU64,
    select_count: AtomicU64,
    insert_count: AtomicU64,
    update_count: AtomicU64,
    delete_count: AtomicU64,
    rows_fetched: AtomicU64,
    rows_affected: AtomicU64,
    max_duration_nanos: AtomicU64,
    slowest_query: Mutex<Option<String>>,
}

/// Point-in-time copy of a [`StatsLogger`]'s counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_queries: u64,
    pub failed_queries: u64,
    pub total_duration: Duration,
    pub select_count: u64,
    pub insert_count: u64,
    pub update_count: u64,
    pub delete_count: u64,
    pub rows_fetched: u64,
    pub rows_affected: u64,
    pub max_duration: Duration,
    pub slowest_query: Option<String>,
}

impl StatsLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            total_duration: Duration::from_nanos(self.total_duration_nanos.load(Ordering::Relaxed)),
            select_count: self.select_count.load(Ordering::Relaxed),
            insert_count: self.insert_count.load(Ordering::Relaxed),
            update_count: self.update_count.load(Ordering::Relaxed),
            delete_count: self.delete_count.load(Ordering::Relaxed),
            rows_fetched: self.rows_fetched.load(Ordering::Relaxed),
            rows_affected: self.rows_affected.load(Ordering::Relaxed),
            max_duration: Duration::from_nanos(self.max_duration_nanos.load(Ordering::Relaxed)),
            slowest_query: self
                .slowest_query
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.total_queries,
            &self.failed_queries,
            &self.total_duration_nanos,
            &self.select_count,
            &self.insert_count,
            &self.update_count,
            &self.delete_count,
            &self.rows_fetched,
            &self.rows_affected,
            &self.max_duration_nanos,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        *self
            .slowest_query
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

fn saturating_add(counter: &AtomicU64, n: u64) {
    let prev = counter.fetch_add(n, Ordering::Relaxed);
    if prev.checked_add(n).is_none() {
        counter.store(u64::MAX, Ordering::Relaxed);
    }
}

impl QueryLogger for StatsLogger {
    fn log_query_stats(&self, _ctx: &Context, stats: &QueryStats<'_>) {
        let nanos = u64::try_from(stats.time_taken.as_nanos()).unwrap_or(u64::MAX);
        self.total_queries.fetch_add(1, Ordering::Relaxed);
        saturating_add(&self.total_duration_nanos, nanos);
        saturating_add(&self.rows_fetched, stats.row_count);
        saturating_add(&self.rows_affected, stats.rows_affected);

        let counter = match stats.query_type() {
            QueryType::Select => Some(&self.select_count),
            QueryType::Insert => Some(&self.insert_count),
            QueryType::Update => Some(&self.update_count),
            QueryType::Delete => Some(&self.delete_count),
            QueryType::Other => None,
        };
        if let Some(counter) = counter {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        if !stats.succeeded() {
            self.failed_queries.fetch_add(1, Ordering::Relaxed);
        }

        // Only the call that raises the max records its SQL.
        let mut current_max = self.max_duration_nanos.load(Ordering::Relaxed);
        while nanos > current_max {
            match self.max_duration_nanos.compare_exchange_weak(
                current_max,
                nanos,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    *self
                        .slowest_query
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Some(stats.query.to_owned());
                    break;
                }
                Err(updated) => current_max = updated,
            }
        }
    }
}

/// Fans out to several loggers in insertion order.
#[derive(Default)]
pub struct CompositeLogger {
    loggers: Vec<Arc<dyn QueryLogger>>,
}

impl CompositeLogger {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add<L: QueryLogger + 'static>(mut self, logger: L) -> Self {
        self.loggers.push(Arc::new(logger));
        self
    }

    pub fn add_arc(mut self, logger: Arc<dyn QueryLogger>) -> Self {
        self.loggers.push(logger);
        self
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }
}

impl QueryLogger for CompositeLogger {
    fn log_query_stats(&self, ctx: &Context, stats: &QueryStats<'_>) {
        for logger in &self.loggers {
            logger.log_query_stats(ctx, stats);
        }
    }
}
