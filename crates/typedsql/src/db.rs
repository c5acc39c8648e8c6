//! Running built statements: fetch, exec and exists.
//!
//! All entry points render the statement into pooled scratch buffers, run it
//! through a [`Queryer`] on the calling task and, when the handle carries a
//! [`QueryLogger`], report one [`QueryStats`] record per call. Nothing is
//! retried; driver errors come back as they were raised.
//!
//! # Example
//!
//! ```ignore
//! let db = Db::new(client).with_logger(TracingLogger::new());
//! let u = Users::aliased("u");
//!
//! let names = fetch_all(&db, &Postgres.from(u.clone()).where_(u.active.eq_bool(true)), |row| {
//!     Ok(row.string(&u.name))
//! })
//! .await?;
//!
//! let res = exec(
//!     &db,
//!     &Postgres.update(u.clone()).set([u.active.set_bool(false)]).where_(u.user_id.eq_int(1)),
//!     ExecFlags::ROWS_AFFECTED,
//! )
//! .await?;
//! ```

use crate::client::{DbRow, ExecResult, Queryer};
use crate::context::Context;
use crate::error::{SqError, SqResult};
use crate::field::{Field, FieldRef, literal};
use crate::monitor::{DbConfig, ExecFlags, LogFlags, QueryLogger, QueryStats};
use crate::pool::{BufferPool, PooledArgs, PooledBuf};
use crate::query::Query;
use crate::render::{
    Dialect, NamedParams, SqlWriter, interpolate, question_interpolate, write_question_to_dollar,
};
use crate::row::{Requested, Row};
use crate::value::Scalar;
use std::fmt::{self, Write as _};
use std::future::Future;
use std::panic::Location;
use std::sync::Arc;
use std::time::Instant;

/// A [`Queryer`] bundled with logging, configuration and a buffer pool.
pub struct Db<Q> {
    inner: Q,
    logger: Option<Arc<dyn QueryLogger>>,
    config: DbConfig,
    pool: Arc<BufferPool>,
}

impl<Q: fmt::Debug> fmt::Debug for Db<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("inner", &self.inner)
            .field("logger", &self.logger.is_some())
            .field("config", &self.config)
            .field("pool", &self.pool)
            .finish()
    }
}

impl<Q> Db<Q> {
    pub fn new(inner: Q) -> Self {
        Self {
            inner,
            logger: None,
            config: DbConfig::default(),
            pool: Arc::new(BufferPool::new()),
        }
    }

    pub fn with_logger(self, logger: impl QueryLogger + 'static) -> Self {
        self.with_logger_arc(Arc::new(logger))
    }

    pub fn with_logger_arc(mut self, logger: Arc<dyn QueryLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_config(mut self, config: DbConfig) -> Self {
        self.config = config;
        self
    }

    /// Share one pool between several handles.
    pub fn with_buffer_pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.pool = pool;
        self
    }

    pub fn inner(&self) -> &Q {
        &self.inner
    }

    pub fn into_inner(self) -> Q {
        self.inner
    }

    /// Wrap another handle (e.g. a transaction) with this handle's settings.
    pub fn with_queryer<T>(&self, inner: T) -> Db<T> {
        Db {
            inner,
            logger: self.logger.clone(),
            config: self.config,
            pool: Arc::clone(&self.pool),
        }
    }

    fn scoped(&self, ctx: &Context) -> Context {
        match self.config.query_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx.clone(),
        }
    }
}

impl Db<tokio_postgres::Client> {
    /// Begin a transaction that logs through this handle.
    pub async fn transaction(&mut self) -> SqResult<Db<tokio_postgres::Transaction<'_>>> {
        let tx = self.inner.transaction().await?;
        Ok(Db {
            inner: tx,
            logger: self.logger.clone(),
            config: self.config,
            pool: Arc::clone(&self.pool),
        })
    }
}

impl Db<tokio_postgres::Transaction<'_>> {
    pub async fn commit(self) -> SqResult<()> {
        self.inner.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> SqResult<()> {
        self.inner.rollback().await?;
        Ok(())
    }

    /// Open a named savepoint that logs through this handle.
    pub async fn savepoint(&mut self, name: &str) -> SqResult<Db<tokio_postgres::Transaction<'_>>> {
        let sp = self.inner.savepoint(name).await?;
        Ok(Db {
            inner: sp,
            logger: self.logger.clone(),
            config: self.config,
            pool: Arc::clone(&self.pool),
        })
    }
}

impl<Q: Queryer> Queryer for Db<Q> {
    async fn query(&self, sql: &str, args: &[Scalar]) -> SqResult<Vec<DbRow>> {
        self.query_context(&Context::background(), sql, args).await
    }

    async fn query_row(&self, sql: &str, args: &[Scalar]) -> SqResult<Option<DbRow>> {
        self.query_row_context(&Context::background(), sql, args)
            .await
    }

    async fn exec(&self, sql: &str, args: &[Scalar]) -> SqResult<ExecResult> {
        self.exec_context(&Context::background(), sql, args).await
    }

    async fn query_context(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[Scalar],
    ) -> SqResult<Vec<DbRow>> {
        let ctx = self.scoped(ctx);
        self.inner.query_context(&ctx, sql, args).await
    }

    async fn query_row_context(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[Scalar],
    ) -> SqResult<Option<DbRow>> {
        let ctx = self.scoped(ctx);
        self.inner.query_row_context(&ctx, sql, args).await
    }

    async fn exec_context(&self, ctx: &Context, sql: &str, args: &[Scalar]) -> SqResult<ExecResult> {
        let ctx = self.scoped(ctx);
        self.inner.exec_context(&ctx, sql, args).await
    }

    fn logger(&self) -> Option<&Arc<dyn QueryLogger>> {
        self.logger.as_ref()
    }

    fn buffer_pool(&self) -> Option<&Arc<BufferPool>> {
        Some(&self.pool)
    }

    fn config(&self) -> Option<&DbConfig> {
        Some(&self.config)
    }
}

/// A failed fetch, with the number of rows processed before the failure.
#[derive(Debug, thiserror::Error)]
#[error("fetch failed after {row_count} rows")]
pub struct FetchError {
    pub row_count: u64,
    #[source]
    pub error: SqError,
}

impl From<FetchError> for SqError {
    fn from(err: FetchError) -> Self {
        err.error
    }
}

/// Run `query` and call `mapper` once per row. Returns the row count.
///
/// `mapper` is first called once with a discovery row to learn which fields
/// it reads; see [`Row`]. Returning [`SqError::SkipRows`] stops iteration
/// without failing.
#[track_caller]
pub fn fetch<'a, Q, S, F>(
    db: &'a Q,
    query: &'a S,
    mapper: F,
) -> impl Future<Output = Result<u64, FetchError>> + Send + 'a
where
    Q: Queryer,
    S: Query + ?Sized,
    F: FnMut(&mut Row<'_>) -> SqResult<()> + Send + 'a,
{
    let caller = Location::caller();
    async move { fetch_impl(&Context::background(), db, query, mapper, caller).await }
}

/// [`fetch`] under a caller-supplied [`Context`].
#[track_caller]
pub fn fetch_context<'a, Q, S, F>(
    ctx: &'a Context,
    db: &'a Q,
    query: &'a S,
    mapper: F,
) -> impl Future<Output = Result<u64, FetchError>> + Send + 'a
where
    Q: Queryer,
    S: Query + ?Sized,
    F: FnMut(&mut Row<'_>) -> SqResult<()> + Send + 'a,
{
    let caller = Location::caller();
    async move { fetch_impl(ctx, db, query, mapper, caller).await }
}

/// Run `query` and collect one mapped value per row.
#[track_caller]
pub fn fetch_all<'a, Q, S, T, F>(
    db: &'a Q,
    query: &'a S,
    mapper: F,
) -> impl Future<Output = SqResult<Vec<T>>> + Send + 'a
where
    Q: Queryer,
    S: Query + ?Sized,
    T: Send + 'a,
    F: FnMut(&mut Row<'_>) -> SqResult<T> + Send + 'a,
{
    let caller = Location::caller();
    async move { fetch_all_impl(&Context::background(), db, query, mapper, caller).await }
}

/// [`fetch_all`] under a caller-supplied [`Context`].
#[track_caller]
pub fn fetch_all_context<'a, Q, S, T, F>(
    ctx: &'a Context,
    db: &'a Q,
    query: &'a S,
    mapper: F,
) -> impl Future<Output = SqResult<Vec<T>>> + Send + 'a
where
    Q: Queryer,
    S: Query + ?Sized,
    T: Send + 'a,
    F: FnMut(&mut Row<'_>) -> SqResult<T> + Send + 'a,
{
    let caller = Location::caller();
    async move { fetch_all_impl(ctx, db, query, mapper, caller).await }
}

/// Run a statement that returns no rows.
///
/// Requesting [`ExecFlags::LAST_INSERT_ID`] from a driver that does not
/// report it is an error.
#[track_caller]
pub fn exec<'a, Q, S>(
    db: &'a Q,
    query: &'a S,
    flags: ExecFlags,
) -> impl Future<Output = SqResult<ExecResult>> + Send + 'a
where
    Q: Queryer,
    S: Query + ?Sized,
{
    let caller = Location::caller();
    async move { exec_impl(&Context::background(), db, query, flags, caller).await }
}

/// [`exec`] under a caller-supplied [`Context`].
#[track_caller]
pub fn exec_context<'a, Q, S>(
    ctx: &'a Context,
    db: &'a Q,
    query: &'a S,
    flags: ExecFlags,
) -> impl Future<Output = SqResult<ExecResult>> + Send + 'a
where
    Q: Queryer,
    S: Query + ?Sized,
{
    let caller = Location::caller();
    async move { exec_impl(ctx, db, query, flags, caller).await }
}

/// Whether `query` matches any row: `SELECT EXISTS(SELECT 1 ...)`.
#[track_caller]
pub fn exists<'a, Q, S>(db: &'a Q, query: &'a S) -> impl Future<Output = SqResult<bool>> + Send + 'a
where
    Q: Queryer,
    S: Query + ?Sized,
{
    let caller = Location::caller();
    async move { exists_impl(&Context::background(), db, query, caller).await }
}

/// [`exists`] under a caller-supplied [`Context`].
#[track_caller]
pub fn exists_context<'a, Q, S>(
    ctx: &'a Context,
    db: &'a Q,
    query: &'a S,
) -> impl Future<Output = SqResult<bool>> + Send + 'a
where
    Q: Queryer,
    S: Query + ?Sized,
{
    let caller = Location::caller();
    async move { exists_impl(ctx, db, query, caller).await }
}

/// Per-call rendering buffers, checked out of the handle's pool.
struct Scratch<'p> {
    dialect: Dialect,
    raw: PooledBuf<'p>,
    converted: PooledBuf<'p>,
    args: PooledArgs<'p>,
    params: NamedParams,
    preview: PooledBuf<'p>,
    rendered: bool,
}

impl<'p> Scratch<'p> {
    fn new(pool: &'p BufferPool, dialect: Dialect) -> Self {
        Self {
            dialect,
            raw: pool.checkout_buf(),
            converted: pool.checkout_buf(),
            args: pool.checkout_args(),
            params: NamedParams::new(),
            preview: pool.checkout_buf(),
            rendered: false,
        }
    }

    /// Render `query`, optionally wrapped in `prefix` / `suffix`.
    ///
    /// On error the partial SQL stays in `raw` for the log line.
    fn render<T: Query + ?Sized>(&mut self, query: &T, wrap: Option<(&str, &str)>) -> SqResult<()> {
        let mut w = SqlWriter::from_parts(
            self.dialect,
            std::mem::take(&mut *self.raw),
            std::mem::take(&mut *self.args),
        );
        let result = write_wrapped(&mut w, query, wrap);
        let (raw, args, params) = w.into_parts();
        *self.raw = raw;
        *self.args = args;
        self.params = params;
        result?;
        if self.dialect.uses_dollar_placeholders() {
            self.converted.clear();
            write_question_to_dollar(&self.raw, &mut self.converted);
        }
        self.rendered = true;
        Ok(())
    }

    /// SQL as sent to the driver.
    fn sql(&self) -> &str {
        if self.dialect.uses_dollar_placeholders() {
            &self.converted
        } else {
            &self.raw
        }
    }
}

fn write_wrapped<T: Query + ?Sized>(
    w: &mut SqlWriter,
    query: &T,
    wrap: Option<(&str, &str)>,
) -> SqResult<()> {
    if let Some((prefix, _)) = wrap {
        w.push_str(prefix);
    }
    query.write_sql(w)?;
    if let Some((_, suffix)) = wrap {
        w.push_str(suffix);
    }
    Ok(())
}

/// Counts reported alongside a finished call.
#[derive(Default)]
struct Outcome {
    row_count: u64,
    rows_affected: u64,
    last_insert_id: Option<i64>,
    exec_flags: Option<ExecFlags>,
}

struct CallLog<'c> {
    ctx: &'c Context,
    logger: Option<&'c Arc<dyn QueryLogger>>,
    log_flags: LogFlags,
    caller: &'static Location<'static>,
    start: Instant,
}

impl<'c> CallLog<'c> {
    fn new<Q: Queryer>(ctx: &'c Context, db: &'c Q, caller: &'static Location<'static>) -> Self {
        let logger = db.logger();
        let log_flags = match (logger, db.config()) {
            (Some(_), Some(config)) => config.log_flags,
            (Some(_), None) => DbConfig::default().log_flags,
            (None, _) => LogFlags::empty(),
        };
        Self {
            ctx,
            logger,
            log_flags,
            caller,
            start: Instant::now(),
        }
    }

    fn preview_rows<Q: Queryer>(&self, db: &Q) -> usize {
        if !self.log_flags.contains(LogFlags::RESULTS) {
            return 0;
        }
        db.config()
            .map_or(DbConfig::default().results_preview_rows, |c| c.results_preview_rows)
    }

    fn finish(&self, scratch: &Scratch<'_>, error: Option<&SqError>, outcome: Outcome) {
        let Some(logger) = self.logger else {
            return;
        };
        if self.ctx.is_done() {
            return;
        }
        let stopped;
        let query = match error {
            Some(err) if !scratch.rendered => {
                stopped = format!("{} <STOPPED DUE TO ERROR: {err}>", scratch.raw.as_str());
                stopped.as_str()
            }
            _ => scratch.sql(),
        };
        let stats = QueryStats {
            dialect: scratch.dialect,
            query,
            args: &scratch.args,
            params: &scratch.params,
            error,
            caller: Some(self.caller),
            row_count: outcome.row_count,
            rows_affected: outcome.rows_affected,
            last_insert_id: outcome.last_insert_id,
            results_preview: (!scratch.preview.is_empty()).then_some(scratch.preview.as_str()),
            exec_flags: outcome.exec_flags,
            log_flags: self.log_flags,
            time_taken: self.start.elapsed(),
        };
        logger.log_query_stats(self.ctx, &stats);
    }
}

async fn fetch_impl<Q, S, F>(
    ctx: &Context,
    db: &Q,
    query: &S,
    mut mapper: F,
    caller: &'static Location<'static>,
) -> Result<u64, FetchError>
where
    Q: Queryer,
    S: Query + ?Sized,
    F: FnMut(&mut Row<'_>) -> SqResult<()> + Send,
{
    let log = CallLog::new(ctx, db, caller);
    let local_pool = BufferPool::with_capacity(0);
    let pool = db.buffer_pool().map_or(&local_pool, Arc::as_ref);
    let mut scratch = Scratch::new(pool, query.dialect());
    let mut row_count = 0;
    let preview_rows = log.preview_rows(db);

    let result = fetch_rows(
        ctx,
        db,
        query,
        &mut mapper,
        &mut scratch,
        &mut row_count,
        preview_rows,
    )
    .await;

    log.finish(
        &scratch,
        result.as_ref().err(),
        Outcome {
            row_count,
            ..Outcome::default()
        },
    );
    result
        .map(|()| row_count)
        .map_err(|error| FetchError { row_count, error })
}

async fn fetch_rows<Q, S, F>(
    ctx: &Context,
    db: &Q,
    query: &S,
    mapper: &mut F,
    scratch: &mut Scratch<'_>,
    row_count: &mut u64,
    preview_rows: usize,
) -> SqResult<()>
where
    Q: Queryer,
    S: Query + ?Sized,
    F: FnMut(&mut Row<'_>) -> SqResult<()> + Send,
{
    let mut discovery = Row::discover();
    match mapper(&mut discovery) {
        Ok(()) => {}
        Err(err) if err.is_skip_rows() => {}
        Err(err) => return Err(err),
    }
    let requested = discovery.into_requested();
    let fields: Vec<FieldRef> = requested.iter().map(|(f, _)| Arc::clone(f)).collect();
    let query = query.with_fetchable_fields(fields)?;
    scratch.render(query.as_ref(), None)?;

    let rows = db.query_context(ctx, scratch.sql(), &scratch.args).await?;
    if requested.is_empty() {
        return Ok(());
    }

    let preview_limit = preview_rows as u64;
    for data in &rows {
        *row_count += 1;
        if *row_count <= preview_limit {
            write_preview(&mut scratch.preview, *row_count, &requested, data);
        }
        let mut row = Row::live(data);
        let result = mapper(&mut row);
        let failures = row.into_failures();
        if !failures.is_empty() {
            return Err(scan_error(scratch, &requested, &failures));
        }
        match result {
            Ok(()) => {}
            Err(err) if err.is_skip_rows() => break,
            Err(err) => return Err(err),
        }
    }
    if preview_limit > 0 && *row_count > preview_limit {
        let _ = write!(
            scratch.preview,
            "\n...\n({} more rows)",
            *row_count - preview_limit
        );
    }
    Ok(())
}

async fn fetch_all_impl<Q, S, T, F>(
    ctx: &Context,
    db: &Q,
    query: &S,
    mut mapper: F,
    caller: &'static Location<'static>,
) -> SqResult<Vec<T>>
where
    Q: Queryer,
    S: Query + ?Sized,
    T: Send,
    F: FnMut(&mut Row<'_>) -> SqResult<T> + Send,
{
    let mut items = Vec::new();
    fetch_impl(
        ctx,
        db,
        query,
        |row: &mut Row<'_>| {
            let item = mapper(row)?;
            if row.is_live() {
                items.push(item);
            }
            Ok(())
        },
        caller,
    )
    .await?;
    Ok(items)
}

async fn exec_impl<Q, S>(
    ctx: &Context,
    db: &Q,
    query: &S,
    flags: ExecFlags,
    caller: &'static Location<'static>,
) -> SqResult<ExecResult>
where
    Q: Queryer,
    S: Query + ?Sized,
{
    let log = CallLog::new(ctx, db, caller);
    let local_pool = BufferPool::with_capacity(0);
    let pool = db.buffer_pool().map_or(&local_pool, Arc::as_ref);
    let mut scratch = Scratch::new(pool, query.dialect());

    let result: SqResult<ExecResult> = async {
        scratch.render(query, None)?;
        let res = db.exec_context(ctx, scratch.sql(), &scratch.args).await?;
        if flags.contains(ExecFlags::LAST_INSERT_ID) && res.last_insert_id.is_none() {
            return Err(SqError::Driver(format!(
                "{} driver does not report the last insert id",
                scratch.dialect
            )));
        }
        Ok(ExecResult {
            rows_affected: if flags.contains(ExecFlags::ROWS_AFFECTED) {
                res.rows_affected
            } else {
                0
            },
            last_insert_id: res.last_insert_id.filter(|_| flags.contains(ExecFlags::LAST_INSERT_ID)),
        })
    }
    .await;

    let outcome = match &result {
        Ok(res) => Outcome {
            rows_affected: res.rows_affected,
            last_insert_id: res.last_insert_id,
            exec_flags: Some(flags),
            ..Outcome::default()
        },
        Err(_) => Outcome {
            exec_flags: Some(flags),
            ..Outcome::default()
        },
    };
    log.finish(&scratch, result.as_ref().err(), outcome);
    result
}

async fn exists_impl<Q, S>(
    ctx: &Context,
    db: &Q,
    query: &S,
    caller: &'static Location<'static>,
) -> SqResult<bool>
where
    Q: Queryer,
    S: Query + ?Sized,
{
    let log = CallLog::new(ctx, db, caller);
    let local_pool = BufferPool::with_capacity(0);
    let pool = db.buffer_pool().map_or(&local_pool, Arc::as_ref);
    let mut scratch = Scratch::new(pool, query.dialect());

    let result: SqResult<bool> = async {
        let inner = query.with_fetchable_fields(vec![Arc::new(literal("1")) as FieldRef])?;
        scratch.render(inner.as_ref(), Some(("SELECT EXISTS(", ")")))?;
        let row = db
            .query_row_context(ctx, scratch.sql(), &scratch.args)
            .await?;
        match row.as_ref().and_then(|r| r.get(0)) {
            None => Ok(false),
            Some(Scalar::Bool(b)) => Ok(*b),
            Some(Scalar::Int(i)) => Ok(*i != 0),
            Some(other) => Err(SqError::decode(
                "exists",
                format!("expected a boolean, got {}", other.type_name()),
            )),
        }
    }
    .await;

    log.finish(
        &scratch,
        result.as_ref().err(),
        Outcome {
            row_count: u64::from(matches!(result, Ok(true))),
            ..Outcome::default()
        },
    );
    result
}

/// A field rendered with its arguments inlined.
fn field_text(field: &FieldRef) -> String {
    let mut w = SqlWriter::new(Dialect::Generic);
    match field.write_sql(&mut w, &[]) {
        Ok(()) => {
            let (sql, args, _) = w.into_parts();
            question_interpolate(&sql, &args).unwrap_or(sql)
        }
        Err(err) => format!("{} <error: {err}>", w.sql()),
    }
}

fn write_preview(out: &mut String, n: u64, requested: &[Requested], row: &DbRow) {
    let _ = write!(out, "\n----[ Row {n} ]----");
    for (i, (field, _)) in requested.iter().enumerate() {
        out.push('\n');
        out.push_str(&field_text(field));
        out.push_str(": ");
        match row.get(i) {
            Some(value) => value.write_literal(out),
            None => out.push_str("NULL"),
        }
    }
}

fn scan_error(scratch: &Scratch<'_>, requested: &[Requested], failures: &[String]) -> SqError {
    let mut details = String::new();
    for (i, (field, type_name)) in requested.iter().enumerate() {
        if i > 0 {
            details.push('\n');
        }
        let _ = write!(details, "{i}) {} => {type_name}", field_text(field));
    }
    let query = interpolate(scratch.dialect, scratch.sql(), &scratch.args)
        .unwrap_or_else(|_| scratch.sql().to_owned());
    SqError::Scan {
        details,
        message: format!("{}\nquery: {query}", failures.join("\n")),
    }
}
