//! Database handle contract consumed by the execution layer.
//!
//! A [`Queryer`] runs already-rendered SQL with a flat argument list. The
//! crate ships implementations for `tokio_postgres::Client` and
//! `tokio_postgres::Transaction`; anything else (an SQLite connection, a test
//! double) can implement the three required methods.

use crate::context::Context;
use crate::error::{SqError, SqResult};
use crate::monitor::{DbConfig, QueryLogger};
use crate::pool::BufferPool;
use crate::value::Scalar;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::future::Future;
use std::sync::Arc;
use tokio_postgres::types::{ToSql, Type};

/// A fetched row: column names and decoded values (`None` is SQL NULL).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbRow {
    columns: Vec<String>,
    values: Vec<Option<Scalar>>,
}

impl DbRow {
    pub fn new(columns: Vec<String>, values: Vec<Option<Scalar>>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Option<Scalar>] {
        &self.values
    }

    /// Value at `index`; `None` for NULL or out of range.
    pub fn get(&self, index: usize) -> Option<&Scalar> {
        self.values.get(index).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Outcome of a non-row-returning statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Only reported by drivers that track it (SQLite-style rowids).
    pub last_insert_id: Option<i64>,
}

/// Minimal async database handle.
pub trait Queryer: Send + Sync {
    /// Run a statement and return every row.
    fn query(
        &self,
        sql: &str,
        args: &[Scalar],
    ) -> impl Future<Output = SqResult<Vec<DbRow>>> + Send;

    /// Run a statement and return the first row, if any.
    fn query_row(
        &self,
        sql: &str,
        args: &[Scalar],
    ) -> impl Future<Output = SqResult<Option<DbRow>>> + Send {
        async move { Ok(self.query(sql, args).await?.into_iter().next()) }
    }

    /// Run a statement that returns no rows.
    fn exec(&self, sql: &str, args: &[Scalar]) -> impl Future<Output = SqResult<ExecResult>> + Send;

    fn query_context(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[Scalar],
    ) -> impl Future<Output = SqResult<Vec<DbRow>>> + Send {
        async move { ctx.run(self.query(sql, args)).await }
    }

    fn query_row_context(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[Scalar],
    ) -> impl Future<Output = SqResult<Option<DbRow>>> + Send {
        async move { ctx.run(self.query_row(sql, args)).await }
    }

    fn exec_context(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[Scalar],
    ) -> impl Future<Output = SqResult<ExecResult>> + Send {
        async move { ctx.run(self.exec(sql, args)).await }
    }

    /// Structured execution logger, if the handle carries one.
    fn logger(&self) -> Option<&Arc<dyn QueryLogger>> {
        None
    }

    /// Shared scratch buffer pool, if the handle carries one.
    fn buffer_pool(&self) -> Option<&Arc<BufferPool>> {
        None
    }

    fn config(&self) -> Option<&DbConfig> {
        None
    }
}

impl<T: Queryer + ?Sized> Queryer for &T {
    fn query(
        &self,
        sql: &str,
        args: &[Scalar],
    ) -> impl Future<Output = SqResult<Vec<DbRow>>> + Send {
        (**self).query(sql, args)
    }

    fn query_row(
        &self,
        sql: &str,
        args: &[Scalar],
    ) -> impl Future<Output = SqResult<Option<DbRow>>> + Send {
        (**self).query_row(sql, args)
    }

    fn exec(&self, sql: &str, args: &[Scalar]) -> impl Future<Output = SqResult<ExecResult>> + Send {
        (**self).exec(sql, args)
    }

    fn query_context(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[Scalar],
    ) -> impl Future<Output = SqResult<Vec<DbRow>>> + Send {
        (**self).query_context(ctx, sql, args)
    }

    fn query_row_context(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[Scalar],
    ) -> impl Future<Output = SqResult<Option<DbRow>>> + Send {
        (**self).query_row_context(ctx, sql, args)
    }

    fn exec_context(
        &self,
        ctx: &Context,
        sql: &str,
        args: &[Scalar],
    ) -> impl Future<Output = SqResult<ExecResult>> + Send {
        (**self).exec_context(ctx, sql, args)
    }

    fn logger(&self) -> Option<&Arc<dyn QueryLogger>> {
        (**self).logger()
    }

    fn buffer_pool(&self) -> Option<&Arc<BufferPool>> {
        (**self).buffer_pool()
    }

    fn config(&self) -> Option<&DbConfig> {
        (**self).config()
    }
}

fn params(args: &[Scalar]) -> Vec<&(dyn ToSql + Sync)> {
    args.iter().map(|a| a as &(dyn ToSql + Sync)).collect()
}

async fn pg_query<C>(client: &C, sql: &str, args: &[Scalar]) -> SqResult<Vec<DbRow>>
where
    C: tokio_postgres::GenericClient + Sync,
{
    let rows = tokio_postgres::GenericClient::query(client, sql, &params(args)).await?;
    rows.iter().map(decode_row).collect()
}

async fn pg_exec<C>(client: &C, sql: &str, args: &[Scalar]) -> SqResult<ExecResult>
where
    C: tokio_postgres::GenericClient + Sync,
{
    let rows_affected = tokio_postgres::GenericClient::execute(client, sql, &params(args)).await?;
    Ok(ExecResult {
        rows_affected,
        last_insert_id: None,
    })
}

impl Queryer for tokio_postgres::Client {
    async fn query(&self, sql: &str, args: &[Scalar]) -> SqResult<Vec<DbRow>> {
        pg_query(self, sql, args).await
    }

    async fn exec(&self, sql: &str, args: &[Scalar]) -> SqResult<ExecResult> {
        pg_exec(self, sql, args).await
    }
}

impl Queryer for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, args: &[Scalar]) -> SqResult<Vec<DbRow>> {
        pg_query(self, sql, args).await
    }

    async fn exec(&self, sql: &str, args: &[Scalar]) -> SqResult<ExecResult> {
        pg_exec(self, sql, args).await
    }
}

/// Decode a `tokio_postgres` row into driver-neutral scalars.
pub(crate) fn decode_row(row: &tokio_postgres::Row) -> SqResult<DbRow> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (i, col) in row.columns().iter().enumerate() {
        let name = col.name();
        let value = decode_column(row, i, col.type_())
            .map_err(|e| SqError::decode(name, format!("{} ({})", e, col.type_())))?;
        columns.push(name.to_owned());
        values.push(value);
    }
    Ok(DbRow { columns, values })
}

fn decode_column(
    row: &tokio_postgres::Row,
    i: usize,
    ty: &Type,
) -> Result<Option<Scalar>, tokio_postgres::Error> {
    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(i)?.map(Scalar::Bool)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(i)?.map(|v| Scalar::Int(i64::from(v)))
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(i)?.map(|v| Scalar::Int(i64::from(v)))
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(i)?.map(Scalar::Int)
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(i)?.map(|v| Scalar::Float(f64::from(v)))
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(i)?.map(Scalar::Float)
    } else if *ty == Type::BYTEA {
        row.try_get::<_, Option<Vec<u8>>>(i)?.map(Scalar::Bytes)
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(i)?
            .map(Scalar::Time)
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<NaiveDateTime>>(i)?
            .map(|v| Scalar::Time(v.and_utc()))
    } else if *ty == Type::DATE {
        row.try_get::<_, Option<NaiveDate>>(i)?
            .map(|v| Scalar::Time(v.and_time(NaiveTime::MIN).and_utc()))
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        row.try_get::<_, Option<serde_json::Value>>(i)?.map(Scalar::Json)
    } else if *ty == Type::UUID {
        row.try_get::<_, Option<uuid::Uuid>>(i)?.map(Scalar::Uuid)
    } else {
        row.try_get::<_, Option<String>>(i)?.map(Scalar::Text)
    };
    Ok(value)
}
