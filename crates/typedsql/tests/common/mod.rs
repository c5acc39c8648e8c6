//! In-memory database handle and capturing logger shared by the
//! execution tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;
use typedsql::{
    Context, DbRow, ExecResult, QueryLogger, QueryStats, Queryer, Scalar, SqError, SqResult,
    format_stats,
};

typedsql::define_table! {
    pub struct Users("users") {
        pub user_id: NumberField = "user_id" ["PRIMARY KEY"],
        pub name: StringField = "name",
        pub active: BooleanField = "active",
    }
}

/// Returns canned rows and records every statement it receives.
///
/// Rows built with named columns are cut down to the projection of each
/// `SELECT`, the way a real driver would answer it. Rows whose columns do not
/// cover the projection come back unchanged.
#[derive(Debug, Default)]
pub struct FakeDb {
    pub rows: Vec<DbRow>,
    pub exec_result: ExecResult,
    pub delay: Option<Duration>,
    pub fail_with: Option<String>,
    seen: Mutex<Vec<(String, Vec<Scalar>)>>,
}

impl FakeDb {
    pub fn with_rows(rows: Vec<Vec<Option<Scalar>>>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .map(|values| {
                    let columns = (0..values.len()).map(|i| format!("c{i}")).collect();
                    DbRow::new(columns, values)
                })
                .collect(),
            ..Self::default()
        }
    }

    /// `n` rows of `(user_id, name, active)` with ids `1..=n`; odd ids are active.
    pub fn users(n: i64) -> Self {
        let columns: Vec<String> = ["user_id", "name", "active"].map(String::from).to_vec();
        Self {
            rows: (1..=n)
                .map(|i| {
                    DbRow::new(
                        columns.clone(),
                        vec![
                            Some(Scalar::Int(i)),
                            Some(Scalar::Text(format!("user{i}"))),
                            Some(Scalar::Bool(i % 2 == 1)),
                        ],
                    )
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn seen(&self) -> Vec<(String, Vec<Scalar>)> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last_sql(&self) -> String {
        self.seen().last().map(|(sql, _)| sql.clone()).unwrap_or_default()
    }

    fn record(&self, sql: &str, args: &[Scalar]) {
        self.seen.lock().unwrap().push((sql.to_owned(), args.to_vec()));
    }

    fn project(&self, sql: &str) -> Vec<DbRow> {
        let Some(first) = self.rows.first() else {
            return Vec::new();
        };
        let wanted = projected_columns(sql);
        let indexes: Option<Vec<usize>> = wanted
            .iter()
            .map(|name| first.columns().iter().position(|c| c == name))
            .collect();
        match indexes {
            Some(indexes) if !indexes.is_empty() => self
                .rows
                .iter()
                .map(|row| {
                    DbRow::new(
                        wanted.clone(),
                        indexes.iter().map(|&i| row.values()[i].clone()).collect(),
                    )
                })
                .collect(),
            _ => self.rows.clone(),
        }
    }

    async fn respond(&self) -> SqResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.fail_with {
            Some(msg) => Err(SqError::Driver(msg.clone())),
            None => Ok(()),
        }
    }
}

impl Queryer for FakeDb {
    async fn query(&self, sql: &str, args: &[Scalar]) -> SqResult<Vec<DbRow>> {
        self.record(sql, args);
        self.respond().await?;
        Ok(self.project(sql))
    }

    async fn exec(&self, sql: &str, args: &[Scalar]) -> SqResult<ExecResult> {
        self.record(sql, args);
        self.respond().await?;
        Ok(self.exec_result)
    }
}

/// Bare column names of the top-level projection: `u.name AS n` gives `n`,
/// `u.name` gives `name`.
fn projected_columns(sql: &str) -> Vec<String> {
    let Some(rest) = sql.strip_prefix("SELECT ") else {
        return Vec::new();
    };
    let rest = rest.strip_prefix("DISTINCT ").unwrap_or(rest);
    let list = rest.split(" FROM ").next().unwrap_or(rest);
    list.split(", ")
        .map(|item| {
            let item = item.rsplit(" AS ").next().unwrap_or(item);
            item.rsplit('.').next().unwrap_or(item).to_owned()
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Captured {
    pub line: String,
    pub query: String,
    pub row_count: u64,
    pub preview: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct CaptureLogger {
    entries: Mutex<Vec<Captured>>,
}

impl CaptureLogger {
    pub fn entries(&self) -> Vec<Captured> {
        self.entries.lock().unwrap().clone()
    }
}

impl QueryLogger for CaptureLogger {
    fn log_query_stats(&self, _ctx: &Context, stats: &QueryStats<'_>) {
        self.entries.lock().unwrap().push(Captured {
            line: format_stats(stats),
            query: stats.query.to_owned(),
            row_count: stats.row_count,
            preview: stats.results_preview.map(str::to_owned),
            error: stats.error.map(ToString::to_string),
        });
    }
}
