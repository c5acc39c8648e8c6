//! # typedsql
//!
//! A dialect-aware, type-checked SQL builder for SQLite and Postgres, with a
//! small execution layer that maps rows through closures.
//!
//! ## Features
//!
//! - **Typed fields**: columns are declared once with [`define_table!`] and
//!   carry their SQL kind, so `u.name.eq_string("bob")` type-checks and
//!   `u.name.eq_int(1)` does not
//! - **Dialect entry points**: [`Sqlite`] and [`Postgres`] only expose the
//!   clauses their database supports, such as `DISTINCT ON` and `USING`
//! - **One placeholder protocol**: everything renders with `?`; Postgres output
//!   is renumbered to `$n` at the top level
//! - **Composable**: CTEs, set operations, subqueries, windows and CASE
//!   expressions nest freely
//! - **Closure row mapping**: [`fetch`] discovers the projection from the
//!   fields a mapper reads, then calls it once per row
//! - **Query logging**: [`QueryLogger`] implementations for stderr, `tracing`,
//!   statistics and fan-out
//!
//! ## Building
//!
//! ```ignore
//! use typedsql::prelude::*;
//!
//! typedsql::define_table! {
//!     pub struct Users("users") {
//!         pub user_id: NumberField = "user_id",
//!         pub name: StringField = "name",
//!     }
//! }
//!
//! let u = Users::aliased("u");
//! let built = Postgres
//!     .from(u.clone())
//!     .select(fields![u.user_id.clone(), u.name.clone()])
//!     .where_(u.name.like_string("a%"))
//!     .limit(10)
//!     .to_sql()?;
//! assert_eq!(
//!     built.sql,
//!     "SELECT u.user_id, u.name FROM users AS u WHERE u.name LIKE $1 LIMIT $2"
//! );
//! ```
//!
//! ## Executing
//!
//! ```ignore
//! let db = Db::new(client).with_logger(TracingLogger::new());
//! let names = fetch_all(&db, &Postgres.from(u.clone()), |row| Ok(row.string(&u.name))).await?;
//! ```

pub mod assignment;
pub mod case;
pub mod client;
pub mod column;
pub mod context;
pub mod cte;
pub mod db;
pub mod error;
pub mod field;
pub mod functions;
pub mod join;
pub mod monitor;
pub mod pool;
pub mod postgres;
pub mod predicate;
pub mod prelude;
pub mod query;
pub mod render;
pub mod row;
pub mod set_op;
pub mod sqlite;
pub mod subquery;
pub mod table;
pub mod transaction;
pub mod typed;
pub mod value;
pub mod window;

mod builder;

pub use assignment::{Assignment, assign, set_excluded};
pub use case::{PredicateCases, SimpleCases, case_value, case_when};
pub use client::{DbRow, ExecResult, Queryer};
pub use column::{Column, ColumnMapper, ColumnMode};
pub use context::{CancelHandle, Context};
pub use cte::{Cte, IntermediateCte};
pub use db::{
    Db, FetchError, exec, exec_context, exists, exists_context, fetch, fetch_all,
    fetch_all_context, fetch_context,
};
pub use error::{SqError, SqResult};
pub use field::{
    CustomField, Field, FieldBase, FieldLiteral, FieldRef, IntoField, NamedParam, NullsOrder,
    Order, fieldf, literal, param,
};
pub use functions::{
    avg, avg_over, count, count_distinct, count_over, cume_dist_over, dense_rank_over,
    first_value_over, lag_over, last_value_over, lead_over, max, max_over, min, min_over,
    nth_value_over, ntile_over, percent_rank_over, rank_over, row_number_over, sum, sum_over,
};
pub use join::{JoinTable, JoinType};
pub use monitor::{
    CompositeLogger, DbConfig, ExecFlags, LogFlags, NoopLogger, QueryLogger, QueryStats,
    QueryType, StatsLogger, StatsSnapshot, StderrLogger, format_stats,
};
pub use pool::{BufferPool, PooledArgs, PooledBuf};
pub use postgres::{
    Postgres, PostgresDelete, PostgresInsert, PostgresInsertConflict, PostgresSelect,
    PostgresUpdate, PostgresWith,
};
pub use predicate::{
    CustomPredicate, IntoPredicate, LogicalOp, Predicate, PredicateRef, VariadicPredicate, and,
    between, eq, ge, gt, ilike, in_, is_not_null, is_null, le, like,
    lt, ne, not, or, predicatef,
};
pub use query::{IntoQuery, Query, QueryRef, RawQuery, raw};
pub use render::{
    BuiltQuery, Dialect, NamedParams, SqlWriter, count_placeholders, dollar_interpolate,
    interpolate, question_interpolate, question_to_dollar,
};
pub use row::Row;
pub use set_op::{
    SetOperator, VariadicQuery, except, except_all, intersect, intersect_all, union, union_all,
};
pub use sqlite::{
    Sqlite, SqliteDelete, SqliteInsert, SqliteInsertConflict, SqliteSelect, SqliteUpdate,
    SqliteWith,
};
pub use subquery::Subquery;
pub use table::{BaseTable, BaseTableRef, ColumnMeta, Table, TableInfo, TableRef};
pub use transaction::__next_savepoint_name;
pub use typed::{BlobField, BooleanField, FieldKind, JsonField, NumberField, StringField, TimeField};
pub use value::{Scalar, Value};
pub use window::Window;

#[cfg(feature = "tracing")]
pub use monitor::TracingLogger;
