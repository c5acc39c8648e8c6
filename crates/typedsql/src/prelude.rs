//! Convenient imports for typical `typedsql` usage.
//!
//! ```ignore
//! use typedsql::prelude::*;
//! ```

pub use crate::{
    BlobField, BooleanField, Db, ExecFlags, Field, JsonField, NumberField, Postgres, Query,
    Queryer, Row, SqError, SqResult, Sqlite, StringField, Table, TableInfo, TimeField, exec, exists,
    fetch, fetch_all, fields, literal, predicatef, predicates, queries,
};

pub use crate::{Context, DbConfig, LogFlags, QueryLogger, StatsLogger, StderrLogger};

#[cfg(feature = "tracing")]
pub use crate::TracingLogger;
