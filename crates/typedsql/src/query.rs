//! The query contract shared by statements, set operations and raw SQL.

use crate::error::{SqError, SqResult};
use crate::field::FieldRef;
use crate::render::{BuiltQuery, Dialect, SqlWriter};
use crate::set_op::VariadicQuery;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// A renderable statement or statement fragment.
pub trait Query: Send + Sync + fmt::Debug {
    /// Render with `?` placeholders into `w`.
    fn write_sql(&self, w: &mut SqlWriter) -> SqResult<()>;

    /// The projection this query will fetch.
    ///
    /// Returns [`SqError::Unsupported`] for statements without a projection.
    fn fetchable_fields(&self) -> SqResult<Vec<FieldRef>>;

    /// A copy of this query projecting `fields` instead.
    fn with_fetchable_fields(&self, fields: Vec<FieldRef>) -> SqResult<QueryRef>;

    fn dialect(&self) -> Dialect;

    /// Downcast hook used to unwrap nested single-member set operations.
    fn as_variadic(&self) -> Option<&VariadicQuery> {
        None
    }

    /// Render the full statement in the query's own dialect.
    fn to_sql(&self) -> SqResult<BuiltQuery> {
        let mut w = SqlWriter::new(self.dialect());
        self.write_sql(&mut w)?;
        Ok(w.finish())
    }
}

/// Shared handle to any query.
pub type QueryRef = Arc<dyn Query>;

impl<Q: Query + ?Sized> Query for Arc<Q> {
    fn write_sql(&self, w: &mut SqlWriter) -> SqResult<()> {
        (**self).write_sql(w)
    }

    fn fetchable_fields(&self) -> SqResult<Vec<FieldRef>> {
        (**self).fetchable_fields()
    }

    fn with_fetchable_fields(&self, fields: Vec<FieldRef>) -> SqResult<QueryRef> {
        (**self).with_fetchable_fields(fields)
    }

    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn as_variadic(&self) -> Option<&VariadicQuery> {
        (**self).as_variadic()
    }
}

/// Conversion into a [`QueryRef`].
pub trait IntoQuery {
    fn into_query(self) -> QueryRef;
}

impl<Q: Query + 'static> IntoQuery for Q {
    fn into_query(self) -> QueryRef {
        Arc::new(self)
    }
}

/// Build a `Vec<QueryRef>` from heterogeneous queries.
#[macro_export]
macro_rules! queries {
    ($($q:expr),* $(,)?) => {
        ::std::vec![$($crate::IntoQuery::into_query($q)),*] as ::std::vec::Vec<$crate::QueryRef>
    };
}

/// Hand-written SQL with `?` markers, e.g. for DDL or statements the
/// builders do not cover.
#[derive(Debug, Clone)]
pub struct RawQuery {
    dialect: Dialect,
    format: String,
    values: Vec<Value>,
}

impl RawQuery {
    pub fn new(dialect: Dialect, format: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            dialect,
            format: format.into(),
            values,
        }
    }
}

/// Shorthand for [`RawQuery::new`].
pub fn raw(dialect: Dialect, format: impl Into<String>, values: Vec<Value>) -> RawQuery {
    RawQuery::new(dialect, format, values)
}

impl Query for RawQuery {
    fn write_sql(&self, w: &mut SqlWriter) -> SqResult<()> {
        w.expand(&self.format, &self.values, &[])
    }

    fn fetchable_fields(&self) -> SqResult<Vec<FieldRef>> {
        Err(SqError::Unsupported)
    }

    fn with_fetchable_fields(&self, _fields: Vec<FieldRef>) -> SqResult<QueryRef> {
        Err(SqError::Unsupported)
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}
