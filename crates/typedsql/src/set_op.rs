//! UNION / INTERSECT / EXCEPT over any number of queries.

use crate::cte::Cte;
use crate::error::{SqError, SqResult};
use crate::field::FieldRef;
use crate::query::{Query, QueryRef};
use crate::render::{Dialect, SqlWriter};
use crate::subquery::Subquery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetOperator {
    #[default]
    Union,
    UnionAll,
    Intersect,
    IntersectAll,
    Except,
    ExceptAll,
}

impl SetOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SetOperator::Union => "UNION",
            SetOperator::UnionAll => "UNION ALL",
            SetOperator::Intersect => "INTERSECT",
            SetOperator::IntersectAll => "INTERSECT ALL",
            SetOperator::Except => "EXCEPT",
            SetOperator::ExceptAll => "EXCEPT ALL",
        }
    }
}

/// Member queries joined by one set operator.
///
/// Parenthesized unless `toplevel`. A single member renders as itself.
#[derive(Debug, Clone, Default)]
pub struct VariadicQuery {
    pub(crate) toplevel: bool,
    op: SetOperator,
    queries: Vec<QueryRef>,
}

impl VariadicQuery {
    pub fn new(op: SetOperator, queries: Vec<QueryRef>) -> Self {
        Self {
            toplevel: false,
            op,
            queries,
        }
    }

    pub fn toplevel(mut self, toplevel: bool) -> Self {
        self.toplevel = toplevel;
        self
    }

    pub fn operator(&self) -> SetOperator {
        self.op
    }

    pub fn queries(&self) -> &[QueryRef] {
        &self.queries
    }

    /// Use this set operation as a CTE body.
    pub fn cte(self, name: impl Into<String>) -> Cte {
        Cte::new(name, self)
    }

    /// Use this set operation as a derived table.
    pub fn subquery(self, alias: impl Into<String>) -> Subquery {
        Subquery::new(alias, self)
    }
}

impl Query for VariadicQuery {
    fn write_sql(&self, w: &mut SqlWriter) -> SqResult<()> {
        match self.queries.as_slice() {
            [] => Ok(()),
            [only] => match only.as_variadic() {
                Some(inner) => inner.clone().toplevel(self.toplevel).write_sql(w),
                None => only.write_sql(w),
            },
            members => {
                if !self.toplevel {
                    w.push('(');
                }
                for (i, q) in members.iter().enumerate() {
                    if i > 0 {
                        w.push(' ');
                        w.push_str(self.op.as_sql());
                        w.push(' ');
                    }
                    q.write_sql(w)?;
                }
                if !self.toplevel {
                    w.push(')');
                }
                Ok(())
            }
        }
    }

    fn fetchable_fields(&self) -> SqResult<Vec<FieldRef>> {
        match self.queries.first() {
            Some(q) => q.fetchable_fields(),
            None => Err(SqError::build("set operation has no member queries")),
        }
    }

    fn with_fetchable_fields(&self, _fields: Vec<FieldRef>) -> SqResult<QueryRef> {
        Err(SqError::Unsupported)
    }

    fn dialect(&self) -> Dialect {
        self.queries
            .first()
            .map(|q| q.dialect())
            .unwrap_or_default()
    }

    fn as_variadic(&self) -> Option<&VariadicQuery> {
        Some(self)
    }

    fn to_sql(&self) -> SqResult<crate::render::BuiltQuery> {
        let mut w = SqlWriter::new(self.dialect());
        self.clone().toplevel(true).write_sql(&mut w)?;
        Ok(w.finish())
    }
}

macro_rules! set_op_ctor {
    ($($(#[$doc:meta])* $name:ident => $op:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(queries: impl IntoIterator<Item = QueryRef>) -> VariadicQuery {
                VariadicQuery::new(SetOperator::$op, queries.into_iter().collect())
            }
        )*
    };
}

set_op_ctor! {
    /// `q1 UNION q2 ...`
    union => Union,
    /// `q1 UNION ALL q2 ...`
    union_all => UnionAll,
    /// `q1 INTERSECT q2 ...`
    intersect => Intersect,
    /// `q1 INTERSECT ALL q2 ...`
    intersect_all => IntersectAll,
    /// `q1 EXCEPT q2 ...`
    except => Except,
    /// `q1 EXCEPT ALL q2 ...`
    except_all => ExceptAll,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::raw;

    fn q(sql: &str) -> QueryRef {
        std::sync::Arc::new(raw(Dialect::Sqlite, sql, vec![]))
    }

    #[test]
    fn top_level_set_operation_has_no_parens() {
        let u = union_all([q("SELECT 1"), q("SELECT 2")]);
        assert_eq!(u.to_sql().unwrap().sql, "SELECT 1 UNION ALL SELECT 2");

        let mut w = SqlWriter::new(Dialect::Sqlite);
        u.write_sql(&mut w).unwrap();
        assert_eq!(w.sql(), "(SELECT 1 UNION ALL SELECT 2)");
    }

    #[test]
    fn single_members_unwrap_recursively() {
        let inner = except([q("SELECT a FROM t")]);
        let outer = intersect([std::sync::Arc::new(inner) as QueryRef]);
        assert_eq!(outer.to_sql().unwrap().sql, "SELECT a FROM t");
    }

    #[test]
    fn nested_groups_keep_parens() {
        let inner = union([q("SELECT 1"), q("SELECT 2")]);
        let outer = except([std::sync::Arc::new(inner) as QueryRef, q("SELECT 3")]);
        assert_eq!(
            outer.to_sql().unwrap().sql,
            "(SELECT 1 UNION SELECT 2) EXCEPT SELECT 3"
        );
        assert_eq!(outer.dialect(), Dialect::Sqlite);
        assert!(
            outer
                .with_fetchable_fields(vec![])
                .unwrap_err()
                .is_unsupported()
        );
    }
}
