//! Common table expressions (WITH clause).
//!
//! A [`Cte`] is a [`Table`] backed by a query. Statements render their CTE
//! list as `WITH [RECURSIVE] name [(cols)] AS (query), ... `, switching to
//! `WITH RECURSIVE` only when at least one member is recursive. The column
//! list is only written when it was given explicitly; names inferred from
//! the projection are used for [`Cte::field`] lookups alone.
//!
//! # Example
//! ```ignore
//! let t = Cte::recursive("t", ["n"])
//!     .initial(Sqlite.select(fields![literal("10")]))
//!     .union_all(queries![
//!         Sqlite.select(fields![literal("n+10")])
//!             .from(Cte::recursive("t", ["n"]))
//!             .where_(predicatef("n+10<=100", vec![])),
//!     ]);
//! let q = Sqlite.with([t.clone()]).select(fields![t.field("n")]).from(t);
//! ```

use crate::error::{SqError, SqResult};
use crate::field::CustomField;
use crate::query::{Query, QueryRef};
use crate::render::SqlWriter;
use crate::set_op::{SetOperator, VariadicQuery};
use crate::table::Table;
use std::collections::HashSet;
use std::sync::Arc;

/// A named query usable as a table.
#[derive(Debug, Clone, Default)]
pub struct Cte {
    name: String,
    alias: String,
    columns: Vec<String>,
    inferred: Vec<String>,
    query: Option<QueryRef>,
    recursive: bool,
}

impl Cte {
    /// Non-recursive CTE. Field names are inferred from the query's projection.
    pub fn new(name: impl Into<String>, query: impl Query + 'static) -> Self {
        let query: QueryRef = Arc::new(query);
        Self {
            name: name.into(),
            inferred: infer_columns(query.as_ref()),
            query: Some(query),
            ..Self::default()
        }
    }

    /// Recursive CTE; supply the seed with [`Cte::initial`].
    pub fn recursive<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            recursive: true,
            ..Self::default()
        }
    }

    /// Set an explicit column list, rendered as `name (cols)`.
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Set the seed query of a recursive CTE. No-op on a non-recursive CTE.
    pub fn initial(mut self, seed: impl Query + 'static) -> IntermediateCte {
        if self.recursive {
            self.query = Some(Arc::new(seed));
        }
        IntermediateCte(self)
    }

    /// Names resolvable through [`Cte::field`]: the explicit list if set,
    /// else the aliases or names of the projection.
    pub fn columns(&self) -> &[String] {
        if self.columns.is_empty() {
            &self.inferred
        } else {
            &self.columns
        }
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn query(&self) -> Option<&QueryRef> {
        self.query.as_ref()
    }

    /// Column `column` qualified by the CTE alias or name.
    ///
    /// Unknown columns give a blank field, which renders as `:blank:`.
    pub fn field(&self, column: &str) -> CustomField {
        if self.columns().iter().any(|c| c == column) {
            CustomField::column(self.qualifier(), column)
        } else {
            CustomField::default()
        }
    }

    fn qualifier(&self) -> &str {
        if self.alias.is_empty() {
            &self.name
        } else {
            &self.alias
        }
    }
}

fn infer_columns(query: &dyn Query) -> Vec<String> {
    query
        .fetchable_fields()
        .map(|fields| {
            fields
                .iter()
                .map(|f| {
                    if f.alias().is_empty() {
                        f.name().to_owned()
                    } else {
                        f.alias().to_owned()
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

/// A recursive CTE with its seed set, waiting for the recursive members.
#[derive(Debug, Clone)]
pub struct IntermediateCte(Cte);

impl IntermediateCte {
    /// `seed UNION q1 UNION q2 ...`
    pub fn union(self, queries: impl IntoIterator<Item = QueryRef>) -> Cte {
        self.combine(SetOperator::Union, queries)
    }

    /// `seed UNION ALL q1 UNION ALL q2 ...`
    pub fn union_all(self, queries: impl IntoIterator<Item = QueryRef>) -> Cte {
        self.combine(SetOperator::UnionAll, queries)
    }

    /// Finish without recursive members.
    pub fn done(self) -> Cte {
        self.0
    }

    fn combine(self, op: SetOperator, queries: impl IntoIterator<Item = QueryRef>) -> Cte {
        let mut cte = self.0;
        if !cte.recursive {
            return cte;
        }
        let mut members: Vec<QueryRef> = cte.query.take().into_iter().collect();
        members.extend(queries);
        cte.query = Some(Arc::new(VariadicQuery::new(op, members).toplevel(true)));
        cte
    }
}

impl Table for Cte {
    fn write_sql(&self, w: &mut SqlWriter) -> SqResult<()> {
        w.push_str(&self.name);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn alias(&self) -> &str {
        &self.alias
    }

    fn as_cte(&self) -> Option<&Cte> {
        Some(self)
    }
}

/// Render the WITH clause: explicit CTEs first, then CTEs used as tables.
///
/// Nothing is rendered when `explicit` is empty. Duplicate names keep the
/// first occurrence.
pub(crate) fn write_ctes<'a>(
    w: &mut SqlWriter,
    explicit: &'a [Cte],
    implicit: impl IntoIterator<Item = &'a Cte>,
) -> SqResult<()> {
    if explicit.is_empty() {
        return Ok(());
    }
    let mut seen = HashSet::new();
    let list: Vec<&Cte> = explicit
        .iter()
        .chain(implicit)
        .filter(|cte| seen.insert(cte.name.as_str()))
        .collect();

    if list.iter().any(|cte| cte.recursive) {
        w.push_str("WITH RECURSIVE ");
    } else {
        w.push_str("WITH ");
    }
    for (i, cte) in list.iter().enumerate() {
        if i > 0 {
            w.push_str(", ");
        }
        w.push_str(&cte.name);
        if !cte.columns.is_empty() {
            w.push_str(" (");
            w.push_str(&cte.columns.join(", "));
            w.push(')');
        }
        w.push_str(" AS (");
        let query = cte
            .query
            .as_ref()
            .ok_or_else(|| SqError::build(format!("CTE {} has no query", cte.name)))?;
        match query.as_variadic() {
            Some(body) => body.clone().toplevel(true).write_sql(w)?,
            None => query.write_sql(w)?,
        }
        w.push(')');
    }
    w.push(' ');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::raw;
    use crate::render::Dialect;

    #[test]
    fn union_on_non_recursive_cte_is_noop() {
        let cte = Cte::new("c", raw(Dialect::Sqlite, "SELECT 1", vec![]));
        let same = cte
            .clone()
            .initial(raw(Dialect::Sqlite, "SELECT 2", vec![]))
            .union_all(vec![]);
        let mut w = SqlWriter::new(Dialect::Sqlite);
        write_ctes(&mut w, &[same], []).unwrap();
        assert_eq!(w.sql(), "WITH c AS (SELECT 1) ");
    }

    #[test]
    fn duplicates_keep_first_and_recursion_is_detected() {
        let a = Cte::new("a", raw(Dialect::Sqlite, "SELECT 1", vec![]));
        let a2 = Cte::new("a", raw(Dialect::Sqlite, "SELECT 2", vec![]));
        let r = Cte::recursive("r", ["n"])
            .initial(raw(Dialect::Sqlite, "SELECT 1", vec![]))
            .union(vec![Arc::new(raw(Dialect::Sqlite, "SELECT n+1 FROM r", vec![])) as QueryRef]);
        let mut w = SqlWriter::new(Dialect::Sqlite);
        write_ctes(&mut w, &[a, a2], [&r]).unwrap();
        assert_eq!(
            w.sql(),
            "WITH RECURSIVE a AS (SELECT 1), r (n) AS (SELECT 1 UNION SELECT n+1 FROM r) "
        );
    }

    #[test]
    fn missing_seed_is_a_build_error() {
        let r = Cte::recursive("r", ["n"]);
        let mut w = SqlWriter::new(Dialect::Sqlite);
        assert!(matches!(
            write_ctes(&mut w, &[r], []),
            Err(SqError::Build(_))
        ));
    }

    #[test]
    fn unknown_columns_give_blank_fields() {
        let r = Cte::recursive("r", ["n"]).with_alias("rr");
        let mut w = SqlWriter::new(Dialect::Sqlite);
        crate::Field::write_sql(&r.field("n"), &mut w, &[]).unwrap();
        w.push(' ');
        crate::Field::write_sql(&r.field("zzz"), &mut w, &[]).unwrap();
        assert_eq!(w.sql(), "rr.n :blank:");
    }

    #[test]
    fn computed_projection_stays_out_of_column_list() {
        let b = Cte::new(
            "b",
            crate::Sqlite.select(crate::fields![crate::fieldf("? + 1", vec![5.into()])]),
        );
        let mut w = SqlWriter::new(Dialect::Sqlite);
        write_ctes(&mut w, &[b], []).unwrap();
        let built = w.finish();
        assert_eq!(built.sql, "WITH b AS (SELECT ? + 1) ");
        assert_eq!(
            crate::count_placeholders(built.dialect, &built.sql),
            built.args.len()
        );
    }

    #[test]
    fn explicit_columns_are_rendered() {
        let c = Cte::new("c", raw(Dialect::Sqlite, "SELECT 1, 2", vec![])).with_columns(["a", "b"]);
        assert_eq!(c.columns(), ["a", "b"]);
        let mut w = SqlWriter::new(Dialect::Sqlite);
        write_ctes(&mut w, &[c], []).unwrap();
        assert_eq!(w.sql(), "WITH c (a, b) AS (SELECT 1, 2) ");
    }
}
