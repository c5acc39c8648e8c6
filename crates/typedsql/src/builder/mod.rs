//! Dialect-independent statement cores.
//!
//! Each core holds the immutable state of one statement kind and renders it
//! in a fixed clause order. The dialect modules ([`crate::sqlite`],
//! [`crate::postgres`]) wrap the cores and expose the clauses their dialect
//! supports.
//!
//! Builder methods take `self` and return the updated value, so a partially
//! built statement can be cloned and extended into several variants.

pub(crate) mod delete;
pub(crate) mod insert;
pub(crate) mod select;
pub(crate) mod update;

pub(crate) use delete::DeleteCore;
pub(crate) use insert::{ConflictAction, InsertCore};
pub(crate) use select::SelectCore;
pub(crate) use update::UpdateCore;

use crate::error::SqResult;
use crate::field::{FieldRef, write_fields};
use crate::predicate::VariadicPredicate;
use crate::render::SqlWriter;
use crate::table::BaseTable;

/// Render ` KEYWORD p1 AND p2` when `predicate` has children.
pub(crate) fn write_condition(
    w: &mut SqlWriter,
    keyword: &str,
    predicate: &VariadicPredicate,
    excluded: &[&str],
) -> SqResult<()> {
    if predicate.is_empty() {
        return Ok(());
    }
    w.push_str(keyword);
    crate::field::Field::write_sql(&predicate.clone().toplevel(true), w, excluded)
}

/// Render ` KEYWORD a, b` when `fields` is non-empty.
pub(crate) fn write_field_clause(
    w: &mut SqlWriter,
    keyword: &str,
    fields: &[FieldRef],
) -> SqResult<()> {
    if fields.is_empty() {
        return Ok(());
    }
    w.push_str(keyword);
    write_fields(w, fields, &[])
}

/// Render ` KEYWORD ?` bound to `|n|`; negative values are normalized.
pub(crate) fn write_count(w: &mut SqlWriter, keyword: &str, n: Option<i64>) {
    if let Some(n) = n {
        w.push_str(keyword);
        w.bind(crate::value::Scalar::Int(n.saturating_abs()));
    }
}

/// Render `table [AS alias]` for a statement target and return the
/// qualifier that must be suppressed inside the statement.
pub(crate) fn write_target<'a>(
    w: &mut SqlWriter,
    table: &'a dyn BaseTable,
) -> SqResult<&'a str> {
    table.write_sql(w)?;
    let alias = table.alias();
    if alias.is_empty() {
        Ok(table.name())
    } else {
        w.push_str(" AS ");
        w.push_str(alias);
        Ok(alias)
    }
}

/// Chained methods shared by every SELECT wrapper.
macro_rules! select_methods {
    ($ty:ident, $dialect:expr) => {
        impl $ty {
            /// Prefix the statement with `WITH ...`.
            pub fn with(mut self, ctes: impl IntoIterator<Item = $crate::Cte>) -> Self {
                self.core.ctes = ctes.into_iter().collect();
                self
            }

            /// Replace the projection.
            pub fn select(mut self, fields: impl IntoIterator<Item = $crate::FieldRef>) -> Self {
                self.core.fields = fields.into_iter().collect();
                self
            }

            pub fn distinct(mut self) -> Self {
                self.core.distinct = true;
                self
            }

            pub fn from(mut self, table: impl $crate::Table + 'static) -> Self {
                self.core.from = Some(::std::sync::Arc::new(table));
                self
            }

            pub fn join(
                self,
                table: impl $crate::Table + 'static,
                on: impl IntoIterator<Item = $crate::PredicateRef>,
            ) -> Self {
                self.push_join($crate::JoinType::Inner, table, on)
            }

            pub fn left_join(
                self,
                table: impl $crate::Table + 'static,
                on: impl IntoIterator<Item = $crate::PredicateRef>,
            ) -> Self {
                self.push_join($crate::JoinType::Left, table, on)
            }

            pub fn right_join(
                self,
                table: impl $crate::Table + 'static,
                on: impl IntoIterator<Item = $crate::PredicateRef>,
            ) -> Self {
                self.push_join($crate::JoinType::Right, table, on)
            }

            pub fn full_join(
                self,
                table: impl $crate::Table + 'static,
                on: impl IntoIterator<Item = $crate::PredicateRef>,
            ) -> Self {
                self.push_join($crate::JoinType::Full, table, on)
            }

            /// Join with an arbitrary keyword such as `CROSS JOIN`.
            pub fn custom_join(
                self,
                keyword: impl Into<String>,
                table: impl $crate::Table + 'static,
                on: impl IntoIterator<Item = $crate::PredicateRef>,
            ) -> Self {
                self.push_join($crate::JoinType::Custom(keyword.into()), table, on)
            }

            fn push_join(
                mut self,
                join_type: $crate::JoinType,
                table: impl $crate::Table + 'static,
                on: impl IntoIterator<Item = $crate::PredicateRef>,
            ) -> Self {
                self.core.joins.push($crate::JoinTable::new(join_type, table, on));
                self
            }

            /// Add a WHERE predicate; repeated calls are ANDed.
            pub fn where_(mut self, predicate: impl $crate::IntoPredicate) -> Self {
                self.core = self.core.where_(predicate);
                self
            }

            pub fn group_by(mut self, fields: impl IntoIterator<Item = $crate::FieldRef>) -> Self {
                self.core.group_by = fields.into_iter().collect();
                self
            }

            /// Add a HAVING predicate; repeated calls are ANDed.
            pub fn having(mut self, predicate: impl $crate::IntoPredicate) -> Self {
                self.core = self.core.having(predicate);
                self
            }

            /// Declare named windows in a WINDOW clause.
            pub fn window(mut self, windows: impl IntoIterator<Item = $crate::Window>) -> Self {
                self.core.windows = windows.into_iter().collect();
                self
            }

            pub fn order_by(mut self, fields: impl IntoIterator<Item = $crate::FieldRef>) -> Self {
                self.core.order_by = fields.into_iter().collect();
                self
            }

            /// Negative values are bound as their absolute value.
            pub fn limit(mut self, limit: i64) -> Self {
                self.core.limit = Some(limit);
                self
            }

            /// Negative values are bound as their absolute value.
            pub fn offset(mut self, offset: i64) -> Self {
                self.core.offset = Some(offset);
                self
            }

            /// Use this statement as a derived table.
            pub fn subquery(self, alias: impl Into<String>) -> $crate::Subquery {
                $crate::Subquery::new(alias, self)
            }

            /// Use this statement as a CTE body.
            pub fn cte(self, name: impl Into<String>) -> $crate::Cte {
                $crate::Cte::new(name, self)
            }
        }

        impl $crate::Query for $ty {
            fn write_sql(&self, w: &mut $crate::SqlWriter) -> $crate::SqResult<()> {
                self.core.write(w)
            }

            fn fetchable_fields(&self) -> $crate::SqResult<Vec<$crate::FieldRef>> {
                Ok(self.core.fields.clone())
            }

            fn with_fetchable_fields(
                &self,
                fields: Vec<$crate::FieldRef>,
            ) -> $crate::SqResult<$crate::QueryRef> {
                Ok(::std::sync::Arc::new(self.clone().select(fields)))
            }

            fn dialect(&self) -> $crate::Dialect {
                $dialect
            }
        }

        impl From<$ty> for $crate::Value {
            fn from(q: $ty) -> Self {
                $crate::Value::Query(::std::sync::Arc::new(q))
            }
        }
    };
}

/// `Query` for statements without a projection.
macro_rules! write_only_query {
    ($ty:ident, $dialect:expr) => {
        impl $crate::Query for $ty {
            fn write_sql(&self, w: &mut $crate::SqlWriter) -> $crate::SqResult<()> {
                self.core.write(w)
            }

            fn fetchable_fields(&self) -> $crate::SqResult<Vec<$crate::FieldRef>> {
                Err($crate::SqError::Unsupported)
            }

            fn with_fetchable_fields(
                &self,
                _fields: Vec<$crate::FieldRef>,
            ) -> $crate::SqResult<$crate::QueryRef> {
                Err($crate::SqError::Unsupported)
            }

            fn dialect(&self) -> $crate::Dialect {
                $dialect
            }
        }
    };
}

/// Methods shared by every INSERT wrapper and its ON CONFLICT builder.
macro_rules! insert_methods {
    ($ty:ident, $select:ident, $conflict:ident) => {
        impl $ty {
            pub fn with(mut self, ctes: impl IntoIterator<Item = $crate::Cte>) -> Self {
                self.core.ctes = ctes.into_iter().collect();
                self
            }

            pub fn columns(mut self, fields: impl IntoIterator<Item = $crate::FieldRef>) -> Self {
                self.core.columns = fields.into_iter().collect();
                self
            }

            /// Append one VALUES row, in column order.
            pub fn values(mut self, row: Vec<$crate::Value>) -> Self {
                self.core.rows.push(row);
                self
            }

            /// Derive columns and rows from `mapper` at render time.
            ///
            /// The mapper runs once per render; its error aborts rendering.
            pub fn values_with(
                mut self,
                mapper: impl Fn(&mut $crate::Column) -> $crate::SqResult<()> + Send + Sync + 'static,
            ) -> Self {
                self.core.mapper = Some($crate::ColumnMapper::new(mapper));
                self
            }

            /// `INSERT INTO ... SELECT ...`
            pub fn select(mut self, source: $select) -> Self {
                self.core.select = Some(Box::new(source.core));
                self
            }

            /// Start an `ON CONFLICT (fields)` clause.
            pub fn on_conflict(
                mut self,
                fields: impl IntoIterator<Item = $crate::FieldRef>,
            ) -> $conflict {
                self.core.conflict = Some($crate::builder::insert::Conflict::on(
                    fields.into_iter().collect(),
                    None,
                ));
                $conflict { core: self.core }
            }
        }

        impl $conflict {
            /// Predicate on the conflict target (partial unique index).
            pub fn where_(mut self, predicate: impl $crate::IntoPredicate) -> Self {
                if let Some(conflict) = self.core.conflict.as_mut() {
                    conflict.target_where.push(predicate.into_predicate());
                }
                self
            }

            pub fn do_nothing(mut self) -> $ty {
                if let Some(conflict) = self.core.conflict.as_mut() {
                    conflict.action = $crate::builder::ConflictAction::Nothing;
                }
                $ty { core: self.core }
            }

            /// `DO UPDATE SET ...`; an empty list renders `DO NOTHING`.
            pub fn do_update_set(
                self,
                assignments: impl IntoIterator<Item = $crate::Assignment>,
            ) -> $ty {
                self.do_update_set_where(assignments, ::std::iter::empty::<$crate::PredicateRef>())
            }

            /// `DO UPDATE SET ... WHERE ...`
            pub fn do_update_set_where(
                mut self,
                assignments: impl IntoIterator<Item = $crate::Assignment>,
                predicates: impl IntoIterator<Item = $crate::PredicateRef>,
            ) -> $ty {
                if let Some(conflict) = self.core.conflict.as_mut() {
                    conflict.action =
                        $crate::builder::ConflictAction::Update(assignments.into_iter().collect());
                    for p in predicates {
                        conflict.resolution_where.push(p);
                    }
                }
                $ty { core: self.core }
            }
        }
    };
}

/// Methods shared by every UPDATE wrapper.
macro_rules! update_methods {
    ($ty:ident) => {
        impl $ty {
            pub fn with(mut self, ctes: impl IntoIterator<Item = $crate::Cte>) -> Self {
                self.core.ctes = ctes.into_iter().collect();
                self
            }

            /// Append assignments to the SET clause.
            pub fn set(mut self, assignments: impl IntoIterator<Item = $crate::Assignment>) -> Self {
                self.core.assignments.extend(assignments);
                self
            }

            /// Derive the SET clause from `mapper` at render time.
            pub fn set_with(
                mut self,
                mapper: impl Fn(&mut $crate::Column) -> $crate::SqResult<()> + Send + Sync + 'static,
            ) -> Self {
                self.core.mapper = Some($crate::ColumnMapper::new(mapper));
                self
            }

            /// `UPDATE ... SET ... FROM table`
            pub fn from(mut self, table: impl $crate::Table + 'static) -> Self {
                self.core.from = Some(::std::sync::Arc::new(table));
                self
            }

            pub fn join(
                mut self,
                table: impl $crate::Table + 'static,
                on: impl IntoIterator<Item = $crate::PredicateRef>,
            ) -> Self {
                self.core
                    .joins
                    .push($crate::JoinTable::new($crate::JoinType::Inner, table, on));
                self
            }

            pub fn left_join(
                mut self,
                table: impl $crate::Table + 'static,
                on: impl IntoIterator<Item = $crate::PredicateRef>,
            ) -> Self {
                self.core
                    .joins
                    .push($crate::JoinTable::new($crate::JoinType::Left, table, on));
                self
            }

            pub fn where_(mut self, predicate: impl $crate::IntoPredicate) -> Self {
                self.core.where_.push(predicate.into_predicate());
                self
            }
        }
    };
}

/// `Sqlite.with(..)` / `Postgres.with(..)` entry: CTEs first, then a statement.
macro_rules! with_entry {
    ($ty:ident, $select:ident, $insert:ident, $update:ident, $delete:ident) => {
        /// A CTE list waiting for the statement it prefixes.
        #[derive(Debug, Clone, Default)]
        pub struct $ty {
            ctes: Vec<$crate::Cte>,
        }

        impl $ty {
            pub fn select(self, fields: impl IntoIterator<Item = $crate::FieldRef>) -> $select {
                $select::default().with(self.ctes).select(fields)
            }

            pub fn select_distinct(
                self,
                fields: impl IntoIterator<Item = $crate::FieldRef>,
            ) -> $select {
                self.select(fields).distinct()
            }

            pub fn from(self, table: impl $crate::Table + 'static) -> $select {
                $select::default().with(self.ctes).from(table)
            }

            pub fn insert_into(self, table: impl $crate::BaseTable + 'static) -> $insert {
                let mut insert = $insert::default().with(self.ctes);
                insert.core.into = Some(::std::sync::Arc::new(table));
                insert
            }

            pub fn update(self, table: impl $crate::BaseTable + 'static) -> $update {
                let mut update = $update::default().with(self.ctes);
                update.core.table = Some(::std::sync::Arc::new(table));
                update
            }

            pub fn delete_from(self, table: impl $crate::BaseTable + 'static) -> $delete {
                let mut delete = $delete::default().with(self.ctes);
                delete.core.from = Some(::std::sync::Arc::new(table));
                delete
            }
        }
    };
}

pub(crate) use {insert_methods, select_methods, update_methods, with_entry, write_only_query};
