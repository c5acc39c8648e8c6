//! Postgres statement builders (`$n` placeholders).
//!
//! Rendering happens with `?` markers; [`Query::to_sql`](crate::Query::to_sql)
//! converts them to `$1, $2, ...` in a final pass, leaving `??` as a literal `?`
//! for JSONB operators.

use crate::builder::insert::Conflict;
use crate::builder::{
    DeleteCore, InsertCore, SelectCore, UpdateCore, insert_methods, select_methods,
    update_methods, with_entry, write_only_query,
};
use crate::cte::Cte;
use crate::field::FieldRef;
use crate::join::{JoinTable, JoinType};
use crate::field::literal;
use crate::predicate::{IntoPredicate, PredicateRef};
use crate::render::Dialect;
use crate::table::{BaseTable, Table};
use std::sync::Arc;

/// Entry point for Postgres statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Postgres {
    pub fn with(self, ctes: impl IntoIterator<Item = Cte>) -> PostgresWith {
        PostgresWith {
            ctes: ctes.into_iter().collect(),
        }
    }

    pub fn select(self, fields: impl IntoIterator<Item = FieldRef>) -> PostgresSelect {
        PostgresSelect::default().select(fields)
    }

    pub fn select_distinct(self, fields: impl IntoIterator<Item = FieldRef>) -> PostgresSelect {
        self.select(fields).distinct()
    }

    /// `SELECT DISTINCT ON (on) fields`
    pub fn select_distinct_on(
        self,
        on: impl IntoIterator<Item = FieldRef>,
        fields: impl IntoIterator<Item = FieldRef>,
    ) -> PostgresSelect {
        self.select(fields).distinct_on(on)
    }

    pub fn select_one(self) -> PostgresSelect {
        self.select(crate::fields![literal("1")])
    }

    pub fn from(self, table: impl Table + 'static) -> PostgresSelect {
        PostgresSelect::default().from(table)
    }

    pub fn insert_into(self, table: impl BaseTable + 'static) -> PostgresInsert {
        PostgresWith::default().insert_into(table)
    }

    pub fn update(self, table: impl BaseTable + 'static) -> PostgresUpdate {
        PostgresWith::default().update(table)
    }

    pub fn delete_from(self, table: impl BaseTable + 'static) -> PostgresDelete {
        PostgresWith::default().delete_from(table)
    }
}

with_entry!(PostgresWith, PostgresSelect, PostgresInsert, PostgresUpdate, PostgresDelete);

#[derive(Debug, Clone, Default)]
pub struct PostgresSelect {
    core: SelectCore,
}

select_methods!(PostgresSelect, Dialect::Postgres);

impl PostgresSelect {
    /// `DISTINCT ON (fields)`; takes precedence over plain DISTINCT.
    pub fn distinct_on(mut self, fields: impl IntoIterator<Item = FieldRef>) -> Self {
        self.core.distinct_on = fields.into_iter().collect();
        self
    }

    /// Render `WITH TIES` after LIMIT. Ignored without a limit.
    pub fn with_ties(mut self) -> Self {
        self.core.with_ties = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostgresInsert {
    core: InsertCore,
}

/// `ON CONFLICT` builder returned by [`PostgresInsert::on_conflict`].
#[derive(Debug, Clone)]
pub struct PostgresInsertConflict {
    core: InsertCore,
}

insert_methods!(PostgresInsert, PostgresSelect, PostgresInsertConflict);
write_only_query!(PostgresInsert, Dialect::Postgres);

impl PostgresInsert {
    /// `ON CONFLICT ON CONSTRAINT name`
    pub fn on_conflict_on_constraint(mut self, name: impl Into<String>) -> PostgresInsertConflict {
        self.core.conflict = Some(Conflict::on(Vec::new(), Some(name.into())));
        PostgresInsertConflict { core: self.core }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostgresUpdate {
    core: UpdateCore,
}

update_methods!(PostgresUpdate);
write_only_query!(PostgresUpdate, Dialect::Postgres);

#[derive(Debug, Clone, Default)]
pub struct PostgresDelete {
    core: DeleteCore,
}

write_only_query!(PostgresDelete, Dialect::Postgres);

impl PostgresDelete {
    pub fn with(mut self, ctes: impl IntoIterator<Item = Cte>) -> Self {
        self.core.ctes = ctes.into_iter().collect();
        self
    }

    /// `DELETE FROM target USING table`
    pub fn using(mut self, table: impl Table + 'static) -> Self {
        self.core.using = Some(Arc::new(table));
        self
    }

    /// Join onto the `USING` table. Rendering fails without [`Self::using`].
    pub fn join(
        mut self,
        table: impl Table + 'static,
        on: impl IntoIterator<Item = PredicateRef>,
    ) -> Self {
        self.core
            .joins
            .push(JoinTable::new(JoinType::Inner, table, on));
        self
    }

    pub fn left_join(
        mut self,
        table: impl Table + 'static,
        on: impl IntoIterator<Item = PredicateRef>,
    ) -> Self {
        self.core
            .joins
            .push(JoinTable::new(JoinType::Left, table, on));
        self
    }

    pub fn where_(mut self, predicate: impl IntoPredicate) -> Self {
        self.core.where_.push(predicate.into_predicate());
        self
    }
}
