//! SQLite statement builders (`?` placeholders).
//!
//! ```ignore
//! use typedsql::{Sqlite, fields};
//!
//! let u = Users::aliased("u");
//! let q = Sqlite
//!     .from(u.clone())
//!     .select(fields![u.user_id.clone(), u.name.clone()])
//!     .where_(u.name.like_string("a%"))
//!     .order_by(fields![u.user_id.desc()])
//!     .limit(10);
//! let built = q.to_sql()?;
//! ```

use crate::builder::{
    DeleteCore, InsertCore, SelectCore, UpdateCore, insert_methods, select_methods,
    update_methods, with_entry, write_only_query,
};
use crate::cte::Cte;
use crate::field::FieldRef;
use crate::field::literal;
use crate::predicate::IntoPredicate;
use crate::render::Dialect;
use crate::table::{BaseTable, Table};

/// Entry point for SQLite statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Sqlite {
    pub fn with(self, ctes: impl IntoIterator<Item = Cte>) -> SqliteWith {
        SqliteWith {
            ctes: ctes.into_iter().collect(),
        }
    }

    pub fn select(self, fields: impl IntoIterator<Item = FieldRef>) -> SqliteSelect {
        SqliteSelect::default().select(fields)
    }

    pub fn select_distinct(self, fields: impl IntoIterator<Item = FieldRef>) -> SqliteSelect {
        self.select(fields).distinct()
    }

    /// `SELECT 1`, typically wrapped in EXISTS.
    pub fn select_one(self) -> SqliteSelect {
        self.select(crate::fields![literal("1")])
    }

    pub fn from(self, table: impl Table + 'static) -> SqliteSelect {
        SqliteSelect::default().from(table)
    }

    pub fn insert_into(self, table: impl BaseTable + 'static) -> SqliteInsert {
        SqliteWith::default().insert_into(table)
    }

    pub fn update(self, table: impl BaseTable + 'static) -> SqliteUpdate {
        SqliteWith::default().update(table)
    }

    pub fn delete_from(self, table: impl BaseTable + 'static) -> SqliteDelete {
        SqliteWith::default().delete_from(table)
    }
}

with_entry!(SqliteWith, SqliteSelect, SqliteInsert, SqliteUpdate, SqliteDelete);

#[derive(Debug, Clone, Default)]
pub struct SqliteSelect {
    core: SelectCore,
}

select_methods!(SqliteSelect, Dialect::Sqlite);

#[derive(Debug, Clone, Default)]
pub struct SqliteInsert {
    core: InsertCore,
}

/// `ON CONFLICT` builder returned by [`SqliteInsert::on_conflict`].
#[derive(Debug, Clone)]
pub struct SqliteInsertConflict {
    core: InsertCore,
}

insert_methods!(SqliteInsert, SqliteSelect, SqliteInsertConflict);
write_only_query!(SqliteInsert, Dialect::Sqlite);

#[derive(Debug, Clone, Default)]
pub struct SqliteUpdate {
    core: UpdateCore,
}

update_methods!(SqliteUpdate);
write_only_query!(SqliteUpdate, Dialect::Sqlite);

impl SqliteUpdate {
    pub fn order_by(mut self, fields: impl IntoIterator<Item = FieldRef>) -> Self {
        self.core.order_by = fields.into_iter().collect();
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.core.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.core.offset = Some(offset);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct SqliteDelete {
    core: DeleteCore,
}

write_only_query!(SqliteDelete, Dialect::Sqlite);

impl SqliteDelete {
    pub fn with(mut self, ctes: impl IntoIterator<Item = Cte>) -> Self {
        self.core.ctes = ctes.into_iter().collect();
        self
    }

    pub fn where_(mut self, predicate: impl IntoPredicate) -> Self {
        self.core.where_.push(predicate.into_predicate());
        self
    }

    pub fn order_by(mut self, fields: impl IntoIterator<Item = FieldRef>) -> Self {
        self.core.order_by = fields.into_iter().collect();
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.core.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.core.offset = Some(offset);
        self
    }
}
