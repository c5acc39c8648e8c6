use super::{write_condition, write_count, write_field_clause, write_target};
use crate::cte::{Cte, write_ctes};
use crate::error::{SqError, SqResult};
use crate::field::FieldRef;
use crate::join::{JoinTable, write_joins};
use crate::predicate::VariadicPredicate;
use crate::render::SqlWriter;
use crate::table::{BaseTableRef, TableRef, write_table_source};

/// DELETE state shared by every dialect.
#[derive(Debug, Clone, Default)]
pub(crate) struct DeleteCore {
    pub(crate) ctes: Vec<Cte>,
    pub(crate) from: Option<BaseTableRef>,
    pub(crate) using: Option<TableRef>,
    pub(crate) joins: Vec<JoinTable>,
    pub(crate) where_: VariadicPredicate,
    pub(crate) order_by: Vec<FieldRef>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
}

impl DeleteCore {
    pub(crate) fn write(&self, w: &mut SqlWriter) -> SqResult<()> {
        let table = self
            .from
            .as_deref()
            .ok_or_else(|| SqError::build("DELETE requires a target table"))?;
        if self.using.is_none() && !self.joins.is_empty() {
            return Err(SqError::build("DELETE joins require a USING table"));
        }

        let implicit = self
            .using
            .iter()
            .filter_map(|t| t.as_cte())
            .chain(self.joins.iter().filter_map(|j| j.table().as_cte()));
        write_ctes(w, &self.ctes, implicit)?;

        w.push_str("DELETE FROM ");
        write_target(w, table)?;
        if let Some(using) = &self.using {
            w.push_str(" USING ");
            write_table_source(w, using.as_ref())?;
        }
        write_joins(w, &self.joins)?;
        write_condition(w, " WHERE ", &self.where_, &[])?;
        write_field_clause(w, " ORDER BY ", &self.order_by)?;
        write_count(w, " LIMIT ", self.limit);
        write_count(w, " OFFSET ", self.offset);
        Ok(())
    }
}
