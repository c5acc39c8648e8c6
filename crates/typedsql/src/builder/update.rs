use super::{write_condition, write_count, write_field_clause, write_target};
use crate::assignment::{Assignment, write_assignments};
use crate::column::{ColumnMapper, ColumnMode};
use crate::cte::{Cte, write_ctes};
use crate::error::{SqError, SqResult};
use crate::field::FieldRef;
use crate::join::{JoinTable, write_joins};
use crate::predicate::VariadicPredicate;
use crate::render::SqlWriter;
use crate::table::{BaseTableRef, TableRef, write_table_source};

/// UPDATE state shared by every dialect.
#[derive(Debug, Clone, Default)]
pub(crate) struct UpdateCore {
    pub(crate) ctes: Vec<Cte>,
    pub(crate) table: Option<BaseTableRef>,
    pub(crate) assignments: Vec<Assignment>,
    pub(crate) mapper: Option<ColumnMapper>,
    pub(crate) from: Option<TableRef>,
    pub(crate) joins: Vec<JoinTable>,
    pub(crate) where_: VariadicPredicate,
    pub(crate) order_by: Vec<FieldRef>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
}

impl UpdateCore {
    pub(crate) fn write(&self, w: &mut SqlWriter) -> SqResult<()> {
        let mapped = match &self.mapper {
            Some(mapper) => Some(mapper.run(ColumnMode::Update)?.into_assignments()?),
            None => None,
        };
        let assignments = mapped.as_deref().unwrap_or(&self.assignments);
        let table = self
            .table
            .as_deref()
            .ok_or_else(|| SqError::build("UPDATE requires a target table"))?;
        if assignments.is_empty() {
            return Err(SqError::build("UPDATE requires at least one assignment"));
        }

        let implicit = self
            .from
            .iter()
            .filter_map(|t| t.as_cte())
            .chain(self.joins.iter().filter_map(|j| j.table().as_cte()));
        write_ctes(w, &self.ctes, implicit)?;

        w.push_str("UPDATE ");
        let qualifier = write_target(w, table)?;
        w.push_str(" SET ");
        write_assignments(w, assignments, &[qualifier])?;

        if let Some(from) = &self.from {
            w.push_str(" FROM ");
            write_table_source(w, from.as_ref())?;
        }
        write_joins(w, &self.joins)?;
        write_condition(w, " WHERE ", &self.where_, &[])?;
        write_field_clause(w, " ORDER BY ", &self.order_by)?;
        write_count(w, " LIMIT ", self.limit);
        write_count(w, " OFFSET ", self.offset);
        Ok(())
    }
}
