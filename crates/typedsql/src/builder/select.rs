use super::{write_condition, write_count, write_field_clause};
use crate::cte::{Cte, write_ctes};
use crate::error::SqResult;
use crate::field::{FieldRef, write_fields, write_fields_with_alias};
use crate::join::{JoinTable, write_joins};
use crate::predicate::{IntoPredicate, VariadicPredicate};
use crate::render::SqlWriter;
use crate::table::{TableRef, write_table_source};
use crate::window::{Window, write_windows};

/// SELECT state shared by every dialect.
#[derive(Debug, Clone, Default)]
pub(crate) struct SelectCore {
    pub(crate) ctes: Vec<Cte>,
    pub(crate) distinct: bool,
    pub(crate) distinct_on: Vec<FieldRef>,
    pub(crate) fields: Vec<FieldRef>,
    pub(crate) from: Option<TableRef>,
    pub(crate) joins: Vec<JoinTable>,
    pub(crate) where_: VariadicPredicate,
    pub(crate) group_by: Vec<FieldRef>,
    pub(crate) having: VariadicPredicate,
    pub(crate) windows: Vec<Window>,
    pub(crate) order_by: Vec<FieldRef>,
    pub(crate) limit: Option<i64>,
    pub(crate) with_ties: bool,
    pub(crate) offset: Option<i64>,
}

impl SelectCore {
    pub(crate) fn where_(mut self, predicate: impl IntoPredicate) -> Self {
        self.where_.push(predicate.into_predicate());
        self
    }

    pub(crate) fn having(mut self, predicate: impl IntoPredicate) -> Self {
        self.having.push(predicate.into_predicate());
        self
    }

    /// CTEs used as FROM or JOIN sources.
    pub(crate) fn table_ctes(&self) -> impl Iterator<Item = &Cte> {
        self.from
            .iter()
            .filter_map(|t| t.as_cte())
            .chain(self.joins.iter().filter_map(|j| j.table().as_cte()))
    }

    pub(crate) fn write(&self, w: &mut SqlWriter) -> SqResult<()> {
        write_ctes(w, &self.ctes, self.table_ctes())?;

        w.push_str("SELECT ");
        if !self.distinct_on.is_empty() {
            w.push_str("DISTINCT ON (");
            write_fields(w, &self.distinct_on, &[])?;
            w.push_str(") ");
        } else if self.distinct {
            w.push_str("DISTINCT ");
        }
        if self.fields.is_empty() {
            w.push('1');
        } else {
            write_fields_with_alias(w, &self.fields, &[])?;
        }

        if let Some(from) = &self.from {
            w.push_str(" FROM ");
            write_table_source(w, from.as_ref())?;
        }
        write_joins(w, &self.joins)?;
        write_condition(w, " WHERE ", &self.where_, &[])?;
        write_field_clause(w, " GROUP BY ", &self.group_by)?;
        write_condition(w, " HAVING ", &self.having, &[])?;
        write_windows(w, &self.windows)?;
        write_field_clause(w, " ORDER BY ", &self.order_by)?;
        write_count(w, " LIMIT ", self.limit);
        if self.with_ties && self.limit.is_some() {
            w.push_str(" WITH TIES");
        }
        write_count(w, " OFFSET ", self.offset);
        Ok(())
    }
}
