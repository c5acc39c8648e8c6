use super::{SelectCore, write_condition, write_target};
use crate::assignment::{Assignment, write_assignments};
use crate::column::{ColumnMapper, ColumnMode};
use crate::cte::{Cte, write_ctes};
use crate::error::{SqError, SqResult};
use crate::field::{FieldRef, write_fields};
use crate::predicate::VariadicPredicate;
use crate::render::SqlWriter;
use crate::table::BaseTableRef;
use crate::value::Value;

#[derive(Debug, Clone)]
pub(crate) enum ConflictAction {
    Nothing,
    Update(Vec<Assignment>),
}

/// `ON CONFLICT ...` clause.
#[derive(Debug, Clone)]
pub(crate) struct Conflict {
    pub(crate) target: Vec<FieldRef>,
    pub(crate) constraint: Option<String>,
    pub(crate) target_where: VariadicPredicate,
    pub(crate) action: ConflictAction,
    pub(crate) resolution_where: VariadicPredicate,
}

impl Conflict {
    pub(crate) fn on(target: Vec<FieldRef>, constraint: Option<String>) -> Self {
        Self {
            target,
            constraint,
            target_where: VariadicPredicate::default(),
            action: ConflictAction::Nothing,
            resolution_where: VariadicPredicate::default(),
        }
    }

    fn write(&self, w: &mut SqlWriter, excluded: &[&str]) -> SqResult<()> {
        w.push_str(" ON CONFLICT");
        if let Some(constraint) = &self.constraint {
            w.push_str(" ON CONSTRAINT ");
            w.push_str(constraint);
        } else if !self.target.is_empty() {
            w.push_str(" (");
            write_fields(w, &self.target, excluded)?;
            w.push(')');
            write_condition(w, " WHERE ", &self.target_where, excluded)?;
        }
        match &self.action {
            ConflictAction::Update(assignments) if !assignments.is_empty() => {
                w.push_str(" DO UPDATE SET ");
                write_assignments(w, assignments, excluded)?;
                write_condition(w, " WHERE ", &self.resolution_where, &[])?;
            }
            _ => w.push_str(" DO NOTHING"),
        }
        Ok(())
    }
}

/// INSERT state shared by every dialect.
#[derive(Debug, Clone, Default)]
pub(crate) struct InsertCore {
    pub(crate) ctes: Vec<Cte>,
    pub(crate) into: Option<BaseTableRef>,
    pub(crate) columns: Vec<FieldRef>,
    pub(crate) rows: Vec<Vec<Value>>,
    pub(crate) mapper: Option<ColumnMapper>,
    pub(crate) select: Option<Box<SelectCore>>,
    pub(crate) conflict: Option<Conflict>,
}

impl InsertCore {
    pub(crate) fn write(&self, w: &mut SqlWriter) -> SqResult<()> {
        // The mapper runs before anything is written so that its error
        // leaves no partial SQL behind.
        let mapped = match &self.mapper {
            Some(mapper) => Some(mapper.run(ColumnMode::Insert)?.into_insert_parts()?),
            None => None,
        };
        let (columns, rows) = match &mapped {
            Some((columns, rows)) => (columns.as_slice(), rows.as_slice()),
            None => (self.columns.as_slice(), self.rows.as_slice()),
        };
        let table = self
            .into
            .as_deref()
            .ok_or_else(|| SqError::build("INSERT requires a target table"))?;
        if rows.is_empty() && self.select.is_none() {
            return Err(SqError::build("INSERT requires VALUES or a SELECT source"));
        }

        let implicit: Vec<&Cte> = self
            .select
            .as_deref()
            .map(|s| s.table_ctes().collect())
            .unwrap_or_default();
        write_ctes(w, &self.ctes, implicit)?;

        w.push_str("INSERT INTO ");
        let qualifier = write_target(w, table)?;
        let excluded = [qualifier];

        if !columns.is_empty() {
            w.push_str(" (");
            write_fields(w, columns, &excluded)?;
            w.push(')');
        }

        if !rows.is_empty() {
            w.push_str(" VALUES ");
            for (i, row) in rows.iter().enumerate() {
                if i > 0 {
                    w.push_str(", ");
                }
                w.push('(');
                for (j, value) in row.iter().enumerate() {
                    if j > 0 {
                        w.push_str(", ");
                    }
                    w.write_value(value, &[])?;
                }
                w.push(')');
            }
        } else if let Some(select) = &self.select {
            w.push(' ');
            select.write(w)?;
        }

        if let Some(conflict) = &self.conflict {
            conflict.write(w, &excluded)?;
        }
        Ok(())
    }
}
