//! Column accumulator for data-driven INSERT and UPDATE.
//!
//! A mapper callback receives a fresh [`Column`] at render time and sets
//! values field by field. In INSERT mode, setting a field that already has a
//! value in the current row starts the next row; in UPDATE mode every set
//! becomes an assignment.

use crate::assignment::{Assignment, assign};
use crate::error::{SqError, SqResult};
use crate::field::{Field, FieldRef};
use crate::typed::{BlobField, BooleanField, JsonField, NumberField, StringField, TimeField};
use crate::value::Value;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Whether a [`Column`] accumulates rows or assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnMode {
    Insert,
    Update,
}

/// Per-statement accumulator populated by a mapper callback.
#[derive(Debug)]
pub struct Column {
    mode: ColumnMode,
    columns: Vec<FieldRef>,
    positions: HashMap<String, usize>,
    rows: Vec<Vec<Option<Value>>>,
    assignments: Vec<Assignment>,
    error: Option<SqError>,
}

impl Column {
    pub fn new(mode: ColumnMode) -> Self {
        Self {
            mode,
            columns: Vec::new(),
            positions: HashMap::new(),
            rows: Vec::new(),
            assignments: Vec::new(),
            error: None,
        }
    }

    pub fn mode(&self) -> ColumnMode {
        self.mode
    }

    /// Set `field` to `value` in the current row (or as an assignment).
    pub fn set<F: Field + Clone + 'static>(&mut self, field: &F, value: impl Into<Value>) {
        let value = value.into();
        let field: FieldRef = Arc::new(field.clone());
        match self.mode {
            ColumnMode::Update => self.assignments.push(assign(field, value)),
            ColumnMode::Insert => self.set_insert(field, value),
        }
    }

    fn set_insert(&mut self, field: FieldRef, value: Value) {
        if self.error.is_some() {
            return;
        }
        if self.rows.is_empty() {
            self.rows.push(Vec::new());
        }
        let existing = self.positions.get(field.name()).copied();
        let position = match existing {
            Some(pos) => pos,
            None if self.rows.len() == 1 => {
                let pos = self.columns.len();
                self.positions.insert(field.name().to_owned(), pos);
                self.columns.push(field);
                for row in &mut self.rows {
                    row.push(None);
                }
                pos
            }
            None => {
                self.error = Some(SqError::build(format!(
                    "column {} was not set in the first row",
                    field.name()
                )));
                return;
            }
        };
        let width = self.columns.len();
        let filled = self
            .rows
            .last()
            .is_some_and(|row| row.get(position).is_some_and(Option::is_some));
        if filled {
            self.rows.push(vec![None; width]);
        }
        if let Some(row) = self.rows.last_mut() {
            row[position] = Some(value);
        }
    }

    pub fn set_bool(&mut self, field: &BooleanField, value: bool) {
        self.set(field, value);
    }

    pub fn set_int(&mut self, field: &NumberField, value: i64) {
        self.set(field, value);
    }

    pub fn set_float(&mut self, field: &NumberField, value: f64) {
        self.set(field, value);
    }

    pub fn set_string(&mut self, field: &StringField, value: impl Into<String>) {
        self.set(field, value.into());
    }

    pub fn set_time(&mut self, field: &TimeField, value: DateTime<Utc>) {
        self.set(field, value);
    }

    pub fn set_blob(&mut self, field: &BlobField, value: impl Into<Vec<u8>>) {
        self.set(field, value.into());
    }

    pub fn set_json(&mut self, field: &JsonField, value: serde_json::Value) {
        self.set(field, value);
    }

    /// Consume into an INSERT column list and row values. Unset cells are NULL.
    pub(crate) fn into_insert_parts(self) -> SqResult<(Vec<FieldRef>, Vec<Vec<Value>>)> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let rows = self
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(|v| v.unwrap_or(Value::Null)).collect())
            .collect();
        Ok((self.columns, rows))
    }

    /// Consume into UPDATE assignments.
    pub(crate) fn into_assignments(self) -> SqResult<Vec<Assignment>> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(self.assignments)
    }
}

/// Mapper callback invoked once per render with a fresh [`Column`].
#[derive(Clone)]
pub struct ColumnMapper(Arc<dyn Fn(&mut Column) -> SqResult<()> + Send + Sync>);

impl ColumnMapper {
    pub fn new(f: impl Fn(&mut Column) -> SqResult<()> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn run(&self, mode: ColumnMode) -> SqResult<Column> {
        let mut col = Column::new(mode);
        (self.0)(&mut col)?;
        Ok(col)
    }
}

impl fmt::Debug for ColumnMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ColumnMapper(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableInfo;

    #[test]
    fn repeated_field_starts_new_row() {
        let t = TableInfo::new("users");
        let id = NumberField::new("id", &t);
        let name = StringField::new("name", &t);
        let mut col = Column::new(ColumnMode::Insert);
        for (i, n) in [(1, "a"), (2, "b"), (3, "c")] {
            col.set_int(&id, i);
            col.set_string(&name, n);
        }
        let (cols, rows) = col.into_insert_parts().unwrap();
        assert_eq!(cols.len(), 2);
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn late_column_is_rejected_and_missing_cells_are_null() {
        let t = TableInfo::new("users");
        let id = NumberField::new("id", &t);
        let name = StringField::new("name", &t);

        let mut col = Column::new(ColumnMode::Insert);
        col.set_int(&id, 1);
        col.set_string(&name, "a");
        col.set_int(&id, 2);
        let (_, rows) = col.into_insert_parts().unwrap();
        assert!(rows[1][1].is_null());

        let mut col = Column::new(ColumnMode::Insert);
        col.set_int(&id, 1);
        col.set_int(&id, 2);
        col.set_string(&name, "late");
        assert!(matches!(col.into_insert_parts(), Err(SqError::Build(_))));
    }

    #[test]
    fn update_mode_collects_assignments() {
        let t = TableInfo::new("users");
        let mut col = Column::new(ColumnMode::Update);
        col.set_bool(&BooleanField::new("active", &t), true);
        col.set_string(&StringField::new("name", &t), "x");
        assert_eq!(col.into_assignments().unwrap().len(), 2);
    }
}
