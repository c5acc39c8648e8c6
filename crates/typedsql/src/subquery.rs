//! Inline derived tables: `(SELECT ...) AS alias`.

use crate::error::SqResult;
use crate::field::CustomField;
use crate::query::{Query, QueryRef};
use crate::render::SqlWriter;
use crate::table::Table;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Subquery {
    alias: String,
    columns: Vec<String>,
    query: QueryRef,
}

impl Subquery {
    /// Columns are taken from the query's projection (alias, else name).
    pub fn new(alias: impl Into<String>, query: impl Query + 'static) -> Self {
        let query: QueryRef = Arc::new(query);
        let columns = query
            .fetchable_fields()
            .map(|fields| {
                fields
                    .iter()
                    .map(|f| match f.alias() {
                        "" => f.name().to_owned(),
                        alias => alias.to_owned(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            alias: alias.into(),
            columns,
            query,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Column `column` qualified by the subquery alias; blank when unknown.
    pub fn field(&self, column: &str) -> CustomField {
        if self.columns.iter().any(|c| c == column) {
            CustomField::column(self.alias.as_str(), column)
        } else {
            CustomField::default()
        }
    }
}

impl Table for Subquery {
    fn write_sql(&self, w: &mut SqlWriter) -> SqResult<()> {
        match self.query.as_variadic() {
            Some(body) => body.clone().toplevel(true).write_sql(w),
            None => self.query.write_sql(w),
        }
    }

    fn name(&self) -> &str {
        ""
    }

    fn alias(&self) -> &str {
        &self.alias
    }

    fn is_derived(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::raw;
    use crate::render::Dialect;

    #[test]
    fn unknown_subquery_columns_are_blank() {
        let sq = Subquery::new("s", raw(Dialect::Sqlite, "SELECT 1", vec![]));
        assert!(sq.columns().is_empty());
        assert!(sq.field("x").is_blank());
    }
}
