//! JOIN clauses.

use crate::error::SqResult;
use crate::predicate::{LogicalOp, PredicateRef, VariadicPredicate};
use crate::render::SqlWriter;
use crate::table::{Table, TableRef, write_table_source};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    /// Any other join keyword, e.g. `CROSS JOIN` or `LEFT JOIN LATERAL`.
    Custom(String),
}

impl JoinType {
    pub fn as_sql(&self) -> &str {
        match self {
            JoinType::Inner => "JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL JOIN",
            JoinType::Custom(keyword) => keyword,
        }
    }
}

/// One `JOIN table ON p1 AND p2` entry.
#[derive(Debug, Clone)]
pub struct JoinTable {
    join_type: JoinType,
    table: TableRef,
    on: VariadicPredicate,
}

impl JoinTable {
    pub fn new(
        join_type: JoinType,
        table: impl Table + 'static,
        on: impl IntoIterator<Item = PredicateRef>,
    ) -> Self {
        Self {
            join_type,
            table: Arc::new(table),
            on: VariadicPredicate::new(LogicalOp::And, on.into_iter().collect()).toplevel(true),
        }
    }

    pub fn join_type(&self) -> &JoinType {
        &self.join_type
    }

    pub fn table(&self) -> &dyn Table {
        self.table.as_ref()
    }

    pub fn write_sql(&self, w: &mut SqlWriter) -> SqResult<()> {
        w.push_str(self.join_type.as_sql());
        w.push(' ');
        write_table_source(w, self.table.as_ref())?;
        if !self.on.is_empty() {
            w.push_str(" ON ");
            crate::field::Field::write_sql(&self.on, w, &[])?;
        }
        Ok(())
    }
}

/// Render every join, each preceded by a space.
pub(crate) fn write_joins(w: &mut SqlWriter, joins: &[JoinTable]) -> SqResult<()> {
    for join in joins {
        w.push(' ');
        join.write_sql(w)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::CustomField;
    use crate::predicate::eq;
    use crate::render::Dialect;
    use crate::table::TableInfo;

    #[test]
    fn joins_render_in_order() {
        let orders = TableInfo::new("orders").with_alias("o");
        let tags = TableInfo::new("tags");
        let joins = vec![
            JoinTable::new(
                JoinType::Left,
                orders,
                crate::predicates![
                    eq(CustomField::column("o", "user_id"), CustomField::column("u", "id")),
                    eq(CustomField::column("o", "state"), "paid"),
                ],
            ),
            JoinTable::new(JoinType::Custom("CROSS JOIN".into()), tags, vec![]),
        ];
        let mut w = SqlWriter::new(Dialect::Sqlite);
        write_joins(&mut w, &joins).unwrap();
        assert_eq!(
            w.sql(),
            " LEFT JOIN orders AS o ON o.user_id = u.id AND o.state = ? CROSS JOIN tags"
        );
        assert_eq!(w.args().len(), 1);
    }
}
