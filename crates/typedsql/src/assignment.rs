//! SET-clause assignments.

use crate::error::SqResult;
use crate::field::Field;
use crate::render::SqlWriter;
use crate::value::Value;

/// `lhs = rhs`. A query on the right renders as a parenthesized scalar subquery.
#[derive(Debug, Clone)]
pub struct Assignment {
    lhs: Value,
    rhs: Value,
}

impl Assignment {
    pub fn write_sql(&self, w: &mut SqlWriter, excluded: &[&str]) -> SqResult<()> {
        w.write_value(&self.lhs, excluded)?;
        w.push_str(" = ");
        match &self.rhs {
            Value::Query(q) => {
                w.push('(');
                q.write_sql(w)?;
                w.push(')');
            }
            other => w.write_value(other, excluded)?,
        }
        Ok(())
    }

    /// Name of the assigned column, when the left side is a field.
    pub fn column_name(&self) -> Option<&str> {
        match &self.lhs {
            Value::Field(f) => Some(f.name()),
            _ => None,
        }
    }
}

pub fn assign(lhs: impl Into<Value>, rhs: impl Into<Value>) -> Assignment {
    Assignment {
        lhs: lhs.into(),
        rhs: rhs.into(),
    }
}

/// `name = EXCLUDED.name`, for ON CONFLICT DO UPDATE.
pub fn set_excluded(field: &dyn Field) -> Assignment {
    let name = field.name().to_owned();
    Assignment {
        lhs: Value::Field(std::sync::Arc::new(crate::field::CustomField::column("", &name))),
        rhs: Value::Field(std::sync::Arc::new(crate::field::CustomField::column(
            "EXCLUDED", name,
        ))),
    }
}

/// Render `a = ?, b = ?`.
pub fn write_assignments(
    w: &mut SqlWriter,
    assignments: &[Assignment],
    excluded: &[&str],
) -> SqResult<()> {
    for (i, a) in assignments.iter().enumerate() {
        if i > 0 {
            w.push_str(", ");
        }
        a.write_sql(w, excluded)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::CustomField;
    use crate::render::Dialect;

    #[test]
    fn assignments_exclude_qualifier() {
        let name = CustomField::column("u", "name");
        let list = vec![assign(&name, "bob"), set_excluded(&name)];
        let mut w = SqlWriter::new(Dialect::Sqlite);
        write_assignments(&mut w, &list, &["u"]).unwrap();
        assert_eq!(w.sql(), "name = ?, name = EXCLUDED.name");
        assert_eq!(w.args().len(), 1);
        assert_eq!(list[0].column_name(), Some("name"));
    }
}
