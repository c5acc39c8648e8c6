//! CASE expressions, searched and simple.

use crate::error::{SqError, SqResult};
use crate::field::Field;
use crate::predicate::{IntoPredicate, PredicateRef};
use crate::render::SqlWriter;
use crate::value::Value;

/// `CASE WHEN p1 THEN r1 ... [ELSE f] END`
#[derive(Debug, Clone, Default)]
pub struct PredicateCases {
    alias: String,
    cases: Vec<(PredicateRef, Value)>,
    fallback: Option<Value>,
}

impl PredicateCases {
    pub fn when(mut self, predicate: impl IntoPredicate, result: impl Into<Value>) -> Self {
        self.cases.push((predicate.into_predicate(), result.into()));
        self
    }

    pub fn else_(mut self, fallback: impl Into<Value>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }
}

/// Start a searched CASE with its first branch.
pub fn case_when(predicate: impl IntoPredicate, result: impl Into<Value>) -> PredicateCases {
    PredicateCases::default().when(predicate, result)
}

impl Field for PredicateCases {
    fn write_sql(&self, w: &mut SqlWriter, excluded: &[&str]) -> SqResult<()> {
        if self.cases.is_empty() {
            return Err(SqError::build("no predicate cases provided"));
        }
        w.push_str("CASE");
        for (predicate, result) in &self.cases {
            w.push_str(" WHEN ");
            predicate.write_sql(w, excluded)?;
            w.push_str(" THEN ");
            w.write_value(result, excluded)?;
        }
        write_else(w, self.fallback.as_ref(), excluded)
    }

    fn name(&self) -> &str {
        ""
    }

    fn alias(&self) -> &str {
        &self.alias
    }
}

/// `CASE expr WHEN v1 THEN r1 ... [ELSE f] END`
#[derive(Debug, Clone)]
pub struct SimpleCases {
    alias: String,
    expr: Value,
    cases: Vec<(Value, Value)>,
    fallback: Option<Value>,
}

impl SimpleCases {
    pub fn when(mut self, value: impl Into<Value>, result: impl Into<Value>) -> Self {
        self.cases.push((value.into(), result.into()));
        self
    }

    pub fn else_(mut self, fallback: impl Into<Value>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }
}

/// Start a simple CASE keyed on `expr`; add branches with [`SimpleCases::when`].
pub fn case_value(expr: impl Into<Value>) -> SimpleCases {
    SimpleCases {
        alias: String::new(),
        expr: expr.into(),
        cases: Vec::new(),
        fallback: None,
    }
}

impl Field for SimpleCases {
    fn write_sql(&self, w: &mut SqlWriter, excluded: &[&str]) -> SqResult<()> {
        if self.cases.is_empty() {
            return Err(SqError::build("no value cases provided"));
        }
        w.push_str("CASE ");
        w.write_value(&self.expr, excluded)?;
        for (value, result) in &self.cases {
            w.push_str(" WHEN ");
            w.write_value(value, excluded)?;
            w.push_str(" THEN ");
            w.write_value(result, excluded)?;
        }
        write_else(w, self.fallback.as_ref(), excluded)
    }

    fn name(&self) -> &str {
        ""
    }

    fn alias(&self) -> &str {
        &self.alias
    }
}

fn write_else(w: &mut SqlWriter, fallback: Option<&Value>, excluded: &[&str]) -> SqResult<()> {
    if let Some(fallback) = fallback {
        w.push_str(" ELSE ");
        w.write_value(fallback, excluded)?;
    }
    w.push_str(" END");
    Ok(())
}

crate::field::value_from_field!(PredicateCases, SimpleCases);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::CustomField;
    use crate::predicate::gt;
    use crate::render::Dialect;

    fn render(f: &dyn Field) -> SqResult<(String, usize)> {
        let mut w = SqlWriter::new(Dialect::Sqlite);
        f.write_sql(&mut w, &[])?;
        let b = w.finish();
        Ok((b.sql, b.args.len()))
    }

    #[test]
    fn searched_case() {
        let score = CustomField::column("s", "score");
        let c = case_when(gt(&score, 90), "A")
            .when(gt(&score, 75), "B")
            .else_("C");
        assert_eq!(
            render(&c).unwrap(),
            (
                "CASE WHEN s.score > ? THEN ? WHEN s.score > ? THEN ? ELSE ? END".to_string(),
                5
            )
        );
    }

    #[test]
    fn simple_case() {
        let c = case_value(CustomField::column("o", "state"))
            .when("paid", 1)
            .when("void", 0);
        assert_eq!(
            render(&c).unwrap().0,
            "CASE o.state WHEN ? THEN ? WHEN ? THEN ? END"
        );
    }

    #[test]
    fn empty_cases_are_errors() {
        assert!(matches!(render(&PredicateCases::default()), Err(SqError::Build(_))));
        assert!(matches!(render(&case_value(1)), Err(SqError::Build(_))));
    }
}
