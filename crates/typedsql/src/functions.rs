//! Aggregate and window functions.

use crate::typed::NumberField;
use crate::value::Value;
use crate::window::Window;

/// `COUNT(*)`
pub fn count() -> NumberField {
    NumberField::fieldf("COUNT(*)", vec![])
}

/// `COUNT(DISTINCT expr)`
pub fn count_distinct(expr: impl Into<Value>) -> NumberField {
    NumberField::fieldf("COUNT(DISTINCT ?)", vec![expr.into()])
}

pub fn sum(expr: impl Into<Value>) -> NumberField {
    NumberField::fieldf("SUM(?)", vec![expr.into()])
}

pub fn avg(expr: impl Into<Value>) -> NumberField {
    NumberField::fieldf("AVG(?)", vec![expr.into()])
}

pub fn min(expr: impl Into<Value>) -> NumberField {
    NumberField::fieldf("MIN(?)", vec![expr.into()])
}

pub fn max(expr: impl Into<Value>) -> NumberField {
    NumberField::fieldf("MAX(?)", vec![expr.into()])
}

fn over(format: &str, mut values: Vec<Value>, window: &Window) -> NumberField {
    values.push(Value::from(window));
    NumberField::fieldf(format!("{format} OVER ?"), values)
}

pub fn count_over(window: &Window) -> NumberField {
    over("COUNT(*)", vec![], window)
}

pub fn sum_over(expr: impl Into<Value>, window: &Window) -> NumberField {
    over("SUM(?)", vec![expr.into()], window)
}

pub fn avg_over(expr: impl Into<Value>, window: &Window) -> NumberField {
    over("AVG(?)", vec![expr.into()], window)
}

pub fn min_over(expr: impl Into<Value>, window: &Window) -> NumberField {
    over("MIN(?)", vec![expr.into()], window)
}

pub fn max_over(expr: impl Into<Value>, window: &Window) -> NumberField {
    over("MAX(?)", vec![expr.into()], window)
}

pub fn row_number_over(window: &Window) -> NumberField {
    over("ROW_NUMBER()", vec![], window)
}

pub fn rank_over(window: &Window) -> NumberField {
    over("RANK()", vec![], window)
}

pub fn dense_rank_over(window: &Window) -> NumberField {
    over("DENSE_RANK()", vec![], window)
}

pub fn percent_rank_over(window: &Window) -> NumberField {
    over("PERCENT_RANK()", vec![], window)
}

pub fn cume_dist_over(window: &Window) -> NumberField {
    over("CUME_DIST()", vec![], window)
}

pub fn ntile_over(buckets: i64, window: &Window) -> NumberField {
    over("NTILE(?)", vec![Value::from(buckets)], window)
}

/// `LEAD(expr, offset, default)`
pub fn lead_over(
    expr: impl Into<Value>,
    offset: i64,
    default: impl Into<Value>,
    window: &Window,
) -> NumberField {
    over(
        "LEAD(?, ?, ?)",
        vec![expr.into(), Value::from(offset), default.into()],
        window,
    )
}

/// `LAG(expr, offset, default)`
pub fn lag_over(
    expr: impl Into<Value>,
    offset: i64,
    default: impl Into<Value>,
    window: &Window,
) -> NumberField {
    over(
        "LAG(?, ?, ?)",
        vec![expr.into(), Value::from(offset), default.into()],
        window,
    )
}

pub fn first_value_over(expr: impl Into<Value>, window: &Window) -> NumberField {
    over("FIRST_VALUE(?)", vec![expr.into()], window)
}

pub fn last_value_over(expr: impl Into<Value>, window: &Window) -> NumberField {
    over("LAST_VALUE(?)", vec![expr.into()], window)
}

pub fn nth_value_over(expr: impl Into<Value>, n: i64, window: &Window) -> NumberField {
    over("NTH_VALUE(?, ?)", vec![expr.into(), Value::from(n)], window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{CustomField, Field};
    use crate::render::{Dialect, SqlWriter};

    fn render(f: &dyn Field) -> (String, usize) {
        let mut w = SqlWriter::new(Dialect::Sqlite);
        f.write_sql(&mut w, &[]).unwrap();
        let b = w.finish();
        (b.sql, b.args.len())
    }

    #[test]
    fn aggregates() {
        assert_eq!(render(&count()).0, "COUNT(*)");
        assert_eq!(
            render(&sum(CustomField::column("o", "total")).with_alias("revenue")).0,
            "SUM(o.total)"
        );
    }

    #[test]
    fn window_functions_reference_windows() {
        let by_dept = Window::new().partition_by(crate::fields![CustomField::column("e", "dept")]);
        assert_eq!(
            render(&rank_over(&by_dept)).0,
            "RANK() OVER (PARTITION BY e.dept)"
        );
        assert_eq!(
            render(&lag_over(CustomField::column("e", "pay"), 1, 0, &by_dept.clone().named("w"))),
            ("LAG(e.pay, ?, ?) OVER w".to_string(), 2)
        );
    }
}
