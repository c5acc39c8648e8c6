//! Predicates: negatable fields, AND/OR groups and comparison helpers.
//!
//! Negation toggles a flag on a copy of the predicate. Applying `not` twice
//! therefore renders exactly like the original predicate, and the result
//! only depends on whether `not` was applied an odd or even number of times.

use crate::error::SqResult;
use crate::field::Field;
use crate::query::Query;
use crate::render::SqlWriter;
use crate::value::Value;
use std::sync::Arc;

/// A field that evaluates to a boolean and can be negated.
pub trait Predicate: Field {
    /// Return a negated copy. Never mutates `self`.
    fn not(&self) -> PredicateRef;

    /// Downcast hook for single-child flattening of AND/OR groups.
    fn as_variadic(&self) -> Option<&VariadicPredicate> {
        None
    }
}

/// Shared handle to any predicate.
pub type PredicateRef = Arc<dyn Predicate>;

impl<P: Predicate + ?Sized> Predicate for Arc<P> {
    fn not(&self) -> PredicateRef {
        (**self).not()
    }

    fn as_variadic(&self) -> Option<&VariadicPredicate> {
        (**self).as_variadic()
    }
}

/// Conversion into a [`PredicateRef`].
pub trait IntoPredicate {
    fn into_predicate(self) -> PredicateRef;
}

impl<P: Predicate + 'static> IntoPredicate for P {
    fn into_predicate(self) -> PredicateRef {
        Arc::new(self)
    }
}

/// A predicate defined by a format string, e.g. `? = ?`.
#[derive(Debug, Clone, Default)]
pub struct CustomPredicate {
    alias: String,
    format: String,
    values: Vec<Value>,
    negative: bool,
}

impl CustomPredicate {
    pub fn new(format: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            format: format.into(),
            values,
            ..Self::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }
}

impl Field for CustomPredicate {
    fn write_sql(&self, w: &mut SqlWriter, excluded: &[&str]) -> SqResult<()> {
        if self.negative {
            w.push_str("NOT ");
        }
        w.expand(&self.format, &self.values, excluded)
    }

    fn name(&self) -> &str {
        ""
    }

    fn alias(&self) -> &str {
        &self.alias
    }
}

impl Predicate for CustomPredicate {
    fn not(&self) -> PredicateRef {
        let mut p = self.clone();
        p.negative = !p.negative;
        Arc::new(p)
    }
}

/// Shorthand for [`CustomPredicate::new`].
pub fn predicatef(format: impl Into<String>, values: Vec<Value>) -> CustomPredicate {
    CustomPredicate::new(format, values)
}

/// Logical operator joining the children of a [`VariadicPredicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogicalOp {
    #[default]
    And,
    Or,
}

impl LogicalOp {
    fn as_sql(&self) -> &'static str {
        match self {
            LogicalOp::And => " AND ",
            LogicalOp::Or => " OR ",
        }
    }
}

/// Children joined with AND/OR.
///
/// `toplevel` suppresses the surrounding parentheses, which statement
/// builders set for WHERE and HAVING clauses.
#[derive(Debug, Clone, Default)]
pub struct VariadicPredicate {
    pub(crate) toplevel: bool,
    alias: String,
    op: LogicalOp,
    pub(crate) predicates: Vec<PredicateRef>,
    negative: bool,
}

impl VariadicPredicate {
    pub fn new(op: LogicalOp, predicates: Vec<PredicateRef>) -> Self {
        Self {
            op,
            predicates,
            ..Self::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn toplevel(mut self, toplevel: bool) -> Self {
        self.toplevel = toplevel;
        self
    }

    pub fn push(&mut self, predicate: PredicateRef) {
        self.predicates.push(predicate);
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }
}

impl Field for VariadicPredicate {
    fn write_sql(&self, w: &mut SqlWriter, excluded: &[&str]) -> SqResult<()> {
        match self.predicates.as_slice() {
            [] => Ok(()),
            [only] => {
                if self.negative {
                    w.push_str("NOT ");
                }
                match only.as_variadic() {
                    Some(inner) => {
                        let mut inner = inner.clone();
                        // NOT applies to the whole group, so keep its parens.
                        let wrap = !self.toplevel || self.negative;
                        inner.toplevel = true;
                        if wrap {
                            w.push('(');
                        }
                        inner.write_sql(w, excluded)?;
                        if wrap {
                            w.push(')');
                        }
                        Ok(())
                    }
                    None => only.write_sql(w, excluded),
                }
            }
            children => {
                if self.negative {
                    w.push_str("NOT ");
                }
                let wrap = !self.toplevel || self.negative;
                if wrap {
                    w.push('(');
                }
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        w.push_str(self.op.as_sql());
                    }
                    child.write_sql(w, excluded)?;
                }
                if wrap {
                    w.push(')');
                }
                Ok(())
            }
        }
    }

    fn name(&self) -> &str {
        ""
    }

    fn alias(&self) -> &str {
        &self.alias
    }
}

impl Predicate for VariadicPredicate {
    fn not(&self) -> PredicateRef {
        let mut p = self.clone();
        p.negative = !p.negative;
        Arc::new(p)
    }

    fn as_variadic(&self) -> Option<&VariadicPredicate> {
        Some(self)
    }
}

crate::field::value_from_field!(CustomPredicate, VariadicPredicate);

/// `p1 AND p2 AND ...`
pub fn and(predicates: impl IntoIterator<Item = PredicateRef>) -> VariadicPredicate {
    VariadicPredicate::new(LogicalOp::And, predicates.into_iter().collect())
}

/// `p1 OR p2 OR ...`
pub fn or(predicates: impl IntoIterator<Item = PredicateRef>) -> VariadicPredicate {
    VariadicPredicate::new(LogicalOp::Or, predicates.into_iter().collect())
}

/// Negate any predicate.
pub fn not(predicate: impl IntoPredicate) -> PredicateRef {
    predicate.into_predicate().not()
}

/// Build a `Vec<PredicateRef>` from heterogeneous predicates.
#[macro_export]
macro_rules! predicates {
    ($($p:expr),* $(,)?) => {
        ::std::vec![$($crate::IntoPredicate::into_predicate($p)),*] as ::std::vec::Vec<$crate::PredicateRef>
    };
}

macro_rules! binary_predicates {
    ($($(#[$doc:meta])* $name:ident => $format:literal),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(a: impl Into<Value>, b: impl Into<Value>) -> CustomPredicate {
                predicatef($format, vec![a.into(), b.into()])
            }
        )*
    };
}

binary_predicates! {
    /// `a = b`
    eq => "? = ?",
    /// `a <> b`
    ne => "? <> ?",
    /// `a > b`
    gt => "? > ?",
    /// `a >= b`
    ge => "? >= ?",
    /// `a < b`
    lt => "? < ?",
    /// `a <= b`
    le => "? <= ?",
    /// `a IN (b)`; pass a [`Value::Slice`] or a subquery as `b`
    in_ => "? IN (?)",
    /// `a LIKE b`
    like => "? LIKE ?",
    /// `a ILIKE b`
    ilike => "? ILIKE ?",
}

pub fn is_null(a: impl Into<Value>) -> CustomPredicate {
    predicatef("? IS NULL", vec![a.into()])
}

pub fn is_not_null(a: impl Into<Value>) -> CustomPredicate {
    predicatef("? IS NOT NULL", vec![a.into()])
}

/// `a BETWEEN lo AND hi`
pub fn between(a: impl Into<Value>, lo: impl Into<Value>, hi: impl Into<Value>) -> CustomPredicate {
    predicatef("? BETWEEN ? AND ?", vec![a.into(), lo.into(), hi.into()])
}

/// `EXISTS (query)`
pub fn exists(query: impl Query + 'static) -> CustomPredicate {
    predicatef("EXISTS (?)", vec![Value::query(query)])
}
