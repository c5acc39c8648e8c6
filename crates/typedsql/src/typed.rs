//! Typed column fields.
//!
//! Each kind wraps [`FieldBase`] and adds comparison and assignment helpers
//! for its Rust type. The helpers are thin wrappers over the untyped
//! predicates in [`crate::predicate`] and [`crate::assignment::assign`].

use crate::assignment::{Assignment, assign};
use crate::error::SqResult;
use crate::field::{Field, FieldBase, NullsOrder, Order};
use crate::predicate::{self, CustomPredicate, Predicate, PredicateRef};
use crate::render::SqlWriter;
use crate::table::TableInfo;
use crate::value::{Scalar, Value};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Storage kind of a typed field, reported in table metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Boolean,
    Number,
    String,
    Time,
    Blob,
    Json,
}

macro_rules! typed_field {
    ($($(#[$doc:meta])* $ty:ident => $kind:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Default)]
            pub struct $ty {
                base: FieldBase,
                expr: Option<(String, Vec<Value>)>,
                negative: bool,
            }

            impl $ty {
                /// Column `name` of `table`, qualified by the table's alias or name.
                pub fn new(name: impl Into<String>, table: &TableInfo) -> Self {
                    Self {
                        base: FieldBase::new(table.qualifier(), name),
                        expr: None,
                        negative: false,
                    }
                }

                /// Computed expression of this kind, e.g. `COUNT(*)`.
                pub fn fieldf(format: impl Into<String>, values: Vec<Value>) -> Self {
                    Self {
                        base: FieldBase::default(),
                        expr: Some((format.into(), values)),
                        negative: false,
                    }
                }

                pub const KIND: FieldKind = FieldKind::$kind;

                pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
                    self.base.alias = alias.into();
                    self
                }

                pub fn asc(&self) -> Self {
                    let mut f = self.clone();
                    f.base.order = Some(Order::Asc);
                    f
                }

                pub fn desc(&self) -> Self {
                    let mut f = self.clone();
                    f.base.order = Some(Order::Desc);
                    f
                }

                pub fn nulls_first(&self) -> Self {
                    let mut f = self.clone();
                    f.base.nulls = Some(NullsOrder::First);
                    f
                }

                pub fn nulls_last(&self) -> Self {
                    let mut f = self.clone();
                    f.base.nulls = Some(NullsOrder::Last);
                    f
                }

                pub fn is_null(&self) -> CustomPredicate {
                    predicate::is_null(self)
                }

                pub fn is_not_null(&self) -> CustomPredicate {
                    predicate::is_not_null(self)
                }

                /// `field IN (value)`; use a slice value or a subquery.
                pub fn in_(&self, value: impl Into<Value>) -> CustomPredicate {
                    predicate::in_(self, value)
                }

                pub fn eq(&self, other: &Self) -> CustomPredicate {
                    predicate::eq(self, other)
                }

                pub fn ne(&self, other: &Self) -> CustomPredicate {
                    predicate::ne(self, other)
                }

                /// Untyped assignment, e.g. to another field or a subquery.
                pub fn set(&self, value: impl Into<Value>) -> Assignment {
                    assign(self, value)
                }

                pub fn set_null(&self) -> Assignment {
                    assign(self, Value::Null)
                }
            }

            impl Field for $ty {
                fn write_sql(&self, w: &mut SqlWriter, excluded: &[&str]) -> SqResult<()> {
                    if self.negative {
                        w.push_str("NOT ");
                    }
                    match &self.expr {
                        Some((format, values)) => w.expand(format, values, excluded)?,
                        None => self.base.write_name(w, excluded),
                    }
                    self.base.write_modifiers(w);
                    Ok(())
                }

                fn name(&self) -> &str {
                    match &self.expr {
                        Some((format, _)) if self.base.name.is_empty() => format,
                        _ => &self.base.name,
                    }
                }

                fn alias(&self) -> &str {
                    &self.base.alias
                }
            }

            crate::field::value_from_field!($ty);
        )*
    };
}

typed_field! {
    /// A boolean column. Usable directly as a predicate.
    BooleanField => Boolean,
    /// An integer or floating point column.
    NumberField => Number,
    /// A text column.
    StringField => String,
    /// A timestamp column.
    TimeField => Time,
    /// A binary column.
    BlobField => Blob,
    /// A JSON column.
    JsonField => Json,
}

macro_rules! ordering_helpers {
    ($ty:ident) => {
        impl $ty {
            pub fn gt(&self, other: &Self) -> CustomPredicate {
                predicate::gt(self, other)
            }

            pub fn ge(&self, other: &Self) -> CustomPredicate {
                predicate::ge(self, other)
            }

            pub fn lt(&self, other: &Self) -> CustomPredicate {
                predicate::lt(self, other)
            }

            pub fn le(&self, other: &Self) -> CustomPredicate {
                predicate::le(self, other)
            }
        }
    };
}

ordering_helpers!(NumberField);
ordering_helpers!(StringField);
ordering_helpers!(TimeField);

macro_rules! typed_helpers {
    ($ty:ident, $arg:ty, $conv:expr, {
        $($name:ident => $format:literal),* $(,)?
    }, set: $set:ident, in: $in_name:ident($item:ident: $bound:path => $in_conv:expr),
    between: $between:ident) => {
        impl $ty {
            $(
                pub fn $name(&self, v: $arg) -> CustomPredicate {
                    #[allow(clippy::redundant_closure_call)]
                    let v: Scalar = ($conv)(v);
                    predicate::predicatef($format, vec![Value::from(self), Value::Scalar(v)])
                }
            )*

            pub fn $set(&self, v: $arg) -> Assignment {
                #[allow(clippy::redundant_closure_call)]
                let v: Scalar = ($conv)(v);
                assign(self, Value::Scalar(v))
            }

            pub fn $in_name<$item: $bound>(
                &self,
                values: impl IntoIterator<Item = $item>,
            ) -> CustomPredicate {
                let items: Vec<Scalar> = values.into_iter().map($in_conv).collect();
                predicate::in_(self, Value::Slice(items))
            }

            pub fn $between(&self, lo: $arg, hi: $arg) -> CustomPredicate {
                #[allow(clippy::redundant_closure_call)]
                let (lo, hi): (Scalar, Scalar) = (($conv)(lo), ($conv)(hi));
                predicate::between(self, lo, hi)
            }
        }
    };
}

typed_helpers!(NumberField, i64, Scalar::Int, {
    eq_int => "? = ?",
    ne_int => "? <> ?",
    gt_int => "? > ?",
    ge_int => "? >= ?",
    lt_int => "? < ?",
    le_int => "? <= ?",
}, set: set_int, in: in_ints(V: Into<i64> => |v: V| Scalar::Int(v.into())), between: between_int);

typed_helpers!(StringField, &str, |s: &str| Scalar::Text(s.to_owned()), {
    eq_string => "? = ?",
    ne_string => "? <> ?",
    gt_string => "? > ?",
    lt_string => "? < ?",
    like_string => "? LIKE ?",
    not_like_string => "? NOT LIKE ?",
    ilike_string => "? ILIKE ?",
}, set: set_string, in: in_strings(S: AsRef<str> => |s: S| Scalar::Text(s.as_ref().to_owned())),
between: between_string);

typed_helpers!(TimeField, DateTime<Utc>, Scalar::Time, {
    eq_time => "? = ?",
    ne_time => "? <> ?",
    gt_time => "? > ?",
    ge_time => "? >= ?",
    lt_time => "? < ?",
    le_time => "? <= ?",
}, set: set_time, in: in_times(V: Into<DateTime<Utc>> => |v: V| Scalar::Time(v.into())),
between: between_time);

impl NumberField {
    pub fn eq_float(&self, v: f64) -> CustomPredicate {
        predicate::eq(self, v)
    }

    pub fn gt_float(&self, v: f64) -> CustomPredicate {
        predicate::gt(self, v)
    }

    pub fn lt_float(&self, v: f64) -> CustomPredicate {
        predicate::lt(self, v)
    }

    pub fn set_float(&self, v: f64) -> Assignment {
        assign(self, v)
    }
}

impl BooleanField {
    pub fn eq_bool(&self, v: bool) -> CustomPredicate {
        predicate::eq(self, v)
    }

    pub fn set_bool(&self, v: bool) -> Assignment {
        assign(self, v)
    }
}

impl Predicate for BooleanField {
    fn not(&self) -> PredicateRef {
        let mut f = self.clone();
        f.negative = !f.negative;
        Arc::new(f)
    }
}

impl BlobField {
    pub fn eq_blob(&self, v: impl Into<Vec<u8>>) -> CustomPredicate {
        predicate::eq(self, v.into())
    }

    pub fn set_blob(&self, v: impl Into<Vec<u8>>) -> Assignment {
        assign(self, v.into())
    }
}

impl JsonField {
    pub fn eq_json(&self, v: serde_json::Value) -> CustomPredicate {
        predicate::eq(self, v)
    }

    /// Serialize `v` and assign it.
    pub fn set_json(&self, v: &impl serde::Serialize) -> SqResult<Assignment> {
        let json = serde_json::to_value(v)
            .map_err(|e| crate::error::SqError::build(format!("json encode: {e}")))?;
        Ok(assign(self, json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Dialect;

    fn render(f: &dyn Field, excluded: &[&str]) -> (String, Vec<Scalar>) {
        let mut w = SqlWriter::new(Dialect::Sqlite);
        f.write_sql(&mut w, excluded).unwrap();
        let b = w.finish();
        (b.sql, b.args)
    }

    #[test]
    fn fields_use_alias_as_qualifier() {
        let users = TableInfo::new("users").with_alias("u");
        let id = NumberField::new("user_id", &users);
        assert_eq!(render(&id, &[]).0, "u.user_id");
        assert_eq!(id.name(), "user_id");

        let plain = TableInfo::new("users").with_schema("app");
        let name = StringField::new("name", &plain);
        assert_eq!(render(&name, &[]).0, "users.name");
    }

    #[test]
    fn typed_helpers_bind_arguments() {
        let t = TableInfo::new("t");
        let n = NumberField::new("n", &t);
        let s = StringField::new("s", &t);
        assert_eq!(
            render(&n.between_int(1, 5), &[]),
            ("t.n BETWEEN ? AND ?".into(), vec![Scalar::Int(1), Scalar::Int(5)])
        );
        assert_eq!(
            render(&s.like_string("a%"), &[]),
            ("t.s LIKE ?".into(), vec![Scalar::Text("a%".into())])
        );
        assert_eq!(render(&s.in_strings(["x", "y"]), &[]).0, "t.s IN (?, ?)");
    }

    #[test]
    fn in_strings_accepts_borrowed_and_owned() {
        let t = TableInfo::new("t");
        let s = StringField::new("s", &t);
        let owned = vec!["a".to_string(), "b".to_string()];
        let expected = vec![Scalar::Text("a".into()), Scalar::Text("b".into())];

        assert_eq!(render(&s.in_strings(&owned), &[]).1, expected);
        assert_eq!(render(&s.in_strings(owned.iter().map(String::as_str)), &[]).1, expected);
        assert_eq!(render(&s.in_strings(owned), &[]), ("t.s IN (?, ?)".into(), expected));

        let n = NumberField::new("n", &t);
        assert_eq!(
            render(&n.in_ints([1_i32, 2]), &[]).1,
            vec![Scalar::Int(1), Scalar::Int(2)]
        );
    }

    #[test]
    fn boolean_field_negates() {
        let t = TableInfo::new("t");
        let active = BooleanField::new("active", &t);
        assert_eq!(render(&active.not(), &[]).0, "NOT t.active");
        assert_eq!(render(&active, &[]).0, "t.active");
    }

    #[test]
    fn ordering_modifiers() {
        let t = TableInfo::new("t");
        let created = TimeField::new("created_at", &t);
        assert_eq!(
            render(&created.desc().nulls_last(), &["t"]).0,
            "created_at DESC NULLS LAST"
        );
    }
}
