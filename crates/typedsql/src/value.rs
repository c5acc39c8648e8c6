//! Operand values consumed by the renderer.
//!
//! [`Value`] is the closed set of things a format string or predicate can
//! reference. The renderer matches over it directly:
//!
//! - `Null` renders the `NULL` literal
//! - `Scalar` renders one `?` and appends one argument
//! - `Field` / `Query` recurse into the nested expression
//! - `Slice` expands to `?, ?, ?` (or `NULL` when empty), which is what
//!   `IN (?)` needs

use crate::field::FieldRef;
use crate::query::QueryRef;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt::{self, Write as _};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use uuid::Uuid;

/// A bindable, non-null SQL argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Time(DateTime<Utc>),
    Json(serde_json::Value),
    Uuid(Uuid),
}

impl Scalar {
    /// Short type label used in logs and scan diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "i64",
            Scalar::Float(_) => "f64",
            Scalar::Text(_) => "string",
            Scalar::Bytes(_) => "bytes",
            Scalar::Time(_) => "time",
            Scalar::Json(_) => "json",
            Scalar::Uuid(_) => "uuid",
        }
    }

    /// Append this value as an inline SQL literal.
    pub fn write_literal(&self, out: &mut String) {
        match self {
            Scalar::Bool(true) => out.push_str("TRUE"),
            Scalar::Bool(false) => out.push_str("FALSE"),
            Scalar::Int(v) => {
                let _ = write!(out, "{v}");
            }
            Scalar::Float(v) => {
                let _ = write!(out, "{v}");
            }
            Scalar::Text(s) => write_quoted(out, s),
            Scalar::Bytes(b) => {
                out.push_str("x'");
                for byte in b {
                    let _ = write!(out, "{byte:02x}");
                }
                out.push('\'');
            }
            Scalar::Time(t) => write_quoted(out, &t.to_rfc3339()),
            Scalar::Json(v) => write_quoted(out, &v.to_string()),
            Scalar::Uuid(u) => write_quoted(out, &u.to_string()),
        }
    }
}

fn write_quoted(out: &mut String, s: &str) {
    out.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            other => {
                let mut buf = String::new();
                other.write_literal(&mut buf);
                f.write_str(&buf)
            }
        }
    }
}

impl ToSql for Scalar {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            Scalar::Bool(v) => v.to_sql(ty, out),
            Scalar::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Scalar::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Scalar::Text(v) => v.to_sql(ty, out),
            Scalar::Bytes(v) => v.to_sql(ty, out),
            Scalar::Time(v) => match *ty {
                Type::TIMESTAMP => v.naive_utc().to_sql(ty, out),
                Type::DATE => v.date_naive().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Scalar::Json(v) => v.to_sql(ty, out),
            Scalar::Uuid(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// A renderable operand.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Scalar(Scalar),
    Field(FieldRef),
    Query(QueryRef),
    Slice(Vec<Scalar>),
}

impl Value {
    /// Build a flattening list operand, e.g. for `IN (?)`.
    pub fn slice<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Scalar>,
    {
        Value::Slice(items.into_iter().map(Into::into).collect())
    }

    /// Wrap a nested query, rendered inline.
    pub fn query(query: impl crate::query::Query + 'static) -> Self {
        Value::Query(std::sync::Arc::new(query))
    }

    /// Wrap any field expression.
    pub fn field(field: impl crate::field::Field + 'static) -> Self {
        Value::Field(std::sync::Arc::new(field))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<Scalar> for Value {
    fn from(v: Scalar) -> Self {
        Value::Scalar(v)
    }
}

impl From<FieldRef> for Value {
    fn from(v: FieldRef) -> Self {
        Value::Field(v)
    }
}

impl From<QueryRef> for Value {
    fn from(v: QueryRef) -> Self {
        Value::Query(v)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => Value::Scalar(v.into()),
            None => Value::Null,
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from($v: $ty) -> Self {
                    $body
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Scalar(Scalar::from(v))
                }
            }
        )*
    };
}

scalar_from! {
    bool => |v| Scalar::Bool(v),
    i8 => |v| Scalar::Int(i64::from(v)),
    i16 => |v| Scalar::Int(i64::from(v)),
    i32 => |v| Scalar::Int(i64::from(v)),
    i64 => |v| Scalar::Int(v),
    u16 => |v| Scalar::Int(i64::from(v)),
    u32 => |v| Scalar::Int(i64::from(v)),
    f32 => |v| Scalar::Float(f64::from(v)),
    f64 => |v| Scalar::Float(v),
    String => |v| Scalar::Text(v),
    &str => |v| Scalar::Text(v.to_owned()),
    &String => |v| Scalar::Text(v.clone()),
    Vec<u8> => |v| Scalar::Bytes(v),
    &[u8] => |v| Scalar::Bytes(v.to_vec()),
    DateTime<Utc> => |v| Scalar::Time(v),
    NaiveDateTime => |v| Scalar::Time(v.and_utc()),
    serde_json::Value => |v| Scalar::Json(v),
    Uuid => |v| Scalar::Uuid(v),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn literal(s: Scalar) -> String {
        let mut out = String::new();
        s.write_literal(&mut out);
        out
    }

    #[test]
    fn literals() {
        assert_eq!(literal(Scalar::Bool(true)), "TRUE");
        assert_eq!(literal(Scalar::Int(-4)), "-4");
        assert_eq!(literal(Scalar::Text("it's".into())), "'it''s'");
        assert_eq!(literal(Scalar::Bytes(vec![0xde, 0xad])), "x'dead'");
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(literal(Scalar::Time(t)), "'2024-01-02T03:04:05+00:00'");
        assert_eq!(
            literal(Scalar::Json(serde_json::json!({"a": 1}))),
            r#"'{"a":1}'"#
        );
    }

    #[test]
    fn option_none_is_null() {
        assert!(Value::from(None::<i64>).is_null());
        assert!(matches!(Value::from(Some(3)), Value::Scalar(Scalar::Int(3))));
    }

    #[test]
    fn slice_collects_scalars() {
        match Value::slice([1, 2, 3]) {
            Value::Slice(items) => assert_eq!(items.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
    }
}
