//! Field contract and the untyped field kinds.

use crate::error::SqResult;
use crate::render::SqlWriter;
use crate::value::{Scalar, Value};
use std::fmt;
use std::sync::Arc;

/// A column or computed scalar expression.
pub trait Field: Send + Sync + fmt::Debug {
    /// Render into `w`, omitting any table qualifier listed in `excluded`.
    fn write_sql(&self, w: &mut SqlWriter, excluded: &[&str]) -> SqResult<()>;

    /// Column name without the table qualifier.
    fn name(&self) -> &str;

    /// Alias (empty when unset).
    fn alias(&self) -> &str;
}

/// Shared handle to any field.
pub type FieldRef = Arc<dyn Field>;

impl<F: Field + ?Sized> Field for Arc<F> {
    fn write_sql(&self, w: &mut SqlWriter, excluded: &[&str]) -> SqResult<()> {
        (**self).write_sql(w, excluded)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn alias(&self) -> &str {
        (**self).alias()
    }
}

/// Conversion into a [`FieldRef`].
pub trait IntoField {
    fn into_field(self) -> FieldRef;
}

impl<F: Field + 'static> IntoField for F {
    fn into_field(self) -> FieldRef {
        Arc::new(self)
    }
}

/// Build a `Vec<FieldRef>` from heterogeneous field expressions.
///
/// ```ignore
/// let q = Sqlite.select(fields![u.user_id.clone(), u.name.clone()]);
/// ```
#[macro_export]
macro_rules! fields {
    ($($field:expr),* $(,)?) => {
        ::std::vec![$($crate::IntoField::into_field($field)),*] as ::std::vec::Vec<$crate::FieldRef>
    };
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// Placement of NULLs in ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

/// Qualifier, name, alias and ordering modifiers shared by column fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldBase {
    pub qualifier: String,
    pub name: String,
    pub alias: String,
    pub order: Option<Order>,
    pub nulls: Option<NullsOrder>,
}

impl FieldBase {
    pub fn new(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// `qualifier.name`, dropping the qualifier when it is excluded.
    pub fn write_name(&self, w: &mut SqlWriter, excluded: &[&str]) {
        if !self.qualifier.is_empty() && !excluded.contains(&self.qualifier.as_str()) {
            w.push_str(&self.qualifier);
            w.push('.');
        }
        w.push_str(&self.name);
    }

    pub fn write_modifiers(&self, w: &mut SqlWriter) {
        match self.order {
            Some(Order::Asc) => w.push_str(" ASC"),
            Some(Order::Desc) => w.push_str(" DESC"),
            None => {}
        }
        match self.nulls {
            Some(NullsOrder::First) => w.push_str(" NULLS FIRST"),
            Some(NullsOrder::Last) => w.push_str(" NULLS LAST"),
            None => {}
        }
    }
}

/// A field defined by a format string and ordered values, or a bare column
/// reference when built with [`CustomField::column`].
#[derive(Debug, Clone, Default)]
pub struct CustomField {
    base: FieldBase,
    format: String,
    values: Vec<Value>,
}

impl CustomField {
    pub fn new(format: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            format: format.into(),
            values,
            ..Self::default()
        }
    }

    /// Untyped column reference, e.g. a CTE or subquery column.
    pub fn column(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            base: FieldBase::new(qualifier, name),
            ..Self::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.base.alias = alias.into();
        self
    }

    pub fn asc(mut self) -> Self {
        self.base.order = Some(Order::Asc);
        self
    }

    pub fn desc(mut self) -> Self {
        self.base.order = Some(Order::Desc);
        self
    }

    pub fn nulls_first(mut self) -> Self {
        self.base.nulls = Some(NullsOrder::First);
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.base.nulls = Some(NullsOrder::Last);
        self
    }

    /// A zero-value field renders `:blank:` so that it is visible in the SQL.
    pub fn is_blank(&self) -> bool {
        self.format.is_empty() && self.values.is_empty() && self.base.name.is_empty()
    }
}

impl Field for CustomField {
    fn write_sql(&self, w: &mut SqlWriter, excluded: &[&str]) -> SqResult<()> {
        if self.is_blank() {
            w.push_str(":blank:");
            return Ok(());
        }
        if self.format.is_empty() && self.values.is_empty() {
            self.base.write_name(w, excluded);
        } else {
            w.expand(&self.format, &self.values, excluded)?;
        }
        self.base.write_modifiers(w);
        Ok(())
    }

    fn name(&self) -> &str {
        if self.base.name.is_empty() {
            &self.format
        } else {
            &self.base.name
        }
    }

    fn alias(&self) -> &str {
        &self.base.alias
    }
}

/// Shorthand for [`CustomField::new`].
pub fn fieldf(format: impl Into<String>, values: Vec<Value>) -> CustomField {
    CustomField::new(format, values)
}

/// Raw SQL text used as a field, e.g. `COUNT(*)` or `1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLiteral(pub String);

impl Field for FieldLiteral {
    fn write_sql(&self, w: &mut SqlWriter, _excluded: &[&str]) -> SqResult<()> {
        w.push_str(&self.0);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.0
    }

    fn alias(&self) -> &str {
        ""
    }
}

pub fn literal(text: impl Into<String>) -> FieldLiteral {
    FieldLiteral(text.into())
}

/// A bound argument that is also recorded by name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedParam {
    name: String,
    value: Scalar,
}

impl Field for NamedParam {
    fn write_sql(&self, w: &mut SqlWriter, _excluded: &[&str]) -> SqResult<()> {
        w.bind_named(&self.name, self.value.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn alias(&self) -> &str {
        ""
    }
}

pub fn param(name: impl Into<String>, value: impl Into<Scalar>) -> NamedParam {
    NamedParam {
        name: name.into(),
        value: value.into(),
    }
}

macro_rules! value_from_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for $crate::value::Value {
                fn from(f: $ty) -> Self {
                    $crate::value::Value::Field(::std::sync::Arc::new(f))
                }
            }

            impl From<&$ty> for $crate::value::Value {
                fn from(f: &$ty) -> Self {
                    $crate::value::Value::Field(::std::sync::Arc::new(f.clone()))
                }
            }
        )*
    };
}
pub(crate) use value_from_field;

value_from_field!(CustomField, FieldLiteral, NamedParam);

/// Render `a, b, c`.
pub fn write_fields(w: &mut SqlWriter, fields: &[FieldRef], excluded: &[&str]) -> SqResult<()> {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            w.push_str(", ");
        }
        field.write_sql(w, excluded)?;
    }
    Ok(())
}

/// Render a projection list: `a AS x, b, c AS y`.
pub fn write_fields_with_alias(
    w: &mut SqlWriter,
    fields: &[FieldRef],
    excluded: &[&str],
) -> SqResult<()> {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            w.push_str(", ");
        }
        field.write_sql(w, excluded)?;
        let alias = field.alias();
        if !alias.is_empty() {
            w.push_str(" AS ");
            w.push_str(alias);
        }
    }
    Ok(())
}
