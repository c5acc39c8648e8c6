//! Table contracts and the explicit table registration macro.

use crate::cte::Cte;
use crate::error::SqResult;
use crate::render::SqlWriter;
use crate::typed::FieldKind;
use std::fmt;
use std::sync::Arc;

/// A relation usable as a FROM or JOIN source.
pub trait Table: Send + Sync + fmt::Debug {
    /// Render the table reference (name, or body for derived tables).
    fn write_sql(&self, w: &mut SqlWriter) -> SqResult<()>;

    fn name(&self) -> &str;

    fn alias(&self) -> &str;

    /// CTE-backed tables expose themselves so statements can collect them.
    fn as_cte(&self) -> Option<&Cte> {
        None
    }

    /// Derived tables (subqueries) are parenthesized in FROM and JOIN.
    fn is_derived(&self) -> bool {
        false
    }
}

/// A table that can be the target of INSERT, UPDATE or DELETE.
pub trait BaseTable: Table {
    fn schema(&self) -> &str;
}

pub type TableRef = Arc<dyn Table>;
pub type BaseTableRef = Arc<dyn BaseTable>;

/// Schema, name and alias of a physical table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    pub alias: String,
}

impl TableInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// The prefix columns of this table render with: alias, else name.
    pub fn qualifier(&self) -> &str {
        if self.alias.is_empty() {
            &self.name
        } else {
            &self.alias
        }
    }
}

impl Table for TableInfo {
    fn write_sql(&self, w: &mut SqlWriter) -> SqResult<()> {
        if !self.schema.is_empty() {
            w.push_str(&self.schema);
            w.push('.');
        }
        w.push_str(&self.name);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn alias(&self) -> &str {
        &self.alias
    }
}

impl BaseTable for TableInfo {
    fn schema(&self) -> &str {
        &self.schema
    }
}

/// Render a FROM/JOIN source: `name [AS alias]` or `(query) AS alias`.
pub(crate) fn write_table_source(w: &mut SqlWriter, table: &dyn Table) -> SqResult<()> {
    if table.is_derived() {
        w.push('(');
        table.write_sql(w)?;
        w.push(')');
    } else {
        table.write_sql(w)?;
    }
    let alias = table.alias();
    if !alias.is_empty() {
        w.push_str(" AS ");
        w.push_str(alias);
    }
    Ok(())
}

/// Column metadata exposed to schema tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: &'static str,
    pub kind: FieldKind,
    pub constraints: &'static [&'static str],
}

/// Declare a table struct with typed fields.
///
/// ```ignore
/// typedsql::define_table! {
///     pub struct Users("users") {
///         pub user_id: NumberField = "user_id" ["PRIMARY KEY"],
///         pub name: StringField = "name" ["NOT NULL"],
///         pub created_at: TimeField = "created_at",
///     }
/// }
///
/// let u = Users::aliased("u");
/// let q = Sqlite.from(u.clone()).select(fields![u.user_id.clone()]);
/// ```
#[macro_export]
macro_rules! define_table {
    (
        $(#[$meta:meta])*
        $vis:vis struct $ty:ident($table:literal) {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $kind:ident = $column:literal
                    $([ $($constraint:literal),* $(,)? ])?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $ty {
            info: $crate::TableInfo,
            $(
                $(#[$fmeta])*
                $fvis $field: $crate::$kind,
            )*
        }

        impl $ty {
            pub const TABLE_NAME: &'static str = $table;

            pub fn new() -> Self {
                Self::from_info($crate::TableInfo::new($table))
            }

            pub fn aliased(alias: &str) -> Self {
                Self::from_info($crate::TableInfo::new($table).with_alias(alias))
            }

            pub fn from_info(info: $crate::TableInfo) -> Self {
                Self {
                    $($field: $crate::$kind::new($column, &info),)*
                    info,
                }
            }

            pub fn info(&self) -> &$crate::TableInfo {
                &self.info
            }

            pub fn columns() -> ::std::vec::Vec<$crate::ColumnMeta> {
                ::std::vec![
                    $(
                        $crate::ColumnMeta {
                            name: $column,
                            kind: $crate::$kind::KIND,
                            constraints: &[$($($constraint),*)?],
                        },
                    )*
                ]
            }
        }

        impl ::std::default::Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl $crate::Table for $ty {
            fn write_sql(&self, w: &mut $crate::SqlWriter) -> $crate::SqResult<()> {
                $crate::Table::write_sql(&self.info, w)
            }

            fn name(&self) -> &str {
                &self.info.name
            }

            fn alias(&self) -> &str {
                &self.info.alias
            }
        }

        impl $crate::BaseTable for $ty {
            fn schema(&self) -> &str {
                &self.info.schema
            }
        }
    };
}
