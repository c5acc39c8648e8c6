//! Window specifications for OVER and WINDOW clauses.

use crate::error::SqResult;
use crate::field::{Field, FieldRef, write_fields};
use crate::render::{SqlWriter, random_name};

/// `(PARTITION BY ... ORDER BY ... frame)`, or a bare name once named.
#[derive(Debug, Clone, Default)]
pub struct Window {
    name: String,
    partition_by: Vec<FieldRef>,
    order_by: Vec<FieldRef>,
    frame: String,
}

impl Window {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition_by(mut self, fields: impl IntoIterator<Item = FieldRef>) -> Self {
        self.partition_by = fields.into_iter().collect();
        self
    }

    pub fn order_by(mut self, fields: impl IntoIterator<Item = FieldRef>) -> Self {
        self.order_by = fields.into_iter().collect();
        self
    }

    /// Frame clause text, e.g. `ROWS BETWEEN 1 PRECEDING AND CURRENT ROW`.
    pub fn frame(mut self, frame: impl Into<String>) -> Self {
        self.frame = frame.into();
        self
    }

    /// Name the window so it can be declared once and referenced by name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Give an unnamed window a random eight-letter name.
    pub fn anonymous(mut self) -> Self {
        if self.name.is_empty() {
            self.name = random_name();
        }
        self
    }

    pub fn window_name(&self) -> &str {
        &self.name
    }

    fn write_definition(&self, w: &mut SqlWriter) -> SqResult<()> {
        let mut parts = 0;
        w.push('(');
        if !self.partition_by.is_empty() {
            w.push_str("PARTITION BY ");
            write_fields(w, &self.partition_by, &[])?;
            parts += 1;
        }
        if !self.order_by.is_empty() {
            if parts > 0 {
                w.push(' ');
            }
            w.push_str("ORDER BY ");
            write_fields(w, &self.order_by, &[])?;
            parts += 1;
        }
        if !self.frame.is_empty() {
            if parts > 0 {
                w.push(' ');
            }
            w.push_str(&self.frame);
        }
        w.push(')');
        Ok(())
    }
}

impl Field for Window {
    fn write_sql(&self, w: &mut SqlWriter, _excluded: &[&str]) -> SqResult<()> {
        if self.name.is_empty() {
            self.write_definition(w)
        } else {
            w.push_str(&self.name);
            Ok(())
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn alias(&self) -> &str {
        ""
    }
}

crate::field::value_from_field!(Window);

/// Render ` WINDOW w1 AS (...), w2 AS (...)`.
///
/// Unnamed windows render inline wherever they are used, so they are left
/// out of the clause.
pub(crate) fn write_windows(w: &mut SqlWriter, windows: &[Window]) -> SqResult<()> {
    let mut named = windows.iter().filter(|window| !window.name.is_empty()).peekable();
    if named.peek().is_none() {
        return Ok(());
    }
    w.push_str(" WINDOW ");
    for (i, window) in named.enumerate() {
        if i > 0 {
            w.push_str(", ");
        }
        w.push_str(&window.name);
        w.push_str(" AS ");
        window.write_definition(w)?;
    }
    Ok(())
}
