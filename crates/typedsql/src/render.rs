//! SQL emission protocol.
//!
//! Every expression renders into a [`SqlWriter`] using `?` placeholders.
//! Dialects that use numbered placeholders are converted once, at the top
//! level, by [`question_to_dollar`]. A doubled marker (`??`) is the escape
//! for a literal question mark and never consumes an argument.

use crate::error::{SqError, SqResult};
use crate::value::{Scalar, Value};
use std::collections::HashMap;
use std::fmt::{self, Write as _};

/// Named parameter name -> argument index.
pub type NamedParams = HashMap<String, usize>;

/// Target SQL variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// `?` placeholders, no dialect-specific clauses.
    #[default]
    Generic,
    Sqlite,
    Postgres,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Generic => "",
            Dialect::Sqlite => "sqlite3",
            Dialect::Postgres => "postgres",
        }
    }

    /// Whether rendered text must be converted to `$n` placeholders.
    pub fn uses_dollar_placeholders(&self) -> bool {
        matches!(self, Dialect::Postgres)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a top-level render call.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub dialect: Dialect,
    pub sql: String,
    pub args: Vec<Scalar>,
    pub params: NamedParams,
}

impl BuiltQuery {
    /// Replace the argument recorded for a named parameter.
    pub fn bind(&mut self, name: &str, value: impl Into<Scalar>) -> SqResult<()> {
        let index = *self
            .params
            .get(name)
            .ok_or_else(|| SqError::build(format!("unknown named parameter {name:?}")))?;
        match self.args.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => Err(SqError::build(format!(
                "named parameter {name:?} points past the argument list"
            ))),
        }
    }

    /// SQL text with every argument inlined as a literal.
    pub fn interpolate(&self) -> SqResult<String> {
        interpolate(self.dialect, &self.sql, &self.args)
    }
}

/// Accumulates SQL text, positional arguments and named-parameter indices.
#[derive(Debug, Default)]
pub struct SqlWriter {
    dialect: Dialect,
    buf: String,
    args: Vec<Scalar>,
    params: NamedParams,
}

impl SqlWriter {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Reuse caller-provided buffers (e.g. from a [`crate::pool::BufferPool`]).
    pub fn from_parts(dialect: Dialect, mut buf: String, mut args: Vec<Scalar>) -> Self {
        buf.clear();
        args.clear();
        Self {
            dialect,
            buf,
            args,
            params: NamedParams::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn sql(&self) -> &str {
        &self.buf
    }

    pub fn args(&self) -> &[Scalar] {
        &self.args
    }

    pub fn push_str(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    pub fn push(&mut self, ch: char) {
        self.buf.push(ch);
    }

    /// Emit one placeholder bound to `value`.
    pub fn bind(&mut self, value: Scalar) {
        self.buf.push('?');
        self.args.push(value);
    }

    /// Emit one placeholder and record its position under `name`.
    pub fn bind_named(&mut self, name: &str, value: Scalar) {
        self.params.insert(name.to_owned(), self.args.len());
        self.bind(value);
    }

    /// Render a single operand.
    pub fn write_value(&mut self, value: &Value, excluded: &[&str]) -> SqResult<()> {
        match value {
            Value::Null => self.push_str("NULL"),
            Value::Scalar(s) => self.bind(s.clone()),
            Value::Field(f) => f.write_sql(self, excluded)?,
            Value::Query(q) => q.write_sql(self)?,
            Value::Slice(items) if items.is_empty() => self.push_str("NULL"),
            Value::Slice(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.push_str(", ");
                    }
                    self.bind(item.clone());
                }
            }
        }
        Ok(())
    }

    /// Expand a format string, consuming one value per `?` marker.
    ///
    /// Markers left over once values run out are written through unchanged.
    pub fn expand(&mut self, format: &str, values: &[Value], excluded: &[&str]) -> SqResult<()> {
        let mut values = values.iter();
        let mut rest = format;
        while let Some(pos) = rest.find('?') {
            self.buf.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            if let Some(stripped) = after.strip_prefix('?') {
                self.buf.push_str("??");
                rest = stripped;
                continue;
            }
            match values.next() {
                Some(value) => self.write_value(value, excluded)?,
                None => self.buf.push('?'),
            }
            rest = after;
        }
        self.buf.push_str(rest);
        Ok(())
    }

    /// Finalize: convert placeholders for the target dialect.
    pub fn finish(self) -> BuiltQuery {
        let sql = if self.dialect.uses_dollar_placeholders() {
            question_to_dollar(&self.buf)
        } else {
            self.buf
        };
        BuiltQuery {
            dialect: self.dialect,
            sql,
            args: self.args,
            params: self.params,
        }
    }

    /// Take the raw buffers back without any dialect conversion.
    pub fn into_parts(self) -> (String, Vec<Scalar>, NamedParams) {
        (self.buf, self.args, self.params)
    }
}

/// Convert `?` placeholders into `$1, $2, ...`; `??` becomes a literal `?`.
pub fn question_to_dollar(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    write_question_to_dollar(sql, &mut out);
    out
}

/// [`question_to_dollar`] appending into a caller-owned buffer.
pub(crate) fn write_question_to_dollar(sql: &str, out: &mut String) {
    let mut n = 0usize;
    let mut chars = sql.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '?' {
            out.push(ch);
            continue;
        }
        if chars.peek() == Some(&'?') {
            chars.next();
            out.push('?');
            continue;
        }
        n += 1;
        let _ = write!(out, "${n}");
    }
}

/// Inline `args` into `?`-style SQL.
pub fn question_interpolate(sql: &str, args: &[Scalar]) -> SqResult<String> {
    let mut out = String::with_capacity(sql.len() + args.len() * 8);
    let mut args_iter = args.iter();
    let mut chars = sql.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '?' {
            out.push(ch);
            continue;
        }
        if chars.peek() == Some(&'?') {
            chars.next();
            out.push('?');
            continue;
        }
        match args_iter.next() {
            Some(arg) => arg.write_literal(&mut out),
            None => {
                return Err(SqError::build(format!(
                    "too few arguments ({}) for placeholders in {sql:?}",
                    args.len()
                )));
            }
        }
    }
    if args_iter.next().is_some() {
        return Err(SqError::build(format!(
            "too many arguments ({}) for placeholders in {sql:?}",
            args.len()
        )));
    }
    Ok(out)
}

/// Inline `args` into `$n`-style SQL.
pub fn dollar_interpolate(sql: &str, args: &[Scalar]) -> SqResult<String> {
    let mut out = String::with_capacity(sql.len() + args.len() * 8);
    let bytes = sql.as_bytes();
    let mut i = 0;
    let mut copied = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end == start {
            i += 1;
            continue;
        }
        let index: usize = sql[start..end]
            .parse()
            .map_err(|_| SqError::build(format!("invalid placeholder in {sql:?}")))?;
        let arg = index
            .checked_sub(1)
            .and_then(|i| args.get(i))
            .ok_or_else(|| {
                SqError::build(format!(
                    "placeholder ${index} has no argument ({} given)",
                    args.len()
                ))
            })?;
        out.push_str(&sql[copied..i]);
        arg.write_literal(&mut out);
        copied = end;
        i = end;
    }
    out.push_str(&sql[copied..]);
    Ok(out)
}

/// Inline `args` using the placeholder style of `dialect`.
pub fn interpolate(dialect: Dialect, sql: &str, args: &[Scalar]) -> SqResult<String> {
    if dialect.uses_dollar_placeholders() {
        dollar_interpolate(sql, args)
    } else {
        question_interpolate(sql, args)
    }
}

/// Count the placeholders in SQL rendered for `dialect`.
pub fn count_placeholders(dialect: Dialect, sql: &str) -> usize {
    if dialect.uses_dollar_placeholders() {
        let bytes = sql.as_bytes();
        bytes
            .iter()
            .enumerate()
            .filter(|(i, b)| {
                **b == b'$' && bytes.get(i + 1).is_some_and(|next| next.is_ascii_digit())
            })
            .count()
    } else {
        let mut count = 0;
        let mut chars = sql.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '?' {
                if chars.peek() == Some(&'?') {
                    chars.next();
                } else {
                    count += 1;
                }
            }
        }
        count
    }
}

/// Eight random lowercase letters, used for anonymous window names.
pub(crate) fn random_name() -> String {
    uuid::Uuid::new_v4().as_bytes()[..8]
        .iter()
        .map(|b| char::from(b'a' + b % 26))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_conversion_skips_escaped_marker() {
        assert_eq!(
            question_to_dollar("SELECT ? WHERE data ?? 'k' AND x = ?"),
            "SELECT $1 WHERE data ? 'k' AND x = $2"
        );
    }

    #[test]
    fn expand_consumes_values_in_order() {
        let mut w = SqlWriter::new(Dialect::Sqlite);
        w.expand(
            "a = ? AND b IN (?) AND c ?? d",
            &[Value::from(1), Value::slice(["x", "y"])],
            &[],
        )
        .unwrap();
        let built = w.finish();
        assert_eq!(built.sql, "a = ? AND b IN (?, ?) AND c ?? d");
        assert_eq!(built.args.len(), 3);
        assert_eq!(count_placeholders(Dialect::Sqlite, &built.sql), 3);
    }

    #[test]
    fn empty_slice_and_null_render_literal() {
        let mut w = SqlWriter::new(Dialect::Sqlite);
        w.expand("? IN (?)", &[Value::Null, Value::Slice(vec![])], &[])
            .unwrap();
        assert_eq!(w.sql(), "NULL IN (NULL)");
        assert!(w.args().is_empty());
    }

    #[test]
    fn interpolation_both_styles() {
        let args = vec![Scalar::Int(7), Scalar::Text("bob".into())];
        assert_eq!(
            question_interpolate("id = ? AND name = ? AND j ?? 'k'", &args).unwrap(),
            "id = 7 AND name = 'bob' AND j ? 'k'"
        );
        assert_eq!(
            dollar_interpolate("id = $1 AND name = $2 AND again = $1", &args).unwrap(),
            "id = 7 AND name = 'bob' AND again = 7"
        );
        assert!(question_interpolate("?", &[]).is_err());
        assert!(dollar_interpolate("$3", &args).is_err());
    }

    #[test]
    fn named_params_can_be_rebound() {
        let mut w = SqlWriter::new(Dialect::Postgres);
        w.push_str("x = ");
        w.bind_named("limit", Scalar::Int(1));
        let mut built = w.finish();
        assert_eq!(built.sql, "x = $1");
        built.bind("limit", 50).unwrap();
        assert_eq!(built.args, vec![Scalar::Int(50)]);
        assert!(built.bind("missing", 1).is_err());
    }

    #[test]
    fn random_names_are_eight_letters() {
        let name = random_name();
        assert_eq!(name.len(), 8);
        assert!(name.chars().all(|c| c.is_ascii_lowercase()));
    }
}
