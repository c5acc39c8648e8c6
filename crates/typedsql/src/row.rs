//! Row view handed to fetch mappers.
//!
//! A mapper runs once against a discovery row, where every getter records the
//! field it was asked for and returns a default, and then once per fetched
//! row, where the getters read the columns in the same order. The recorded
//! fields become the statement's projection, so the mapper must call the
//! same getters in the same order on every invocation.
//!
//! ```ignore
//! let mut users = Vec::new();
//! fetch(&db, &Sqlite.from(u.clone()), |row| {
//!     let user = User {
//!         id: row.int64(&u.user_id),
//!         name: row.string(&u.name),
//!         email: row.nullable_string(&u.email),
//!     };
//!     row.accumulate(|| users.push(user));
//!     Ok(())
//! })
//! .await?;
//! ```

use crate::client::DbRow;
use crate::field::{Field, FieldRef};
use crate::value::Scalar;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// A field requested by the mapper and the Rust type it scans into.
pub(crate) type Requested = (FieldRef, &'static str);

#[derive(Debug)]
enum State<'r> {
    Discover(Vec<Requested>),
    Live {
        row: &'r DbRow,
        index: usize,
        failures: Vec<String>,
    },
}

/// The mapper's view of one result row.
#[derive(Debug)]
pub struct Row<'r> {
    state: State<'r>,
}

impl<'r> Row<'r> {
    pub(crate) fn discover() -> Self {
        Self {
            state: State::Discover(Vec::new()),
        }
    }

    pub(crate) fn live(row: &'r DbRow) -> Self {
        Self {
            state: State::Live {
                row,
                index: 0,
                failures: Vec::new(),
            },
        }
    }

    /// Fields requested during discovery, in call order.
    pub(crate) fn into_requested(self) -> Vec<Requested> {
        match self.state {
            State::Discover(fields) => fields,
            State::Live { .. } => Vec::new(),
        }
    }

    /// Conversion failures recorded while reading a live row.
    pub(crate) fn into_failures(self) -> Vec<String> {
        match self.state {
            State::Live { failures, .. } => failures,
            State::Discover(_) => Vec::new(),
        }
    }

    /// Whether this row carries fetched data (false during discovery).
    pub fn is_live(&self) -> bool {
        matches!(self.state, State::Live { .. })
    }

    /// Run `f` for fetched rows only.
    ///
    /// Use it to push the mapped value into a collection owned by the caller
    /// without also pushing the placeholder produced during discovery.
    pub fn accumulate(&self, f: impl FnOnce()) {
        if self.is_live() {
            f();
        }
    }

    fn read<F, T>(
        &mut self,
        field: &F,
        type_name: &'static str,
        convert: fn(&Scalar) -> Result<T, String>,
    ) -> Option<T>
    where
        F: Field + Clone + 'static,
    {
        match &mut self.state {
            State::Discover(fields) => {
                fields.push((Arc::new(field.clone()), type_name));
                None
            }
            State::Live {
                row,
                index,
                failures,
            } => {
                let i = *index;
                *index += 1;
                match row.values().get(i) {
                    None => {
                        failures.push(format!(
                            "column {i} requested but the row has {} columns",
                            row.len()
                        ));
                        None
                    }
                    Some(None) => None,
                    Some(Some(value)) => match convert(value) {
                        Ok(v) => Some(v),
                        Err(msg) => {
                            failures.push(format!("column {i}: {msg}"));
                            None
                        }
                    },
                }
            }
        }
    }

    pub fn nullable_bool<F: Field + Clone + 'static>(&mut self, field: &F) -> Option<bool> {
        self.read(field, "bool", to_bool)
    }

    pub fn nullable_int64<F: Field + Clone + 'static>(&mut self, field: &F) -> Option<i64> {
        self.read(field, "i64", to_int)
    }

    pub fn nullable_float64<F: Field + Clone + 'static>(&mut self, field: &F) -> Option<f64> {
        self.read(field, "f64", to_float)
    }

    pub fn nullable_string<F: Field + Clone + 'static>(&mut self, field: &F) -> Option<String> {
        self.read(field, "String", to_string)
    }

    pub fn nullable_bytes<F: Field + Clone + 'static>(&mut self, field: &F) -> Option<Vec<u8>> {
        self.read(field, "Vec<u8>", to_bytes)
    }

    pub fn nullable_time<F: Field + Clone + 'static>(
        &mut self,
        field: &F,
    ) -> Option<DateTime<Utc>> {
        self.read(field, "DateTime<Utc>", to_time)
    }

    pub fn nullable_json<F: Field + Clone + 'static>(
        &mut self,
        field: &F,
    ) -> Option<serde_json::Value> {
        self.read(field, "serde_json::Value", to_json)
    }

    pub fn nullable_uuid<F: Field + Clone + 'static>(&mut self, field: &F) -> Option<Uuid> {
        self.read(field, "Uuid", to_uuid)
    }

    /// The raw scalar, whatever its type.
    pub fn scalar<F: Field + Clone + 'static>(&mut self, field: &F) -> Option<Scalar> {
        self.read(field, "Scalar", |v| Ok(v.clone()))
    }

    /// `false` for NULL.
    pub fn bool<F: Field + Clone + 'static>(&mut self, field: &F) -> bool {
        self.nullable_bool(field).unwrap_or_default()
    }

    /// `0` for NULL.
    pub fn int64<F: Field + Clone + 'static>(&mut self, field: &F) -> i64 {
        self.nullable_int64(field).unwrap_or_default()
    }

    pub fn float64<F: Field + Clone + 'static>(&mut self, field: &F) -> f64 {
        self.nullable_float64(field).unwrap_or_default()
    }

    /// Empty for NULL.
    pub fn string<F: Field + Clone + 'static>(&mut self, field: &F) -> String {
        self.nullable_string(field).unwrap_or_default()
    }

    pub fn bytes<F: Field + Clone + 'static>(&mut self, field: &F) -> Vec<u8> {
        self.nullable_bytes(field).unwrap_or_default()
    }

    /// The Unix epoch for NULL.
    pub fn time<F: Field + Clone + 'static>(&mut self, field: &F) -> DateTime<Utc> {
        self.nullable_time(field).unwrap_or_default()
    }

    /// `Value::Null` for NULL.
    pub fn json<F: Field + Clone + 'static>(&mut self, field: &F) -> serde_json::Value {
        self.nullable_json(field).unwrap_or_default()
    }

    /// The nil UUID for NULL.
    pub fn uuid<F: Field + Clone + 'static>(&mut self, field: &F) -> Uuid {
        self.nullable_uuid(field).unwrap_or_default()
    }
}

fn mismatch<T>(want: &str, got: &Scalar) -> Result<T, String> {
    Err(format!("cannot scan {} into {want}", got.type_name()))
}

fn to_bool(v: &Scalar) -> Result<bool, String> {
    match v {
        Scalar::Bool(b) => Ok(*b),
        // SQLite stores booleans as integers.
        Scalar::Int(i) => Ok(*i != 0),
        other => mismatch("bool", other),
    }
}

fn to_int(v: &Scalar) -> Result<i64, String> {
    match v {
        Scalar::Int(i) => Ok(*i),
        Scalar::Bool(b) => Ok(i64::from(*b)),
        other => mismatch("i64", other),
    }
}

fn to_float(v: &Scalar) -> Result<f64, String> {
    match v {
        Scalar::Float(f) => Ok(*f),
        Scalar::Int(i) => Ok(*i as f64),
        other => mismatch("f64", other),
    }
}

fn to_string(v: &Scalar) -> Result<String, String> {
    match v {
        Scalar::Text(s) => Ok(s.clone()),
        Scalar::Uuid(u) => Ok(u.to_string()),
        Scalar::Bytes(b) => String::from_utf8(b.clone()).map_err(|e| e.to_string()),
        other => mismatch("String", other),
    }
}

fn to_bytes(v: &Scalar) -> Result<Vec<u8>, String> {
    match v {
        Scalar::Bytes(b) => Ok(b.clone()),
        Scalar::Text(s) => Ok(s.clone().into_bytes()),
        other => mismatch("Vec<u8>", other),
    }
}

fn to_time(v: &Scalar) -> Result<DateTime<Utc>, String> {
    match v {
        Scalar::Time(t) => Ok(*t),
        Scalar::Text(s) => parse_time(s),
        Scalar::Int(secs) => {
            DateTime::from_timestamp(*secs, 0).ok_or_else(|| format!("timestamp {secs} out of range"))
        }
        other => mismatch("DateTime<Utc>", other),
    }
}

/// RFC 3339, or the `YYYY-MM-DD HH:MM:SS[.f]` form SQLite's date functions produce.
fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map(|t| t.and_utc())
        .map_err(|e| format!("cannot parse {s:?} as a timestamp: {e}"))
}

fn to_json(v: &Scalar) -> Result<serde_json::Value, String> {
    match v {
        Scalar::Json(j) => Ok(j.clone()),
        Scalar::Text(s) => serde_json::from_str(s).map_err(|e| e.to_string()),
        Scalar::Bytes(b) => serde_json::from_slice(b).map_err(|e| e.to_string()),
        other => mismatch("serde_json::Value", other),
    }
}

fn to_uuid(v: &Scalar) -> Result<Uuid, String> {
    match v {
        Scalar::Uuid(u) => Ok(*u),
        Scalar::Text(s) => Uuid::parse_str(s).map_err(|e| e.to_string()),
        Scalar::Bytes(b) => Uuid::from_slice(b).map_err(|e| e.to_string()),
        other => mismatch("Uuid", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableInfo;
    use crate::typed::{NumberField, StringField, TimeField};

    #[test]
    fn discovery_records_fields_in_order() {
        let t = TableInfo::new("users");
        let id = NumberField::new("id", &t);
        let name = StringField::new("name", &t);
        let mut row = Row::discover();
        assert_eq!(row.int64(&id), 0);
        assert_eq!(row.string(&name), "");
        let mut ran = false;
        row.accumulate(|| ran = true);
        assert!(!ran);

        let requested = row.into_requested();
        let names: Vec<(&str, &str)> = requested.iter().map(|(f, ty)| (f.name(), *ty)).collect();
        assert_eq!(names, vec![("id", "i64"), ("name", "String")]);
    }

    #[test]
    fn live_rows_read_by_position() {
        let t = TableInfo::new("users");
        let id = NumberField::new("id", &t);
        let name = StringField::new("name", &t);
        let at = TimeField::new("created_at", &t);
        let data = DbRow::new(
            vec!["id".into(), "name".into(), "created_at".into()],
            vec![
                Some(Scalar::Int(7)),
                None,
                Some(Scalar::Text("2024-03-01 12:30:00".into())),
            ],
        );
        let mut row = Row::live(&data);
        assert_eq!(row.int64(&id), 7);
        assert_eq!(row.nullable_string(&name), None);
        assert_eq!(row.time(&at).to_rfc3339(), "2024-03-01T12:30:00+00:00");
        let mut ran = false;
        row.accumulate(|| ran = true);
        assert!(ran);
        assert!(row.into_failures().is_empty());
    }

    #[test]
    fn mismatches_and_missing_columns_are_recorded() {
        let t = TableInfo::new("users");
        let id = NumberField::new("id", &t);
        let data = DbRow::new(vec!["id".into()], vec![Some(Scalar::Text("x".into()))]);
        let mut row = Row::live(&data);
        assert_eq!(row.int64(&id), 0);
        assert_eq!(row.int64(&id), 0);
        let failures = row.into_failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0], "column 0: cannot scan string into i64");
        assert!(failures[1].starts_with("column 1 requested"));
    }

    #[test]
    fn lenient_conversions() {
        let t = TableInfo::new("t");
        let f = NumberField::new("f", &t);
        let data = DbRow::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                Some(Scalar::Int(1)),
                Some(Scalar::Int(3)),
                Some(Scalar::Text("{\"k\":1}".into())),
            ],
        );
        let mut row = Row::live(&data);
        assert!(row.bool(&f));
        assert_eq!(row.float64(&f), 3.0);
        assert_eq!(row.json(&f)["k"], 1);
    }
}
