use crate::context::Context;
use crate::error::SqError;
use crate::render::{Dialect, NamedParams};
use crate::value::Scalar;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::panic::Location;
use std::time::Duration;

/// The type of SQL statement that was executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    /// DDL, raw SQL and anything else
    Other,
}

impl QueryType {
    /// Detect the statement type from rendered SQL.
    ///
    /// For CTEs (`WITH ...`) the keyword after the last top-level
    /// parenthesized definition decides.
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = strip_sql_prefix(sql);
        if starts_with_keyword(trimmed, "SELECT") {
            QueryType::Select
        } else if starts_with_keyword(trimmed, "INSERT") {
            QueryType::Insert
        } else if starts_with_keyword(trimmed, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(trimmed, "DELETE") {
            QueryType::Delete
        } else if starts_with_keyword(trimmed, "WITH") {
            Self::detect_cte_dml(trimmed)
        } else {
            QueryType::Other
        }
    }

    fn detect_cte_dml(sql: &str) -> Self {
        let mut depth: i32 = 0;
        let mut last_top_level = 0;
        let bytes = sql.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        last_top_level = i + 1;
                    }
                }
                b'\'' => {
                    i += 1;
                    while i < bytes.len() {
                        if bytes[i] == b'\'' {
                            if bytes.get(i + 1) == Some(&b'\'') {
                                i += 1;
                            } else {
                                break;
                            }
                        }
                        i += 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }

        let remainder = sql[last_top_level..].trim_start();
        if starts_with_keyword(remainder, "INSERT") {
            QueryType::Insert
        } else if starts_with_keyword(remainder, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(remainder, "DELETE") {
            QueryType::Delete
        } else {
            QueryType::Select
        }
    }
}

/// Skip whitespace, comments and leading parentheses.
fn strip_sql_prefix(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let before = s;
        s = s.trim_start();
        if s.starts_with("--") {
            match s.find('\n') {
                Some(pos) => {
                    s = &s[pos + 1..];
                    continue;
                }
                None => return "",
            }
        }
        if s.starts_with("/*") {
            match s.find("*/") {
                Some(pos) => {
                    s = &s[pos + 2..];
                    continue;
                }
                None => return "",
            }
        }
        if let Some(rest) = s.strip_prefix('(') {
            s = rest;
            continue;
        }
        if s == before {
            break;
        }
    }
    s
}

fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    match s.get(0..keyword.len()) {
        Some(prefix) => prefix.eq_ignore_ascii_case(keyword),
        None => false,
    }
}

macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        pub struct $ty:ident {
            $($(#[$fdoc:meta])* const $flag:ident = $bits:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $ty(u8);

        impl $ty {
            $($(#[$fdoc])* pub const $flag: Self = Self($bits);)*

            pub const fn empty() -> Self {
                Self(0)
            }

            pub const fn bits(self) -> u8 {
                self.0
            }

            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl BitOr for $ty {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $ty {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let names: Vec<&str> = [$((stringify!($flag), Self::$flag)),*]
                    .into_iter()
                    .filter(|(_, flag)| flag.0.count_ones() == 1 && self.contains(*flag))
                    .map(|(name, _)| name)
                    .collect();
                write!(f, "{}({})", stringify!($ty), names.join(" | "))
            }
        }
    };
}

flag_set! {
    /// Verbosity of formatted query logs.
    pub struct LogFlags {
        /// Inline the arguments into the logged SQL.
        const INTERPOLATE = 0b1;
        /// Show the query before and after interpolation on separate lines.
        const MULTILINE = 0b10;
        /// Show the calling file and line.
        const CALLER = 0b100;
        /// Show a preview of the fetched rows.
        const RESULTS = 0b1000;
        /// Colorize the output.
        const COLOR = 0b1_0000;
        const VERBOSE = 0b1_1110;
        const COMPACT = 0b1_0101;
    }
}

flag_set! {
    /// Extra results requested from an exec call.
    pub struct ExecFlags {
        const LAST_INSERT_ID = 0b1;
        const ROWS_AFFECTED = 0b10;
    }
}

/// Everything known about one executed statement.
#[derive(Debug, Clone, Copy)]
pub struct QueryStats<'a> {
    pub dialect: Dialect,
    /// SQL as sent to the driver (`$n` placeholders for Postgres).
    pub query: &'a str,
    pub args: &'a [Scalar],
    pub params: &'a NamedParams,
    pub error: Option<&'a SqError>,
    pub caller: Option<&'static Location<'static>>,
    pub row_count: u64,
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
    pub results_preview: Option<&'a str>,
    /// `None` for fetch and exists calls.
    pub exec_flags: Option<ExecFlags>,
    pub log_flags: LogFlags,
    pub time_taken: Duration,
}

impl QueryStats<'_> {
    pub fn query_type(&self) -> QueryType {
        QueryType::from_sql(self.query)
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Receives structured stats after every fetch, exec or exists call.
pub trait QueryLogger: Send + Sync {
    fn log_query_stats(&self, ctx: &Context, stats: &QueryStats<'_>);
}
