//! Human-readable rendering of [`QueryStats`].

use super::truncate_sql_bytes;
use super::types::{ExecFlags, LogFlags, QueryStats};
use crate::render::interpolate;
use colored::{Color, Colorize};
use std::fmt::Write as _;

fn paint(out: &mut String, text: &str, color: Color, enabled: bool) {
    if enabled {
        let _ = write!(out, "{}", text.color(color));
    } else {
        out.push_str(text);
    }
}

fn write_args(out: &mut String, stats: &QueryStats<'_>) {
    out.push('[');
    for (i, arg) in stats.args.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{arg}");
    }
    out.push(']');
}

fn write_interpolated(out: &mut String, stats: &QueryStats<'_>, max_sql_length: Option<usize>) {
    match interpolate(stats.dialect, stats.query, stats.args) {
        Ok(sql) => push_truncated(out, &sql, max_sql_length),
        Err(err) => {
            push_truncated(out, stats.query, max_sql_length);
            let _ = write!(out, " <interpolation failed: {err}>");
        }
    }
}

fn push_truncated(out: &mut String, sql: &str, max_sql_length: Option<usize>) {
    match max_sql_length {
        Some(max) if sql.len() > max => {
            out.push_str(truncate_sql_bytes(sql, max));
            out.push_str("...");
        }
        _ => out.push_str(sql),
    }
}

/// Format `stats` as a log line (or block, with [`LogFlags::MULTILINE`]).
///
/// ```text
/// [OK] SELECT u.name FROM users AS u WHERE u.id = 1 | timeTaken=1.2ms rowCount=1 caller=src/main.rs:42
/// ```
pub fn format_stats(stats: &QueryStats<'_>) -> String {
    format_stats_truncated(stats, None)
}

pub(crate) fn format_stats_truncated(stats: &QueryStats<'_>, max_sql_length: Option<usize>) -> String {
    let flags = stats.log_flags;
    let color = flags.contains(LogFlags::COLOR);
    let mut out = String::with_capacity(stats.query.len() + 64);

    match stats.error {
        None => paint(&mut out, "[OK]", Color::Green, color),
        Some(_) => paint(&mut out, "[FAIL]", Color::Red, color),
    }
    if !flags.contains(LogFlags::MULTILINE) {
        out.push(' ');
        if flags.contains(LogFlags::INTERPOLATE) {
            write_interpolated(&mut out, stats, max_sql_length);
        } else {
            push_truncated(&mut out, stats.query, max_sql_length);
            out.push(' ');
            write_args(&mut out, stats);
        }
        out.push_str(" |");
    }

    paint(&mut out, " timeTaken", Color::Blue, color);
    let _ = write!(out, "={:?}", stats.time_taken);
    match stats.exec_flags {
        None => {
            paint(&mut out, " rowCount", Color::Blue, color);
            let _ = write!(out, "={}", stats.row_count);
        }
        Some(exec) => {
            if exec.contains(ExecFlags::ROWS_AFFECTED) {
                paint(&mut out, " rowsAffected", Color::Blue, color);
                let _ = write!(out, "={}", stats.rows_affected);
            }
            if exec.contains(ExecFlags::LAST_INSERT_ID) {
                paint(&mut out, " lastInsertID", Color::Blue, color);
                let _ = write!(out, "={}", stats.last_insert_id.unwrap_or_default());
            }
        }
    }
    if flags.contains(LogFlags::CALLER)
        && let Some(caller) = stats.caller
    {
        paint(&mut out, " caller", Color::Blue, color);
        let _ = write!(out, "={}:{}", caller.file(), caller.line());
    }
    if let Some(err) = stats.error {
        paint(&mut out, " error", Color::Red, color);
        let _ = write!(out, "={err}");
    }

    if flags.contains(LogFlags::MULTILINE) {
        out.push('\n');
        paint(&mut out, "----[ Executing query ]----", Color::Magenta, color);
        out.push('\n');
        push_truncated(&mut out, stats.query, max_sql_length);
        out.push(' ');
        write_args(&mut out, stats);
        out.push('\n');
        paint(&mut out, "----[ with bind values ]----", Color::Magenta, color);
        out.push('\n');
        write_interpolated(&mut out, stats, max_sql_length);
    }
    if flags.contains(LogFlags::RESULTS)
        && let Some(preview) = stats.results_preview.filter(|p| !p.is_empty())
    {
        out.push('\n');
        paint(&mut out, "----[ Fetched result ]----", Color::Magenta, color);
        out.push_str(preview);
    }
    out
}
