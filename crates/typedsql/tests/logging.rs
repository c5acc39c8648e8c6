mod common;

use common::{CaptureLogger, FakeDb, Users};
use std::sync::Arc;
use typedsql::{
    CompositeLogger, Context, Db, DbConfig, ExecFlags, LogFlags, Sqlite, StatsLogger, TableInfo,
    exec, fetch, fetch_context,
};

fn logged_db(rows: i64, flags: LogFlags) -> (Db<FakeDb>, Arc<CaptureLogger>) {
    let logger = Arc::new(CaptureLogger::default());
    let db = Db::new(FakeDb::users(rows))
        .with_logger_arc(logger.clone())
        .with_config(
            DbConfig::new()
                .with_log_flags(flags)
                .with_results_preview_rows(2),
        );
    (db, logger)
}

#[tokio::test]
async fn every_call_is_reported_once() {
    let (db, logger) = logged_db(3, LogFlags::INTERPOLATE);
    let u = Users::aliased("u");
    let q = Sqlite.from(u.clone()).where_(u.user_id.gt_int(0));

    let count = fetch(&db, &q, |row| {
        row.int64(&u.user_id);
        Ok(())
    })
    .await
    .unwrap();
    assert_eq!(count, 3);

    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.row_count, 3);
    assert_eq!(entry.query, "SELECT u.user_id FROM users AS u WHERE u.user_id > ?");
    assert!(
        entry
            .line
            .starts_with("[OK] SELECT u.user_id FROM users AS u WHERE u.user_id > 0 | timeTaken="),
        "{}",
        entry.line
    );
    assert!(entry.line.ends_with("rowCount=3"), "{}", entry.line);
    assert!(entry.preview.is_none());
}

#[tokio::test]
async fn results_preview_is_bounded() {
    let (db, logger) = logged_db(3, LogFlags::RESULTS);
    let u = Users::aliased("u");

    fetch(&db, &Sqlite.from(u.clone()), |row| {
        row.int64(&u.user_id);
        row.string(&u.name);
        Ok(())
    })
    .await
    .unwrap();

    let entry = &logger.entries()[0];
    assert_eq!(
        entry.preview.as_deref(),
        Some(
            "\n----[ Row 1 ]----\nu.user_id: 1\nu.name: 'user1'\
             \n----[ Row 2 ]----\nu.user_id: 2\nu.name: 'user2'\
             \n...\n(1 more rows)"
        )
    );
    assert!(entry.line.contains("----[ Fetched result ]----"));
}

#[tokio::test]
async fn render_failures_log_the_partial_statement() {
    let (db, logger) = logged_db(0, LogFlags::COMPACT);
    let q = Sqlite.update(TableInfo::new("t"));

    exec(&db, &q, ExecFlags::ROWS_AFFECTED).await.unwrap_err();

    let entry = &logger.entries()[0];
    assert!(entry.query.contains("<STOPPED DUE TO ERROR:"), "{}", entry.query);
    assert!(entry.line.starts_with("[FAIL]"));
    assert!(entry.error.as_deref().is_some_and(|e| e.contains("assignment")));
}

#[tokio::test]
async fn exec_lines_report_requested_counts() {
    let logger = Arc::new(CaptureLogger::default());
    let mut fake = FakeDb::default();
    fake.exec_result.rows_affected = 2;
    let db = Db::new(fake)
        .with_logger_arc(logger.clone())
        .with_config(DbConfig::new().with_log_flags(LogFlags::INTERPOLATE));
    let u = Users::new();

    exec(
        &db,
        &Sqlite.delete_from(u.clone()).where_(u.active.clone()),
        ExecFlags::ROWS_AFFECTED,
    )
    .await
    .unwrap();

    let line = &logger.entries()[0].line;
    assert!(line.starts_with("[OK] DELETE FROM users WHERE users.active |"), "{line}");
    assert!(line.ends_with("rowsAffected=2"), "{line}");
}

#[tokio::test]
async fn finished_contexts_skip_logging() {
    let (db, logger) = logged_db(1, LogFlags::COMPACT);
    let u = Users::aliased("u");
    let (ctx, cancel) = Context::background().with_cancel();
    cancel.cancel();

    fetch_context(&ctx, &db, &Sqlite.from(u.clone()), |row| {
        row.int64(&u.user_id);
        Ok(())
    })
    .await
    .unwrap_err();

    assert!(logger.entries().is_empty());
}

#[tokio::test]
async fn stats_logger_aggregates_through_a_composite() {
    let stats = Arc::new(StatsLogger::new());
    let capture = Arc::new(CaptureLogger::default());
    let composite = CompositeLogger::new()
        .add_arc(stats.clone())
        .add_arc(capture.clone());
    let mut fake = FakeDb::users(3);
    fake.exec_result.rows_affected = 5;
    let db = Db::new(fake).with_logger(composite);
    let u = Users::aliased("u");
    let t = Users::new();

    fetch(&db, &Sqlite.from(u.clone()), |row| {
        row.int64(&u.user_id);
        Ok(())
    })
    .await
    .unwrap();
    exec(
        &db,
        &Sqlite.update(t.clone()).set([t.active.set_bool(true)]),
        ExecFlags::ROWS_AFFECTED,
    )
    .await
    .unwrap();

    let snap = stats.snapshot();
    assert_eq!(snap.total_queries, 2);
    assert_eq!(snap.failed_queries, 0);
    assert_eq!(snap.select_count, 1);
    assert_eq!(snap.update_count, 1);
    assert_eq!(snap.rows_fetched, 3);
    assert_eq!(snap.rows_affected, 5);
    assert_eq!(capture.entries().len(), 2);
}
