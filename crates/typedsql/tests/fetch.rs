mod common;

use common::{FakeDb, Users};
use std::time::Duration;
use typedsql::{
    Context, Db, DbConfig, Postgres, Scalar, SqError, Sqlite, fetch, fetch_all, fetch_context,
};

#[derive(Debug, thiserror::Error)]
#[error("row {0} is not valid")]
struct BadRow(i64);

#[tokio::test]
async fn fetch_projects_the_fields_the_mapper_reads() {
    let db = FakeDb::users(3);
    let u = Users::aliased("u");
    let q = Sqlite.from(u.clone()).where_(u.user_id.gt_int(0));

    let mut names = Vec::new();
    let count = fetch(&db, &q, |row| {
        let id = row.int64(&u.user_id);
        let name = row.string(&u.name);
        row.accumulate(|| names.push((id, name)));
        Ok(())
    })
    .await
    .unwrap();

    assert_eq!(count, 3);
    assert_eq!(
        names,
        vec![
            (1, "user1".to_owned()),
            (2, "user2".to_owned()),
            (3, "user3".to_owned()),
        ]
    );
    let seen = db.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].0,
        "SELECT u.user_id, u.name FROM users AS u WHERE u.user_id > ?"
    );
    assert_eq!(seen[0].1, vec![Scalar::Int(0)]);
}

#[tokio::test]
async fn postgres_statements_reach_the_driver_numbered() {
    let db = FakeDb::users(1);
    let u = Users::aliased("u");
    let q = Postgres.from(u.clone()).where_(u.name.eq_string("bob"));

    fetch(&db, &q, |row| {
        row.string(&u.name);
        Ok(())
    })
    .await
    .unwrap();

    assert_eq!(db.last_sql(), "SELECT u.name FROM users AS u WHERE u.name = $1");
}

#[tokio::test]
async fn skip_rows_stops_without_failing() {
    let db = FakeDb::users(10);
    let u = Users::aliased("u");

    let mut seen = 0;
    let count = fetch(&db, &Sqlite.from(u.clone()), |row| {
        row.int64(&u.user_id);
        if row.is_live() {
            seen += 1;
            if seen == 3 {
                return Err(SqError::SkipRows);
            }
        }
        Ok(())
    })
    .await
    .unwrap();

    assert_eq!(count, 3);
}

#[tokio::test]
async fn skip_rows_during_discovery_is_ignored() {
    let db = FakeDb::users(2);
    let u = Users::aliased("u");

    let count = fetch(&db, &Sqlite.from(u.clone()), |row| {
        row.int64(&u.user_id);
        if !row.is_live() {
            return Err(SqError::SkipRows);
        }
        Ok(())
    })
    .await
    .unwrap();

    assert_eq!(count, 2);
}

#[tokio::test]
async fn mapper_errors_report_the_rows_processed() {
    let db = FakeDb::users(5);
    let u = Users::aliased("u");

    let err = fetch(&db, &Sqlite.from(u.clone()), |row| {
        let id = row.int64(&u.user_id);
        if id == 2 {
            return Err(SqError::domain(BadRow(id)));
        }
        Ok(())
    })
    .await
    .unwrap_err();

    assert_eq!(err.row_count, 2);
    assert_eq!(err.error.downcast_domain_ref::<BadRow>().map(|e| e.0), Some(2));
    let err: SqError = err.into();
    assert_eq!(err.to_string(), "row 2 is not valid");
}

#[tokio::test]
async fn mapper_that_reads_nothing_fetches_nothing() {
    let db = FakeDb::users(4);
    let u = Users::aliased("u");

    let count = fetch(&db, &Sqlite.from(u.clone()), |_row| Ok(())).await.unwrap();

    assert_eq!(count, 0);
    assert_eq!(db.last_sql(), "SELECT 1 FROM users AS u");
}

#[tokio::test]
async fn fetch_all_skips_the_discovery_value() {
    let db = FakeDb::users(3);
    let u = Users::aliased("u");

    let ids = fetch_all(&db, &Sqlite.from(u.clone()), |row| Ok(row.int64(&u.user_id)))
        .await
        .unwrap();

    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn nullable_columns_scan_to_none() {
    let db = FakeDb::with_rows(vec![
        vec![Some(Scalar::Int(1)), None],
        vec![Some(Scalar::Int(2)), Some(Scalar::Text("x".into()))],
    ]);
    let u = Users::aliased("u");

    let names = fetch_all(&db, &Sqlite.from(u.clone()), |row| {
        row.int64(&u.user_id);
        Ok(row.nullable_string(&u.name))
    })
    .await
    .unwrap();

    assert_eq!(names, vec![None, Some("x".to_owned())]);
}

#[tokio::test]
async fn scan_mismatch_names_the_column_and_destination() {
    let db = FakeDb::with_rows(vec![vec![
        Some(Scalar::Text("one".into())),
        Some(Scalar::Text("bob".into())),
    ]]);
    let u = Users::aliased("u");
    let q = Sqlite.from(u.clone()).where_(u.name.eq_string("bob"));

    let err = fetch(&db, &q, |row| {
        row.int64(&u.user_id);
        row.string(&u.name);
        Ok(())
    })
    .await
    .unwrap_err();

    assert_eq!(err.row_count, 1);
    match err.error {
        SqError::Scan { details, message } => {
            assert_eq!(details, "0) u.user_id => i64\n1) u.name => String");
            assert!(message.starts_with("column 0: cannot scan string into i64"));
            assert!(message.ends_with(
                "query: SELECT u.user_id, u.name FROM users AS u WHERE u.name = 'bob'"
            ));
        }
        other => panic!("expected a scan error, got {other:?}"),
    }
}

#[tokio::test]
async fn driver_errors_come_back_unchanged() {
    let mut db = FakeDb::users(1);
    db.fail_with = Some("connection reset".into());
    let u = Users::aliased("u");

    let err = fetch(&db, &Sqlite.from(u.clone()), |row| {
        row.int64(&u.user_id);
        Ok(())
    })
    .await
    .unwrap_err();

    assert_eq!(err.row_count, 0);
    assert!(matches!(err.error, SqError::Driver(ref msg) if msg == "connection reset"));
}

#[tokio::test]
async fn query_timeout_interrupts_slow_calls() {
    let db = Db::new(FakeDb::users(1).with_delay(Duration::from_secs(5)))
        .with_config(DbConfig::new().with_query_timeout(Duration::from_millis(20)));
    let u = Users::aliased("u");

    let err = fetch(&db, &Sqlite.from(u.clone()), |row| {
        row.int64(&u.user_id);
        Ok(())
    })
    .await
    .unwrap_err();

    assert!(matches!(err.error, SqError::DeadlineExceeded));
}

#[tokio::test]
async fn cancelled_context_never_reaches_the_driver() {
    let db = FakeDb::users(1);
    let u = Users::aliased("u");
    let (ctx, cancel) = Context::background().with_cancel();
    cancel.cancel();

    let err = fetch_context(&ctx, &db, &Sqlite.from(u.clone()), |row| {
        row.int64(&u.user_id);
        Ok(())
    })
    .await
    .unwrap_err();

    assert!(matches!(err.error, SqError::Cancelled));
    assert!(db.seen().is_empty());
}

#[tokio::test]
async fn concurrent_fetches_share_one_pool() {
    let db = Db::new(FakeDb::users(3));
    let u = Users::aliased("u");
    let q = Sqlite.from(u.clone());

    let (a, b) = tokio::join!(
        fetch_all(&db, &q, |row| Ok(row.int64(&u.user_id))),
        fetch_all(&db, &q, |row| Ok(row.string(&u.name))),
    );

    assert_eq!(a.unwrap(), vec![1, 2, 3]);
    assert_eq!(b.unwrap().len(), 3);
}
