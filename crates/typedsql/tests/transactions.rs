//! Compile-only checks for the transaction macros.

#![allow(dead_code)]

mod common;

use common::Users;
use typedsql::{Db, ExecFlags, Postgres, SqResult, exec, fetch_all};

async fn _raw_client_transaction_compiles(client: &mut tokio_postgres::Client) -> SqResult<i64> {
    let u = Users::new();
    typedsql::transaction!(client, tx, {
        exec(&tx, &Postgres.update(u.clone()).set([u.active.set_bool(false)]), ExecFlags::ROWS_AFFECTED)
            .await?;
        let ids = fetch_all(&tx, &Postgres.from(u.clone()), |row| Ok(row.int64(&u.user_id))).await?;
        Ok(ids.len() as i64)
    })
}

async fn _db_transaction_with_savepoints_compiles(db: &mut Db<tokio_postgres::Client>) -> SqResult<()> {
    let u = Users::new();
    typedsql::transaction!(db, tx, {
        exec(&tx, &Postgres.delete_from(u.clone()).where_(u.user_id.eq_int(1)), ExecFlags::empty())
            .await?;
        typedsql::savepoint!(tx, "named", sp, {
            exec(&sp, &Postgres.update(u.clone()).set([u.name.set_string("x")]), ExecFlags::empty())
                .await?;
            Ok(())
        })?;
        typedsql::savepoint!(tx, sp, {
            exec(&sp, &Postgres.delete_from(u.clone()), ExecFlags::empty()).await?;
            Ok(())
        })
    })
}
