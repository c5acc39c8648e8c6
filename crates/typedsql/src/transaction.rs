//! Transaction helpers.
//!
//! Both macros work with a raw `tokio_postgres::Client` / `Transaction` and
//! with a [`crate::Db`] wrapping one; with a `Db`, statements run inside the
//! transaction are logged through the same logger.
//!
//! # Example
//!
//! ```ignore
//! use typedsql::{Db, ExecFlags, Postgres, SqResult, exec};
//!
//! # async fn demo(mut db: Db<tokio_postgres::Client>, a: Accounts) -> SqResult<()> {
//! typedsql::transaction!(db, tx, {
//!     exec(&tx, &Postgres.update(a.clone()).set([a.balance.set_int(0)]), ExecFlags::empty()).await?;
//!     typedsql::savepoint!(tx, sp, {
//!         exec(&sp, &Postgres.delete_from(a.clone()), ExecFlags::empty()).await?;
//!         Ok(())
//!     })
//! })?;
//! # Ok(()) }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

static SAVEPOINT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Runs the given block inside a database transaction.
///
/// - Begins a transaction via `$client.transaction().await`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`; a failed rollback is reported alongside the
///   original error.
///
/// The block must evaluate to `typedsql::SqResult<T>`.
#[macro_export]
macro_rules! transaction {
    ($client:expr, $tx:ident, $body:block) => {{
        #[allow(unused_mut)]
        let mut $tx = ($client)
            .transaction()
            .await
            .map_err($crate::SqError::from)?;

        let __typedsql_tx_result: $crate::SqResult<_> = async { $body }.await;
        match __typedsql_tx_result {
            Ok(value) => {
                $tx.commit().await.map_err($crate::SqError::from)?;
                Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::SqError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}

/// Runs the given block inside a savepoint of an open transaction.
///
/// Releases the savepoint on `Ok(_)` and rolls back to it on `Err(_)`,
/// leaving the outer transaction usable either way. Without a name, a unique
/// one is generated.
#[macro_export]
macro_rules! savepoint {
    ($tx:expr, $name:expr, $sp:ident, $body:block) => {{
        #[allow(unused_mut)]
        let mut $sp = ($tx).savepoint($name).await.map_err($crate::SqError::from)?;

        let __typedsql_sp_result: $crate::SqResult<_> = async { $body }.await;
        match __typedsql_sp_result {
            Ok(value) => {
                $sp.commit().await.map_err($crate::SqError::from)?;
                Ok(value)
            }
            Err(error) => match $sp.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::SqError::Other(format!(
                    "{error} (savepoint rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
    ($tx:expr, $sp:ident, $body:block) => {{
        let __typedsql_sp_name = $crate::__next_savepoint_name();
        $crate::savepoint!($tx, &__typedsql_sp_name, $sp, $body)
    }};
}

#[doc(hidden)]
pub fn __next_savepoint_name() -> String {
    let n = SAVEPOINT_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("typedsql_sp_{n}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn savepoint_names_are_unique() {
        let a = __next_savepoint_name();
        let b = __next_savepoint_name();
        assert_ne!(a, b);
        assert!(a.starts_with("typedsql_sp_"));
    }
}
