//! Cancellation and deadlines for database calls.
//!
//! A [`Context`] carries an optional deadline and a cancellation signal.
//! Derived contexts inherit both from their parent: cancelling a parent
//! cancels every context derived from it, and a child deadline never
//! outlives the parent's.
//!
//! ```ignore
//! let (ctx, cancel) = Context::background().with_cancel();
//! let ctx = ctx.with_timeout(Duration::from_secs(2));
//! let n = fetch_context(&ctx, &db, &q, mapper).await?;
//! cancel.cancel();
//! ```

use crate::error::{SqError, SqResult};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
    children: Mutex<Vec<Weak<CancelState>>>,
}

impl CancelState {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.notify.notify_waiters();
        let children =
            std::mem::take(&mut *self.children.lock().unwrap_or_else(PoisonError::into_inner));
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }

    fn child(self: &Arc<Self>) -> Arc<Self> {
        let child = Arc::new(CancelState::default());
        if self.is_cancelled() {
            child.cancelled.store(true, Ordering::Release);
            return child;
        }
        let mut children = self.children.lock().unwrap_or_else(PoisonError::into_inner);
        children.retain(|weak| weak.strong_count() > 0);
        children.push(Arc::downgrade(&child));
        drop(children);
        // The parent may have been cancelled between the check and the push.
        if self.is_cancelled() {
            child.cancel();
        }
        child
    }

    async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Deadline and cancellation scope for one or more database calls.
#[derive(Debug, Clone)]
pub struct Context {
    deadline: Option<Instant>,
    state: Arc<CancelState>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            deadline: None,
            state: Arc::new(CancelState::default()),
        }
    }

    /// Derive a context that expires after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context that expires at `deadline` (or the parent's, if earlier).
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Self {
            deadline: Some(deadline),
            state: self.state.child(),
        }
    }

    /// Derive a cancellable context.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let state = self.state.child();
        let handle = CancelHandle {
            state: Arc::clone(&state),
        };
        (
            Self {
                deadline: self.deadline,
                state,
            },
            handle,
        )
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why the context is done, if it is.
    pub fn err(&self) -> Option<SqError> {
        if self.state.is_cancelled() {
            Some(SqError::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(SqError::DeadlineExceeded)
        } else {
            None
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Drive `fut` until it completes, the context is cancelled, or the
    /// deadline passes, whichever happens first.
    pub async fn run<T, F>(&self, fut: F) -> SqResult<T>
    where
        F: Future<Output = SqResult<T>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.state.cancelled() => Err(SqError::Cancelled),
            _ = expired => Err(SqError::DeadlineExceeded),
            result = fut => result,
        }
    }
}

/// Cancels the context returned alongside it by [`Context::with_cancel`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.state.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_returns_the_future_output() {
        let ctx = Context::background();
        let v = ctx.run(async { Ok::<_, SqError>(7) }).await.unwrap();
        assert_eq!(v, 7);
        assert!(!ctx.is_done());
    }

    #[tokio::test]
    async fn deadline_interrupts_slow_calls() {
        let ctx = Context::background().with_timeout(Duration::from_millis(20));
        let err = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, SqError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SqError::DeadlineExceeded));
        assert!(ctx.is_done());
    }

    #[tokio::test]
    async fn cancelling_a_parent_cancels_children() {
        let (parent, cancel) = Context::background().with_cancel();
        let child = parent.with_timeout(Duration::from_secs(60));
        let (grandchild, _) = child.with_cancel();

        let pending = grandchild.run(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, SqError>(())
        });
        cancel.cancel();
        assert!(matches!(pending.await, Err(SqError::Cancelled)));
        assert!(child.err().is_some_and(|e| e.is_cancelled()));
    }

    #[test]
    fn child_deadline_never_exceeds_parent() {
        let parent = Context::background().with_timeout(Duration::from_millis(10));
        let child = parent.with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[tokio::test]
    async fn derived_from_cancelled_is_cancelled() {
        let (ctx, cancel) = Context::background().with_cancel();
        cancel.cancel();
        let (late, _) = ctx.with_cancel();
        assert!(matches!(late.err(), Some(SqError::Cancelled)));
    }
}
