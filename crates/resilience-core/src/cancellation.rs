//! Cooperative cancellation signal threaded through every suspension point
//! in the engine: `op()` invocations, retry backoff sleeps, and parallel
//! strategy races.

use tokio::sync::watch;

/// A handle that can be cloned and handed to many concurrent tasks; calling
/// [`CancellationSource::cancel`] wakes every waiter created from the
/// matching [`CancellationToken`].
#[derive(Clone)]
pub struct CancellationToken {
    rx: watch::Receiver<bool>,
}

/// The owning side of a [`CancellationToken`].
pub struct CancellationSource {
    tx: watch::Sender<bool>,
}

impl CancellationSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// A token that can never be cancelled, for call sites that don't need
    /// one (e.g. a bare `Execute` with no caller-supplied signal).
    pub fn never() -> Self {
        CancellationSource::new().token()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the token is cancelled. Safe to race inside
    /// `tokio::select!` against `op()` or a backoff sleep.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        loop {
            if rx.changed().await.is_err() {
                // Source dropped without cancelling: never resolves.
                std::future::pending::<()>().await;
            }
            if *rx.borrow() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_wakes_waiters() {
        let source = CancellationSource::new();
        let token = source.token();
        assert!(!token.is_cancelled());

        let waiter = tokio::spawn(async move {
            token.cancelled().await;
        });

        source.cancel();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn never_cancelled_token_does_not_resolve_immediately() {
        let token = CancellationToken::never();
        assert!(!token.is_cancelled());
        let resolved = tokio::time::timeout(std::time::Duration::from_millis(20), token.cancelled())
            .await
            .is_ok();
        assert!(!resolved);
    }

    #[tokio::test]
    async fn already_cancelled_resolves_immediately() {
        let source = CancellationSource::new();
        source.cancel();
        let token = source.token();
        tokio::time::timeout(std::time::Duration::from_millis(20), token.cancelled())
            .await
            .expect("should resolve immediately");
    }
}
