//! Leading-edge debouncer with explicit cancellation.
//!
//! The first value scheduled in a quiet period is emitted at once. Values
//! scheduled while the window is open replace each other, and the last one is
//! emitted when the window closes, which opens a new window. A window that
//! closes with nothing pending ends the burst.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

struct Inner<T> {
    pending: Option<T>,
    /// Set while a window is open; cancelling it stops the trailing emit.
    timer: Option<CancellationToken>,
}

/// Coalesces rapid values into at most one emit per window.
///
/// Emitted values are delivered on the receiver returned by [`Debouncer::new`].
/// Must be used inside a Tokio runtime.
pub struct Debouncer<T> {
    window: Duration,
    inner: Arc<Mutex<Inner<T>>>,
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer and the receiver its emits arrive on.
    #[must_use]
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            window,
            inner: Arc::new(Mutex::new(Inner {
                pending: None,
                timer: None,
            })),
            tx,
        };
        (debouncer, rx)
    }

    /// Emit `value` now if the debouncer is quiet, otherwise hold it as the
    /// trailing value of the open window.
    pub fn schedule(&self, value: T) {
        let mut inner = lock(&self.inner);

        if inner.timer.is_some() {
            inner.pending = Some(value);
            return;
        }

        emit(&self.tx, value);
        let token = CancellationToken::new();
        inner.timer = Some(token.clone());
        drop(inner);

        tokio::spawn(run_window(
            Arc::clone(&self.inner),
            self.tx.clone(),
            self.window,
            Instant::now() + self.window,
            token,
        ));
    }

    /// Drop the pending value and close the window.
    ///
    /// The next `schedule` emits immediately.
    pub fn cancel(&self) {
        let mut inner = lock(&self.inner);
        inner.pending = None;
        if let Some(token) = inner.timer.take() {
            token.cancel();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(token) = lock(&self.inner).timer.take() {
            token.cancel();
        }
    }
}

async fn run_window<T>(
    inner: Arc<Mutex<Inner<T>>>,
    tx: mpsc::UnboundedSender<T>,
    window: Duration,
    mut deadline: Instant,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            () = token.cancelled() => return,
            () = sleep_until(deadline) => {}
        }

        let mut guard = lock(&inner);
        if token.is_cancelled() {
            return;
        }
        match guard.pending.take() {
            Some(value) => {
                emit(&tx, value);
                deadline = Instant::now() + window;
            }
            None => {
                guard.timer = None;
                return;
            }
        }
    }
}

fn emit<T>(tx: &mpsc::UnboundedSender<T>, value: T) {
    if tx.send(value).is_err() {
        tracing::debug!("Debounced value dropped, receiver is gone");
    }
}

fn lock<T>(inner: &Mutex<Inner<T>>) -> MutexGuard<'_, Inner<T>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(300);

    /// Let the paused clock run forward, driving the window task.
    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_value_fires_immediately() {
        let (debouncer, mut rx) = Debouncer::new(WINDOW);
        debouncer.schedule(1);
        assert_eq!(rx.try_recv().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_to_last_value() {
        let (debouncer, mut rx) = Debouncer::new(WINDOW);
        debouncer.schedule(1);
        debouncer.schedule(2);
        debouncer.schedule(3);
        debouncer.schedule(4);

        assert_eq!(rx.try_recv().unwrap(), 1);
        assert!(rx.try_recv().is_err());

        advance(301).await;
        assert_eq!(rx.try_recv().unwrap(), 4);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_period_reopens_leading_edge() {
        let (debouncer, mut rx) = Debouncer::new(WINDOW);
        debouncer.schedule(1);
        assert_eq!(rx.try_recv().unwrap(), 1);

        advance(301).await;
        assert!(rx.try_recv().is_err());

        debouncer.schedule(2);
        assert_eq!(rx.try_recv().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trailing_emit_opens_new_window() {
        let (debouncer, mut rx) = Debouncer::new(WINDOW);
        debouncer.schedule(1);
        debouncer.schedule(2);
        advance(301).await;
        assert_eq!(rx.try_recv().unwrap(), 1);
        assert_eq!(rx.try_recv().unwrap(), 2);

        debouncer.schedule(3);
        assert!(rx.try_recv().is_err());
        advance(301).await;
        assert_eq!(rx.try_recv().unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_value() {
        let (debouncer, mut rx) = Debouncer::new(WINDOW);
        debouncer.schedule(1);
        debouncer.schedule(2);
        debouncer.cancel();

        advance(1_000).await;
        assert_eq!(rx.try_recv().unwrap(), 1);
        assert!(rx.try_recv().is_err());

        debouncer.schedule(5);
        assert_eq!(rx.try_recv().unwrap(), 5);
    }
}
