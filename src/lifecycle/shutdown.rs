//! Shutdown coordination for the service.
//!
//! Order of operations, each step waiting for the previous one:
//! 1. termination signal (or an external cancellation of the shared token)
//! 2. close the confirmation queue
//! 3. wait for background loops to drain it and exit, bounded by a deadline
//! 4. cancel the shared token, which stops the HTTP server

use std::future::Future;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::confirmation::ConfirmationQueue;
use crate::lifecycle::signals::TerminationSignal;
use crate::observability::metrics;

/// What started the shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    Signal(TerminationSignal),
    /// The shared token was cancelled by someone else, e.g. a failed server.
    Cancelled,
}

/// Summary of a completed shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub trigger: ShutdownTrigger,
    /// Every background loop exited before the deadline.
    pub drained: bool,
    /// Queued users not yet handed to the worker when the drain ended.
    pub remaining_items: usize,
    /// Background loops still running when the drain ended.
    pub running_tasks: usize,
    pub elapsed: Duration,
}

/// Coordinator for graceful shutdown.
///
/// Consumed by [`run`](Self::run), so a process shuts down at most once.
pub struct ShutdownCoordinator {
    queue: ConfirmationQueue,
    background: TaskTracker,
    cancel: CancellationToken,
    drain_timeout: Option<Duration>,
}

impl ShutdownCoordinator {
    /// Create a coordinator.
    ///
    /// `background` tracks the loops that must finish before cancellation;
    /// `drain_timeout` of `None` waits for them without bound.
    pub fn new(
        queue: ConfirmationQueue,
        background: TaskTracker,
        cancel: CancellationToken,
        drain_timeout: Option<Duration>,
    ) -> Self {
        Self {
            queue,
            background,
            cancel,
            drain_timeout,
        }
    }

    /// Wait for `signal`, then shut down in order.
    pub async fn run<F>(self, signal: F) -> ShutdownReport
    where
        F: Future<Output = TerminationSignal>,
    {
        let trigger = tokio::select! {
            signal = signal => {
                tracing::info!(signal = %signal, "Termination signal received");
                ShutdownTrigger::Signal(signal)
            }
            _ = self.cancel.cancelled() => {
                tracing::warn!("Cancelled before any termination signal");
                ShutdownTrigger::Cancelled
            }
        };

        self.queue.close();
        tracing::info!(
            pending = self.queue.pending(),
            "Confirmation queue closed, waiting for background tasks"
        );

        let started = Instant::now();
        self.background.close();
        let drained = match self.drain_timeout {
            Some(limit) => tokio::time::timeout(limit, self.background.wait())
                .await
                .is_ok(),
            None => {
                self.background.wait().await;
                true
            }
        };
        let elapsed = started.elapsed();
        let remaining_items = self.queue.pending();
        let running_tasks = self.background.len();

        if drained {
            tracing::info!(elapsed = ?elapsed, "Background tasks finished");
        } else {
            tracing::warn!(
                remaining_items,
                running_tasks,
                timeout = ?self.drain_timeout,
                "Drain deadline expired, cancelling with work outstanding"
            );
        }
        metrics::record_shutdown_drain(elapsed, !drained);

        self.cancel.cancel();

        ShutdownReport {
            trigger,
            drained,
            remaining_items,
            running_tasks,
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirmation::queue;
    use crate::confirmation::{User, UserId, UserState};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::oneshot;

    fn user(id: u64) -> User {
        User {
            id: UserId(id),
            email: format!("u{}@example.com", id),
            password_hash: String::new(),
            state: UserState::New,
        }
    }

    fn signal_from(rx: oneshot::Receiver<()>) -> impl Future<Output = TerminationSignal> {
        async move {
            let _ = rx.await;
            TerminationSignal::Terminate
        }
    }

    #[tokio::test]
    async fn test_cancels_only_after_background_drains() {
        let (queue, mut receiver) = queue::channel(4);
        for id in 1..=3 {
            queue.enqueue(user(id)).await.unwrap();
        }

        let background = TaskTracker::new();
        let cancel = CancellationToken::new();
        let drained = Arc::new(AtomicUsize::new(0));

        let seen = drained.clone();
        let token = cancel.clone();
        background.spawn(async move {
            while receiver.recv().await.is_some() {
                assert!(!token.is_cancelled(), "cancelled while draining");
                tokio::time::sleep(Duration::from_millis(20)).await;
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        let (tx, rx) = oneshot::channel();
        let coordinator =
            ShutdownCoordinator::new(queue.clone(), background, cancel.clone(), None);
        let handle = tokio::spawn(coordinator.run(signal_from(rx)));

        tx.send(()).unwrap();
        let report = handle.await.unwrap();

        assert_eq!(report.trigger, ShutdownTrigger::Signal(TerminationSignal::Terminate));
        assert!(report.drained);
        assert_eq!(report.remaining_items, 0);
        assert_eq!(drained.load(Ordering::SeqCst), 3);
        assert!(cancel.is_cancelled());
        assert!(queue.enqueue(user(4)).await.is_err());
    }

    #[tokio::test]
    async fn test_drain_deadline_cancels_anyway() {
        let (queue, _receiver) = queue::channel(1);
        let background = TaskTracker::new();
        let cancel = CancellationToken::new();

        // A loop stuck on an item.
        background.spawn(std::future::pending::<()>());

        let coordinator = ShutdownCoordinator::new(
            queue,
            background,
            cancel.clone(),
            Some(Duration::from_millis(50)),
        );
        let report = coordinator
            .run(async { TerminationSignal::Interrupt })
            .await;

        assert!(!report.drained);
        assert_eq!(report.running_tasks, 1);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_repeated_signals_cancel_once_after_drain() {
        let (queue, _receiver) = queue::channel(1);
        let background = TaskTracker::new();
        let cancel = CancellationToken::new();

        let (release_tx, release_rx) = oneshot::channel::<()>();
        background.spawn(async move {
            let _ = release_rx.await;
        });

        let cancellations = Arc::new(AtomicUsize::new(0));
        let observer = {
            let token = cancel.clone();
            let cancellations = cancellations.clone();
            tokio::spawn(async move {
                token.cancelled().await;
                cancellations.fetch_add(1, Ordering::SeqCst);
            })
        };

        let (signal_tx, mut signal_rx) = tokio::sync::mpsc::channel(4);
        let signal = async move {
            signal_rx
                .recv()
                .await
                .unwrap_or(TerminationSignal::Interrupt)
        };
        let coordinator =
            ShutdownCoordinator::new(queue.clone(), background, cancel.clone(), None);
        let handle = tokio::spawn(coordinator.run(signal));

        signal_tx.send(TerminationSignal::Interrupt).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(queue.is_closed());

        // A second signal mid-drain does not cut the drain short.
        signal_tx.send(TerminationSignal::Terminate).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!cancel.is_cancelled());
        assert!(!handle.is_finished());

        release_tx.send(()).unwrap();
        let report = handle.await.unwrap();
        assert_eq!(report.trigger, ShutdownTrigger::Signal(TerminationSignal::Interrupt));
        assert!(report.drained);

        observer.await.unwrap();
        assert_eq!(cancellations.load(Ordering::SeqCst), 1);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_external_cancellation_triggers_shutdown() {
        let (queue, _receiver) = queue::channel(1);
        let cancel = CancellationToken::new();
        let coordinator =
            ShutdownCoordinator::new(queue.clone(), TaskTracker::new(), cancel.clone(), None);

        cancel.cancel();
        let report = coordinator
            .run(std::future::pending::<TerminationSignal>())
            .await;

        assert_eq!(report.trigger, ShutdownTrigger::Cancelled);
        assert!(queue.is_closed());
    }
}
