//! Bounded FIFO queue of users awaiting confirmation.
//!
//! # Responsibilities
//! - Hand user snapshots from signup to the single confirmation worker
//! - Apply back-pressure when full
//! - Reject new work once closed, while letting the worker drain what is buffered
//!
//! # Design Decisions
//! - Closing drops the queue's sender; the receiver reports `None` only when
//!   closed *and* empty
//! - A shared counter tracks accepted-but-undelivered items for shutdown reporting

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::confirmation::types::User;
use crate::observability::metrics;

/// Returned by [`ConfirmationQueue::enqueue`] once the queue has been closed.
///
/// Hands the rejected user back to the caller.
#[derive(Debug, Error)]
#[error("confirmation queue is closed")]
pub struct QueueClosed(pub User);

struct Shared {
    sender: Mutex<Option<mpsc::Sender<User>>>,
    pending: AtomicUsize,
    capacity: usize,
}

/// Producer side of the queue. Cheap to clone.
#[derive(Clone)]
pub struct ConfirmationQueue {
    shared: Arc<Shared>,
}

/// Consumer side of the queue, owned by the confirmation worker.
pub struct QueueReceiver {
    rx: mpsc::Receiver<User>,
    shared: Arc<Shared>,
}

/// Create a queue holding at most `capacity` users.
///
/// # Panics
/// Panics if `capacity` is zero; configuration validation rejects that value.
pub fn channel(capacity: usize) -> (ConfirmationQueue, QueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let shared = Arc::new(Shared {
        sender: Mutex::new(Some(tx)),
        pending: AtomicUsize::new(0),
        capacity,
    });
    (
        ConfirmationQueue {
            shared: shared.clone(),
        },
        QueueReceiver { rx, shared },
    )
}

impl ConfirmationQueue {
    /// Enqueue a user snapshot, waiting for space if the queue is full.
    pub async fn enqueue(&self, user: User) -> Result<(), QueueClosed> {
        let sender = match self.current_sender() {
            Some(sender) => sender,
            None => {
                metrics::record_enqueue_rejected();
                return Err(QueueClosed(user));
            }
        };

        // Reserve first so a caller dropping this future leaves no trace.
        let permit = match sender.reserve().await {
            Ok(permit) => permit,
            Err(_) => {
                metrics::record_enqueue_rejected();
                return Err(QueueClosed(user));
            }
        };
        {
            // close() takes the same lock, so a waiter that got its permit
            // after close cannot slip an item in.
            let open = self
                .shared
                .sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if open.is_none() {
                drop(permit);
                metrics::record_enqueue_rejected();
                return Err(QueueClosed(user));
            }
            self.shared.pending.fetch_add(1, Ordering::SeqCst);
            permit.send(user);
        }
        metrics::record_queue_depth(self.pending());
        Ok(())
    }

    /// Stop accepting work. Returns `true` for the call that actually closed it.
    pub fn close(&self) -> bool {
        let mut sender = self
            .shared
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        sender.take().is_some()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.current_sender().is_none()
    }

    /// Accepted items not yet handed to the worker.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    fn current_sender(&self) -> Option<mpsc::Sender<User>> {
        self.shared
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl QueueReceiver {
    /// Next user in FIFO order, or `None` once the queue is closed and drained.
    pub async fn recv(&mut self) -> Option<User> {
        let user = self.rx.recv().await?;
        self.shared.pending.fetch_sub(1, Ordering::SeqCst);
        metrics::record_queue_depth(self.shared.pending.load(Ordering::SeqCst));
        Some(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirmation::types::{UserId, UserState};
    use std::time::Duration;

    fn user(id: u64) -> User {
        User {
            id: UserId(id),
            email: format!("user{}@example.com", id),
            password_hash: String::new(),
            state: UserState::New,
        }
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let (queue, mut rx) = channel(4);
        for id in 1..=3 {
            queue.enqueue(user(id)).await.unwrap();
        }
        assert_eq!(queue.pending(), 3);

        for id in 1..=3 {
            assert_eq!(rx.recv().await.unwrap().id, UserId(id));
        }
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_enqueue_after_close_is_rejected() {
        let (queue, _rx) = channel(1);
        assert!(queue.close());
        assert!(!queue.close(), "second close is a no-op");
        assert!(queue.is_closed());

        let err = queue.enqueue(user(9)).await.unwrap_err();
        assert_eq!(err.0.id, UserId(9));
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_buffered_items_survive_close() {
        let (queue, mut rx) = channel(3);
        queue.enqueue(user(1)).await.unwrap();
        queue.enqueue(user(2)).await.unwrap();
        queue.close();

        assert_eq!(rx.recv().await.unwrap().id, UserId(1));
        assert_eq!(rx.recv().await.unwrap().id, UserId(2));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_full_queue_applies_backpressure() {
        let (queue, mut rx) = channel(1);
        queue.enqueue(user(1)).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), queue.enqueue(user(2))).await;
        assert!(blocked.is_err(), "second enqueue should wait for space");
        assert_eq!(queue.pending(), 1);

        rx.recv().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), queue.enqueue(user(3)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().id, UserId(3));
    }

    #[tokio::test]
    async fn test_close_rejects_producer_waiting_for_space() {
        let (queue, mut rx) = channel(1);
        queue.enqueue(user(1)).await.unwrap();

        let waiting = tokio::spawn({
            let queue = queue.clone();
            async move { queue.enqueue(user(2)).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiting.is_finished(), "enqueue should wait for space");

        assert!(queue.close());
        assert_eq!(rx.recv().await.unwrap().id, UserId(1));

        let rejected = tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .unwrap()
            .unwrap()
            .unwrap_err();
        assert_eq!(rejected.0.id, UserId(2));
        assert!(rx.recv().await.is_none());
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_depth_gauge_tracks_pending_count() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = ::metrics::set_default_local_recorder(&recorder);

        let (queue, mut rx) = channel(2);
        queue.enqueue(user(1)).await.unwrap();
        queue.enqueue(user(2)).await.unwrap();
        assert!(handle.render().contains("confirmation_queue_depth 2"));

        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        assert!(handle.render().contains("confirmation_queue_depth 0"));
    }

    #[tokio::test]
    async fn test_dropped_receiver_rejects() {
        let (queue, rx) = channel(1);
        drop(rx);
        assert!(queue.enqueue(user(1)).await.is_err());
        assert_eq!(queue.pending(), 0);
    }
}
