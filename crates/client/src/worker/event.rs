//! Extendable events: background work a hook must see through.
//!
//! A hook returns as soon as it has an answer, but work it started (storing a
//! copy, revalidating an asset) must still finish. Such work is registered with
//! [`ExtendableEvent::wait_until`] and the host awaits
//! [`ExtendableEvent::settled`] before it treats the event as done.

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use shelter_core::Error;
use tokio::task::JoinHandle;

/// Which lifecycle hook an event was dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Install => write!(f, "install"),
            EventKind::Activate => write!(f, "activate"),
            EventKind::Fetch => write!(f, "fetch"),
        }
    }
}

/// An event whose lifetime can be extended by registered futures.
///
/// Dropping an event without settling it detaches its tasks; they keep
/// running but nobody observes their completion.
pub struct ExtendableEvent {
    kind: EventKind,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl ExtendableEvent {
    pub fn new(kind: EventKind) -> Self {
        Self { kind, pending: Mutex::new(Vec::new()) }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Spawn `future` and keep the event alive until it completes.
    ///
    /// Must be called from within a tokio runtime. The future reports its own
    /// failures; only panics surface through [`settled`](Self::settled).
    pub fn wait_until<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    /// Number of registered futures not yet awaited.
    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Wait for every registered future.
    ///
    /// Returns how many settled, or `TaskFailed` if any of them panicked
    /// (after all of them have been awaited).
    pub async fn settled(self) -> Result<usize, Error> {
        let handles = self.pending.into_inner().unwrap_or_else(PoisonError::into_inner);
        let count = handles.len();
        let mut failure = None;

        for result in futures_util::future::join_all(handles).await {
            if let Err(e) = result {
                tracing::warn!(event = %self.kind, error = %e, "background task failed");
                failure.get_or_insert_with(|| Error::TaskFailed(format!("{} event: {e}", self.kind)));
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(count),
        }
    }
}

impl fmt::Debug for ExtendableEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendableEvent")
            .field("kind", &self.kind)
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_settled_without_work() {
        let event = ExtendableEvent::new(EventKind::Fetch);
        assert_eq!(event.pending(), 0);
        assert_eq!(event.settled().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_settled_waits_for_all_work() {
        let done = Arc::new(AtomicUsize::new(0));
        let event = ExtendableEvent::new(EventKind::Fetch);

        for delay in [30, 10, 20] {
            let done = Arc::clone(&done);
            event.wait_until(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(event.pending(), 3);

        assert_eq!(event.settled().await.unwrap(), 3);
        assert_eq!(done.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_settled_reports_panics() {
        let done = Arc::new(AtomicUsize::new(0));
        let event = ExtendableEvent::new(EventKind::Activate);

        event.wait_until(async { panic!("boom") });
        let counter = Arc::clone(&done);
        event.wait_until(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let err = event.settled().await.unwrap_err();
        assert!(matches!(err, Error::TaskFailed(_)));
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(EventKind::Install.to_string(), "install");
        assert_eq!(ExtendableEvent::new(EventKind::Fetch).kind(), EventKind::Fetch);
    }
}
