//! Worker lifecycle state machine.
//!
//! `uninstalled → installing → installed → activating → active → superseded`.
//! A failed install drops back to `uninstalled` so the host can retry; a failed
//! activation drops back to `installed`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use shelter_core::{DeployMode, Error};

use super::event::{EventKind, ExtendableEvent};
use super::strategy::{CacheStrategy, FetchOutcome};
use crate::fetch::Request;

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle states of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Uninstalled,
    Installing,
    Installed,
    Activating,
    Active,
    /// Replaced by a newer worker; no longer intercepts.
    Superseded,
}

impl WorkerState {
    pub fn can_intercept_fetch(self) -> bool {
        matches!(self, WorkerState::Active)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Uninstalled => write!(f, "uninstalled"),
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Active => write!(f, "active"),
            WorkerState::Superseded => write!(f, "superseded"),
        }
    }
}

#[derive(Debug)]
struct Lifecycle {
    state: WorkerState,
    skip_waiting: bool,
    clients_claimed: bool,
}

/// Snapshot of a worker for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub id: u64,
    pub version: String,
    pub bucket: String,
    pub mode: DeployMode,
    pub state: WorkerState,
    pub skip_waiting: bool,
    pub clients_claimed: bool,
}

/// A dispatched fetch: the answer plus the event still carrying its
/// background work. The host must settle the event.
#[derive(Debug)]
pub struct FetchDispatch {
    pub outcome: FetchOutcome,
    pub event: ExtendableEvent,
}

impl FetchDispatch {
    pub fn passthrough() -> Self {
        Self { outcome: FetchOutcome::Passthrough, event: ExtendableEvent::new(EventKind::Fetch) }
    }
}

/// One deployed version of the cache, with its lifecycle.
pub struct Worker {
    id: u64,
    version: String,
    bucket: String,
    strategy: Arc<dyn CacheStrategy>,
    lifecycle: Mutex<Lifecycle>,
}

impl Worker {
    pub fn new(version: impl Into<String>, bucket: impl Into<String>, strategy: Arc<dyn CacheStrategy>) -> Self {
        Self {
            id: NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed),
            version: version.into(),
            bucket: bucket.into(),
            strategy,
            lifecycle: Mutex::new(Lifecycle {
                state: WorkerState::Uninstalled,
                skip_waiting: false,
                clients_claimed: false,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn mode(&self) -> DeployMode {
        self.strategy.mode()
    }

    pub fn state(&self) -> WorkerState {
        self.lock().state
    }

    /// Whether install asked to activate without waiting for older workers.
    pub fn skip_waiting_requested(&self) -> bool {
        self.lock().skip_waiting
    }

    pub fn clients_claimed(&self) -> bool {
        self.lock().clients_claimed
    }

    pub fn status(&self) -> WorkerStatus {
        let lifecycle = self.lock();
        WorkerStatus {
            id: self.id,
            version: self.version.clone(),
            bucket: self.bucket.clone(),
            mode: self.mode(),
            state: lifecycle.state,
            skip_waiting: lifecycle.skip_waiting,
            clients_claimed: lifecycle.clients_claimed,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, from: WorkerState, to: WorkerState) -> Result<(), Error> {
        let mut lifecycle = self.lock();
        if lifecycle.state != from {
            return Err(Error::InvalidState(format!(
                "worker {} is {}, expected {} before {}",
                self.id, lifecycle.state, from, to
            )));
        }
        lifecycle.state = to;
        Ok(())
    }

    /// Run the install hook and wait for everything it registered.
    ///
    /// On success the worker is `installed` and requests skip-waiting; on
    /// failure it is `uninstalled` again and may be retried.
    pub async fn install(&self) -> Result<(), Error> {
        self.transition(WorkerState::Uninstalled, WorkerState::Installing)?;
        tracing::info!(worker = self.id, version = %self.version, mode = %self.mode(), "installing");

        let event = ExtendableEvent::new(EventKind::Install);
        let result = settle(self.strategy.on_install(&event).await, event).await;

        let mut lifecycle = self.lock();
        match result {
            Ok(()) => {
                lifecycle.state = WorkerState::Installed;
                lifecycle.skip_waiting = true;
                tracing::info!(worker = self.id, bucket = %self.bucket, "installed");
                Ok(())
            }
            Err(e) => {
                lifecycle.state = WorkerState::Uninstalled;
                tracing::warn!(worker = self.id, error = %e, "install failed");
                Err(e)
            }
        }
    }

    /// Run the activate hook, then claim clients.
    ///
    /// Clients are only claimed after the hook's work (stale bucket purge) has
    /// fully settled.
    pub async fn activate(&self) -> Result<(), Error> {
        self.transition(WorkerState::Installed, WorkerState::Activating)?;

        let event = ExtendableEvent::new(EventKind::Activate);
        let result = settle(self.strategy.on_activate(&event).await, event).await;

        let mut lifecycle = self.lock();
        match result {
            Ok(()) => {
                lifecycle.clients_claimed = true;
                lifecycle.state = WorkerState::Active;
                tracing::info!(worker = self.id, bucket = %self.bucket, "activated; clients claimed");
                Ok(())
            }
            Err(e) => {
                lifecycle.state = WorkerState::Installed;
                tracing::warn!(worker = self.id, error = %e, "activation failed");
                Err(e)
            }
        }
    }

    /// Dispatch a fetch. Only an `active` worker intercepts.
    pub async fn fetch(&self, request: Request) -> Result<FetchDispatch, Error> {
        let state = self.state();
        if !state.can_intercept_fetch() {
            return Err(Error::InvalidState(format!("worker {} is {state}, cannot intercept fetch", self.id)));
        }

        let event = ExtendableEvent::new(EventKind::Fetch);
        let outcome = self.strategy.on_fetch(request, &event).await?;
        Ok(FetchDispatch { outcome, event })
    }

    /// Mark this worker as replaced by a newer one.
    pub fn supersede(&self) {
        let mut lifecycle = self.lock();
        if lifecycle.state != WorkerState::Superseded {
            tracing::info!(worker = self.id, version = %self.version, from = %lifecycle.state, "superseded");
            lifecycle.state = WorkerState::Superseded;
        }
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("bucket", &self.bucket)
            .field("state", &self.state())
            .finish()
    }
}

/// Settle `event` regardless of the hook's result; the hook's error wins.
async fn settle(result: Result<(), Error>, event: ExtendableEvent) -> Result<(), Error> {
    let settled = event.settled().await;
    result?;
    settled.map(|_| ())
}
