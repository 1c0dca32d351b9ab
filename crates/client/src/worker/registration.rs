//! The host side of the lifecycle contract: which worker is waiting, which is
//! active, and where fetches go.

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use shelter_core::Error;

use super::lifecycle::{FetchDispatch, Worker, WorkerStatus};
use crate::fetch::Request;

/// Waiting and active workers for one scope.
#[derive(Debug, Default)]
pub struct Registration {
    waiting: RwLock<Option<Arc<Worker>>>,
    active: RwLock<Option<Arc<Worker>>>,
}

/// Snapshot of a registration.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationStatus {
    pub waiting: Option<WorkerStatus>,
    pub active: Option<WorkerStatus>,
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<Arc<Worker>> {
        self.active.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn waiting(&self) -> Option<Arc<Worker>> {
        self.waiting.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Install `worker`; on success it becomes the waiting worker.
    ///
    /// A worker that was already waiting is superseded.
    pub async fn install(&self, worker: Arc<Worker>) -> Result<(), Error> {
        worker.install().await?;

        let previous = self
            .waiting
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(worker);
        if let Some(previous) = previous {
            previous.supersede();
        }
        Ok(())
    }

    /// Activate the waiting worker and supersede the previously active one.
    pub async fn activate(&self) -> Result<Arc<Worker>, Error> {
        let worker = self
            .waiting
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| Error::InvalidState("no installed worker is waiting".into()))?;

        if let Err(e) = worker.activate().await {
            let mut waiting = self.waiting.write().unwrap_or_else(PoisonError::into_inner);
            if waiting.is_none() {
                *waiting = Some(worker);
            }
            return Err(e);
        }

        let previous = self
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(&worker));
        if let Some(previous) = previous {
            previous.supersede();
        }
        Ok(worker)
    }

    /// Install, then activate straight away if the worker asked to skip waiting.
    pub async fn register(&self, worker: Arc<Worker>) -> Result<(), Error> {
        self.install(Arc::clone(&worker)).await?;
        if worker.skip_waiting_requested() {
            self.activate().await?;
        }
        Ok(())
    }

    /// Route a fetch to the active worker; without one nothing is intercepted.
    pub async fn dispatch_fetch(&self, request: Request) -> Result<FetchDispatch, Error> {
        match self.active() {
            Some(worker) => worker.fetch(request).await,
            None => Ok(FetchDispatch::passthrough()),
        }
    }

    pub fn status(&self) -> RegistrationStatus {
        RegistrationStatus {
            waiting: self.waiting().map(|w| w.status()),
            active: self.active().map(|w| w.status()),
        }
    }
}
