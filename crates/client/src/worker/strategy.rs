//! The capability every worker mode implements.
//!
//! The mode is chosen once when the worker is built; hooks never test a
//! development flag at call time.

use async_trait::async_trait;
use serde::Serialize;
use shelter_core::{DeployMode, Error};

use super::event::ExtendableEvent;
use crate::fetch::{Request, Response};

/// Where a returned response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
}

/// Result of dispatching a fetch to a worker.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Not intercepted; the host performs its default fetch.
    Passthrough,
    /// The worker answered.
    Respond { response: Response, source: ResponseSource },
}

impl FetchOutcome {
    pub fn network(response: Response) -> Self {
        FetchOutcome::Respond { response, source: ResponseSource::Network }
    }

    pub fn cached(response: Response) -> Self {
        FetchOutcome::Respond { response, source: ResponseSource::Cache }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self, FetchOutcome::Passthrough)
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Passthrough => None,
            FetchOutcome::Respond { response, .. } => Some(response),
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            FetchOutcome::Passthrough => None,
            FetchOutcome::Respond { source, .. } => Some(*source),
        }
    }
}

/// Lifecycle hooks of a worker.
///
/// Each hook may hand background work to `event`; the caller settles the
/// event before it considers the hook finished.
#[async_trait]
pub trait CacheStrategy: Send + Sync {
    fn mode(&self) -> DeployMode;

    async fn on_install(&self, event: &ExtendableEvent) -> Result<(), Error>;

    async fn on_activate(&self, event: &ExtendableEvent) -> Result<(), Error>;

    async fn on_fetch(&self, request: Request, event: &ExtendableEvent) -> Result<FetchOutcome, Error>;
}

/// Development mode: no bucket, no interception.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

#[async_trait]
impl CacheStrategy for Passthrough {
    fn mode(&self) -> DeployMode {
        DeployMode::Development
    }

    async fn on_install(&self, _event: &ExtendableEvent) -> Result<(), Error> {
        tracing::info!("development mode: nothing to precache");
        Ok(())
    }

    async fn on_activate(&self, _event: &ExtendableEvent) -> Result<(), Error> {
        Ok(())
    }

    async fn on_fetch(&self, request: Request, _event: &ExtendableEvent) -> Result<FetchOutcome, Error> {
        tracing::trace!(url = %request.url, "passthrough");
        Ok(FetchOutcome::Passthrough)
    }
}
