//! The offline resource cache.
//!
//! A [`Worker`] wraps one [`CacheStrategy`] chosen at build time: [`Passthrough`]
//! in development, [`OfflineCache`] in production. A [`Registration`] drives
//! workers through install and activate and routes fetches to the active one.
//!
//! Fetch dispatch by request class:
//! - navigation: network-first, falling back to the cached root document
//! - asset: stale-while-revalidate (configurable)
//! - other (non-GET): network-only

pub mod event;
pub mod lifecycle;
pub mod offline;
pub mod registration;
pub mod routes;
pub mod strategy;

use std::sync::Arc;

use shelter_core::{AppConfig, CacheDb, DeployMode, Error};

pub use event::{EventKind, ExtendableEvent};
pub use lifecycle::{FetchDispatch, Worker, WorkerState, WorkerStatus};
pub use offline::OfflineCache;
pub use registration::{Registration, RegistrationStatus};
pub use routes::{RequestClass, RouteTable};
pub use strategy::{CacheStrategy, FetchOutcome, Passthrough, ResponseSource};

use crate::fetch::Network;

/// Build the worker for this deployment, selecting its strategy once.
pub fn build(config: &AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Worker, Error> {
    let strategy: Arc<dyn CacheStrategy> = match config.mode {
        DeployMode::Development => {
            tracing::info!("development mode: no caching, no interception");
            Arc::new(Passthrough)
        }
        DeployMode::Production => Arc::new(OfflineCache::new(config, db, network)?),
    };

    Ok(Worker::new(config.version.clone(), config.bucket_name(), strategy))
}
