//! Everything the tools share: configuration, storage, network and the
//! registration that owns the workers.

use std::sync::Arc;

use shelter_client::fetch::{canonicalize, resolve};
use shelter_client::{Network, Registration, Worker, worker};
use shelter_core::{AppConfig, CacheDb, Error};
use url::Url;

pub struct HostState {
    pub config: AppConfig,
    pub db: CacheDb,
    pub network: Arc<dyn Network>,
    pub registration: Registration,
}

impl HostState {
    pub fn new(config: AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Self {
        Self { config, db, network, registration: Registration::new() }
    }

    /// A fresh worker for the configured version.
    pub fn build_worker(&self) -> Result<Arc<Worker>, Error> {
        let worker = worker::build(&self.config, self.db.clone(), Arc::clone(&self.network))?;
        Ok(Arc::new(worker))
    }

    /// Install and, if it asks to skip waiting, activate the configured worker.
    pub async fn register(&self) -> Result<(), Error> {
        let worker = self.build_worker()?;
        self.registration.register(worker).await
    }

    /// Interpret a tool URL argument: root-relative paths resolve against the
    /// configured origin, anything else must be an absolute http(s) URL.
    pub fn resolve_url(&self, input: &str) -> Result<Url, Error> {
        let url = if input.starts_with('/') {
            let origin =
                Url::parse(&self.config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", self.config.origin)))?;
            resolve(&origin, input)
        } else {
            canonicalize(input)
        };
        url.map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    /// Bucket named in a tool argument, defaulting to the configured one.
    pub fn bucket_or_current(&self, bucket: Option<String>) -> String {
        bucket.filter(|b| !b.trim().is_empty()).unwrap_or_else(|| self.config.bucket_name())
    }
}
