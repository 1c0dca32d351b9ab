//! Production mode: one versioned bucket, precached at install, purged of
//! older versions at activation, consulted on every fetch.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use shelter_core::{AppConfig, CacheDb, DeployMode, Error, FetchStrategy};
use url::Url;

use super::event::ExtendableEvent;
use super::routes::{RequestClass, RouteTable};
use super::strategy::{CacheStrategy, FetchOutcome};
use crate::fetch::{Network, Request, Response, request_key, resolve};

/// Offline resource cache for one origin's static assets.
pub struct OfflineCache {
    db: CacheDb,
    network: Arc<dyn Network>,
    bucket: String,
    manifest: Vec<Url>,
    fallback: Url,
    routes: RouteTable,
}

impl OfflineCache {
    /// Build from configuration, resolving the manifest against the origin.
    ///
    /// Duplicate manifest paths are fetched once.
    pub fn new(config: &AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;

        let mut manifest: Vec<Url> = Vec::with_capacity(config.precache.len());
        for path in &config.precache {
            let url = resolve(&origin, path).map_err(|e| Error::InvalidUrl(e.to_string()))?;
            if !manifest.contains(&url) {
                manifest.push(url);
            }
        }

        let fallback = resolve(&origin, &config.fallback_document).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        Ok(Self {
            db,
            network,
            bucket: config.bucket_name(),
            manifest,
            fallback,
            routes: RouteTable::from_config(config),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn manifest(&self) -> &[Url] {
        &self.manifest
    }

    /// Stored response for `key` in the current bucket.
    ///
    /// Read failures are treated as a miss so the network can still answer.
    async fn lookup(&self, key: &str) -> Option<Response> {
        match self.db.match_entry(&self.bucket, key).await {
            Ok(Some(entry)) => match Response::from_entry(entry) {
                Ok(response) => Some(response),
                Err(e) => {
                    tracing::warn!(key, error = %e, "discarding unreadable entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, bucket = %self.bucket, error = %e, "bucket read failed");
                None
            }
        }
    }

    /// Store a copy of `response` once the event allows; failures are only logged.
    fn store_in_background(&self, key: String, response: &Response, event: &ExtendableEvent) {
        let entry = response.to_entry(&self.bucket, &key);
        let db = self.db.clone();
        event.wait_until(async move {
            if let Err(e) = db.put_entry(&entry).await {
                tracing::warn!(key = %entry.request_key, bucket = %entry.bucket, error = %e, "store failed");
            }
        });
    }

    async fn network_first(
        &self, request: Request, class: RequestClass, event: &ExtendableEvent,
    ) -> Result<FetchOutcome, Error> {
        match self.network.fetch(&request).await {
            Ok(response) => {
                if class.is_storable() {
                    self.store_in_background(request.key(), &response, event);
                }
                Ok(FetchOutcome::network(response))
            }
            Err(err) => {
                let fallback_key = match class {
                    RequestClass::Navigation => request_key(&self.fallback),
                    _ => request.key(),
                };
                tracing::debug!(url = %request.url, error = %err, fallback = %fallback_key, "network failed");

                match self.lookup(&fallback_key).await {
                    Some(cached) => Ok(FetchOutcome::cached(cached)),
                    None => Err(err),
                }
            }
        }
    }

    async fn stale_while_revalidate(
        &self, request: Request, class: RequestClass, event: &ExtendableEvent,
    ) -> Result<FetchOutcome, Error> {
        let key = request.key();
        let cached = self.lookup(&key).await;

        let network = Arc::clone(&self.network);
        let db = self.db.clone();
        let bucket = self.bucket.clone();
        let storable = class.is_storable();
        let revalidate = tokio::spawn(async move {
            let response = network.fetch(&request).await?;
            if storable {
                let entry = response.to_entry(&bucket, &key);
                match db.put_entry(&entry).await {
                    Ok(()) => tracing::debug!(key = %key, digest = %entry.digest, "revalidated"),
                    Err(e) => tracing::warn!(key = %key, bucket = %bucket, error = %e, "store failed"),
                }
            }
            Ok::<_, Error>(response)
        });

        match cached {
            Some(response) => {
                event.wait_until(async move {
                    match revalidate.await {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => tracing::debug!(error = %e, "revalidation failed; cached copy kept"),
                        Err(e) => tracing::warn!(error = %e, "revalidation task failed"),
                    }
                });
                Ok(FetchOutcome::cached(response))
            }
            None => {
                let response = revalidate
                    .await
                    .map_err(|e| Error::TaskFailed(format!("revalidation: {e}")))??;
                Ok(FetchOutcome::network(response))
            }
        }
    }

    async fn cache_first(
        &self, request: Request, class: RequestClass, event: &ExtendableEvent,
    ) -> Result<FetchOutcome, Error> {
        if let Some(cached) = self.lookup(&request.key()).await {
            return Ok(FetchOutcome::cached(cached));
        }

        let response = self.network.fetch(&request).await?;
        if class.is_storable() {
            self.store_in_background(request.key(), &response, event);
        }
        Ok(FetchOutcome::network(response))
    }
}

#[async_trait]
impl CacheStrategy for OfflineCache {
    fn mode(&self) -> DeployMode {
        DeployMode::Production
    }

    /// Fetch every manifest entry, then create the bucket and write them all
    /// in one transaction.
    ///
    /// Any transport failure or non-2xx status fails the install before
    /// anything is written.
    async fn on_install(&self, _event: &ExtendableEvent) -> Result<(), Error> {
        let fetches = self.manifest.iter().map(|url| async move {
            let response = self
                .network
                .fetch(&Request::get(url.clone()))
                .await
                .map_err(|e| Error::InstallFailed(format!("{url}: {e}")))?;
            if !response.ok() {
                return Err(Error::InstallFailed(format!("{url}: status {}", response.status.as_u16())));
            }
            Ok::<_, Error>(response.to_entry(&self.bucket, &request_key(url)))
        });
        let entries = try_join_all(fetches).await?;

        let written = self
            .db
            .put_entries(entries)
            .await
            .map_err(|e| Error::InstallFailed(format!("storing manifest: {e}")))?;

        tracing::info!(bucket = %self.bucket, entries = written, "precached manifest");
        Ok(())
    }

    /// Delete every bucket but the current one.
    async fn on_activate(&self, _event: &ExtendableEvent) -> Result<(), Error> {
        let stale: Vec<String> = self
            .db
            .bucket_names()
            .await?
            .into_iter()
            .filter(|name| name != &self.bucket)
            .collect();

        try_join_all(stale.iter().map(|name| self.db.delete_bucket(name))).await?;

        if !stale.is_empty() {
            tracing::info!(current = %self.bucket, purged = ?stale, "purged stale buckets");
        }
        Ok(())
    }

    async fn on_fetch(&self, request: Request, event: &ExtendableEvent) -> Result<FetchOutcome, Error> {
        let class = RequestClass::of(&request);
        let strategy = self.routes.strategy_for(class);
        tracing::debug!(url = %request.url, %class, %strategy, "dispatch");

        match strategy {
            FetchStrategy::NetworkFirst => self.network_first(request, class, event).await,
            FetchStrategy::StaleWhileRevalidate => self.stale_while_revalidate(request, class, event).await,
            FetchStrategy::CacheFirst => self.cache_first(request, class, event).await,
            FetchStrategy::NetworkOnly => Ok(FetchOutcome::network(self.network.fetch(&request).await?)),
        }
    }
}
