//! Scripted network and fixtures for tests of the worker and its hosts.
//!
//! Compiled for this crate's own tests and, behind the `test-util` feature,
//! for dependents.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderValue};
use shelter_core::{AppConfig, CacheDb, Error};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use url::Url;

use crate::fetch::{Network, Request, Response};

pub const ORIGIN: &str = "https://site.example";

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub fn key(path: &str) -> String {
    url(path).to_string()
}

pub fn config(version: &str) -> AppConfig {
    AppConfig { origin: ORIGIN.to_string(), version: version.to_string(), ..Default::default() }
}

/// In-process network answering from a route table.
///
/// Unknown URLs get a 404; `set_offline(true)` makes every fetch fail with a
/// network error; `hold()` blocks fetches until the guard is dropped.
#[derive(Default)]
pub struct StubNetwork {
    routes: Mutex<HashMap<String, (StatusCode, String)>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
    gate: Arc<RwLock<()>>,
}

impl StubNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The three-entry site used by most tests.
    pub fn site() -> Arc<Self> {
        let net = Self::new();
        net.serve("/", "<html>root</html>");
        net.serve("/index.html", "<html>index</html>");
        net.serve("/manifest.json", r#"{"name":"site"}"#);
        net
    }

    pub fn serve(&self, path: &str, body: &str) {
        self.serve_status(path, StatusCode::OK, body);
    }

    pub fn serve_status(&self, path: &str, status: StatusCode, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(key(path), (status, body.to_string()));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn hold(&self) -> OwnedRwLockWriteGuard<()> {
        Arc::clone(&self.gate).write_owned().await
    }

    pub fn calls(&self, path: &str) -> usize {
        let wanted = key(path);
        self.calls.lock().unwrap().iter().filter(|k| **k == wanted).count()
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let _open = self.gate.read().await;
        self.calls.lock().unwrap().push(request.key());

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: offline", request.url)));
        }

        let route = self.routes.lock().unwrap().get(&request.key()).cloned();
        let (status, body) = route.unwrap_or((StatusCode::NOT_FOUND, "not found".to_string()));
        Ok(Response::new(request.url.clone(), status, body)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain")))
    }
}

pub async fn body_in(db: &CacheDb, bucket: &str, path: &str) -> Option<String> {
    db.match_entry(bucket, &key(path))
        .await
        .unwrap()
        .map(|entry| String::from_utf8(entry.body).unwrap())
}
