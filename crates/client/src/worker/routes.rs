//! Request classes and the table mapping each to a fetch strategy.
//!
//! Adding a strategy means adding a `FetchStrategy` variant and a route;
//! dispatch never branches on request details directly.

use std::collections::HashMap;
use std::fmt;

use reqwest::Method;
use shelter_core::{AppConfig, FetchStrategy};

use crate::fetch::Request;

/// Closed set of request kinds the worker distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestClass {
    /// Top-level document load.
    Navigation,
    /// Any other GET: stylesheets, scripts, images, the app manifest.
    Asset,
    /// Non-GET requests. A bucket only ever stores GET responses.
    Other,
}

impl RequestClass {
    pub fn of(request: &Request) -> Self {
        if request.method != Method::GET {
            RequestClass::Other
        } else if request.is_navigation() {
            RequestClass::Navigation
        } else {
            RequestClass::Asset
        }
    }

    /// Whether responses to this class may be written to a bucket.
    pub fn is_storable(self) -> bool {
        !matches!(self, RequestClass::Other)
    }
}

impl fmt::Display for RequestClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestClass::Navigation => write!(f, "navigation"),
            RequestClass::Asset => write!(f, "asset"),
            RequestClass::Other => write!(f, "other"),
        }
    }
}

/// Dispatch table from request class to strategy.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: HashMap<RequestClass, FetchStrategy>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
            .with_route(RequestClass::Navigation, FetchStrategy::NetworkFirst)
            .with_route(RequestClass::Asset, FetchStrategy::StaleWhileRevalidate)
            .with_route(RequestClass::Other, FetchStrategy::NetworkOnly)
    }
}

impl RouteTable {
    /// An empty table; every class falls through to network-only.
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Defaults, with the asset route taken from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::default().with_route(RequestClass::Asset, config.asset_strategy)
    }

    pub fn with_route(mut self, class: RequestClass, strategy: FetchStrategy) -> Self {
        self.routes.insert(class, strategy);
        self
    }

    pub fn strategy_for(&self, class: RequestClass) -> FetchStrategy {
        self.routes
            .get(&class)
            .copied()
            .unwrap_or(FetchStrategy::NetworkOnly)
    }
}
