//! Host fixtures for tool tests.

use std::sync::Arc;

use shelter_client::testing::StubNetwork;
use shelter_core::{AppConfig, CacheDb};

use crate::state::HostState;

pub(crate) fn config() -> AppConfig {
    shelter_client::testing::config("v1")
}

pub(crate) async fn host(network: Arc<StubNetwork>) -> HostState {
    host_with(config(), network).await
}

pub(crate) async fn host_with(config: AppConfig, network: Arc<StubNetwork>) -> HostState {
    let db = CacheDb::open_in_memory().await.unwrap();
    HostState::new(config, db, network)
}
