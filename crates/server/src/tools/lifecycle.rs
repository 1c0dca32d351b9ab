//! sw_install, sw_activate and sw_status.

use std::sync::Arc;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;
use shelter_client::{RegistrationStatus, WorkerStatus};
use shelter_core::DeployMode;

use super::json_result;
use crate::state::HostState;

#[derive(Debug, Clone, Serialize)]
pub struct SwInstallOutput {
    /// The freshly installed (now waiting) worker.
    pub worker: WorkerStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwActivateOutput {
    /// The worker that now controls fetches.
    pub worker: WorkerStatus,
    /// Buckets left after stale ones were purged.
    pub buckets: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwStatusOutput {
    pub mode: DeployMode,
    pub version: String,
    pub bucket: String,
    pub registration: RegistrationStatus,
}

/// Install a worker for the configured version. Safe to retry after failure.
pub async fn install_impl(state: &HostState) -> Result<CallToolResult, McpError> {
    let worker = state.build_worker()?;
    state.registration.install(Arc::clone(&worker)).await?;

    json_result(&SwInstallOutput { worker: worker.status() })
}

/// Activate the waiting worker.
pub async fn activate_impl(state: &HostState) -> Result<CallToolResult, McpError> {
    let worker = state.registration.activate().await?;
    let buckets = state.db.bucket_names().await?;

    json_result(&SwActivateOutput { worker: worker.status(), buckets })
}

pub async fn status_impl(state: &HostState) -> Result<CallToolResult, McpError> {
    json_result(&SwStatusOutput {
        mode: state.config.mode,
        version: state.config.version.clone(),
        bucket: state.config.bucket_name(),
        registration: state.registration.status(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelter_client::testing::StubNetwork;
    use crate::testing::host;
    use crate::tools::result_json;
    use rmcp::model::ErrorCode;

    #[tokio::test]
    async fn test_install_then_activate() {
        let state = host(StubNetwork::site()).await;
        state.db.open_bucket("site-cache-v0").await.unwrap();

        let installed = result_json(&install_impl(&state).await.unwrap());
        assert_eq!(installed["worker"]["state"], "installed");
        assert_eq!(installed["worker"]["skip_waiting"], true);

        let activated = result_json(&activate_impl(&state).await.unwrap());
        assert_eq!(activated["worker"]["state"], "active");
        assert_eq!(activated["buckets"], serde_json::json!(["site-cache-v1"]));
    }

    #[tokio::test]
    async fn test_install_failure_is_retryable() {
        let net = StubNetwork::site();
        net.set_offline(true);
        let state = host(net.clone()).await;

        let err = install_impl(&state).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32020));
        assert!(state.registration.waiting().is_none());

        net.set_offline(false);
        install_impl(&state).await.unwrap();
        assert!(state.registration.waiting().is_some());
    }

    #[tokio::test]
    async fn test_activate_without_install() {
        let state = host(StubNetwork::site()).await;
        let err = activate_impl(&state).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32021));
    }

    #[tokio::test]
    async fn test_status_reports_registration() {
        let state = host(StubNetwork::site()).await;
        let before = result_json(&status_impl(&state).await.unwrap());
        assert_eq!(before["mode"], "production");
        assert_eq!(before["bucket"], "site-cache-v1");
        assert!(before["registration"]["active"].is_null());

        state.register().await.unwrap();
        let after = result_json(&status_impl(&state).await.unwrap());
        assert_eq!(after["registration"]["active"]["version"], "v1");
        assert!(after["registration"]["waiting"].is_null());
    }
}
