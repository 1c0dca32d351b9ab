//! sw_fetch tool implementation.
//!
//! Dispatches a request through the registration. Requests the active worker
//! does not intercept are fetched straight from the network.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelter_client::{ExtendableEvent, FetchOutcome, Method, Network, Request, ResponseSource};

use super::json_result;
use crate::error::HostError;
use crate::state::HostState;

/// Input parameters for sw_fetch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// Treat the request as a page navigation (default: false).
    #[serde(default)]
    pub navigate: bool,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,
}

/// Output structure for sw_fetch.
#[derive(Debug, Clone, Serialize)]
pub struct SwFetchOutput {
    pub url: String,
    /// Whether the active worker answered the request.
    pub intercepted: bool,
    /// Where the worker's answer came from; absent when not intercepted.
    pub source: Option<ResponseSource>,
    pub status: u16,
    pub content_type: Option<String>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    /// Background tasks (cache refreshes) still running for this fetch.
    pub background: usize,
}

fn parse_method(method: Option<&str>) -> Result<Method, HostError> {
    match method.map(str::trim).filter(|m| !m.is_empty()) {
        None => Ok(Method::GET),
        Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes())
            .map_err(|_| HostError::InvalidInput(format!("unsupported method: {m}"))),
    }
}

/// Dispatch the request and hand back the event still carrying its background work.
pub(crate) async fn dispatch(
    state: &HostState, params: SwFetchParams,
) -> Result<(SwFetchOutput, ExtendableEvent), McpError> {
    let method = parse_method(params.method.as_deref())?;
    let url = state.resolve_url(&params.url)?;
    let request = if params.navigate { Request::navigate(url) } else { Request::get(url) }.with_method(method);

    let dispatched = state.registration.dispatch_fetch(request.clone()).await?;
    let (response, source) = match dispatched.outcome {
        FetchOutcome::Passthrough => (state.network.fetch(&request).await?, None),
        FetchOutcome::Respond { response, source } => (response, Some(source)),
    };

    let output = SwFetchOutput {
        url: response.url.to_string(),
        intercepted: source.is_some(),
        source,
        status: response.status.as_u16(),
        content_type: response.content_type().map(str::to_string),
        body: response.text(),
        background: dispatched.event.pending(),
    };
    Ok((output, dispatched.event))
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(state: &HostState, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let (output, event) = dispatch(state, params).await?;

    tokio::spawn(async move {
        if let Err(e) = event.settled().await {
            tracing::warn!(error = %e, "fetch background work failed");
        }
    });

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelter_client::testing::StubNetwork;
    use crate::testing::{config, host, host_with};
    use crate::tools::result_json;
    use rmcp::model::ErrorCode;
    use shelter_core::DeployMode;

    fn params(url: &str, navigate: bool) -> SwFetchParams {
        SwFetchParams { url: url.into(), navigate, method: None }
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method(None).unwrap(), Method::GET);
        assert_eq!(parse_method(Some(" ")).unwrap(), Method::GET);
        assert_eq!(parse_method(Some("post")).unwrap(), Method::POST);
        assert!(parse_method(Some("NOT A METHOD")).is_err());
    }

    #[tokio::test]
    async fn test_fetch_without_worker_is_not_intercepted() {
        let state = host(StubNetwork::site()).await;

        let result = fetch_impl(&state, params("/index.html", true)).await.unwrap();
        let output = result_json(&result);
        assert_eq!(output["intercepted"], false);
        assert!(output["source"].is_null());
        assert_eq!(output["body"], "<html>index</html>");
    }

    #[tokio::test]
    async fn test_offline_navigation_served_from_cache() {
        let net = StubNetwork::site();
        let state = host(net.clone()).await;
        state.register().await.unwrap();
        net.set_offline(true);

        let (output, event) = dispatch(&state, params("/deep/link", true)).await.unwrap();
        event.settled().await.unwrap();

        assert!(output.intercepted);
        assert_eq!(output.source, Some(ResponseSource::Cache));
        assert_eq!(output.body, "<html>index</html>");
    }

    #[tokio::test]
    async fn test_asset_refresh_runs_in_background() {
        let net = StubNetwork::site();
        let state = host(net.clone()).await;
        state.register().await.unwrap();
        net.serve("/app.css", "old{}");
        let (_, event) = dispatch(&state, params("/app.css", false)).await.unwrap();
        event.settled().await.unwrap();

        net.serve("/app.css", "new{}");
        let (output, event) = dispatch(&state, params("/app.css", false)).await.unwrap();
        assert_eq!(output.body, "old{}");
        assert_eq!(output.background, 1);
        event.settled().await.unwrap();

        let (output, _) = dispatch(&state, params("/app.css", false)).await.unwrap();
        assert_eq!(output.body, "new{}");
    }

    #[tokio::test]
    async fn test_development_mode_fetches_directly() {
        let dev = shelter_core::AppConfig { mode: DeployMode::Development, ..config() };
        let state = host_with(dev, StubNetwork::site()).await;
        state.register().await.unwrap();

        let (output, _) = dispatch(&state, params("/", true)).await.unwrap();
        assert!(!output.intercepted);
        assert_eq!(output.body, "<html>root</html>");
    }

    #[tokio::test]
    async fn test_bad_url_rejected() {
        let state = host(StubNetwork::site()).await;
        let err = fetch_impl(&state, params("ftp://site.example/", false)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32003));
    }
}
