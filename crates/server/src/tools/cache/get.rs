//! cache_get tool implementation.
//!
//! Retrieves one stored response by URL.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelter_client::request_key;
use shelter_core::Error;

use crate::state::HostState;
use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// Bucket to read from (default: the configured version's bucket).
    #[serde(default)]
    pub bucket: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub bucket: String,
    pub request_key: String,
    /// URL the response was fetched from.
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub digest: String,
    pub stored_at: String,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(state: &HostState, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let bucket = state.bucket_or_current(params.bucket);
    let key = request_key(&state.resolve_url(&params.url)?);

    let entry = state
        .db
        .match_entry(&bucket, &key)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{key} in {bucket}")))?;

    json_result(&CacheGetOutput {
        body: String::from_utf8_lossy(&entry.body).into_owned(),
        bucket: entry.bucket,
        request_key: entry.request_key,
        url: entry.url,
        status_code: entry.status_code,
        content_type: entry.content_type,
        digest: entry.digest,
        stored_at: entry.stored_at,
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
    async fn test_get_impl_missing() {
        let state = host(StubNetwork::site()).await;
        let params = CacheGetParams { url: "/nope.css".into(), bucket: None };

        let err = get_impl(&state, params).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32001));
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let state = host(StubNetwork::site()).await;
        state.register().await.unwrap();

        let params = CacheGetParams { url: "https://site.example/index.html#main".into(), bucket: None };
        let output: CacheGetOutput = serde_json::from_value(result_json(&get_impl(&state, params).await.unwrap())).unwrap();

        assert_eq!(output.bucket, "site-cache-v1");
        assert_eq!(output.request_key, "https://site.example/index.html");
        assert_eq!(output.status_code, 200);
        assert_eq!(output.body, "<html>index</html>");
        assert_eq!(output.digest.len(), 64);
    }
}
