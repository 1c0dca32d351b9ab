//! cache_list tool implementation.
//!
//! Lists bucket names and the entries of one bucket.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shelter_core::EntrySummary;

use crate::state::HostState;
use crate::tools::json_result;

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// Bucket whose entries to list (default: the configured version's bucket).
    #[serde(default)]
    pub bucket: Option<String>,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    /// Every bucket in storage, oldest first.
    pub buckets: Vec<String>,
    /// The bucket the entries belong to.
    pub bucket: String,
    pub entries: Vec<EntrySummary>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(state: &HostState, params: CacheListParams) -> Result<CallToolResult, McpError> {
    let bucket = state.bucket_or_current(params.bucket);
    let buckets = state.db.bucket_names().await?;
    let entries = state.db.list_entries(&bucket).await?;

    json_result(&CacheListOutput { buckets, bucket, entries })
}
