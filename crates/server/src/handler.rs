//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::state::HostState;
use crate::tools::{
    SwFetchParams,
    cache::{CacheGetParams, CacheListParams, get_impl, list_impl},
    fetch::fetch_impl,
    lifecycle::{activate_impl, install_impl, status_impl},
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for shelter.
#[derive(Clone)]
pub struct ShelterServer {
    tool_router: ToolRouter<Self>,
    state: Arc<HostState>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ShelterServer {
    /// Create a new server handler.
    pub fn new(state: Arc<HostState>) -> Self {
        Self { tool_router: Self::tool_router(), state }
    }

    #[tool(description = "Install a worker for the configured version: precache the manifest into its bucket. \
                          Fails without writing anything if any manifest entry cannot be fetched; safe to retry.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.state).await
    }

    #[tool(description = "Activate the waiting worker: purge buckets of other versions, then take over fetches.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.state).await
    }

    /// Dispatch a request through the active worker.
    ///
    /// Navigations are network-first with the cached root document as fallback;
    /// other GETs follow the configured asset strategy.
    #[tool(description = "Fetch a URL through the offline cache. Set navigate=true for page loads. \
                          Returns status, body and whether the response came from the cache or the network.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.state, params.0).await
    }

    #[tool(description = "Report mode, version, bucket and the state of the waiting and active workers.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.state).await
    }

    #[tool(description = "List cache buckets and the entries of one bucket (default: current version's bucket).")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.state, params.0).await
    }

    #[tool(description = "Get one stored response by URL from a bucket (default: current version's bucket).")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.state, params.0).await
    }
}

impl ServerHandler for ShelterServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shelter".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
