//! Errors raised by the host itself, outside the cache and worker.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Structured errors for the shelter host.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// A tool argument could not be interpreted (e.g., unknown HTTP method).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded.
    #[error("OUTPUT_FAILED: {0}")]
    Output(String),
}

impl From<HostError> for McpError {
    fn from(err: HostError) -> Self {
        let code = match &err {
            HostError::InvalidInput(_) => -32602,
            HostError::Output(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
