//! A [`PeerHandler`] that serves the process-wide prompt and tool
//! registries.

use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use mcp_types::CallToolRequestParams;
use mcp_types::CallToolResult;
use mcp_types::ContentBlock;
use mcp_types::EmptyResult;
use mcp_types::GetPromptRequestParams;
use mcp_types::GetPromptResult;
use mcp_types::Implementation;
use mcp_types::InitializeRequestParams;
use mcp_types::InitializeResult;
use mcp_types::ListPromptsRequestParams;
use mcp_types::ListPromptsResult;
use mcp_types::ListToolsRequestParams;
use mcp_types::ListToolsResult;
use mcp_types::LoggingLevel;
use mcp_types::LoggingMessageNotification;
use mcp_types::LoggingMessageNotificationParams;
use mcp_types::MCP_SCHEMA_VERSION;
use mcp_types::ServerCapabilities;
use mcp_types::ServerCapabilitiesPrompts;
use mcp_types::ServerCapabilitiesTools;
use mcp_types::SetLevelRequestParams;
use mcp_types::TextContent;
use serde_json::Value;
use tracing::info;
use tracing::warn;

use crate::error::HandlerError;
use crate::error::PeerError;
use crate::handler::PeerHandler;
use crate::peer::Peer;
use crate::registry;

/// Registry-backed server handler: `initialize`, `ping`, the prompt and
/// tool endpoints and `logging/setLevel`. Everything else stays at the
/// `-32601` defaults.
pub struct RegistryServer {
    server_info: Implementation,
    initialized: AtomicBool,
    log_level: Mutex<LoggingLevel>,
}

impl RegistryServer {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        // Touch both registries up front so duplicate handler names abort
        // before any traffic is served.
        let prompt_count = registry::prompts().len();
        let tool_count = registry::tools().len();
        info!("serving {prompt_count} prompt(s) and {tool_count} tool(s)");

        Self {
            server_info: Implementation {
                name: name.into(),
                version: version.into(),
            },
            initialized: AtomicBool::new(false),
            log_level: Mutex::new(LoggingLevel::Info),
        }
    }

    fn threshold(&self) -> LoggingLevel {
        *self
            .log_level
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a `notifications/message` at `level` passes the threshold
    /// set by the client via `logging/setLevel`.
    pub fn should_log(&self, level: LoggingLevel) -> bool {
        level >= self.threshold()
    }

    /// Emit a `notifications/message` to the connected client, gated by the
    /// configured level.
    pub async fn send_log_message(
        &self,
        peer: &Peer,
        level: LoggingLevel,
        logger: Option<String>,
        data: Value,
    ) -> Result<(), PeerError> {
        if !self.should_log(level) {
            return Ok(());
        }
        peer.send_notification::<LoggingMessageNotification>(LoggingMessageNotificationParams {
            level,
            logger,
            data,
        })
        .await
    }
}

#[async_trait]
impl PeerHandler for RegistryServer {
    async fn initialize(
        &self,
        params: InitializeRequestParams,
    ) -> Result<InitializeResult, HandlerError> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(HandlerError::InvalidRequest(
                "initialize called more than once".to_string(),
            ));
        }
        if params.protocol_version != MCP_SCHEMA_VERSION {
            // A version mismatch is the application's call, not ours.
            warn!(
                "client protocol version {} differs from {}",
                params.protocol_version, MCP_SCHEMA_VERSION
            );
        }

        let prompts = registry::prompts();
        let tools = registry::tools();
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                experimental: None,
                logging: Some(Value::Object(serde_json::Map::new())),
                prompts: (!prompts.is_empty()).then(|| ServerCapabilitiesPrompts {
                    list_changed: Some(false),
                }),
                resources: None,
                tools: (!tools.is_empty()).then(|| ServerCapabilitiesTools {
                    list_changed: Some(false),
                }),
            },
            instructions: None,
            protocol_version: MCP_SCHEMA_VERSION.to_string(),
            server_info: self.server_info.clone(),
        })
    }

    async fn ping(&self, _params: Option<Value>) -> Result<EmptyResult, HandlerError> {
        Ok(EmptyResult {})
    }

    async fn list_prompts(
        &self,
        _params: Option<ListPromptsRequestParams>,
    ) -> Result<ListPromptsResult, HandlerError> {
        Ok(ListPromptsResult {
            prompts: registry::prompts().descriptors(),
            next_cursor: None,
        })
    }

    async fn get_prompt(
        &self,
        params: GetPromptRequestParams,
    ) -> Result<GetPromptResult, HandlerError> {
        let GetPromptRequestParams { name, arguments } = params;
        match registry::prompts().get(&name) {
            Some(handler) => handler.call(arguments.unwrap_or_default()).await,
            None => Err(HandlerError::InvalidParams(format!(
                "unknown prompt: {name}"
            ))),
        }
    }

    async fn list_tools(
        &self,
        _params: Option<ListToolsRequestParams>,
    ) -> Result<ListToolsResult, HandlerError> {
        Ok(ListToolsResult {
            tools: registry::tools().descriptors(),
            next_cursor: None,
        })
    }

    async fn call_tool(&self, params: CallToolRequestParams) -> Result<CallToolResult, HandlerError> {
        let CallToolRequestParams { name, arguments } = params;
        match registry::tools().get(&name) {
            Some(handler) => handler.call(arguments.unwrap_or_default()).await,
            // Tool not found: return an error result so the caller can
            // react in-band.
            None => Ok(CallToolResult {
                content: vec![ContentBlock::TextContent(TextContent::new(format!(
                    "Unknown tool '{name}'"
                )))],
                is_error: Some(true),
            }),
        }
    }

    async fn set_level(&self, params: SetLevelRequestParams) -> Result<EmptyResult, HandlerError> {
        *self
            .log_level
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = params.level;
        Ok(EmptyResult {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_threshold_defaults_to_info() {
        let server = RegistryServer::new("test", "0.0.0");
        assert!(server.should_log(LoggingLevel::Info));
        assert!(server.should_log(LoggingLevel::Error));
        assert!(!server.should_log(LoggingLevel::Debug));
    }

    #[tokio::test]
    async fn set_level_moves_the_threshold() {
        let server = RegistryServer::new("test", "0.0.0");
        server
            .set_level(SetLevelRequestParams {
                level: LoggingLevel::Error,
            })
            .await
            .expect("set level");
        assert!(!server.should_log(LoggingLevel::Warning));
        assert!(server.should_log(LoggingLevel::Error));
    }

    #[tokio::test]
    async fn second_initialize_is_rejected() {
        let server = RegistryServer::new("test", "0.0.0");
        let params = InitializeRequestParams {
            capabilities: Default::default(),
            client_info: Implementation {
                name: "client".to_string(),
                version: "1".to_string(),
            },
            protocol_version: MCP_SCHEMA_VERSION.to_string(),
        };
        server
            .initialize(params.clone())
            .await
            .expect("first initialize succeeds");
        let err = server
            .initialize(params)
            .await
            .expect_err("second initialize fails");
        assert_eq!(err.into_error_object().code, mcp_types::INVALID_REQUEST_CODE);
    }
}
