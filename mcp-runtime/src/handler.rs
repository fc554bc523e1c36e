//! Per-method handler hooks.
//!
//! Both sides of a connection implement [`PeerHandler`]; a client typically
//! leaves almost everything at the defaults. Every request default answers
//! `NotImplemented`, which the dispatcher converts to `-32601 Method not
//! found`; every notification default is a logged no-op.

use async_trait::async_trait;
use mcp_types::CallToolRequestParams;
use mcp_types::CallToolResult;
use mcp_types::CancelledNotificationParams;
use mcp_types::CompleteRequestParams;
use mcp_types::CompleteResult;
use mcp_types::CreateMessageRequestParams;
use mcp_types::CreateMessageResult;
use mcp_types::EmptyResult;
use mcp_types::GetPromptRequestParams;
use mcp_types::GetPromptResult;
use mcp_types::InitializeRequestParams;
use mcp_types::InitializeResult;
use mcp_types::ListPromptsRequestParams;
use mcp_types::ListPromptsResult;
use mcp_types::ListResourceTemplatesRequestParams;
use mcp_types::ListResourceTemplatesResult;
use mcp_types::ListResourcesRequestParams;
use mcp_types::ListResourcesResult;
use mcp_types::ListRootsResult;
use mcp_types::ListToolsRequestParams;
use mcp_types::ListToolsResult;
use mcp_types::LoggingMessageNotificationParams;
use mcp_types::ProgressNotificationParams;
use mcp_types::ReadResourceRequestParams;
use mcp_types::ReadResourceResult;
use mcp_types::ResourceUpdatedNotificationParams;
use mcp_types::SetLevelRequestParams;
use mcp_types::SubscribeRequestParams;
use mcp_types::UnsubscribeRequestParams;
use serde_json::Value;

use crate::error::HandlerError;

type HandlerResult<T> = Result<T, HandlerError>;

/// Overridable operations, one per MCP method in either direction.
///
/// Handlers run serially on the peer's reader task; a handler that needs to
/// issue requests back over the same peer must spawn, or the reply it waits
/// for can never be read.
#[async_trait]
pub trait PeerHandler: Send + Sync + 'static {
    // ---------------------------------------------------------------
    // Requests a server receives.
    // ---------------------------------------------------------------

    async fn initialize(
        &self,
        params: InitializeRequestParams,
    ) -> HandlerResult<InitializeResult> {
        tracing::debug!("initialize not handled: {params:?}");
        Err(HandlerError::NotImplemented)
    }

    async fn ping(&self, params: Option<Value>) -> HandlerResult<EmptyResult> {
        tracing::debug!("ping not handled: {params:?}");
        Err(HandlerError::NotImplemented)
    }

    async fn list_tools(
        &self,
        params: Option<ListToolsRequestParams>,
    ) -> HandlerResult<ListToolsResult> {
        tracing::debug!("tools/list not handled: {params:?}");
        Err(HandlerError::NotImplemented)
    }

    async fn call_tool(&self, params: CallToolRequestParams) -> HandlerResult<CallToolResult> {
        tracing::debug!("tools/call not handled: {params:?}");
        Err(HandlerError::NotImplemented)
    }

    async fn list_prompts(
        &self,
        params: Option<ListPromptsRequestParams>,
    ) -> HandlerResult<ListPromptsResult> {
        tracing::debug!("prompts/list not handled: {params:?}");
        Err(HandlerError::NotImplemented)
    }

    async fn get_prompt(&self, params: GetPromptRequestParams) -> HandlerResult<GetPromptResult> {
        tracing::debug!("prompts/get not handled: {params:?}");
        Err(HandlerError::NotImplemented)
    }

    async fn list_resources(
        &self,
        params: Option<ListResourcesRequestParams>,
    ) -> HandlerResult<ListResourcesResult> {
        tracing::debug!("resources/list not handled: {params:?}");
        Err(HandlerError::NotImplemented)
    }

    async fn list_resource_templates(
        &self,
        params: Option<ListResourceTemplatesRequestParams>,
    ) -> HandlerResult<ListResourceTemplatesResult> {
        tracing::debug!("resources/templates/list not handled: {params:?}");
        Err(HandlerError::NotImplemented)
    }

    async fn read_resource(
        &self,
        params: ReadResourceRequestParams,
    ) -> HandlerResult<ReadResourceResult> {
        tracing::debug!("resources/read not handled: {params:?}");
        Err(HandlerError::NotImplemented)
    }

    async fn subscribe(&self, params: SubscribeRequestParams) -> HandlerResult<EmptyResult> {
        tracing::debug!("resources/subscribe not handled: {params:?}");
        Err(HandlerError::NotImplemented)
    }

    async fn unsubscribe(&self, params: UnsubscribeRequestParams) -> HandlerResult<EmptyResult> {
        tracing::debug!("resources/unsubscribe not handled: {params:?}");
        Err(HandlerError::NotImplemented)
    }

    async fn set_level(&self, params: SetLevelRequestParams) -> HandlerResult<EmptyResult> {
        tracing::debug!("logging/setLevel not handled: {params:?}");
        Err(HandlerError::NotImplemented)
    }

    async fn complete(&self, params: CompleteRequestParams) -> HandlerResult<CompleteResult> {
        tracing::debug!("completion/complete not handled: {params:?}");
        Err(HandlerError::NotImplemented)
    }

    // ---------------------------------------------------------------
    // Requests a client receives.
    // ---------------------------------------------------------------

    async fn list_roots(&self, params: Option<Value>) -> HandlerResult<ListRootsResult> {
        tracing::debug!("roots/list not handled: {params:?}");
        Err(HandlerError::NotImplemented)
    }

    async fn create_message(
        &self,
        params: CreateMessageRequestParams,
    ) -> HandlerResult<CreateMessageResult> {
        tracing::debug!("sampling/createMessage not handled: {params:?}");
        Err(HandlerError::NotImplemented)
    }

    // ---------------------------------------------------------------
    // Notifications. Errors are logged by the dispatcher and swallowed;
    // notifications never get replies.
    // ---------------------------------------------------------------

    async fn on_initialized(&self, params: Option<Value>) -> HandlerResult<()> {
        tracing::debug!("notifications/initialized: {params:?}");
        Ok(())
    }

    async fn on_cancelled(&self, params: CancelledNotificationParams) -> HandlerResult<()> {
        tracing::debug!("notifications/cancelled: {params:?}");
        Ok(())
    }

    async fn on_progress(&self, params: ProgressNotificationParams) -> HandlerResult<()> {
        tracing::debug!("notifications/progress: {params:?}");
        Ok(())
    }

    async fn on_logging_message(
        &self,
        params: LoggingMessageNotificationParams,
    ) -> HandlerResult<()> {
        tracing::debug!("notifications/message: {params:?}");
        Ok(())
    }

    async fn on_prompt_list_changed(&self, params: Option<Value>) -> HandlerResult<()> {
        tracing::debug!("notifications/prompts/list_changed: {params:?}");
        Ok(())
    }

    async fn on_resource_list_changed(&self, params: Option<Value>) -> HandlerResult<()> {
        tracing::debug!("notifications/resources/list_changed: {params:?}");
        Ok(())
    }

    async fn on_resource_updated(
        &self,
        params: ResourceUpdatedNotificationParams,
    ) -> HandlerResult<()> {
        tracing::debug!("notifications/resources/updated: {params:?}");
        Ok(())
    }

    async fn on_tool_list_changed(&self, params: Option<Value>) -> HandlerResult<()> {
        tracing::debug!("notifications/tools/list_changed: {params:?}");
        Ok(())
    }

    async fn on_roots_list_changed(&self, params: Option<Value>) -> HandlerResult<()> {
        tracing::debug!("notifications/roots/list_changed: {params:?}");
        Ok(())
    }
}
