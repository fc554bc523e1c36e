//! Wire-level types for the Model Context Protocol (MCP), schema revision
//! 2024-11-05.
//!
//! The crate has three layers:
//!
//!   1. JSON-RPC 2.0 envelopes ([`JSONRPCMessage`] and friends) together with
//!      the frame codec: deserialization discriminates frames by field
//!      presence (`result`/`error` first, then `method` with or without
//!      `id`) and rejects anything else.
//!   2. The closed method registry: one marker type per MCP method binding
//!      its params and result types through
//!      [`ModelContextProtocolRequest`] / [`ModelContextProtocolNotification`].
//!   3. Direction unions ([`ClientRequest`], [`ServerRequest`],
//!      [`ClientNotification`], [`ServerNotification`]) that convert raw
//!      envelopes into typed variants, distinguishing unknown methods from
//!      undecodable params so peers can answer -32601 vs -32602.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde::de::Error as _;
use serde::de::{self};
use serde_json::Value;

/// MCP protocol revision implemented by this crate. Returned from
/// `initialize` and expected in `initialize` requests; a mismatch does not
/// fail the handshake on its own.
pub const MCP_SCHEMA_VERSION: &str = "2024-11-05";

/// JSON-RPC version string carried by every frame.
pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR_CODE: i64 = -32700;
pub const INVALID_REQUEST_CODE: i64 = -32600;
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;
pub const INVALID_PARAMS_CODE: i64 = -32602;
pub const INTERNAL_ERROR_CODE: i64 = -32603;

/// A JSON object, preserving the sender's key order.
pub type JsonObject = serde_json::Map<String, Value>;

/// Binds a method string to its parameter and result types. Implemented by
/// the per-method marker types; used as a turbofish argument when sending
/// typed requests or replies.
pub trait ModelContextProtocolRequest {
    const METHOD: &'static str;
    type Params: DeserializeOwned + Serialize + Send + Sync + 'static;
    type Result: DeserializeOwned + Serialize + Send + Sync + 'static;
}

/// Same as [`ModelContextProtocolRequest`] for fire-and-forget
/// notifications, which carry no result.
pub trait ModelContextProtocolNotification {
    const METHOD: &'static str;
    type Params: DeserializeOwned + Serialize + Send + Sync + 'static;
}

/// A list endpoint that threads an opaque cursor through successive
/// requests. `into_page` returns the items plus the cursor for the next
/// page; an absent cursor terminates iteration.
pub trait PaginatedRequest: ModelContextProtocolRequest {
    type Item: DeserializeOwned + Serialize + Send + Sync + 'static;

    fn params_for_cursor(cursor: Option<String>) -> Self::Params;
    fn into_page(result: Self::Result) -> (Vec<Self::Item>, Option<String>);
}

// ---------------------------------------------------------------------
// JSON-RPC envelopes
// ---------------------------------------------------------------------

/// Request correlation id. Outgoing ids are a per-peer monotonic counter
/// rendered as a decimal string, but incoming ids of either shape are
/// honored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Integer(i64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => f.write_str(s),
            RequestId::Integer(i) => write!(f, "{i}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JSONRPCRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JSONRPCNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JSONRPCResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JSONRPCError {
    pub jsonrpc: String,
    pub id: RequestId,
    pub error: JSONRPCErrorError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JSONRPCErrorError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// One JSON-RPC frame. Batching is not supported: each line on the wire is
/// exactly one of these.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JSONRPCMessage {
    Request(JSONRPCRequest),
    Notification(JSONRPCNotification),
    Response(JSONRPCResponse),
    Error(JSONRPCError),
}

impl<'de> Deserialize<'de> for JSONRPCMessage {
    /// Frame discrimination, in order:
    ///
    ///   1. `result` or `error` present -> response (both present is a hard
    ///      decode error rather than a guess).
    ///   2. `method` and `id` present -> request.
    ///   3. `method` alone -> notification.
    ///   4. anything else -> malformed.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let Some(object) = value.as_object() else {
            return Err(D::Error::custom("JSON-RPC frame must be an object"));
        };

        let has_result = object.contains_key("result");
        let has_error = object.contains_key("error");
        if has_result && has_error {
            return Err(D::Error::custom(
                "JSON-RPC frame contains both `result` and `error`",
            ));
        }
        if has_result {
            return serde_json::from_value(value)
                .map(JSONRPCMessage::Response)
                .map_err(D::Error::custom);
        }
        if has_error {
            return serde_json::from_value(value)
                .map(JSONRPCMessage::Error)
                .map_err(D::Error::custom);
        }
        if object.contains_key("method") {
            return if object.contains_key("id") {
                serde_json::from_value(value)
                    .map(JSONRPCMessage::Request)
                    .map_err(D::Error::custom)
            } else {
                serde_json::from_value(value)
                    .map(JSONRPCMessage::Notification)
                    .map_err(D::Error::custom)
            };
        }
        Err(D::Error::custom(
            "JSON-RPC frame has no `method`, `result` or `error`",
        ))
    }
}

// ---------------------------------------------------------------------
// Shared protocol shapes
// ---------------------------------------------------------------------

/// Result type for methods that return an empty object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmptyResult {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub r#type: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
}

impl TextContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            r#type: "text".to_string(),
            text: text.into(),
            annotations: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageContent {
    pub r#type: String,
    pub data: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextResourceContents {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobResourceContents {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub blob: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceContents {
    TextResourceContents(TextResourceContents),
    BlobResourceContents(BlobResourceContents),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedResource {
    pub r#type: String,
    pub resource: ResourceContents,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
}

/// Content attached to prompt messages and tool results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentBlock {
    TextContent(TextContent),
    ImageContent(ImageContent),
    EmbeddedResource(EmbeddedResource),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: ContentBlock,
}

impl PromptMessage {
    /// Plain-text message, the overwhelmingly common case in prompt
    /// templates.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: ContentBlock::TextContent(TextContent::new(text)),
        }
    }
}

// ---------------------------------------------------------------------
// initialize / ping
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientCapabilitiesRoots {
    #[serde(
        rename = "listChanged",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub list_changed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experimental: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roots: Option<ClientCapabilitiesRoots>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerCapabilitiesPrompts {
    #[serde(
        rename = "listChanged",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub list_changed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerCapabilitiesResources {
    #[serde(
        rename = "listChanged",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub list_changed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerCapabilitiesTools {
    #[serde(
        rename = "listChanged",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub list_changed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experimental: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<ServerCapabilitiesPrompts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ServerCapabilitiesResources>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ServerCapabilitiesTools>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequestParams {
    pub capabilities: ClientCapabilities,
    pub client_info: Implementation,
    pub protocol_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub capabilities: ServerCapabilities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub protocol_version: String,
    pub server_info: Implementation,
}

pub struct InitializeRequest;

impl ModelContextProtocolRequest for InitializeRequest {
    const METHOD: &'static str = "initialize";
    type Params = InitializeRequestParams;
    type Result = InitializeResult;
}

pub struct PingRequest;

impl ModelContextProtocolRequest for PingRequest {
    const METHOD: &'static str = "ping";
    type Params = Option<Value>;
    type Result = EmptyResult;
}

// ---------------------------------------------------------------------
// tools/*
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInputSchema {
    pub r#type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub input_schema: ToolInputSchema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListToolsRequestParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolRequestParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<JsonObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

pub struct ListToolsRequest;

impl ModelContextProtocolRequest for ListToolsRequest {
    const METHOD: &'static str = "tools/list";
    type Params = Option<ListToolsRequestParams>;
    type Result = ListToolsResult;
}

impl PaginatedRequest for ListToolsRequest {
    type Item = Tool;

    fn params_for_cursor(cursor: Option<String>) -> Self::Params {
        cursor.map(|cursor| ListToolsRequestParams {
            cursor: Some(cursor),
        })
    }

    fn into_page(result: Self::Result) -> (Vec<Self::Item>, Option<String>) {
        (result.tools, result.next_cursor)
    }
}

pub struct CallToolRequest;

impl ModelContextProtocolRequest for CallToolRequest {
    const METHOD: &'static str = "tools/call";
    type Params = CallToolRequestParams;
    type Result = CallToolResult;
}

// ---------------------------------------------------------------------
// prompts/*
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<PromptArgument>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListPromptsRequestParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPromptsResult {
    pub prompts: Vec<Prompt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPromptRequestParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<JsonObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPromptResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

pub struct ListPromptsRequest;

impl ModelContextProtocolRequest for ListPromptsRequest {
    const METHOD: &'static str = "prompts/list";
    type Params = Option<ListPromptsRequestParams>;
    type Result = ListPromptsResult;
}

impl PaginatedRequest for ListPromptsRequest {
    type Item = Prompt;

    fn params_for_cursor(cursor: Option<String>) -> Self::Params {
        cursor.map(|cursor| ListPromptsRequestParams {
            cursor: Some(cursor),
        })
    }

    fn into_page(result: Self::Result) -> (Vec<Self::Item>, Option<String>) {
        (result.prompts, result.next_cursor)
    }
}

pub struct GetPromptRequest;

impl ModelContextProtocolRequest for GetPromptRequest {
    const METHOD: &'static str = "prompts/get";
    type Params = GetPromptRequestParams;
    type Result = GetPromptResult;
}

// ---------------------------------------------------------------------
// resources/*
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplate {
    pub uri_template: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListResourcesRequestParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResourcesResult {
    pub resources: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListResourceTemplatesRequestParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResourceTemplatesResult {
    pub resource_templates: Vec<ResourceTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResourceRequestParams {
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContents>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeRequestParams {
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsubscribeRequestParams {
    pub uri: String,
}

pub struct ListResourcesRequest;

impl ModelContextProtocolRequest for ListResourcesRequest {
    const METHOD: &'static str = "resources/list";
    type Params = Option<ListResourcesRequestParams>;
    type Result = ListResourcesResult;
}

impl PaginatedRequest for ListResourcesRequest {
    type Item = Resource;

    fn params_for_cursor(cursor: Option<String>) -> Self::Params {
        cursor.map(|cursor| ListResourcesRequestParams {
            cursor: Some(cursor),
        })
    }

    fn into_page(result: Self::Result) -> (Vec<Self::Item>, Option<String>) {
        (result.resources, result.next_cursor)
    }
}

pub struct ListResourceTemplatesRequest;

impl ModelContextProtocolRequest for ListResourceTemplatesRequest {
    const METHOD: &'static str = "resources/templates/list";
    type Params = Option<ListResourceTemplatesRequestParams>;
    type Result = ListResourceTemplatesResult;
}

impl PaginatedRequest for ListResourceTemplatesRequest {
    type Item = ResourceTemplate;

    fn params_for_cursor(cursor: Option<String>) -> Self::Params {
        cursor.map(|cursor| ListResourceTemplatesRequestParams {
            cursor: Some(cursor),
        })
    }

    fn into_page(result: Self::Result) -> (Vec<Self::Item>, Option<String>) {
        (result.resource_templates, result.next_cursor)
    }
}

pub struct ReadResourceRequest;

impl ModelContextProtocolRequest for ReadResourceRequest {
    const METHOD: &'static str = "resources/read";
    type Params = ReadResourceRequestParams;
    type Result = ReadResourceResult;
}

pub struct SubscribeRequest;

impl ModelContextProtocolRequest for SubscribeRequest {
    const METHOD: &'static str = "resources/subscribe";
    type Params = SubscribeRequestParams;
    type Result = EmptyResult;
}

pub struct UnsubscribeRequest;

impl ModelContextProtocolRequest for UnsubscribeRequest {
    const METHOD: &'static str = "resources/unsubscribe";
    type Params = UnsubscribeRequestParams;
    type Result = EmptyResult;
}

// ---------------------------------------------------------------------
// logging / completion
// ---------------------------------------------------------------------

/// Syslog-style severities, least to most severe. The derived order lets a
/// server compare an incoming message's level against the configured
/// threshold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetLevelRequestParams {
    pub level: LoggingLevel,
}

pub struct SetLevelRequest;

impl ModelContextProtocolRequest for SetLevelRequest {
    const METHOD: &'static str = "logging/setLevel";
    type Params = SetLevelRequestParams;
    type Result = EmptyResult;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptReference {
    pub r#type: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceReference {
    pub r#type: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompleteReference {
    PromptReference(PromptReference),
    ResourceReference(ResourceReference),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteArgument {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteRequestParams {
    pub r#ref: CompleteReference,
    pub argument: CompleteArgument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteCompletion {
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteResult {
    pub completion: CompleteCompletion,
}

pub struct CompleteRequest;

impl ModelContextProtocolRequest for CompleteRequest {
    const METHOD: &'static str = "completion/complete";
    type Params = CompleteRequestParams;
    type Result = CompleteResult;
}

// ---------------------------------------------------------------------
// server -> client requests
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Root {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListRootsResult {
    pub roots: Vec<Root>,
}

pub struct ListRootsRequest;

impl ModelContextProtocolRequest for ListRootsRequest {
    const METHOD: &'static str = "roots/list";
    type Params = Option<Value>;
    type Result = ListRootsResult;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SamplingContent {
    TextContent(TextContent),
    ImageContent(ImageContent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingMessage {
    pub role: Role,
    pub content: SamplingContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<ModelHint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_priority: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_priority: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intelligence_priority: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequestParams {
    pub messages: Vec<SamplingMessage>,
    pub max_tokens: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_preferences: Option<ModelPreferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageResult {
    pub role: Role,
    pub content: SamplingContent,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

pub struct CreateMessageRequest;

impl ModelContextProtocolRequest for CreateMessageRequest {
    const METHOD: &'static str = "sampling/createMessage";
    type Params = CreateMessageRequestParams;
    type Result = CreateMessageResult;
}

// ---------------------------------------------------------------------
// notifications
// ---------------------------------------------------------------------

pub type ProgressToken = RequestId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledNotificationParams {
    pub request_id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressNotificationParams {
    pub progress_token: ProgressToken,
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingMessageNotificationParams {
    pub level: LoggingLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceUpdatedNotificationParams {
    pub uri: String,
}

pub struct InitializedNotification;

impl ModelContextProtocolNotification for InitializedNotification {
    const METHOD: &'static str = "notifications/initialized";
    type Params = Option<Value>;
}

pub struct CancelledNotification;

impl ModelContextProtocolNotification for CancelledNotification {
    const METHOD: &'static str = "notifications/cancelled";
    type Params = CancelledNotificationParams;
}

pub struct ProgressNotification;

impl ModelContextProtocolNotification for ProgressNotification {
    const METHOD: &'static str = "notifications/progress";
    type Params = ProgressNotificationParams;
}

pub struct LoggingMessageNotification;

impl ModelContextProtocolNotification for LoggingMessageNotification {
    const METHOD: &'static str = "notifications/message";
    type Params = LoggingMessageNotificationParams;
}

pub struct PromptListChangedNotification;

impl ModelContextProtocolNotification for PromptListChangedNotification {
    const METHOD: &'static str = "notifications/prompts/list_changed";
    type Params = Option<Value>;
}

pub struct ResourceListChangedNotification;

impl ModelContextProtocolNotification for ResourceListChangedNotification {
    const METHOD: &'static str = "notifications/resources/list_changed";
    type Params = Option<Value>;
}

pub struct ResourceUpdatedNotification;

impl ModelContextProtocolNotification for ResourceUpdatedNotification {
    const METHOD: &'static str = "notifications/resources/updated";
    type Params = ResourceUpdatedNotificationParams;
}

pub struct ToolListChangedNotification;

impl ModelContextProtocolNotification for ToolListChangedNotification {
    const METHOD: &'static str = "notifications/tools/list_changed";
    type Params = Option<Value>;
}

pub struct RootsListChangedNotification;

impl ModelContextProtocolNotification for RootsListChangedNotification {
    const METHOD: &'static str = "notifications/roots/list_changed";
    type Params = Option<Value>;
}

// ---------------------------------------------------------------------
// direction unions
// ---------------------------------------------------------------------

/// Why an envelope could not be converted into a typed request or
/// notification. Unknown methods answer -32601; undecodable params -32602.
#[derive(Debug)]
pub enum ConversionError {
    UnknownMethod(String),
    InvalidParams {
        method: String,
        source: serde_json::Error,
    },
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::UnknownMethod(method) => {
                write!(f, "unknown method: {method}")
            }
            ConversionError::InvalidParams { method, source } => {
                write!(f, "invalid params for {method}: {source}")
            }
        }
    }
}

impl std::error::Error for ConversionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConversionError::UnknownMethod(_) => None,
            ConversionError::InvalidParams { source, .. } => Some(source),
        }
    }
}

fn parse_params<P>(method: &str, params: Option<Value>) -> Result<P, ConversionError>
where
    P: DeserializeOwned,
{
    serde_json::from_value(params.unwrap_or(Value::Null)).map_err(|source| {
        ConversionError::InvalidParams {
            method: method.to_string(),
            source,
        }
    })
}

/// Requests a client may send to a server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    InitializeRequest(InitializeRequestParams),
    PingRequest(Option<Value>),
    ListToolsRequest(Option<ListToolsRequestParams>),
    CallToolRequest(CallToolRequestParams),
    ListPromptsRequest(Option<ListPromptsRequestParams>),
    GetPromptRequest(GetPromptRequestParams),
    ListResourcesRequest(Option<ListResourcesRequestParams>),
    ListResourceTemplatesRequest(Option<ListResourceTemplatesRequestParams>),
    ReadResourceRequest(ReadResourceRequestParams),
    SubscribeRequest(SubscribeRequestParams),
    UnsubscribeRequest(UnsubscribeRequestParams),
    SetLevelRequest(SetLevelRequestParams),
    CompleteRequest(CompleteRequestParams),
}

impl TryFrom<JSONRPCRequest> for ClientRequest {
    type Error = ConversionError;

    fn try_from(req: JSONRPCRequest) -> Result<Self, Self::Error> {
        let JSONRPCRequest { method, params, .. } = req;
        if method == InitializeRequest::METHOD {
            parse_params(&method, params).map(ClientRequest::InitializeRequest)
        } else if method == PingRequest::METHOD {
            parse_params(&method, params).map(ClientRequest::PingRequest)
        } else if method == ListToolsRequest::METHOD {
            parse_params(&method, params).map(ClientRequest::ListToolsRequest)
        } else if method == CallToolRequest::METHOD {
            parse_params(&method, params).map(ClientRequest::CallToolRequest)
        } else if method == ListPromptsRequest::METHOD {
            parse_params(&method, params).map(ClientRequest::ListPromptsRequest)
        } else if method == GetPromptRequest::METHOD {
            parse_params(&method, params).map(ClientRequest::GetPromptRequest)
        } else if method == ListResourcesRequest::METHOD {
            parse_params(&method, params).map(ClientRequest::ListResourcesRequest)
        } else if method == ListResourceTemplatesRequest::METHOD {
            parse_params(&method, params).map(ClientRequest::ListResourceTemplatesRequest)
        } else if method == ReadResourceRequest::METHOD {
            parse_params(&method, params).map(ClientRequest::ReadResourceRequest)
        } else if method == SubscribeRequest::METHOD {
            parse_params(&method, params).map(ClientRequest::SubscribeRequest)
        } else if method == UnsubscribeRequest::METHOD {
            parse_params(&method, params).map(ClientRequest::UnsubscribeRequest)
        } else if method == SetLevelRequest::METHOD {
            parse_params(&method, params).map(ClientRequest::SetLevelRequest)
        } else if method == CompleteRequest::METHOD {
            parse_params(&method, params).map(ClientRequest::CompleteRequest)
        } else {
            Err(ConversionError::UnknownMethod(method))
        }
    }
}

/// Requests a server may send to a client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerRequest {
    PingRequest(Option<Value>),
    ListRootsRequest(Option<Value>),
    CreateMessageRequest(CreateMessageRequestParams),
}

impl TryFrom<JSONRPCRequest> for ServerRequest {
    type Error = ConversionError;

    fn try_from(req: JSONRPCRequest) -> Result<Self, Self::Error> {
        let JSONRPCRequest { method, params, .. } = req;
        if method == PingRequest::METHOD {
            parse_params(&method, params).map(ServerRequest::PingRequest)
        } else if method == ListRootsRequest::METHOD {
            parse_params(&method, params).map(ServerRequest::ListRootsRequest)
        } else if method == CreateMessageRequest::METHOD {
            parse_params(&method, params).map(ServerRequest::CreateMessageRequest)
        } else {
            Err(ConversionError::UnknownMethod(method))
        }
    }
}

/// Notifications a client may send to a server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientNotification {
    InitializedNotification(Option<Value>),
    CancelledNotification(CancelledNotificationParams),
    ProgressNotification(ProgressNotificationParams),
    RootsListChangedNotification(Option<Value>),
}

impl TryFrom<JSONRPCNotification> for ClientNotification {
    type Error = ConversionError;

    fn try_from(n: JSONRPCNotification) -> Result<Self, Self::Error> {
        let JSONRPCNotification { method, params, .. } = n;
        if method == InitializedNotification::METHOD {
            parse_params(&method, params).map(ClientNotification::InitializedNotification)
        } else if method == CancelledNotification::METHOD {
            parse_params(&method, params).map(ClientNotification::CancelledNotification)
        } else if method == ProgressNotification::METHOD {
            parse_params(&method, params).map(ClientNotification::ProgressNotification)
        } else if method == RootsListChangedNotification::METHOD {
            parse_params(&method, params).map(ClientNotification::RootsListChangedNotification)
        } else {
            Err(ConversionError::UnknownMethod(method))
        }
    }
}

/// Notifications a server may send to a client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerNotification {
    CancelledNotification(CancelledNotificationParams),
    ProgressNotification(ProgressNotificationParams),
    LoggingMessageNotification(LoggingMessageNotificationParams),
    PromptListChangedNotification(Option<Value>),
    ResourceListChangedNotification(Option<Value>),
    ResourceUpdatedNotification(ResourceUpdatedNotificationParams),
    ToolListChangedNotification(Option<Value>),
}

impl TryFrom<JSONRPCNotification> for ServerNotification {
    type Error = ConversionError;

    fn try_from(n: JSONRPCNotification) -> Result<Self, Self::Error> {
        let JSONRPCNotification { method, params, .. } = n;
        if method == CancelledNotification::METHOD {
            parse_params(&method, params).map(ServerNotification::CancelledNotification)
        } else if method == ProgressNotification::METHOD {
            parse_params(&method, params).map(ServerNotification::ProgressNotification)
        } else if method == LoggingMessageNotification::METHOD {
            parse_params(&method, params).map(ServerNotification::LoggingMessageNotification)
        } else if method == PromptListChangedNotification::METHOD {
            parse_params(&method, params).map(ServerNotification::PromptListChangedNotification)
        } else if method == ResourceListChangedNotification::METHOD {
            parse_params(&method, params).map(ServerNotification::ResourceListChangedNotification)
        } else if method == ResourceUpdatedNotification::METHOD {
            parse_params(&method, params).map(ServerNotification::ResourceUpdatedNotification)
        } else if method == ToolListChangedNotification::METHOD {
            parse_params(&method, params).map(ServerNotification::ToolListChangedNotification)
        } else {
            Err(ConversionError::UnknownMethod(method))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_round_trips() {
        let msg = JSONRPCMessage::Request(JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::String("1".to_string()),
            method: "initialize".to_string(),
            params: Some(serde_json::json!({"protocolVersion": MCP_SCHEMA_VERSION})),
        });
        let line = serde_json::to_string(&msg).expect("serialize");
        let decoded: JSONRPCMessage = serde_json::from_str(&line).expect("deserialize");
        assert_eq!(msg, decoded);
    }

    #[test]
    fn response_round_trips() {
        let msg = JSONRPCMessage::Response(JSONRPCResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Integer(7),
            result: serde_json::json!({"tools": []}),
        });
        let line = serde_json::to_string(&msg).expect("serialize");
        let decoded: JSONRPCMessage = serde_json::from_str(&line).expect("deserialize");
        assert_eq!(msg, decoded);
    }

    #[test]
    fn error_round_trips() {
        let msg = JSONRPCMessage::Error(JSONRPCError {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::String("9".to_string()),
            error: JSONRPCErrorError {
                code: METHOD_NOT_FOUND_CODE,
                message: "Method not found".to_string(),
                data: None,
            },
        });
        let line = serde_json::to_string(&msg).expect("serialize");
        let decoded: JSONRPCMessage = serde_json::from_str(&line).expect("deserialize");
        assert_eq!(msg, decoded);
    }

    #[test]
    fn notification_round_trips() {
        let msg = JSONRPCMessage::Notification(JSONRPCNotification {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: "notifications/initialized".to_string(),
            params: None,
        });
        let line = serde_json::to_string(&msg).expect("serialize");
        assert_eq!(
            line,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#
        );
        let decoded: JSONRPCMessage = serde_json::from_str(&line).expect("deserialize");
        assert_eq!(msg, decoded);
    }

    #[test]
    fn method_with_id_is_a_request_without_id_a_notification() {
        let with_id: JSONRPCMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"3","method":"ping"}"#)
                .expect("deserialize");
        assert!(matches!(with_id, JSONRPCMessage::Request(_)));

        let without_id: JSONRPCMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"ping"}"#).expect("deserialize");
        assert!(matches!(without_id, JSONRPCMessage::Notification(_)));
    }

    #[test]
    fn frame_with_result_and_error_is_rejected() {
        let line = r#"{"jsonrpc":"2.0","id":"1","result":{},"error":{"code":0,"message":""}}"#;
        assert!(serde_json::from_str::<JSONRPCMessage>(line).is_err());
    }

    #[test]
    fn frame_without_method_result_or_error_is_rejected() {
        assert!(serde_json::from_str::<JSONRPCMessage>(r#"{"jsonrpc":"2.0","id":"1"}"#).is_err());
        assert!(serde_json::from_str::<JSONRPCMessage>("[1,2,3]").is_err());
    }

    #[test]
    fn result_wins_over_method() {
        // A frame carrying both `result` and `method` is dispatched as a
        // response; field presence is checked before method routing.
        let line = r#"{"jsonrpc":"2.0","id":"4","method":"ping","result":{}}"#;
        let decoded: JSONRPCMessage = serde_json::from_str(line).expect("deserialize");
        assert!(matches!(decoded, JSONRPCMessage::Response(_)));
    }

    #[test]
    fn unknown_method_is_reported_by_name() {
        let req = JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::String("7".to_string()),
            method: "foo/bar".to_string(),
            params: None,
        };
        match ClientRequest::try_from(req) {
            Err(ConversionError::UnknownMethod(method)) => assert_eq!(method, "foo/bar"),
            other => panic!("expected UnknownMethod, got {other:?}"),
        }
    }

    #[test]
    fn wrong_direction_request_is_unknown() {
        // roots/list is server->client; a server must not accept it.
        let req = JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Integer(1),
            method: ListRootsRequest::METHOD.to_string(),
            params: None,
        };
        assert!(matches!(
            ClientRequest::try_from(req),
            Err(ConversionError::UnknownMethod(_))
        ));
    }

    #[test]
    fn missing_required_params_are_invalid() {
        let req = JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Integer(2),
            method: CallToolRequest::METHOD.to_string(),
            params: None,
        };
        assert!(matches!(
            ClientRequest::try_from(req),
            Err(ConversionError::InvalidParams { .. })
        ));
    }

    #[test]
    fn absent_params_decode_for_optional_param_methods() {
        let req = JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Integer(3),
            method: ListToolsRequest::METHOD.to_string(),
            params: None,
        };
        assert_eq!(
            ClientRequest::try_from(req).expect("convert"),
            ClientRequest::ListToolsRequest(None)
        );
    }

    #[test]
    fn null_fields_are_omitted_on_the_wire() {
        let result = CallToolResult {
            content: vec![ContentBlock::TextContent(TextContent::new("ok"))],
            is_error: None,
        };
        let json = serde_json::to_string(&result).expect("serialize");
        assert_eq!(json, r#"{"content":[{"type":"text","text":"ok"}]}"#);
    }

    #[test]
    fn logging_levels_order_by_severity() {
        assert!(LoggingLevel::Debug < LoggingLevel::Info);
        assert!(LoggingLevel::Warning < LoggingLevel::Error);
        assert!(LoggingLevel::Error < LoggingLevel::Emergency);
    }
}
