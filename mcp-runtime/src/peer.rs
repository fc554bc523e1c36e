//! The symmetric peer core.
//!
//! A [`Peer`] owns a framed transport through two background tasks: a writer
//! draining a bounded channel onto the byte stream (one JSON object per
//! line) and a reader that decodes frames and processes them serially.
//! Outgoing requests are correlated with responses through a pending table
//! keyed by the monotonic request id; incoming requests are converted into
//! the role-appropriate typed union and dispatched to a [`PeerHandler`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use mcp_types::CallToolRequest;
use mcp_types::CallToolRequestParams;
use mcp_types::CallToolResult;
use mcp_types::ClientNotification;
use mcp_types::ClientRequest;
use mcp_types::ConversionError;
use mcp_types::GetPromptRequest;
use mcp_types::GetPromptRequestParams;
use mcp_types::GetPromptResult;
use mcp_types::InitializeRequest;
use mcp_types::InitializeRequestParams;
use mcp_types::InitializeResult;
use mcp_types::InitializedNotification;
use mcp_types::JSONRPC_VERSION;
use mcp_types::JSONRPCError;
use mcp_types::JSONRPCErrorError;
use mcp_types::JSONRPCMessage;
use mcp_types::JSONRPCNotification;
use mcp_types::JSONRPCRequest;
use mcp_types::JSONRPCResponse;
use mcp_types::JsonObject;
use mcp_types::ListPromptsRequest;
use mcp_types::ListPromptsRequestParams;
use mcp_types::ListPromptsResult;
use mcp_types::ListToolsRequest;
use mcp_types::ListToolsRequestParams;
use mcp_types::ListToolsResult;
use mcp_types::ModelContextProtocolNotification;
use mcp_types::ModelContextProtocolRequest;
use mcp_types::PARSE_ERROR_CODE;
use mcp_types::ReadResourceRequest;
use mcp_types::ReadResourceRequestParams;
use mcp_types::ReadResourceResult;
use mcp_types::RequestId;
use mcp_types::ServerNotification;
use mcp_types::ServerRequest;
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tokio::time;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::error::HandlerError;
use crate::error::PeerError;
use crate::handler::PeerHandler;
use crate::transport::Transport;

/// Size of the bounded channel between the public API and the writer task.
const CHANNEL_CAPACITY: usize = 128;

type PendingSender = oneshot::Sender<JSONRPCMessage>;

/// Which side of the connection this peer plays. The role selects the union
/// incoming requests are converted through, so methods arriving in the
/// wrong direction fail conversion and answer `-32601`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    Client,
    Server,
}

struct PeerState {
    outgoing_tx: mpsc::Sender<JSONRPCMessage>,
    /// Map of request id -> awaiter for requests in flight. Entries are
    /// inserted before the frame is queued for write, so a response cannot
    /// arrive before its slot exists.
    pending: Mutex<HashMap<i64, PendingSender>>,
    /// Monotonic id source, never reused. Starts at 1.
    id_counter: AtomicI64,
    shutdown_tx: watch::Sender<bool>,
}

impl PeerState {
    fn lock_pending(&self) -> MutexGuard<'_, HashMap<i64, PendingSender>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Complete every outstanding awaiter exceptionally by dropping its
    /// sender; `send_request` observes the closed channel as a transport
    /// failure.
    fn fail_all_pending(&self) {
        let dropped: Vec<(i64, PendingSender)> = self.lock_pending().drain().collect();
        if !dropped.is_empty() {
            warn!(
                "transport closed with {} request(s) still in flight",
                dropped.len()
            );
        }
    }
}

/// Removes the pending entry when the awaiting caller goes away (timeout or
/// task cancellation) without a response having claimed it first.
struct PendingGuard<'a> {
    state: &'a PeerState,
    id: i64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.state.lock_pending().remove(&self.id);
    }
}

/// A running MCP peer. Cheap to clone; all clones share the same transport
/// and pending table. Dropping the last clone closes the writer channel,
/// which in turn closes the transport.
#[derive(Clone)]
pub struct Peer {
    state: Arc<PeerState>,
}

impl Peer {
    /// Take ownership of a connected transport and start the IO tasks.
    pub fn spawn<T>(transport: T, handler: Arc<dyn PeerHandler>, role: PeerRole) -> Self
    where
        T: Transport,
    {
        let (reader, writer) = transport.into_split();
        let (outgoing_tx, outgoing_rx) = mpsc::channel::<JSONRPCMessage>(CHANNEL_CAPACITY);
        let (shutdown_tx, _) = watch::channel(false);
        let state = Arc::new(PeerState {
            outgoing_tx,
            pending: Mutex::new(HashMap::new()),
            id_counter: AtomicI64::new(1),
            shutdown_tx,
        });

        tokio::spawn(write_loop(writer, outgoing_rx));
        tokio::spawn(read_loop(reader, Arc::clone(&state), handler, role));

        Self { state }
    }

    /// Send a typed request and await its result.
    ///
    /// If `timeout` is `None` the call waits until a response arrives or the
    /// transport closes. Protocol errors surface as
    /// [`PeerError::Protocol`]; only transport loss is
    /// [`PeerError::Transport`].
    pub async fn send_request<R>(
        &self,
        params: R::Params,
        timeout: Option<Duration>,
    ) -> Result<R::Result, PeerError>
    where
        R: ModelContextProtocolRequest,
    {
        let id = self.state.id_counter.fetch_add(1, Ordering::SeqCst);
        let request_id = RequestId::String(id.to_string());

        // For many request types `Params` is `Option<T>` and `None` must be
        // encoded as absence of the field.
        let params_json = serde_json::to_value(&params)?;
        let params_field = if params_json.is_null() {
            None
        } else {
            Some(params_json)
        };

        let message = JSONRPCMessage::Request(JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: request_id,
            method: R::METHOD.to_string(),
            params: params_field,
        });

        let (tx, rx) = oneshot::channel();
        // Register before queueing the write so a response racing the send
        // always finds its slot.
        self.state.lock_pending().insert(id, tx);
        let _guard = PendingGuard {
            state: &self.state,
            id,
        };

        if self.state.outgoing_tx.send(message).await.is_err() {
            return Err(PeerError::Transport("writer task closed".to_string()));
        }

        let reply = match timeout {
            Some(duration) => match time::timeout(duration, rx).await {
                Ok(Ok(reply)) => reply,
                Ok(Err(_)) => {
                    return Err(PeerError::Transport(
                        "connection closed before a reply was received".to_string(),
                    ));
                }
                Err(_) => return Err(PeerError::Timeout),
            },
            None => rx.await.map_err(|_| {
                PeerError::Transport("connection closed before a reply was received".to_string())
            })?,
        };

        match reply {
            JSONRPCMessage::Response(JSONRPCResponse { result, .. }) => {
                Ok(serde_json::from_value(result)?)
            }
            JSONRPCMessage::Error(err) => Err(PeerError::Protocol(err.error)),
            other => Err(PeerError::Transport(format!(
                "unexpected message variant in reply path: {other:?}"
            ))),
        }
    }

    /// Serialize and queue a notification. Fire-and-forget; ordering with
    /// concurrent requests is whatever the transport byte order yields.
    pub async fn send_notification<N>(&self, params: N::Params) -> Result<(), PeerError>
    where
        N: ModelContextProtocolNotification,
    {
        let params_json = serde_json::to_value(&params)?;
        let params_field = if params_json.is_null() {
            None
        } else {
            Some(params_json)
        };

        let message = JSONRPCMessage::Notification(JSONRPCNotification {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: N::METHOD.to_string(),
            params: params_field,
        });
        self.state
            .outgoing_tx
            .send(message)
            .await
            .map_err(|_| PeerError::Transport("writer task closed".to_string()))
    }

    /// Negotiate initialization: send `initialize`, then
    /// `notifications/initialized` once the response is in.
    pub async fn initialize(
        &self,
        params: InitializeRequestParams,
        timeout: Option<Duration>,
    ) -> Result<InitializeResult, PeerError> {
        let response = self.send_request::<InitializeRequest>(params, timeout).await?;
        self.send_notification::<InitializedNotification>(None)
            .await?;
        Ok(response)
    }

    /// Convenience wrapper around `tools/list`.
    pub async fn list_tools(
        &self,
        params: Option<ListToolsRequestParams>,
        timeout: Option<Duration>,
    ) -> Result<ListToolsResult, PeerError> {
        self.send_request::<ListToolsRequest>(params, timeout).await
    }

    /// Convenience wrapper around `tools/call`.
    pub async fn call_tool(
        &self,
        name: String,
        arguments: Option<JsonObject>,
        timeout: Option<Duration>,
    ) -> Result<CallToolResult, PeerError> {
        let params = CallToolRequestParams { name, arguments };
        debug!("tools/call: {params:?}");
        self.send_request::<CallToolRequest>(params, timeout).await
    }

    /// Convenience wrapper around `prompts/list`.
    pub async fn list_prompts(
        &self,
        params: Option<ListPromptsRequestParams>,
        timeout: Option<Duration>,
    ) -> Result<ListPromptsResult, PeerError> {
        self.send_request::<ListPromptsRequest>(params, timeout)
            .await
    }

    /// Convenience wrapper around `prompts/get`.
    pub async fn get_prompt(
        &self,
        name: String,
        arguments: Option<JsonObject>,
        timeout: Option<Duration>,
    ) -> Result<GetPromptResult, PeerError> {
        let params = GetPromptRequestParams { name, arguments };
        self.send_request::<GetPromptRequest>(params, timeout).await
    }

    /// Convenience wrapper around `resources/read`.
    pub async fn read_resource(
        &self,
        uri: String,
        timeout: Option<Duration>,
    ) -> Result<ReadResourceResult, PeerError> {
        self.send_request::<ReadResourceRequest>(ReadResourceRequestParams { uri }, timeout)
            .await
    }

    /// Resolves once the transport has reached end-of-stream or failed and
    /// all pending requests have been completed exceptionally.
    pub async fn closed(&self) {
        let mut shutdown_rx = self.state.shutdown_tx.subscribe();
        while !*shutdown_rx.borrow_and_update() {
            if shutdown_rx.changed().await.is_err() {
                return;
            }
        }
    }
}

async fn write_loop<W>(mut writer: W, mut outgoing_rx: mpsc::Receiver<JSONRPCMessage>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outgoing_rx.recv().await {
        match serde_json::to_string(&message) {
            Ok(json) => {
                debug!("-> {json}");
                if let Err(err) = writer.write_all(json.as_bytes()).await {
                    error!("failed to write frame: {err}");
                    break;
                }
                if let Err(err) = writer.write_all(b"\n").await {
                    error!("failed to write newline: {err}");
                    break;
                }
                if let Err(err) = writer.flush().await {
                    error!("failed to flush transport: {err}");
                    break;
                }
            }
            Err(err) => error!("failed to serialize JSONRPCMessage: {err}"),
        }
    }
    debug!("writer task exited (channel closed)");
}

async fn read_loop<R>(
    reader: R,
    state: Arc<PeerState>,
    handler: Arc<dyn PeerHandler>,
    role: PeerRole,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => handle_line(&line, &state, handler.as_ref(), role).await,
            Ok(None) => {
                debug!("transport reached end of stream");
                break;
            }
            Err(err) => {
                error!("transport read failed: {err}");
                break;
            }
        }
    }
    state.fail_all_pending();
    let _ = state.shutdown_tx.send(true);
}

async fn handle_line(line: &str, state: &PeerState, handler: &dyn PeerHandler, role: PeerRole) {
    debug!("<- {line}");
    match serde_json::from_str::<JSONRPCMessage>(line) {
        Ok(JSONRPCMessage::Request(request)) => {
            handle_request(request, state, handler, role).await;
        }
        Ok(JSONRPCMessage::Notification(notification)) => {
            handle_notification(notification, handler, role).await;
        }
        Ok(JSONRPCMessage::Response(response)) => {
            let id = response.id.clone();
            complete_pending(state, &id, JSONRPCMessage::Response(response));
        }
        Ok(JSONRPCMessage::Error(err)) => {
            let id = err.id.clone();
            complete_pending(state, &id, JSONRPCMessage::Error(err));
        }
        Err(err) => {
            warn!("failed to deserialize JSONRPCMessage: {err}; line = {line}");
            if let Some(id) = recoverable_request_id(line) {
                let reply = JSONRPCMessage::Error(JSONRPCError {
                    jsonrpc: JSONRPC_VERSION.to_string(),
                    id,
                    error: JSONRPCErrorError {
                        code: PARSE_ERROR_CODE,
                        message: "Parse error".to_string(),
                        data: None,
                    },
                });
                if state.outgoing_tx.send(reply).await.is_err() {
                    error!("failed to queue parse error reply: writer task closed");
                }
            }
        }
    }
}

/// An id is only recoverable from request-shaped garbage. Frames carrying
/// `result` or `error` mean this peer was the requester; answering them
/// would be wrong, so they are dropped.
fn recoverable_request_id(line: &str) -> Option<RequestId> {
    let value: Value = serde_json::from_str(line).ok()?;
    let object = value.as_object()?;
    if object.contains_key("result") || object.contains_key("error") {
        return None;
    }
    serde_json::from_value(object.get("id")?.clone()).ok()
}

fn pending_key(id: &RequestId) -> Option<i64> {
    match id {
        RequestId::Integer(id) => Some(*id),
        RequestId::String(id) => id.parse().ok(),
    }
}

fn complete_pending(state: &PeerState, id: &RequestId, message: JSONRPCMessage) {
    let Some(key) = pending_key(id) else {
        warn!("response id `{id}` has no numeric form; dropping frame");
        return;
    };
    let sender = state.lock_pending().remove(&key);
    match sender {
        // The receiver may be gone if the caller timed out or was
        // cancelled; that is not an error.
        Some(sender) => {
            let _ = sender.send(message);
        }
        None => warn!("no pending request found for response id `{id}`"),
    }
}

async fn handle_request(
    request: JSONRPCRequest,
    state: &PeerState,
    handler: &dyn PeerHandler,
    role: PeerRole,
) {
    let id = request.id.clone();
    let method = request.method.clone();

    let outcome = match role {
        PeerRole::Server => match ClientRequest::try_from(request) {
            Ok(request) => dispatch_client_request(handler, request).await,
            Err(err) => Err(conversion_failure(&method, err)),
        },
        PeerRole::Client => match ServerRequest::try_from(request) {
            Ok(request) => dispatch_server_request(handler, request).await,
            Err(err) => Err(conversion_failure(&method, err)),
        },
    };

    // Requests are always answered, even when the handler failed.
    let reply = match outcome {
        Ok(result) => JSONRPCMessage::Response(JSONRPCResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
        }),
        Err(err) => {
            debug!("request `{method}` failed: {err}");
            JSONRPCMessage::Error(JSONRPCError {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id,
                error: err.into_error_object(),
            })
        }
    };
    if state.outgoing_tx.send(reply).await.is_err() {
        error!("failed to queue reply for `{method}`: writer task closed");
    }
}

fn conversion_failure(method: &str, err: ConversionError) -> HandlerError {
    warn!("failed to convert request `{method}`: {err}");
    HandlerError::from(err)
}

fn serialize_result<T>(result: Result<T, HandlerError>) -> Result<Value, HandlerError>
where
    T: Serialize,
{
    result.and_then(|value| {
        serde_json::to_value(value)
            .map_err(|err| HandlerError::Internal(format!("failed to serialize result: {err}")))
    })
}

async fn dispatch_client_request(
    handler: &dyn PeerHandler,
    request: ClientRequest,
) -> Result<Value, HandlerError> {
    match request {
        ClientRequest::InitializeRequest(params) => {
            serialize_result(handler.initialize(params).await)
        }
        ClientRequest::PingRequest(params) => serialize_result(handler.ping(params).await),
        ClientRequest::ListToolsRequest(params) => {
            serialize_result(handler.list_tools(params).await)
        }
        ClientRequest::CallToolRequest(params) => serialize_result(handler.call_tool(params).await),
        ClientRequest::ListPromptsRequest(params) => {
            serialize_result(handler.list_prompts(params).await)
        }
        ClientRequest::GetPromptRequest(params) => {
            serialize_result(handler.get_prompt(params).await)
        }
        ClientRequest::ListResourcesRequest(params) => {
            serialize_result(handler.list_resources(params).await)
        }
        ClientRequest::ListResourceTemplatesRequest(params) => {
            serialize_result(handler.list_resource_templates(params).await)
        }
        ClientRequest::ReadResourceRequest(params) => {
            serialize_result(handler.read_resource(params).await)
        }
        ClientRequest::SubscribeRequest(params) => serialize_result(handler.subscribe(params).await),
        ClientRequest::UnsubscribeRequest(params) => {
            serialize_result(handler.unsubscribe(params).await)
        }
        ClientRequest::SetLevelRequest(params) => serialize_result(handler.set_level(params).await),
        ClientRequest::CompleteRequest(params) => serialize_result(handler.complete(params).await),
    }
}

async fn dispatch_server_request(
    handler: &dyn PeerHandler,
    request: ServerRequest,
) -> Result<Value, HandlerError> {
    match request {
        ServerRequest::PingRequest(params) => serialize_result(handler.ping(params).await),
        ServerRequest::ListRootsRequest(params) => {
            serialize_result(handler.list_roots(params).await)
        }
        ServerRequest::CreateMessageRequest(params) => {
            serialize_result(handler.create_message(params).await)
        }
    }
}

async fn handle_notification(
    notification: JSONRPCNotification,
    handler: &dyn PeerHandler,
    role: PeerRole,
) {
    let method = notification.method.clone();
    let outcome = match role {
        PeerRole::Server => match ClientNotification::try_from(notification) {
            Ok(notification) => dispatch_client_notification(handler, notification).await,
            Err(err) => {
                // Notifications never get replies; unknown ones are dropped.
                warn!("ignoring notification `{method}`: {err}");
                Ok(())
            }
        },
        PeerRole::Client => match ServerNotification::try_from(notification) {
            Ok(notification) => dispatch_server_notification(handler, notification).await,
            Err(err) => {
                warn!("ignoring notification `{method}`: {err}");
                Ok(())
            }
        },
    };
    if let Err(err) = outcome {
        warn!("notification handler for `{method}` failed: {err}");
    }
}

async fn dispatch_client_notification(
    handler: &dyn PeerHandler,
    notification: ClientNotification,
) -> Result<(), HandlerError> {
    match notification {
        ClientNotification::InitializedNotification(params) => {
            handler.on_initialized(params).await
        }
        ClientNotification::CancelledNotification(params) => handler.on_cancelled(params).await,
        ClientNotification::ProgressNotification(params) => handler.on_progress(params).await,
        ClientNotification::RootsListChangedNotification(params) => {
            handler.on_roots_list_changed(params).await
        }
    }
}

async fn dispatch_server_notification(
    handler: &dyn PeerHandler,
    notification: ServerNotification,
) -> Result<(), HandlerError> {
    match notification {
        ServerNotification::CancelledNotification(params) => handler.on_cancelled(params).await,
        ServerNotification::ProgressNotification(params) => handler.on_progress(params).await,
        ServerNotification::LoggingMessageNotification(params) => {
            handler.on_logging_message(params).await
        }
        ServerNotification::PromptListChangedNotification(params) => {
            handler.on_prompt_list_changed(params).await
        }
        ServerNotification::ResourceListChangedNotification(params) => {
            handler.on_resource_list_changed(params).await
        }
        ServerNotification::ResourceUpdatedNotification(params) => {
            handler.on_resource_updated(params).await
        }
        ServerNotification::ToolListChangedNotification(params) => {
            handler.on_tool_list_changed(params).await
        }
    }
}
