//! A symmetric Model Context Protocol (MCP) runtime.
//!
//! The same [`Peer`] drives both sides of a connection: it owns a framed
//! byte transport, correlates outgoing requests with responses through
//! monotonic ids, and dispatches incoming frames to the typed hooks of a
//! [`PeerHandler`]. Servers usually plug in [`RegistryServer`], which
//! serves the prompt and tool handlers generated by the [`prompt`] and
//! [`tool`] attribute macros:
//!
//! ```ignore
//! use mcp_runtime::prompt;
//! use mcp_types::GetPromptResult;
//! use mcp_types::PromptMessage;
//! use mcp_types::Role;
//!
//! #[prompt(description = "Friendly greeting")]
//! fn greet(name: String, style: Option<String>) -> GetPromptResult {
//!     let style = style.unwrap_or_else(|| "plain".to_string());
//!     GetPromptResult {
//!         description: None,
//!         messages: vec![PromptMessage::text(Role::User, format!("Greet {name}, {style}."))],
//!     }
//! }
//! ```
#![deny(clippy::print_stdout, clippy::print_stderr)]

mod error;
mod handler;
mod pagination;
mod peer;
mod registry;
mod schema;
mod server;
mod transport;

pub use error::HandlerError;
pub use error::PeerError;
pub use handler::PeerHandler;
pub use pagination::collect_all;
pub use pagination::paginate;
pub use peer::Peer;
pub use peer::PeerRole;
pub use registry::PromptHandler;
pub use registry::PromptRegistration;
pub use registry::PromptRegistry;
pub use registry::ToolHandler;
pub use registry::ToolRegistration;
pub use registry::ToolRegistry;
pub use registry::prompts;
pub use registry::tools;
pub use schema::tool_input_schema;
pub use server::RegistryServer;
pub use transport::ChildProcessTransport;
pub use transport::ChildWriter;
pub use transport::IoTransport;
pub use transport::StdioTransport;
pub use transport::Transport;

pub use mcp_runtime_macros::prompt;
pub use mcp_runtime_macros::tool;

// Re-exports for macro-generated code, so user crates only depend on this
// crate.
pub use async_trait;
pub use inventory;
pub use mcp_types;
pub use schemars;
pub use serde;
pub use serde_json;

use std::io::Result as IoResult;
use std::sync::Arc;

/// Serve the registered prompts and tools over this process's stdio until
/// the client closes the stream.
///
/// Installs a `tracing` subscriber writing to stderr (stdout carries
/// frames); the log level is controlled with `RUST_LOG`.
pub async fn run_stdio_server(server: RegistryServer) -> IoResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let peer = Peer::spawn(StdioTransport, Arc::new(server), PeerRole::Server);
    peer.closed().await;
    Ok(())
}
