//! Attribute macros that turn annotated functions into MCP handlers.
//!
//! `#[prompt]` and `#[tool]` inspect the annotated function's signature,
//! emit a deserializable parameter envelope plus a dispatcher that validates
//! incoming JSON argument objects, and register the dispatcher in the
//! process-wide registry consumed by `mcp_runtime::RegistryServer`.
//!
//! The generated code only names items through the `mcp_runtime` crate (and
//! its re-exports of serde, schemars, inventory and async-trait), so user
//! crates need a single dependency.

mod expand;
mod signature;

use proc_macro::TokenStream;

use crate::expand::HandlerKind;

/// Expose a function as an MCP prompt.
///
/// ```ignore
/// #[prompt(description = "Friendly greeting", default(style = String::from("plain")))]
/// async fn greet(name: String, style: String) -> GetPromptResult { ... }
/// ```
///
/// A parameter is optional iff its type is `Option<T>` or it has an entry
/// in `default(...)`; all other parameters are required. The function must
/// return `GetPromptResult` or `Result<GetPromptResult, E>`.
#[proc_macro_attribute]
pub fn prompt(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand::expand(HandlerKind::Prompt, attr.into(), item.into())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Expose a function as an MCP tool. Same parameter rules as [`prompt`];
/// the function must return `CallToolResult` or `Result<CallToolResult, E>`.
/// The tool's `inputSchema` is derived from the generated envelope, so all
/// parameter types must implement `schemars::JsonSchema`.
#[proc_macro_attribute]
pub fn tool(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand::expand(HandlerKind::Tool, attr.into(), item.into())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
