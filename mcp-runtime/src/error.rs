//! Error taxonomy and its mapping onto JSON-RPC error objects.

use mcp_types::ConversionError;
use mcp_types::INTERNAL_ERROR_CODE;
use mcp_types::INVALID_PARAMS_CODE;
use mcp_types::INVALID_REQUEST_CODE;
use mcp_types::JSONRPCErrorError;
use mcp_types::METHOD_NOT_FOUND_CODE;
use thiserror::Error;

/// Failure raised by a request or notification handler. Request handler
/// errors never escape the peer; they are converted into `error` responses
/// with [`HandlerError::into_error_object`].
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The method exists in the protocol but this peer does not implement
    /// it. Every default `PeerHandler` method returns this.
    #[error("Method not found")]
    NotImplemented,

    /// The method string did not match any method this peer may receive.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Missing required argument: {0}")]
    MissingRequiredArgument(String),

    #[error("Unknown argument: {0}")]
    UnknownArgument(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Request was syntactically valid JSON-RPC but violates protocol
    /// state, e.g. a second `initialize`.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    pub fn into_error_object(self) -> JSONRPCErrorError {
        let (code, message) = match self {
            // The wire message is the bare JSON-RPC phrase; the offending
            // method name is logged by the dispatcher instead.
            HandlerError::NotImplemented | HandlerError::MethodNotFound(_) => {
                (METHOD_NOT_FOUND_CODE, "Method not found".to_string())
            }
            HandlerError::MissingRequiredArgument(name) => (
                INVALID_PARAMS_CODE,
                format!("Missing required argument: {name}"),
            ),
            HandlerError::UnknownArgument(name) => {
                (INVALID_PARAMS_CODE, format!("Unknown argument: {name}"))
            }
            HandlerError::InvalidParams(message) => {
                (INVALID_PARAMS_CODE, format!("Invalid params: {message}"))
            }
            HandlerError::InvalidRequest(message) => (INVALID_REQUEST_CODE, message),
            HandlerError::Internal(message) => {
                (INTERNAL_ERROR_CODE, format!("Internal error: {message}"))
            }
        };
        JSONRPCErrorError {
            code,
            message,
            data: None,
        }
    }
}

impl From<ConversionError> for HandlerError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::UnknownMethod(method) => HandlerError::MethodNotFound(method),
            ConversionError::InvalidParams { source, .. } => {
                HandlerError::InvalidParams(source.to_string())
            }
        }
    }
}

/// Failure surfaced to callers of the peer's public API. Protocol-level
/// errors carry the server's error object so callers can inspect the code
/// and decide whether to treat them as fatal.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("peer returned JSON-RPC error: code = {}, message = {}", .0.code, .0.message)]
    Protocol(JSONRPCErrorError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("request timed out")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn handler_errors_map_to_json_rpc_codes() {
        let cases = [
            (HandlerError::NotImplemented, METHOD_NOT_FOUND_CODE),
            (
                HandlerError::MethodNotFound("foo/bar".to_string()),
                METHOD_NOT_FOUND_CODE,
            ),
            (
                HandlerError::MissingRequiredArgument("name".to_string()),
                INVALID_PARAMS_CODE,
            ),
            (
                HandlerError::UnknownArgument("extra".to_string()),
                INVALID_PARAMS_CODE,
            ),
            (
                HandlerError::InvalidParams("bad shape".to_string()),
                INVALID_PARAMS_CODE,
            ),
            (
                HandlerError::Internal("boom".to_string()),
                INTERNAL_ERROR_CODE,
            ),
        ];
        for (error, code) in cases {
            assert_eq!(error.into_error_object().code, code);
        }
    }

    #[test]
    fn argument_errors_name_the_offender() {
        let error = HandlerError::MissingRequiredArgument("name".to_string()).into_error_object();
        assert!(error.message.contains("name"));

        let error = HandlerError::UnknownArgument("extra".to_string()).into_error_object();
        assert!(error.message.contains("extra"));
    }

    #[test]
    fn unknown_method_wire_message_is_the_bare_phrase() {
        let error = HandlerError::MethodNotFound("foo/bar".to_string()).into_error_object();
        assert_eq!(error.message, "Method not found");
    }
}
