//! Behavior of the handlers generated by `#[prompt]` and `#[tool]`:
//! argument validation, optional-parameter dispatch, descriptors and the
//! registry-backed server serving them end to end.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mcp_runtime::HandlerError;
use mcp_runtime::IoTransport;
use mcp_runtime::Peer;
use mcp_runtime::PeerError;
use mcp_runtime::PeerHandler;
use mcp_runtime::PeerRole;
use mcp_runtime::RegistryServer;
use mcp_runtime::prompt;
use mcp_runtime::tool;
use mcp_types::CallToolResult;
use mcp_types::ContentBlock;
use mcp_types::GetPromptResult;
use mcp_types::INTERNAL_ERROR_CODE;
use mcp_types::INVALID_PARAMS_CODE;
use mcp_types::JsonObject;
use mcp_types::PromptMessage;
use mcp_types::Role;
use mcp_types::TextContent;
use pretty_assertions::assert_eq;
use serde_json::Value;
use serde_json::json;

const TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------
// Handlers under test
// ---------------------------------------------------------------------

#[prompt(description = "Friendly greeting", default(style = String::from("plain")))]
fn greet(name: String, style: String) -> GetPromptResult {
    GetPromptResult {
        description: Some(format!("{style} greeting")),
        messages: vec![PromptMessage::text(
            Role::User,
            format!("Please greet {name} in a {style} voice."),
        )],
    }
}

#[prompt(default(punctuation = String::from("!")))]
fn farewell(name: String, flourish: Option<String>, punctuation: String) -> GetPromptResult {
    let flourish = flourish.map(|f| format!(" {f}")).unwrap_or_default();
    GetPromptResult {
        description: None,
        messages: vec![PromptMessage::text(
            Role::Assistant,
            format!("Goodbye {name}{flourish}{punctuation}"),
        )],
    }
}

#[tool(description = "Add two integers, optionally scaling the sum")]
fn add(a: i64, b: i64, scale: Option<i64>) -> CallToolResult {
    let sum = (a + b) * scale.unwrap_or(1);
    CallToolResult {
        content: vec![ContentBlock::TextContent(TextContent::new(sum.to_string()))],
        is_error: None,
    }
}

#[tool(name = "echo")]
async fn echo_text(text: String) -> anyhow::Result<CallToolResult> {
    if text.is_empty() {
        anyhow::bail!("nothing to echo");
    }
    Ok(CallToolResult {
        content: vec![ContentBlock::TextContent(TextContent::new(text))],
        is_error: None,
    })
}

// ---------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------

fn args(pairs: &[(&str, Value)]) -> JsonObject {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), value.clone()))
        .collect()
}

fn prompt_text(result: &GetPromptResult) -> &str {
    match &result.messages[0].content {
        ContentBlock::TextContent(text) => &text.text,
        other => panic!("expected text content, got {other:?}"),
    }
}

fn tool_text(result: &CallToolResult) -> &str {
    match &result.content[0] {
        ContentBlock::TextContent(text) => &text.text,
        other => panic!("expected text content, got {other:?}"),
    }
}

async fn call_greet(arguments: JsonObject) -> Result<GetPromptResult, HandlerError> {
    mcp_runtime::prompts()
        .get("greet")
        .expect("greet is registered")
        .call(arguments)
        .await
}

async fn call_farewell(arguments: JsonObject) -> Result<GetPromptResult, HandlerError> {
    mcp_runtime::prompts()
        .get("farewell")
        .expect("farewell is registered")
        .call(arguments)
        .await
}

struct NullClient;

#[async_trait]
impl PeerHandler for NullClient {}

fn connect() -> Peer {
    let (client_io, server_io) = tokio::io::duplex(4096);
    let _server = Peer::spawn(
        IoTransport(server_io),
        Arc::new(RegistryServer::new("generated-test", "0.0.0")),
        PeerRole::Server,
    );
    Peer::spawn(
        IoTransport(client_io),
        Arc::new(NullClient),
        PeerRole::Client,
    )
}

// ---------------------------------------------------------------------
// Registry and descriptors
// ---------------------------------------------------------------------

#[test]
fn generated_handlers_are_registered() {
    assert!(mcp_runtime::prompts().get("greet").is_some());
    assert!(mcp_runtime::prompts().get("farewell").is_some());
    assert!(mcp_runtime::tools().get("add").is_some());
    // Name override on the attribute wins over the function name.
    assert!(mcp_runtime::tools().get("echo").is_some());
    assert!(mcp_runtime::tools().get("echo_text").is_none());
}

#[test]
fn prompt_descriptor_marks_required_arguments() {
    let descriptor = mcp_runtime::prompts()
        .get("greet")
        .expect("greet is registered")
        .descriptor();
    assert_eq!(descriptor.description.as_deref(), Some("Friendly greeting"));

    let arguments = descriptor.arguments.expect("arguments are listed");
    let by_name: Vec<(&str, Option<bool>)> = arguments
        .iter()
        .map(|a| (a.name.as_str(), a.required))
        .collect();
    assert_eq!(by_name, vec![("name", Some(true)), ("style", Some(false))]);
}

#[test]
fn tool_descriptor_schema_lists_fields_and_required() {
    let descriptor = mcp_runtime::tools()
        .get("add")
        .expect("add is registered")
        .descriptor();
    assert_eq!(descriptor.input_schema.r#type, "object");
    assert_eq!(
        descriptor.input_schema.required,
        Some(vec!["a".to_string(), "b".to_string()])
    );
    let properties = descriptor
        .input_schema
        .properties
        .expect("schema has properties");
    for field in ["a", "b", "scale"] {
        assert!(properties.get(field).is_some(), "missing property {field}");
    }
}

// ---------------------------------------------------------------------
// Argument validation
// ---------------------------------------------------------------------

#[tokio::test]
async fn missing_required_argument_is_named() {
    let err = call_greet(args(&[])).await.expect_err("must fail");
    match &err {
        HandlerError::MissingRequiredArgument(name) => assert_eq!(name, "name"),
        other => panic!("expected MissingRequiredArgument, got {other:?}"),
    }
    let wire = err.into_error_object();
    assert_eq!(wire.code, INVALID_PARAMS_CODE);
    assert!(wire.message.contains("name"));
}

#[tokio::test]
async fn first_unknown_argument_is_named() {
    let err = call_greet(args(&[("name", json!("Ada")), ("extra", json!(1))]))
        .await
        .expect_err("must fail");
    match &err {
        HandlerError::UnknownArgument(name) => assert_eq!(name, "extra"),
        other => panic!("expected UnknownArgument, got {other:?}"),
    }
    let wire = err.into_error_object();
    assert_eq!(wire.code, INVALID_PARAMS_CODE);
    assert!(wire.message.contains("extra"));
}

#[tokio::test]
async fn unknown_arguments_report_in_incoming_key_order() {
    let err = call_greet(args(&[
        ("zz", json!(1)),
        ("aa", json!(2)),
        ("name", json!("Ada")),
    ]))
    .await
    .expect_err("must fail");
    match err {
        HandlerError::UnknownArgument(name) => assert_eq!(name, "zz"),
        other => panic!("expected UnknownArgument, got {other:?}"),
    }
}

#[tokio::test]
async fn exactly_the_known_keys_never_raise_unknown_argument() {
    let result = call_greet(args(&[("name", json!("Ada")), ("style", json!("warm"))]))
        .await
        .expect("all known keys are accepted");
    assert_eq!(result.description.as_deref(), Some("warm greeting"));
}

#[tokio::test]
async fn wrongly_typed_argument_is_invalid_params() {
    let err = call_greet(args(&[("name", json!(42))]))
        .await
        .expect_err("must fail");
    assert!(matches!(err, HandlerError::InvalidParams(_)), "got {err:?}");
}

// ---------------------------------------------------------------------
// Optional-parameter dispatch
// ---------------------------------------------------------------------

#[tokio::test]
async fn absent_optional_takes_the_declared_default() {
    let result = call_greet(args(&[("name", json!("Q"))]))
        .await
        .expect("call succeeds");
    assert_eq!(result.description.as_deref(), Some("plain greeting"));
}

#[tokio::test]
async fn present_optional_overrides_the_default() {
    let result = call_greet(args(&[("name", json!("Q")), ("style", json!("formal"))]))
        .await
        .expect("call succeeds");
    assert_eq!(result.description.as_deref(), Some("formal greeting"));
}

#[tokio::test]
async fn every_optional_combination_dispatches() {
    let cases: [(&[(&str, Value)], &str); 4] = [
        (&[("name", json!("N"))], "Goodbye N!"),
        (
            &[("name", json!("N")), ("flourish", json!("and thanks"))],
            "Goodbye N and thanks!",
        ),
        (
            &[("name", json!("N")), ("punctuation", json!("?"))],
            "Goodbye N?",
        ),
        (
            &[
                ("name", json!("N")),
                ("flourish", json!("and thanks")),
                ("punctuation", json!("?")),
            ],
            "Goodbye N and thanks?",
        ),
    ];
    for (arguments, expected) in cases {
        let result = call_farewell(args(arguments)).await.expect("call succeeds");
        assert_eq!(prompt_text(&result), expected);
    }
}

#[tokio::test]
async fn pure_handlers_are_idempotent() {
    let input = args(&[("name", json!("Ada")), ("style", json!("warm"))]);
    let first = call_greet(input.clone()).await.expect("first call");
    let second = call_greet(input).await.expect("second call");
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------
// End to end through a server peer
// ---------------------------------------------------------------------

#[tokio::test]
async fn prompts_get_round_trips_over_the_wire() -> anyhow::Result<()> {
    let client = connect();
    let result = client
        .get_prompt(
            "greet".to_string(),
            Some(args(&[("name", json!("Ada"))])),
            Some(TIMEOUT),
        )
        .await?;
    assert_eq!(result.description.as_deref(), Some("plain greeting"));
    assert!(prompt_text(&result).contains("Ada"));
    Ok(())
}

#[tokio::test]
async fn prompt_argument_errors_surface_as_invalid_params() -> anyhow::Result<()> {
    let client = connect();

    let err = client
        .get_prompt("greet".to_string(), Some(args(&[])), Some(TIMEOUT))
        .await
        .expect_err("missing required argument");
    let PeerError::Protocol(err) = err else {
        anyhow::bail!("expected a protocol error, got {err:?}");
    };
    assert_eq!(err.code, INVALID_PARAMS_CODE);
    assert!(err.message.contains("name"));

    let err = client
        .get_prompt(
            "greet".to_string(),
            Some(args(&[("name", json!("A")), ("extra", json!(1))])),
            Some(TIMEOUT),
        )
        .await
        .expect_err("unknown argument");
    let PeerError::Protocol(err) = err else {
        anyhow::bail!("expected a protocol error, got {err:?}");
    };
    assert_eq!(err.code, INVALID_PARAMS_CODE);
    assert!(err.message.contains("extra"));
    Ok(())
}

#[tokio::test]
async fn unknown_prompt_is_invalid_params() -> anyhow::Result<()> {
    let client = connect();
    let err = client
        .get_prompt("no_such_prompt".to_string(), None, Some(TIMEOUT))
        .await
        .expect_err("unknown prompt");
    let PeerError::Protocol(err) = err else {
        anyhow::bail!("expected a protocol error, got {err:?}");
    };
    assert_eq!(err.code, INVALID_PARAMS_CODE);
    assert!(err.message.contains("no_such_prompt"));
    Ok(())
}

#[tokio::test]
async fn tools_call_round_trips_over_the_wire() -> anyhow::Result<()> {
    let client = connect();

    let result = client
        .call_tool(
            "add".to_string(),
            Some(args(&[("a", json!(1)), ("b", json!(2))])),
            Some(TIMEOUT),
        )
        .await?;
    assert_eq!(tool_text(&result), "3");
    assert_eq!(result.is_error, None);

    let result = client
        .call_tool(
            "add".to_string(),
            Some(args(&[("a", json!(1)), ("b", json!(2)), ("scale", json!(10))])),
            Some(TIMEOUT),
        )
        .await?;
    assert_eq!(tool_text(&result), "30");
    Ok(())
}

#[tokio::test]
async fn tool_missing_argument_surfaces_as_invalid_params() -> anyhow::Result<()> {
    let client = connect();
    let err = client
        .call_tool(
            "add".to_string(),
            Some(args(&[("a", json!(1))])),
            Some(TIMEOUT),
        )
        .await
        .expect_err("missing argument");
    let PeerError::Protocol(err) = err else {
        anyhow::bail!("expected a protocol error, got {err:?}");
    };
    assert_eq!(err.code, INVALID_PARAMS_CODE);
    assert!(err.message.contains("b"));
    Ok(())
}

#[tokio::test]
async fn unknown_tool_returns_an_error_result() -> anyhow::Result<()> {
    let client = connect();
    let result = client
        .call_tool("bogus".to_string(), None, Some(TIMEOUT))
        .await?;
    assert_eq!(result.is_error, Some(true));
    assert!(tool_text(&result).contains("Unknown tool"));
    Ok(())
}

#[tokio::test]
async fn fallible_tool_errors_map_to_internal_error() -> anyhow::Result<()> {
    let client = connect();

    let result = client
        .call_tool(
            "echo".to_string(),
            Some(args(&[("text", json!("hi"))])),
            Some(TIMEOUT),
        )
        .await?;
    assert_eq!(tool_text(&result), "hi");

    let err = client
        .call_tool(
            "echo".to_string(),
            Some(args(&[("text", json!(""))])),
            Some(TIMEOUT),
        )
        .await
        .expect_err("empty input fails");
    let PeerError::Protocol(err) = err else {
        anyhow::bail!("expected a protocol error, got {err:?}");
    };
    assert_eq!(err.code, INTERNAL_ERROR_CODE);
    assert!(err.message.contains("nothing to echo"));
    Ok(())
}

#[tokio::test]
async fn listings_and_capabilities_reflect_the_registries() -> anyhow::Result<()> {
    let client = connect();

    let init = client
        .initialize(
            mcp_types::InitializeRequestParams {
                capabilities: mcp_types::ClientCapabilities::default(),
                client_info: mcp_types::Implementation {
                    name: "test-client".to_string(),
                    version: "1".to_string(),
                },
                protocol_version: mcp_types::MCP_SCHEMA_VERSION.to_string(),
            },
            Some(TIMEOUT),
        )
        .await?;
    assert!(init.capabilities.prompts.is_some());
    assert!(init.capabilities.tools.is_some());

    let prompts = client.list_prompts(None, Some(TIMEOUT)).await?;
    let names: Vec<&str> = prompts.prompts.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["farewell", "greet"]);
    assert_eq!(prompts.next_cursor, None);

    let tools = client.list_tools(None, Some(TIMEOUT)).await?;
    let names: Vec<&str> = tools.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["add", "echo"]);
    Ok(())
}
