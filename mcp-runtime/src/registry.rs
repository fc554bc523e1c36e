//! Process-wide prompt and tool registries.
//!
//! Generated code submits a registration per handler through `inventory`;
//! the registries are built once, lazily, before any peer serves traffic.
//! Names are unique per namespace: a duplicate aborts registry
//! construction, since two handlers silently shadowing each other is never
//! what anyone wants.

use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use mcp_types::CallToolResult;
use mcp_types::GetPromptResult;
use mcp_types::JsonObject;
use mcp_types::Prompt;
use mcp_types::Tool;

use crate::error::HandlerError;

/// Validates a JSON argument object and invokes the underlying prompt
/// function. Implementations are generated by `#[prompt]`.
#[async_trait]
pub trait PromptHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn descriptor(&self) -> Prompt;
    async fn call(&self, arguments: JsonObject) -> Result<GetPromptResult, HandlerError>;
}

/// Validates a JSON argument object and invokes the underlying tool
/// function. Implementations are generated by `#[tool]`.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn descriptor(&self) -> Tool;
    async fn call(&self, arguments: JsonObject) -> Result<CallToolResult, HandlerError>;
}

pub struct PromptRegistration {
    constructor: fn() -> Box<dyn PromptHandler>,
}

impl PromptRegistration {
    pub const fn new(constructor: fn() -> Box<dyn PromptHandler>) -> Self {
        Self { constructor }
    }
}

inventory::collect!(PromptRegistration);

pub struct ToolRegistration {
    constructor: fn() -> Box<dyn ToolHandler>,
}

impl ToolRegistration {
    pub const fn new(constructor: fn() -> Box<dyn ToolHandler>) -> Self {
        Self { constructor }
    }
}

inventory::collect!(ToolRegistration);

pub struct PromptRegistry {
    by_name: HashMap<&'static str, Box<dyn PromptHandler>>,
}

impl PromptRegistry {
    fn from_inventory() -> Self {
        let mut by_name: HashMap<&'static str, Box<dyn PromptHandler>> = HashMap::new();
        for registration in inventory::iter::<PromptRegistration> {
            let handler = (registration.constructor)();
            let name = handler.name();
            if by_name.insert(name, handler).is_some() {
                panic!("duplicate prompt registered: {name}");
            }
        }
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&dyn PromptHandler> {
        self.by_name.get(name).map(Box::as_ref)
    }

    /// Listing entries, ordered by name so `prompts/list` is deterministic.
    pub fn descriptors(&self) -> Vec<Prompt> {
        let mut descriptors: Vec<Prompt> =
            self.by_name.values().map(|h| h.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }
}

pub struct ToolRegistry {
    by_name: HashMap<&'static str, Box<dyn ToolHandler>>,
}

impl ToolRegistry {
    fn from_inventory() -> Self {
        let mut by_name: HashMap<&'static str, Box<dyn ToolHandler>> = HashMap::new();
        for registration in inventory::iter::<ToolRegistration> {
            let handler = (registration.constructor)();
            let name = handler.name();
            if by_name.insert(name, handler).is_some() {
                panic!("duplicate tool registered: {name}");
            }
        }
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&dyn ToolHandler> {
        self.by_name.get(name).map(Box::as_ref)
    }

    /// Listing entries, ordered by name so `tools/list` is deterministic.
    pub fn descriptors(&self) -> Vec<Tool> {
        let mut descriptors: Vec<Tool> = self.by_name.values().map(|h| h.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }
}

static PROMPTS: LazyLock<PromptRegistry> = LazyLock::new(PromptRegistry::from_inventory);
static TOOLS: LazyLock<ToolRegistry> = LazyLock::new(ToolRegistry::from_inventory);

/// All prompts registered in this process.
pub fn prompts() -> &'static PromptRegistry {
    &PROMPTS
}

/// All tools registered in this process.
pub fn tools() -> &'static ToolRegistry {
    &TOOLS
}
