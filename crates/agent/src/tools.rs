use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use opshub_core::domain::chat::ToolDefinition;

/// Raised by a tool when the model's arguments do not fit its schema.
/// The runtime reports it as invalid arguments rather than a tool failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolInputError {
    #[error("missing string argument `{0}`")]
    Missing(&'static str),
    #[error("invalid argument `{name}`: {detail}")]
    Invalid { name: &'static str, detail: String },
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the argument object.
    fn parameters(&self) -> Value;
    async fn execute(&self, input: Value) -> Result<Value>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(self.name(), self.description(), self.parameters())
    }
}

/// Tools keyed by name. Iteration is alphabetical so the definitions sent
/// to the model are stable across requests.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(Box::as_ref)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

pub fn required_str<'a>(input: &'a Value, name: &'static str) -> Result<&'a str, ToolInputError> {
    input
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ToolInputError::Missing(name))
}
