//! Tool registry - registration, schemas and dispatch by name

use log::{debug, warn};
use serde_json::Value;

use super::{DebugCommandTool, ParamSpec, ReadFileTool, Tool, ToolContext, input_schema};
use crate::error::{Result, SleuthError};
use crate::llm::{ToolCall, ToolDefinition};

/// Registered tools, kept in registration order
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry with `run_debug_cmd` and `read_file`
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add_tool(Box::new(DebugCommandTool));
        registry.add_tool(Box::new(ReadFileTool));
        registry
    }

    /// Create an empty registry (for custom tool sets)
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Add a tool, replacing any tool with the same name
    pub fn add_tool(&mut self, tool: Box<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(i) => self.tools[i] = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Get tool definitions for the backend
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition::new(t.name(), t.description(), input_schema(&t.parameters())))
            .collect()
    }

    fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| &**t)
    }

    /// Execute a tool call and render the outcome as text.
    ///
    /// Unknown names, bad arguments and recoverable handler errors come back
    /// as text. Anything else is returned as an error.
    pub async fn dispatch(&self, call: &ToolCall, ctx: &ToolContext<'_>) -> Result<String> {
        let Some(tool) = self.get(&call.name) else {
            warn!("Backend asked for unknown tool '{}'", call.name);
            return Ok(SleuthError::UnknownTool(call.name.clone()).to_string());
        };

        if let Err(e) = check_arguments(tool, &call.input) {
            debug!("Rejected arguments for {}: {}", call.name, e);
            return Ok(e.to_string());
        }

        match tool.execute(&call.input, ctx).await {
            Ok(output) => Ok(output),
            Err(report) => match report.downcast::<SleuthError>() {
                Ok(err) if !err.is_recoverable() => Err(err),
                Ok(err) => Ok(format!("Error: {}", err)),
                Err(report) => Ok(format!("Error: {:#}", report)),
            },
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn usage(name: &str, params: &[ParamSpec]) -> String {
    let args: Vec<String> = params.iter().map(|p| format!("{}: {}", p.name, p.kind)).collect();
    format!("{}({})", name, args.join(", "))
}

/// Check that required arguments are present and have the declared kind
fn check_arguments(tool: &dyn Tool, input: &Value) -> Result<()> {
    let params = tool.parameters();
    let empty = serde_json::Map::new();
    let args = match input {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => {
            return Err(SleuthError::ToolArgument(format!(
                "arguments must be an object. Usage: {}",
                usage(tool.name(), &params)
            )));
        }
    };

    let missing: Vec<&str> = params
        .iter()
        .filter(|p| p.required && args.get(p.name).is_none_or(Value::is_null))
        .map(|p| p.name)
        .collect();
    if !missing.is_empty() {
        return Err(SleuthError::ToolArgument(format!(
            "missing {}. Usage: {}",
            missing.join(", "),
            usage(tool.name(), &params)
        )));
    }

    for param in &params {
        let Some(value) = args.get(param.name).filter(|v| !v.is_null()) else {
            continue;
        };
        if !param.kind.accepts(value) {
            return Err(SleuthError::ToolArgument(format!(
                "{} must be {}, got {}. Usage: {}",
                param.name,
                param.kind,
                value,
                usage(tool.name(), &params)
            )));
        }
    }
    Ok(())
}
