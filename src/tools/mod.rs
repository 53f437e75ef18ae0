//! Tools the reasoning backend can call
//!
//! Each tool declares its parameters and returns plain text. Failures a model
//! can recover from come back as text so the conversation keeps going.

mod debug_cmd;
mod read_file;
mod registry;

pub use debug_cmd::DebugCommandTool;
pub use read_file::ReadFileTool;
pub use registry::ToolRegistry;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::session::CommandRunner;

/// A tool that can be called by the LLM
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (matches the backend's tool call name)
    fn name(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    fn parameters(&self) -> Vec<ParamSpec>;

    /// Execute with arguments already checked against `parameters()`
    async fn execute(&self, args: &Value, ctx: &ToolContext<'_>) -> eyre::Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::String => write!(f, "string"),
            ParamKind::Integer => write!(f, "integer"),
        }
    }
}

impl ParamKind {
    /// Integers may also arrive as numeric strings
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Integer => as_integer(value).is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: true,
        }
    }
}

/// JSON schema for a parameter list
pub fn input_schema(params: &[ParamSpec]) -> Value {
    let mut properties = Map::new();
    for param in params {
        properties.insert(
            param.name.to_string(),
            json!({ "type": param.kind.to_string(), "description": param.description }),
        );
    }
    let required: Vec<&str> = params.iter().filter(|p| p.required).map(|p| p.name).collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

/// Read an integer argument, tolerating numeric strings
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// What a tool may touch while it runs
pub struct ToolContext<'a> {
    pub runner: &'a CommandRunner,
    /// Base for relative source paths
    pub source_root: Option<PathBuf>,
}

impl<'a> ToolContext<'a> {
    pub fn new(runner: &'a CommandRunner) -> Self {
        Self {
            runner,
            source_root: None,
        }
    }

    pub fn with_source_root(mut self, root: Option<PathBuf>) -> Self {
        self.source_root = root;
        self
    }

    /// Resolve a path given by the model
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.source_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_schema() {
        let schema = input_schema(&[
            ParamSpec::required("file_path", ParamKind::String, "Path"),
            ParamSpec::required("start_line", ParamKind::Integer, "First line"),
        ]);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["start_line"]["type"], "integer");
        assert_eq!(schema["required"], json!(["file_path", "start_line"]));
        assert_eq!(schema["additionalProperties"], false);
    }

    #[test]
    fn test_as_integer() {
        assert_eq!(as_integer(&json!(12)), Some(12));
        assert_eq!(as_integer(&json!(12.0)), Some(12));
        assert_eq!(as_integer(&json!(" 7 ")), Some(7));
        assert_eq!(as_integer(&json!(1.5)), None);
        assert_eq!(as_integer(&json!("ten")), None);
        assert_eq!(as_integer(&Value::Null), None);
    }

    #[test]
    fn test_param_kind_accepts() {
        assert!(ParamKind::String.accepts(&json!("bt")));
        assert!(!ParamKind::String.accepts(&json!(3)));
        assert!(ParamKind::Integer.accepts(&json!("3")));
    }
}
