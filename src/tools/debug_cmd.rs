//! run_debug_cmd tool - run one debugger command through the session

use async_trait::async_trait;
use eyre::eyre;
use log::warn;
use serde_json::Value;

use super::{ParamKind, ParamSpec, Tool, ToolContext};
use crate::error::SleuthError;
use crate::session::records_text;

/// Text returned when a command printed nothing
pub const NO_OUTPUT: &str = "(no output)";

pub struct DebugCommandTool;

#[async_trait]
impl Tool for DebugCommandTool {
    fn name(&self) -> &'static str {
        "run_debug_cmd"
    }

    fn description(&self) -> &'static str {
        "Run gdb/rr command like `print var`, `cont`, `reverse-cont`"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("cmd", ParamKind::String, "gdb/rr command to run")]
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext<'_>) -> eyre::Result<String> {
        let cmd = args["cmd"].as_str().ok_or_else(|| eyre!("cmd is required"))?;

        match ctx.runner.run(cmd).await {
            Ok(outcome) => {
                let text = outcome.text();
                if text.trim().is_empty() {
                    Ok(NO_OUTPUT.to_string())
                } else {
                    Ok(text)
                }
            }
            Err(e @ SleuthError::CorrelationTimeout { .. }) => {
                warn!("Command '{}' did not settle: {}", cmd, e);
                let partial = records_text(e.partial_records());
                let mut message = format!("Error executing command '{}': {}", cmd, e);
                if !partial.is_empty() {
                    message.push_str("\nPartial output:\n");
                    message.push_str(&partial);
                }
                Ok(message)
            }
            Err(e) => Err(e.into()),
        }
    }
}
