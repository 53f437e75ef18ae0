//! read_file tool - Read an inclusive line range with line numbers

use async_trait::async_trait;
use eyre::{WrapErr, eyre};
use serde_json::Value;

use super::{ParamKind, ParamSpec, Tool, ToolContext, as_integer};

pub struct ReadFileTool;

/// Render lines `start..=end` (1-indexed) of `content`, clamped to the file
pub fn number_lines(content: &str, start: i64, end: i64) -> Option<String> {
    let lines: Vec<&str> = content.lines().collect();
    let first = start.max(1) as usize;
    let last = end.min(lines.len() as i64);
    if last < 1 || first as i64 > last {
        return None;
    }

    let numbered: Vec<String> = lines[first - 1..last as usize]
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>4}: {}", first + i, line))
        .collect();
    Some(numbered.join("\n"))
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Read source code from a file between specified line numbers"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("file_path", ParamKind::String, "Path to the file to read"),
            ParamSpec::required("start_line", ParamKind::Integer, "Starting line number (1-indexed)"),
            ParamSpec::required("end_line", ParamKind::Integer, "Ending line number (1-indexed, inclusive)"),
        ]
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext<'_>) -> eyre::Result<String> {
        let path = args["file_path"].as_str().ok_or_else(|| eyre!("file_path is required"))?;
        let start = as_integer(&args["start_line"]).ok_or_else(|| eyre!("start_line is required"))?;
        let end = as_integer(&args["end_line"]).ok_or_else(|| eyre!("end_line is required"))?;

        let full_path = ctx.resolve(path);
        let bytes = tokio::fs::read(&full_path)
            .await
            .wrap_err_with(|| format!("Failed to read file '{}'", full_path.display()))?;
        let content = String::from_utf8_lossy(&bytes);

        if start > end {
            return Ok(format!(
                "Invalid range {}-{}: start_line must not be greater than end_line",
                start, end
            ));
        }

        match number_lines(&content, start, end) {
            Some(text) => Ok(text),
            None => Ok(format!(
                "Lines {}-{} are outside '{}', which has {} lines",
                start,
                end,
                path,
                content.lines().count()
            )),
        }
    }
}
