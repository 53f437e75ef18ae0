//! End-to-end analysis tests
//!
//! Drives a full session over a scripted debugger with a mock backend.

use rrsleuth::agent::{DebugAgent, Finish};
use rrsleuth::config::{AgentConfig, CorrelatorConfig};
use rrsleuth::error::Result;
use rrsleuth::llm::{CompletionResponse, MockLlmClient, Role, ToolCall};
use rrsleuth::session::{Session, SessionLog};
use rrsleuth::tools::{ToolContext, ToolRegistry};
use rrsleuth::transport::ScriptedTransport;
use serde_json::json;
use tempfile::TempDir;

fn settings() -> CorrelatorConfig {
    CorrelatorConfig {
        poll_interval_ms: 2,
        ready_timeout_ms: 200,
        command_timeout_ms: 200,
    }
}

fn crashed_debugger() -> ScriptedTransport {
    ScriptedTransport::new()
        .initially([
            "=thread-group-added,id=\"i1\"",
            "~\"Reading symbols from graphd...\\n\"",
            "*stopped,reason=\"signal-received\",signal-name=\"SIGSEGV\",frame={func=\"parse\"}",
            "(gdb) ",
        ])
        .on(
            "bt 128",
            [
                "&\"bt 128\\n\"",
                "~\"#0  \\033[33mparse\\033[m (p=0x0) at parser.c:17\\n\"",
                "",
                "~\"#1  0x0000555d in main () at graphd.c:42\\n\"",
                "^done",
                "(gdb) ",
            ],
        )
}

fn agent(client: &MockLlmClient, max_iterations: u32) -> DebugAgent {
    let config = AgentConfig {
        max_iterations,
        system_prompt_path: None,
    };
    DebugAgent::new(Box::new(client.clone()), ToolRegistry::standard(), &config).unwrap()
}

/// Integration test: a backtrace request flows through the whole stack
#[tokio::test]
async fn test_question_answered_from_backtrace() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let log_path = temp_dir.path().join("logs").join("session.log");
    std::fs::write(temp_dir.path().join("parser.c"), "int x;\nint y;\nint *p = 0;\n")?;

    let session = Session::attach(Box::new(crashed_debugger()), settings(), SessionLog::open(&log_path)?).await?;
    assert!(session.startup_text().contains("Reading symbols"));

    let client = MockLlmClient::new([
        CompletionResponse::tools(
            "Let me look at the stack.",
            vec![
                ToolCall::new("c1", "run_debug_cmd", json!({"cmd": "bt 128"})),
                ToolCall::new("c2", "read_file", json!({"file_path": "parser.c", "start_line": 3, "end_line": 3})),
            ],
        ),
        CompletionResponse::text("parse() dereferenced a null pointer p."),
    ]);
    let ctx = ToolContext::new(session.runner()).with_source_root(Some(temp_dir.path().to_path_buf()));
    let outcome = agent(&client, 10).ask("Why did the program crash?", &ctx).await?;

    assert_eq!(outcome.finish, Finish::Answered);
    assert_eq!(outcome.answer, "parse() dereferenced a null pointer p.");
    assert_eq!(outcome.iterations, 2);

    // The second request sees both tool results, in call order, free of escapes
    let second = &client.requests()[1];
    let tool_messages: Vec<_> = second.messages.iter().filter(|m| m.role == Role::Tool).collect();
    assert_eq!(tool_messages.len(), 2);
    assert_eq!(tool_messages[0].tool_call_id.as_deref(), Some("c1"));
    assert_eq!(
        tool_messages[0].content,
        "#0  parse (p=0x0) at parser.c:17\n#1  0x0000555d in main () at graphd.c:42\n"
    );
    assert_eq!(tool_messages[1].content, "   3: int *p = 0;");

    let history = session.log().history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].command, "bt 128");

    session.close().await?;

    let written = std::fs::read_to_string(&log_path)?;
    assert!(written.contains("Analyzing: Why did the program crash?"));
    assert!(written.contains("Executing command: bt 128"));
    Ok(())
}

/// Integration test: a backend that never stops asking is capped
#[tokio::test]
async fn test_runaway_backend_is_capped() -> Result<()> {
    let session = Session::attach(Box::new(crashed_debugger()), settings(), SessionLog::disabled()).await?;
    let client = MockLlmClient::new([CompletionResponse::tools(
        "Still looking",
        vec![ToolCall::new("c", "run_debug_cmd", json!({"cmd": "bt 128"}))],
    )]);

    let outcome = agent(&client, 3).ask("Why?", &ToolContext::new(session.runner())).await?;

    assert_eq!(outcome.finish, Finish::IterationCap);
    assert_eq!(outcome.iterations, 3);
    assert_eq!(client.call_count(), 3);
    assert_eq!(outcome.answer, "Still looking");
    assert_eq!(session.log().history().len(), 3);

    session.close().await
}

/// Integration test: debugger errors reach the backend as text
#[tokio::test]
async fn test_debugger_error_fed_back() -> Result<()> {
    let session = Session::attach(Box::new(crashed_debugger()), settings(), SessionLog::disabled()).await?;
    let client = MockLlmClient::new([
        CompletionResponse::tools("", vec![ToolCall::new("c", "run_debug_cmd", json!({"cmd": "frobnicate"}))]),
        CompletionResponse::text("done"),
    ]);

    agent(&client, 5).ask("Why?", &ToolContext::new(session.runner())).await?;

    let second = &client.requests()[1];
    let result = second.messages.iter().find(|m| m.role == Role::Tool).unwrap();
    assert!(result.content.starts_with("error: Undefined command"), "{}", result.content);

    session.close().await
}
