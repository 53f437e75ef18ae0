//! Debug agent - bounded tool-calling loop over the reasoning backend.
//!
//! Each iteration:
//! 1. Checks every earlier tool call has its answer in the transcript
//! 2. Calls the backend with the full transcript and the tool schemas
//! 3. Appends the assistant message
//! 4. With no tool calls: done, the content is the answer
//! 5. Otherwise runs each tool call in order and appends one tool message per call
//!
//! The loop ends after `max_iterations` backend calls even if the backend
//! keeps asking for tools.

use log::{debug, info, warn};
use tokio::sync::mpsc;

use super::prompt::load_system_prompt;
use super::transcript::Transcript;
use crate::config::AgentConfig;
use crate::error::{Result, SleuthError};
use crate::llm::{CompletionRequest, LlmClient, Message, Usage};
use crate::tools::{ToolContext, ToolRegistry};

/// How a question finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    /// The backend replied without tool calls
    Answered,
    /// The iteration cap was reached first
    IterationCap,
}

#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// Final answer, or the latest assistant text when capped
    pub answer: String,
    /// Backend calls made
    pub iterations: u32,
    pub finish: Finish,
    pub transcript: Transcript,
    pub usage: Usage,
}

/// Progress notifications for the terminal
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Thinking { iteration: u32 },
    /// Text accompanying tool calls; the final answer is in `AgentOutcome`
    Assistant(String),
    ToolStarted { name: String, input: serde_json::Value },
    ToolFinished { name: String, output: String },
}

pub struct DebugAgent {
    client: Box<dyn LlmClient>,
    registry: ToolRegistry,
    system_prompt: String,
    max_iterations: u32,
    max_tokens: Option<u32>,
    events: Option<mpsc::UnboundedSender<AgentEvent>>,
}

impl DebugAgent {
    pub fn new(client: Box<dyn LlmClient>, registry: ToolRegistry, config: &AgentConfig) -> Result<Self> {
        Ok(Self {
            client,
            registry,
            system_prompt: load_system_prompt(config.system_prompt_path.as_deref())?,
            max_iterations: config.max_iterations,
            max_tokens: None,
            events: None,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<AgentEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.events {
            // Receiver gone means nobody is watching
            let _ = tx.send(event);
        }
    }

    /// Answer one question with a fresh transcript.
    ///
    /// Tool failures are fed back to the backend. Backend and transport
    /// failures end the question with an error.
    pub async fn ask(&self, question: &str, ctx: &ToolContext<'_>) -> Result<AgentOutcome> {
        info!("Analyzing: {}", question);
        ctx.runner.log().note(&format!("Analyzing: {}", question));

        let mut transcript = Transcript::new(&self.system_prompt, question);
        let tools = self.registry.definitions();
        let mut usage = Usage::default();
        let mut iterations = 0;

        while iterations < self.max_iterations {
            let unresolved = transcript.unresolved_tool_calls();
            if !unresolved.is_empty() {
                return Err(SleuthError::Internal(format!(
                    "tool calls without results: {}",
                    unresolved.join(", ")
                )));
            }

            iterations += 1;
            self.emit(AgentEvent::Thinking { iteration: iterations });

            let mut request = CompletionRequest::new(transcript.messages().to_vec()).with_tools(tools.clone());
            request.max_tokens = self.max_tokens;

            let response = self.client.complete(request).await?;
            usage.add(&response.usage);
            debug!(
                "Iteration {}: {} tool calls, stop reason {:?}",
                iterations,
                response.tool_calls.len(),
                response.stop_reason
            );

            transcript.push(response.to_message());

            if response.tool_calls.is_empty() {
                info!("Answered after {} iterations", iterations);
                return Ok(AgentOutcome {
                    answer: response.content,
                    iterations,
                    finish: Finish::Answered,
                    transcript,
                    usage,
                });
            }

            if !response.content.trim().is_empty() {
                self.emit(AgentEvent::Assistant(response.content.clone()));
            }

            for call in &response.tool_calls {
                self.emit(AgentEvent::ToolStarted {
                    name: call.name.clone(),
                    input: call.input.clone(),
                });
                let output = self.registry.dispatch(call, ctx).await?;
                self.emit(AgentEvent::ToolFinished {
                    name: call.name.clone(),
                    output: output.clone(),
                });
                transcript.push(Message::tool(&call.id, output));
            }
        }

        warn!("Stopped after reaching the cap of {} iterations", self.max_iterations);
        Ok(AgentOutcome {
            answer: transcript.last_assistant_text().unwrap_or_default().to_string(),
            iterations,
            finish: Finish::IterationCap,
            transcript,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CorrelatorConfig;
    use crate::llm::{CompletionResponse, MockLlmClient, Role, ToolCall};
    use crate::session::{CommandRunner, SessionLog};
    use crate::transport::ScriptedTransport;
    use serde_json::json;

    fn runner(t: ScriptedTransport) -> CommandRunner {
        let settings = CorrelatorConfig {
            poll_interval_ms: 2,
            ready_timeout_ms: 50,
            command_timeout_ms: 50,
        };
        CommandRunner::new(Box::new(t), SessionLog::disabled(), settings)
    }

    fn agent(client: &MockLlmClient, max_iterations: u32) -> DebugAgent {
        let config = AgentConfig {
            max_iterations,
            system_prompt_path: None,
        };
        DebugAgent::new(Box::new(client.clone()), ToolRegistry::standard(), &config).unwrap()
    }

    fn cmd_call(id: &str, cmd: &str) -> ToolCall {
        ToolCall::new(id, "run_debug_cmd", json!({ "cmd": cmd }))
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let client = MockLlmClient::new([CompletionResponse::text("It segfaulted in main.")]);
        let runner = runner(ScriptedTransport::new());
        let outcome = agent(&client, 10).ask("why?", &ToolContext::new(&runner)).await.unwrap();

        assert_eq!(outcome.finish, Finish::Answered);
        assert_eq!(outcome.answer, "It segfaulted in main.");
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.transcript.len(), 3);

        let request = &client.requests()[0];
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.tools.len(), 2);
    }

    #[tokio::test]
    async fn test_tool_results_precede_next_call() {
        let client = MockLlmClient::new([
            CompletionResponse::tools("Checking", vec![cmd_call("a", "bt"), cmd_call("b", "info locals")]),
            CompletionResponse::text("Null pointer in parse()."),
        ]);
        let t = ScriptedTransport::new()
            .on("bt", ["~\"#0  parse ()\\n\"", "^done"])
            .on("info locals", ["~\"p = 0x0\\n\"", "^done"]);
        let written = t.written();
        let runner = runner(t);

        let outcome = agent(&client, 10).ask("why?", &ToolContext::new(&runner)).await.unwrap();
        assert_eq!(outcome.answer, "Null pointer in parse().");
        assert_eq!(*written.lock().unwrap(), vec!["bt", "info locals"]);

        let second = &client.requests()[1];
        let tail: Vec<_> = second.messages.iter().skip(2).collect();
        assert_eq!(tail[0].tool_calls.len(), 2);
        assert_eq!(tail[1].tool_call_id.as_deref(), Some("a"));
        assert_eq!(tail[1].content, "#0  parse ()\n");
        assert_eq!(tail[2].tool_call_id.as_deref(), Some("b"));
        assert_eq!(tail[2].content, "p = 0x0\n");
    }

    #[tokio::test]
    async fn test_runaway_backend_is_capped() {
        let client = MockLlmClient::new([CompletionResponse::tools("Still looking", vec![cmd_call("x", "next")])]);
        let runner = runner(ScriptedTransport::new().on("next", ["^done"]));

        let outcome = agent(&client, 10).ask("why?", &ToolContext::new(&runner)).await.unwrap();
        assert_eq!(outcome.finish, Finish::IterationCap);
        assert_eq!(outcome.iterations, 10);
        assert_eq!(client.call_count(), 10);
        assert_eq!(outcome.answer, "Still looking");
        assert!(outcome.transcript.unresolved_tool_calls().is_empty());
    }

    #[tokio::test]
    async fn test_zero_cap_makes_no_calls() {
        let client = MockLlmClient::new([CompletionResponse::text("unused")]);
        let runner = runner(ScriptedTransport::new());
        let outcome = agent(&client, 0).ask("why?", &ToolContext::new(&runner)).await.unwrap();
        assert_eq!(outcome.finish, Finish::IterationCap);
        assert_eq!(client.call_count(), 0);
        assert!(outcome.answer.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_fed_back() {
        let client = MockLlmClient::new([
            CompletionResponse::tools("", vec![ToolCall::new("u", "list_breakpoints", json!({}))]),
            CompletionResponse::text("done"),
        ]);
        let runner = runner(ScriptedTransport::new());
        let outcome = agent(&client, 10).ask("why?", &ToolContext::new(&runner)).await.unwrap();
        assert_eq!(outcome.finish, Finish::Answered);
        let tool_msg = &outcome.transcript.messages()[3];
        assert_eq!(tool_msg.content, "Unknown function: list_breakpoints");
    }

    #[tokio::test]
    async fn test_backend_failure_is_fatal() {
        let client = MockLlmClient::new([CompletionResponse::tools("", vec![cmd_call("a", "bt")])]).then_fail("503");
        let runner = runner(ScriptedTransport::new().on("bt", ["^done"]));
        let err = agent(&client, 10).ask("why?", &ToolContext::new(&runner)).await.unwrap_err();
        assert!(matches!(err, SleuthError::Backend(_)));
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_is_fatal() {
        let client = MockLlmClient::new([CompletionResponse::tools("", vec![cmd_call("a", "bt")])]);
        let runner = runner(ScriptedTransport::new().failing_writes());
        let err = agent(&client, 10).ask("why?", &ToolContext::new(&runner)).await.unwrap_err();
        assert!(matches!(err, SleuthError::Transport(_)));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_events_reported() {
        let client = MockLlmClient::new([
            CompletionResponse::tools("Let me see", vec![cmd_call("a", "bt")]),
            CompletionResponse::text("Found it"),
        ]);
        let runner = runner(ScriptedTransport::new().on("bt", ["~\"#0 main\\n\"", "^done"]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let agent = agent(&client, 10).with_events(tx);
        agent.ask("why?", &ToolContext::new(&runner)).await.unwrap();
        drop(agent);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                AgentEvent::Thinking { iteration: 1 },
                AgentEvent::Assistant("Let me see".to_string()),
                AgentEvent::ToolStarted {
                    name: "run_debug_cmd".to_string(),
                    input: json!({"cmd": "bt"})
                },
                AgentEvent::ToolFinished {
                    name: "run_debug_cmd".to_string(),
                    output: "#0 main\n".to_string()
                },
                AgentEvent::Thinking { iteration: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn test_usage_accumulates() {
        let mut first = CompletionResponse::tools("", vec![cmd_call("a", "bt")]);
        first.usage = Usage::new(100, 10);
        let mut second = CompletionResponse::text("ok");
        second.usage = Usage::new(150, 20);
        let client = MockLlmClient::new([first, second]);
        let runner = runner(ScriptedTransport::new().on("bt", ["^done"]));
        let outcome = agent(&client, 10).ask("why?", &ToolContext::new(&runner)).await.unwrap();
        assert_eq!(outcome.usage, Usage::new(250, 30));
    }
}
