//! Debugging agent - transcript, system prompt and the tool-calling loop

mod agent_loop;
mod prompt;
mod transcript;

pub use agent_loop::{AgentEvent, AgentOutcome, DebugAgent, Finish};
pub use prompt::{DEFAULT_SYSTEM_PROMPT, load_system_prompt};
pub use transcript::Transcript;
