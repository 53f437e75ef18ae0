//! Conversation state for one question

use std::collections::HashSet;

use crate::llm::{Message, Role, ToolCall};

/// Append-only list of messages exchanged while answering one question
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Seed with the system prompt and the question
    pub fn new(system_prompt: &str, question: &str) -> Self {
        Self {
            messages: vec![Message::system(system_prompt), Message::user(question)],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Every tool call requested so far, in order
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.messages.iter().flat_map(|m| m.tool_calls.iter())
    }

    /// Ids of tool calls that have no tool message answering them
    pub fn unresolved_tool_calls(&self) -> Vec<&str> {
        let answered: HashSet<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();

        self.tool_calls()
            .map(|c| c.id.as_str())
            .filter(|id| !answered.contains(id))
            .collect()
    }

    /// Most recent non-empty assistant text
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
            .find(|c| !c.trim().is_empty())
    }
}
