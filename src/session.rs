//! Conversation state for one chat session
//!
//! Everything a turn reads or mutates lives in one `ConversationState`,
//! passed explicitly by `&mut`. Nothing is persisted.

use serde::{Deserialize, Serialize};

use crate::router::ModelSelector;

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Append-only message history for one backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
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

    fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Per-session state: both backend logs, the active model and display flags
#[derive(Debug, Clone)]
pub struct ConversationState {
    reasoning_log: MessageLog,
    response_log: MessageLog,
    selector: ModelSelector,
    local_reasoning: bool,
    show_reasoning: bool,
}

impl ConversationState {
    /// Fresh state. Selector changes go through `BackendRouter::set_model`.
    pub(crate) fn new(selector: ModelSelector, local_reasoning: bool) -> Self {
        Self {
            reasoning_log: MessageLog::new(),
            response_log: MessageLog::new(),
            selector,
            local_reasoning,
            show_reasoning: true,
        }
    }

    pub fn reasoning_log(&self) -> &MessageLog {
        &self.reasoning_log
    }

    pub fn response_log(&self) -> &MessageLog {
        &self.response_log
    }

    pub(crate) fn reasoning_log_mut(&mut self) -> &mut MessageLog {
        &mut self.reasoning_log
    }

    pub(crate) fn response_log_mut(&mut self) -> &mut MessageLog {
        &mut self.response_log
    }

    pub fn selector(&self) -> &ModelSelector {
        &self.selector
    }

    /// True when the selector asks for the local reasoning model
    pub fn local_reasoning(&self) -> bool {
        self.local_reasoning
    }

    pub(crate) fn apply_selector(&mut self, selector: ModelSelector, local_reasoning: bool) {
        self.selector = selector;
        self.local_reasoning = local_reasoning;
    }

    pub fn show_reasoning(&self) -> bool {
        self.show_reasoning
    }

    pub fn set_show_reasoning(&mut self, show: bool) {
        self.show_reasoning = show;
    }

    /// Flip reasoning visibility, returning the new value
    pub fn toggle_reasoning(&mut self) -> bool {
        self.show_reasoning = !self.show_reasoning;
        self.show_reasoning
    }

    /// Empty both logs
    pub fn clear(&mut self) {
        self.reasoning_log.clear();
        self.response_log.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ConversationState {
        ConversationState::new(ModelSelector::new("ollama:qwen2.5:14b"), false)
    }

    #[test]
    fn test_message_serialize() {
        let json = serde_json::to_string(&Message::user("Hello")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"Hello"}"#);
    }

    #[test]
    fn test_clear_empties_both_logs() {
        let mut state = state();
        state.reasoning_log_mut().push(Message::user("q"));
        state.reasoning_log_mut().push(Message::assistant("a"));
        state.response_log_mut().push(Message::user("prompt"));

        state.clear();
        assert!(state.reasoning_log().is_empty());
        assert!(state.response_log().is_empty());
        // Selector and flags survive a clear
        assert_eq!(state.selector().as_str(), "ollama:qwen2.5:14b");
        assert!(state.show_reasoning());
    }

    #[test]
    fn test_toggle_reasoning() {
        let mut state = state();
        assert!(!state.toggle_reasoning());
        assert!(state.toggle_reasoning());
    }
}
