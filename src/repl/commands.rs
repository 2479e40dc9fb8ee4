//! Command parsing for the REPL
//!
//! Commands may be typed bare (`clear`) or slash-prefixed (`/clear`).
//! Anything that is not a command is a chat turn.

/// Words offered by tab completion
pub const COMMANDS: &[&str] = &["help", "reasoning", "clear", "model", "quit", "exit"];

/// One parsed line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    ToggleReasoning,
    Clear,
    /// `model <selector>`
    Model(String),
    Help,
    Chat(String),
}

impl ReplCommand {
    /// Parse a non-empty, trimmed input line
    pub fn parse(line: &str) -> Self {
        let bare = line.strip_prefix('/').unwrap_or(line);
        let (word, arg) = match bare.split_once(char::is_whitespace) {
            Some((word, arg)) => (word, arg.trim()),
            None => (bare, ""),
        };

        match (word.to_lowercase().as_str(), arg.is_empty()) {
            ("quit" | "exit", true) => Self::Quit,
            ("reasoning", true) => Self::ToggleReasoning,
            ("clear", true) => Self::Clear,
            ("help", true) => Self::Help,
            ("model", false) => Self::Model(arg.to_string()),
            _ => Self::Chat(line.to_string()),
        }
    }
}

/// Help text for the command list
pub fn help_text() -> &'static str {
    "Commands:
  model <name>   - Change the response model (ollama:<model> for local)
  reasoning      - Toggle reasoning visibility
  clear          - Clear conversation history
  help           - Show this help
  quit           - Exit"
}
