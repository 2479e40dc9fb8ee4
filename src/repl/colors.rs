//! ANSI color helpers for terminal output

/// ANSI escape codes
pub mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const MAGENTA: &str = "\x1b[35m";
    pub const CYAN: &str = "\x1b[36m";
}

use ansi::*;

/// Error line (red)
pub fn error(msg: &str) -> String {
    format!("{}{}{}", RED, msg, RESET)
}

/// Warning line (yellow)
pub fn warning(msg: &str) -> String {
    format!("{}{}{}", YELLOW, msg, RESET)
}

/// Command confirmation (magenta)
pub fn confirm(msg: &str) -> String {
    format!("{}{}{}", MAGENTA, msg, RESET)
}

/// Section header (bold blue)
pub fn header(msg: &str) -> String {
    format!("{}{}{}{}", BOLD, BLUE, msg, RESET)
}

/// Reasoning text (dim)
pub fn reasoning(text: &str) -> String {
    format!("{}{}{}", DIM, text, RESET)
}

/// Elapsed-time line (green)
pub fn elapsed(label: &str) -> String {
    format!("{}Thought for {}{}", GREEN, label, RESET)
}

/// Model name above a response (bold cyan)
pub fn model_name(model: &str) -> String {
    format!("{}{}{}:{}", BOLD, CYAN, model, RESET)
}

/// Startup banner line
pub fn banner_line(label: &str, value: &str) -> String {
    format!("{}{:<12}{} {}", DIM, label, RESET, value)
}

/// Startup banner accent
pub fn banner_accent(text: &str) -> String {
    format!("{}{}{}{}", BOLD, MAGENTA, text, RESET)
}

/// Horizontal rule
pub fn separator(width: usize) -> String {
    format!("{}{}{}", DIM, "─".repeat(width), RESET)
}
