//! Rustyline helper with command completion and history hints

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::borrow::Cow;

use super::commands::COMMANDS;

pub struct JarvisHelper {
    hinter: HistoryHinter,
}

impl JarvisHelper {
    pub fn new() -> Self {
        Self {
            hinter: HistoryHinter::new(),
        }
    }
}

impl Default for JarvisHelper {
    fn default() -> Self {
        Self::new()
    }
}

/// Candidates for the first word of `line`, keeping a leading `/`
fn complete_command(line: &str, pos: usize) -> Vec<Pair> {
    let word_end = line.find(' ').unwrap_or(line.len());
    if pos > word_end {
        return Vec::new();
    }

    let (slash, typed) = match line[..word_end].strip_prefix('/') {
        Some(rest) => ("/", rest),
        None => ("", &line[..word_end]),
    };
    if typed.is_empty() && slash.is_empty() {
        return Vec::new();
    }

    COMMANDS
        .iter()
        .filter(|cmd| cmd.starts_with(typed))
        .map(|cmd| {
            let full = format!("{slash}{cmd}");
            Pair {
                display: full.clone(),
                replacement: full,
            }
        })
        .collect()
}

impl Completer for JarvisHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let matches = complete_command(line, pos);
        if matches.is_empty() {
            Ok((pos, matches))
        } else {
            Ok((0, matches))
        }
    }
}

impl Hinter for JarvisHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.hinter.hint(line, pos, ctx)
    }
}

impl Highlighter for JarvisHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[2m{}\x1b[0m", hint))
    }
}

impl Validator for JarvisHelper {}

impl Helper for JarvisHelper {}

#[cfg(test)]
mod tests {
    use super::*;

    fn replacements(line: &str) -> Vec<String> {
        complete_command(line, line.len())
            .into_iter()
            .map(|p| p.replacement)
            .collect()
    }

    #[test]
    fn test_completes_prefix() {
        assert_eq!(replacements("rea"), vec!["reasoning"]);
        assert_eq!(replacements("/cl"), vec!["/clear"]);
        assert_eq!(replacements("/e"), vec!["/exit"]);
    }

    #[test]
    fn test_no_completion_past_first_word() {
        assert!(replacements("model oll").is_empty());
        assert!(replacements("").is_empty());
        assert!(replacements("xyz").is_empty());
    }
}
