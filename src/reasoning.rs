//! Reasoning extraction for model output streams
//!
//! Local reasoning models write their chain of thought inline, bounded by
//! `<think>` and `</think>`, and chunk boundaries never line up with the tags.
//! Hosted reasoners put it in a dedicated field instead. Both shapes end up
//! here as tag-wrapped text:
//! - `ThinkAccumulator`: three-state machine fed one fragment at a time
//! - `ReasoningCollector`: routes decoded chunks to the right path

use crate::provider::StreamChunk;

pub const THINK_OPEN: &str = "<think>";
pub const THINK_CLOSE: &str = "</think>";

/// Outcome of draining one reasoning stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    /// Everything emitted, tags included
    pub text: String,
    /// True once the closing tag was seen
    pub complete: bool,
}

/// Extraction state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThinkState {
    /// Nothing emitted yet; `pending` holds a possible partial opening tag
    AwaitingOpen { pending: String },
    /// Inside the span; `pending` holds a possible partial closing tag
    InReasoning { pending: String },
    /// Closing tag seen. Terminal.
    Done,
}

/// Pulls the `<think>...</think>` span out of a fragment stream
#[derive(Debug)]
pub struct ThinkAccumulator {
    state: ThinkState,
    emitted: String,
}

impl Default for ThinkAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ThinkAccumulator {
    pub fn new() -> Self {
        Self {
            state: ThinkState::AwaitingOpen {
                pending: String::new(),
            },
            emitted: String::new(),
        }
    }

    pub fn state(&self) -> &ThinkState {
        &self.state
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, ThinkState::Done)
    }

    /// Feed one fragment, returning the text it releases (possibly empty)
    pub fn push(&mut self, fragment: &str) -> String {
        let mut out = String::new();

        self.state = match std::mem::replace(&mut self.state, ThinkState::Done) {
            ThinkState::AwaitingOpen { mut pending } => {
                pending.push_str(fragment);
                match pending.find(THINK_OPEN) {
                    Some(idx) => {
                        out.push_str(THINK_OPEN);
                        let rest = pending.split_off(idx + THINK_OPEN.len());
                        scan_reasoning(rest, &mut out)
                    }
                    None => {
                        // Nothing before the tag is ever emitted, so only a
                        // possible partial tag needs to survive.
                        let keep = partial_tag_len(&pending, THINK_OPEN);
                        pending.drain(..pending.len() - keep);
                        ThinkState::AwaitingOpen { pending }
                    }
                }
            }
            ThinkState::InReasoning { mut pending } => {
                pending.push_str(fragment);
                scan_reasoning(pending, &mut out)
            }
            ThinkState::Done => ThinkState::Done,
        };

        self.emitted.push_str(&out);
        out
    }

    /// Close out at end of input
    ///
    /// Held-back text is flushed without fabricating a closing tag. Returns the
    /// extraction and whatever the flush released.
    pub fn finish(mut self) -> (Extracted, String) {
        let (complete, tail) = match std::mem::replace(&mut self.state, ThinkState::Done) {
            ThinkState::Done => (true, String::new()),
            ThinkState::InReasoning { pending } => (false, pending),
            ThinkState::AwaitingOpen { .. } => (false, String::new()),
        };
        self.emitted.push_str(&tail);

        (
            Extracted {
                text: self.emitted,
                complete,
            },
            tail,
        )
    }
}

fn scan_reasoning(mut pending: String, out: &mut String) -> ThinkState {
    if let Some(idx) = pending.find(THINK_CLOSE) {
        out.push_str(&pending[..idx]);
        out.push_str(THINK_CLOSE);
        return ThinkState::Done;
    }

    let split = pending.len() - partial_tag_len(&pending, THINK_CLOSE);
    out.push_str(&pending[..split]);
    pending.drain(..split);
    ThinkState::InReasoning { pending }
}

/// Length of the longest suffix of `text` that is a proper prefix of `tag`
///
/// Tags are ASCII, so the split point is always a char boundary.
fn partial_tag_len(text: &str, tag: &str) -> usize {
    (1..tag.len())
        .rev()
        .find(|&n| text.ends_with(&tag[..n]))
        .unwrap_or(0)
}

/// Collects reasoning from either a native reasoning field or tagged text
#[derive(Debug, Default)]
pub struct ReasoningCollector {
    tags: ThinkAccumulator,
    native: String,
}

impl ReasoningCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one decoded chunk, returning the text to display for it
    pub fn push(&mut self, chunk: &StreamChunk) -> String {
        match chunk {
            StreamChunk::Reasoning(text) if text.is_empty() => String::new(),
            StreamChunk::Reasoning(text) => {
                let first = self.native.is_empty();
                self.native.push_str(text);
                if first {
                    format!("{THINK_OPEN}{text}")
                } else {
                    text.clone()
                }
            }
            StreamChunk::Text(text) => self.tags.push(text),
        }
    }

    /// True once the tagged span has closed; the stream can be dropped
    pub fn is_done(&self) -> bool {
        self.tags.is_done()
    }

    /// Finish at end of stream. Native reasoning is wrapped in the same tags
    /// the local path produces.
    pub fn finish(self) -> (Extracted, String) {
        if self.native.is_empty() {
            return self.tags.finish();
        }

        let text = format!("{THINK_OPEN}{}{THINK_CLOSE}", self.native);
        (
            Extracted {
                text,
                complete: true,
            },
            THINK_CLOSE.to_string(),
        )
    }
}
