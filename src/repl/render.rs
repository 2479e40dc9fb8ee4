//! Terminal rendering of turn progress

use std::io::{self, Write};

use super::colors;
use crate::orchestrator::TurnEvent;

/// Prints `TurnEvent`s as they arrive
pub struct TurnRenderer<W: Write> {
    out: W,
    reasoning_shown: bool,
    response_text: bool,
    failed: bool,
}

impl<W: Write> TurnRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            reasoning_shown: false,
            response_text: false,
            failed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn handle(&mut self, event: TurnEvent) -> io::Result<()> {
        match event {
            TurnEvent::ReasoningStarted { visible, .. } => {
                self.reasoning_shown = false;
                self.response_text = false;
                self.failed = false;
                if visible {
                    self.reasoning_header()?;
                }
            }
            TurnEvent::ReasoningDelta(text) => {
                self.reasoning_header()?;
                write!(self.out, "{}", colors::reasoning(&text))?;
            }
            TurnEvent::ReasoningFinished { elapsed, complete } => {
                if self.reasoning_shown {
                    writeln!(self.out)?;
                    // A failure already printed its own line
                    if !complete && !self.failed {
                        writeln!(self.out, "{}", colors::reasoning("(reasoning incomplete)"))?;
                    }
                }
                writeln!(self.out, "\n{}", colors::elapsed(&elapsed))?;
            }
            TurnEvent::ResponseStarted { model } => {
                writeln!(self.out, "\n{}", colors::model_name(&model))?;
            }
            TurnEvent::ResponseDelta(text) => {
                self.response_text = true;
                write!(self.out, "{}", text)?;
            }
            TurnEvent::ResponseFinished => {
                if self.response_text {
                    writeln!(self.out)?;
                }
                writeln!(self.out)?;
            }
            TurnEvent::Failed { pass, message } => {
                self.failed = true;
                writeln!(
                    self.out,
                    "\n{}",
                    colors::error(&format!("Error in {} stream: {}", pass, message))
                )?;
            }
        }
        self.out.flush()
    }

    fn reasoning_header(&mut self) -> io::Result<()> {
        if !self.reasoning_shown {
            writeln!(self.out, "\n{}", colors::header("Reasoning Process"))?;
            self.reasoning_shown = true;
        }
        Ok(())
    }
}
