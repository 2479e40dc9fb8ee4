//! Interactive REPL for jarvis
//!
//! Provides a readline-based interface with:
//! - Command parsing (`model`, `reasoning`, `clear`, `help`, `quit`)
//! - Streaming display of both passes of a turn
//! - Ctrl+C ending an in-flight turn with the error sentinel
//!
//! History lives only in memory for the session.

pub mod colors;
mod commands;
mod helper;
mod render;

pub use commands::{ReplCommand, help_text};
pub use render::TurnRenderer;

use anyhow::Result;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::orchestrator::TurnOrchestrator;
use crate::router::BackendRouter;
use crate::session::ConversationState;

use helper::JarvisHelper;

const PROMPT: &str = "You: ";

/// REPL state
pub struct Repl {
    /// Readline editor with history and completion
    editor: Editor<JarvisHelper, DefaultHistory>,
    router: BackendRouter,
    state: ConversationState,
    /// Set by Ctrl+C while a turn is streaming
    interrupt: Arc<AtomicBool>,
}

impl Repl {
    pub fn new(router: BackendRouter, show_reasoning: bool) -> Result<Self> {
        let mut editor = Editor::new()?;
        editor.set_helper(Some(JarvisHelper::new()));

        let mut state = router.initial_state();
        state.set_show_reasoning(show_reasoning);

        Ok(Self {
            editor,
            router,
            state,
            interrupt: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Run the REPL loop until quit or end of input
    pub async fn run(&mut self) -> Result<()> {
        println!("Type your message (Ctrl+D to exit, help for commands)");
        println!();

        // Readline owns Ctrl+C at the prompt; this catches it mid-turn
        let flag = self.interrupt.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                flag.store(true, Ordering::SeqCst);
            }
        });

        loop {
            let line = match self.editor.readline(PROMPT) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            self.editor.add_history_entry(trimmed)?;

            match ReplCommand::parse(trimmed) {
                ReplCommand::Quit => break,
                ReplCommand::Help => println!("{}", help_text()),
                ReplCommand::Chat(text) => self.chat(&text).await,
                command => self.apply(command),
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Apply a state-changing command and print its confirmation
    fn apply(&mut self, command: ReplCommand) {
        match command {
            ReplCommand::ToggleReasoning => {
                let state = if self.state.toggle_reasoning() {
                    "visible"
                } else {
                    "hidden"
                };
                println!("{}\n", colors::confirm(&format!("Reasoning process is now {}", state)));
            }
            ReplCommand::Clear => {
                self.state.clear();
                println!("{}\n", colors::confirm("Chat history cleared!"));
            }
            ReplCommand::Model(requested) => {
                let change = self.router.set_model(&mut self.state, &requested);
                if let Some(warning) = change.warning {
                    println!("{}", colors::warning(&warning));
                }
                println!(
                    "{}\n",
                    colors::confirm(&format!("Changed model to: {}", change.selector))
                );
            }
            ReplCommand::Quit | ReplCommand::Help | ReplCommand::Chat(_) => {}
        }
    }

    /// Run one chat turn, rendering it to stdout
    async fn chat(&mut self, text: &str) {
        let mut renderer = TurnRenderer::new(io::stdout());
        self.interrupt.store(false, Ordering::SeqCst);
        TurnOrchestrator::new(&self.router)
            .with_interrupt(&self.interrupt)
            .run_turn(&mut self.state, text, |event| {
                if let Err(e) = renderer.handle(event) {
                    debug!("Failed to write to terminal: {}", e);
                }
            })
            .await;
    }
}
