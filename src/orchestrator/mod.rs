//! Turn orchestration
//!
//! One user turn is two sequential model calls: a reasoning pass over the
//! reasoning log, then a response pass over the response log with the
//! reasoning trace folded into the prompt. Progress is reported to the caller
//! as `TurnEvent`s while the streams are read.
//!
//! Transport failures never escape a turn. The failing pass yields
//! `ERROR_SENTINEL` in place of its text and the turn still completes. An
//! interrupt flag ends the turn the same way.

use futures::StreamExt;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::provider::{Backend, BackendError, StreamChunk};
use crate::reasoning::{Extracted, ReasoningCollector};
use crate::router::BackendRouter;
use crate::session::{ConversationState, Message};

/// Stands in for the text of a pass whose stream failed
pub const ERROR_SENTINEL: &str = "Error occurred while streaming response";

/// How often a blocked read checks the interrupt flag
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

/// Why a pass produced no text
#[derive(Debug, thiserror::Error)]
enum PassError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("interrupted")]
    Interrupted,
}

/// Which of the two calls an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Reasoning,
    Response,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Reasoning => f.write_str("reasoning"),
            Pass::Response => f.write_str("response"),
        }
    }
}

/// Progress of a running turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    ReasoningStarted { backend: &'static str, visible: bool },
    /// Only sent while reasoning is visible
    ReasoningDelta(String),
    ReasoningFinished { elapsed: String, complete: bool },
    ResponseStarted { model: String },
    ResponseDelta(String),
    ResponseFinished,
    Failed { pass: Pass, message: String },
}

/// Output of the reasoning pass
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningResult {
    /// Tag-wrapped reasoning, or `ERROR_SENTINEL`
    pub text: String,
    pub elapsed_seconds: f64,
    /// True when the closing tag was seen
    pub complete: bool,
}

/// Output of a whole turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub reasoning: ReasoningResult,
    pub response: String,
}

/// Human label for a duration: seconds below a minute, minutes above
pub fn format_elapsed(seconds: f64) -> String {
    if seconds >= 60.0 {
        format!("{:.1} minutes", seconds / 60.0)
    } else {
        format!("{:.1} seconds", seconds)
    }
}

/// Prompt sent to the response model
pub fn combined_prompt(user_text: &str, reasoning: &str) -> String {
    format!("<question>{user_text}</question>\n\n{reasoning}\n\n")
}

/// Drives turns against the backends picked by a router
pub struct TurnOrchestrator<'a> {
    router: &'a BackendRouter,
    interrupt: Option<&'a AtomicBool>,
}

impl<'a> TurnOrchestrator<'a> {
    pub fn new(router: &'a BackendRouter) -> Self {
        Self {
            router,
            interrupt: None,
        }
    }

    /// Abandon the running pass once `flag` is set
    pub fn with_interrupt(mut self, flag: &'a AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }

    fn interrupted(&self) -> bool {
        self.interrupt.is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Run one turn, mutating both logs in `state`
    pub async fn run_turn<F>(
        &self,
        state: &mut ConversationState,
        user_text: &str,
        mut observe: F,
    ) -> TurnOutcome
    where
        F: FnMut(TurnEvent),
    {
        state.reasoning_log_mut().push(Message::user(user_text));
        let reasoning = self.reason(state, &mut observe).await;

        let prompt = combined_prompt(user_text, &reasoning.text);
        state.response_log_mut().push(Message::user(prompt));
        let response = if self.interrupted() {
            // Interrupted during reasoning: the response call is never made
            observe(TurnEvent::Failed {
                pass: Pass::Response,
                message: PassError::Interrupted.to_string(),
            });
            ERROR_SENTINEL.to_string()
        } else {
            self.respond(state, &mut observe).await
        };

        let reply = Message::assistant(response.as_str());
        state.reasoning_log_mut().push(reply.clone());
        state.response_log_mut().push(reply);

        TurnOutcome {
            reasoning,
            response,
        }
    }

    async fn reason<F>(&self, state: &ConversationState, observe: &mut F) -> ReasoningResult
    where
        F: FnMut(TurnEvent),
    {
        let strategy = self.router.select_reasoning_strategy(state);
        let backend = self.router.backend(strategy);
        info!("Reasoning via {} ({})", backend.name(), strategy);
        observe(TurnEvent::ReasoningStarted {
            backend: backend.name(),
            visible: state.show_reasoning(),
        });

        let start = Instant::now();
        let result = collect_reasoning(
            backend,
            state.reasoning_log().messages(),
            state.show_reasoning(),
            self.interrupt,
            observe,
        )
        .await;
        let elapsed_seconds = start.elapsed().as_secs_f64();

        let (text, complete) = match result {
            Ok(extracted) => (extracted.text, extracted.complete),
            Err(e) => {
                warn!("Reasoning stream from {} failed: {}", backend.name(), e);
                observe(TurnEvent::Failed {
                    pass: Pass::Reasoning,
                    message: e.to_string(),
                });
                (ERROR_SENTINEL.to_string(), false)
            }
        };

        observe(TurnEvent::ReasoningFinished {
            elapsed: format_elapsed(elapsed_seconds),
            complete,
        });

        ReasoningResult {
            text,
            elapsed_seconds,
            complete,
        }
    }

    async fn respond<F>(&self, state: &ConversationState, observe: &mut F) -> String
    where
        F: FnMut(TurnEvent),
    {
        let selector = state.selector();
        let strategy = self.router.select_response_strategy(selector);
        let backend = self.router.backend(strategy);
        info!("Responding via {} ({}) with {}", backend.name(), strategy, selector);
        observe(TurnEvent::ResponseStarted {
            model: selector.to_string(),
        });

        let result = collect_response(
            backend,
            selector.backend_model(),
            state.response_log().messages(),
            self.interrupt,
            observe,
        )
        .await;

        match result {
            Ok(text) => {
                observe(TurnEvent::ResponseFinished);
                text
            }
            Err(e) => {
                warn!("Response stream from {} failed: {}", backend.name(), e);
                observe(TurnEvent::Failed {
                    pass: Pass::Response,
                    message: e.to_string(),
                });
                ERROR_SENTINEL.to_string()
            }
        }
    }
}

/// Await `fut`, giving up once the interrupt flag is set
async fn interruptible<T>(
    interrupt: Option<&AtomicBool>,
    fut: impl Future<Output = T>,
) -> Result<T, PassError> {
    let Some(flag) = interrupt else {
        return Ok(fut.await);
    };

    tokio::pin!(fut);
    loop {
        if flag.load(Ordering::SeqCst) {
            return Err(PassError::Interrupted);
        }
        tokio::select! {
            out = &mut fut => return Ok(out),
            _ = tokio::time::sleep(INTERRUPT_POLL) => {}
        }
    }
}

/// Read a reasoning stream until the span closes or the stream ends
async fn collect_reasoning<F>(
    backend: &dyn Backend,
    history: &[Message],
    show: bool,
    interrupt: Option<&AtomicBool>,
    observe: &mut F,
) -> Result<Extracted, PassError>
where
    F: FnMut(TurnEvent),
{
    let mut stream = interruptible(interrupt, backend.stream_reasoning(history)).await??;
    let mut collector = ReasoningCollector::new();

    while let Some(chunk) = interruptible(interrupt, stream.next()).await? {
        let emitted = collector.push(&chunk?);
        if show && !emitted.is_empty() {
            observe(TurnEvent::ReasoningDelta(emitted));
        }
        if collector.is_done() {
            debug!("Reasoning span closed, dropping stream");
            break;
        }
    }
    drop(stream);

    let (extracted, tail) = collector.finish();
    if show && !tail.is_empty() {
        observe(TurnEvent::ReasoningDelta(tail));
    }
    Ok(extracted)
}

/// Read a response stream to the end, forwarding every delta
async fn collect_response<F>(
    backend: &dyn Backend,
    model: &str,
    history: &[Message],
    interrupt: Option<&AtomicBool>,
    observe: &mut F,
) -> Result<String, PassError>
where
    F: FnMut(TurnEvent),
{
    let mut stream = interruptible(interrupt, backend.stream_response(model, history)).await??;
    let mut text = String::new();

    while let Some(chunk) = interruptible(interrupt, stream.next()).await? {
        // Reasoning a response model volunteers is not part of the answer
        let StreamChunk::Text(delta) = chunk? else {
            continue;
        };
        text.push_str(&delta);
        observe(TurnEvent::ResponseDelta(delta));
    }
    Ok(text)
}
