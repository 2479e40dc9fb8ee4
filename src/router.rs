//! Backend routing
//!
//! Maps available credentials and the active model selector to a call
//! strategy. Selectors prefixed with `ollama:` route to the local server;
//! anything else goes to the hosted response API, when a key for it exists.

use std::fmt;
use tracing::{info, warn};

use crate::config::Settings;
use crate::provider::{Backend, HostedBackend, OllamaBackend};
use crate::session::ConversationState;

/// Selector prefix for local models (`ollama:<model>`)
pub const LOCAL_PREFIX: &str = "ollama";

/// Local model family that doubles as the reasoning model
pub const LOCAL_REASONING_FAMILY: &str = "deepseek";

pub const DEFAULT_HOSTED_MODEL: &str = "openai/gpt-4o-mini";
pub const DEFAULT_LOCAL_MODEL: &str = "qwen2.5:14b";

/// Identifies the response model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelector(String);

impl ModelSelector {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    /// Selector for a local model name
    pub fn local(model: &str) -> Self {
        Self(format!("{LOCAL_PREFIX}:{model}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Backend-native model name when this selects a local model
    pub fn local_model(&self) -> Option<&str> {
        self.0.strip_prefix(LOCAL_PREFIX)?.strip_prefix(':')
    }

    pub fn is_local(&self) -> bool {
        self.local_model().is_some()
    }

    /// Model name as the selected backend expects it
    pub fn backend_model(&self) -> &str {
        self.local_model().unwrap_or(&self.0)
    }

    /// True when this names the local reasoning model
    pub fn names_local_reasoner(&self) -> bool {
        self.local_model()
            .is_some_and(|m| m.starts_with(LOCAL_REASONING_FAMILY))
    }
}

impl fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend call strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    HostedReasoning,
    LocalReasoning,
    HostedResponse,
    LocalResponse,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HostedReasoning => "hosted-reasoning",
            Self::LocalReasoning => "local-reasoning",
            Self::HostedResponse => "hosted-response",
            Self::LocalResponse => "local-response",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of `BackendRouter::set_model`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelChange {
    /// Selector now in effect
    pub selector: ModelSelector,
    /// Set when the requested selector was coerced
    pub warning: Option<String>,
}

/// Picks backends for each pass of a turn
///
/// A hosted backend that was never configured counts as a missing credential.
pub struct BackendRouter {
    local: Box<dyn Backend>,
    hosted_reasoning: Option<Box<dyn Backend>>,
    hosted_response: Option<Box<dyn Backend>>,
    local_default: ModelSelector,
    hosted_default: ModelSelector,
}

impl BackendRouter {
    pub fn new(local: Box<dyn Backend>) -> Self {
        Self {
            local,
            hosted_reasoning: None,
            hosted_response: None,
            local_default: ModelSelector::local(DEFAULT_LOCAL_MODEL),
            hosted_default: ModelSelector::new(DEFAULT_HOSTED_MODEL),
        }
    }

    /// Build from resolved settings
    pub fn from_settings(settings: &Settings) -> Self {
        let local = OllamaBackend::new(&settings.ollama_url, &settings.local_reasoning_model);
        let mut router = Self::new(Box::new(local))
            .with_local_default(&settings.local_model)
            .with_hosted_default(&settings.model);

        if let Some(key) = &settings.deepseek_api_key {
            router = router.with_hosted_reasoning(Box::new(HostedBackend::deepseek(
                key.as_str(),
                settings.deepseek_base_url.clone(),
                settings.reasoning_model.as_str(),
            )));
        }
        if let Some(key) = &settings.openrouter_api_key {
            router = router.with_hosted_response(Box::new(HostedBackend::openrouter(
                key.as_str(),
                settings.openrouter_base_url.clone(),
            )));
        }
        router
    }

    pub fn with_hosted_reasoning(mut self, backend: Box<dyn Backend>) -> Self {
        self.hosted_reasoning = Some(backend);
        self
    }

    pub fn with_hosted_response(mut self, backend: Box<dyn Backend>) -> Self {
        self.hosted_response = Some(backend);
        self
    }

    /// Local model used when a hosted selector cannot be honored
    pub fn with_local_default(mut self, model: &str) -> Self {
        self.local_default = ModelSelector::local(model);
        self
    }

    /// Selector used at startup when a hosted response key exists
    pub fn with_hosted_default(mut self, selector: &str) -> Self {
        self.hosted_default = ModelSelector::new(selector);
        self
    }

    pub fn has_hosted_reasoning(&self) -> bool {
        self.hosted_reasoning.is_some()
    }

    pub fn has_hosted_response(&self) -> bool {
        self.hosted_response.is_some()
    }

    pub fn local_default(&self) -> &ModelSelector {
        &self.local_default
    }

    /// Fresh session state with the startup selector
    pub fn initial_state(&self) -> ConversationState {
        let (selector, _) = self.resolve(self.hosted_default.clone());
        let local_reasoning = selector.names_local_reasoner();
        ConversationState::new(selector, local_reasoning)
    }

    /// Change the response model
    ///
    /// A hosted selector without a hosted response key is replaced by the
    /// local default and a warning is returned.
    pub fn set_model(&self, state: &mut ConversationState, requested: &str) -> ModelChange {
        let (selector, warning) = self.resolve(ModelSelector::new(requested.trim()));
        if let Some(w) = &warning {
            warn!("{}", w);
        }

        let local_reasoning = selector.names_local_reasoner();
        info!(
            "Model set to {} (local reasoning: {})",
            selector, local_reasoning
        );
        state.apply_selector(selector.clone(), local_reasoning);

        ModelChange { selector, warning }
    }

    fn resolve(&self, requested: ModelSelector) -> (ModelSelector, Option<String>) {
        if requested.is_local() || self.hosted_response.is_some() {
            return (requested, None);
        }

        let warning = format!(
            "No hosted response API key configured, falling back to {}",
            self.local_default
        );
        (self.local_default.clone(), Some(warning))
    }

    pub fn select_reasoning_strategy(&self, state: &ConversationState) -> Strategy {
        if self.hosted_reasoning.is_some() && !state.local_reasoning() {
            Strategy::HostedReasoning
        } else {
            Strategy::LocalReasoning
        }
    }

    pub fn select_response_strategy(&self, selector: &ModelSelector) -> Strategy {
        if !selector.is_local() && self.hosted_response.is_some() {
            Strategy::HostedResponse
        } else {
            Strategy::LocalResponse
        }
    }

    /// Backend implementing a strategy
    pub fn backend(&self, strategy: Strategy) -> &dyn Backend {
        let hosted = match strategy {
            Strategy::HostedReasoning => self.hosted_reasoning.as_deref(),
            Strategy::HostedResponse => self.hosted_response.as_deref(),
            Strategy::LocalReasoning | Strategy::LocalResponse => None,
        };
        hosted.unwrap_or(self.local.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{BackendError, ChunkStream, StreamChunk};
    use crate::session::Message;
    use async_trait::async_trait;

    struct NullBackend(&'static str);

    #[async_trait]
    impl Backend for NullBackend {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn stream_reasoning(&self, _: &[Message]) -> Result<ChunkStream, BackendError> {
            Ok(Box::pin(futures::stream::empty::<Result<StreamChunk, BackendError>>()))
        }

        async fn stream_response(
            &self,
            _: &str,
            _: &[Message],
        ) -> Result<ChunkStream, BackendError> {
            Ok(Box::pin(futures::stream::empty::<Result<StreamChunk, BackendError>>()))
        }
    }

    fn local_only() -> BackendRouter {
        BackendRouter::new(Box::new(NullBackend("local")))
    }

    fn fully_hosted() -> BackendRouter {
        local_only()
            .with_hosted_reasoning(Box::new(NullBackend("reasoner")))
            .with_hosted_response(Box::new(NullBackend("responder")))
    }

    #[test]
    fn test_selector_parsing() {
        let local = ModelSelector::new("ollama:qwen2.5:14b");
        assert!(local.is_local());
        assert_eq!(local.local_model(), Some("qwen2.5:14b"));
        assert_eq!(local.backend_model(), "qwen2.5:14b");

        let hosted = ModelSelector::new("openai/gpt-4o-mini");
        assert!(!hosted.is_local());
        assert_eq!(hosted.backend_model(), "openai/gpt-4o-mini");

        // Prefix without the separator is just a hosted model name
        assert!(!ModelSelector::new("ollamafoo").is_local());
    }

    #[test]
    fn test_set_model_coerces_without_hosted_key() {
        let router = local_only();
        let mut state = router.initial_state();

        let change = router.set_model(&mut state, "gpt-x");
        assert_eq!(change.selector, ModelSelector::local(DEFAULT_LOCAL_MODEL));
        assert!(change.warning.is_some());
        assert_eq!(state.selector(), router.local_default());
    }

    #[test]
    fn test_set_model_local_untouched() {
        let router = local_only();
        let mut state = router.initial_state();

        let change = router.set_model(&mut state, "ollama:modelname");
        assert_eq!(change.selector.as_str(), "ollama:modelname");
        assert!(change.warning.is_none());
        assert_eq!(state.selector().as_str(), "ollama:modelname");
    }

    #[test]
    fn test_set_model_hosted_with_key() {
        let router = fully_hosted();
        let mut state = router.initial_state();

        let change = router.set_model(&mut state, "anthropic/claude-3.5-sonnet");
        assert!(change.warning.is_none());
        assert_eq!(
            router.select_response_strategy(state.selector()),
            Strategy::HostedResponse
        );
    }

    #[test]
    fn test_initial_state() {
        assert_eq!(
            local_only().initial_state().selector().as_str(),
            "ollama:qwen2.5:14b"
        );
        assert_eq!(
            fully_hosted().initial_state().selector().as_str(),
            DEFAULT_HOSTED_MODEL
        );
    }

    #[test]
    fn test_reasoning_strategy() {
        let router = fully_hosted();
        let mut state = router.initial_state();
        assert_eq!(router.select_reasoning_strategy(&state), Strategy::HostedReasoning);
        assert_eq!(router.backend(Strategy::HostedReasoning).name(), "reasoner");

        // Selecting the local reasoner forces local reasoning
        router.set_model(&mut state, "ollama:deepseek-r1:14b");
        assert!(state.local_reasoning());
        assert_eq!(router.select_reasoning_strategy(&state), Strategy::LocalReasoning);

        router.set_model(&mut state, "ollama:qwen2.5:14b");
        assert!(!state.local_reasoning());
        assert_eq!(router.select_reasoning_strategy(&state), Strategy::HostedReasoning);

        let local = local_only();
        assert_eq!(
            local.select_reasoning_strategy(&local.initial_state()),
            Strategy::LocalReasoning
        );
    }

    #[test]
    fn test_response_strategy() {
        let router = fully_hosted();
        assert_eq!(
            router.select_response_strategy(&ModelSelector::new("ollama:llama3")),
            Strategy::LocalResponse
        );
        assert_eq!(
            router.select_response_strategy(&ModelSelector::new("gpt-x")),
            Strategy::HostedResponse
        );
        assert_eq!(
            local_only().select_response_strategy(&ModelSelector::new("gpt-x")),
            Strategy::LocalResponse
        );
        assert_eq!(router.backend(Strategy::LocalResponse).name(), "local");
    }
}
