//! jarvis: a two-pass chat client
//!
//! Each turn asks a reasoning model to think, then hands the trace to a
//! response model for the answer.

pub mod config;
pub mod orchestrator;
pub mod provider;
pub mod reasoning;
pub mod repl;
pub mod router;
pub mod session;
