//! Selector resolution through a text-completion model
//!
//! - config: endpoint, credential and model, read from the environment
//! - client: OpenAI-compatible chat-completions client
//! - parse: recovery parser for JSON embedded in free-form replies
//! - race: concurrent first-valid-wins resolution over several prompts
//! - selector: role prompts, validators and the resolved selector map

pub mod client;
pub mod config;
pub mod parse;
pub mod race;
pub mod selector;

pub use client::ChatCompletionClient;
pub use config::LlmConfig;
pub use parse::extract_json;
pub use race::{RaceResolver, RaceWinner};
pub use selector::{ResolvedSelector, SelectorGoal, SelectorRole};

use async_trait::async_trait;
use std::time::Duration;

/// A text-completion endpoint.
///
/// Implementations return `None` for anything other than a usable reply: non-2xx status,
/// network failure, timeout or an empty body. They never panic on bad input.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str, timeout: Duration) -> Option<String>;
}

/// A labeled prompt submitted to the race resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTask {
    /// Diagnostic name (`chunk-1`, `full`, ...)
    pub label: String,
    pub prompt: String,
}

impl PromptTask {
    pub fn new(label: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self { label: label.into(), prompt: prompt.into() }
    }
}
