//! # stealth-browse
//!
//! Human-like browser interaction driven by a language model, over the Chrome DevTools
//! Protocol (CDP).
//!
//! Nothing on the page is addressed through hardcoded selectors. The page is summarized as
//! text, a text-completion model is asked (with several prompts raced concurrently) for the
//! CSS selectors of the elements to act on, and the resulting elements are clicked and typed
//! into through fallback chains of input backends that look like real user input.
//!
//! ## Features
//!
//! - **Input backends**: synthetic CDP input with eased, jittered pointer paths, OS-level
//!   injection (feature `os-input`), and the automation API's own calls as a last resort
//! - **Click/type strategy**: ordered fallback chains reporting which backend succeeded
//! - **Page summaries**: compact inputs/buttons/links descriptions for text-only models
//! - **Race resolution**: first structurally valid model reply wins, the rest are cancelled
//!
//! ## Running a search
//!
//! ```bash
//! export LLM_API_KEY=... LLM_API_BASE=https://api.example.com/v1 LLM_MODEL=...
//! cargo run -- https://duckduckgo.com "rust headless chrome"
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use stealth_browse::browser::{BrowserSession, InteractionConfig, LaunchOptions};
//! use stealth_browse::llm::{ChatCompletionClient, LlmConfig, RaceResolver};
//! use stealth_browse::workflow::{SearchWorkflow, WorkflowOptions};
//! use std::sync::Arc;
//!
//! # fn main() -> stealth_browse::Result<()> {
//! let client = ChatCompletionClient::new(LlmConfig::from_env()?);
//! let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
//!
//! let session = BrowserSession::launch(LaunchOptions::default())?;
//! let page = session.first_page()?;
//!
//! let mut workflow = SearchWorkflow::new(
//!     InteractionConfig::from_env(),
//!     RaceResolver::new(Arc::new(client)),
//!     runtime.handle().clone(),
//!     WorkflowOptions::new("rust headless chrome"),
//! );
//! let report = workflow.run(&session, &page, "https://duckduckgo.com")?;
//! println!("Submitted via {:?}, opened {} results", report.submitted_via, report.visits.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`browser`]: page/context traits, the headless_chrome session, control channels
//! - [`input`]: protocol, OS and API input backends
//! - [`dom`]: page summaries and chunking
//! - [`llm`]: model client, JSON recovery, race resolver, selector prompts
//! - [`tools`]: click/type/new-tab strategy and element location
//! - [`workflow`]: end-to-end search run
//! - [`error`]: Error types and result aliases

pub mod browser;
pub mod dom;
pub mod error;
pub mod input;
pub mod llm;
pub mod tools;
pub mod workflow;

pub use browser::{BrowserSession, BrowsingContext, ConnectionOptions, InteractionConfig, LaunchOptions, PageSurface};
pub use dom::{BoundingBox, PageSummary};
pub use error::{BrowserError, Result};
pub use input::{BackendKind, InputBackend};
pub use llm::{Completer, PromptTask, RaceResolver, RaceWinner};
pub use tools::{ClickOutcome, Interactor, NewContextOutcome, TypeOutcome};
