//! Role prompts and validation for model-resolved CSS selectors.

use crate::dom::{chunk, split_summary};
use crate::error::{BrowserError, Result};
use crate::llm::{PromptTask, RaceResolver};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Semantic role of a selector in the model's reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorRole {
    Input,
    Button,
    Link,
}

impl SelectorRole {
    /// JSON key the model answers with
    pub fn key(self) -> &'static str {
        match self {
            SelectorRole::Input => "input_selector",
            SelectorRole::Button => "button_selector",
            SelectorRole::Link => "link_selector",
        }
    }
}

impl fmt::Display for SelectorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectorRole::Input => "input",
            SelectorRole::Button => "button",
            SelectorRole::Link => "link",
        };
        f.write_str(name)
    }
}

const SEARCH_FORM_TEMPLATE: &str = r#"Below is the DOM structure of a search engine homepage.
Each element is marked [VISIBLE WxH] or [HIDDEN].

I want to:
1. Type a search query into the search input box
2. Click the search submit button

IMPORTANT: Only pick elements marked [VISIBLE]. Ignore [HIDDEN] elements.
Give me CSS selectors for both elements.

{summary}

Reply ONLY with JSON (no other text):
{"input_selector": "<CSS selector for a VISIBLE input>", "button_selector": "<CSS selector for a VISIBLE button>"}"#;

const RESULT_LINKS_TEMPLATE: &str = r#"Below is part of the DOM from a search results page.
Each line shows: parent > link_selector [has <h3> if any] → "link text"

I need a CSS selector that matches the organic search result title links.
NOT ads, NOT navigation, NOT pagination, only the main result links.

{summary}

Reply ONLY JSON: {"link_selector": "<CSS selector>"}"#;

/// What the model is asked to find on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorGoal {
    /// The search box and its submit button
    SearchForm,
    /// Organic result title links
    ResultLinks,
}

impl SelectorGoal {
    /// Roles a valid reply must name
    pub fn roles(self) -> &'static [SelectorRole] {
        match self {
            SelectorGoal::SearchForm => &[SelectorRole::Input, SelectorRole::Button],
            SelectorGoal::ResultLinks => &[SelectorRole::Link],
        }
    }

    pub fn prompt(self, summary: &str) -> String {
        let template = match self {
            SelectorGoal::SearchForm => SEARCH_FORM_TEMPLATE,
            SelectorGoal::ResultLinks => RESULT_LINKS_TEMPLATE,
        };
        template.replace("{summary}", summary)
    }

    /// One task per chunk when the summary needs more than one, plus a final `full` task
    pub fn build_tasks(self, summary: &str, chunk_limit: usize) -> Vec<PromptTask> {
        let (header, body) = split_summary(summary);
        let chunks = chunk(&body, &header, chunk_limit);

        let mut tasks = Vec::with_capacity(chunks.len() + 1);
        if chunks.len() > 1 {
            for (i, c) in chunks.iter().enumerate() {
                tasks.push(PromptTask::new(format!("chunk-{}", i + 1), self.prompt(&c.to_prompt_text())));
            }
        }
        tasks.push(PromptTask::new("full", self.prompt(summary)));
        tasks
    }

    /// Reply is an object holding a non-blank string for every role
    pub fn validate(self, value: &Value) -> bool {
        let Some(object) = value.as_object() else {
            return false;
        };
        self.roles()
            .iter()
            .all(|role| object.get(role.key()).and_then(Value::as_str).is_some_and(|s| !s.trim().is_empty()))
    }

    /// Race the prompts for `summary` and return the validated selectors
    pub async fn resolve(
        self,
        resolver: &RaceResolver,
        summary: &str,
        chunk_limit: usize,
        timeout: Duration,
    ) -> Result<ResolvedSelector> {
        let tasks = self.build_tasks(summary, chunk_limit);
        log::info!("Resolving {:?} with {} prompt(s)", self, tasks.len());

        let winner = resolver
            .race(tasks, timeout, |value| self.validate(value))
            .await
            .ok_or_else(|| BrowserError::NoSelector(format!("no valid {:?} reply from the model", self)))?;

        ResolvedSelector::from_value(self, &winner.value, winner.label)
    }
}

/// Validated role → selector mapping from a winning reply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSelector {
    /// Label of the prompt that produced it
    pub source: String,
    pub selectors: IndexMap<SelectorRole, String>,
}

impl ResolvedSelector {
    pub fn from_value(goal: SelectorGoal, value: &Value, source: impl Into<String>) -> Result<Self> {
        let mut selectors = IndexMap::new();
        for role in goal.roles() {
            let selector = value
                .get(role.key())
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| BrowserError::NoSelector(format!("reply has no {}", role.key())))?;
            selectors.insert(*role, selector.to_string());
        }
        Ok(Self { source: source.into(), selectors })
    }

    pub fn get(&self, role: SelectorRole) -> Option<&str> {
        self.selectors.get(&role).map(String::as_str)
    }
}
