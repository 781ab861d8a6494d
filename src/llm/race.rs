//! First-valid-wins resolution over concurrent prompts.
//!
//! Every task goes to the completer at once. Replies are parsed and validated in completion
//! order; the first valid one wins and the remaining requests are cancelled and aborted
//! without waiting for them. A task that finishes after the winner has no effect.

use crate::llm::parse::extract_json;
use crate::llm::{Completer, PromptTask};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// The accepted reply of a race
#[derive(Debug, Clone, PartialEq)]
pub struct RaceWinner {
    /// Label of the task that produced the reply
    pub label: String,
    pub value: Value,
}

/// Races prompt tasks against a shared completer
#[derive(Clone)]
pub struct RaceResolver {
    completer: Arc<dyn Completer>,
}

impl RaceResolver {
    pub fn new(completer: Arc<dyn Completer>) -> Self {
        Self { completer }
    }

    /// Resolve `tasks`, returning the first reply that parses and passes `validate`.
    ///
    /// A single task is awaited directly without spawning. Each task gets `timeout`; `None`
    /// means every task failed, timed out or produced an invalid reply.
    pub async fn race<V>(&self, tasks: Vec<PromptTask>, timeout: Duration, validate: V) -> Option<RaceWinner>
    where
        V: Fn(&Value) -> bool,
    {
        if tasks.len() <= 1 {
            let task = tasks.into_iter().next()?;
            let reply = complete_within(self.completer.as_ref(), &task.prompt, timeout).await;
            return accept(task.label, reply, &validate);
        }

        let total = tasks.len();
        let token = CancellationToken::new();
        let mut in_flight = JoinSet::new();

        for task in tasks {
            let completer = Arc::clone(&self.completer);
            let token = token.clone();
            in_flight.spawn(async move {
                let reply = tokio::select! {
                    _ = token.cancelled() => None,
                    reply = complete_within(completer.as_ref(), &task.prompt, timeout) => reply,
                };
                (task.label, reply)
            });
        }

        log::debug!("Racing {} prompts (timeout {:?})", total, timeout);

        while let Some(joined) = in_flight.join_next().await {
            let (label, reply) = match joined {
                Ok(result) => result,
                Err(e) => {
                    log::warn!("Prompt task ended abnormally: {}", e);
                    continue;
                }
            };

            if let Some(winner) = accept(label, reply, &validate) {
                token.cancel();
                in_flight.abort_all();
                return Some(winner);
            }
        }

        log::warn!("No valid reply from any of {} prompts", total);
        None
    }
}

async fn complete_within(completer: &dyn Completer, prompt: &str, timeout: Duration) -> Option<String> {
    // Enforced here as well, for completers that ignore the timeout
    tokio::time::timeout(timeout, completer.complete(prompt, timeout)).await.ok().flatten()
}

fn accept<V>(label: String, reply: Option<String>, validate: &V) -> Option<RaceWinner>
where
    V: Fn(&Value) -> bool,
{
    let Some(reply) = reply else {
        log::info!("[{}] no reply", label);
        return None;
    };

    match extract_json(&reply) {
        Some(value) if validate(&value) => {
            log::info!("[{}] won with {}", label, value);
            Some(RaceWinner { label, value })
        }
        Some(value) => {
            log::warn!("[{}] reply failed validation: {}", label, value);
            None
        }
        None => {
            log::warn!("[{}] unparsable reply: {}", label, reply.chars().take(200).collect::<String>());
            None
        }
    }
}
