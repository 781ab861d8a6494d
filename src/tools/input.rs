use crate::browser::{ElementRef, InteractionConfig, PageSurface};
use crate::input::{BackendKind, InputBackend};
use crate::tools::click::Attempt;
use serde::Serialize;
use std::time::Duration;

/// Result of typing into a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TypeOutcome {
    /// `via` produced a field value of `observed` characters
    Typed { via: BackendKind, observed: usize, failures: Vec<Attempt> },
    /// Neither key injection nor high-level entry filled the field
    Failed { observed: usize, failures: Vec<Attempt> },
}

impl TypeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TypeOutcome::Typed { .. })
    }

    pub fn via(&self) -> Option<BackendKind> {
        match self {
            TypeOutcome::Typed { via, .. } => Some(*via),
            TypeOutcome::Failed { .. } => None,
        }
    }

    /// Length in characters of the field value after typing
    pub fn observed(&self) -> usize {
        match self {
            TypeOutcome::Typed { observed, .. } | TypeOutcome::Failed { observed, .. } => *observed,
        }
    }

    pub fn failures(&self) -> &[Attempt] {
        match self {
            TypeOutcome::Typed { failures, .. } | TypeOutcome::Failed { failures, .. } => failures,
        }
    }
}

fn observed_len<P: PageSurface>(page: &P, element: &ElementRef) -> usize {
    page.input_value(element).map(|v| v.chars().count()).unwrap_or(0)
}

/// Whether `observed` characters are enough of `expected` to accept key injection
fn accepted(observed: usize, expected: usize, ratio: f64) -> bool {
    if expected == 0 {
        return true;
    }
    observed > 0 && observed as f64 >= expected as f64 * ratio
}

/// Type `text` into the focused `element` one key at a time through `keys`, then verify.
///
/// Injected key presses can vanish without an error on some hosts, so the field value is read
/// back. Below `type_accept_ratio` of the intended length the field is cleared and filled
/// through the high-level API with a fixed per-character delay instead.
pub fn smart_type<P: PageSurface>(
    keys: &mut dyn InputBackend<P>,
    page: &P,
    element: &ElementRef,
    text: &str,
    config: &InteractionConfig,
) -> TypeOutcome {
    let expected = text.chars().count();
    let kind = keys.kind();
    let mut failures = Vec::new();

    let mut buf = [0u8; 4];
    for ch in text.chars() {
        if let Err(e) = keys.press_key(page, ch.encode_utf8(&mut buf)) {
            log::warn!("[{}] Key injection failed: {}", kind, e);
            failures.push(Attempt { backend: kind, error: e.to_string() });
            break;
        }
        config.pacing.pause(50, 120);
    }
    config.pacing.wait(Duration::from_millis(500));

    let observed = observed_len(page, element);
    if failures.is_empty() && accepted(observed, expected, config.type_accept_ratio) {
        log::debug!("[{}] Typed {}/{} characters", kind, observed, expected);
        return TypeOutcome::Typed { via: kind, observed, failures };
    }

    if failures.is_empty() {
        log::warn!(
            "[{}] Only {}/{} characters arrived, falling back to {}",
            kind,
            observed,
            expected,
            BackendKind::Api
        );
        failures.push(Attempt {
            backend: kind,
            error: format!("only {} of {} characters arrived", observed, expected),
        });
    }

    if let Err(e) = page.clear(element) {
        log::warn!("Clearing field failed: {}", e);
    }

    if let Err(e) = page.type_into(element, text, config.fallback_key_delay()) {
        log::warn!("[{}] Text entry failed: {}", BackendKind::Api, e);
        failures.push(Attempt { backend: BackendKind::Api, error: e.to_string() });
        return TypeOutcome::Failed { observed: observed_len(page, element), failures };
    }

    let observed = observed_len(page, element);
    log::info!("[{}] Typed {}/{} characters after fallback", BackendKind::Api, observed, expected);
    TypeOutcome::Typed { via: BackendKind::Api, observed, failures }
}
