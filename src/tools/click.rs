use crate::browser::{Modifiers, PageSurface};
use crate::input::{BackendKind, InputBackend};
use serde::Serialize;
use std::fmt;

/// A backend step that failed during a fallback chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub backend: BackendKind,
    pub error: String,
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.backend, self.error)
    }
}

/// Result of a click through a backend chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClickOutcome {
    /// `via` delivered the click after every backend in `failures` had failed
    Succeeded { via: BackendKind, failures: Vec<Attempt> },
    /// Every backend failed, in chain order
    Failed { failures: Vec<Attempt> },
}

impl ClickOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ClickOutcome::Succeeded { .. })
    }

    /// Backend that delivered the click
    pub fn via(&self) -> Option<BackendKind> {
        match self {
            ClickOutcome::Succeeded { via, .. } => Some(*via),
            ClickOutcome::Failed { .. } => None,
        }
    }

    /// Succeeded, but not through the first backend of the chain
    pub fn is_degraded(&self) -> bool {
        matches!(self, ClickOutcome::Succeeded { failures, .. } if !failures.is_empty())
    }

    pub fn failures(&self) -> &[Attempt] {
        match self {
            ClickOutcome::Succeeded { failures, .. } | ClickOutcome::Failed { failures } => failures,
        }
    }
}

/// Move to and click `(x, y)` through `chain`, stopping at the first backend that succeeds.
///
/// Each backend is tried at most once, in order.
pub fn click_through<P: PageSurface>(
    chain: &mut [&mut dyn InputBackend<P>],
    page: &P,
    x: f64,
    y: f64,
    modifiers: Modifiers,
    label: &str,
) -> ClickOutcome {
    let mut failures = Vec::new();

    for backend in chain.iter_mut() {
        let kind = backend.kind();
        let result = backend.move_pointer(page, x, y).and_then(|_| backend.click_at(page, x, y, modifiers));

        match result {
            Ok(()) => {
                if failures.is_empty() {
                    log::debug!("[{}] Click '{}' at ({}, {})", kind, label, x as i64, y as i64);
                } else {
                    log::info!("[{}] Click '{}' succeeded after {} failed backend(s)", kind, label, failures.len());
                }
                return ClickOutcome::Succeeded { via: kind, failures };
            }
            Err(e) => {
                log::warn!("[{}] Click '{}' failed: {}", kind, label, e);
                failures.push(Attempt { backend: kind, error: e.to_string() });
            }
        }
    }

    log::warn!("All {} click backends failed for '{}'", failures.len(), label);
    ClickOutcome::Failed { failures }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let ok = ClickOutcome::Succeeded {
            via: BackendKind::Os,
            failures: vec![Attempt { backend: BackendKind::Protocol, error: "stale".to_string() }],
        };
        assert!(ok.is_success());
        assert!(ok.is_degraded());
        assert_eq!(ok.via(), Some(BackendKind::Os));
        assert_eq!(ok.failures()[0].to_string(), "cdp: stale");

        let failed = ClickOutcome::Failed { failures: Vec::new() };
        assert!(!failed.is_success());
        assert_eq!(failed.via(), None);
    }

    #[test]
    fn test_outcome_serialization() {
        let ok = ClickOutcome::Succeeded { via: BackendKind::Protocol, failures: Vec::new() };
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "succeeded");
        assert_eq!(json["via"], "protocol");
    }
}
