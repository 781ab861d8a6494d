//! Input backends
//!
//! Three ways of delivering pointer and keyboard events, in decreasing order of trust:
//! - [`ProtocolBackend`]: synthetic CDP input events over a cached control channel
//! - [`OsBackend`]: OS/display-server level injection (enigo)
//! - [`ApiBackend`]: the automation API's own click and key calls
//!
//! All of them implement [`InputBackend`], so fallback chains are plain ordered lists.

pub mod api;
pub mod os;
pub mod protocol;

pub use api::ApiBackend;
pub use os::OsBackend;
pub use protocol::ProtocolBackend;

use crate::browser::{Modifiers, PageSurface};
use crate::error::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which mechanism delivered (or failed to deliver) an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Protocol,
    Os,
    Api,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Protocol => "cdp",
            BackendKind::Os => "os",
            BackendKind::Api => "api",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One way of delivering input to a page
pub trait InputBackend<P: PageSurface> {
    fn kind(&self) -> BackendKind;

    /// Move the pointer to viewport coordinates
    fn move_pointer(&mut self, page: &P, x: f64, y: f64) -> Result<()>;

    /// Click at viewport coordinates with `modifiers` held
    fn click_at(&mut self, page: &P, x: f64, y: f64, modifiers: Modifiers) -> Result<()>;

    /// Press and release one key (a character or a named key such as "Enter")
    fn press_key(&mut self, page: &P, key: &str) -> Result<()>;
}

/// Whether waits between input events imitate a human or are skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pacing {
    Human,
    Instant,
}

impl Pacing {
    /// Sleep a random duration in `[min_ms, max_ms]`
    pub fn pause(self, min_ms: u64, max_ms: u64) {
        if self == Pacing::Instant {
            return;
        }
        let ms = if max_ms > min_ms { rand::thread_rng().gen_range(min_ms..=max_ms) } else { min_ms };
        std::thread::sleep(Duration::from_millis(ms));
    }

    /// Sleep exactly `duration`
    pub fn wait(self, duration: Duration) {
        if self == Pacing::Human {
            std::thread::sleep(duration);
        }
    }
}

/// Ease-in/ease-out interpolation factor
pub fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Eased path of `steps + 1` points from `from` to `to`, each displaced by up to `jitter` pixels
pub fn eased_path<R: Rng>(from: (f64, f64), to: (f64, f64), steps: usize, jitter: f64, rng: &mut R) -> Vec<(f64, f64)> {
    let steps = steps.max(1);
    (0..=steps)
        .map(|i| {
            let t = smoothstep(i as f64 / steps as f64);
            let (dx, dy) = if jitter > 0.0 {
                (rng.gen_range(-jitter..=jitter), rng.gen_range(-jitter..=jitter))
            } else {
                (0.0, 0.0)
            };
            (from.0 + (to.0 - from.0) * t + dx, from.1 + (to.1 - from.1) * t + dy)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_smoothstep_endpoints() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert_eq!(smoothstep(0.5), 0.5);
        assert!(smoothstep(0.1) < 0.1);
        assert!(smoothstep(0.9) > 0.9);
    }

    #[test]
    fn test_eased_path_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let path = eased_path((0.0, 0.0), (200.0, 100.0), 10, 1.0, &mut rng);

        assert_eq!(path.len(), 11);
        let (lx, ly) = path[10];
        assert!((lx - 200.0).abs() <= 1.0 && (ly - 100.0).abs() <= 1.0);
        let (fx, fy) = path[0];
        assert!(fx.abs() <= 1.0 && fy.abs() <= 1.0);
    }

    #[test]
    fn test_eased_path_without_jitter_is_monotonic() {
        let mut rng = StdRng::seed_from_u64(1);
        let path = eased_path((10.0, 10.0), (110.0, 10.0), 8, 0.0, &mut rng);
        assert!(path.windows(2).all(|w| w[1].0 >= w[0].0));
        assert_eq!(path.last(), Some(&(110.0, 10.0)));
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(BackendKind::Protocol.to_string(), "cdp");
        assert_eq!(BackendKind::Os.to_string(), "os");
        assert_eq!(BackendKind::Api.to_string(), "api");
    }
}
