//! OS-level input injection.
//!
//! Events are indistinguishable from a physical mouse and keyboard, but they go to whatever
//! window is under the cursor, so viewport coordinates are mapped to screen coordinates first.
//! Some hosts (for example x86 emulation layers on ARM) drop injected key events silently;
//! callers verify the effect instead of trusting a successful return.

use crate::browser::{Modifiers, PageSurface};
use crate::error::{BrowserError, Result};
use crate::input::{BackendKind, InputBackend, Pacing};

#[cfg(feature = "os-input")]
use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};

fn os_error(reason: impl std::fmt::Display) -> BrowserError {
    BrowserError::input(BackendKind::Os.name(), reason)
}

/// Screen position of a viewport point, given the viewport's screen origin
pub fn to_screen(origin: (f64, f64), x: f64, y: f64) -> (i32, i32) {
    ((origin.0 + x).round() as i32, (origin.1 + y).round() as i32)
}

/// Injects input through the display server
pub struct OsBackend {
    #[cfg(feature = "os-input")]
    enigo: Option<Enigo>,
    pacing: Pacing,
}

impl OsBackend {
    pub fn new(pacing: Pacing) -> Self {
        Self {
            #[cfg(feature = "os-input")]
            enigo: None,
            pacing,
        }
    }

    fn screen_point<P: PageSurface>(page: &P, x: f64, y: f64) -> (i32, i32) {
        let origin = page.viewport_origin().unwrap_or_else(|e| {
            log::debug!("Viewport origin unavailable ({}), assuming window at (0, 0)", e);
            (0.0, 0.0)
        });
        to_screen(origin, x, y)
    }
}

#[cfg(feature = "os-input")]
impl OsBackend {
    /// The injector, connecting to the display on first use
    fn enigo(&mut self) -> Result<&mut Enigo> {
        if self.enigo.is_none() {
            let enigo = Enigo::new(&Settings::default()).map_err(os_error)?;
            self.enigo = Some(enigo);
        }
        self.enigo.as_mut().ok_or_else(|| os_error("input injector unavailable"))
    }

    fn glide_to(&mut self, target: (i32, i32)) -> Result<()> {
        let pacing = self.pacing;
        let enigo = self.enigo()?;

        if pacing == Pacing::Instant {
            return enigo.move_mouse(target.0, target.1, Coordinate::Abs).map_err(os_error);
        }

        // Randomized 0.4-0.8s glide
        let from = enigo.location().map_err(os_error)?;
        let steps = 20u64;
        let total_ms = rand::Rng::gen_range(&mut rand::thread_rng(), 400..=800u64);
        for i in 1..=steps {
            let t = crate::input::smoothstep(i as f64 / steps as f64);
            let x = from.0 as f64 + (target.0 - from.0) as f64 * t;
            let y = from.1 as f64 + (target.1 - from.1) as f64 * t;
            enigo.move_mouse(x.round() as i32, y.round() as i32, Coordinate::Abs).map_err(os_error)?;
            std::thread::sleep(std::time::Duration::from_millis(total_ms / steps));
        }
        Ok(())
    }

    fn modifier_keys(modifiers: Modifiers) -> Vec<Key> {
        let mut keys = Vec::new();
        if modifiers.contains(Modifiers::CTRL) {
            keys.push(Key::Control);
        }
        if modifiers.contains(Modifiers::META) {
            keys.push(Key::Meta);
        }
        if modifiers.contains(Modifiers::ALT) {
            keys.push(Key::Alt);
        }
        if modifiers.contains(Modifiers::SHIFT) {
            keys.push(Key::Shift);
        }
        keys
    }
}

/// Parse a key string to an enigo key
#[cfg(feature = "os-input")]
fn parse_key(key: &str) -> Result<Key> {
    let mut chars = key.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        return Ok(Key::Unicode(ch));
    }

    let k = match key.to_lowercase().as_str() {
        "enter" | "return" => Key::Return,
        "tab" => Key::Tab,
        "space" => Key::Space,
        "backspace" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        "escape" | "esc" => Key::Escape,
        "home" => Key::Home,
        "end" => Key::End,
        "up" | "arrowup" => Key::UpArrow,
        "down" | "arrowdown" => Key::DownArrow,
        "left" | "arrowleft" => Key::LeftArrow,
        "right" | "arrowright" => Key::RightArrow,
        _ => return Err(os_error(format!("Invalid key: {}", key))),
    };
    Ok(k)
}

#[cfg(feature = "os-input")]
impl<P: PageSurface> InputBackend<P> for OsBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Os
    }

    fn move_pointer(&mut self, page: &P, x: f64, y: f64) -> Result<()> {
        let target = Self::screen_point(page, x, y);
        self.glide_to(target)?;
        self.pacing.pause(100, 300);
        Ok(())
    }

    fn click_at(&mut self, page: &P, x: f64, y: f64, modifiers: Modifiers) -> Result<()> {
        let target = Self::screen_point(page, x, y);
        self.glide_to(target)?;
        self.pacing.pause(50, 150);

        let held = Self::modifier_keys(modifiers);
        let enigo = self.enigo()?;
        for key in held.iter().cloned() {
            enigo.key(key, Direction::Press).map_err(os_error)?;
        }
        let clicked = enigo.button(Button::Left, Direction::Click).map_err(os_error);
        for key in held.iter().rev().cloned() {
            if let Err(e) = enigo.key(key, Direction::Release) {
                log::warn!("[OS] Releasing modifier {:?} failed: {}", key, e);
            }
        }
        clicked?;

        self.pacing.pause(200, 500);
        log::debug!("[OS] Click at screen ({}, {})", target.0, target.1);
        Ok(())
    }

    fn press_key(&mut self, _page: &P, key: &str) -> Result<()> {
        let k = parse_key(key)?;
        self.enigo()?.key(k, Direction::Click).map_err(os_error)
    }
}

#[cfg(not(feature = "os-input"))]
impl<P: PageSurface> InputBackend<P> for OsBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Os
    }

    fn move_pointer(&mut self, _page: &P, _x: f64, _y: f64) -> Result<()> {
        Err(os_error("built without the os-input feature"))
    }

    fn click_at(&mut self, _page: &P, _x: f64, _y: f64, _modifiers: Modifiers) -> Result<()> {
        Err(os_error("built without the os-input feature"))
    }

    fn press_key(&mut self, _page: &P, _key: &str) -> Result<()> {
        Err(os_error("built without the os-input feature"))
    }
}
