use crate::browser::{ControlChannel, Modifiers, PageSurface, SessionCache};
use crate::error::{BrowserError, Result};
use crate::input::{BackendKind, InputBackend, Pacing, eased_path};
use rand::Rng;
use serde_json::{Value, json};

const MOUSE_EVENT: &str = "Input.dispatchMouseEvent";
const KEY_EVENT: &str = "Input.dispatchKeyEvent";

/// Synthetic input over the DevTools protocol.
///
/// Events arrive with `isTrusted = true` and use the same viewport coordinates as element
/// geometry. The backend owns the engine's single control channel.
pub struct ProtocolBackend<C: ControlChannel> {
    cache: SessionCache<C>,
    pacing: Pacing,
    move_steps: usize,
}

impl<C: ControlChannel> ProtocolBackend<C> {
    pub fn new(pacing: Pacing) -> Self {
        Self { cache: SessionCache::new(), pacing, move_steps: 10 }
    }

    /// Release the cached channel
    pub fn release(&mut self) {
        self.cache.release();
    }

    pub fn session(&self) -> &SessionCache<C> {
        &self.cache
    }

    fn send<P>(&mut self, page: &P, command: &str, params: Value) -> Result<()>
    where
        P: PageSurface<Channel = C>,
    {
        let channel = self.cache.acquire(page)?;
        channel.send(command, params).map_err(|e| BrowserError::input(BackendKind::Protocol.name(), e))?;
        Ok(())
    }
}

fn mouse_event(kind: &str, x: f64, y: f64, button: &str, modifiers: Modifiers) -> Value {
    let mut event = json!({
        "type": kind,
        "x": x,
        "y": y,
        "button": button,
        "modifiers": modifiers.bits(),
        "pointerType": "mouse",
    });
    if button != "none" {
        event["clickCount"] = json!(1);
    }
    event
}

/// Key name, `code`, and Windows virtual key code of a named key
fn named_key(key: &str) -> Option<(&'static str, &'static str, u32)> {
    let named = match key.to_ascii_lowercase().as_str() {
        "enter" | "return" => ("Enter", "Enter", 13),
        "tab" => ("Tab", "Tab", 9),
        "backspace" => ("Backspace", "Backspace", 8),
        "escape" | "esc" => ("Escape", "Escape", 27),
        "delete" => ("Delete", "Delete", 46),
        "home" => ("Home", "Home", 36),
        "end" => ("End", "End", 35),
        "arrowleft" | "left" => ("ArrowLeft", "ArrowLeft", 37),
        "arrowup" | "up" => ("ArrowUp", "ArrowUp", 38),
        "arrowright" | "right" => ("ArrowRight", "ArrowRight", 39),
        "arrowdown" | "down" => ("ArrowDown", "ArrowDown", 40),
        _ => return None,
    };
    Some(named)
}

/// keyDown/keyUp parameter pair for `key`
pub(crate) fn key_events(key: &str) -> Result<(Value, Value)> {
    if let Some((name, code, vk)) = named_key(key) {
        let mut down = json!({
            "type": "keyDown",
            "key": name,
            "code": code,
            "windowsVirtualKeyCode": vk,
            "nativeVirtualKeyCode": vk,
        });
        if name == "Enter" {
            down["text"] = json!("\r");
        }
        let up = json!({
            "type": "keyUp",
            "key": name,
            "code": code,
            "windowsVirtualKeyCode": vk,
            "nativeVirtualKeyCode": vk,
        });
        return Ok((down, up));
    }

    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => {
            let text = ch.to_string();
            Ok((json!({ "type": "keyDown", "key": text, "text": text }), json!({ "type": "keyUp", "key": text })))
        }
        _ => Err(BrowserError::input(BackendKind::Protocol.name(), format!("Unknown key '{}'", key))),
    }
}

impl<P, C> InputBackend<P> for ProtocolBackend<C>
where
    P: PageSurface<Channel = C>,
    C: ControlChannel,
{
    fn kind(&self) -> BackendKind {
        BackendKind::Protocol
    }

    fn move_pointer(&mut self, page: &P, x: f64, y: f64) -> Result<()> {
        // Start from a random nearby point so the approach is never a straight line
        let mut rng = rand::thread_rng();
        let start = (x + rng.gen_range(-200.0..=200.0), y + rng.gen_range(-100.0..=100.0));
        let path = eased_path(start, (x, y), self.move_steps, 1.0, &mut rng);

        for (mx, my) in path {
            self.send(page, MOUSE_EVENT, mouse_event("mouseMoved", mx, my, "none", Modifiers::NONE))?;
            self.pacing.pause(10, 30);
        }
        Ok(())
    }

    fn click_at(&mut self, page: &P, x: f64, y: f64, modifiers: Modifiers) -> Result<()> {
        let mut rng = rand::thread_rng();
        let x = x + rng.gen_range(-2.0..=2.0);
        let y = y + rng.gen_range(-2.0..=2.0);

        self.send(page, MOUSE_EVENT, mouse_event("mouseMoved", x, y, "none", modifiers))?;
        self.pacing.pause(50, 150);
        self.send(page, MOUSE_EVENT, mouse_event("mousePressed", x, y, "left", modifiers))?;
        self.pacing.pause(30, 80);
        self.send(page, MOUSE_EVENT, mouse_event("mouseReleased", x, y, "left", modifiers))?;
        self.pacing.pause(100, 300);

        log::debug!("[CDP] Click at ({}, {})", x as i64, y as i64);
        Ok(())
    }

    fn press_key(&mut self, page: &P, key: &str) -> Result<()> {
        let (down, up) = key_events(key)?;
        self.send(page, KEY_EVENT, down)?;
        self.pacing.pause(20, 60);
        self.send(page, KEY_EVENT, up)?;
        Ok(())
    }
}
