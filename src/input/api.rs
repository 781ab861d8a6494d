use crate::browser::{Modifiers, PageSurface};
use crate::error::Result;
use crate::input::{BackendKind, InputBackend};

/// The automation API's own interaction calls.
///
/// Last resort: these events are easy for anti-bot scripts to tell apart from real input.
#[derive(Debug, Default)]
pub struct ApiBackend;

impl<P: PageSurface> InputBackend<P> for ApiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Api
    }

    fn move_pointer(&mut self, _page: &P, _x: f64, _y: f64) -> Result<()> {
        // No pointer to move; the click call targets the point directly
        Ok(())
    }

    fn click_at(&mut self, page: &P, x: f64, y: f64, modifiers: Modifiers) -> Result<()> {
        page.click_point(x, y, modifiers)
    }

    fn press_key(&mut self, page: &P, key: &str) -> Result<()> {
        page.press_key(key)
    }
}
