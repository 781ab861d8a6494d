//! Browser control surface
//!
//! The interaction engine never talks to headless_chrome directly. It goes through two narrow
//! traits so that every strategy can run against a real tab or against a test double:
//! - [`PageSurface`]: one live tab (navigation, element lookup, geometry, screenshots)
//! - [`BrowsingContext`]: the set of open tabs (listing and opening them)
//!
//! [`BrowserSession`] and [`CdpPage`] are the headless_chrome implementations.

pub mod channel;
pub mod config;
pub mod session;

pub use channel::{ControlChannel, SessionCache, TabChannel};
pub use config::{ConnectionOptions, InteractionConfig, LaunchOptions, SafeRegion};
pub use session::{BrowserSession, CdpPage};

use crate::dom::BoundingBox;
use crate::error::Result;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Opaque identity of a live tab
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageId(pub String);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to an element: the selector that found it and its position among the matches.
///
/// It is re-resolved on every call, so a stale reference surfaces as `ElementNotFound`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub selector: String,
    pub nth: usize,
}

impl ElementRef {
    pub fn new(selector: impl Into<String>, nth: usize) -> Self {
        Self { selector: selector.into(), nth }
    }
}

/// Keyboard modifiers held during a pointer event, in CDP bitmask encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers(u32);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const ALT: Modifiers = Modifiers(1);
    pub const CTRL: Modifiers = Modifiers(2);
    pub const META: Modifiers = Modifiers(4);
    pub const SHIFT: Modifiers = Modifiers(8);

    /// The modifier that makes a link click open a new tab on this platform
    pub fn new_context() -> Self {
        if cfg!(target_os = "macos") { Self::META } else { Self::CTRL }
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Self) -> Self::Output {
        Modifiers(self.0 | rhs.0)
    }
}

/// One live browser tab.
///
/// Every call may fail on timeout or staleness; callers treat those failures as
/// "not found / not ready yet" rather than fatal.
pub trait PageSurface {
    /// Low-level channel type bound to this page
    type Channel: ControlChannel;

    fn id(&self) -> PageId;

    /// Open a fresh low-level control channel bound to this page
    fn open_channel(&self) -> Result<Self::Channel>;

    fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// All elements currently matching `selector`, in document order
    fn locate_all(&self, selector: &str) -> Result<Vec<ElementRef>>;

    /// First element matching `selector`
    fn locate(&self, selector: &str) -> Result<Option<ElementRef>> {
        Ok(self.locate_all(selector)?.into_iter().next())
    }

    /// Viewport-relative geometry, `None` when the element is not rendered
    fn bounding_box(&self, element: &ElementRef, timeout: Duration) -> Result<Option<BoundingBox>>;

    fn text_content(&self, element: &ElementRef) -> Result<String>;

    /// Current value of a form control (or the text of an editable region)
    fn input_value(&self, element: &ElementRef) -> Result<String>;

    /// Absolute navigation target of a link, if it has one
    fn link_target(&self, element: &ElementRef) -> Result<Option<String>>;

    fn scroll_into_view(&self, element: &ElementRef, timeout: Duration) -> Result<()>;

    /// Scroll the window vertically by `dy` pixels
    fn scroll_by(&self, dy: f64) -> Result<()>;

    /// High-level element click through the automation API
    fn click_element(&self, element: &ElementRef, modifiers: Modifiers, timeout: Duration) -> Result<()>;

    /// High-level click at a viewport point through the automation API
    fn click_point(&self, x: f64, y: f64, modifiers: Modifiers) -> Result<()>;

    /// High-level text entry, one character every `per_char_delay`
    fn type_into(&self, element: &ElementRef, text: &str, per_char_delay: Duration) -> Result<()>;

    /// Empty a form control
    fn clear(&self, element: &ElementRef) -> Result<()>;

    /// High-level key press with the element focused
    fn press_key_on(&self, element: &ElementRef, key: &str) -> Result<()>;

    /// High-level key press on whatever currently has focus
    fn press_key(&self, key: &str) -> Result<()>;

    /// Evaluate a script in the page and return its JSON value
    fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    fn screenshot(&self, path: &Path) -> Result<()>;

    fn current_url(&self) -> String;

    fn title(&self) -> Result<String>;

    /// Screen coordinates of the viewport's top-left corner
    fn viewport_origin(&self) -> Result<(f64, f64)>;

    fn bring_to_front(&self) -> Result<()>;

    fn close(&self) -> Result<()>;

    fn wait(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// The set of tabs sharing one browser context
pub trait BrowsingContext {
    type Page: PageSurface;

    /// Every open tab, in creation order
    fn pages(&self) -> Result<Vec<Self::Page>>;

    /// Open a new blank tab
    fn new_page(&self) -> Result<Self::Page>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_bits() {
        let combo = Modifiers::CTRL | Modifiers::SHIFT;
        assert_eq!(combo.bits(), 10);
        assert!(combo.contains(Modifiers::CTRL));
        assert!(!combo.contains(Modifiers::ALT));
        assert!(Modifiers::NONE.is_empty());
    }

    #[test]
    fn test_new_context_modifier() {
        let modifier = Modifiers::new_context();
        assert!(modifier == Modifiers::CTRL || modifier == Modifiers::META);
    }

    #[test]
    fn test_element_ref() {
        let element = ElementRef::new("h3 a", 2);
        assert_eq!(element.selector, "h3 a");
        assert_eq!(element.nth, 2);
    }
}
