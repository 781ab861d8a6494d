//! Click/type strategy
//!
//! Interactions are fallback chains over the input backends. [`Interactor`] owns one instance
//! of each backend (and with the protocol backend, the engine's only control channel) and
//! exposes the high-level operations:
//! - [`Interactor::smart_click`]: click at a point, escalating through `click_order`
//! - [`Interactor::smart_type`]: key injection verified by reading the field back
//! - [`Interactor::open_in_new_context`]: open a link in a new tab, capture it, close it
//!
//! The free functions in [`click`], [`input`] and [`new_tab`] take their backends as
//! arguments so they can run against any [`InputBackend`] implementation.

pub mod click;
pub mod input;
pub mod locate;
pub mod new_tab;
pub mod utils;

pub use click::{Attempt, ClickOutcome, click_through};
pub use input::{TypeOutcome, smart_type};
pub use locate::{Located, LocatedText, clear_fixed_ui, find_first, find_results, locate_element, locate_elements};
pub use new_tab::{ContextCapture, MethodFailure, NewContextMethod, NewContextOutcome, open_in_new_context};
pub use utils::{normalize_url, same_page};

use crate::browser::{BrowsingContext, ElementRef, InteractionConfig, Modifiers, PageSurface};
use crate::dom::BoundingBox;
use crate::error::{BrowserError, Result};
use crate::input::{ApiBackend, BackendKind, InputBackend, OsBackend, ProtocolBackend};

/// The interaction engine for pages of type `P`
pub struct Interactor<P: PageSurface> {
    protocol: ProtocolBackend<P::Channel>,
    os: OsBackend,
    api: ApiBackend,
    config: InteractionConfig,
}

impl<P: PageSurface> Interactor<P> {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            protocol: ProtocolBackend::new(config.pacing),
            os: OsBackend::new(config.pacing),
            api: ApiBackend,
            config,
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    /// The protocol backend and its session cache
    pub fn protocol(&self) -> &ProtocolBackend<P::Channel> {
        &self.protocol
    }

    /// Backends named by `order`, each at most once
    fn chain<'a>(
        protocol: &'a mut ProtocolBackend<P::Channel>,
        os: &'a mut OsBackend,
        api: &'a mut ApiBackend,
        order: &[BackendKind],
    ) -> Vec<&'a mut dyn InputBackend<P>> {
        let mut protocol = Some(protocol as &mut dyn InputBackend<P>);
        let mut os = Some(os as &mut dyn InputBackend<P>);
        let mut api = Some(api as &mut dyn InputBackend<P>);

        order
            .iter()
            .filter_map(|kind| match kind {
                BackendKind::Protocol => protocol.take(),
                BackendKind::Os => os.take(),
                BackendKind::Api => api.take(),
            })
            .collect()
    }

    /// Click at viewport `(x, y)`, trying the configured backends in order
    pub fn smart_click(&mut self, page: &P, x: f64, y: f64, label: &str) -> ClickOutcome {
        let mut chain = Self::chain(&mut self.protocol, &mut self.os, &mut self.api, &self.config.click_order);
        click_through(&mut chain, page, x, y, Modifiers::NONE, label)
    }

    /// Click the center of an element after moving it clear of fixed page chrome.
    ///
    /// Returns the outcome with the geometry the click was aimed at, which differs from `bbox`
    /// whenever clearing the fixed UI scrolled the page.
    pub fn click_element(
        &mut self,
        page: &P,
        element: &ElementRef,
        bbox: BoundingBox,
        label: &str,
    ) -> (ClickOutcome, BoundingBox) {
        let bbox = clear_fixed_ui(page, element, bbox, &self.config);
        let (x, y) = bbox.center();
        (self.smart_click(page, x, y, label), bbox)
    }

    /// Type into the focused `element` through `key_backend` injection, verified, with API fallback
    pub fn smart_type(&mut self, page: &P, element: &ElementRef, text: &str) -> TypeOutcome {
        let keys: &mut dyn InputBackend<P> = match self.config.key_backend {
            BackendKind::Protocol => &mut self.protocol,
            BackendKind::Os => &mut self.os,
            BackendKind::Api => &mut self.api,
        };
        smart_type(keys, page, element, text, &self.config)
    }

    /// Press `key` through the click backends in order, returning the backend that delivered it
    pub fn press_key(&mut self, page: &P, key: &str) -> Result<BackendKind> {
        let chain = Self::chain(&mut self.protocol, &mut self.os, &mut self.api, &self.config.click_order);
        let mut errors = Vec::new();

        for backend in chain {
            let kind = backend.kind();
            match backend.press_key(page, key) {
                Ok(()) => return Ok(kind),
                Err(e) => {
                    log::warn!("[{}] Key '{}' failed: {}", kind, key, e);
                    errors.push(format!("{}: {}", kind, e));
                }
            }
        }

        Err(BrowserError::InputFailed { backend: "all".to_string(), reason: errors.join("; ") })
    }

    /// Open `element`'s link in a new tab of `ctx`, capture and close it
    pub fn open_in_new_context<B>(
        &mut self,
        ctx: &B,
        page: &P,
        element: &ElementRef,
        bbox: BoundingBox,
        label: &str,
    ) -> NewContextOutcome
    where
        B: BrowsingContext<Page = P>,
    {
        open_in_new_context(ctx, page, &mut self.protocol, element, bbox, label, &self.config)
    }

    /// Release the cached control channel
    pub fn release(&mut self) {
        self.protocol.release();
    }
}
