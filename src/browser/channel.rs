//! Low-level control channels and the per-engine channel cache

use crate::browser::{PageId, PageSurface};
use crate::error::{BrowserError, Result};
use headless_chrome::Tab;
use headless_chrome::protocol::cdp::types::Method;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// A stateful command channel bound to exactly one page
pub trait ControlChannel {
    /// Send a protocol command. Fails when the bound page navigated away or closed.
    fn send(&self, command: &str, params: Value) -> Result<Value>;

    /// Release the channel. Called once, before the cache drops it.
    fn detach(&self) -> Result<()>;
}

macro_rules! raw_command {
    ($name:ident, $method:literal) => {
        #[derive(Debug, Serialize)]
        #[serde(transparent)]
        struct $name(Value);

        impl Method for $name {
            const NAME: &'static str = $method;
            type ReturnObject = Value;
        }
    };
}

raw_command!(DispatchMouseEvent, "Input.dispatchMouseEvent");
raw_command!(DispatchKeyEvent, "Input.dispatchKeyEvent");
raw_command!(SetIgnoreInputEvents, "Input.setIgnoreInputEvents");

/// CDP channel over a headless_chrome tab
pub struct TabChannel {
    tab: Arc<Tab>,
}

impl TabChannel {
    /// Bind to `tab` and make sure it accepts input events
    pub fn open(tab: Arc<Tab>) -> Result<Self> {
        let channel = Self { tab };
        channel.send("Input.setIgnoreInputEvents", serde_json::json!({ "ignore": false }))?;
        Ok(channel)
    }
}

impl ControlChannel for TabChannel {
    fn send(&self, command: &str, params: Value) -> Result<Value> {
        let result = match command {
            "Input.dispatchMouseEvent" => self.tab.call_method(DispatchMouseEvent(params)),
            "Input.dispatchKeyEvent" => self.tab.call_method(DispatchKeyEvent(params)),
            "Input.setIgnoreInputEvents" => self.tab.call_method(SetIgnoreInputEvents(params)),
            other => return Err(BrowserError::ChannelFailed(format!("Unsupported command {}", other))),
        };

        result.map_err(|e| BrowserError::ChannelFailed(format!("{} failed: {}", command, e)))
    }

    /// Nothing to tear down: `send` only issues `Input.*` commands, which need no domain
    /// enable/disable, and the channel borrows the tab's DevTools session rather than
    /// attaching its own. The session is closed by headless_chrome when the tab goes away.
    fn detach(&self) -> Result<()> {
        log::debug!("Detaching control channel from {}", self.tab.get_target_id());
        Ok(())
    }
}

/// Holds at most one live control channel, bound to the page it was opened for.
///
/// Acquiring a channel for a different page releases the old one first.
pub struct SessionCache<C: ControlChannel> {
    bound: Option<(PageId, C)>,
}

impl<C: ControlChannel> Default for SessionCache<C> {
    fn default() -> Self {
        Self { bound: None }
    }
}

impl<C: ControlChannel> SessionCache<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The channel for `page`, opening (and rebinding) it when needed
    pub fn acquire<P>(&mut self, page: &P) -> Result<&C>
    where
        P: PageSurface<Channel = C> + ?Sized,
    {
        let id = page.id();
        let stale = self.bound.as_ref().is_none_or(|(bound, _)| *bound != id);

        if stale {
            self.release();
            let channel = page.open_channel()?;
            log::debug!("Opened control channel for page {}", id);
            self.bound = Some((id, channel));
        }

        self.bound
            .as_ref()
            .map(|(_, channel)| channel)
            .ok_or_else(|| BrowserError::ChannelFailed("No channel bound".to_string()))
    }

    /// Drop the cached channel. Release errors are logged and swallowed.
    pub fn release(&mut self) {
        if let Some((id, channel)) = self.bound.take() {
            if let Err(e) = channel.detach() {
                log::debug!("Ignoring error while releasing channel for {}: {}", id, e);
            }
        }
    }

    /// Page the cached channel is bound to
    pub fn bound_page(&self) -> Option<&PageId> {
        self.bound.as_ref().map(|(id, _)| id)
    }
}

impl<C: ControlChannel> Drop for SessionCache<C> {
    fn drop(&mut self) {
        self.release();
    }
}
