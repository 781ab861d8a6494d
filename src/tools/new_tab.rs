use crate::browser::{BrowsingContext, ElementRef, InteractionConfig, Modifiers, PageId, PageSurface};
use crate::dom::BoundingBox;
use crate::error::BrowserError;
use crate::input::InputBackend;
use crate::tools::locate::clear_fixed_ui;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

const DIRECT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(15);

/// How a new tab was opened for a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NewContextMethod {
    /// Synthetic protocol click with the new-tab modifier held
    ProtocolClick,
    /// High-level API click with the new-tab modifier held
    ApiClick,
    /// The link's target opened in a manually created tab
    DirectUrl,
}

impl fmt::Display for NewContextMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NewContextMethod::ProtocolClick => "cdp modifier click",
            NewContextMethod::ApiClick => "api modifier click",
            NewContextMethod::DirectUrl => "direct url",
        };
        f.write_str(name)
    }
}

/// A method that did not produce a new tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodFailure {
    pub method: NewContextMethod,
    pub reason: String,
}

/// State of the new tab, captured before it was closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextCapture {
    pub title: String,
    pub url: String,
    /// Screenshot file, when capture succeeded
    pub screenshot: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NewContextOutcome {
    Opened { via: NewContextMethod, capture: ContextCapture, failures: Vec<MethodFailure> },
    Failed { failures: Vec<MethodFailure> },
}

impl NewContextOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, NewContextOutcome::Opened { .. })
    }

    pub fn via(&self) -> Option<NewContextMethod> {
        match self {
            NewContextOutcome::Opened { via, .. } => Some(*via),
            NewContextOutcome::Failed { .. } => None,
        }
    }

    pub fn capture(&self) -> Option<&ContextCapture> {
        match self {
            NewContextOutcome::Opened { capture, .. } => Some(capture),
            NewContextOutcome::Failed { .. } => None,
        }
    }

    pub fn failures(&self) -> &[MethodFailure] {
        match self {
            NewContextOutcome::Opened { failures, .. } | NewContextOutcome::Failed { failures } => failures,
        }
    }
}

fn page_ids<B: BrowsingContext>(ctx: &B) -> HashSet<PageId> {
    match ctx.pages() {
        Ok(pages) => pages.iter().map(PageSurface::id).collect(),
        Err(e) => {
            log::debug!("Listing pages failed: {}", e);
            HashSet::new()
        }
    }
}

/// A page of `ctx` that was not open before
fn fresh_page<B: BrowsingContext>(ctx: &B, before: &HashSet<PageId>) -> Option<B::Page> {
    ctx.pages().ok()?.into_iter().rev().find(|p| !before.contains(&p.id()))
}

/// Poll for a fresh page, `attempts` times `interval` apart
fn poll_fresh_page<B: BrowsingContext>(
    ctx: &B,
    page: &B::Page,
    before: &HashSet<PageId>,
    config: &InteractionConfig,
) -> Option<B::Page> {
    for _ in 0..config.new_context_poll_attempts {
        page.wait(config.new_context_poll_interval());
        if let Some(fresh) = fresh_page(ctx, before) {
            return Some(fresh);
        }
    }
    None
}

fn capture_and_close<P: PageSurface>(target: &P, origin: &P, label: &str, config: &InteractionConfig) -> ContextCapture {
    target.wait(config.new_context_settle());

    let title = target.title().unwrap_or_default();
    let url = target.current_url();
    log::info!("[New Tab] {} | {}", title.chars().take(50).collect::<String>(), url);

    let path = config.screenshot_path(&format!("{}.png", label));
    let screenshot = match target.screenshot(&path) {
        Ok(()) => Some(path),
        Err(e) => {
            log::warn!("Screenshot of new tab failed: {}", e);
            None
        }
    };

    if let Err(e) = target.close() {
        log::warn!("Closing new tab failed: {}", e);
    }
    config.pacing.wait(Duration::from_millis(500));
    if let Err(e) = origin.bring_to_front() {
        log::warn!("Refocusing original tab failed: {}", e);
    }

    ContextCapture { title, url, screenshot }
}

/// Open `element`'s link in a new tab without navigating `page`, capture it, and close it.
///
/// Methods are tried in order, each only when the previous one produced no new tab:
/// a protocol click with the new-tab modifier through `protocol`, a high-level modified click,
/// then opening the link target in a manually created tab. Focus returns to `page` afterwards.
pub fn open_in_new_context<B: BrowsingContext>(
    ctx: &B,
    page: &B::Page,
    protocol: &mut dyn InputBackend<B::Page>,
    element: &ElementRef,
    bbox: BoundingBox,
    label: &str,
    config: &InteractionConfig,
) -> NewContextOutcome {
    let bbox = clear_fixed_ui(page, element, bbox, config);
    let (cx, cy) = bbox.center();
    let modifiers = Modifiers::new_context();
    let mut before = page_ids(ctx);
    before.insert(page.id());
    let mut failures = Vec::new();

    // Protocol modifier click
    let clicked = protocol.move_pointer(page, cx, cy).and_then(|_| protocol.click_at(page, cx, cy, modifiers));
    match clicked {
        Ok(()) => {
            log::debug!("[{}] modifier click '{}' at ({}, {})", protocol.kind(), label, cx as i64, cy as i64);
            if let Some(target) = poll_fresh_page(ctx, page, &before, config) {
                let capture = capture_and_close(&target, page, label, config);
                return NewContextOutcome::Opened { via: NewContextMethod::ProtocolClick, capture, failures };
            }
            failures.push(MethodFailure { method: NewContextMethod::ProtocolClick, reason: "no new tab".to_string() });
        }
        Err(e) => {
            failures.push(MethodFailure { method: NewContextMethod::ProtocolClick, reason: e.to_string() });
        }
    }
    log::info!("No new tab from {}, trying {}", NewContextMethod::ProtocolClick, NewContextMethod::ApiClick);

    // High-level modifier click
    match page.click_element(element, modifiers, config.api_click_wait()) {
        Ok(()) => {
            page.wait(config.api_click_wait());
            if let Some(target) = fresh_page(ctx, &before).or_else(|| poll_fresh_page(ctx, page, &before, config)) {
                let capture = capture_and_close(&target, page, label, config);
                return NewContextOutcome::Opened { via: NewContextMethod::ApiClick, capture, failures };
            }
            failures.push(MethodFailure { method: NewContextMethod::ApiClick, reason: "no new tab".to_string() });
        }
        Err(e) => {
            failures.push(MethodFailure { method: NewContextMethod::ApiClick, reason: e.to_string() });
        }
    }
    log::info!("No new tab from {}, trying {}", NewContextMethod::ApiClick, NewContextMethod::DirectUrl);

    // Direct navigation to the link target
    let opened = page
        .link_target(element)
        .and_then(|href| {
            let href = href.ok_or_else(|| BrowserError::ElementNotFound("element has no link target".into()))?;
            let target = ctx.new_page()?;
            if let Err(e) = target.navigate(&href, DIRECT_NAVIGATION_TIMEOUT) {
                if let Err(close_err) = target.close() {
                    log::warn!("Closing tab after failed navigation to {} failed: {}", href, close_err);
                }
                return Err(e);
            }
            Ok(target)
        });
    match opened {
        Ok(target) => {
            let capture = capture_and_close(&target, page, label, config);
            return NewContextOutcome::Opened { via: NewContextMethod::DirectUrl, capture, failures };
        }
        Err(e) => {
            failures.push(MethodFailure { method: NewContextMethod::DirectUrl, reason: e.to_string() });
        }
    }

    log::warn!("All methods failed to open '{}' in a new tab", label);
    NewContextOutcome::Failed { failures }
}
