//! Test doubles for the browser surface, input backends and the model endpoint.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use stealth_browse::browser::{
    BrowsingContext, ControlChannel, ElementRef, Modifiers, PageId, PageSurface,
};
use stealth_browse::dom::BoundingBox;
use stealth_browse::error::{BrowserError, Result};
use stealth_browse::input::{BackendKind, InputBackend};
use stealth_browse::llm::Completer;

/// An element on a fake page
#[derive(Debug, Clone)]
pub struct FakeElement {
    pub bbox: Option<BoundingBox>,
    pub text: String,
    pub href: Option<String>,
}

impl FakeElement {
    pub fn at(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { bbox: Some(BoundingBox::new(x, y, width, height)), text: String::new(), href: None }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn href(mut self, href: &str) -> Self {
        self.href = Some(href.to_string());
        self
    }
}

/// Interaction that makes a fake page navigate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Unmodified pointer click landing on an element of this selector
    PointerClick(String),
    /// Enter delivered through the control channel
    EnterKey,
    /// High-level unmodified click or key press
    ApiAction,
    /// Scripted form submission
    FormSubmit,
}

#[derive(Debug, Default)]
pub struct PageState {
    pub url: String,
    pub title: String,
    pub elements: HashMap<String, Vec<FakeElement>>,
    /// Value of the page's single text field
    pub value: String,
    pub channel_fails: bool,
    pub detach_fails: bool,
    /// URL a protocol click with modifiers opens in a new tab
    pub protocol_click_opens: Option<String>,
    /// URL a high-level click with modifiers opens in a new tab
    pub api_click_opens: Option<String>,
    /// y an element is moved to by `scroll_into_view`; the rest of the page moves with it
    pub scroll_target_y: Option<f64>,
    /// Navigation performed when the trigger fires
    pub navigate_on: Option<(Trigger, String)>,
    /// Page-level interactions, in order: `pointer:<selector|none>`, `key:Enter`,
    /// `api-click:<selector>`, `api-key:<key>`, `submit`
    pub actions: Vec<String>,
    pub closed: bool,
    pub fronted: usize,
    pub cleared: usize,
    pub typed: Vec<String>,
    pub screenshots: Vec<PathBuf>,
    pub api_clicks: Vec<(ElementRef, Modifiers)>,
}

/// Shared state of one fake browser
#[derive(Debug, Default)]
pub struct World {
    pub pages: Vec<FakePage>,
    /// Channel and tab lifecycle events, in order
    pub journal: Vec<String>,
    /// Every `navigate` call fails
    pub navigation_fails: bool,
    next_id: usize,
}

impl World {
    pub fn shared() -> Rc<RefCell<World>> {
        Rc::new(RefCell::new(World::default()))
    }
}

fn open_page(world: &Rc<RefCell<World>>, url: &str) -> FakePage {
    let mut w = world.borrow_mut();
    w.next_id += 1;
    let page = FakePage {
        id: format!("page-{}", w.next_id),
        state: Rc::new(RefCell::new(PageState { url: url.to_string(), ..Default::default() })),
        world: Rc::clone(world),
    };
    w.journal.push(format!("tab:{}", page.id));
    w.pages.push(page.clone());
    page
}

#[derive(Debug, Clone)]
pub struct FakePage {
    pub id: String,
    pub state: Rc<RefCell<PageState>>,
    world: Rc<RefCell<World>>,
}

impl FakePage {
    pub fn new(world: &Rc<RefCell<World>>, url: &str) -> Self {
        open_page(world, url)
    }

    pub fn add(&self, selector: &str, element: FakeElement) {
        self.state.borrow_mut().elements.entry(selector.to_string()).or_default().push(element);
    }

    fn element(&self, element: &ElementRef) -> Result<FakeElement> {
        self.state
            .borrow()
            .elements
            .get(&element.selector)
            .and_then(|all| all.get(element.nth))
            .cloned()
            .ok_or_else(|| BrowserError::ElementNotFound(element.selector.clone()))
    }

    pub fn actions(&self) -> Vec<String> {
        self.state.borrow().actions.clone()
    }

    fn record(&self, action: String) {
        self.state.borrow_mut().actions.push(action);
    }

    /// Selector of the element under viewport point `(x, y)`
    fn hit_test(&self, x: f64, y: f64) -> Option<String> {
        let state = self.state.borrow();
        let mut selectors: Vec<_> = state.elements.keys().cloned().collect();
        selectors.sort();
        selectors.into_iter().find(|selector| {
            state.elements[selector].iter().filter_map(|e| e.bbox).any(|b| {
                x >= b.x && x <= b.x + b.width && y >= b.y && y <= b.y + b.height
            })
        })
    }

    fn fire(&self, trigger: Trigger) {
        let mut state = self.state.borrow_mut();
        let target = match &state.navigate_on {
            Some((expected, url)) if *expected == trigger => url.clone(),
            _ => return,
        };
        state.url = target;
    }
}

#[derive(Debug)]
pub struct FakeChannel {
    page: FakePage,
}

impl ControlChannel for FakeChannel {
    fn send(&self, command: &str, params: Value) -> Result<Value> {
        if self.page.state.borrow().channel_fails {
            return Err(BrowserError::ChannelFailed("target closed".to_string()));
        }
        self.page.world.borrow_mut().journal.push(format!("send:{}:{}", self.page.id, command));

        let modified = params.get("modifiers").and_then(Value::as_u64).unwrap_or(0) != 0;
        match params.get("type").and_then(Value::as_str) {
            Some("mouseReleased") if modified => {
                let opens = self.page.state.borrow().protocol_click_opens.clone();
                if let Some(url) = opens {
                    open_page(&self.page.world, &url);
                }
            }
            Some("mouseReleased") => {
                let x = params.get("x").and_then(Value::as_f64).unwrap_or(-1.0);
                let y = params.get("y").and_then(Value::as_f64).unwrap_or(-1.0);
                let hit = self.page.hit_test(x, y);
                self.page.record(format!("pointer:{}", hit.as_deref().unwrap_or("none")));
                if let Some(selector) = hit {
                    self.page.fire(Trigger::PointerClick(selector));
                }
            }
            Some("keyDown") if params.get("key").and_then(Value::as_str) == Some("Enter") => {
                self.page.record("key:Enter".to_string());
                self.page.fire(Trigger::EnterKey);
            }
            Some("keyDown") => {
                if let Some(text) = params.get("text").and_then(Value::as_str) {
                    self.page.state.borrow_mut().value.push_str(text);
                }
            }
            _ => {}
        }
        Ok(Value::Null)
    }

    fn detach(&self) -> Result<()> {
        self.page.world.borrow_mut().journal.push(format!("detach:{}", self.page.id));
        if self.page.state.borrow().detach_fails {
            return Err(BrowserError::ChannelFailed("already detached".to_string()));
        }
        Ok(())
    }
}

impl PageSurface for FakePage {
    type Channel = FakeChannel;

    fn id(&self) -> PageId {
        PageId(self.id.clone())
    }

    fn open_channel(&self) -> Result<FakeChannel> {
        self.world.borrow_mut().journal.push(format!("open:{}", self.id));
        Ok(FakeChannel { page: self.clone() })
    }

    fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        if self.world.borrow().navigation_fails {
            return Err(BrowserError::NavigationFailed(format!("{} timed out", url)));
        }
        self.state.borrow_mut().url = url.to_string();
        Ok(())
    }

    fn locate_all(&self, selector: &str) -> Result<Vec<ElementRef>> {
        let count = self.state.borrow().elements.get(selector).map(Vec::len).unwrap_or(0);
        Ok((0..count).map(|nth| ElementRef::new(selector, nth)).collect())
    }

    fn bounding_box(&self, element: &ElementRef, _timeout: Duration) -> Result<Option<BoundingBox>> {
        Ok(self.element(element)?.bbox)
    }

    fn text_content(&self, element: &ElementRef) -> Result<String> {
        Ok(self.element(element)?.text)
    }

    fn input_value(&self, _element: &ElementRef) -> Result<String> {
        Ok(self.state.borrow().value.clone())
    }

    fn link_target(&self, element: &ElementRef) -> Result<Option<String>> {
        Ok(self.element(element)?.href)
    }

    fn scroll_into_view(&self, element: &ElementRef, _timeout: Duration) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let Some(target) = state.scroll_target_y else {
            return Ok(());
        };
        let Some(current) = state
            .elements
            .get(&element.selector)
            .and_then(|all| all.get(element.nth))
            .and_then(|el| el.bbox)
        else {
            return Ok(());
        };
        let dy = target - current.y;
        for bbox in state.elements.values_mut().flatten().filter_map(|el| el.bbox.as_mut()) {
            bbox.y += dy;
        }
        Ok(())
    }

    fn scroll_by(&self, _dy: f64) -> Result<()> {
        Ok(())
    }

    fn click_element(&self, element: &ElementRef, modifiers: Modifiers, _timeout: Duration) -> Result<()> {
        self.element(element)?;
        self.state.borrow_mut().api_clicks.push((element.clone(), modifiers));
        if modifiers.is_empty() {
            self.record(format!("api-click:{}", element.selector));
            self.fire(Trigger::ApiAction);
        } else {
            let opens = self.state.borrow().api_click_opens.clone();
            if let Some(url) = opens {
                open_page(&self.world, &url);
            }
        }
        Ok(())
    }

    fn click_point(&self, _x: f64, _y: f64, _modifiers: Modifiers) -> Result<()> {
        Ok(())
    }

    fn type_into(&self, _element: &ElementRef, text: &str, _per_char_delay: Duration) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.value.push_str(text);
        state.typed.push(text.to_string());
        Ok(())
    }

    fn clear(&self, _element: &ElementRef) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.value.clear();
        state.cleared += 1;
        Ok(())
    }

    fn press_key_on(&self, element: &ElementRef, key: &str) -> Result<()> {
        self.element(element)?;
        self.record(format!("api-key:{}", key));
        if key == "Enter" {
            self.fire(Trigger::ApiAction);
        }
        Ok(())
    }

    fn press_key(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    /// Form submission scripts fire [`Trigger::FormSubmit`]; anything else is answered with
    /// an empty page snapshot
    fn evaluate(&self, script: &str) -> Result<Value> {
        if script.contains(".submit()") {
            self.record("submit".to_string());
            self.fire(Trigger::FormSubmit);
            return Ok(Value::Null);
        }
        let state = self.state.borrow();
        let snapshot = serde_json::json!({ "url": state.url, "title": state.title, "controls": [], "links": [] });
        Ok(Value::String(snapshot.to_string()))
    }

    fn screenshot(&self, path: &Path) -> Result<()> {
        self.state.borrow_mut().screenshots.push(path.to_path_buf());
        Ok(())
    }

    fn current_url(&self) -> String {
        self.state.borrow().url.clone()
    }

    fn title(&self) -> Result<String> {
        Ok(self.state.borrow().title.clone())
    }

    fn viewport_origin(&self) -> Result<(f64, f64)> {
        Ok((0.0, 0.0))
    }

    fn bring_to_front(&self) -> Result<()> {
        self.state.borrow_mut().fronted += 1;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.state.borrow_mut().closed = true;
        self.world.borrow_mut().journal.push(format!("close:{}", self.id));
        Ok(())
    }

    fn wait(&self, _duration: Duration) {}
}

/// The open tabs of a [`World`]
pub struct FakeContext {
    pub world: Rc<RefCell<World>>,
}

impl FakeContext {
    pub fn new(world: &Rc<RefCell<World>>) -> Self {
        Self { world: Rc::clone(world) }
    }

    pub fn open_count(&self) -> usize {
        self.world.borrow().pages.iter().filter(|p| !p.state.borrow().closed).count()
    }
}

impl BrowsingContext for FakeContext {
    type Page = FakePage;

    fn pages(&self) -> Result<Vec<FakePage>> {
        Ok(self.world.borrow().pages.iter().filter(|p| !p.state.borrow().closed).cloned().collect())
    }

    fn new_page(&self) -> Result<FakePage> {
        Ok(open_page(&self.world, "about:blank"))
    }
}

/// Input backend with scripted failures, recording every call
pub struct ScriptedBackend {
    pub kind: BackendKind,
    pub fail_clicks: bool,
    /// Key presses delivered to the page before the rest are silently dropped
    pub deliver_keys: usize,
    pub calls: Vec<String>,
}

impl ScriptedBackend {
    pub fn working(kind: BackendKind) -> Self {
        Self { kind, fail_clicks: false, deliver_keys: usize::MAX, calls: Vec::new() }
    }

    pub fn failing(kind: BackendKind) -> Self {
        Self { fail_clicks: true, ..Self::working(kind) }
    }

    pub fn dropping_keys_after(kind: BackendKind, delivered: usize) -> Self {
        Self { deliver_keys: delivered, ..Self::working(kind) }
    }

    pub fn clicks(&self) -> usize {
        self.calls.iter().filter(|c| c.starts_with("click")).count()
    }
}

impl InputBackend<FakePage> for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn move_pointer(&mut self, _page: &FakePage, x: f64, y: f64) -> Result<()> {
        self.calls.push(format!("move {} {}", x, y));
        Ok(())
    }

    fn click_at(&mut self, _page: &FakePage, x: f64, y: f64, _modifiers: Modifiers) -> Result<()> {
        self.calls.push(format!("click {} {}", x, y));
        if self.fail_clicks {
            return Err(BrowserError::InputFailed { backend: self.kind.to_string(), reason: "scripted".into() });
        }
        Ok(())
    }

    fn press_key(&mut self, page: &FakePage, key: &str) -> Result<()> {
        self.calls.push(format!("key {}", key));
        let delivered = self.calls.iter().filter(|c| c.starts_with("key")).count();
        if delivered <= self.deliver_keys {
            page.state.borrow_mut().value.push_str(key);
        }
        Ok(())
    }
}

type Script = dyn Fn(&str) -> (Duration, Option<String>) + Send + Sync;

/// Completer whose latency and reply are computed from the prompt
pub struct ScriptedCompleter {
    script: Box<Script>,
    pub started: AtomicUsize,
    pub finished: AtomicUsize,
}

impl ScriptedCompleter {
    pub fn new<F>(script: F) -> Arc<Self>
    where
        F: Fn(&str) -> (Duration, Option<String>) + Send + Sync + 'static,
    {
        Arc::new(Self { script: Box::new(script), started: AtomicUsize::new(0), finished: AtomicUsize::new(0) })
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Completer for ScriptedCompleter {
    async fn complete(&self, prompt: &str, _timeout: Duration) -> Option<String> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let (delay, reply) = (self.script)(prompt);
        tokio::time::sleep(delay).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        reply
    }
}
