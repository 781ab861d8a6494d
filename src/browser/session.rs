use crate::browser::channel::TabChannel;
use crate::browser::config::{ConnectionOptions, LaunchOptions};
use crate::browser::{BrowsingContext, ElementRef, Modifiers, PageId, PageSurface};
use crate::dom::BoundingBox;
use crate::error::{BrowserError, Result};
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, Element, Tab};
use serde_json::{Value, json};
use std::{ffi::OsStr, path::Path, sync::Arc, time::Duration};

/// Browser session that manages a Chrome/Chromium instance
pub struct BrowserSession {
    /// The underlying headless_chrome Browser instance
    browser: Browser,
}

impl BrowserSession {
    /// Launch a new browser instance with the given options
    pub fn launch(options: LaunchOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        // Ignore default arguments to prevent detection by anti-bot services
        launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
        launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));
        launch_opts.args.push(OsStr::new("--disable-dev-shm-usage"));
        launch_opts.args.push(OsStr::new("--window-position=0,0"));

        // Set the browser's idle timeout to 1 hour (default is 30 seconds) to prevent the session from closing too soon
        launch_opts.idle_browser_timeout = Duration::from_secs(60 * 60);

        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));

        if let Some(path) = options.chrome_path {
            launch_opts.path = Some(path);
        }

        if let Some(dir) = options.user_data_dir {
            launch_opts.user_data_dir = Some(dir);
        }

        launch_opts.sandbox = options.sandbox;

        let browser = Browser::new(launch_opts).map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        browser.new_tab().map_err(|e| BrowserError::LaunchFailed(format!("Failed to create tab: {}", e)))?;

        Ok(Self { browser })
    }

    /// Connect to an existing browser instance via WebSocket
    pub fn connect(options: ConnectionOptions) -> Result<Self> {
        let browser = Browser::connect(options.ws_url).map_err(|e| BrowserError::ConnectionFailed(e.to_string()))?;

        Ok(Self { browser })
    }

    /// Get all tabs
    pub fn get_tabs(&self) -> Result<Vec<Arc<Tab>>> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to get tabs: {}", e)))?
            .clone();

        Ok(tabs)
    }

    /// The most recently opened tab that is still alive
    pub fn first_page(&self) -> Result<CdpPage> {
        self.get_tabs()?
            .into_iter()
            .next_back()
            .map(CdpPage::new)
            .ok_or_else(|| BrowserError::TabOperationFailed("No open tab".to_string()))
    }

    /// Get the underlying Browser instance
    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Close every tab; the process exits when the session is dropped
    pub fn close(&self) -> Result<()> {
        for tab in self.get_tabs()? {
            let _ = tab.close(false); // Ignore errors on individual tab closes
        }
        Ok(())
    }
}

impl BrowsingContext for BrowserSession {
    type Page = CdpPage;

    fn pages(&self) -> Result<Vec<CdpPage>> {
        Ok(self.get_tabs()?.into_iter().map(CdpPage::new).collect())
    }

    fn new_page(&self) -> Result<CdpPage> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to create tab: {}", e)))?;
        Ok(CdpPage::new(tab))
    }
}

/// A headless_chrome tab exposed as a [`PageSurface`]
#[derive(Clone)]
pub struct CdpPage {
    tab: Arc<Tab>,
}

impl CdpPage {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    fn element(&self, element: &ElementRef) -> Result<Element<'_>> {
        let mut matches = self
            .tab
            .find_elements(&element.selector)
            .map_err(|e| BrowserError::ElementNotFound(format!("'{}': {}", element.selector, e)))?;

        if element.nth >= matches.len() {
            return Err(BrowserError::ElementNotFound(format!(
                "'{}' has {} matches, wanted #{}",
                element.selector,
                matches.len(),
                element.nth
            )));
        }

        Ok(matches.swap_remove(element.nth))
    }

    /// Call `function` with `this` bound to the element and return its JSON value
    fn call_on(&self, element: &ElementRef, function: &str, args: Vec<Value>) -> Result<Value> {
        let remote = self
            .element(element)?
            .call_js_fn(function, args, false)
            .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;

        Ok(remote.value.unwrap_or(Value::Null))
    }

    fn call_on_string(&self, element: &ElementRef, function: &str) -> Result<String> {
        Ok(match self.call_on(element, function, vec![])? {
            Value::String(s) => s,
            _ => String::new(),
        })
    }
}

const BOUNDING_RECT_JS: &str = r#"function() {
    const r = this.getBoundingClientRect();
    return JSON.stringify({ x: r.x, y: r.y, width: r.width, height: r.height });
}"#;

const MODIFIED_CLICK_JS: &str = r#"function(alt, ctrl, meta, shift) {
    const init = { bubbles: true, cancelable: true, view: window, button: 0,
                   altKey: alt, ctrlKey: ctrl, metaKey: meta, shiftKey: shift };
    this.dispatchEvent(new MouseEvent('mousedown', init));
    this.dispatchEvent(new MouseEvent('mouseup', init));
    this.dispatchEvent(new MouseEvent('click', init));
    return true;
}"#;

fn modifier_args(modifiers: Modifiers) -> Vec<Value> {
    vec![
        json!(modifiers.contains(Modifiers::ALT)),
        json!(modifiers.contains(Modifiers::CTRL)),
        json!(modifiers.contains(Modifiers::META)),
        json!(modifiers.contains(Modifiers::SHIFT)),
    ]
}

impl PageSurface for CdpPage {
    type Channel = TabChannel;

    fn id(&self) -> PageId {
        PageId(self.tab.get_target_id().to_string())
    }

    fn open_channel(&self) -> Result<TabChannel> {
        TabChannel::open(self.tab.clone())
    }

    fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        self.tab.set_default_timeout(timeout);
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| BrowserError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e)))?;

        Ok(())
    }

    fn locate_all(&self, selector: &str) -> Result<Vec<ElementRef>> {
        // headless_chrome reports "no match" as an error; that is an empty result here
        let count = self.tab.find_elements(selector).map(|found| found.len()).unwrap_or(0);
        Ok((0..count).map(|nth| ElementRef::new(selector, nth)).collect())
    }

    fn bounding_box(&self, element: &ElementRef, timeout: Duration) -> Result<Option<BoundingBox>> {
        self.tab.set_default_timeout(timeout);
        let raw = self.call_on_string(element, BOUNDING_RECT_JS)?;
        let rect: BoundingBox =
            serde_json::from_str(&raw).map_err(|e| BrowserError::DomParseFailed(format!("Bad geometry: {}", e)))?;

        Ok(rect.is_visible().then_some(rect))
    }

    fn text_content(&self, element: &ElementRef) -> Result<String> {
        self.call_on_string(element, "function() { return (this.textContent || '').trim(); }")
    }

    fn input_value(&self, element: &ElementRef) -> Result<String> {
        self.call_on_string(
            element,
            "function() { return ('value' in this) ? String(this.value) : (this.innerText || ''); }",
        )
    }

    fn link_target(&self, element: &ElementRef) -> Result<Option<String>> {
        let href = self.call_on_string(
            element,
            "function() { const a = this.closest('a[href]') || this; return a.href ? String(a.href) : ''; }",
        )?;
        Ok((!href.is_empty()).then_some(href))
    }

    fn scroll_into_view(&self, element: &ElementRef, timeout: Duration) -> Result<()> {
        self.tab.set_default_timeout(timeout);
        self.element(element)?
            .scroll_into_view()
            .map_err(|e| BrowserError::EvaluationFailed(format!("scrollIntoView failed: {}", e)))?;
        Ok(())
    }

    fn scroll_by(&self, dy: f64) -> Result<()> {
        self.evaluate(&format!("window.scrollBy(0, {dy})")).map(|_| ())
    }

    fn click_element(&self, element: &ElementRef, modifiers: Modifiers, timeout: Duration) -> Result<()> {
        self.tab.set_default_timeout(timeout);
        if modifiers.is_empty() {
            self.element(element)?
                .click()
                .map_err(|e| BrowserError::ToolExecutionFailed { tool: "click".to_string(), reason: e.to_string() })?;
            return Ok(());
        }

        self.call_on(element, MODIFIED_CLICK_JS, modifier_args(modifiers)).map(|_| ())
    }

    fn click_point(&self, x: f64, y: f64, modifiers: Modifiers) -> Result<()> {
        let script = format!(
            "(function() {{ const el = document.elementFromPoint({x}, {y}); if (!el) return false; \
             return ({MODIFIED_CLICK_JS}).call(el, {}, {}, {}, {}); }})()",
            modifiers.contains(Modifiers::ALT),
            modifiers.contains(Modifiers::CTRL),
            modifiers.contains(Modifiers::META),
            modifiers.contains(Modifiers::SHIFT),
        );
        match self.evaluate(&script)? {
            Value::Bool(true) => Ok(()),
            _ => Err(BrowserError::ElementNotFound(format!("Nothing at ({}, {})", x, y))),
        }
    }

    fn type_into(&self, element: &ElementRef, text: &str, per_char_delay: Duration) -> Result<()> {
        self.element(element)?
            .focus()
            .map_err(|e| BrowserError::ToolExecutionFailed { tool: "input".to_string(), reason: e.to_string() })?;

        let mut buf = [0u8; 4];
        for ch in text.chars() {
            self.tab
                .type_str(ch.encode_utf8(&mut buf))
                .map_err(|e| BrowserError::ToolExecutionFailed { tool: "input".to_string(), reason: e.to_string() })?;
            std::thread::sleep(per_char_delay);
        }
        Ok(())
    }

    fn clear(&self, element: &ElementRef) -> Result<()> {
        self.call_on(
            element,
            "function() { if ('value' in this) { this.value = ''; } else { this.textContent = ''; } \
             this.dispatchEvent(new Event('input', { bubbles: true })); return true; }",
            vec![],
        )
        .map(|_| ())
    }

    fn press_key_on(&self, element: &ElementRef, key: &str) -> Result<()> {
        self.element(element)?
            .focus()
            .map_err(|e| BrowserError::ToolExecutionFailed { tool: "press_key".to_string(), reason: e.to_string() })?;
        self.press_key(key)
    }

    fn press_key(&self, key: &str) -> Result<()> {
        self.tab
            .press_key(key)
            .map_err(|e| BrowserError::ToolExecutionFailed { tool: "press_key".to_string(), reason: e.to_string() })?;
        Ok(())
    }

    fn evaluate(&self, script: &str) -> Result<Value> {
        let result = self.tab.evaluate(script, false).map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;
        Ok(result.value.unwrap_or(Value::Null))
    }

    fn screenshot(&self, path: &Path) -> Result<()> {
        let png = self
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| BrowserError::ScreenshotFailed(e.to_string()))?;

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| BrowserError::ScreenshotFailed(e.to_string()))?;
        }
        std::fs::write(path, png)
            .map_err(|e| BrowserError::ScreenshotFailed(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn current_url(&self) -> String {
        self.tab.get_url()
    }

    fn title(&self) -> Result<String> {
        self.tab.get_title().map_err(|e| BrowserError::TabOperationFailed(format!("Failed to read title: {}", e)))
    }

    fn viewport_origin(&self) -> Result<(f64, f64)> {
        let value = self.evaluate(
            "JSON.stringify([window.screenX + (window.outerWidth - window.innerWidth), \
             window.screenY + (window.outerHeight - window.innerHeight)])",
        )?;
        let raw = value.as_str().unwrap_or("[0,0]");
        let origin: (f64, f64) =
            serde_json::from_str(raw).map_err(|e| BrowserError::EvaluationFailed(format!("Bad origin: {}", e)))?;
        Ok(origin)
    }

    fn bring_to_front(&self) -> Result<()> {
        self.tab
            .activate()
            .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to activate tab: {}", e)))?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.tab.close(true).map_err(|e| BrowserError::TabOperationFailed(format!("Failed to close tab: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_args_order() {
        let args = modifier_args(Modifiers::CTRL | Modifiers::SHIFT);
        assert_eq!(args, vec![json!(false), json!(true), json!(false), json!(true)]);
    }

    // Integration tests (require Chrome to be installed)
    #[test]
    #[ignore] // Ignore by default, run with: cargo test -- --ignored
    fn test_launch_browser() {
        let result = BrowserSession::launch(LaunchOptions::new().headless(true));
        assert!(result.is_ok());
    }

    #[test]
    #[ignore]
    fn test_new_page_is_listed() {
        let session = BrowserSession::launch(LaunchOptions::new().headless(true)).expect("Failed to launch browser");

        let before = session.pages().expect("Failed to list pages").len();
        session.new_page().expect("Failed to open page");
        let after = session.pages().expect("Failed to list pages").len();
        assert_eq!(after, before + 1);
    }

    #[test]
    #[ignore]
    fn test_navigate_and_locate() {
        let session = BrowserSession::launch(LaunchOptions::new().headless(true)).expect("Failed to launch browser");
        let page = session.first_page().unwrap();

        page.navigate("data:text/html,<input name='q'><input name='r'>", Duration::from_secs(10)).unwrap();
        let found = page.locate_all("input").unwrap();
        assert_eq!(found.len(), 2);
        assert!(page.locate("textarea").unwrap().is_none());
    }
}
