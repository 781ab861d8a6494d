//! End-to-end "search and open results" run.
//!
//! The run never hardcodes a selector: the search form and the result links are both found by
//! racing model prompts over the page summary. Terminal failures take a diagnostic screenshot
//! before the error is returned.

use crate::browser::{BrowsingContext, InteractionConfig, Modifiers, PageSurface};
use crate::dom::{SummaryOptions, summarize};
use crate::error::{BrowserError, Result};
use crate::llm::{RaceResolver, ResolvedSelector, SelectorGoal, SelectorRole};
use crate::tools::{
    ClickOutcome, Interactor, Located, NewContextOutcome, TypeOutcome, locate_element, locate_elements, same_page,
};
use serde::Serialize;
use std::time::Duration;
use tokio::runtime::Handle;

const SUBMIT_FORM_JS: &str = "document.querySelector('form')?.submit()";

/// Parameters of one run
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    pub query: String,
    /// Number of result links to open
    pub max_results: usize,
    pub model_timeout: Duration,
    pub navigation_timeout: Duration,
    /// Time a submission step gets to navigate away before the next one is tried
    pub submit_wait: Duration,
}

impl WorkflowOptions {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: 3,
            model_timeout: Duration::from_secs(180),
            navigation_timeout: Duration::from_secs(30),
            submit_wait: Duration::from_secs(5),
        }
    }
}

/// How the search form was finally submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMethod {
    /// Click on the resolved button, or Enter when no button was found
    Primary,
    /// Re-focus the input and press Enter through the input backends
    EnterKey,
    /// High-level click on the button, or Enter on the input
    ApiAction,
    /// Scripted `form.submit()`
    FormSubmit,
}

/// A result link opened in a new tab
#[derive(Debug, Clone, Serialize)]
pub struct ResultVisit {
    pub text: String,
    pub outcome: NewContextOutcome,
}

/// Everything observable about a completed run
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub start_url: String,
    pub results_url: String,
    pub form: ResolvedSelector,
    pub links: ResolvedSelector,
    pub input_click: ClickOutcome,
    pub typing: TypeOutcome,
    pub submitted_via: SubmitMethod,
    pub visits: Vec<ResultVisit>,
}

/// Drives one search: resolve the form, type, submit, resolve result links, open them
pub struct SearchWorkflow<B: BrowsingContext> {
    interactor: Interactor<B::Page>,
    resolver: RaceResolver,
    runtime: Handle,
    options: WorkflowOptions,
}

impl<B: BrowsingContext> SearchWorkflow<B> {
    /// `runtime` runs the model requests; call [`run`](Self::run) from outside of it
    pub fn new(config: InteractionConfig, resolver: RaceResolver, runtime: Handle, options: WorkflowOptions) -> Self {
        Self { interactor: Interactor::new(config), resolver, runtime, options }
    }

    pub fn interactor(&self) -> &Interactor<B::Page> {
        &self.interactor
    }

    fn config(&self) -> &InteractionConfig {
        self.interactor.config()
    }

    fn screenshot(&self, page: &B::Page, name: &str) {
        let path = self.config().screenshot_path(name);
        match page.screenshot(&path) {
            Ok(()) => log::debug!("Screenshot saved to {}", path.display()),
            Err(e) => log::warn!("Screenshot {} failed: {}", name, e),
        }
    }

    /// Take a diagnostic screenshot and hand back `err`
    fn abort(&self, page: &B::Page, err: BrowserError) -> BrowserError {
        log::error!("Aborting: {}", err);
        self.screenshot(page, "error.png");
        err
    }

    fn resolve(&self, page: &B::Page, goal: SelectorGoal) -> Result<ResolvedSelector> {
        let summary = summarize(page, &SummaryOptions::from(self.config()))?.render();
        log::debug!("Page summary ({} chars):\n{}", summary.chars().count(), summary);

        let resolved = self.runtime.block_on(goal.resolve(
            &self.resolver,
            &summary,
            self.config().chunk_limit,
            self.options.model_timeout,
        ))?;
        log::info!("Resolved {:?} from '{}': {:?}", goal, resolved.source, resolved.selectors);
        Ok(resolved)
    }

    fn selector<'a>(resolved: &'a ResolvedSelector, role: SelectorRole) -> Result<&'a str> {
        resolved.get(role).ok_or_else(|| BrowserError::NoSelector(role.to_string()))
    }

    /// Run the whole search on `page`, opening result links in new tabs of `ctx`
    pub fn run(&mut self, ctx: &B, page: &B::Page, url: &str) -> Result<WorkflowReport> {
        log::info!("[Phase 1] Opening {}", url);
        page.navigate(url, self.options.navigation_timeout).map_err(|e| self.abort(page, e))?;
        let start_url = page.current_url();
        self.screenshot(page, "01-homepage.png");

        log::info!("[Phase 2] Resolving the search form");
        let form = self.resolve(page, SelectorGoal::SearchForm).map_err(|e| self.abort(page, e))?;
        let input_selector = Self::selector(&form, SelectorRole::Input)?.to_string();
        let button_selector = Self::selector(&form, SelectorRole::Button)?.to_string();

        log::info!("[Phase 3] Typing '{}' into '{}'", self.options.query, input_selector);
        let mut input = locate_element(page, &input_selector, self.config()).ok_or_else(|| {
            self.abort(page, BrowserError::ElementNotFound(format!("selector '{}' matched nothing", input_selector)))
        })?;
        let (input_click, bbox) = self.interactor.click_element(page, &input.element, input.bbox, "search input");
        input.bbox = bbox;
        page.wait(Duration::from_millis(300));

        let typing = self.interactor.smart_type(page, &input.element, &self.options.query);
        if !typing.is_success() {
            return Err(self.abort(
                page,
                BrowserError::ToolExecutionFailed { tool: "type".to_string(), reason: "search text not entered".into() },
            ));
        }
        self.screenshot(page, "02-typed.png");

        log::info!("[Phase 4] Submitting the search");
        let button = locate_element(page, &button_selector, self.config());
        let submitted_via =
            self.submit(page, &start_url, &mut input, button.as_ref()).map_err(|e| self.abort(page, e))?;
        let results_url = page.current_url();
        self.screenshot(page, "03-results.png");

        log::info!("[Phase 5] Resolving result links on {}", results_url);
        let links = self.resolve(page, SelectorGoal::ResultLinks).map_err(|e| self.abort(page, e))?;
        let link_selector = Self::selector(&links, SelectorRole::Link)?.to_string();

        let candidates = locate_elements(page, &link_selector, self.config().safe_region.top, self.config());
        if candidates.is_empty() {
            return Err(self.abort(
                page,
                BrowserError::ElementNotFound(format!("no usable result links for '{}'", link_selector)),
            ));
        }
        log::info!("Found {} result links, opening up to {}", candidates.len(), self.options.max_results);

        log::info!("[Phase 6] Opening results in new tabs");
        let mut visits = Vec::new();
        for (i, link) in candidates.into_iter().take(self.options.max_results).enumerate() {
            let label = format!("result-{}", i + 1);
            log::info!("[{}] {}", label, link.text);
            let outcome = self.interactor.open_in_new_context(ctx, page, &link.element, link.bbox, &label);
            visits.push(ResultVisit { text: link.text, outcome });
        }

        if !visits.iter().any(|v| v.outcome.is_success()) {
            return Err(self.abort(page, BrowserError::TabOperationFailed("no result opened in a new tab".into())));
        }

        self.interactor.release();
        Ok(WorkflowReport { start_url, results_url, form, links, input_click, typing, submitted_via, visits })
    }

    fn navigated(&self, page: &B::Page, start_url: &str) -> bool {
        page.wait(self.options.submit_wait);
        !same_page(&page.current_url(), start_url)
    }

    /// Click the input where it is now, then press Enter.
    ///
    /// Earlier clicks may have scrolled the page, so the input's geometry is read again and the
    /// click goes through the same fixed-UI clearance as every element click.
    fn refocus_and_enter(&mut self, page: &B::Page, input: &mut Located) -> Result<()> {
        match page.bounding_box(&input.element, self.config().locate_timeout()) {
            Ok(Some(bbox)) => input.bbox = bbox,
            Ok(None) => log::warn!("Search input is no longer rendered, reusing its last position"),
            Err(e) => log::warn!("Re-reading the search input failed: {}", e),
        }
        let (_, bbox) = self.interactor.click_element(page, &input.element, input.bbox, "input refocus");
        input.bbox = bbox;
        page.wait(Duration::from_millis(200));
        self.interactor.press_key(page, "Enter").map(|_| ())
    }

    /// Submit the form, escalating until the page navigates away from `start_url`
    fn submit(
        &mut self,
        page: &B::Page,
        start_url: &str,
        input: &mut Located,
        button: Option<&Located>,
    ) -> Result<SubmitMethod> {
        match button {
            Some(button) => {
                self.interactor.click_element(page, &button.element, button.bbox, "search button");
            }
            None => {
                log::info!("Button not found, pressing Enter instead");
                if let Err(e) = self.refocus_and_enter(page, input) {
                    log::warn!("Enter key failed: {}", e);
                }
            }
        }
        if self.navigated(page, start_url) {
            return Ok(SubmitMethod::Primary);
        }

        log::info!("URL unchanged, trying Enter key");
        if let Err(e) = self.refocus_and_enter(page, input) {
            log::warn!("Enter key failed: {}", e);
        }
        if self.navigated(page, start_url) {
            return Ok(SubmitMethod::EnterKey);
        }

        log::info!("Still unchanged, trying high-level action");
        let api_result = match button {
            Some(button) => page.click_element(&button.element, Modifiers::NONE, self.config().api_click_wait()),
            None => page.press_key_on(&input.element, "Enter"),
        };
        match api_result {
            Ok(()) if self.navigated(page, start_url) => return Ok(SubmitMethod::ApiAction),
            Ok(()) => {}
            Err(e) => log::warn!("High-level submit failed: {}", e),
        }

        log::info!("Still unchanged, submitting the form by script");
        match page.evaluate(SUBMIT_FORM_JS) {
            Ok(_) if self.navigated(page, start_url) => return Ok(SubmitMethod::FormSubmit),
            Ok(_) => {}
            Err(e) => log::warn!("Form submit failed: {}", e),
        }

        Err(BrowserError::NavigationFailed("every submit method left the page unchanged".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = WorkflowOptions::new("rust");
        assert_eq!(options.max_results, 3);
        assert_eq!(options.model_timeout, Duration::from_secs(180));
    }

    #[test]
    fn test_submit_method_serialization() {
        assert_eq!(serde_json::to_value(SubmitMethod::FormSubmit).unwrap(), "form_submit");
    }
}
