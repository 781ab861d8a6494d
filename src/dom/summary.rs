//! Compact textual page description for text-only models.
//!
//! The summary is the only view of the page the model gets, so it keeps exactly what is needed
//! to tell roles apart: selector hints, the attributes that identify a search box, visibility
//! and size, and for links whether they wrap a heading (result titles usually do, navigation
//! chrome usually does not).

use crate::browser::{InteractionConfig, PageSurface};
use crate::dom::element::{ControlSnapshot, LinkSnapshot, PageSnapshot};
use crate::error::{BrowserError, Result};
use std::collections::HashSet;
use std::fmt;

pub const CONTROLS_HEADING: &str = "=== Inputs & Buttons ===";
pub const LINKS_HEADING: &str = "=== Links ===";

/// Filtering knobs of the summarizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryOptions {
    pub visibility_threshold: f64,
    pub link_cap: usize,
    pub link_top_band: f64,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self { visibility_threshold: 5.0, link_cap: 30, link_top_band: 30.0 }
    }
}

impl From<&InteractionConfig> for SummaryOptions {
    fn from(config: &InteractionConfig) -> Self {
        Self {
            visibility_threshold: config.visibility_threshold,
            link_cap: config.link_cap,
            link_top_band: config.link_top_band,
        }
    }
}

/// One element line of the summary
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSummaryLine {
    /// Selector hint of the element itself
    pub hint: String,

    /// Selector hint of the parent, for links
    pub parent_hint: Option<String>,

    /// Heading tag wrapped by a link
    pub heading: Option<String>,

    pub visible: bool,

    pub width: u32,

    pub height: u32,

    /// Salient attributes, in display order
    pub attributes: Vec<(&'static str, String)>,

    /// Link text
    pub link_text: Option<String>,
}

impl ElementSummaryLine {
    fn visibility_tag(&self) -> String {
        if self.visible { format!("[VISIBLE {}x{}]", self.width, self.height) } else { "[HIDDEN]".to_string() }
    }
}

impl fmt::Display for ElementSummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("  ")?;
        if let Some(parent) = &self.parent_hint {
            write!(f, "{} > ", parent)?;
        }
        f.write_str(&self.hint)?;
        if let Some(heading) = &self.heading {
            write!(f, " [has <{}>]", heading)?;
        }
        for (key, value) in &self.attributes {
            write!(f, " {}=\"{}\"", key, value)?;
        }
        write!(f, " {}", self.visibility_tag())?;
        if let Some(text) = &self.link_text {
            write!(f, " → \"{}\"", text)?;
        }
        Ok(())
    }
}

/// Summary of a page's interactive elements
#[derive(Debug, Clone, PartialEq)]
pub struct PageSummary {
    pub url: String,
    pub title: String,
    /// Inputs, text areas, buttons and editable regions, in document order
    pub controls: Vec<ElementSummaryLine>,
    /// Visible links with distinct text, in document order
    pub links: Vec<ElementSummaryLine>,
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn is_visible(width: f64, height: f64, threshold: f64) -> bool {
    width > threshold && height > threshold
}

fn control_line(control: &ControlSnapshot, options: &SummaryOptions) -> ElementSummaryLine {
    let mut attributes = Vec::new();
    if !control.input_type.is_empty() && control.input_type != "text" {
        attributes.push(("type", control.input_type.clone()));
    }
    if !control.name.is_empty() {
        attributes.push(("name", control.name.clone()));
    }
    if !control.placeholder.is_empty() {
        attributes.push(("placeholder", truncate_chars(&control.placeholder, 40)));
    }
    if !control.value.is_empty() {
        attributes.push(("value", truncate_chars(&control.value, 30)));
    }
    let text = control.text.trim();
    if !text.is_empty() && control.tag == "button" {
        attributes.push(("text", truncate_chars(text, 30)));
    }
    if !control.aria_label.is_empty() {
        attributes.push(("aria-label", truncate_chars(&control.aria_label, 30)));
    }
    if !control.label.is_empty() {
        attributes.push(("label", truncate_chars(&control.label, 30)));
    }

    ElementSummaryLine {
        hint: control.hint.clone(),
        parent_hint: None,
        heading: None,
        visible: is_visible(control.width, control.height, options.visibility_threshold),
        width: control.width.round() as u32,
        height: control.height.round() as u32,
        attributes,
        link_text: None,
    }
}

fn link_lines(links: &[LinkSnapshot], options: &SummaryOptions) -> Vec<ElementSummaryLine> {
    let mut seen = HashSet::new();
    let mut lines = Vec::new();

    for link in links {
        if lines.len() >= options.link_cap {
            break;
        }
        if link.href.is_empty() || link.href.starts_with("javascript:") {
            continue;
        }
        if link.width == 0.0 || link.height == 0.0 || link.top < options.link_top_band {
            continue;
        }

        let text = truncate_chars(&link.text.split_whitespace().collect::<Vec<_>>().join(" "), 80);
        if text.chars().count() < 2 || !seen.insert(text.clone()) {
            continue;
        }

        lines.push(ElementSummaryLine {
            hint: link.hint.clone(),
            parent_hint: (!link.parent_hint.is_empty()).then(|| link.parent_hint.clone()),
            heading: (!link.heading.is_empty()).then(|| link.heading.clone()),
            visible: is_visible(link.width, link.height, options.visibility_threshold),
            width: link.width.round() as u32,
            height: link.height.round() as u32,
            attributes: Vec::new(),
            link_text: Some(text),
        });
    }

    lines
}

impl PageSummary {
    pub fn from_snapshot(snapshot: &PageSnapshot, options: &SummaryOptions) -> Self {
        Self {
            url: snapshot.url.clone(),
            title: snapshot.title.clone(),
            controls: snapshot.controls.iter().map(|c| control_line(c, options)).collect(),
            links: link_lines(&snapshot.links, options),
        }
    }

    /// `URL:` and `Title:` lines followed by a blank line
    pub fn header(&self) -> String {
        format!("URL: {}\nTitle: {}\n", self.url, self.title)
    }

    /// Section headings and element lines, without blank separators
    pub fn body_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.controls.len() + self.links.len() + 2);
        lines.push(CONTROLS_HEADING.to_string());
        lines.extend(self.controls.iter().map(ToString::to_string));
        lines.push(LINKS_HEADING.to_string());
        lines.extend(self.links.iter().map(ToString::to_string));
        lines
    }

    pub fn render(&self) -> String {
        let mut out = self.header();
        out.push('\n');
        out.push_str(CONTROLS_HEADING);
        for line in &self.controls {
            out.push('\n');
            out.push_str(&line.to_string());
        }
        out.push_str("\n\n");
        out.push_str(LINKS_HEADING);
        for line in &self.links {
            out.push('\n');
            out.push_str(&line.to_string());
        }
        out
    }
}

impl fmt::Display for PageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

const SUMMARY_SCRIPT: &str = include_str!("summarize_page.js");

/// The snapshot script with the link filters of `options` applied page-side.
///
/// Links above the top band are dropped before the script's own candidate cap.
pub fn summary_script(options: &SummaryOptions) -> String {
    let top_band = if options.link_top_band.is_finite() { options.link_top_band } else { 0.0 };
    SUMMARY_SCRIPT.replace("__LINK_TOP_BAND__", &top_band.to_string())
}

/// Take a snapshot of `page` and summarize it
pub fn summarize<P: PageSurface + ?Sized>(page: &P, options: &SummaryOptions) -> Result<PageSummary> {
    let value = page.evaluate(&summary_script(options))?;

    // The script returns a JSON string
    let json_str = value
        .as_str()
        .ok_or_else(|| BrowserError::DomParseFailed("No value returned from summary script".to_string()))?;

    let snapshot: PageSnapshot = serde_json::from_str(json_str)
        .map_err(|e| BrowserError::DomParseFailed(format!("Failed to parse summary JSON: {}", e)))?;

    log::debug!(
        "Summarized {}: {} controls, {} link candidates",
        snapshot.url,
        snapshot.controls.len(),
        snapshot.links.len()
    );

    Ok(PageSummary::from_snapshot(&snapshot, options))
}
