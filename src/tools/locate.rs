//! Selector → element resolution with geometry.
//!
//! Every lookup failure here is "not found yet": errors from the page are logged and turned
//! into `None` or an empty list so callers can move on to the next selector or chunk.

use crate::browser::{ElementRef, InteractionConfig, PageSurface};
use crate::dom::BoundingBox;
use std::collections::HashSet;
use std::time::Duration;

/// Minimum width of an element returned by [`locate_elements`]
const LIST_MIN_WIDTH: f64 = 30.0;

/// Elements examined per selector by [`find_results`]
const RESULTS_PER_SELECTOR: usize = 10;

/// A matched element and its geometry
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub element: ElementRef,
    pub bbox: BoundingBox,
}

/// A matched element with its visible text
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedText {
    pub element: ElementRef,
    pub bbox: BoundingBox,
    pub text: String,
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// First match of `selector`, scrolled into view, if it is wider than the visibility threshold
pub fn locate_element<P: PageSurface + ?Sized>(
    page: &P,
    selector: &str,
    config: &InteractionConfig,
) -> Option<Located> {
    let matches = match page.locate_all(selector) {
        Ok(m) => m,
        Err(e) => {
            log::debug!("[locate] '{}' failed: {}", selector, e);
            return None;
        }
    };
    log::debug!("[locate] '{}' matched {} elements", selector, matches.len());

    let element = matches.into_iter().next()?;

    if let Err(e) = page.scroll_into_view(&element, config.scroll_timeout()) {
        log::debug!("[locate] scroll into view failed: {}", e);
    }

    match page.bounding_box(&element, config.locate_timeout()) {
        Ok(Some(bbox)) if bbox.width > config.visibility_threshold => Some(Located { element, bbox }),
        Ok(Some(bbox)) => {
            log::debug!("[locate] '{}' too small ({}x{})", selector, bbox.width, bbox.height);
            None
        }
        Ok(None) => None,
        Err(e) => {
            log::debug!("[locate] no geometry for '{}': {}", selector, e);
            None
        }
    }
}

/// All matches of `selector` wider than 30px whose top edge is below `min_y`
pub fn locate_elements<P: PageSurface + ?Sized>(
    page: &P,
    selector: &str,
    min_y: f64,
    config: &InteractionConfig,
) -> Vec<LocatedText> {
    let matches = page.locate_all(selector).unwrap_or_else(|e| {
        log::debug!("[locate] '{}' failed: {}", selector, e);
        Vec::new()
    });

    let mut found = Vec::new();
    for element in matches {
        let Ok(Some(bbox)) = page.bounding_box(&element, config.locate_timeout()) else {
            continue;
        };
        if bbox.width <= LIST_MIN_WIDTH || bbox.y <= min_y {
            continue;
        }
        let text = page.text_content(&element).unwrap_or_default();
        found.push(LocatedText { element, bbox, text: truncate_chars(text.trim(), 80) });
    }

    log::debug!("[locate] '{}': {} usable elements below y={}", selector, found.len(), min_y);
    found
}

/// First of `selectors` whose first match is at least `min_width` wide
pub fn find_first<P: PageSurface + ?Sized>(
    page: &P,
    selectors: &[&str],
    min_width: f64,
    config: &InteractionConfig,
) -> Option<(String, Located)> {
    selectors.iter().find_map(|selector| {
        let element = page.locate(selector).ok().flatten()?;
        let bbox = page.bounding_box(&element, config.locate_timeout()).ok().flatten()?;
        (bbox.width >= min_width).then(|| (selector.to_string(), Located { element, bbox }))
    })
}

/// Titled, de-duplicated results across `selectors`, stopping once `min_count` are collected
pub fn find_results<P: PageSurface + ?Sized>(
    page: &P,
    selectors: &[&str],
    min_count: usize,
    min_width: f64,
    config: &InteractionConfig,
) -> Vec<LocatedText> {
    let mut seen = HashSet::new();
    let mut results = Vec::new();

    for selector in selectors {
        let matches = page.locate_all(selector).unwrap_or_default();
        for element in matches.into_iter().take(RESULTS_PER_SELECTOR) {
            let Ok(Some(bbox)) = page.bounding_box(&element, config.locate_timeout()) else {
                continue;
            };
            if bbox.width < min_width {
                continue;
            }
            let text = page.text_content(&element).unwrap_or_default();
            let title = text.trim();
            if title.chars().count() <= 5 || !seen.insert(title.to_string()) {
                continue;
            }
            results.push(LocatedText { element, bbox, text: truncate_chars(title, 80) });
        }

        if results.len() >= min_count {
            break;
        }
    }

    results
}

/// Move `element` out of fixed page chrome before clicking it.
///
/// Returns the geometry to click: `bbox` unchanged when its center is already inside the safe
/// region, otherwise the geometry re-read after scrolling. Geometry is never reused across a
/// scroll.
pub fn clear_fixed_ui<P: PageSurface + ?Sized>(
    page: &P,
    element: &ElementRef,
    bbox: BoundingBox,
    config: &InteractionConfig,
) -> BoundingBox {
    let region = config.safe_region;
    let (_, cy) = bbox.center();
    if region.contains(cy) {
        return bbox;
    }

    log::debug!("Element center y={} outside safe region {}..{}, scrolling", cy, region.top, region.bottom);
    if let Err(e) = page.scroll_into_view(element, config.scroll_timeout()) {
        log::debug!("scroll into view failed: {}", e);
    }
    config.pacing.wait(Duration::from_millis(500));

    let mut current = reread(page, element, bbox, config);
    let (_, cy) = current.center();
    if !region.contains(cy) {
        // Still under a sticky header or below the fold: center it in the safe region
        let middle = (region.top + region.bottom) / 2.0;
        if let Err(e) = page.scroll_by(cy - middle) {
            log::debug!("scroll by {} failed: {}", cy - middle, e);
        }
        config.pacing.wait(Duration::from_millis(300));
        current = reread(page, element, current, config);
    }
    current
}

fn reread<P: PageSurface + ?Sized>(
    page: &P,
    element: &ElementRef,
    fallback: BoundingBox,
    config: &InteractionConfig,
) -> BoundingBox {
    match page.bounding_box(element, config.locate_timeout()) {
        Ok(Some(bbox)) => bbox,
        _ => fallback,
    }
}
