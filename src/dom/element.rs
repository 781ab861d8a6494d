use serde::{Deserialize, Serialize};

/// Bounding box coordinates for an element, in viewport pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Create a new BoundingBox
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Check if the bounding box is visible (has non-zero dimensions)
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Click target at the middle of the box, truncated to whole pixels
    pub fn center(&self) -> (f64, f64) {
        ((self.x + self.width / 2.0).trunc(), (self.y + self.height / 2.0).trunc())
    }
}

/// A form control as reported by the page-side summary script
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ControlSnapshot {
    /// Lowercase tag name
    pub tag: String,

    /// Minimal selector hint (`tag#id`, `tag.class1.class2` or `tag`)
    pub hint: String,

    #[serde(rename = "type")]
    pub input_type: String,

    pub name: String,

    pub placeholder: String,

    pub value: String,

    /// Rendered text (buttons)
    pub text: String,

    pub aria_label: String,

    /// Text of an associated `<label>`
    pub label: String,

    pub width: f64,

    pub height: f64,
}

/// A link as reported by the page-side summary script
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkSnapshot {
    pub hint: String,

    /// Selector hint of the parent element
    pub parent_hint: String,

    /// Tag of the first heading inside the link (`h1`..`h4`), if any
    pub heading: String,

    pub href: String,

    pub text: String,

    /// Distance of the link's top edge from the top of the viewport
    pub top: f64,

    pub width: f64,

    pub height: f64,
}

/// Raw interactive-element inventory of a page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub controls: Vec<ControlSnapshot>,
    pub links: Vec<LinkSnapshot>,
}
