//! Page structure for text-only models
//!
//! This module turns a live page into the textual view the selector resolver reasons over:
//! - element: geometry and the raw snapshot reported by the page-side script
//! - summary: the compact summary of inputs, buttons and links
//! - chunk: splitting a summary into bounded blocks

pub mod chunk;
pub mod element;
pub mod summary;

pub use chunk::{Chunk, chunk, split_summary};
pub use element::{BoundingBox, ControlSnapshot, LinkSnapshot, PageSnapshot};
pub use summary::{ElementSummaryLine, PageSummary, SummaryOptions, summarize, summary_script};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_summary_chunks_back_to_body() {
        let summary = PageSummary {
            url: "https://example.com/".to_string(),
            title: "Example".to_string(),
            controls: Vec::new(),
            links: Vec::new(),
        };

        let (header, body) = split_summary(&summary.render());
        assert_eq!(header, summary.header().trim_end());

        let chunks = chunk(&body, &header, 2000);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].to_prompt_text().contains("=== Links ==="));
    }
}
