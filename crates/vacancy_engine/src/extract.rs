use std::sync::Arc;

use monitor_logging::{monitor_debug, monitor_warn};

use crate::anchor_scan::scan_job_anchors;
use crate::job_link::{dedupe_titles, is_probable_job_link};
use crate::metadata::extract_metadata_titles;
use crate::structured::{Anchor, ScraperParser, StructuredParser};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
    #[error("markup could not be parsed: {0}")]
    Markup(String),
}

/// Vacancy title extraction with an ordered fallback chain:
/// tree anchors, then `ld+json` metadata, then the tag scanner.
/// The first strategy yielding any title wins; results are never merged.
#[derive(Clone)]
pub struct Extractor {
    parser: Option<Arc<dyn StructuredParser>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(Some(Arc::new(ScraperParser)))
    }
}

impl Extractor {
    /// `None` disables the tree strategy and the reported-count lookup.
    pub fn new(parser: Option<Arc<dyn StructuredParser>>) -> Self {
        Self { parser }
    }

    pub fn extract(&self, html: &str) -> Vec<String> {
        if let Some(parser) = &self.parser {
            match parser.vacancy_anchors(html) {
                Ok(anchors) => {
                    let titles = filter_anchors(anchors);
                    if !titles.is_empty() {
                        monitor_debug!("Tree strategy found {} titles", titles.len());
                        return titles;
                    }
                }
                Err(err) => monitor_warn!("Tree strategy failed: {}", err),
            }
        }

        let titles = extract_metadata_titles(html);
        if !titles.is_empty() {
            monitor_debug!("Metadata strategy found {} titles", titles.len());
            return titles;
        }

        let titles = filter_anchors(scan_job_anchors(html));
        monitor_debug!("Tag scanner found {} titles", titles.len());
        titles
    }

    pub fn extract_count(&self, html: &str) -> Option<u64> {
        self.parser.as_ref()?.reported_count(html)
    }
}

fn filter_anchors(anchors: Vec<Anchor>) -> Vec<String> {
    dedupe_titles(
        anchors
            .into_iter()
            .filter(|anchor| is_probable_job_link(&anchor.href, &anchor.text))
            .map(|anchor| anchor.text.trim().to_string()),
    )
}
