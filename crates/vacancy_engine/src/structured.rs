use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::extract::ExtractionError;
use crate::job_link::{normalize_text, VACANCY_PATH_MARKER};

/// Element path holding the page's own vacancy total:
/// `/html/body/main/div/div[2]/div/span`. Positions are 1-based among
/// same-named siblings; `None` matches every such child.
pub const REPORTED_COUNT_PATH: [(&str, Option<usize>); 7] = [
    ("html", None),
    ("body", None),
    ("main", None),
    ("div", None),
    ("div", Some(2)),
    ("div", None),
    ("span", None),
];

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").expect("digit pattern"));

/// Link target and normalized visible text of one anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

/// Tree-based HTML access used by the first extraction strategy and by the
/// reported-count lookup.
pub trait StructuredParser: Send + Sync {
    /// Anchors whose `href` contains the vacancy path marker, in document order.
    fn vacancy_anchors(&self, html: &str) -> Result<Vec<Anchor>, ExtractionError>;

    /// Total reported by the page itself, if the fixed element is present.
    fn reported_count(&self, html: &str) -> Option<u64>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ScraperParser;

impl StructuredParser for ScraperParser {
    fn vacancy_anchors(&self, html: &str) -> Result<Vec<Anchor>, ExtractionError> {
        let selector = format!("a[href*=\"{VACANCY_PATH_MARKER}\"]");
        let selector = Selector::parse(&selector).map_err(|err| ExtractionError::Selector {
            selector: selector.clone(),
            message: err.to_string(),
        })?;
        let doc = Html::parse_document(html);

        Ok(doc
            .select(&selector)
            .map(|anchor| Anchor {
                href: anchor.value().attr("href").unwrap_or_default().to_string(),
                text: normalize_text(&anchor.text().collect::<Vec<_>>().join(" ")),
            })
            .collect())
    }

    fn reported_count(&self, html: &str) -> Option<u64> {
        let doc = Html::parse_document(html);
        let target = follow_path(doc.root_element(), &REPORTED_COUNT_PATH)?;
        let text = target.text().collect::<String>();
        DIGITS.find(&text)?.as_str().parse().ok()
    }
}

/// First element (document order) reached by walking `path` from the root.
fn follow_path<'a>(root: ElementRef<'a>, path: &[(&str, Option<usize>)]) -> Option<ElementRef<'a>> {
    let ((root_name, _), rest) = path.split_first()?;
    if !root.value().name().eq_ignore_ascii_case(root_name) {
        return None;
    }

    let mut frontier = vec![root];
    for (name, position) in rest {
        frontier = frontier
            .into_iter()
            .flat_map(|parent| {
                let matching: Vec<ElementRef<'a>> = parent
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|child| child.value().name().eq_ignore_ascii_case(name))
                    .collect();
                match position {
                    Some(pos) => matching.into_iter().nth(pos.saturating_sub(1)).into_iter().collect(),
                    None => matching,
                }
            })
            .collect();
        if frontier.is_empty() {
            return None;
        }
    }
    frontier.into_iter().next()
}
