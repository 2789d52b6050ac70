use std::collections::HashSet;

/// Anchors pointing at listings carry this path fragment.
pub const VACANCY_PATH_MARKER: &str = "/vacancies/";

const SECTION_SEGMENT: &str = "vacancies";
const FILTER_MARKER: &str = "action=filter";
const MIN_TITLE_CHARS: usize = 5;

/// Navigation labels that link into the section without naming a listing.
const NAVIGATION_LABELS: [&str; 3] = ["вакансии", "назад", "смотреть вакансии"];

/// Collapse every whitespace run to one space and trim the ends.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `(href, text)` looks like a link to one specific vacancy.
pub fn is_probable_job_link(href: &str, text: &str) -> bool {
    let label = text.trim().to_lowercase();
    if label.is_empty() || NAVIGATION_LABELS.contains(&label.as_str()) {
        return false;
    }
    if href.trim_end_matches('/').ends_with("/vacancies") {
        return false;
    }
    if href.contains(FILTER_MARKER) {
        return false;
    }
    if label.chars().count() < MIN_TITLE_CHARS {
        return false;
    }

    let path = href.split('?').next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.iter().position(|s| *s == SECTION_SEGMENT) {
        Some(idx) => segments.len() > idx + 1,
        None => false,
    }
}

/// Drop repeated titles, keeping the first occurrence in order.
pub fn dedupe_titles<I>(titles: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    titles
        .into_iter()
        .filter(|title| seen.insert(title.clone()))
        .collect()
}
