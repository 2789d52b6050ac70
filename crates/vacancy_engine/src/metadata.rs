use std::sync::LazyLock;

use html_escape::decode_html_entities;
use monitor_logging::monitor_debug;
use regex::Regex;
use serde_json::Value;

use crate::job_link::dedupe_titles;

static LD_JSON_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("ld+json pattern")
});

const POSTING_TYPE_MARKERS: [&str; 3] = ["jobposting", "job", "vacancy"];

/// Titles of job postings declared in `application/ld+json` blocks.
pub fn extract_metadata_titles(html: &str) -> Vec<String> {
    let mut titles = Vec::new();
    for block in LD_JSON_BLOCK.captures_iter(html) {
        let raw = decode_html_entities(&block[1]);
        let data: Value = match serde_json::from_str(raw.trim()) {
            Ok(data) => data,
            Err(err) => {
                monitor_debug!("Skipping unparsable ld+json block: {}", err);
                continue;
            }
        };
        collect_titles(&data, &mut titles);
    }
    dedupe_titles(titles)
}

fn collect_titles(data: &Value, titles: &mut Vec<String>) {
    let items: Vec<&Value> = match data {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    for item in items {
        let Value::Object(fields) = item else {
            continue;
        };
        if let Some(graph) = fields.get("@graph") {
            collect_titles(graph, titles);
        }
        if !is_posting_type(fields.get("@type")) {
            continue;
        }
        let title = fields
            .get("jobTitle")
            .filter(|t| t.as_str().is_some_and(|s| !s.trim().is_empty()))
            .or_else(|| fields.get("title"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty());
        if let Some(title) = title {
            titles.push(title.to_string());
        }
    }
}

fn is_posting_type(declared: Option<&Value>) -> bool {
    let declared = match declared {
        Some(Value::String(kind)) => kind.to_lowercase(),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase(),
        _ => return false,
    };
    POSTING_TYPE_MARKERS
        .iter()
        .any(|marker| declared.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_graph_and_array_types() {
        let html = r#"<script type='application/ld+json'>
            {"@context":"https://schema.org","@graph":[
                {"@type":["JobPosting"],"title":"QA Lead"},
                {"@type":"Organization","name":"Avito"}
            ]}
        </script>"#;
        assert_eq!(extract_metadata_titles(html), vec!["QA Lead".to_string()]);
    }

    #[test]
    fn prefers_job_title_over_title() {
        let html = r#"<script type="application/ld+json">
            {"@type":"Vacancy","jobTitle":"  Mobile QA  ","title":"ignored"}
        </script>"#;
        assert_eq!(extract_metadata_titles(html), vec!["Mobile QA".to_string()]);
    }

    #[test]
    fn broken_json_is_skipped() {
        let html = r#"<script type="application/ld+json">{not json</script>
            <script type="application/ld+json">{"@type":"JobPosting","title":"QA"}</script>"#;
        assert_eq!(extract_metadata_titles(html), vec!["QA".to_string()]);
    }
}
