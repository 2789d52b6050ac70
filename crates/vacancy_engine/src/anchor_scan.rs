//! Forgiving tag scanner that needs no DOM.
//!
//! It walks the markup once, tracking nesting inside anchors whose `href`
//! contained the vacancy marker when they opened, and yields each such
//! anchor's target with its normalized text.

use html_escape::decode_html_entities;

use crate::job_link::{normalize_text, VACANCY_PATH_MARKER};
use crate::structured::Anchor;

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// Collect `(href, text)` pairs for anchors pointing at vacancy pages.
pub fn scan_job_anchors(html: &str) -> Vec<Anchor> {
    let mut state = ScanState::default();
    let mut rest = html;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            state.text(rest);
            break;
        };
        state.text(&rest[..lt]);
        rest = &rest[lt..];

        if let Some(body) = rest.strip_prefix("<!--") {
            rest = body.find("-->").map_or("", |end| &body[end + 3..]);
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            rest = rest.find('>').map_or("", |end| &rest[end + 1..]);
            continue;
        }

        match parse_tag(rest) {
            Scan::Tag(Tag::Start { name, href, self_closing }, consumed) => {
                rest = &rest[consumed..];
                if RAW_TEXT_ELEMENTS.contains(&name.as_str()) && !self_closing {
                    rest = skip_raw_text(rest, &name);
                    continue;
                }
                let is_void = self_closing || VOID_ELEMENTS.contains(&name.as_str());
                state.open(&name, href, is_void);
            }
            Scan::Tag(Tag::End { name }, consumed) => {
                rest = &rest[consumed..];
                state.close(&name);
            }
            Scan::Text => {
                state.text("<");
                rest = &rest[1..];
            }
            Scan::Unterminated => break,
        }
    }

    state.items
}

#[derive(Default)]
struct ScanState {
    inside: bool,
    depth: usize,
    href: String,
    chunks: Vec<String>,
    items: Vec<Anchor>,
}

impl ScanState {
    fn open(&mut self, name: &str, href: Option<String>, is_void: bool) {
        if name == "a" {
            if let Some(href) = href.filter(|h| h.contains(VACANCY_PATH_MARKER)) {
                self.inside = true;
                self.depth = 1;
                self.href = href;
                self.chunks.clear();
                return;
            }
        }
        if self.inside && !is_void {
            self.depth += 1;
        }
    }

    fn close(&mut self, name: &str) {
        if !self.inside {
            return;
        }
        self.depth = self.depth.saturating_sub(1);
        if name == "a" && self.depth == 0 {
            let text = normalize_text(&self.chunks.join(" "));
            if !text.is_empty() {
                self.items.push(Anchor {
                    href: std::mem::take(&mut self.href),
                    text,
                });
            }
            self.inside = false;
            self.href.clear();
            self.chunks.clear();
        }
    }

    fn text(&mut self, data: &str) {
        if self.inside && !data.is_empty() {
            self.chunks.push(decode_html_entities(data).into_owned());
        }
    }
}

enum Tag {
    Start {
        name: String,
        href: Option<String>,
        self_closing: bool,
    },
    End {
        name: String,
    },
}

enum Scan {
    /// A tag and the number of bytes it spans.
    Tag(Tag, usize),
    /// A lone '<' that starts no tag.
    Text,
    /// The tag is still open at the end of input, so nothing after it is markup.
    Unterminated,
}

/// Parse the tag at the start of `input` (which begins with '<').
fn parse_tag(input: &str) -> Scan {
    let bytes = input.as_bytes();
    let mut pos = 1;
    let closing = bytes.get(pos) == Some(&b'/');
    if closing {
        pos += 1;
    }

    let name_start = pos;
    while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'-') {
        pos += 1;
    }
    if pos == name_start || !bytes[name_start].is_ascii_alphabetic() {
        return Scan::Text;
    }
    let name = input[name_start..pos].to_ascii_lowercase();

    match finish_tag(input, pos, closing, name) {
        Some((tag, consumed)) => Scan::Tag(tag, consumed),
        None => Scan::Unterminated,
    }
}

/// Read attributes from `pos` up to the closing '>'; `None` when input ends first.
fn finish_tag(input: &str, mut pos: usize, closing: bool, name: String) -> Option<(Tag, usize)> {
    let bytes = input.as_bytes();
    if closing {
        let end = input[pos..].find('>')? + pos;
        return Some((Tag::End { name }, end + 1));
    }

    let mut href = None;
    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match bytes.get(pos)? {
            b'>' => {
                let self_closing = input[..pos].ends_with('/');
                return Some((
                    Tag::Start {
                        name,
                        href,
                        self_closing,
                    },
                    pos + 1,
                ));
            }
            b'/' => {
                pos += 1;
                continue;
            }
            _ => {}
        }

        let attr_start = pos;
        while pos < bytes.len()
            && !bytes[pos].is_ascii_whitespace()
            && !matches!(bytes[pos], b'=' | b'>' | b'/')
        {
            pos += 1;
        }
        let attr_name = input[attr_start..pos].to_ascii_lowercase();
        if attr_name.is_empty() {
            // Stray quote or similar; step over it.
            pos += 1;
            continue;
        }

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let mut value = String::new();
        if bytes.get(pos) == Some(&b'=') {
            pos += 1;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            match bytes.get(pos)? {
                quote @ (b'"' | b'\'') => {
                    let close = input[pos + 1..].find(*quote as char)? + pos + 1;
                    value = input[pos + 1..close].to_string();
                    pos = close + 1;
                }
                _ => {
                    let start = pos;
                    while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>'
                    {
                        pos += 1;
                    }
                    value = input[start..pos].to_string();
                }
            }
        }

        if attr_name == "href" && href.is_none() {
            href = Some(decode_html_entities(&value).into_owned());
        }
    }
}

/// Skip past the closing tag of a raw-text element such as `<script>`.
fn skip_raw_text<'a>(rest: &'a str, name: &str) -> &'a str {
    let closing = format!("</{name}");
    let lower = rest.to_ascii_lowercase();
    match lower.find(&closing) {
        Some(idx) => {
            let after = &rest[idx..];
            after.find('>').map_or("", |end| &after[end + 1..])
        }
        None => "",
    }
}
