use html_escape::encode_text;

use crate::VacancyResult;

/// Upper bound on outbound message length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4000;

const SUMMARY_HEADER: &str = "<b>Avito QA вакансии</b>";
const NO_VACANCIES: &str = "Вакансий нет";

/// Chat summary in the HTML subset understood by the transport.
pub fn format_chat_summary(result: &VacancyResult, url: &str) -> String {
    let link = format!("Ссылка: {}", encode_text(url));
    if result.is_empty() {
        return [SUMMARY_HEADER, NO_VACANCIES, &link].join("\n");
    }

    let mut lines = Vec::with_capacity(result.titles.len() + 3);
    lines.push(SUMMARY_HEADER.to_string());
    lines.push(format!("Найдено вакансий: <b>{}</b>", result.count));
    lines.extend(result.titles.iter().map(|t| encode_text(t).into_owned()));
    lines.push(link);
    lines.join("\n")
}

/// Plain rendering for terminal output.
pub fn format_console_summary(result: &VacancyResult) -> String {
    if result.is_empty() {
        return NO_VACANCIES.to_string();
    }
    let mut lines = vec![format!("Найдено вакансий: {}", result.count)];
    lines.extend(result.titles.iter().cloned());
    lines.join("\n")
}

/// Cut `text` to at most [`MAX_MESSAGE_CHARS`] characters.
///
/// The cut falls on the last line break inside the limit, so HTML entities
/// and tags are never split. A single overlong line is cut mid-line.
pub fn truncate_message(text: &str) -> &str {
    let Some((limit, _)) = text.char_indices().nth(MAX_MESSAGE_CHARS) else {
        return text;
    };
    match text[..limit].rfind('\n') {
        Some(line_end) => &text[..line_end],
        None => &text[..limit],
    }
}
