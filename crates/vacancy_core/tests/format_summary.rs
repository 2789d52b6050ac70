use vacancy_core::{
    format_chat_summary, format_console_summary, truncate_message, VacancyResult,
    MAX_MESSAGE_CHARS,
};

#[test]
fn empty_result_reads_no_vacancies() {
    let result = VacancyResult::empty();
    assert_eq!(format_console_summary(&result), "Вакансий нет");
    let chat = format_chat_summary(&result, "https://example.com/?a=1&b=2");
    assert_eq!(
        chat,
        "<b>Avito QA вакансии</b>\nВакансий нет\nСсылка: https://example.com/?a=1&amp;b=2"
    );
}

#[test]
fn titles_are_escaped_and_listed() {
    let result = VacancyResult::new(vec!["QA <Senior>".into(), "QA & Tools".into()], Some(5));
    let chat = format_chat_summary(&result, "https://example.com");
    let lines: Vec<&str> = chat.lines().collect();
    assert_eq!(lines[1], "Найдено вакансий: <b>5</b>");
    assert_eq!(lines[2], "QA &lt;Senior&gt;");
    assert_eq!(lines[3], "QA &amp; Tools");
    assert_eq!(lines[4], "Ссылка: https://example.com");

    assert_eq!(
        format_console_summary(&result),
        "Найдено вакансий: 5\nQA <Senior>\nQA & Tools"
    );
}

#[test]
fn truncation_counts_characters_not_bytes() {
    let long = "я".repeat(MAX_MESSAGE_CHARS + 10);
    let cut = truncate_message(&long);
    assert_eq!(cut.chars().count(), MAX_MESSAGE_CHARS);

    let short = "short";
    assert_eq!(truncate_message(short), short);
}

#[test]
fn truncation_keeps_whole_lines_of_markup() {
    let titles: Vec<String> = (0..400).map(|i| format!("QA & Dev {i}")).collect();
    let full = format_chat_summary(&VacancyResult::new(titles, None), "https://example.com");
    assert!(full.chars().count() > MAX_MESSAGE_CHARS);

    let cut = truncate_message(&full);
    assert!(cut.chars().count() <= MAX_MESSAGE_CHARS);
    assert!(full[cut.len()..].starts_with('\n'));
    assert!(cut.starts_with("<b>Avito QA вакансии</b>\n"));
    assert!(cut.lines().last().unwrap().ends_with(char::is_numeric));
}
