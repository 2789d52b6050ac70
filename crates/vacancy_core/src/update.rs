use crate::{main_menu, period_menu, CallbackToken, ChatId, Effect, Msg};

/// Pure update function: maps one inbound chat event to the effects it causes.
///
/// Conversation state is implicit in subscription presence, so nothing is
/// carried between calls.
pub fn update(msg: Msg) -> Vec<Effect> {
    match msg {
        Msg::Command { chat_id, text } => match text.trim() {
            "/start" => vec![Effect::menu(chat_id, "Выберите действие:", main_menu())],
            "/stop" => stop(
                chat_id,
                "Подписка остановлена. Команда /start — чтобы открыть меню.",
            ),
            _ => Vec::new(),
        },
        Msg::Callback { chat_id, token } => match CallbackToken::parse(&token) {
            CallbackToken::Enable => {
                vec![Effect::menu(chat_id, "Выберите периодичность:", period_menu())]
            }
            CallbackToken::Disable => stop(chat_id, "Подписка отключена."),
            CallbackToken::Period(period) => vec![
                Effect::Subscribe { chat_id, period },
                Effect::text(
                    chat_id,
                    format!(
                        "Готово. Буду присылать каждые {} минут.",
                        period.as_secs() / 60
                    ),
                ),
                Effect::RunMonitorNow { chat_id },
            ],
            CallbackToken::InvalidPeriod => vec![Effect::text(chat_id, "Некорректный период.")],
            CallbackToken::Unknown => Vec::new(),
        },
    }
}

fn stop(chat_id: ChatId, confirmation: &str) -> Vec<Effect> {
    vec![
        Effect::Unsubscribe { chat_id },
        Effect::text(chat_id, confirmation),
    ]
}
