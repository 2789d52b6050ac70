use std::time::Duration;

use crate::{ChatId, Menu};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Send {
        chat_id: ChatId,
        text: String,
        menu: Option<Menu>,
    },
    Subscribe { chat_id: ChatId, period: Duration },
    Unsubscribe { chat_id: ChatId },
    /// Deliver a summary right away, outside the schedule.
    RunMonitorNow { chat_id: ChatId },
}

impl Effect {
    pub(crate) fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Effect::Send {
            chat_id,
            text: text.into(),
            menu: None,
        }
    }

    pub(crate) fn menu(chat_id: ChatId, text: impl Into<String>, menu: Menu) -> Self {
        Effect::Send {
            chat_id,
            text: text.into(),
            menu: Some(menu),
        }
    }
}
