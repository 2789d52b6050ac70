//! Vacancy core: pure domain types, subscription book and conversation state machine.
mod effect;
mod format;
mod menu;
mod msg;
mod result;
mod subscription;
mod update;

pub use effect::Effect;
pub use format::{format_chat_summary, format_console_summary, truncate_message, MAX_MESSAGE_CHARS};
pub use menu::{main_menu, period_menu, CallbackToken, Menu, MenuChoice, PERIOD_CHOICES};
pub use msg::Msg;
pub use result::VacancyResult;
pub use subscription::{
    ChatId, PersistedState, Subscription, SubscriptionBook, Timestamp, UpdateId, DEFAULT_PERIOD,
};
pub use update::update;
