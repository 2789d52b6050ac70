use crate::ChatId;

/// Inbound chat event routed into the conversation state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Plain text message, usually a slash command.
    Command { chat_id: ChatId, text: String },
    /// Button press on a previously sent menu.
    Callback { chat_id: ChatId, token: String },
}
