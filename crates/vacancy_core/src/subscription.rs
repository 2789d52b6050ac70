use std::collections::BTreeMap;
use std::ops::Add;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub type ChatId = i64;
pub type UpdateId = i64;

/// Period used when a chat's own period is unavailable.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(15 * 60);

/// Wall-clock instant in whole seconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub const fn as_secs(self) -> u64 {
        self.0
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(rhs.as_secs()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub period_secs: u64,
    pub next_due: Timestamp,
}

impl Subscription {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

/// Serialized shape of the state file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub subscriptions: BTreeMap<ChatId, Subscription>,
    #[serde(default)]
    pub last_update_id: Option<UpdateId>,
}

/// In-memory subscription map plus the inbound cursor.
///
/// Pure bookkeeping: callers supply `now` and decide when to persist.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubscriptionBook {
    state: PersistedState,
}

impl SubscriptionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: PersistedState) -> Self {
        Self { state }
    }

    pub fn snapshot(&self) -> PersistedState {
        self.state.clone()
    }

    pub fn subscribe(&mut self, chat_id: ChatId, period: Duration, now: Timestamp) {
        let period = if period.as_secs() == 0 {
            DEFAULT_PERIOD
        } else {
            period
        };
        self.state.subscriptions.insert(
            chat_id,
            Subscription {
                period_secs: period.as_secs(),
                next_due: now + period,
            },
        );
    }

    /// Returns whether a subscription was removed.
    pub fn unsubscribe(&mut self, chat_id: ChatId) -> bool {
        self.state.subscriptions.remove(&chat_id).is_some()
    }

    pub fn due_entries(&self, now: Timestamp) -> Vec<(ChatId, Duration)> {
        self.state
            .subscriptions
            .iter()
            .filter(|(_, sub)| sub.next_due <= now)
            .map(|(chat_id, sub)| (*chat_id, sub.period()))
            .collect()
    }

    /// Advance the chat's next delivery to `now + period`.
    ///
    /// Chats that unsubscribed in the meantime stay unsubscribed.
    pub fn reschedule(&mut self, chat_id: ChatId, now: Timestamp) -> Option<Timestamp> {
        let sub = self.state.subscriptions.get_mut(&chat_id)?;
        let period = if sub.period_secs == 0 {
            DEFAULT_PERIOD
        } else {
            sub.period()
        };
        sub.period_secs = period.as_secs();
        sub.next_due = now + period;
        Some(sub.next_due)
    }

    pub fn record_cursor(&mut self, update_id: UpdateId) {
        self.state.last_update_id = Some(match self.state.last_update_id {
            Some(current) => current.max(update_id),
            None => update_id,
        });
    }

    pub fn last_update_id(&self) -> Option<UpdateId> {
        self.state.last_update_id
    }

    /// Offset for the next inbound poll: one past the cursor.
    pub fn next_offset(&self) -> Option<UpdateId> {
        self.state.last_update_id.map(|id| id.saturating_add(1))
    }

    pub fn subscription(&self, chat_id: ChatId) -> Option<&Subscription> {
        self.state.subscriptions.get(&chat_id)
    }

    pub fn len(&self) -> usize {
        self.state.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.subscriptions.is_empty()
    }
}
