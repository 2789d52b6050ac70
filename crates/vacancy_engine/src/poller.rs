use std::time::Duration;

use monitor_logging::{monitor_debug, monitor_info, monitor_warn};
use tokio_util::sync::CancellationToken;
use vacancy_core::Effect;

use crate::{Cancelled, Services, TransportError, Update};

#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// How long the server may hold one `getUpdates` request.
    pub wait: Duration,
    /// Pause after the API answered with `ok: false`.
    pub api_error_backoff: Duration,
    /// Pause after a network or decoding failure.
    pub transport_error_backoff: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(50),
            api_error_backoff: Duration::from_secs(2),
            transport_error_backoff: Duration::from_secs(3),
        }
    }
}

/// Long-polls inbound updates and applies the conversation effects they cause.
pub struct Poller {
    services: Services,
    settings: PollerSettings,
}

impl Poller {
    pub fn new(services: Services, settings: PollerSettings) -> Self {
        Self { services, settings }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        monitor_info!("Poller started");
        while !cancel.is_cancelled() {
            let offset = self.services.store.next_offset();
            let polled = tokio::select! {
                _ = cancel.cancelled() => break,
                polled = self.services.api.get_updates(offset, self.settings.wait) => polled,
            };

            match polled {
                Ok(updates) => {
                    if self.handle_batch(updates, &cancel).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    let backoff = match err {
                        TransportError::Api { .. } => self.settings.api_error_backoff,
                        _ => self.settings.transport_error_backoff,
                    };
                    monitor_warn!("Polling updates failed: {}; retrying in {:?}", err, backoff);
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }
        monitor_info!("Poller stopped");
    }

    /// Process updates in arrival order and persist once afterwards.
    ///
    /// Every update advances the cursor, handled or not. Returns how many
    /// updates produced effects.
    pub async fn handle_batch(
        &self,
        updates: Vec<Update>,
        cancel: &CancellationToken,
    ) -> Result<usize, Cancelled> {
        if updates.is_empty() {
            return Ok(0);
        }

        let mut handled = 0;
        for update in updates {
            self.services.store.record_cursor(update.id);
            let Some(msg) = update.into_msg() else {
                continue;
            };
            monitor_debug!("Inbound {:?}", msg);
            let effects = vacancy_core::update(msg);
            if effects.is_empty() {
                continue;
            }
            handled += 1;
            self.apply(effects, cancel).await?;
        }

        self.services.store.persist();
        Ok(handled)
    }

    async fn apply(&self, effects: Vec<Effect>, cancel: &CancellationToken) -> Result<(), Cancelled> {
        for effect in effects {
            match effect {
                Effect::Send {
                    chat_id,
                    text,
                    menu,
                } => {
                    self.services
                        .api
                        .send_message(chat_id, &text, menu.as_ref())
                        .await;
                }
                Effect::Subscribe { chat_id, period } => {
                    monitor_info!("Chat {} subscribed every {:?}", chat_id, period);
                    let now = self.services.clock.now();
                    self.services.store.subscribe(chat_id, period, now);
                }
                Effect::Unsubscribe { chat_id } => {
                    monitor_info!("Chat {} unsubscribed", chat_id);
                    self.services.store.unsubscribe(chat_id);
                }
                Effect::RunMonitorNow { chat_id } => {
                    if !self.services.deliver_summary(chat_id, cancel).await? {
                        monitor_warn!("Immediate summary to chat {} was not delivered", chat_id);
                    }
                }
            }
        }
        Ok(())
    }
}
