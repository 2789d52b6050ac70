use std::sync::Arc;
use std::time::Duration;

use monitor_logging::{monitor_error, monitor_info, monitor_warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vacancy_core::{format_chat_summary, ChatId};

use crate::{
    BotApi, Cancelled, Clock, Monitor, Poller, PollerSettings, Scheduler, SchedulerSettings,
    SubscriptionStore,
};

/// Collaborators shared by the scheduler and the poller.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<SubscriptionStore>,
    pub api: Arc<dyn BotApi>,
    pub monitor: Monitor,
    pub clock: Arc<dyn Clock>,
    pub source_url: String,
}

impl Services {
    /// Run one monitoring pass and send its summary to `chat_id`.
    ///
    /// `Ok(false)` means the transport refused the message.
    pub async fn deliver_summary(
        &self,
        chat_id: ChatId,
        cancel: &CancellationToken,
    ) -> Result<bool, Cancelled> {
        let result = self.monitor.run(&self.source_url, cancel).await?;
        let text = format_chat_summary(&result, &self.source_url);
        Ok(self.api.send_message(chat_id, &text, None).await)
    }
}

/// Running scheduler and poller tasks plus the token that stops them.
pub struct EngineHandle {
    cancel: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    store: Arc<SubscriptionStore>,
}

impl EngineHandle {
    /// Spawn both loops on the current tokio runtime.
    pub fn start(
        services: Services,
        scheduler: SchedulerSettings,
        poller: PollerSettings,
        cancel: CancellationToken,
    ) -> Self {
        let store = services.store.clone();
        let scheduler = Scheduler::new(services.clone(), scheduler);
        let poller = Poller::new(services, poller);

        let scheduler_cancel = cancel.clone();
        let poller_cancel = cancel.clone();
        let tasks = vec![
            (
                "scheduler",
                tokio::spawn(async move { scheduler.run(scheduler_cancel).await }),
            ),
            (
                "poller",
                tokio::spawn(async move { poller.run(poller_cancel).await }),
            ),
        ];

        Self {
            cancel,
            tasks,
            store,
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signal both loops, give each up to `grace` to finish, then save state once.
    pub async fn shutdown(self, grace: Duration) {
        self.cancel.cancel();
        for (name, task) in self.tasks {
            match tokio::time::timeout(grace, task).await {
                Ok(Ok(())) => monitor_info!("{} stopped", name),
                Ok(Err(err)) => monitor_error!("{} task failed: {}", name, err),
                Err(_) => monitor_warn!("{} did not stop within {:?}", name, grace),
            }
        }
        self.store.persist();
    }
}
