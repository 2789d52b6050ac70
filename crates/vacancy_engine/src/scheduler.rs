use std::time::Duration;

use monitor_logging::{monitor_debug, monitor_info, monitor_warn};
use tokio_util::sync::CancellationToken;

use crate::{Cancelled, Services};

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub tick: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub due: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Sends scheduled summaries to every chat whose next delivery has arrived.
pub struct Scheduler {
    services: Services,
    settings: SchedulerSettings,
}

impl Scheduler {
    pub fn new(services: Services, settings: SchedulerSettings) -> Self {
        Self { services, settings }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        monitor_info!("Scheduler started, tick {:?}", self.settings.tick);
        while !cancel.is_cancelled() {
            match self.tick(&cancel).await {
                Ok(report) if report.due > 0 => monitor_info!(
                    "Scheduler tick: {} due, {} delivered, {} failed",
                    report.due,
                    report.delivered,
                    report.failed
                ),
                Ok(_) => {}
                Err(Cancelled) => break,
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.tick) => {}
            }
        }
        monitor_info!("Scheduler stopped");
    }

    /// One pass over the due chats, one at a time, persisting once at the end.
    ///
    /// A chat is rescheduled whether or not its delivery went through.
    /// On cancellation the pass stops without saving; shutdown saves instead.
    pub async fn tick(&self, cancel: &CancellationToken) -> Result<TickReport, Cancelled> {
        let now = self.services.clock.now();
        let due = self.services.store.due_entries(now);
        if due.is_empty() {
            return Ok(TickReport::default());
        }

        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };
        for (chat_id, period) in due {
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }
            if self.services.deliver_summary(chat_id, cancel).await? {
                report.delivered += 1;
            } else {
                report.failed += 1;
                monitor_warn!("Scheduled delivery to chat {} failed", chat_id);
            }
            let next = self.services.store.reschedule(chat_id, now);
            monitor_debug!(
                "Chat {} (every {:?}) next due at {:?}",
                chat_id,
                period,
                next
            );
        }

        self.services.store.persist();
        Ok(report)
    }
}
