use std::sync::Arc;

use monitor_logging::{monitor_info, monitor_warn};
use tokio_util::sync::CancellationToken;
use vacancy_core::VacancyResult;

use crate::{Cancelled, Extractor, Fetcher};

/// Fetch + extract as one step.
///
/// Every failure except cancellation collapses into an empty result, so
/// callers only have to tell "nothing found" apart from "aborted".
#[derive(Clone)]
pub struct Monitor {
    fetcher: Arc<dyn Fetcher>,
    extractor: Extractor,
}

impl Monitor {
    pub fn new(fetcher: Arc<dyn Fetcher>, extractor: Extractor) -> Self {
        Self { fetcher, extractor }
    }

    pub async fn run(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<VacancyResult, Cancelled> {
        let html = match self.fetcher.fetch(url, cancel).await {
            Ok(html) => html,
            Err(err) if err.is_cancelled() => return Err(Cancelled),
            Err(err) => {
                monitor_warn!("Fetching {} failed: {}", url, err);
                return Ok(VacancyResult::empty());
            }
        };
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }

        let titles = self.extractor.extract(&html);
        let reported = self.extractor.extract_count(&html);
        let result = VacancyResult::new(titles, reported);
        monitor_info!(
            "Monitor pass: {} vacancies ({} titles, reported {:?})",
            result.count,
            result.titles.len(),
            reported
        );
        Ok(result)
    }
}
