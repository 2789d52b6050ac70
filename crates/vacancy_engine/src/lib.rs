//! Vacancy engine: fetching, extraction, persistence, transport and the two long-running loops.
mod clock;
mod decode;
mod engine;
mod extract;
mod fetch;
mod job_link;
mod anchor_scan;
mod metadata;
mod monitor;
mod persist;
mod poller;
mod scheduler;
mod store;
mod structured;
mod telegram;
mod types;

pub use clock::{Clock, SystemClock};
pub use decode::{decode_html, DecodedHtml};
pub use engine::{EngineHandle, Services};
pub use extract::{ExtractionError, Extractor};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use job_link::{dedupe_titles, is_probable_job_link, normalize_text, VACANCY_PATH_MARKER};
pub use anchor_scan::scan_job_anchors;
pub use metadata::extract_metadata_titles;
pub use monitor::Monitor;
pub use persist::{
    ensure_output_dir, load_state, save_state, AtomicFileWriter, DiskGuard, FreeSpaceGuard,
    PersistError, StoreLimits,
};
pub use poller::{Poller, PollerSettings};
pub use scheduler::{Scheduler, SchedulerSettings, TickReport};
pub use store::SubscriptionStore;
pub use structured::{Anchor, ScraperParser, StructuredParser, REPORTED_COUNT_PATH};
pub use telegram::{
    BotApi, TelegramClient, TelegramSettings, TransportError, Update, UpdateKind,
};
pub use types::{Cancelled, FailureKind, FetchError};
