use std::sync::Arc;

use ti_core::storage::Store;
use ti_core::Clock;
use ti_crawler::CrawlManager;
use ti_report::{Mailer, ReportPipeline};
use ti_trend::keywords::KeywordExtractor;

use crate::scheduler::Scheduler;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub pipeline: Arc<ReportPipeline>,
    pub crawler: Arc<CrawlManager>,
    pub scheduler: Arc<Scheduler>,
    pub mailer: Option<Arc<Mailer>>,
    pub extractor: KeywordExtractor,
    pub clock: Arc<dyn Clock>,
}
