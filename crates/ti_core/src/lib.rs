pub mod config;
pub mod crawl;
pub mod error;
pub mod model;
pub mod storage;
pub mod time;
pub mod types;

pub use config::AppConfig;
pub use crawl::ArticleCollector;
pub use error::Error;
pub use model::TextGenerator;
pub use storage::{
    ArticleStore, ArtifactStore, ProfileStore, ScheduleStore, Store, SummaryStore,
};
pub use time::{Clock, SystemClock};
pub use types::{
    Article, IntermediateSummary, KeywordObservation, ScheduleDay, ScheduledTask, SearchProfile,
    Surge,
};

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use super::{Article, Clock, Error, Result, Store, TextGenerator};
}
