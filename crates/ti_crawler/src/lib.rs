//! Naver News search metadata collection.

pub mod manager;
pub mod naver;

pub use manager::CrawlManager;
pub use naver::{parse_search_page, NaverNewsClient};
