pub mod detector;
pub mod keywords;

pub use detector::{analyze_trends, TrendParams};
pub use keywords::{KeywordExtractor, NounExtractor, RegexTokenizer};

pub mod prelude {
    pub use super::detector::{analyze_trends, TrendParams};
    pub use super::keywords::KeywordExtractor;
    pub use ti_core::{Article, KeywordObservation, Surge};
}
