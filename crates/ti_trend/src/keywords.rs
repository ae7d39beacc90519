use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use ti_core::Result;
use tracing::warn;

/// Strategy seam for linguistically aware noun extraction. The production
/// implementation wraps an external morphological analyzer; the fallback is
/// [`RegexTokenizer`]. Selection happens once at startup, not per call.
pub trait NounExtractor: Send + Sync {
    fn extract_nouns(&self, text: &str) -> Result<Vec<String>>;
}

lazy_static! {
    static ref NON_TOKEN: Regex = Regex::new(r"[^가-힣a-zA-Z0-9\s]").unwrap();

    /// Functional particles, filler words, and outlet/byline names that carry
    /// no trend signal. Compared lowercased.
    static ref STOPWORDS: HashSet<&'static str> = [
        "은", "는", "이", "가", "을", "를", "와", "과", "도", "만", "고", "에", "의", "한",
        "그", "저", "것", "수", "등", "및", "대한", "통해", "이번", "지난", "다", "있다",
        "없다", "한다", "된다", "밝혔다", "말했다", "했다", "위해", "으로", "에서",
        "로부터", "까지", "부터", "하여", "에게", "처럼", "만큼", "듯이", "보다",
        "아니라", "아니면", "그리고", "그러나", "하지만", "따라서", "때문에", "대해",
        "관련", "최근", "이날", "오전", "오후", "년", "월", "일", "때", "곳", "점", "분",
        "명", "개", "위", "말", "뒤", "전", "중", "측", "내", "밖", "데", "바",
        "기자", "뉴스", "연합뉴스", "조선비즈", "한겨레", "뉴시스", "매일경제",
        "한국경제", "ytn", "mbn",
    ]
    .into_iter()
    .collect();
}

/// Plain tokenizer used when no morphological analyzer is available or when
/// one fails mid-call: strip everything outside Hangul/alphanumerics,
/// lowercase, split on whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexTokenizer;

impl NounExtractor for RegexTokenizer {
    fn extract_nouns(&self, text: &str) -> Result<Vec<String>> {
        let stripped = NON_TOKEN.replace_all(text, "");
        Ok(stripped
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect())
    }
}

/// Turns raw article text into candidate keyword tokens.
///
/// Never fails: an analyzer error degrades to the regex tokenizer for that
/// call rather than propagating.
pub struct KeywordExtractor {
    analyzer: Option<Box<dyn NounExtractor>>,
    fallback: RegexTokenizer,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordExtractor {
    /// Extractor backed by the regex tokenizer only.
    pub fn new() -> Self {
        Self {
            analyzer: None,
            fallback: RegexTokenizer,
        }
    }

    /// Extractor preferring `analyzer`, degrading to the regex tokenizer on
    /// failure.
    pub fn with_analyzer(analyzer: Box<dyn NounExtractor>) -> Self {
        Self {
            analyzer: Some(analyzer),
            fallback: RegexTokenizer,
        }
    }

    pub fn extract(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let raw = match &self.analyzer {
            Some(analyzer) => match analyzer.extract_nouns(text) {
                Ok(nouns) => nouns,
                Err(e) => {
                    warn!("noun extraction failed, falling back to plain tokenization: {e}");
                    self.fallback.extract_nouns(text).unwrap_or_default()
                }
            },
            None => self.fallback.extract_nouns(text).unwrap_or_default(),
        };

        raw.into_iter()
            .map(|token| token.to_lowercase())
            .filter(|token| token.chars().count() >= 2)
            .filter(|token| !STOPWORDS.contains(token.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ti_core::Error;

    struct FailingAnalyzer;

    impl NounExtractor for FailingAnalyzer {
        fn extract_nouns(&self, _text: &str) -> Result<Vec<String>> {
            Err(Error::Inference("analyzer unavailable".to_string()))
        }
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        let extractor = KeywordExtractor::new();
        assert!(extractor.extract("").is_empty());
        assert!(extractor.extract("   ").is_empty());
    }

    #[test]
    fn short_tokens_are_dropped() {
        let extractor = KeywordExtractor::new();
        let tokens = extractor.extract("a 전기차 b 차");
        assert_eq!(tokens, vec!["전기차".to_string()]);
        assert!(tokens.iter().all(|t| t.chars().count() >= 2));
    }

    #[test]
    fn stopwords_are_dropped_case_insensitively() {
        let extractor = KeywordExtractor::new();
        let tokens = extractor.extract("전기차 뉴스 YTN 보조금");
        assert_eq!(tokens, vec!["전기차".to_string(), "보조금".to_string()]);
    }

    #[test]
    fn punctuation_is_stripped() {
        let extractor = KeywordExtractor::new();
        let tokens = extractor.extract("전기차, 보조금! (확대)");
        assert_eq!(
            tokens,
            vec![
                "전기차".to_string(),
                "보조금".to_string(),
                "확대".to_string()
            ]
        );
    }

    #[test]
    fn analyzer_failure_degrades_instead_of_propagating() {
        let extractor = KeywordExtractor::with_analyzer(Box::new(FailingAnalyzer));
        let tokens = extractor.extract("전기차 보조금");
        assert_eq!(tokens, vec!["전기차".to_string(), "보조금".to_string()]);
    }

    #[test]
    fn mixed_script_tokens_are_lowercased() {
        let extractor = KeywordExtractor::new();
        let tokens = extractor.extract("Tesla 전기차 TESLA");
        assert_eq!(
            tokens,
            vec![
                "tesla".to_string(),
                "전기차".to_string(),
                "tesla".to_string()
            ]
        );
    }
}
