use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use scraper::{ElementRef, Html, Selector};
use ti_core::{Article, Error, Result};
use tracing::debug;
use url::Url;

const SEARCH_URL: &str = "https://search.naver.com/search.naver";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36 Edg/138.0.0.0";
const PAGE_DELAY: Duration = Duration::from_millis(500);

/// Scrapes article metadata from Naver News search result pages. Only the
/// search listing is fetched, never the article bodies.
pub struct NaverNewsClient {
    client: reqwest::Client,
}

impl NaverNewsClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Crawl(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }

    fn search_url(&self, keyword: &str, day: NaiveDate, page: u32) -> Result<Url> {
        let date = day.format("%Y.%m.%d").to_string();
        let start = (page * 10 + 1).to_string();
        Url::parse_with_params(
            SEARCH_URL,
            &[
                ("where", "news"),
                ("query", keyword),
                ("sm", "tab_opt"),
                ("sort", "0"),
                ("photo", "0"),
                ("field", "0"),
                ("pd", "3"),
                ("ds", date.as_str()),
                ("de", date.as_str()),
                ("start", start.as_str()),
            ],
        )
        .map_err(|e| Error::Crawl(format!("bad search url: {e}")))
    }

    /// All article metadata for one keyword on one day, walking up to
    /// `max_pages` result pages. Stops early when a page has no results.
    pub async fn search_day(
        &self,
        keyword: &str,
        day: NaiveDate,
        max_pages: u32,
    ) -> Result<Vec<Article>> {
        let mut articles = Vec::new();
        for page in 0..max_pages {
            if page > 0 {
                tokio::time::sleep(PAGE_DELAY).await;
            }

            let url = self.search_url(keyword, day, page)?;
            let html = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| Error::Crawl(format!("search request failed: {e}")))?
                .error_for_status()
                .map_err(|e| Error::Crawl(format!("search returned error status: {e}")))?
                .text()
                .await
                .map_err(|e| Error::Crawl(format!("failed to read search page: {e}")))?;

            let page_articles = parse_search_page(&html, day, Utc::now());
            debug!(keyword, %day, page, found = page_articles.len(), "search page parsed");
            if page_articles.is_empty() {
                break;
            }
            articles.extend(page_articles);
        }
        Ok(articles)
    }
}

fn ancestor_link(span: ElementRef<'_>) -> Option<ElementRef<'_>> {
    span.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "a" && el.value().attr("href").is_some())
}

fn sibling_snippet(link: ElementRef<'_>) -> String {
    let snippet_selector = Selector::parse("span.sds-comps-text-type-body1").unwrap();
    let Some(next_a) = link
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "a")
    else {
        return String::new();
    };
    if let Some(span) = next_a.select(&snippet_selector).next() {
        span.text().collect::<String>().trim().to_string()
    } else {
        next_a.text().collect::<String>().trim().to_string()
    }
}

/// Parse one search result page. Separated from the fetch so parsing is
/// testable against captured HTML.
pub fn parse_search_page(
    html: &str,
    published: NaiveDate,
    collected_at: DateTime<Utc>,
) -> Vec<Article> {
    let document = Html::parse_document(html);
    let title_selector = Selector::parse("span.sds-comps-text-type-headline1").unwrap();

    let mut articles = Vec::new();
    for title_span in document.select(&title_selector) {
        let Some(link_el) = ancestor_link(title_span) else {
            continue;
        };
        let Some(href) = link_el.value().attr("href") else {
            continue;
        };
        if href.starts_with("javascript:") || href.contains("ad.naver.com") {
            continue;
        }

        let title = title_span.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            continue;
        }

        articles.push(Article {
            title,
            link: href.to_string(),
            published_at: Some(published),
            snippet: sibling_snippet(link_el),
            collected_at,
        });
    }
    articles
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="news_item">
            <a href="https://news.example.com/ev-subsidy">
              <span class="sds-comps-text-type-headline1">전기차 보조금 확대 발표</span>
            </a>
            <a href="https://news.example.com/ev-subsidy">
              <span class="sds-comps-text-type-body1">정부가 내년도 전기차 보조금을 확대한다.</span>
            </a>
          </div>
          <div class="news_item">
            <a href="javascript:void(0)">
              <span class="sds-comps-text-type-headline1">스크립트 링크 기사</span>
            </a>
          </div>
          <div class="news_item">
            <a href="https://ad.naver.com/promoted">
              <span class="sds-comps-text-type-headline1">광고 기사</span>
            </a>
          </div>
          <div class="news_item">
            <a href="https://news.example.com/no-snippet">
              <span class="sds-comps-text-type-headline1">미리보기 없는 기사</span>
            </a>
          </div>
        </body></html>
    "#;

    #[test]
    fn parses_title_link_and_snippet() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();
        let articles = parse_search_page(PAGE, day, Utc::now());

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "전기차 보조금 확대 발표");
        assert_eq!(articles[0].link, "https://news.example.com/ev-subsidy");
        assert_eq!(articles[0].snippet, "정부가 내년도 전기차 보조금을 확대한다.");
        assert_eq!(articles[0].published_at, Some(day));
    }

    #[test]
    fn skips_script_and_ad_links() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();
        let articles = parse_search_page(PAGE, day, Utc::now());
        assert!(articles.iter().all(|a| !a.link.starts_with("javascript:")));
        assert!(articles.iter().all(|a| !a.link.contains("ad.naver.com")));
    }

    #[test]
    fn missing_snippet_is_empty_not_error() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();
        let articles = parse_search_page(PAGE, day, Utc::now());
        assert_eq!(articles[1].title, "미리보기 없는 기사");
        assert_eq!(articles[1].snippet, "");
    }

    #[test]
    fn empty_page_parses_to_nothing() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();
        assert!(parse_search_page("<html></html>", day, Utc::now()).is_empty());
    }

    #[test]
    fn search_url_carries_date_bounds_and_paging() {
        let client = NaverNewsClient::new().unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();
        let url = client.search_url("전기차", day, 2).unwrap();
        let query = url.query().unwrap();
        assert!(query.contains("ds=2025.06.20"));
        assert!(query.contains("de=2025.06.20"));
        assert!(query.contains("start=21"));
        assert!(query.contains("where=news"));
    }
}
