use chrono::{DateTime, Utc};
use ti_core::{Article, Error, Result};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const SEPARATOR_WIDTH: usize = 50;

/// Plain-text rendering of an article list, one labeled block per article.
pub fn articles_to_txt(articles: &[Article]) -> String {
    let mut lines = Vec::new();
    for article in articles {
        lines.push(format!("제목: {}", article.title));
        lines.push(format!("링크: {}", article.link));
        lines.push(format!(
            "날짜: {}",
            article
                .published_at
                .map(|d| d.to_string())
                .unwrap_or_else(|| "N/A".to_string())
        ));
        lines.push(format!("내용: {}", article.snippet));
        lines.push(format!(
            "수집 시간: {}",
            article.collected_at.format("%Y-%m-%d %H:%M:%S")
        ));
        lines.push("-".repeat(SEPARATOR_WIDTH));
    }
    lines.join("\n")
}

/// CSV rendering with a UTF-8 BOM so spreadsheet apps pick up the encoding.
pub fn articles_to_csv(articles: &[Article]) -> Result<Vec<u8>> {
    let mut buf = Vec::from(UTF8_BOM);
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer
            .write_record(["제목", "링크", "날짜", "내용", "수집 시간"])
            .map_err(|e| Error::Export(format!("csv header write failed: {e}")))?;
        for article in articles {
            writer
                .write_record([
                    article.title.as_str(),
                    article.link.as_str(),
                    &article
                        .published_at
                        .map(|d| d.to_string())
                        .unwrap_or_default(),
                    article.snippet.as_str(),
                    &article.collected_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                ])
                .map_err(|e| Error::Export(format!("csv row write failed: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| Error::Export(format!("csv flush failed: {e}")))?;
    }
    Ok(buf)
}

pub fn report_filename(prefix: &str, extension: &str, now: DateTime<Utc>) -> String {
    format!("{prefix}_{}.{extension}", now.format("%Y%m%d_%H%M%S"))
}
