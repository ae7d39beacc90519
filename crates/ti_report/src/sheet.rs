use serde::Serialize;
use ti_core::{Error, Result};

/// Visual hierarchy of a parsed report row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Title,
    Overview,
    Section,
    SubSection,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub kind: RowKind,
    pub heading: String,
    pub body: String,
}

fn push_row(rows: &mut Vec<ReportRow>, kind: RowKind, heading: String, body: &mut Vec<String>) {
    rows.push(ReportRow {
        kind,
        heading,
        body: body.join("\n").trim().to_string(),
    });
    body.clear();
}

/// Split a formatted markdown report into ordered rows on its `#`/`##`/`###`
/// heading markers. Text before the first `##` becomes the overview row.
pub fn parse_report(text: &str) -> Vec<ReportRow> {
    let mut rows = Vec::new();
    let mut body: Vec<String> = Vec::new();
    // Pending heading for the row being accumulated, None while in the
    // overview block.
    let mut open: Option<(RowKind, String)> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        let (kind, heading) = if let Some(h) = trimmed.strip_prefix("### ") {
            (RowKind::SubSection, h)
        } else if let Some(h) = trimmed.strip_prefix("## ") {
            (RowKind::Section, h)
        } else if let Some(h) = trimmed.strip_prefix("# ") {
            (RowKind::Title, h)
        } else {
            body.push(line.to_string());
            continue;
        };

        match open.take() {
            Some((open_kind, open_heading)) => {
                push_row(&mut rows, open_kind, open_heading, &mut body)
            }
            None => {
                let overview = body.join("\n").trim().to_string();
                if !overview.is_empty() {
                    rows.push(ReportRow {
                        kind: RowKind::Overview,
                        heading: "개요".to_string(),
                        body: overview,
                    });
                }
                body.clear();
            }
        }

        if kind == RowKind::Title {
            rows.push(ReportRow {
                kind,
                heading: heading.trim().to_string(),
                body: String::new(),
            });
        } else {
            open = Some((kind, heading.trim().to_string()));
        }
    }

    match open {
        Some((kind, heading)) => push_row(&mut rows, kind, heading, &mut body),
        None => {
            let overview = body.join("\n").trim().to_string();
            if !overview.is_empty() {
                rows.push(ReportRow {
                    kind: RowKind::Overview,
                    heading: "개요".to_string(),
                    body: overview,
                });
            }
        }
    }

    rows
}

/// CSV artifact of the parsed rows, BOM-prefixed like the article export.
pub fn rows_to_csv(rows: &[ReportRow]) -> Result<Vec<u8>> {
    let mut buf = vec![0xEF, 0xBB, 0xBF];
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer
            .write_record(["구분", "제목", "내용"])
            .map_err(|e| Error::Export(format!("csv header write failed: {e}")))?;
        for row in rows {
            let kind = match row.kind {
                RowKind::Title => "제목",
                RowKind::Overview => "개요",
                RowKind::Section => "섹션",
                RowKind::SubSection => "하위 섹션",
            };
            writer
                .write_record([kind, row.heading.as_str(), row.body.as_str()])
                .map_err(|e| Error::Export(format!("csv row write failed: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| Error::Export(format!("csv flush failed: {e}")))?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "# 뉴스 트렌드 보고서\n\n이번 주 전기차 관련 보도가 급증했다.\n\n\
        ## 트렌드 요약\n\n보조금 확대 발표가 중심이다.\n\n\
        ### 주요 키워드\n\n전기차, 보조금\n\n\
        ## 산업 시사점\n\n보험 상품 조정이 필요하다.";

    #[test]
    fn report_splits_into_hierarchy_rows() {
        let rows = parse_report(REPORT);
        let kinds: Vec<RowKind> = rows.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            [
                RowKind::Title,
                RowKind::Overview,
                RowKind::Section,
                RowKind::SubSection,
                RowKind::Section,
            ]
        );
        assert_eq!(rows[0].heading, "뉴스 트렌드 보고서");
        assert_eq!(rows[1].body, "이번 주 전기차 관련 보도가 급증했다.");
        assert_eq!(rows[2].heading, "트렌드 요약");
        assert_eq!(rows[3].heading, "주요 키워드");
        assert_eq!(rows[4].body, "보험 상품 조정이 필요하다.");
    }

    #[test]
    fn headingless_text_is_a_single_overview() {
        let rows = parse_report("헤딩 없는 본문입니다.");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, RowKind::Overview);
        assert_eq!(rows[0].body, "헤딩 없는 본문입니다.");
    }

    #[test]
    fn empty_report_has_no_rows() {
        assert!(parse_report("").is_empty());
        assert!(parse_report("   \n\n").is_empty());
    }

    #[test]
    fn rows_render_to_bom_csv() {
        let bytes = rows_to_csv(&parse_report(REPORT)).unwrap();
        assert_eq!(&bytes[..3], [0xEF, 0xBB, 0xBF]);
        let body = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert!(body.starts_with("구분,제목,내용"));
        assert!(body.contains("트렌드 요약"));
    }
}
