//! Prompt builders for the report pipeline stages. The prompts address a
//! Korean news corpus and ask for Korean responses, matching the cleanup
//! phrases in [`crate::clean`].

use serde_json::{json, Value};
use ti_core::KeywordObservation;

pub fn article_summary(title: &str, link: &str, date: &str, snippet: &str) -> String {
    format!(
        "다음은 뉴스 기사에 대한 정보입니다. 이 정보를 바탕으로 뉴스 기사 내용을 요약해 주세요.\n\
         제공된 링크에 접근할 수 없거나 기사를 찾을 수 없는 경우, 아래 제공된 제목, 날짜, \
         미리보기 요약만을 사용하여 기사 내용을 파악하고 요약해 주세요.\n\
         광고나 불필요한 정보 없이 핵심 내용만 간결하게 제공해 주세요.\n\n\
         제목: {title}\n링크: {link}\n날짜: {date}\n미리보기 요약: {snippet}"
    )
}

pub fn relevant_keywords(observations: &[KeywordObservation], perspective: &str) -> String {
    let keywords: Vec<Value> = observations
        .iter()
        .map(|o| json!({"keyword": o.keyword, "recent_freq": o.recent_freq}))
        .collect();
    format!(
        "다음은 뉴스 기사에서 식별된 트렌드 키워드 목록입니다. 이 키워드들을 '{perspective}'의 \
         관점에서 가장 유의미하다고 판단되는 순서대로 최대 5개까지 골라 JSON 배열 형태로 반환해 \
         주세요. 다른 설명 없이 JSON 배열만 반환해야 합니다. 각 키워드는 문자열이어야 합니다.\n\n\
         키워드 목록: {}",
        Value::Array(keywords)
    )
}

pub fn relevant_keywords_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {"type": "STRING"}
    })
}

pub fn combine_summaries(batch_text: &str) -> String {
    format!(
        "다음 텍스트들을 종합하여 간결하게 요약해 주세요. 주요 내용만 포함해 주세요.\n\n\
         텍스트:\n{batch_text}"
    )
}

pub fn industry_implications(narrative: &str) -> String {
    format!(
        "다음은 최근 뉴스 트렌드를 요약한 내용입니다.\n\
         이 트렌드 요약문을 바탕으로 '자동차 보험 산업'에 미칠 수 있는 영향에 대해 간결하게 \
         요약해 주세요.\n한국어로 요약 내용을 제공해 주세요.\n\n\
         뉴스 트렌드 요약문:\n{narrative}"
    )
}

pub fn format_report(draft: &str) -> String {
    format!(
        "다음 텍스트를 전문적이고 가독성 높은 마크다운 형식으로 재구성해 주세요.\n\
         텍스트 파일로 저장했을 때 줄바꿈과 들여쓰기가 명확하게 보이도록 마크다운 문법을 \
         활용하여 구조화해 주세요.\n\
         핵심 내용은 강조하거나 목록 형태로 정리하여 시각적으로 돋보이게 해주세요.\n\
         문단 간의 간격을 적절히 조절하여 가독성을 높여 주세요. 각 문단은 최소 한 줄 이상 \
         비워주세요.\n\
         불필요한 반복이나 비문은 수정하고, 전문적인 보고서 톤앤매너를 유지해 주세요.\n\
         모든 내용은 한국어로 작성해 주세요.\n\
         중요: 응답은 오직 재구성된 내용만 포함해야 합니다. 다른 설명이나 서두 문구는 절대 \
         포함하지 마세요.\n\n[원본 텍스트]\n{draft}"
    )
}

/// The fixed clause outline: section title paired with the drafting question
/// the model answers for that section.
pub const CLAUSE_SECTIONS: &[(&str, &str)] = &[
    (
        "1. 특약의 명칭",
        "자동차 보험 표준약관을 참고하여 특약의 명칭을 작성해줘.",
    ),
    ("2. 특약의 목적", "이 특약의 목적을 설명해줘."),
    ("3. 보장 범위", "보장 범위에 대해 상세히 작성해줘."),
    (
        "4. 보험금 지급 조건",
        "보험금 지급 조건을 구체적으로 작성해줘.",
    ),
    ("5. 보험료 산정 방식", "보험료 산정 방식을 설명해줘."),
    ("6. 면책 사항", "면책 사항에 해당하는 내용을 작성해줘."),
    ("7. 특약의 적용 기간", "적용 기간을 명시해줘."),
    ("8. 기타 특별 조건", "기타 특별 조건이 있다면 제안해줘."),
    (
        "9. 운전가능자 제한",
        "운전자 연령과 범위에 따른 특별 약관을 제안해줘.",
    ),
    (
        "10. 보험료 할인",
        "보험료 할인에 해당하는 특별 약관을 작성해줘.",
    ),
    (
        "11. 보장 확대",
        "법률비용 및 다른 자동차 운전에 해당하는 특별 약관을 작성해줘.",
    ),
];

pub fn clause_section(title: &str, question: &str, report: &str) -> String {
    format!(
        "너는 자동차 보험을 설계하고 있는 보험사 직원이야.\n\
         다음 조건에 따라 자동차 보험 특약의 '{title}'을 3~5줄 정도로 작성해줘.\n\n\
         [기획 목적]\n\
         - 이 특약은 보험 상품 기획 초기 단계에서 트렌드 조사 및 방향성 도출에 도움 되는 \
         목적으로 작성돼야 해.\n\
         - 새로운 기술이나 최근 사회적 이슈를 반영해도 좋아.\n\
         - 표준약관 표현 방식을 따라줘.\n\n\
         [참고 보고서]\n{report}\n\n[질문]\n{question}\n\n[답변]"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ti_core::Surge;

    #[test]
    fn relevant_keywords_embeds_observations_as_json() {
        let observations = vec![KeywordObservation {
            keyword: "전기차".to_string(),
            recent_freq: 5,
            past_freq: 1,
            surge: Surge::Ratio(5.0),
        }];
        let prompt = relevant_keywords(&observations, "자동차 보험");
        assert!(prompt.contains(r#""keyword":"전기차""#));
        assert!(prompt.contains("'자동차 보험'"));
    }

    #[test]
    fn keyword_schema_is_string_array() {
        let schema = relevant_keywords_schema();
        assert_eq!(schema["type"], "ARRAY");
        assert_eq!(schema["items"]["type"], "STRING");
    }

    #[test]
    fn clause_outline_is_complete() {
        assert_eq!(CLAUSE_SECTIONS.len(), 11);
        let prompt = clause_section("2. 특약의 목적", "이 특약의 목적을 설명해줘.", "보고서 본문");
        assert!(prompt.contains("2. 특약의 목적"));
        assert!(prompt.contains("보고서 본문"));
    }
}
