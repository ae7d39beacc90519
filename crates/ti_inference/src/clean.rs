use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FENCE: Regex =
        Regex::new(r"(?i)```(?:json|text)?\s*([\s\S]*?)\s*```").unwrap();
    static ref HEADING: Regex = Regex::new(r"#+").unwrap();
    static ref BOLD: Regex = Regex::new(r"\*\*(.*?)\*\*").unwrap();
    static ref BOLD_UNDER: Regex = Regex::new(r"__(.*?)__").unwrap();
    static ref ITALIC: Regex = Regex::new(r"\*(.*?)\*").unwrap();
    static ref ITALIC_UNDER: Regex = Regex::new(r"_(.*?)_").unwrap();
    static ref LIST_MARKER: Regex = Regex::new(r"(?m)^\s*[-+]\s*").unwrap();
    static ref NUMBERED_MARKER: Regex = Regex::new(r"(?m)^\s*\d+\.\s*").unwrap();
    static ref SPACES_TABS: Regex = Regex::new(r"[ \t]+").unwrap();
    static ref LINE_LEADING_WS: Regex = Regex::new(r"(?m)^[ \t]+").unwrap();
    static ref BLANK_RUNS: Regex = Regex::new(r"\n{3,}").unwrap();
    static ref ALL_WS: Regex = Regex::new(r"\s+").unwrap();

    /// Model-generated preamble and closing phrases that add no content.
    static ref BOILERPLATE: Vec<Regex> = [
        r"(?i)제공해주신\s*URL의\s*뉴스\s*기사\s*내용을\s*요약해드리겠습니다[.:\s]*",
        r"주요\s*내용을\s*요약\s*하면\s*다음과\s*같습니다[.:\s]*",
        r"핵심\s*내용은\s*다음과\s*같습니다[.:\s]*",
        r"다음\s*텍스트의\s*요약입니다[.:\s]*",
        r"텍스트를\s*요약하면\s*다음과\s*같습니다[.:\s]*",
        r"제공된\s*텍스트에\s*대한\s*요약입니다[.:\s]*",
        r"요약하자면[.:\s]*",
        r"주요\s*요약[.:\s]*",
        r"주요\s*내용[.:\s]*",
        r"(?i)ai\s*답변[.:\s]*",
        r"(?i)ai\s*분석[.:\s]*",
        r"다음은\s*요청하신\s*지침에\s*따라\s*재구성된\s*보고서입니다[.:\s]*",
        r"다음은\s*재구성된\s*보고서입니다[.:\s]*",
        r"보고서\s*내용:\s*",
        r"보고서:\s*",
        r"\[보고서\]:\s*",
        r"\[결과\]:\s*",
        r"이상입니다[.:\s]*",
        r"뉴스\s*트렌드\s*요약:\s*",
        r"위\s*보고서는\s*제공된\s*정보를\s*바탕으로\s*재구성되었습니다[.:\s]*",
        r"이\s*보고서가\s*귀사의\s*비즈니스에\s*도움이\s*되기를\s*바랍니다[.:\s]*",
        r"(?i)here\s+is\s+the\s+(?:summary|report)[.:\s]*",
        r"(?i)sure,\s+here(?:'s| is)\s+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();
}

fn strip_boilerplate(text: &str) -> String {
    let mut out = text.to_string();
    for pattern in BOILERPLATE.iter() {
        out = pattern.replace_all(&out, "").into_owned();
    }
    out
}

/// Collapse a model response down to a single flat line: markdown fences,
/// headings, emphasis, list markers, and known preamble phrases are removed
/// and all whitespace runs become one space. Idempotent.
pub fn flatten(text: &str) -> String {
    let mut out = FENCE.replace_all(text, "$1").into_owned();
    out = HEADING.replace_all(&out, "").into_owned();
    out = BOLD.replace_all(&out, "$1").into_owned();
    out = BOLD_UNDER.replace_all(&out, "$1").into_owned();
    out = ITALIC.replace_all(&out, "$1").into_owned();
    out = ITALIC_UNDER.replace_all(&out, "$1").into_owned();
    out = LIST_MARKER.replace_all(&out, "").into_owned();
    out = NUMBERED_MARKER.replace_all(&out, "").into_owned();
    out = strip_boilerplate(&out);
    ALL_WS.replace_all(&out, " ").trim().to_string()
}

/// Cleanup for the final formatted report: removes only boilerplate phrases
/// and normalizes horizontal whitespace, keeping the markdown structure
/// (headings, lists, paragraph breaks) intact. Idempotent.
pub fn clean_report(text: &str) -> String {
    let mut out = strip_boilerplate(text);
    out = SPACES_TABS.replace_all(&out, " ").into_owned();
    out = LINE_LEADING_WS.replace_all(&out, "").into_owned();
    out = BLANK_RUNS.replace_all(&out, "\n\n").into_owned();
    out.trim().to_string()
}
