// Post-processing for raw LLM output: pulling runnable code out of the
// analysis pass and a structured report out of the report pass.

use regex::Regex;
use serde_json::Value;

use crate::report::ReportData;

/// Extract the contents of ```python fenced blocks, in order of appearance
pub fn extract_python_blocks(text: &str) -> Vec<String> {
    let fence = Regex::new(r"(?s)```(?:python|py)[ \t]*\r?\n(.*?)```").unwrap();
    fence
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|block| !block.is_empty())
        .collect()
}

/// Remove all fenced code blocks from prose and collapse the gaps they leave
pub fn strip_code_fences(text: &str) -> String {
    let fence = Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n.*?```").unwrap();
    let stripped = fence.replace_all(text, "");
    let blank_runs = Regex::new(r"\n{3,}").unwrap();
    blank_runs.replace_all(&stripped, "\n\n").trim().to_string()
}

/// Pull a JSON value out of LLM output that may wrap it in a fence or prose
pub fn extract_json_value(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let fence = Regex::new(r"(?s)```(?:json)?[ \t]*\r?\n(.*?)```").unwrap();
    if let Some(caps) = fence.captures(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(caps[1].trim()) {
            return Some(value);
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

/// Parse the structured report pass. Returns None for anything that does not
/// validate; the analysis turn still succeeds without a structured report.
pub fn parse_report(text: &str) -> Option<ReportData> {
    let value = extract_json_value(text)?;
    serde_json::from_value(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_python_blocks_in_order() {
        let text = "First:\n```python\nprint(1)\n```\nthen\n```py\nprint(2)\n```\ndone";
        let blocks = extract_python_blocks(text);
        assert_eq!(blocks, vec!["print(1)".to_string(), "print(2)".to_string()]);
    }

    #[test]
    fn ignores_non_python_fences() {
        let text = "```json\n{\"a\": 1}\n```\n```python\nx = 1\n```";
        assert_eq!(extract_python_blocks(text), vec!["x = 1".to_string()]);
    }

    #[test]
    fn strip_removes_fences_and_collapses_gaps() {
        let text = "Revenue is up.\n\n```python\nplot()\n```\n\n\nSee the chart.";
        assert_eq!(strip_code_fences(text), "Revenue is up.\n\nSee the chart.");
    }

    #[test]
    fn parses_bare_json_report() {
        let raw = r#"{"summary":"s","kpis":["k"],"charts":[{"title":"t","bullets":["b"]}]}"#;
        let report = parse_report(raw).unwrap();
        assert_eq!(report.kpis, vec!["k".to_string()]);
    }

    #[test]
    fn parses_fenced_json_report() {
        let raw = "Here is the report:\n```json\n{\"summary\":\"s\",\"kpis\":[],\"charts\":[]}\n```";
        assert!(parse_report(raw).is_some());
    }

    #[test]
    fn parses_json_buried_in_prose() {
        let raw = "Sure! {\"summary\":\"s\",\"kpis\":[],\"charts\":[]} Hope that helps.";
        assert!(parse_report(raw).is_some());
    }

    #[test]
    fn accepts_snake_case_report_keys() {
        let raw = r#"{"summary":"s","kpis":[],"charts":[],"next_steps":["act"]}"#;
        let report = parse_report(raw).unwrap();
        assert_eq!(report.next_steps, Some(vec!["act".to_string()]));
    }

    #[test]
    fn unparseable_output_yields_none() {
        assert!(parse_report("I could not produce a report.").is_none());
        assert!(parse_report("{broken json").is_none());
    }
}
