//! 从混合文本输出中提取 JSON 数组
//!
//! 外部进程的标准输出同时包含进度日志和一段 JSON 数据。
//! 先按位置定位数组首尾，失败后再用正则找出所有候选数组，取最长的一个。

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use thiserror::Error;

use super::common::head_tail;

/// 紧凑格式数组起始标记
const COMPACT_OPEN: &str = "[{";
const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Error)]
#[error("未能从输出中提取 JSON 数组（长度 {len}，开头: {head:?}，结尾: {tail:?}）")]
pub struct ExtractionError {
    /// 原始文本长度（字符数）
    pub len: usize,
    pub head: String,
    pub tail: String,
}

impl ExtractionError {
    fn new(text: &str) -> Self {
        let (head, tail) = head_tail(text, PREVIEW_CHARS);
        Self {
            len: text.chars().count(),
            head,
            tail,
        }
    }
}

/// 格式化输出的起始标记：`[` 换行后接缩进的 `{`
fn pretty_open_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\r?\n[ \t]+\{").expect("valid regex"))
}

/// 数组结束标记：`}` 后接 `]`，允许中间有空白换行
fn close_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\}\s*\]").expect("valid regex"))
}

fn array_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[\s*\{.*?\}\s*\]").expect("valid regex"))
}

/// 提取文本中嵌入的 JSON 对象数组
pub fn extract(text: &str) -> Result<Vec<Map<String, Value>>, ExtractionError> {
    if let Some(slice) = positional_slice(text) {
        match parse_array(slice) {
            Some(rows) => {
                log::debug!("按位置定位到 JSON 数据，长度 {}", slice.len());
                return Ok(rows);
            }
            None => log::debug!("按位置截取的文本解析失败，改用正则匹配"),
        }
    }

    if let Some(candidate) = longest_candidate(text) {
        log::debug!("正则匹配到 JSON 数据，长度 {}", candidate.len());
        if let Some(rows) = parse_array(candidate) {
            return Ok(rows);
        }
        log::debug!("正则匹配结果解析失败");
    }

    Err(ExtractionError::new(text))
}

/// 第一阶段：首个起始标记到最后一个结束标记
fn positional_slice(text: &str) -> Option<&str> {
    let compact = text.find(COMPACT_OPEN);
    let pretty = pretty_open_regex().find(text).map(|m| m.start());
    let start = match (compact, pretty) {
        (Some(a), Some(b)) => a.min(b),
        (a, b) => a.or(b)?,
    };

    let end = close_regex().find_iter(text).last()?.end();
    if end <= start {
        return None;
    }
    Some(&text[start..end])
}

/// 第二阶段：所有候选数组中最长的一个
fn longest_candidate(text: &str) -> Option<&str> {
    array_regex()
        .find_iter(text)
        .map(|m| m.as_str())
        .max_by_key(|s| s.chars().count())
}

fn parse_array(s: &str) -> Option<Vec<Map<String, Value>>> {
    match serde_json::from_str::<Value>(s).ok()? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_compact_with_noise() {
        let rows = extract("noise... [{\"a\":1}] ...noise").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["a"], json!(1));
    }

    #[test]
    fn test_extract_garbage_fails() {
        let err = extract("garbage").unwrap_err();
        assert_eq!(err.len, 7);
        assert_eq!(err.head, "garbage");
    }

    #[test]
    fn test_extract_pretty_printed() {
        let text = "Some log\n[\n  {\"code\":\"600001\",\"name\":\"X\",\"change_percent\":9.98}\n]\nDone";
        let rows = extract(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["code"], json!("600001"));
    }

    #[test]
    fn test_extract_serde_pretty_output() {
        let payload = json!([
            {"code": "600001", "name": "甲"},
            {"code": "600002", "name": "乙"}
        ]);
        let text = format!(
            "调用接口...\n结果行数: 2\n{}\n\n股票总数: 2\n",
            serde_json::to_string_pretty(&payload).unwrap()
        );
        let rows = extract(&text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["name"], json!("乙"));
    }

    #[test]
    fn test_extract_prefers_longest_candidate() {
        // 两段数组之间夹杂文本，按位置截取无法解析，回退到正则并取最长者
        let text = "first [{\"a\":1}] middle [{\"b\":22222, \"c\":\"long\"}] end";
        let rows = extract(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["b"], json!(22222));
    }

    #[test]
    fn test_extract_non_object_array_fails() {
        assert!(extract("[1, 2, 3]").is_err());
        assert!(extract("[{\"a\": 1},]").is_err());
    }

    #[test]
    fn test_extract_close_before_open_fails() {
        let err = extract("}] then [{ broken").unwrap_err();
        assert!(err.to_string().contains("JSON"));
    }
}
