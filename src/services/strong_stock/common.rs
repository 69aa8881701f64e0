//! 公共常量和辅助函数

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, Utc};
use chrono_tz::Asia::Shanghai;

/// 东方财富强势股池 API
pub const EM_STRONG_POOL_API: &str = "https://push2ex.eastmoney.com/getTopicQSPool";
/// 东方财富接口固定 ut 参数
pub const EM_UT: &str = "7eea3edcaed734bea9cbfc24409ed989";
/// 日期格式 YYYYMMDD
pub const DATE_FORMAT: &str = "%Y%m%d";

/// 当前交易所所在时区（北京时间）的日期
pub fn today() -> NaiveDate {
    Utc::now().with_timezone(&Shanghai).date_naive()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// 解析 YYYYMMDD 日期
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| anyhow!("日期格式错误 {}（需要 YYYYMMDD）: {}", s, e))
}

/// 截取文本首尾用于诊断输出
pub fn head_tail(text: &str, n: usize) -> (String, String) {
    let chars: Vec<char> = text.chars().collect();
    let head: String = chars.iter().take(n).collect();
    let tail: String = chars[chars.len().saturating_sub(n)..].iter().collect();
    (head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format_date() {
        let d = parse_date("20250303").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        assert_eq!(format_date(d), "20250303");
        assert!(parse_date("2025-03-03").is_err());
        assert!(parse_date("20251340").is_err());
    }

    #[test]
    fn test_head_tail_multibyte() {
        let (head, tail) = head_tail("强势股数据输出", 2);
        assert_eq!(head, "强势");
        assert_eq!(tail, "输出");

        let (head, tail) = head_tail("ab", 10);
        assert_eq!(head, "ab");
        assert_eq!(tail, "ab");
    }
}
