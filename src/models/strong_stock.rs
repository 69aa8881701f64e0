//! 强势股池数据模型
//!
//! 定义强势股记录、汇总统计以及接口返回结构

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// 强势股记录
///
/// 每个交易日每只股票一行，唯一键为 (fetch_date, code)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrongStockRecord {
    /// 获取日期（分区键）
    pub fetch_date: NaiveDate,
    /// 在源列表中的序号（不唯一）
    pub rank: Option<i64>,
    /// 股票代码
    pub code: String,
    /// 股票名称
    pub name: String,
    /// 涨跌幅（%）
    pub change_percent: Option<f64>,
    /// 最新价
    pub price: Option<f64>,
    /// 涨停价
    pub limit_up_price: Option<f64>,
    /// 成交额
    pub turnover_amount: Option<f64>,
    /// 流通市值
    pub circulating_market_value: Option<f64>,
    /// 总市值
    pub total_market_value: Option<f64>,
    /// 换手率（%）
    pub turnover_rate: Option<f64>,
    /// 涨速
    pub rise_speed: Option<f64>,
    /// 是否新高
    pub is_new_high: Option<String>,
    /// 量比
    pub volume_ratio: Option<f64>,
    /// 涨停统计，如 "3/5"
    pub limit_up_statistics: Option<String>,
    /// 入选理由
    pub selection_reason: Option<String>,
    /// 所属行业
    pub industry: Option<String>,
}

impl StrongStockRecord {
    /// 从一行原始数据构造记录
    ///
    /// 同时识别数据源的中文列名和记录本身的英文字段名。
    /// 数值字段解析失败时置为 None，不丢弃整行。
    pub fn from_row(row: &Map<String, Value>, fetch_date: NaiveDate) -> Self {
        Self {
            fetch_date,
            rank: field(row, &["rank", "序号"]).and_then(parse_i64),
            code: field(row, &["code", "代码"]).and_then(parse_code).unwrap_or_default(),
            name: field(row, &["name", "名称"]).and_then(parse_text).unwrap_or_default(),
            change_percent: number(row, &["change_percent", "涨跌幅"]),
            price: number(row, &["price", "最新价"]),
            limit_up_price: number(row, &["limit_up_price", "涨停价"]),
            turnover_amount: number(row, &["turnover_amount", "成交额"]),
            circulating_market_value: number(row, &["circulating_market_value", "流通市值"]),
            total_market_value: number(row, &["total_market_value", "总市值"]),
            turnover_rate: number(row, &["turnover_rate", "换手率"]),
            rise_speed: number(row, &["rise_speed", "涨速"]),
            is_new_high: field(row, &["is_new_high", "是否新高"]).and_then(parse_text),
            volume_ratio: number(row, &["volume_ratio", "量比"]),
            limit_up_statistics: field(row, &["limit_up_statistics", "涨停统计"])
                .and_then(parse_text),
            selection_reason: field(row, &["selection_reason", "入选理由"]).and_then(parse_text),
            industry: field(row, &["industry", "所属行业"]).and_then(parse_text),
        }
    }

    /// 批量转换，缺少股票代码的行无法满足唯一键，直接跳过
    pub fn from_rows(rows: &[Map<String, Value>], fetch_date: NaiveDate) -> Vec<Self> {
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let record = Self::from_row(row, fetch_date);
            if record.code.is_empty() {
                log::warn!("跳过缺少股票代码的行: {}", Value::Object(row.clone()));
                continue;
            }
            records.push(record);
        }
        records
    }
}

/// 取第一个存在且非 null 的字段
fn field<'a>(row: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| row.get(*k))
        .find(|v| !v.is_null())
}

fn number(row: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    field(row, keys).and_then(parse_f64)
}

/// 解析数值，兼容 "9.98%"、"1,234.5" 等文本形式
pub fn parse_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned = s.trim().trim_end_matches('%').replace(',', "");
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn parse_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn parse_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A 股代码为 6 位，数值形式会丢失前导零
fn parse_code(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => n.as_u64().map(|c| format!("{:06}", c)),
        other => parse_text(other).filter(|s| !s.is_empty()),
    }
}

/// 降级获取的层级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// 第1层：带日期直接调用
    RequestedDate,
    /// 第2层：不带日期调用（当日数据）
    CurrentDay,
    /// 第3层：外部进程获取
    ExternalProcess,
}

impl Tier {
    pub fn number(&self) -> u8 {
        match self {
            Tier::RequestedDate => 1,
            Tier::CurrentDay => 2,
            Tier::ExternalProcess => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::RequestedDate => "带日期直接调用",
            Tier::CurrentDay => "不带日期调用当日数据",
            Tier::ExternalProcess => "外部进程获取",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier {} ({})", self.number(), self.label())
    }
}

/// 行业分布
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryCount {
    pub industry: String,
    pub count: usize,
    /// 行业内平均涨跌幅，涨跌幅全部缺失时为 None
    pub avg_change: Option<f64>,
}

/// 涨跌幅区间分布
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeBucket {
    /// 区间名称，如 "10% to 20%"
    pub range: String,
    pub count: usize,
    /// 区间内平均涨跌幅
    pub avg_change: f64,
}

/// 强势股汇总统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrongStockSummary {
    /// 股票总数
    pub total: usize,
    /// 行业分布（按数量降序）
    pub industry_counts: Vec<IndustryCount>,
    /// 涨跌幅分布
    pub change_distribution: Vec<ChangeBucket>,
}

/// 强势股查询参数
#[derive(Debug, Deserialize)]
pub struct StrongStockQuery {
    /// 日期（YYYYMMDD）
    pub date: Option<String>,
}

/// 实时获取结果
#[derive(Debug, Serialize)]
pub struct RetrievalReport {
    pub fetch_date: NaiveDate,
    /// 实际提供数据的层级
    pub tier: Option<Tier>,
    /// 各层诊断信息
    pub diagnostic: String,
    pub summary: StrongStockSummary,
    pub records: Vec<StrongStockRecord>,
}

/// 获取并入库的结果
#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub fetch_date: NaiveDate,
    pub tier: Option<Tier>,
    pub diagnostic: String,
    /// 写入行数
    pub stored: usize,
    pub summary: StrongStockSummary,
}

/// 已入库数据
#[derive(Debug, Serialize)]
pub struct StoredReport {
    pub fetch_date: NaiveDate,
    pub summary: StrongStockSummary,
    pub records: Vec<StrongStockRecord>,
}

/// 已入库日期
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDate {
    pub fetch_date: NaiveDate,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_from_row_chinese_columns() {
        let r = row(json!({
            "序号": 1,
            "代码": "600001",
            "名称": "测试股份",
            "涨跌幅": 9.98,
            "最新价": 12.34,
            "涨停价": 12.34,
            "成交额": 123456789.0,
            "是否新高": "是",
            "涨停统计": "2/3",
            "入选理由": "60日新高",
            "所属行业": "半导体"
        }));
        let record = StrongStockRecord::from_row(&r, date());

        assert_eq!(record.rank, Some(1));
        assert_eq!(record.code, "600001");
        assert_eq!(record.name, "测试股份");
        assert_eq!(record.change_percent, Some(9.98));
        assert_eq!(record.price, Some(12.34));
        assert_eq!(record.is_new_high.as_deref(), Some("是"));
        assert_eq!(record.limit_up_statistics.as_deref(), Some("2/3"));
        assert_eq!(record.industry.as_deref(), Some("半导体"));
        assert_eq!(record.volume_ratio, None);
    }

    #[test]
    fn test_unparseable_number_becomes_none() {
        let r = row(json!({
            "code": "000002",
            "name": "X",
            "price": "N/A",
            "change_percent": "5.5%",
            "turnover_amount": "1,234.5",
            "industry": "银行"
        }));
        let record = StrongStockRecord::from_row(&r, date());

        assert_eq!(record.price, None);
        assert_eq!(record.change_percent, Some(5.5));
        assert_eq!(record.turnover_amount, Some(1234.5));
        assert_eq!(record.code, "000002");
        assert_eq!(record.name, "X");
        assert_eq!(record.industry.as_deref(), Some("银行"));
    }

    #[test]
    fn test_numeric_code_keeps_leading_zeros() {
        let r = row(json!({"code": 1, "name": "平安银行"}));
        let record = StrongStockRecord::from_row(&r, date());
        assert_eq!(record.code, "000001");
    }

    #[test]
    fn test_from_rows_skips_missing_code() {
        let rows = vec![
            row(json!({"code": "600001", "name": "A"})),
            row(json!({"name": "no code"})),
            row(json!({"code": "", "name": "empty code"})),
        ];
        let records = StrongStockRecord::from_rows(&rows, date());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].code, "600001");
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(Tier::CurrentDay.number(), 2);
        assert!(Tier::ExternalProcess.to_string().starts_with("tier 3"));
    }
}
