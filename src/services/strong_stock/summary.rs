//! 强势股汇总统计

use std::collections::HashMap;

use crate::models::{ChangeBucket, IndustryCount, StrongStockRecord, StrongStockSummary};

/// 缺少行业信息时的归类名称
pub const UNKNOWN_INDUSTRY: &str = "未知";

/// 涨跌幅区间，下限包含、上限不包含
const CHANGE_BUCKETS: [(&str, f64, f64); 7] = [
    ("20% and above", 20.0, f64::INFINITY),
    ("10% to 20%", 10.0, 20.0),
    ("5% to 10%", 5.0, 10.0),
    ("0% to 5%", 0.0, 5.0),
    ("-5% to 0%", -5.0, 0.0),
    ("-10% to -5%", -10.0, -5.0),
    ("Below -10%", f64::NEG_INFINITY, -10.0),
];

/// 汇总一批记录：总数、行业分布、涨跌幅分布
pub fn summarize(records: &[StrongStockRecord]) -> StrongStockSummary {
    StrongStockSummary {
        total: records.len(),
        industry_counts: industry_counts(records),
        change_distribution: change_distribution(records),
    }
}

/// 行业分布，按数量降序，数量相同按名称升序
///
/// 平均涨跌幅只统计有涨跌幅的记录。
fn industry_counts(records: &[StrongStockRecord]) -> Vec<IndustryCount> {
    // 行业 -> (数量, 有涨跌幅的数量, 涨跌幅合计)
    let mut stats: HashMap<&str, (usize, usize, f64)> = HashMap::new();
    for record in records {
        let industry = record
            .industry
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_INDUSTRY);
        let entry = stats.entry(industry).or_insert((0, 0, 0.0));
        entry.0 += 1;
        if let Some(change) = record.change_percent {
            entry.1 += 1;
            entry.2 += change;
        }
    }

    let mut result: Vec<IndustryCount> = stats
        .into_iter()
        .map(|(industry, (count, with_change, sum))| IndustryCount {
            industry: industry.to_string(),
            count,
            avg_change: (with_change > 0).then(|| sum / with_change as f64),
        })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.industry.cmp(&b.industry)));
    result
}

fn change_distribution(records: &[StrongStockRecord]) -> Vec<ChangeBucket> {
    let mut sums = [(0usize, 0.0f64); CHANGE_BUCKETS.len()];
    for change in records.iter().filter_map(|r| r.change_percent) {
        if let Some(i) = CHANGE_BUCKETS
            .iter()
            .position(|(_, low, high)| change >= *low && change < *high)
        {
            sums[i].0 += 1;
            sums[i].1 += change;
        }
    }

    CHANGE_BUCKETS
        .iter()
        .zip(sums.iter())
        .filter(|(_, (count, _))| *count > 0)
        .map(|((range, _, _), (count, sum))| ChangeBucket {
            range: range.to_string(),
            count: *count,
            avg_change: sum / *count as f64,
        })
        .collect()
}
