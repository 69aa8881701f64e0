//! 独立获取命令 `fetch [YYYYMMDD]`
//!
//! 作为外部进程层的执行体：只走进程内数据源（不会再次启动外部进程），
//! 在标准输出打印进度、JSON 数组（2 空格缩进）和统计信息。

use anyhow::Result;
use std::fmt::Write;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::{StrongStockRecord, StrongStockSummary};
use crate::services::strong_stock::common::parse_date;
use crate::services::strong_stock::{summarize, EastMoneyProvider, RetrievalOrchestrator};

pub const NO_DATA_LINE: &str = "NO STRONG STOCK DATA FOUND";

pub async fn run(config: &AppConfig, date_arg: Option<&str>) -> Result<()> {
    let date = date_arg.map(parse_date).transpose()?;
    println!("Using date: {}", date_arg.unwrap_or("today"));

    let provider = Arc::new(EastMoneyProvider::new(&config.api, &config.provider)?);
    let retrieval = RetrievalOrchestrator::new(provider).retrieve(date).await;

    print!("{}", render_output(&retrieval.diagnostic, &retrieval.records)?);
    Ok(())
}

/// 标准输出内容：诊断信息、JSON 数组、统计尾部
///
/// 父进程按 JSON 数组的起止位置提取，前后的文字不影响解析。
pub fn render_output(diagnostic: &str, records: &[StrongStockRecord]) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{}", diagnostic)?;

    if records.is_empty() {
        writeln!(out, "{}", NO_DATA_LINE)?;
        return Ok(out);
    }

    writeln!(out, "{}", serde_json::to_string_pretty(records)?)?;
    write_summary(&mut out, &summarize(records))?;
    Ok(out)
}

fn write_summary(out: &mut String, summary: &StrongStockSummary) -> std::fmt::Result {
    writeln!(out, "\nTotal strong stocks: {}", summary.total)?;

    if !summary.industry_counts.is_empty() {
        writeln!(out, "\nIndustry Distribution:")?;
        for item in &summary.industry_counts {
            match item.avg_change {
                Some(avg) => writeln!(out, "  {}: {} (avg {:.2}%)", item.industry, item.count, avg)?,
                None => writeln!(out, "  {}: {}", item.industry, item.count)?,
            }
        }
    }
    Ok(())
}
