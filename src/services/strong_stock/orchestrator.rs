//! 强势股分层降级获取
//!
//! 依次尝试：
//! 1. 带请求日期直接调用数据源
//! 2. 结果为空时不带日期再调用一次（数据源会用当日数据替代不支持的历史日期）
//! 3. 仍为空时启动外部进程独立获取，并从其输出中提取 JSON
//!
//! 任一层取得非空结果即停止。全部失败返回空结果而不是错误。
//! 每一层的尝试和结果都写入诊断信息，随记录一并返回。

use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::common::{format_date, head_tail, today};
use super::eastmoney::StrongPoolProvider;
use super::extractor;
use super::invoker::ExternalFetcher;
use crate::models::{StrongStockRecord, Tier};

const STDOUT_PREVIEW_CHARS: usize = 200;

/// 一次获取的结果
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub fetch_date: NaiveDate,
    pub records: Vec<StrongStockRecord>,
    /// 各层诊断信息，按行拼接
    pub diagnostic: String,
    /// 实际提供数据的层级，None 表示没有数据
    pub tier: Option<Tier>,
}

impl Retrieval {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// 诊断信息收集，同时写日志
#[derive(Default)]
struct Diagnostic {
    lines: Vec<String>,
}

impl Diagnostic {
    fn info(&mut self, line: String) {
        log::info!("{}", line);
        self.lines.push(line);
    }

    fn warn(&mut self, line: String) {
        log::warn!("{}", line);
        self.lines.push(line);
    }

    fn finish(self) -> String {
        self.lines.join("\n")
    }
}

pub struct RetrievalOrchestrator {
    provider: Arc<dyn StrongPoolProvider>,
    external: Option<Arc<dyn ExternalFetcher>>,
}

impl RetrievalOrchestrator {
    /// 仅使用进程内数据源（第1、2层）
    pub fn new(provider: Arc<dyn StrongPoolProvider>) -> Self {
        Self {
            provider,
            external: None,
        }
    }

    /// 启用外部进程层（第3层）
    pub fn with_external(mut self, external: Arc<dyn ExternalFetcher>) -> Self {
        self.external = Some(external);
        self
    }

    /// 获取强势股数据
    ///
    /// 未指定日期时使用北京时间当日。数据源只提供当前交易日数据，
    /// 请求其他日期时返回的记录反映的是数据源当前可用的数据。
    pub async fn retrieve(&self, date: Option<NaiveDate>) -> Retrieval {
        let today = today();
        let fetch_date = date.unwrap_or(today);
        let date_str = format_date(fetch_date);
        let mut diag = Diagnostic::default();

        diag.info(format!("请求日期: {}", date_str));
        if fetch_date != today {
            diag.warn(format!(
                "注意: 数据源只提供当前交易日（{}）数据，请求的日期 {} 可能返回当日数据，不代表历史数据",
                format_date(today),
                date_str
            ));
        }

        // 第1层
        let rows = self
            .call_provider(Tier::RequestedDate, Some(&date_str), &mut diag)
            .await;
        if let Some(records) = to_records(rows, fetch_date) {
            return finish(fetch_date, records, Tier::RequestedDate, diag);
        }

        // 第2层
        diag.info(format!(
            "{} 无数据，改为不带日期请求当日数据",
            Tier::RequestedDate
        ));
        let rows = self.call_provider(Tier::CurrentDay, None, &mut diag).await;
        if let Some(records) = to_records(rows, fetch_date) {
            return finish(fetch_date, records, Tier::CurrentDay, diag);
        }

        // 第3层
        match &self.external {
            Some(external) => {
                diag.info(format!("{} 仍无数据，尝试外部进程获取", Tier::CurrentDay));
                let rows = run_external(external.as_ref(), &mut diag).await;
                if let Some(records) = to_records(rows, fetch_date) {
                    return finish(fetch_date, records, Tier::ExternalProcess, diag);
                }
            }
            None => diag.info(format!("{} 未启用", Tier::ExternalProcess)),
        }

        diag.warn(format!("所有层级均未获取到数据，日期 {} 暂无可用数据", date_str));
        Retrieval {
            fetch_date,
            records: Vec::new(),
            diagnostic: diag.finish(),
            tier: None,
        }
    }

    /// 调用数据源，异常只记录不向上传播
    async fn call_provider(
        &self,
        tier: Tier,
        date: Option<&str>,
        diag: &mut Diagnostic,
    ) -> Vec<Map<String, Value>> {
        match date {
            Some(d) => diag.info(format!("{}: 调用数据源，date={}", tier, d)),
            None => diag.info(format!("{}: 调用数据源，不带日期参数", tier)),
        }

        match self.provider.fetch(date).await {
            Ok(rows) => {
                diag.info(format!("{}: 返回 {} 行", tier, rows.len()));
                rows
            }
            Err(e) => {
                diag.warn(format!("{}: 调用失败: {:#}", tier, e));
                Vec::new()
            }
        }
    }
}

/// 第3层：运行外部进程并提取输出中的 JSON
async fn run_external(external: &dyn ExternalFetcher, diag: &mut Diagnostic) -> Vec<Map<String, Value>> {
    let tier = Tier::ExternalProcess;
    let output = match external.run().await {
        Ok(output) => output,
        Err(e) => {
            diag.warn(format!("{}: {}", tier, e));
            return Vec::new();
        }
    };

    diag.info(format!(
        "{}: 退出码 {}，输出 {} 字符",
        tier,
        output.exit_code,
        output.stdout.chars().count()
    ));

    if !output.success() || output.stdout.trim().is_empty() {
        let (stdout_head, _) = head_tail(&output.stdout, STDOUT_PREVIEW_CHARS);
        diag.warn(format!(
            "{}: 执行失败或无输出，STDOUT: {:?}，STDERR: {}",
            tier,
            stdout_head,
            output.stderr.trim()
        ));
        return Vec::new();
    }

    match extractor::extract(&output.stdout) {
        Ok(rows) => {
            diag.info(format!("{}: 成功解析 JSON，{} 行", tier, rows.len()));
            rows
        }
        Err(e) => {
            diag.warn(format!("{}: {}", tier, e));
            Vec::new()
        }
    }
}

/// 非空时转换为记录
fn to_records(rows: Vec<Map<String, Value>>, fetch_date: NaiveDate) -> Option<Vec<StrongStockRecord>> {
    let records = StrongStockRecord::from_rows(&rows, fetch_date);
    (!records.is_empty()).then_some(records)
}

fn finish(
    fetch_date: NaiveDate,
    records: Vec<StrongStockRecord>,
    tier: Tier,
    mut diag: Diagnostic,
) -> Retrieval {
    diag.info(format!("数据来源: {}，共 {} 条记录", tier, records.len()));
    Retrieval {
        fetch_date,
        records,
        diagnostic: diag.finish(),
        tier: Some(tier),
    }
}
