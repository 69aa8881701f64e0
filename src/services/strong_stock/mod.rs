//! 强势股池服务
//!
//! 参考 akshare 的 stock_zt_pool_strong_em 实现，数据来源：东方财富
//!
//! ## 组成
//! - eastmoney：远程数据源
//! - orchestrator：分层降级获取（带日期 → 不带日期 → 外部进程）
//! - invoker：外部进程执行，带超时
//! - extractor：从外部进程输出中提取 JSON
//! - summary：总数、行业分布、涨跌幅分布

pub mod common;
mod eastmoney;
pub mod extractor;
mod invoker;
mod orchestrator;
mod summary;

pub use eastmoney::{EastMoneyProvider, StrongPoolProvider};
pub use invoker::CommandFetcher;
pub use orchestrator::RetrievalOrchestrator;
pub use summary::summarize;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::AppConfig;
use crate::models::{RetrievalReport, StoredDate, StoredReport, SyncReport};
use crate::repository::StrongStockStore;

/// 获取、存储与统计的组合入口，供 HTTP 接口使用
pub struct StrongStockService {
    orchestrator: RetrievalOrchestrator,
    store: Mutex<StrongStockStore>,
}

impl StrongStockService {
    pub fn new(orchestrator: RetrievalOrchestrator, store: StrongStockStore) -> Self {
        Self {
            orchestrator,
            store: Mutex::new(store),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let provider = Arc::new(EastMoneyProvider::new(&config.api, &config.provider)?);
        let mut orchestrator = RetrievalOrchestrator::new(provider);

        if config.fallback.enabled {
            let fetcher = CommandFetcher::from_config(&config.fallback)?;
            log::info!("外部进程降级已启用: {}", fetcher.command_line());
            orchestrator = orchestrator.with_external(Arc::new(fetcher));
        }

        let store = StrongStockStore::open(&config.database.path)?;
        log::info!("使用数据库: {}", config.database.path);
        Ok(Self::new(orchestrator, store))
    }

    fn store(&self) -> Result<MutexGuard<'_, StrongStockStore>> {
        self.store.lock().map_err(|_| anyhow!("数据库连接锁已失效"))
    }

    /// 实时获取并统计，不入库
    pub async fn fetch(&self, date: Option<NaiveDate>) -> RetrievalReport {
        let retrieval = self.orchestrator.retrieve(date).await;
        RetrievalReport {
            fetch_date: retrieval.fetch_date,
            tier: retrieval.tier,
            summary: summarize(&retrieval.records),
            diagnostic: retrieval.diagnostic,
            records: retrieval.records,
        }
    }

    /// 获取并替换写入当日分区，存储失败向上传播
    pub async fn sync(&self, date: Option<NaiveDate>) -> Result<SyncReport> {
        let retrieval = self.orchestrator.retrieve(date).await;
        let stored = self.store()?.save(retrieval.fetch_date, &retrieval.records)?;
        log::info!("{} 写入 {} 条强势股记录", retrieval.fetch_date, stored);

        Ok(SyncReport {
            fetch_date: retrieval.fetch_date,
            tier: retrieval.tier,
            stored,
            summary: summarize(&retrieval.records),
            diagnostic: retrieval.diagnostic,
        })
    }

    /// 读取已入库数据并统计
    pub fn stored(&self, date: NaiveDate) -> Result<StoredReport> {
        let records = self.store()?.load(date)?;
        Ok(StoredReport {
            fetch_date: date,
            summary: summarize(&records),
            records,
        })
    }

    pub fn dates(&self) -> Result<Vec<StoredDate>> {
        Ok(self.store()?.list_dates()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};

    /// 返回固定数据的数据源，rows 为空时模拟无数据
    struct FixedProvider {
        rows: Vec<Value>,
    }

    #[async_trait]
    impl StrongPoolProvider for FixedProvider {
        async fn fetch(&self, _date: Option<&str>) -> Result<Vec<Map<String, Value>>> {
            Ok(self
                .rows
                .iter()
                .filter_map(|v| v.as_object().cloned())
                .collect())
        }
    }

    fn service(rows: Vec<Value>) -> StrongStockService {
        let orchestrator = RetrievalOrchestrator::new(Arc::new(FixedProvider { rows }));
        StrongStockService::new(orchestrator, StrongStockStore::in_memory().unwrap())
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    #[tokio::test]
    async fn test_sync_twice_is_idempotent() {
        let svc = service(vec![
            json!({"代码": "600001", "名称": "甲", "涨跌幅": 9.98, "所属行业": "半导体"}),
            json!({"代码": "600002", "名称": "乙", "涨跌幅": "N/A", "所属行业": "半导体"}),
        ]);

        let first = svc.sync(Some(date())).await.unwrap();
        let second = svc.sync(Some(date())).await.unwrap();
        assert_eq!(first.stored, 2);
        assert_eq!(second.stored, 2);

        let stored = svc.stored(date()).unwrap();
        assert_eq!(stored.records.len(), 2);
        assert_eq!(stored.records[1].change_percent, None);
        assert_eq!(stored.records[1].name, "乙");
        assert_eq!(stored.summary.total, 2);
        assert_eq!(stored.summary.industry_counts[0].count, 2);
        assert_eq!(svc.dates().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_without_data() {
        let svc = service(vec![]);
        let report = svc.fetch(Some(date())).await;
        assert!(report.records.is_empty());
        assert!(report.tier.is_none());
        assert_eq!(report.summary.total, 0);
    }

    #[tokio::test]
    async fn test_sync_without_data_stores_nothing() {
        let svc = service(vec![]);
        let report = svc.sync(Some(date())).await.unwrap();
        assert_eq!(report.stored, 0);
        assert!(svc.dates().unwrap().is_empty());
    }
}
