//! 东方财富强势股池接口实现
//!
//! 对应 akshare 的 stock_zt_pool_strong_em
//! 数据来源: https://push2ex.eastmoney.com/getTopicQSPool
//!
//! 注意：该接口只提供当前交易日的数据，请求历史日期时通常返回空或当日数据

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER, USER_AGENT};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;
use url::Url;

use super::common::EM_UT;
use crate::config::{ApiConfig, ProviderConfig};

/// 远程数据能力：按日期（可选）获取强势股池原始行
///
/// 返回的每一行以数据源的中文列名为键
#[async_trait]
pub trait StrongPoolProvider: Send + Sync {
    async fn fetch(&self, date: Option<&str>) -> Result<Vec<Map<String, Value>>>;
}

/// 东方财富强势股池客户端
pub struct EastMoneyProvider {
    client: Client,
    base_url: String,
    page_size: usize,
}

impl EastMoneyProvider {
    pub fn new(api: &ApiConfig, provider: &ProviderConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            ),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(REFERER, HeaderValue::from_static("https://quote.eastmoney.com/ztb/"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(api.timeout_secs))
            .connect_timeout(Duration::from_secs(api.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: provider.base_url.clone(),
            page_size: provider.page_size,
        })
    }

    /// 构造请求 URL
    fn build_url(&self, date: Option<&str>) -> Result<Url> {
        let page_size = self.page_size.to_string();
        let mut params = vec![
            ("ut", EM_UT),
            ("dpt", "wz.ztzt"),
            ("Pageindex", "0"),
            ("pagesize", page_size.as_str()),
            ("sort", "zdp:desc"),
        ];
        if let Some(d) = date {
            params.push(("date", d));
        }
        Url::parse_with_params(&self.base_url, &params)
            .map_err(|e| anyhow!("无效的数据源地址 {}: {}", self.base_url, e))
    }

    async fn fetch_pool(&self, date: Option<&str>) -> Result<Vec<Map<String, Value>>> {
        let url = self.build_url(date)?;
        log::info!("📡 请求强势股池 URL: {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("获取强势股池数据失败: {}", response.status()));
        }

        let body: Value = response.json().await?;
        let rows = parse_pool_response(&body);
        log::info!("📊 解析到 {} 条强势股数据", rows.len());
        Ok(rows)
    }
}

#[async_trait]
impl StrongPoolProvider for EastMoneyProvider {
    async fn fetch(&self, date: Option<&str>) -> Result<Vec<Map<String, Value>>> {
        self.fetch_pool(date).await
    }
}

/// 解析东方财富返回的 JSON
///
/// data 为 null 或 pool 为空时返回空列表（无数据不是错误）
pub fn parse_pool_response(body: &Value) -> Vec<Map<String, Value>> {
    let pool = match body["data"]["pool"].as_array() {
        Some(pool) => pool,
        None => return Vec::new(),
    };

    pool.iter()
        .enumerate()
        .map(|(i, item)| convert_pool_item(i + 1, item))
        .collect()
}

/// 将一条池数据转换为以中文列名为键的行
fn convert_pool_item(index: usize, item: &Value) -> Map<String, Value> {
    let mut row = Map::new();
    row.insert("序号".into(), json!(index));
    row.insert("代码".into(), item["c"].clone());
    row.insert("名称".into(), item["n"].clone());
    row.insert("涨跌幅".into(), item["zdp"].clone());
    row.insert("最新价".into(), scaled_price(&item["p"]));
    row.insert("涨停价".into(), scaled_price(&item["ztp"]));
    row.insert("成交额".into(), item["amount"].clone());
    row.insert("流通市值".into(), item["ltsz"].clone());
    row.insert("总市值".into(), item["tshare"].clone());
    row.insert("换手率".into(), item["hs"].clone());
    row.insert("涨速".into(), item["zs"].clone());
    row.insert("是否新高".into(), new_high_flag(&item["nh"]));
    row.insert("量比".into(), item["lb"].clone());
    row.insert("涨停统计".into(), limit_up_statistics(&item["zttj"]));
    row.insert("入选理由".into(), selection_reason(&item["cc"]));
    row.insert("所属行业".into(), item["hybk"].clone());
    row
}

/// 价格字段单位为厘，需除以 1000
fn scaled_price(v: &Value) -> Value {
    match v.as_f64() {
        Some(p) => json!(p / 1000.0),
        None => v.clone(),
    }
}

fn new_high_flag(v: &Value) -> Value {
    match v.as_i64() {
        Some(0) => json!("否"),
        Some(1) => json!("是"),
        _ => v.clone(),
    }
}

/// 涨停统计格式 "天数/次数"
fn limit_up_statistics(v: &Value) -> Value {
    match (v["days"].as_i64(), v["ct"].as_i64()) {
        (Some(days), Some(ct)) => json!(format!("{}/{}", days, ct)),
        _ => Value::Null,
    }
}

fn selection_reason(v: &Value) -> Value {
    match v.as_i64() {
        Some(1) => json!("60日新高"),
        Some(2) => json!("近期多次涨停"),
        Some(3) => json!("60日新高且近期多次涨停"),
        Some(other) => json!(other.to_string()),
        None => v.clone(),
    }
}
