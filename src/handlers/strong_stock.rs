use actix_web::{web, HttpResponse, Result};
use chrono::NaiveDate;

use crate::models::{ApiResponse, StoredDate, StoredReport, StrongStockQuery, SyncReport};
use crate::services::strong_stock::common::{parse_date, today};
use crate::services::strong_stock::StrongStockService;

/// 解析可选日期参数，格式错误时返回 400 响应
fn query_date(query: &StrongStockQuery) -> std::result::Result<Option<NaiveDate>, HttpResponse> {
    match query.date.as_deref().filter(|d| !d.trim().is_empty()) {
        None => Ok(None),
        Some(d) => parse_date(d)
            .map(Some)
            .map_err(|e| HttpResponse::BadRequest().json(ApiResponse::<()>::error(e.to_string()))),
    }
}

/// 实时获取强势股池（不入库）
pub async fn get_strong_stocks(
    service: web::Data<StrongStockService>,
    query: web::Query<StrongStockQuery>,
) -> Result<HttpResponse> {
    let date = match query_date(&query) {
        Ok(date) => date,
        Err(resp) => return Ok(resp),
    };

    let report = service.fetch(date).await;
    let response = if report.records.is_empty() {
        ApiResponse::no_data(report)
    } else {
        ApiResponse::success(report)
    };
    Ok(HttpResponse::Ok().json(response))
}

/// 获取并入库
pub async fn sync_strong_stocks(
    service: web::Data<StrongStockService>,
    query: web::Query<StrongStockQuery>,
) -> Result<HttpResponse> {
    let date = match query_date(&query) {
        Ok(date) => date,
        Err(resp) => return Ok(resp),
    };

    match service.sync(date).await {
        Ok(report) if report.stored == 0 => Ok(HttpResponse::Ok().json(ApiResponse::no_data(report))),
        Ok(report) => Ok(HttpResponse::Ok().json(ApiResponse::success(report))),
        Err(e) => {
            log::error!("强势股入库失败: {:#}", e);
            let response = ApiResponse::<SyncReport>::error(format!("{:#}", e));
            Ok(HttpResponse::InternalServerError().json(response))
        }
    }
}

/// 读取已入库数据，未指定日期时为当日
pub async fn get_stored_strong_stocks(
    service: web::Data<StrongStockService>,
    query: web::Query<StrongStockQuery>,
) -> Result<HttpResponse> {
    let date = match query_date(&query) {
        Ok(date) => date.unwrap_or_else(today),
        Err(resp) => return Ok(resp),
    };

    match service.stored(date) {
        Ok(report) if report.records.is_empty() => {
            Ok(HttpResponse::Ok().json(ApiResponse::no_data(report)))
        }
        Ok(report) => Ok(HttpResponse::Ok().json(ApiResponse::success(report))),
        Err(e) => {
            let response = ApiResponse::<StoredReport>::error(format!("{:#}", e));
            Ok(HttpResponse::InternalServerError().json(response))
        }
    }
}

pub async fn list_stored_dates(service: web::Data<StrongStockService>) -> Result<HttpResponse> {
    match service.dates() {
        Ok(dates) => Ok(HttpResponse::Ok().json(ApiResponse::success(dates))),
        Err(e) => {
            let response = ApiResponse::<Vec<StoredDate>>::error(format!("{:#}", e));
            Ok(HttpResponse::InternalServerError().json(response))
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/strong-stocks")
            .route("", web::get().to(get_strong_stocks))
            .route("/sync", web::post().to(sync_strong_stocks))
            .route("/stored", web::get().to(get_stored_strong_stocks))
            .route("/dates", web::get().to(list_stored_dates))
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::StrongStockStore;
    use crate::services::strong_stock::{RetrievalOrchestrator, StrongPoolProvider};
    use actix_web::{test, App};
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use std::sync::Arc;

    struct FixedProvider(Vec<Value>);

    #[async_trait]
    impl StrongPoolProvider for FixedProvider {
        async fn fetch(&self, _date: Option<&str>) -> anyhow::Result<Vec<Map<String, Value>>> {
            Ok(self.0.iter().filter_map(|v| v.as_object().cloned()).collect())
        }
    }

    fn service(rows: Vec<Value>) -> web::Data<StrongStockService> {
        let orchestrator = RetrievalOrchestrator::new(Arc::new(FixedProvider(rows)));
        web::Data::new(StrongStockService::new(
            orchestrator,
            StrongStockStore::in_memory().unwrap(),
        ))
    }

    #[actix_web::test]
    async fn test_sync_then_read_stored() {
        let app = test::init_service(
            App::new()
                .app_data(service(vec![
                    json!({"代码": "600001", "名称": "甲", "涨跌幅": 9.98, "所属行业": "半导体"}),
                ]))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/strong-stocks/sync?date=20250303")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["stored"], json!(1));
        assert_eq!(body["data"]["tier"], json!("requested_date"));

        let req = test::TestRequest::get()
            .uri("/strong-stocks/stored?date=20250303")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["records"][0]["code"], json!("600001"));
        assert_eq!(body["data"]["summary"]["total"], json!(1));
    }

    #[actix_web::test]
    async fn test_no_data_is_success() {
        let app = test::init_service(App::new().app_data(service(vec![])).configure(config)).await;

        let req = test::TestRequest::get()
            .uri("/strong-stocks?date=20250303")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!("no data available for this date"));
    }

    #[actix_web::test]
    async fn test_invalid_date_is_bad_request() {
        let app = test::init_service(App::new().app_data(service(vec![])).configure(config)).await;

        let req = test::TestRequest::get()
            .uri("/strong-stocks?date=2025-03-03")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }
}
