//! 强势股池后端服务
//!
//! 每日获取东方财富强势股池，分层降级应对数据源不稳定，按日期幂等写入 SQLite。
//!
//! 运行方式：
//! - 无参数：启动 HTTP 服务
//! - `fetch [YYYYMMDD]`：独立获取并打印 JSON（供外部进程降级调用）

mod config;     // 配置
mod fetch_cmd;  // 独立获取命令
mod handlers;   // HTTP 请求处理器
mod models;     // 数据模型定义
mod repository; // SQLite 持久化
mod services;   // 业务逻辑服务

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use crate::config::AppConfig;
use crate::services::strong_stock::StrongStockService;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let (config, notes) = AppConfig::load();
    env_logger::init_from_env(Env::default().default_filter_or(config.log.level.as_str()));
    for (level, message) in notes {
        log::log!(level, "{}", message);
    }

    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("fetch") {
        if let Err(e) = fetch_cmd::run(&config, args.get(2).map(String::as_str)).await {
            log::error!("获取强势股数据失败: {:#}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    let service = StrongStockService::from_config(&config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("{:#}", e)))?;
    let service = web::Data::new(service);

    log::info!("启动强势股池服务，监听 {}", config.bind_addr());

    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())  // 添加请求日志中间件
            .app_data(service.clone())
            .configure(handlers::config)  // 配置路由
    });
    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    server.bind(config.bind_addr())?.run().await
}
