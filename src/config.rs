//! 配置模块
//!
//! 支持从 JSON 文件加载系统配置

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::services::strong_stock::common::EM_STRONG_POOL_API;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// 数据源请求配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite 文件路径
    #[serde(default = "default_db_path")]
    pub path: String,
}

/// 强势股池数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_url")]
    pub base_url: String,
    /// 单次请求条数
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// 外部进程降级配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// 是否启用外部进程层
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 可执行文件，为空时使用当前程序
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default = "default_fallback_args")]
    pub args: Vec<String>,
    /// 外部进程超时时间（秒）
    #[serde(default = "default_fallback_timeout")]
    pub timeout_secs: u64,
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_timeout() -> u64 { 30 }
fn default_connect_timeout() -> u64 { 10 }
fn default_log_level() -> String { "info".to_string() }
fn default_db_path() -> String { "strong_stocks.db".to_string() }
fn default_provider_url() -> String { EM_STRONG_POOL_API.to_string() }
fn default_page_size() -> usize { 170 }
fn default_true() -> bool { true }
fn default_fallback_args() -> Vec<String> { vec!["fetch".to_string()] }
fn default_fallback_timeout() -> u64 { 120 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_url(),
            page_size: default_page_size(),
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: None,
            args: default_fallback_args(),
            timeout_secs: default_fallback_timeout(),
        }
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 加载配置，优先从文件，失败则使用默认值
    ///
    /// 日志级别取自配置本身，加载时日志尚未初始化，
    /// 因此加载过程的提示随结果返回，由调用方在初始化日志后输出。
    pub fn load() -> (Self, Vec<(log::Level, String)>) {
        Self::load_from(&["config.json", "config/config.json"])
    }

    fn load_from<P: AsRef<Path>>(paths: &[P]) -> (Self, Vec<(log::Level, String)>) {
        let mut notes = Vec::new();

        for path in paths {
            let path = path.as_ref();
            if path.exists() {
                match Self::from_file(path) {
                    Ok(config) => {
                        notes.push((log::Level::Info, format!("从 {} 加载配置成功", path.display())));
                        return (config, notes);
                    }
                    Err(e) => {
                        notes.push((
                            log::Level::Warn,
                            format!("加载配置文件 {} 失败: {}", path.display(), e),
                        ));
                    }
                }
            }
        }

        notes.push((log::Level::Info, "使用默认配置".to_string()));
        (Self::default(), notes)
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server": {{"port": 9090}}, "fallback": {{"timeout_secs": 5, "enabled": false}}}}"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:9090");
        assert_eq!(config.fallback.timeout_secs, 5);
        assert!(!config.fallback.enabled);
        assert_eq!(config.fallback.args, vec!["fetch".to_string()]);
        assert_eq!(config.database.path, "strong_stocks.db");
        assert_eq!(config.provider.page_size, 170);
    }

    #[test]
    fn test_invalid_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(AppConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_malformed_file_reports_warning_and_falls_back() {
        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "not json").unwrap();
        let mut good = tempfile::NamedTempFile::new().unwrap();
        write!(good, r#"{{"fallback": {{"enabled": false}}}}"#).unwrap();

        let (config, notes) = AppConfig::load_from(&[bad.path()]);
        assert!(config.fallback.enabled);
        assert_eq!(notes[0].0, log::Level::Warn);
        assert!(notes[0].1.contains("加载配置文件"));
        assert!(notes.iter().any(|(_, msg)| msg == "使用默认配置"));

        let (config, notes) = AppConfig::load_from(&[bad.path(), good.path()]);
        assert!(!config.fallback.enabled);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].0, log::Level::Info);
    }
}
