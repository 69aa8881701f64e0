//! 通用 API 响应模型

use chrono::Utc;
use chrono_tz::Asia::Shanghai;
use serde::{Deserialize, Serialize};

/// 无数据时的提示信息
pub const NO_DATA_MESSAGE: &str = "no data available for this date";

fn beijing_timestamp() -> String {
    Utc::now().with_timezone(&Shanghai).to_rfc3339()
}

/// 统一 API 响应结构
///
/// - success: 请求是否成功（无数据也视为成功）
/// - data: 响应数据
/// - message: 响应消息
/// - timestamp: 北京时间 RFC 3339
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::with_message(data, "Success")
    }

    /// 成功但数据源当前没有数据
    pub fn no_data(data: T) -> Self {
        Self::with_message(data, NO_DATA_MESSAGE)
    }

    fn with_message(data: T, message: &str) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.to_string(),
            timestamp: beijing_timestamp(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message,
            timestamp: beijing_timestamp(),
        }
    }
}
