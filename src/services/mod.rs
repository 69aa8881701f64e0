//! 业务逻辑服务模块
//!
//! 封装数据获取和处理逻辑

pub mod strong_stock; // 强势股池服务
