//! 数据持久化

pub mod strong_stock;

pub use strong_stock::StrongStockStore;
