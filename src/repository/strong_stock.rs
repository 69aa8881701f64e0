//! 强势股 SQLite 存储
//!
//! 按 fetch_date 分区，写入时先删除当日旧数据再插入新数据（同一事务内），
//! 重复获取同一天不会产生重复行。

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use thiserror::Error;

use crate::models::{StoredDate, StrongStockRecord};
use crate::services::strong_stock::common::{format_date, parse_date};

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS strong_stocks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    fetch_date TEXT NOT NULL,
    stock_rank INTEGER,
    code TEXT NOT NULL,
    name TEXT,
    change_percent REAL,
    price REAL,
    limit_up_price REAL,
    turnover_amount REAL,
    circulating_market_value REAL,
    total_market_value REAL,
    turnover_rate REAL,
    rise_speed REAL,
    is_new_high TEXT,
    volume_ratio REAL,
    limit_up_statistics TEXT,
    selection_reason TEXT,
    industry TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(fetch_date, code)
);

CREATE INDEX IF NOT EXISTS idx_strong_stocks_code ON strong_stocks (code);
CREATE INDEX IF NOT EXISTS idx_strong_stocks_fetch_date ON strong_stocks (fetch_date);
"#;

const INSERT_SQL: &str = r#"
INSERT INTO strong_stocks (
    fetch_date, stock_rank, code, name, change_percent, price, limit_up_price,
    turnover_amount, circulating_market_value, total_market_value, turnover_rate,
    rise_speed, is_new_high, volume_ratio, limit_up_statistics, selection_reason, industry
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
ON CONFLICT(fetch_date, code) DO UPDATE SET
    stock_rank = excluded.stock_rank,
    name = excluded.name,
    change_percent = excluded.change_percent,
    price = excluded.price,
    limit_up_price = excluded.limit_up_price,
    turnover_amount = excluded.turnover_amount,
    circulating_market_value = excluded.circulating_market_value,
    total_market_value = excluded.total_market_value,
    turnover_rate = excluded.turnover_rate,
    rise_speed = excluded.rise_speed,
    is_new_high = excluded.is_new_high,
    volume_ratio = excluded.volume_ratio,
    limit_up_statistics = excluded.limit_up_statistics,
    selection_reason = excluded.selection_reason,
    industry = excluded.industry
"#;

const SELECT_COLUMNS: &str = "fetch_date, stock_rank, code, name, change_percent, price, limit_up_price, \
    turnover_amount, circulating_market_value, total_market_value, turnover_rate, rise_speed, \
    is_new_high, volume_ratio, limit_up_statistics, selection_reason, industry";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("数据库错误: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub struct StrongStockStore {
    conn: Connection,
    schema_ready: bool,
}

impl StrongStockStore {
    /// 打开数据库文件，表结构在首次使用时创建
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
            schema_ready: false,
        })
    }

    /// 内存数据库（测试用）
    pub fn in_memory() -> StoreResult<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            schema_ready: false,
        })
    }

    fn ensure_schema(&mut self) -> StoreResult<()> {
        if !self.schema_ready {
            self.conn.execute_batch(CREATE_TABLE_SQL)?;
            self.schema_ready = true;
        }
        Ok(())
    }

    /// 替换写入某一天的数据
    ///
    /// 记录为空时不做任何写入（保留已有数据），返回 0。
    /// 否则在一个事务中删除该日期全部旧行并插入新行，返回该日期实际落库的行数。
    /// 同一批次内代码重复时保留最后一条，只计一行。
    pub fn save(&mut self, date: NaiveDate, records: &[StrongStockRecord]) -> StoreResult<usize> {
        if records.is_empty() {
            log::info!("没有需要存储的数据");
            return Ok(0);
        }
        self.ensure_schema()?;

        let date_str = format_date(date);
        let tx = self.conn.transaction()?;
        let deleted = tx.execute("DELETE FROM strong_stocks WHERE fetch_date = ?1", params![date_str])?;

        {
            let mut stmt = tx.prepare(INSERT_SQL)?;
            for r in records {
                stmt.execute(params![
                    date_str,
                    r.rank,
                    r.code,
                    r.name,
                    r.change_percent,
                    r.price,
                    r.limit_up_price,
                    r.turnover_amount,
                    r.circulating_market_value,
                    r.total_market_value,
                    r.turnover_rate,
                    r.rise_speed,
                    r.is_new_high,
                    r.volume_ratio,
                    r.limit_up_statistics,
                    r.selection_reason,
                    r.industry,
                ])?;
            }
        }
        let stored: i64 = tx.query_row(
            "SELECT COUNT(*) FROM strong_stocks WHERE fetch_date = ?1",
            params![date_str],
            |row| row.get(0),
        )?;
        tx.commit()?;

        log::info!(
            "{} 删除旧数据 {} 行，提交 {} 条，落库 {} 行",
            date_str,
            deleted,
            records.len(),
            stored
        );
        Ok(stored as usize)
    }

    /// 读取某一天的数据，按序号排序
    pub fn load(&mut self, date: NaiveDate) -> StoreResult<Vec<StrongStockRecord>> {
        self.ensure_schema()?;
        let sql = format!(
            "SELECT {} FROM strong_stocks WHERE fetch_date = ?1 ORDER BY stock_rank IS NULL, stock_rank, code",
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![format_date(date)], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn count(&mut self, date: NaiveDate) -> StoreResult<usize> {
        self.ensure_schema()?;
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM strong_stocks WHERE fetch_date = ?1",
            params![format_date(date)],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 已入库的日期及行数，最新在前
    pub fn list_dates(&mut self) -> StoreResult<Vec<StoredDate>> {
        self.ensure_schema()?;
        let mut stmt = self.conn.prepare(
            "SELECT fetch_date, COUNT(*) FROM strong_stocks GROUP BY fetch_date ORDER BY fetch_date DESC",
        )?;
        let dates = stmt
            .query_map([], |row| {
                Ok(StoredDate {
                    fetch_date: date_column(row, 0)?,
                    count: row.get::<_, i64>(1)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dates)
    }
}

/// fetch_date 以 YYYYMMDD 文本存储
fn date_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    parse_date(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn row_to_record(row: &Row) -> rusqlite::Result<StrongStockRecord> {
    Ok(StrongStockRecord {
        fetch_date: date_column(row, 0)?,
        rank: row.get(1)?,
        code: row.get(2)?,
        name: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        change_percent: row.get(4)?,
        price: row.get(5)?,
        limit_up_price: row.get(6)?,
        turnover_amount: row.get(7)?,
        circulating_market_value: row.get(8)?,
        total_market_value: row.get(9)?,
        turnover_rate: row.get(10)?,
        rise_speed: row.get(11)?,
        is_new_high: row.get(12)?,
        volume_ratio: row.get(13)?,
        limit_up_statistics: row.get(14)?,
        selection_reason: row.get(15)?,
        industry: row.get(16)?,
    })
}
