//! SQLite-backed bar store.
//!
//! One wide table keyed by (date, symbol): raw OHLCV plus nullable
//! indicator columns, so enriched rows stay comparable across strategies.
//! `save` is an upsert implemented as delete-then-insert inside one
//! transaction, which makes repeated saves over overlapping ranges safe.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use common::{DailyBar, EnrichedBar, IndicatorSet, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS instrument_bars (
    date            TEXT NOT NULL,
    symbol          TEXT NOT NULL,
    open            REAL NOT NULL,
    high            REAL NOT NULL,
    low             REAL NOT NULL,
    close           REAL NOT NULL,
    volume          REAL NOT NULL,
    -- turtle
    atr             REAL,
    high_20         REAL,
    low_10          REAL,
    high_55         REAL,
    low_20          REAL,
    volume_20       REAL,
    volume_ratio    REAL,
    momentum_5d     REAL,
    momentum_20d    REAL,
    rsi             REAL,
    -- bnf
    sma_25          REAL,
    deviation_rate  REAL,
    -- coiled spring
    ema_20          REAL,
    sma_50          REAL,
    sma_100         REAL,
    sd_10           REAL,
    sd_60           REAL,
    vol_ma_10       REAL,
    vol_ma_60       REAL,
    high_60         REAL,
    low_60          REAL,
    range_pct_60    REAL,
    up_days_120     REAL,
    PRIMARY KEY (date, symbol)
);
CREATE INDEX IF NOT EXISTS idx_bars_symbol ON instrument_bars (symbol);
CREATE INDEX IF NOT EXISTS idx_bars_date ON instrument_bars (date);
"#;

const INSERT_SQL: &str = r#"
INSERT INTO instrument_bars (
    date, symbol, open, high, low, close, volume,
    atr, high_20, low_10, high_55, low_20, volume_20, volume_ratio,
    momentum_5d, momentum_20d, rsi,
    sma_25, deviation_rate,
    ema_20, sma_50, sma_100, sd_10, sd_60, vol_ma_10, vol_ma_60,
    high_60, low_60, range_pct_60, up_days_120
) VALUES (
    ?, ?, ?, ?, ?, ?, ?,
    ?, ?, ?, ?, ?, ?, ?,
    ?, ?, ?,
    ?, ?,
    ?, ?, ?, ?, ?, ?, ?,
    ?, ?, ?, ?
)
"#;

/// Summary counters exposed to the status surface.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreStats {
    pub record_count: i64,
    pub instrument_count: i64,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub size_bytes: i64,
}

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the database at `url` and apply the
    /// schema. In-memory databases get a single-connection pool so every
    /// query sees the same instance.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(&pool).await?;
        }

        info!(url, "bar store ready");
        Ok(Self { pool })
    }

    /// Upsert a batch of rows atomically. Any existing row with the same
    /// (date, symbol) key is deleted first, so the call is idempotent with
    /// respect to final state and the last write wins.
    pub async fn save(&self, bars: &[EnrichedBar]) -> Result<()> {
        if bars.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for row in bars {
            sqlx::query("DELETE FROM instrument_bars WHERE date = ? AND symbol = ?")
                .bind(row.bar.date)
                .bind(&row.bar.symbol)
                .execute(&mut *tx)
                .await?;

            let b = &row.bar;
            let i = &row.indicators;
            sqlx::query(INSERT_SQL)
                .bind(b.date)
                .bind(&b.symbol)
                .bind(b.open)
                .bind(b.high)
                .bind(b.low)
                .bind(b.close)
                .bind(b.volume)
                .bind(i.atr)
                .bind(i.high_20)
                .bind(i.low_10)
                .bind(i.high_55)
                .bind(i.low_20)
                .bind(i.volume_20)
                .bind(i.volume_ratio)
                .bind(i.momentum_5d)
                .bind(i.momentum_20d)
                .bind(i.rsi)
                .bind(i.sma_25)
                .bind(i.deviation_rate)
                .bind(i.ema_20)
                .bind(i.sma_50)
                .bind(i.sma_100)
                .bind(i.sd_10)
                .bind(i.sd_60)
                .bind(i.vol_ma_10)
                .bind(i.vol_ma_60)
                .bind(i.high_60)
                .bind(i.low_60)
                .bind(i.range_pct_60)
                .bind(i.up_days_120)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!(rows = bars.len(), "saved bars");
        Ok(())
    }

    /// Load rows, optionally filtered by symbol set and inclusive date
    /// bounds, ordered by (symbol, date) ascending.
    pub async fn load(
        &self,
        symbols: Option<&[String]>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<EnrichedBar>> {
        let mut sql = String::from("SELECT * FROM instrument_bars WHERE 1=1");
        if let Some(symbols) = symbols {
            if symbols.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; symbols.len()].join(",");
            sql.push_str(&format!(" AND symbol IN ({placeholders})"));
        }
        if start.is_some() {
            sql.push_str(" AND date >= ?");
        }
        if end.is_some() {
            sql.push_str(" AND date <= ?");
        }
        sql.push_str(" ORDER BY symbol, date");

        let mut query = sqlx::query(&sql);
        if let Some(symbols) = symbols {
            for symbol in symbols {
                query = query.bind(symbol);
            }
        }
        if let Some(start) = start {
            query = query.bind(start);
        }
        if let Some(end) = end {
            query = query.bind(end);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_enriched).collect()
    }

    /// Latest stored date, for one symbol or across the whole store.
    pub async fn latest_date(&self, symbol: Option<&str>) -> Result<Option<NaiveDate>> {
        let raw: Option<String> = match symbol {
            Some(symbol) => {
                sqlx::query_scalar("SELECT MAX(date) FROM instrument_bars WHERE symbol = ?")
                    .bind(symbol)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT MAX(date) FROM instrument_bars")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(raw.and_then(|s| parse_date(&s)))
    }

    /// Latest stored date per symbol, in one query. Symbols with no rows
    /// are simply absent from the map.
    pub async fn latest_dates(&self, symbols: &[String]) -> Result<HashMap<String, NaiveDate>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; symbols.len()].join(",");
        let sql = format!(
            "SELECT symbol, MAX(date) AS latest FROM instrument_bars \
             WHERE symbol IN ({placeholders}) GROUP BY symbol"
        );
        let mut query = sqlx::query(&sql);
        for symbol in symbols {
            query = query.bind(symbol);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut out = HashMap::with_capacity(rows.len());
        for row in rows {
            let symbol: String = row.try_get("symbol")?;
            let latest: Option<String> = row.try_get("latest")?;
            if let Some(date) = latest.as_deref().and_then(parse_date) {
                out.insert(symbol, date);
            }
        }
        Ok(out)
    }

    /// Delete rows older than `as_of - retain_days`. Compaction (VACUUM)
    /// runs only when something was actually deleted.
    pub async fn prune(&self, retain_days: i64, as_of: NaiveDate) -> Result<u64> {
        let cutoff = as_of - chrono::Duration::days(retain_days);
        let deleted = sqlx::query("DELETE FROM instrument_bars WHERE date < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted > 0 {
            info!(deleted, %cutoff, "pruned old bars, compacting");
            sqlx::query("VACUUM").execute(&self.pool).await?;
        }
        Ok(deleted)
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let record_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM instrument_bars")
            .fetch_one(&self.pool)
            .await?;
        let instrument_count: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT symbol) FROM instrument_bars")
                .fetch_one(&self.pool)
                .await?;

        let bounds: (Option<String>, Option<String>) =
            sqlx::query_as("SELECT MIN(date), MAX(date) FROM instrument_bars")
                .fetch_one(&self.pool)
                .await?;
        let date_range = match bounds {
            (Some(min), Some(max)) => parse_date(&min).zip(parse_date(&max)),
            _ => None,
        };

        let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await?;
        let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreStats {
            record_count,
            instrument_count,
            date_range,
            size_bytes: page_count * page_size,
        })
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    // Stored dates are ISO; tolerate a trailing time component from older
    // writers by taking the date part only.
    let date_part = s.split_whitespace().next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn row_to_enriched(row: &SqliteRow) -> Result<EnrichedBar> {
    let bar = DailyBar {
        symbol: row.try_get("symbol")?,
        date: row.try_get("date")?,
        open: row.try_get("open")?,
        high: row.try_get("high")?,
        low: row.try_get("low")?,
        close: row.try_get("close")?,
        volume: row.try_get("volume")?,
    };
    let indicators = IndicatorSet {
        atr: row.try_get("atr")?,
        high_20: row.try_get("high_20")?,
        low_10: row.try_get("low_10")?,
        high_55: row.try_get("high_55")?,
        low_20: row.try_get("low_20")?,
        volume_20: row.try_get("volume_20")?,
        volume_ratio: row.try_get("volume_ratio")?,
        momentum_5d: row.try_get("momentum_5d")?,
        momentum_20d: row.try_get("momentum_20d")?,
        rsi: row.try_get("rsi")?,
        sma_25: row.try_get("sma_25")?,
        deviation_rate: row.try_get("deviation_rate")?,
        ema_20: row.try_get("ema_20")?,
        sma_50: row.try_get("sma_50")?,
        sma_100: row.try_get("sma_100")?,
        sd_10: row.try_get("sd_10")?,
        sd_60: row.try_get("sd_60")?,
        vol_ma_10: row.try_get("vol_ma_10")?,
        vol_ma_60: row.try_get("vol_ma_60")?,
        high_60: row.try_get("high_60")?,
        low_60: row.try_get("low_60")?,
        range_pct_60: row.try_get("range_pct_60")?,
        up_days_120: row.try_get("up_days_120")?,
    };
    Ok(EnrichedBar { bar, indicators })
}
