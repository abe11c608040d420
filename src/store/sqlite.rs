//! SQLite-backed anomaly store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};

use crate::market::types::EnrichedAnomaly;

use super::AnomalyStore;

/// Append-only anomaly log in a single SQLite table.
///
/// All writes go through one shared connection; WAL mode keeps readers
/// (the `review` binary, ad-hoc sqlite3 sessions) from blocking the
/// writer. Insert volume is a handful of rows per hour at worst, so a
/// mutex around the connection is plenty.
pub struct SqliteAnomalyStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAnomalyStore {
    /// Open (creating if needed) the database and ensure the schema.
    pub fn open(db_path: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS anomalies (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp       TEXT NOT NULL,
                symbol          TEXT NOT NULL,
                price           REAL NOT NULL,
                volume          REAL NOT NULL,
                z_score_price   REAL NOT NULL,
                z_score_volume  REAL NOT NULL,
                news_headline   TEXT NOT NULL,
                sentiment_score REAL NOT NULL
            )",
            [],
        )?;
        log::info!("anomaly store ready at {}", db_path);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl AnomalyStore for SqliteAnomalyStore {
    async fn record(
        &self,
        anomaly: &EnrichedAnomaly,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let event = &anomaly.event;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO anomalies (
                timestamp, symbol, price, volume,
                z_score_price, z_score_volume, news_headline, sentiment_score
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                event.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                event.symbol,
                event.price,
                event.volume,
                event.z_score_price,
                event.z_score_volume,
                anomaly.headline,
                anomaly.sentiment,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::AnomalyEvent;
    use chrono::TimeZone;
    use tempfile::NamedTempFile;

    fn make_anomaly(symbol: &str, price: f64) -> EnrichedAnomaly {
        EnrichedAnomaly {
            event: AnomalyEvent {
                symbol: symbol.to_string(),
                timestamp: chrono::Utc.with_ymd_and_hms(2024, 5, 1, 9, 15, 0).unwrap(),
                price,
                volume: 12.5,
                z_score_price: 4.2,
                z_score_volume: 3.9,
            },
            headline: "No recent news found.".to_string(),
            sentiment: 0.0,
        }
    }

    // Test: records append in order and come back field-for-field.
    #[tokio::test]
    async fn test_record_and_read_back() {
        let tmp = NamedTempFile::new().unwrap();
        let store = SqliteAnomalyStore::open(tmp.path().to_str().unwrap()).unwrap();

        store.record(&make_anomaly("BINANCE:BTCUSDT", 67000.0)).await.unwrap();
        store.record(&make_anomaly("BINANCE:ETHUSDT", 3100.0)).await.unwrap();

        let conn = store.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, timestamp, symbol, price, news_headline, sentiment_score
                 FROM anomalies ORDER BY id",
            )
            .unwrap();
        let rows: Vec<(i64, String, String, f64, String, f64)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, 1);
        assert_eq!(rows[0].1, "2024-05-01 09:15:00");
        assert_eq!(rows[0].2, "BINANCE:BTCUSDT");
        assert_eq!(rows[0].3, 67000.0);
        assert_eq!(rows[0].4, "No recent news found.");
        assert_eq!(rows[0].5, 0.0);
        assert_eq!(rows[1].0, 2);
        assert_eq!(rows[1].2, "BINANCE:ETHUSDT");
    }

    // Test: reopening an existing database keeps prior rows.
    #[tokio::test]
    async fn test_reopen_preserves_rows() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap().to_string();
        {
            let store = SqliteAnomalyStore::open(&path).unwrap();
            store.record(&make_anomaly("BINANCE:SOLUSDT", 145.0)).await.unwrap();
        }
        let store = SqliteAnomalyStore::open(&path).unwrap();
        store.record(&make_anomaly("BINANCE:SOLUSDT", 150.0)).await.unwrap();

        let conn = store.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM anomalies", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }
}
