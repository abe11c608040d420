//! Dump persisted anomalies, newest first.
//!
//! Companion tool for the main service: reads the anomalies table the
//! dispatcher writes and prints one line per record. Uses the same
//! DB_PATH variable as the service so `.env` points both at one file.

use rusqlite::Connection;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let db_path = std::env::var("DB_PATH").unwrap_or_else(|_| "anomalies.db".to_string());

    let conn = Connection::open(&db_path)?;
    let mut stmt = conn.prepare(
        "SELECT id, timestamp, symbol, price, volume,
                z_score_price, z_score_volume, news_headline, sentiment_score
         FROM anomalies ORDER BY timestamp DESC, id DESC",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, f64>(4)?,
            row.get::<_, f64>(5)?,
            row.get::<_, f64>(6)?,
            row.get::<_, String>(7)?,
            row.get::<_, f64>(8)?,
        ))
    })?;

    println!("=== Anomaly log ({}) ===", db_path);
    let mut count = 0usize;
    for row in rows {
        let (id, timestamp, symbol, price, volume, z_price, z_volume, headline, sentiment) = row?;
        println!(
            "#{:<4} [{}] {:<18} price {:>12.2} (z {:+.2})  volume {:>12.4} (z {:+.2})",
            id, timestamp, symbol, price, z_price, volume, z_volume
        );
        println!("      news: {} (sentiment {:+.2})", headline, sentiment);
        count += 1;
    }
    if count == 0 {
        println!("(no anomalies recorded yet)");
    } else {
        println!("{} record(s)", count);
    }
    Ok(())
}
