//! Run the full pipeline against a synthetic random-walk feed.
//!
//! No external credentials needed: trades are generated locally with
//! occasional injected price/volume spikes, enrichment falls back to
//! placeholder headlines unless GNEWS_API_KEY is set, and anomalies land
//! in sim_anomalies.db for the `review` binary to inspect. Useful for
//! watching the detector behave without burning feed quota.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tokio::sync::{broadcast, mpsc};

use tickwatch::config::Config;
use tickwatch::enrich::{EnrichmentDispatcher, GnewsClient};
use tickwatch::store::SqliteAnomalyStore;
use tickwatch::stream::{StreamCoordinator, Transport, TransportError};

/// Per-symbol random walk state.
struct WalkState {
    symbol: String,
    price: f64,
    base_volume: f64,
}

/// Transport that fabricates trade frames instead of reading a socket.
struct SyntheticTransport {
    walks: Vec<WalkState>,
    rng: StdRng,
    tick_interval: Duration,
    spike_probability: f64,
}

impl SyntheticTransport {
    fn new(symbols: &[String]) -> Self {
        let walks = symbols
            .iter()
            .enumerate()
            .map(|(i, symbol)| WalkState {
                symbol: symbol.clone(),
                price: 100.0 * (i + 1) as f64,
                base_volume: 10.0,
            })
            .collect();
        Self {
            walks,
            rng: StdRng::from_entropy(),
            tick_interval: Duration::from_millis(25),
            spike_probability: 0.002,
        }
    }
}

#[async_trait]
impl Transport for SyntheticTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn subscribe(&mut self, symbol: &str) -> Result<(), TransportError> {
        log::debug!("synthetic subscribe: {}", symbol);
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<String>, TransportError> {
        tokio::time::sleep(self.tick_interval).await;

        let index = self.rng.gen_range(0..self.walks.len());
        let spike = self.rng.gen_bool(self.spike_probability);
        let walk = &mut self.walks[index];

        let drift: f64 = self.rng.gen_range(-0.001..0.001);
        walk.price *= 1.0 + drift;
        let mut price = walk.price;
        let mut volume = walk.base_volume * self.rng.gen_range(0.5..1.5);
        if spike {
            // Joint spike, strong enough to clear both thresholds once
            // the window has warmed up.
            price *= 1.05;
            volume *= 8.0;
            log::info!("injecting spike into {}", walk.symbol);
        }

        let frame = json!({
            "type": "trade",
            "data": [{
                "s": walk.symbol,
                "p": price,
                "v": volume,
                "t": chrono::Utc::now().timestamp_millis(),
            }]
        });
        Ok(Some(frame.to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    // NOTE: Workaround for rustls issue
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("Can't set crypto provider to aws_lc_rs");

    let config = Config {
        instruments: vec!["SIM:BTCUSDT".to_string(), "SIM:ETHUSDT".to_string()],
        db_path: "sim_anomalies.db".to_string(),
        reconnect_backoff_secs: 1.0,
        ..Config::default()
    };

    log::info!("🚀 Starting synthetic feed over {:?}", config.instruments);
    log::info!("   Anomalies will land in {}", config.db_path);

    let store = Arc::new(SqliteAnomalyStore::open(&config.db_path)?);
    let mut dispatcher = EnrichmentDispatcher::new(store)
        .with_news_timeout(config.news_timeout())
        .with_notify_timeout(config.notify_timeout())
        .with_max_in_flight(config.max_in_flight);
    if let Ok(key) = std::env::var("GNEWS_API_KEY") {
        dispatcher = dispatcher.with_news(Arc::new(GnewsClient::new(key)?));
        log::info!("   News enrichment: GNews");
    }

    let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
    let dispatcher_handle = tokio::spawn(dispatcher.run(event_rx));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let transport = SyntheticTransport::new(&config.instruments);
    let mut coordinator = StreamCoordinator::new(transport, &config, event_tx);
    let coordinator_handle = tokio::spawn(async move {
        coordinator.run(shutdown_rx).await;
    });

    log::info!("✅ Simulator running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    let _ = shutdown_tx.send(());
    let _ = coordinator_handle.await;
    let _ = dispatcher_handle.await;

    log::info!("simulator stopped");
    Ok(())
}
