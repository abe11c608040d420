use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use tickwatch::config::Config;
use tickwatch::enrich::{EnrichmentDispatcher, GnewsClient};
use tickwatch::notify::{Notifier, SendgridNotifier, TwilioNotifier};
use tickwatch::store::SqliteAnomalyStore;
use tickwatch::stream::{FinnhubTransport, StreamCoordinator};

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

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ {}", e);
            return Err(e.into());
        }
    };

    log::info!("🚀 Starting tickwatch...");
    log::info!("📊 Configuration:");
    log::info!("   Instruments: {}", config.instruments.join(", "));
    log::info!(
        "   Window: {} samples, thresholds |z_price| > {}, |z_volume| > {}",
        config.window_size,
        config.price_z_threshold,
        config.volume_z_threshold
    );
    log::info!("   Reconnect backoff: {}s", config.reconnect_backoff_secs);
    log::info!("   Database: {}", config.db_path);

    let store = Arc::new(SqliteAnomalyStore::open(&config.db_path)?);

    let mut dispatcher = EnrichmentDispatcher::new(store)
        .with_news_timeout(config.news_timeout())
        .with_notify_timeout(config.notify_timeout())
        .with_max_in_flight(config.max_in_flight);

    match &config.gnews_api_key {
        Some(key) => {
            dispatcher = dispatcher.with_news(Arc::new(GnewsClient::new(key.clone())?));
            log::info!("   News enrichment: GNews");
        }
        None => {
            log::warn!("   News enrichment: disabled (GNEWS_API_KEY not set), using placeholders")
        }
    }

    match &config.email {
        Some(email) => {
            let notifier: Arc<dyn Notifier> = Arc::new(SendgridNotifier::new(email.clone())?);
            dispatcher = dispatcher.with_notifier(notifier);
            log::info!("   Email alerts: {}", email.recipient);
        }
        None => log::info!("   Email alerts: disabled"),
    }

    match &config.sms {
        Some(sms) => {
            let notifier: Arc<dyn Notifier> = Arc::new(TwilioNotifier::new(sms.clone())?);
            dispatcher = dispatcher.with_notifier(notifier);
            log::info!("   SMS alerts: {}", sms.to_number);
        }
        None => log::info!("   SMS alerts: disabled"),
    }

    // Bounded hand-off between detection and enrichment (backpressure
    // instead of unbounded queueing if the news API stalls).
    let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
    let dispatcher_handle = tokio::spawn(dispatcher.run(event_rx));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let transport = FinnhubTransport::new(&config.finnhub_api_key);
    let mut coordinator = StreamCoordinator::new(transport, &config, event_tx);
    let coordinator_handle = tokio::spawn(async move {
        coordinator.run(shutdown_rx).await;
    });

    log::info!("✅ Pipeline running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    log::info!("Shutdown requested, draining in-flight work...");
    let _ = shutdown_tx.send(());

    // Coordinator exits first and drops its event sender; the dispatcher
    // then drains the channel and finishes whatever enrichment is running.
    let _ = coordinator_handle.await;
    let _ = dispatcher_handle.await;

    log::info!("tickwatch stopped");
    Ok(())
}
