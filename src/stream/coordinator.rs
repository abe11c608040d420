//! Stream coordination: connection lifecycle, per-symbol routing, and the
//! hand-off to enrichment.
//!
//! The coordinator owns the transport and one detector per configured
//! instrument. Transport failures never kill the process: every failure
//! funnels into a fixed-backoff reconnect loop that runs until shutdown,
//! and the detector windows survive across reconnects so warmed-up
//! statistics are not thrown away with the socket.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use crate::config::Config;
use crate::market::detector::AnomalyDetector;
use crate::market::types::AnomalyEvent;

use super::transport::{parse_trade_update, Transport};

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Subscribing,
    Streaming,
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Subscribing => "subscribing",
            ConnectionState::Streaming => "streaming",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

/// Why a streaming session ended.
enum SessionEnd {
    Shutdown,
    Failed,
}

pub struct StreamCoordinator<T: Transport> {
    transport: T,
    detectors: HashMap<String, AnomalyDetector>,
    events: mpsc::Sender<AnomalyEvent>,
    reconnect_backoff: Duration,
    state: ConnectionState,
}

impl<T: Transport> StreamCoordinator<T> {
    pub fn new(transport: T, config: &Config, events: mpsc::Sender<AnomalyEvent>) -> Self {
        let detectors = config
            .instruments
            .iter()
            .map(|symbol| {
                (
                    symbol.clone(),
                    AnomalyDetector::new(
                        symbol.clone(),
                        config.window_size,
                        config.price_z_threshold,
                        config.volume_z_threshold,
                    ),
                )
            })
            .collect();
        Self {
            transport,
            detectors,
            events,
            reconnect_backoff: config.reconnect_backoff(),
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state != next {
            log::info!("connection {} -> {}", self.state.as_str(), next.as_str());
            self.state = next;
        }
    }

    /// Drive the stream until shutdown.
    ///
    /// Any transport failure (refused connect, dropped socket, server
    /// close) transitions to `Reconnecting`, waits the fixed backoff and
    /// tries again, forever. Availability wins over failing fast here: the
    /// service is expected to ride out feed outages of any length.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            match self.run_session(&mut shutdown).await {
                SessionEnd::Shutdown => {
                    self.set_state(ConnectionState::Disconnected);
                    log::info!("stream coordinator stopped");
                    return;
                }
                SessionEnd::Failed => {
                    self.set_state(ConnectionState::Reconnecting);
                    log::warn!(
                        "stream lost, reconnecting in {:.1}s",
                        self.reconnect_backoff.as_secs_f64()
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(self.reconnect_backoff) => {}
                        _ = shutdown.recv() => {
                            self.set_state(ConnectionState::Disconnected);
                            log::info!("stream coordinator stopped");
                            return;
                        }
                    }
                }
            }
        }
    }

    /// One connection: connect, subscribe every instrument, then stream
    /// until failure or shutdown.
    async fn run_session(&mut self, shutdown: &mut broadcast::Receiver<()>) -> SessionEnd {
        self.set_state(ConnectionState::Subscribing);
        if let Err(e) = self.transport.connect().await {
            log::warn!("connect failed: {}", e);
            return SessionEnd::Failed;
        }
        for symbol in self.detectors.keys() {
            match self.transport.subscribe(symbol).await {
                Ok(()) => log::info!("subscribed to {}", symbol),
                Err(e) => {
                    log::warn!("subscribe to {} failed: {}", symbol, e);
                    return SessionEnd::Failed;
                }
            }
        }
        self.set_state(ConnectionState::Streaming);

        loop {
            tokio::select! {
                _ = shutdown.recv() => return SessionEnd::Shutdown,
                message = self.transport.next_message() => {
                    match message {
                        Ok(Some(raw)) => self.handle_frame(&raw).await,
                        Ok(None) => {
                            log::warn!("feed ended the stream");
                            return SessionEnd::Failed;
                        }
                        Err(e) => {
                            log::warn!("transport error: {}", e);
                            return SessionEnd::Failed;
                        }
                    }
                }
            }
        }
    }

    /// Parse one raw frame, route it to its detector, and hand any anomaly
    /// to the enrichment channel.
    ///
    /// Malformed frames are logged and skipped; they are a data problem,
    /// not a connection problem, and must not trigger reconnection.
    async fn handle_frame(&mut self, raw: &str) {
        let update = match parse_trade_update(raw) {
            Ok(Some(update)) => update,
            Ok(None) => return,
            Err(e) => {
                log::warn!("dropping malformed feed frame: {}", e);
                return;
            }
        };
        let Some(detector) = self.detectors.get_mut(&update.symbol) else {
            // Not in the configured instrument set.
            log::debug!("ignoring trade for unsubscribed symbol {}", update.symbol);
            return;
        };
        let sample = update.sample;
        let event = detector.observe(&sample);
        if detector.is_warm() {
            let (z_price, z_volume) = detector.zscores_for(&sample);
            log::info!(
                "[{}] {} price {:.2} (z {:+.2}) | volume {:.4} (z {:+.2})",
                sample.timestamp.format("%H:%M:%S"),
                update.symbol,
                sample.price,
                z_price,
                sample.volume,
                z_volume
            );
        }
        if let Some(event) = event {
            log::warn!(
                "!!! anomaly: {} price {:.2} (z {:+.2}) volume {:.4} (z {:+.2})",
                event.symbol,
                event.price,
                event.z_score_price,
                event.volume,
                event.z_score_volume
            );
            // Detection must not wait on enrichment; the bounded channel
            // only pushes back if the dispatcher is saturated.
            if self.events.send(event).await.is_err() {
                log::error!("enrichment channel closed, anomaly dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::replay::{ReplayConnection, ReplayOutcome, ReplayTransport};

    fn trade_frame(symbol: &str, price: f64, volume: f64, ts_ms: i64) -> String {
        format!(
            r#"{{"type":"trade","data":[{{"s":"{}","p":{},"v":{},"t":{}}}]}}"#,
            symbol, price, volume, ts_ms
        )
    }

    fn test_config(instruments: Vec<&str>, window_size: usize) -> Config {
        Config {
            instruments: instruments.into_iter().map(String::from).collect(),
            window_size,
            reconnect_backoff_secs: 0.01,
            ..Config::default()
        }
    }

    /// Run a coordinator over `transport` for up to `deadline`, collecting
    /// every emitted anomaly, then shut it down.
    async fn collect_events(
        transport: ReplayTransport,
        config: Config,
        deadline: Duration,
    ) -> Vec<AnomalyEvent> {
        let (event_tx, mut event_rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let mut coordinator = StreamCoordinator::new(transport, &config, event_tx);
        let runner = tokio::spawn(async move { coordinator.run(shutdown_rx).await });

        let mut events = Vec::new();
        let collect = async {
            while let Some(event) = event_rx.recv().await {
                events.push(event);
            }
        };
        let _ = tokio::time::timeout(deadline, collect).await;
        let _ = shutdown_tx.send(());
        let _ = runner.await;
        events
    }

    // Test: pings, malformed frames and unknown symbols are all skipped
    // without reconnecting, while valid trades still flow.
    #[tokio::test]
    async fn test_bad_frames_skipped_without_reconnect() {
        let frames = vec![
            r#"{"type":"ping"}"#.to_string(),
            "garbage".to_string(),
            r#"{"type":"trade"}"#.to_string(),
            trade_frame("BINANCE:DOGEUSDT", 1.0, 1.0, 1714500000000),
            trade_frame("BINANCE:BTCUSDT", 100.0, 10.0, 1714500000100),
            trade_frame("BINANCE:BTCUSDT", 100.1, 10.1, 1714500000200),
        ];
        let transport = ReplayTransport::single(frames, ReplayOutcome::EndOfStream);
        let probe = transport.probe();
        let config = test_config(vec!["BINANCE:BTCUSDT"], 2);

        let events = collect_events(transport, config, Duration::from_millis(200)).await;

        // Two valid in-set trades, neither anomalous.
        assert!(events.is_empty());
        // The bad frames never tore the session down mid-script: the first
        // connection served all six frames before the clean end.
        assert_eq!(probe.subscriptions()[0], "BINANCE:BTCUSDT");
        assert!(probe.connect_count() >= 1);
    }

    // Test: every configured instrument is subscribed on each connection.
    #[tokio::test]
    async fn test_subscribes_all_instruments() {
        let transport = ReplayTransport::single(Vec::new(), ReplayOutcome::EndOfStream);
        let probe = transport.probe();
        let config = test_config(vec!["BINANCE:BTCUSDT", "BINANCE:ETHUSDT"], 5);

        collect_events(transport, config, Duration::from_millis(100)).await;

        let mut first_connection: Vec<String> = probe.subscriptions().into_iter().take(2).collect();
        first_connection.sort();
        assert_eq!(first_connection, vec!["BINANCE:BTCUSDT", "BINANCE:ETHUSDT"]);
    }

    // Test: after a failed connect the coordinator waits out exactly the
    // configured backoff before trying again (virtual time, so the 5s
    // default costs nothing).
    #[tokio::test(start_paused = true)]
    async fn test_backoff_waited_before_reconnect() {
        let transport = ReplayTransport::new(vec![
            ReplayConnection::new(Vec::new(), ReplayOutcome::Fail("dropped".to_string())),
            ReplayConnection::new(Vec::new(), ReplayOutcome::EndOfStream),
        ]);
        let probe = transport.probe();
        let mut config = test_config(vec!["BINANCE:BTCUSDT"], 5);
        config.reconnect_backoff_secs = 5.0;

        let (event_tx, _event_rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let mut coordinator = StreamCoordinator::new(transport, &config, event_tx);
        let runner = tokio::spawn(async move { coordinator.run(shutdown_rx).await });

        let start = tokio::time::Instant::now();
        while probe.connect_count() < 2 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5), "reconnected too early: {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(6), "waited more than one backoff: {:?}", elapsed);

        let _ = shutdown_tx.send(());
        let _ = runner.await;
    }

    // Test: a window filled on one connection detects a spike delivered on
    // the next; reconnection does not reset detector state.
    #[tokio::test]
    async fn test_windows_survive_reconnect() {
        let window_size = 20;
        let mut warmup = Vec::new();
        for i in 0..window_size - 1 {
            let wiggle = (i % 2) as f64 * 0.2;
            warmup.push(trade_frame(
                "BINANCE:BTCUSDT",
                100.0 + wiggle,
                10.0 + wiggle,
                1714500000000 + i as i64 * 100,
            ));
        }
        let spike = trade_frame("BINANCE:BTCUSDT", 150.0, 50.0, 1714500002000);
        let transport = ReplayTransport::new(vec![
            ReplayConnection::new(warmup, ReplayOutcome::Fail("socket reset".to_string())),
            ReplayConnection::new(vec![spike], ReplayOutcome::EndOfStream),
        ]);
        let probe = transport.probe();
        let config = test_config(vec!["BINANCE:BTCUSDT"], window_size);

        let events = collect_events(transport, config, Duration::from_millis(500)).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].price, 150.0);
        assert!(probe.connect_count() >= 2);
        // Both sessions issued the subscription.
        assert!(probe.subscriptions().len() >= 2);
    }
}
