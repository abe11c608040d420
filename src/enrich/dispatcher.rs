//! Anomaly enrichment and side-effect fan-out.
//!
//! The dispatcher drains the coordinator's anomaly channel and runs each
//! event through enrich -> persist -> notify on its own task, bounded by a
//! semaphore so a slow news API cannot pile up unbounded work. Detection
//! latency is therefore independent of enrichment latency.
//!
//! Failure isolation is the rule at every step: a failed news lookup
//! downgrades to placeholder text, a failed insert is logged, a failed
//! alert channel never touches its siblings. An anomaly is dropped only
//! if the whole process dies.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::timeout;

use crate::market::types::{round2, AnomalyEvent, EnrichedAnomaly};
use crate::notify::Notifier;
use crate::store::AnomalyStore;

use super::news::NewsLookup;
use super::sentiment::{SentimentLabel, SentimentScorer};

/// Headline when the search ran but matched nothing, or no news API is
/// configured at all.
pub const NO_NEWS_HEADLINE: &str = "No recent news found.";
/// Headline when the search failed or timed out.
pub const NEWS_FAILED_HEADLINE: &str = "News fetch failed.";

pub struct EnrichmentDispatcher {
    news: Option<Arc<dyn NewsLookup>>,
    scorer: SentimentScorer,
    store: Arc<dyn AnomalyStore>,
    notifiers: Vec<Arc<dyn Notifier>>,
    news_timeout: Duration,
    notify_timeout: Duration,
    max_in_flight: usize,
}

impl EnrichmentDispatcher {
    pub fn new(store: Arc<dyn AnomalyStore>) -> Self {
        Self {
            news: None,
            scorer: SentimentScorer::new(),
            store,
            notifiers: Vec::new(),
            news_timeout: Duration::from_secs(5),
            notify_timeout: Duration::from_secs(10),
            max_in_flight: 8,
        }
    }

    pub fn with_news(mut self, news: Arc<dyn NewsLookup>) -> Self {
        self.news = Some(news);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn with_news_timeout(mut self, news_timeout: Duration) -> Self {
        self.news_timeout = news_timeout;
        self
    }

    pub fn with_notify_timeout(mut self, notify_timeout: Duration) -> Self {
        self.notify_timeout = notify_timeout;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Drain the anomaly channel until every sender is gone, then wait for
    /// in-flight work to finish before returning.
    pub async fn run(self, mut events: mpsc::Receiver<AnomalyEvent>) {
        let limiter = Arc::new(Semaphore::new(self.max_in_flight));
        let dispatcher = Arc::new(self);
        let mut tasks = JoinSet::new();

        while let Some(event) = events.recv().await {
            // Reap whatever already finished so the set stays small.
            while tasks.try_join_next().is_some() {}

            let Ok(permit) = limiter.clone().acquire_owned().await else {
                break;
            };
            let dispatcher = dispatcher.clone();
            tasks.spawn(async move {
                dispatcher.process(event).await;
                drop(permit);
            });
        }

        while tasks.join_next().await.is_some() {}
        log::info!("enrichment dispatcher stopped");
    }

    async fn process(&self, event: AnomalyEvent) {
        let enriched = self.enrich(event).await;
        let label = SentimentLabel::from_score(enriched.sentiment);
        log::info!(
            "news for {}: \"{}\" ({} {:+.2})",
            enriched.event.symbol,
            enriched.headline,
            label.as_str(),
            enriched.sentiment
        );

        // Persist before alerting: the record must not depend on any
        // alert channel being healthy.
        if let Err(e) = self.store.record(&enriched).await {
            log::error!("failed to persist anomaly for {}: {}", enriched.event.symbol, e);
        }

        self.notify_all(&enriched).await;
    }

    /// Attach headline and sentiment, substituting placeholder text on any
    /// lookup failure. Enrichment trouble must never suppress an anomaly.
    async fn enrich(&self, event: AnomalyEvent) -> EnrichedAnomaly {
        let (headline, sentiment) = match &self.news {
            Some(news) => {
                let query = normalize_symbol(&event.symbol);
                match timeout(self.news_timeout, news.top_headline(&query)).await {
                    Ok(Ok(Some(headline))) => {
                        let score = round2(self.scorer.score(&headline));
                        (headline, score)
                    }
                    Ok(Ok(None)) => (NO_NEWS_HEADLINE.to_string(), 0.0),
                    Ok(Err(e)) => {
                        log::warn!("news lookup failed for {}: {}", event.symbol, e);
                        (NEWS_FAILED_HEADLINE.to_string(), 0.0)
                    }
                    Err(_) => {
                        log::warn!("news lookup timed out for {}", event.symbol);
                        (NEWS_FAILED_HEADLINE.to_string(), 0.0)
                    }
                }
            }
            None => (NO_NEWS_HEADLINE.to_string(), 0.0),
        };
        EnrichedAnomaly {
            event,
            headline,
            sentiment,
        }
    }

    /// Fan out to every configured channel concurrently. Failures are
    /// logged per channel and never block or cancel the siblings.
    async fn notify_all(&self, enriched: &EnrichedAnomaly) {
        if self.notifiers.is_empty() {
            return;
        }
        let subject = format!("Trade anomaly: {}", enriched.event.symbol);
        let body = alert_body(enriched);
        let sends = self.notifiers.iter().map(|notifier| {
            let notifier = notifier.clone();
            let subject = subject.clone();
            let body = body.clone();
            let notify_timeout = self.notify_timeout;
            async move {
                match timeout(notify_timeout, notifier.send(&subject, &body)).await {
                    Ok(Ok(())) => log::info!("{} alert sent", notifier.channel()),
                    Ok(Err(e)) => log::warn!("{} alert failed: {}", notifier.channel(), e),
                    Err(_) => log::warn!("{} alert timed out", notifier.channel()),
                }
            }
        });
        futures_util::future::join_all(sends).await;
    }
}

/// Reduce an instrument symbol to a news-searchable term: drop the venue
/// prefix, strip one known quote-currency suffix, lower-case the rest.
/// `BINANCE:BTCUSDT` becomes `btc`.
pub fn normalize_symbol(symbol: &str) -> String {
    let base = symbol.rsplit(':').next().unwrap_or(symbol);
    let mut term = base.to_ascii_uppercase();
    // Longest suffix first so USDT is not mistaken for USD + T.
    for quote in ["USDT", "USDC", "BUSD", "USD"] {
        if term.len() > quote.len() && term.ends_with(quote) {
            term.truncate(term.len() - quote.len());
            break;
        }
    }
    term.to_ascii_lowercase()
}

/// Multi-line alert text shared by every notification channel.
fn alert_body(enriched: &EnrichedAnomaly) -> String {
    let event = &enriched.event;
    format!(
        "Anomaly detected for {} at {}!\n\
         Price: {:.2} (z {:+.2})\n\
         Volume: {:.4} (z {:+.2})\n\
         News: {} (sentiment {:+.2})",
        event.symbol,
        event.timestamp.format("%H:%M:%S"),
        event.price,
        event.z_score_price,
        event.volume,
        event.z_score_volume,
        enriched.headline,
        enriched.sentiment
    )
}
