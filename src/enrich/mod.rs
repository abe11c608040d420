//! Anomaly enrichment: news lookup, sentiment scoring, and the dispatch
//! pipeline that persists and alerts.

pub mod dispatcher;
pub mod news;
pub mod sentiment;

pub use dispatcher::{
    normalize_symbol, EnrichmentDispatcher, NEWS_FAILED_HEADLINE, NO_NEWS_HEADLINE,
};
pub use news::{GnewsClient, NewsLookup};
pub use sentiment::{SentimentLabel, SentimentScorer};
