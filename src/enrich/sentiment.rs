//! Lexicon-based headline sentiment scoring.
//!
//! A small weighted word list tuned for market headlines, with single-step
//! negation ("not bullish" flips to negative). Scores are averaged over
//! the matched words and clamped to [-1, 1]. No network calls, no model
//! downloads, same score for the same headline every time.

use std::collections::HashMap;

/// Words that invert the polarity of the next matched word.
const NEGATIONS: &[&str] = &["not", "no", "never", "isn't", "wasn't", "won't", "doesn't"];

/// Coarse classification of a continuous score, for logs and alert text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Classify with a +/-0.1 neutral band around zero.
    pub fn from_score(score: f64) -> Self {
        if score > 0.1 {
            SentimentLabel::Positive
        } else if score < -0.1 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

pub struct SentimentScorer {
    weights: HashMap<&'static str, f64>,
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer {
    pub fn new() -> Self {
        let mut weights = HashMap::new();
        let entries: &[(&'static str, f64)] = &[
            // Bullish vocabulary.
            ("surge", 0.7),
            ("surges", 0.7),
            ("surged", 0.7),
            ("soar", 0.8),
            ("soars", 0.8),
            ("soared", 0.8),
            ("rally", 0.6),
            ("rallies", 0.6),
            ("rallied", 0.6),
            ("jump", 0.5),
            ("jumps", 0.5),
            ("jumped", 0.5),
            ("gain", 0.4),
            ("gains", 0.4),
            ("gained", 0.4),
            ("record", 0.5),
            ("high", 0.3),
            ("bullish", 0.7),
            ("boom", 0.6),
            ("breakout", 0.5),
            ("adoption", 0.4),
            ("approval", 0.5),
            ("approved", 0.5),
            ("strong", 0.4),
            ("growth", 0.4),
            ("win", 0.4),
            ("wins", 0.4),
            ("optimism", 0.5),
            ("recovery", 0.4),
            ("rebound", 0.4),
            ("rebounds", 0.4),
            // Bearish vocabulary.
            ("crash", -0.9),
            ("crashes", -0.9),
            ("crashed", -0.9),
            ("plunge", -0.8),
            ("plunges", -0.8),
            ("plunged", -0.8),
            ("plummet", -0.8),
            ("plummets", -0.8),
            ("tumble", -0.6),
            ("tumbles", -0.6),
            ("slump", -0.6),
            ("slumps", -0.6),
            ("drop", -0.4),
            ("drops", -0.4),
            ("dropped", -0.4),
            ("fall", -0.4),
            ("falls", -0.4),
            ("fell", -0.4),
            ("low", -0.3),
            ("bearish", -0.7),
            ("fear", -0.6),
            ("panic", -0.8),
            ("selloff", -0.7),
            ("liquidation", -0.6),
            ("liquidations", -0.6),
            ("hack", -0.8),
            ("hacked", -0.8),
            ("fraud", -0.8),
            ("lawsuit", -0.5),
            ("ban", -0.6),
            ("banned", -0.6),
            ("crackdown", -0.6),
            ("weak", -0.4),
            ("loss", -0.4),
            ("losses", -0.4),
            ("warning", -0.4),
            ("collapse", -0.9),
            ("collapsed", -0.9),
        ];
        for (word, weight) in entries {
            weights.insert(*word, *weight);
        }
        Self { weights }
    }

    /// Polarity of `text` in [-1, 1]; 0.0 when no lexicon word matches.
    pub fn score(&self, text: &str) -> f64 {
        let mut matched: Vec<f64> = Vec::new();
        let mut negate_next = false;
        for raw in text.split_whitespace() {
            let word: String = raw
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_lowercase();
            if word.is_empty() {
                continue;
            }
            if NEGATIONS.contains(&word.as_str()) {
                negate_next = true;
                continue;
            }
            if let Some(weight) = self.weights.get(word.as_str()) {
                matched.push(if negate_next { -weight } else { *weight });
            }
            negate_next = false;
        }
        if matched.is_empty() {
            return 0.0;
        }
        let average = matched.iter().sum::<f64>() / matched.len() as f64;
        average.clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test: clearly bullish and bearish headlines land on the right side.
    #[test]
    fn test_score_polarity() {
        let scorer = SentimentScorer::new();
        assert!(scorer.score("Bitcoin surges to record high on ETF approval") > 0.1);
        assert!(scorer.score("Exchange hacked, market crashes amid panic selling") < -0.1);
    }

    // Test: a headline with no lexicon word scores exactly zero.
    #[test]
    fn test_score_no_matches() {
        let scorer = SentimentScorer::new();
        assert_eq!(scorer.score("Quarterly derivatives settlement calendar published"), 0.0);
        assert_eq!(scorer.score(""), 0.0);
    }

    // Test: negation flips the following word.
    #[test]
    fn test_score_negation() {
        let scorer = SentimentScorer::new();
        let plain = scorer.score("Analysts bullish on ether");
        let negated = scorer.score("Analysts not bullish on ether");
        assert!(plain > 0.0);
        assert!(negated < 0.0);
        assert_eq!(plain, -negated);
    }

    // Test: punctuation and case are ignored.
    #[test]
    fn test_score_normalization() {
        let scorer = SentimentScorer::new();
        assert!(scorer.score("CRASH!") < 0.0);
        assert_eq!(scorer.score("Crash."), scorer.score("crash"));
    }

    // Test: the average stays inside [-1, 1].
    #[test]
    fn test_score_bounds() {
        let scorer = SentimentScorer::new();
        let score = scorer.score("crash plunge collapse panic selloff");
        assert!((-1.0..=1.0).contains(&score));
        assert!(score < -0.5);
    }

    // Test: the label bands; exactly 0.1 is still neutral.
    #[test]
    fn test_label_bands() {
        assert_eq!(SentimentLabel::from_score(0.5), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(-0.5), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_score(0.0), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(0.1), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(-0.1), SentimentLabel::Neutral);
    }
}
