//! Deterministic keyword classification.
//!
//! Rule-based category and sentiment detection used as the terminal
//! fallback for the AI classifier and as the forced mock mode. Total over
//! any input string: it never fails and always returns an in-domain result.

use regex::Regex;

use crate::error::Result;
use crate::models::{Category, ClassificationResult, Sentiment};

/// Sentinel model id identifying the keyword fallback path.
pub const KEYWORD_MODEL: &str = "keyword-fallback";

/// Fixed reasoning attached to keyword classifications.
pub const KEYWORD_REASONING: &str = "Deterministic classification based on keyword analysis";

/// Confidence floor for keyword classifications.
pub const CONFIDENCE_FLOOR: f64 = 0.50;

/// Confidence ceiling for keyword classifications.
pub const CONFIDENCE_CEILING: f64 = 0.95;

/// Number of keyword probes the confidence heuristic counts over.
const CONFIDENCE_PROBES: usize = 7;

/// Keyword-based category and sentiment classifier.
///
/// Category detection is first-match-wins in a fixed precedence order:
/// technical, commercial, billing, general, then `support` as the default.
/// Negative sentiment keywords are checked before positive ones; anything
/// else is neutral.
pub struct KeywordClassifier {
    technical: Regex,
    commercial: Regex,
    billing: Regex,
    general: Regex,
    negative: Regex,
    positive: Regex,
    /// Probes counted for the confidence heuristic, independent of which
    /// branch actually matched. 4 category probes + 3 sentiment/politeness
    /// probes; confidence is hits/7 clamped to [0.50, 0.95].
    probes: [Regex; CONFIDENCE_PROBES],
}

impl KeywordClassifier {
    /// Compile the keyword patterns.
    ///
    /// The patterns are constants, so this only fails if they are edited
    /// into something invalid.
    pub fn new() -> Result<Self> {
        Ok(Self {
            technical: Regex::new(
                r"(?i)\b(bug|error|crash|fail|broken|not working|doesn'?t work|system|software|application|database|server|login|export|import|upload|download)\b",
            )?,
            commercial: Regex::new(
                r"(?i)\b(price|cost|buy|purchase|plan|subscription|quote|pricing|enterprise|pro|premium)\b",
            )?,
            billing: Regex::new(
                r"(?i)\b(bill|invoice|payment|charge|refund|money|billing|account|subscription|cancel|renew)\b",
            )?,
            general: Regex::new(
                r"(?i)\b(help|support|question|how|what|when|where|why|assistance|guide|tutorial|manual)\b",
            )?,
            negative: Regex::new(
                r"(?i)\b(urgent|problem|issue|frustrated|furious|angry|disappointed|terrible|awful)\b",
            )?,
            positive: Regex::new(
                r"(?i)\b(thank|great|excellent|amazing|happy|pleased|awesome|love)\b",
            )?,
            probes: [
                Regex::new(r"(?i)\b(bug|error|crash|fail|broken|not working)\b")?,
                Regex::new(r"(?i)\b(price|cost|buy|purchase|plan)\b")?,
                Regex::new(r"(?i)\b(bill|invoice|payment|charge)\b")?,
                Regex::new(r"(?i)\b(help|support|question|how|what)\b")?,
                Regex::new(r"(?i)\b(urgent|problem|issue|frustrated|angry)\b")?,
                Regex::new(r"(?i)\b(thank|great|excellent|amazing|happy)\b")?,
                Regex::new(r"(?i)\b(please|could|would|can)\b")?,
            ],
        })
    }

    /// Classify a ticket description by keywords alone.
    ///
    /// Total over any string; empty or keyword-free input yields
    /// `support` / `neutral` at the confidence floor.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let category = self.detect_category(text);
        let sentiment = self.detect_sentiment(text);
        let confidence = self.confidence(text);

        tracing::debug!(
            category = %category,
            sentiment = %sentiment,
            confidence = confidence,
            "Keyword classification"
        );

        ClassificationResult {
            category,
            sentiment,
            confidence,
            reasoning: Some(KEYWORD_REASONING.to_string()),
            model: KEYWORD_MODEL.to_string(),
            provider: None,
            processing_time_ms: None,
        }
    }

    fn detect_category(&self, text: &str) -> Category {
        if self.technical.is_match(text) {
            Category::Technical
        } else if self.commercial.is_match(text) {
            Category::Commercial
        } else if self.billing.is_match(text) {
            Category::Billing
        } else if self.general.is_match(text) {
            Category::General
        } else {
            Category::Support
        }
    }

    fn detect_sentiment(&self, text: &str) -> Sentiment {
        if self.negative.is_match(text) {
            Sentiment::Negative
        } else if self.positive.is_match(text) {
            Sentiment::Positive
        } else {
            Sentiment::Neutral
        }
    }

    /// Confidence from overall keyword density rather than the branch taken.
    /// A simple heuristic, not a calibrated probability.
    fn confidence(&self, text: &str) -> f64 {
        let hits = self.probes.iter().filter(|p| p.is_match(text)).count();
        let raw = hits as f64 / CONFIDENCE_PROBES as f64;
        raw.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> KeywordClassifier {
        KeywordClassifier::new().expect("patterns should compile")
    }

    #[test]
    fn empty_text_yields_support_neutral_floor() {
        let result = classifier().classify("");

        assert_eq!(result.category, Category::Support);
        assert_eq!(result.sentiment, Sentiment::Neutral);
        assert!((result.confidence - CONFIDENCE_FLOOR).abs() < f64::EPSILON);
        assert_eq!(result.model, KEYWORD_MODEL);
        assert!(result.provider.is_none());
    }

    #[test]
    fn keyword_free_text_yields_defaults() {
        let result = classifier().classify("lorem ipsum dolor sit amet");

        assert_eq!(result.category, Category::Support);
        assert_eq!(result.sentiment, Sentiment::Neutral);
        assert!((result.confidence - CONFIDENCE_FLOOR).abs() < f64::EPSILON);
    }

    #[test]
    fn crash_and_fury_is_technical_negative() {
        let result = classifier().classify("This system crashes constantly, I am furious");

        assert_eq!(result.category, Category::Technical);
        assert_eq!(result.sentiment, Sentiment::Negative);
    }

    #[test]
    fn classification_is_repeatable() {
        let classifier = classifier();
        let text = "The login page shows an error and I am frustrated";

        let first = classifier.classify(text);
        let second = classifier.classify(text);

        assert_eq!(first, second);
    }

    #[test]
    fn technical_wins_over_later_groups() {
        // "bug" (technical) and "refund" (billing) both present; technical
        // has precedence.
        let result = classifier().classify("There is a bug in the refund flow");
        assert_eq!(result.category, Category::Technical);
    }

    #[test]
    fn commercial_detection() {
        let result = classifier().classify("What does the enterprise plan pricing look like");
        assert_eq!(result.category, Category::Commercial);
    }

    #[test]
    fn billing_detection() {
        let result = classifier().classify("My invoice shows a double charge");
        assert_eq!(result.category, Category::Billing);
    }

    #[test]
    fn general_detection() {
        let result = classifier().classify("Is there a tutorial for this feature");
        assert_eq!(result.category, Category::General);
    }

    #[test]
    fn negative_checked_before_positive() {
        let result = classifier().classify("Thank you but this is still a huge problem");
        assert_eq!(result.sentiment, Sentiment::Negative);
    }

    #[test]
    fn positive_detection() {
        let result = classifier().classify("Everything works, thank you for the excellent work");
        assert_eq!(result.sentiment, Sentiment::Positive);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let result = classifier().classify("URGENT: the SERVER is BROKEN");
        assert_eq!(result.category, Category::Technical);
        assert_eq!(result.sentiment, Sentiment::Negative);
    }

    #[test]
    fn confidence_reflects_keyword_density() {
        let classifier = classifier();

        // "server" classifies technical but hits no confidence probe, so
        // the raw score clamps up to the floor.
        let sparse = classifier.classify("the server");
        assert!((sparse.confidence - CONFIDENCE_FLOOR).abs() < f64::EPSILON);

        // Five probe hits: bug, bill, help, urgent, please.
        let dense = classifier.classify("urgent bug with my bill, please help");
        assert!((dense.confidence - 5.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn confidence_never_exceeds_ceiling() {
        // All seven probes hit.
        let text = "urgent bug: price charge on my bill, how can you help, thank you, please";
        let result = classifier().classify(text);

        assert!(result.confidence <= CONFIDENCE_CEILING);
    }
}
