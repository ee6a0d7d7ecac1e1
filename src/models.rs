//! Core data models for the triage engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TriageError;

/// Ticket category produced by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Technical,
    Commercial,
    Billing,
    General,
    Support,
}

impl Category {
    /// All valid categories, in classification precedence order.
    pub const ALL: [Category; 5] = [
        Category::Technical,
        Category::Commercial,
        Category::Billing,
        Category::General,
        Category::Support,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Technical => "technical",
            Category::Commercial => "commercial",
            Category::Billing => "billing",
            Category::General => "general",
            Category::Support => "support",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "technical" => Ok(Category::Technical),
            "commercial" => Ok(Category::Commercial),
            "billing" => Ok(Category::Billing),
            "general" => Ok(Category::General),
            "support" => Ok(Category::Support),
            other => Err(TriageError::Domain(format!("Unknown category: {other}"))),
        }
    }
}

/// Ticket sentiment produced by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// All valid sentiments.
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            other => Err(TriageError::Domain(format!("Unknown sentiment: {other}"))),
        }
    }
}

/// ITIL impact level, derived from the ticket category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Critical,
    High,
    Medium,
    Low,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::Critical => "critical",
            Impact::High => "high",
            Impact::Medium => "medium",
            Impact::Low => "low",
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ITIL urgency level, derived from the ticket sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::High => "high",
            Urgency::Medium => "medium",
            Urgency::Low => "low",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Combined Impact × Urgency priority, governing SLA hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Priority::Critical),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(TriageError::Domain(format!("Unknown priority: {other}"))),
        }
    }
}

/// A classification produced by the AI provider or the keyword fallback.
///
/// Immutable once produced. Category and sentiment are enum-typed, so any
/// instance that exists is in-domain; `is_valid` checks the confidence range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Category,
    pub sentiment: Sentiment,
    /// Confidence in [0.0, 1.0].
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
    /// Identifier of whichever classifier produced this result.
    pub model: String,
    /// Which external provider answered, if any.
    #[serde(default)]
    pub provider: Option<String>,
    /// Wall-clock duration of the call that produced this result.
    #[serde(default)]
    pub processing_time_ms: Option<u64>,
}

impl ClassificationResult {
    /// Check the confidence invariant: finite and in [0.0, 1.0].
    pub fn is_valid(&self) -> bool {
        self.confidence.is_finite() && (0.0..=1.0).contains(&self.confidence)
    }

    /// Band this result's confidence against the configured acceptance
    /// thresholds.
    pub fn confidence_band(&self, config: &crate::config::AiConfig) -> ConfidenceBand {
        ConfidenceBand::from_confidence(
            self.confidence,
            config.min_confidence,
            config.high_confidence,
        )
    }
}

/// Confidence band relative to the configured acceptance thresholds.
///
/// - High: confidence >= high threshold
/// - Medium: min threshold <= confidence < high threshold
/// - Low: confidence < min threshold (candidate for manual review)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    /// Classify a confidence score against the given thresholds.
    pub fn from_confidence(confidence: f64, min: f64, high: f64) -> Self {
        if confidence >= high {
            ConfidenceBand::High
        } else if confidence >= min {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }
}

/// Priority assessment derived from (category, sentiment).
///
/// Deterministic given the configured tables; same inputs always produce
/// the same outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityAssessment {
    pub priority: Priority,
    pub impact_level: Impact,
    pub urgency_level: Urgency,
}

/// Classification merged with a best-effort priority assessment.
///
/// The assessment is absent, not an error, when priority derivation failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationWithPriority {
    #[serde(flatten)]
    pub classification: ClassificationResult,
    #[serde(flatten)]
    pub assessment: Option<PriorityAssessment>,
}

impl ClassificationWithPriority {
    pub fn priority(&self) -> Option<Priority> {
        self.assessment.map(|a| a.priority)
    }
}

/// Ticket lifecycle status as seen by SLA evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Pending,
    Closed,
}

/// The slice of a ticket the SLA calculator needs.
///
/// Callers own persistence; the core only reads these fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TicketView {
    pub status: TicketStatus,
    pub sla_due_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

/// SLA health bucket for a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaState {
    NoSla,
    OnTrack,
    Warning,
    Critical,
    Breached,
    OnTime,
}

/// Full SLA evaluation for a ticket at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlaStatus {
    pub status: SlaState,
    pub breached: bool,
    /// Hours until the deadline, clamped to >= 0. None when no SLA applies.
    pub remaining_hours: Option<f64>,
    /// Share of the SLA window still remaining, in [0, 100].
    pub remaining_percentage: Option<f64>,
}

impl SlaStatus {
    pub(crate) fn no_sla() -> Self {
        Self {
            status: SlaState::NoSla,
            breached: false,
            remaining_hours: None,
            remaining_percentage: None,
        }
    }

    pub(crate) fn breached() -> Self {
        Self {
            status: SlaState::Breached,
            breached: true,
            remaining_hours: Some(0.0),
            remaining_percentage: Some(0.0),
        }
    }

    pub(crate) fn on_time() -> Self {
        Self {
            status: SlaState::OnTime,
            breached: false,
            remaining_hours: None,
            remaining_percentage: None,
        }
    }
}
