//! ITIL priority derivation.
//!
//! Pure lookups over the configured category→impact and sentiment→urgency
//! maps and the Impact × Urgency matrix. No hidden state: the same inputs
//! always produce the same assessment.

use std::sync::Arc;

use crate::config::PriorityConfig;
use crate::error::{Result, TriageError};
use crate::models::{Category, Impact, Priority, PriorityAssessment, Sentiment, Urgency};

/// Calculator for impact, urgency and priority.
#[derive(Clone)]
pub struct PriorityCalculator {
    config: Arc<PriorityConfig>,
}

impl PriorityCalculator {
    pub fn new(config: Arc<PriorityConfig>) -> Self {
        Self { config }
    }

    /// Look up the impact level for a category.
    ///
    /// Errors only when the configured table has no entry for the category,
    /// which is a configuration defect rather than bad input.
    pub fn impact_of(&self, category: Category) -> Result<Impact> {
        let impact = self
            .config
            .category_to_impact
            .get(&category)
            .copied()
            .ok_or_else(|| {
                tracing::warn!(category = %category, "No impact mapping for category");
                TriageError::Domain(format!("Unknown category: {category}"))
            })?;

        tracing::info!(category = %category, impact = %impact, "Calculated impact from category");
        Ok(impact)
    }

    /// Look up the urgency level for a sentiment.
    pub fn urgency_of(&self, sentiment: Sentiment) -> Result<Urgency> {
        let urgency = self
            .config
            .sentiment_to_urgency
            .get(&sentiment)
            .copied()
            .ok_or_else(|| {
                tracing::warn!(sentiment = %sentiment, "No urgency mapping for sentiment");
                TriageError::Domain(format!("Unknown sentiment: {sentiment}"))
            })?;

        tracing::info!(sentiment = %sentiment, urgency = %urgency, "Calculated urgency from sentiment");
        Ok(urgency)
    }

    /// Resolve the Impact × Urgency matrix.
    ///
    /// A missing row and a missing cell are reported distinctly so a
    /// truncated matrix in configuration is easy to pinpoint.
    pub fn priority_of(&self, impact: Impact, urgency: Urgency) -> Result<Priority> {
        let row = self.config.matrix.get(&impact).ok_or_else(|| {
            tracing::error!(impact = %impact, "Priority matrix has no row for impact");
            TriageError::Domain(format!("Invalid impact level: {impact}"))
        })?;

        let priority = row.get(&urgency).copied().ok_or_else(|| {
            tracing::error!(
                impact = %impact,
                urgency = %urgency,
                "Invalid Impact x Urgency combination"
            );
            TriageError::Domain(format!(
                "Invalid Impact x Urgency combination: {impact} x {urgency}"
            ))
        })?;

        tracing::info!(
            impact = %impact,
            urgency = %urgency,
            priority = %priority,
            "Calculated priority from Impact x Urgency matrix"
        );
        Ok(priority)
    }

    /// Derive a complete assessment from (category, sentiment).
    ///
    /// Any lookup failure propagates; there is no silent defaulting here.
    /// Callers that prefer degraded output over errors catch this in the
    /// pipeline.
    pub fn assess(&self, category: Category, sentiment: Sentiment) -> Result<PriorityAssessment> {
        let impact = self.impact_of(category)?;
        let urgency = self.urgency_of(sentiment)?;
        let priority = self.priority_of(impact, urgency)?;

        Ok(PriorityAssessment {
            priority,
            impact_level: impact,
            urgency_level: urgency,
        })
    }

    /// Check that a priority has an SLA entry in the configured tables.
    pub fn validate_priority(&self, priority: Priority) -> Result<()> {
        if self.config.sla_hours.contains_key(&priority) {
            Ok(())
        } else {
            Err(TriageError::Domain(format!(
                "Invalid priority level: {priority}"
            )))
        }
    }
}
