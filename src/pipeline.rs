//! Classification pipeline orchestration.
//!
//! Composes the AI classifier and the priority calculator into the
//! classify-with-priority operation used by ticket create/update flows.
//! Its single job is making sure classification or priority failures never
//! block the caller's primary write: degraded data beats blocked data.

use std::sync::Arc;

use crate::classifier::AiClassifier;
use crate::config::TriageConfig;
use crate::error::Result;
use crate::models::ClassificationWithPriority;
use crate::priority::PriorityCalculator;
use crate::sla::SlaCalculator;

/// The triage pipeline: classification plus best-effort priority.
pub struct ClassificationPipeline {
    classifier: AiClassifier,
    priority: PriorityCalculator,
    sla: SlaCalculator,
}

impl ClassificationPipeline {
    /// Build the full pipeline from configuration.
    pub fn new(config: TriageConfig) -> Result<Self> {
        let tables = Arc::new(config.priority);

        Ok(Self {
            classifier: AiClassifier::new(config.ai)?,
            priority: PriorityCalculator::new(Arc::clone(&tables)),
            sla: SlaCalculator::new(tables),
        })
    }

    /// Classify a ticket description and derive its priority.
    ///
    /// Never fails. The classifier already degrades internally; if priority
    /// derivation errors on the classified values, the assessment is
    /// dropped rather than surfaced.
    pub async fn classify_with_priority(&self, text: &str) -> ClassificationWithPriority {
        let classification = self.classifier.classify(text).await;

        let assessment = match self
            .priority
            .assess(classification.category, classification.sentiment)
        {
            Ok(assessment) => Some(assessment),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    category = %classification.category,
                    sentiment = %classification.sentiment,
                    "Priority derivation failed, continuing without priority"
                );
                None
            }
        };

        ClassificationWithPriority {
            classification,
            assessment,
        }
    }

    /// The SLA calculator sharing this pipeline's tables, for callers that
    /// set due dates right after classification.
    pub fn sla(&self) -> &SlaCalculator {
        &self.sla
    }

    /// The priority calculator, for callers recalculating priorities on
    /// already-classified tickets.
    pub fn priority(&self) -> &PriorityCalculator {
        &self.priority
    }
}
