//! SLA deadline and breach evaluation.
//!
//! Pure functions over the configured priority→hours table. Evaluation
//! time is always an explicit argument so callers and tests control the
//! clock.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::config::PriorityConfig;
use crate::error::{Result, TriageError};
use crate::models::{Priority, PriorityAssessment, SlaState, SlaStatus, TicketStatus, TicketView};

/// Fallback age assumed for tickets with an SLA but no recorded creation
/// time. Keeps the remaining-percentage calculation away from a zero-length
/// window; a defensive policy, not a business rule.
pub const MISSING_CREATED_AT_FALLBACK_HOURS: i64 = 1;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Calculator for SLA due dates, breach checks and status buckets.
#[derive(Clone)]
pub struct SlaCalculator {
    config: Arc<PriorityConfig>,
}

impl SlaCalculator {
    pub fn new(config: Arc<PriorityConfig>) -> Self {
        Self { config }
    }

    /// SLA hours for a priority level.
    pub fn sla_hours(&self, priority: Priority) -> Result<i64> {
        self.config.sla_hours.get(&priority).copied().ok_or_else(|| {
            TriageError::Domain(format!("Invalid priority level: {priority}"))
        })
    }

    /// Deadline for a ticket of the given priority created at `created_at`.
    pub fn due_date(&self, priority: Priority, created_at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let hours = self.sla_hours(priority)?;
        let due = created_at + Duration::hours(hours);

        tracing::info!(
            priority = %priority,
            sla_hours = hours,
            created_at = %created_at,
            due_date = %due,
            "Calculated SLA due date"
        );

        Ok(due)
    }

    /// Deadline from a best-effort assessment; a missing assessment
    /// defaults to low priority.
    pub fn due_date_from_assessment(
        &self,
        assessment: Option<&PriorityAssessment>,
        created_at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let priority = assessment.map(|a| a.priority).unwrap_or(Priority::Low);
        self.due_date(priority, created_at)
    }

    /// Whether the ticket has breached its SLA as of `now`.
    ///
    /// Tickets with no SLA never breach. Closed tickets never breach,
    /// regardless of the deadline.
    pub fn is_breached(&self, ticket: &TicketView, now: DateTime<Utc>) -> bool {
        let Some(due_at) = ticket.sla_due_at else {
            return false;
        };

        if ticket.status == TicketStatus::Closed {
            return false;
        }

        let breached = due_at < now;
        if breached {
            tracing::warn!(
                sla_due_at = %due_at,
                now = %now,
                "SLA breached"
            );
        }

        breached
    }

    /// Full SLA evaluation for a ticket as of `now`.
    ///
    /// Bucket thresholds come from configuration: remaining percentage
    /// above `on_track_threshold` is on track, above `warning_threshold`
    /// is a warning, anything else is critical.
    pub fn status_of(&self, ticket: &TicketView, now: DateTime<Utc>) -> SlaStatus {
        let Some(due_at) = ticket.sla_due_at else {
            return SlaStatus::no_sla();
        };

        if self.is_breached(ticket, now) {
            return SlaStatus::breached();
        }

        if ticket.status == TicketStatus::Closed {
            return SlaStatus::on_time();
        }

        let created_at = ticket
            .created_at
            .unwrap_or_else(|| now - Duration::hours(MISSING_CREATED_AT_FALLBACK_HOURS));

        let total_hours = hours_between(created_at, due_at);
        let remaining_hours = hours_between(now, due_at);
        // Clock skew can put `now` before `created_at`; keep the percentage
        // inside its documented [0, 100] range.
        let remaining_percentage = if total_hours > 0.0 {
            (remaining_hours / total_hours * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        let status = if remaining_percentage > self.config.on_track_threshold {
            SlaState::OnTrack
        } else if remaining_percentage > self.config.warning_threshold {
            SlaState::Warning
        } else {
            SlaState::Critical
        };

        SlaStatus {
            status,
            breached: false,
            remaining_hours: Some(remaining_hours.max(0.0)),
            remaining_percentage: Some(remaining_percentage),
        }
    }
}

/// Signed duration between two instants in fractional hours.
fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / SECONDS_PER_HOUR
}
