//! Ticket triage engine: classification, ITIL priority and SLA.
//!
//! Raw ticket text flows one direction through the crate: the
//! [`classifier::AiClassifier`] produces a category/sentiment/confidence
//! classification (degrading to the deterministic
//! [`keyword::KeywordClassifier`] on any provider failure), the
//! [`priority::PriorityCalculator`] derives an Impact × Urgency priority,
//! and the [`sla::SlaCalculator`] turns that priority into a deadline and
//! breach status. [`pipeline::ClassificationPipeline`] composes the stages
//! so that no classification failure ever blocks ticket creation.

pub mod audit;
pub mod classifier;
pub mod config;
pub mod error;
pub mod keyword;
pub mod models;
pub mod pipeline;
pub mod priority;
pub mod ratelimit;
pub mod sla;
