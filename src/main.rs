//! Triage CLI entry point.
//!
//! Classifies a ticket description from the command line and prints the
//! merged classification, priority and SLA deadline as JSON. Useful for
//! smoke-testing provider configuration; set `AI_ALWAYS_MOCK=1` to stay
//! offline.

use chrono::Utc;
use tracing_subscriber::EnvFilter;

use triage::config::TriageConfig;
use triage::error::{Result, TriageError};
use triage::pipeline::ClassificationPipeline;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let description = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if description.trim().is_empty() {
        return Err(TriageError::Config(
            "usage: triage <ticket description>".to_string(),
        ));
    }

    let config = TriageConfig::from_env()?;
    let pipeline = ClassificationPipeline::new(config)?;

    let merged = pipeline.classify_with_priority(&description).await;

    let now = Utc::now();
    let sla_due_at = pipeline
        .sla()
        .due_date_from_assessment(merged.assessment.as_ref(), now)?;

    let mut output = serde_json::to_value(&merged)?;
    if let Some(map) = output.as_object_mut() {
        map.insert("sla_due_at".to_string(), serde_json::json!(sla_due_at));
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
