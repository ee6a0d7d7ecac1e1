//! Configuration loading from environment.
//!
//! Reads provider credentials and tuning from environment variables and
//! supports loading the priority/SLA tables from a JSON file. All tables
//! ship with the reference defaults and are loaded once at startup.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TriageError};
use crate::models::{Category, Impact, Priority, Sentiment, Urgency};

/// Default number of provider requests allowed per rolling minute.
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 10;

/// Top-level configuration for the triage engine.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    pub ai: AiConfig,
    pub priority: PriorityConfig,
}

impl TriageConfig {
    /// Load configuration from environment variables.
    ///
    /// Required environment variables (unless `AI_ALWAYS_MOCK` is set):
    /// - `AI_API_KEY`: bearer token for the AI provider
    ///
    /// Optional environment variables:
    /// - `AI_PROVIDER`: provider name (default: openrouter)
    /// - `AI_API_URL`: chat-completions endpoint URL
    /// - `AI_MODELS`: comma-separated model ids, tried in order
    /// - `AI_TIMEOUT_SECS`: per-request timeout (default: 30)
    /// - `AI_RETRIES`: transport retries per request (default: 3)
    /// - `AI_RETRY_DELAY_MS`: delay between retries (default: 1000)
    /// - `AI_TEMPERATURE`: sampling temperature (default: 0.3)
    /// - `AI_MAX_TOKENS`: completion token cap (default: 500)
    /// - `AI_ALWAYS_MOCK`: force the keyword classifier, skip the network
    /// - `AI_RATE_LIMIT_PER_MINUTE`: provider call cap (default: 10)
    /// - `AI_MIN_CONFIDENCE` / `AI_HIGH_CONFIDENCE`: acceptance bands
    /// - `PRIORITY_CONFIG_PATH`: JSON file overriding the priority tables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            ai: AiConfig::from_env()?,
            priority: load_priority_config()?,
        })
    }
}

/// AI provider and classification settings.
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Provider name, used as the rate-limit key and result annotation.
    pub provider_name: String,
    /// Bearer token for the provider API.
    pub api_key: String,
    /// Chat-completions endpoint URL.
    pub api_url: String,
    /// Ordered list of model identifiers to try per call.
    pub models: Vec<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Automatic retries on transport failure per request.
    pub retries: u32,
    /// Fixed delay between retries in milliseconds.
    pub retry_delay_ms: u64,
    /// Sampling temperature; low for consistent classifications.
    pub temperature: f64,
    /// Completion token cap.
    pub max_tokens: u32,
    /// Force the keyword classifier and skip the network path entirely.
    pub always_mock: bool,
    /// Provider call cap per rolling 60-second window.
    pub rate_limit_per_minute: u32,
    /// Confidence below this is flagged for review.
    pub min_confidence: f64,
    /// Confidence at or above this is considered high.
    pub high_confidence: f64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider_name: "openrouter".to_string(),
            api_key: String::new(),
            api_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            models: vec!["meta-llama/llama-3.2-3b-instruct:free".to_string()],
            timeout_secs: 30,
            retries: 3,
            retry_delay_ms: 1000,
            temperature: 0.3,
            max_tokens: 500,
            always_mock: false,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            min_confidence: 0.6,
            high_confidence: 0.8,
        }
    }
}

impl AiConfig {
    /// Load AI settings from environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let always_mock = env_flag("AI_ALWAYS_MOCK");

        let api_key = match env::var("AI_API_KEY") {
            Ok(key) => key,
            Err(_) if always_mock => String::new(),
            Err(_) => return Err(TriageError::Config("AI_API_KEY not set".to_string())),
        };

        let models = env::var("AI_MODELS")
            .ok()
            .map(|s| parse_model_list(&s))
            .filter(|models| !models.is_empty())
            .unwrap_or(defaults.models);

        Ok(Self {
            provider_name: env::var("AI_PROVIDER").unwrap_or(defaults.provider_name),
            api_key,
            api_url: env::var("AI_API_URL").unwrap_or(defaults.api_url),
            models,
            timeout_secs: env_parse("AI_TIMEOUT_SECS", defaults.timeout_secs),
            retries: env_parse("AI_RETRIES", defaults.retries),
            retry_delay_ms: env_parse("AI_RETRY_DELAY_MS", defaults.retry_delay_ms),
            temperature: env_parse("AI_TEMPERATURE", defaults.temperature),
            max_tokens: env_parse("AI_MAX_TOKENS", defaults.max_tokens),
            always_mock,
            rate_limit_per_minute: env_parse(
                "AI_RATE_LIMIT_PER_MINUTE",
                defaults.rate_limit_per_minute,
            ),
            min_confidence: env_parse("AI_MIN_CONFIDENCE", defaults.min_confidence),
            high_confidence: env_parse("AI_HIGH_CONFIDENCE", defaults.high_confidence),
        })
    }
}

/// ITIL priority and SLA tables.
///
/// Logically immutable after loading; both calculators hold a shared copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityConfig {
    /// Maps ticket categories to impact levels.
    pub category_to_impact: HashMap<Category, Impact>,
    /// Maps ticket sentiments to urgency levels.
    pub sentiment_to_urgency: HashMap<Sentiment, Urgency>,
    /// Impact × Urgency priority matrix.
    pub matrix: HashMap<Impact, HashMap<Urgency, Priority>>,
    /// Maximum hours to resolution per priority.
    pub sla_hours: HashMap<Priority, i64>,
    /// Remaining percentage above which a ticket counts as on track.
    #[serde(default = "default_on_track_threshold")]
    pub on_track_threshold: f64,
    /// Remaining percentage above which a ticket is a warning rather than
    /// critical. These thresholds are operational guesses and may need
    /// tuning; they are configurable for that reason.
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,
}

fn default_on_track_threshold() -> f64 {
    50.0
}

fn default_warning_threshold() -> f64 {
    25.0
}

impl Default for PriorityConfig {
    fn default() -> Self {
        let category_to_impact = HashMap::from([
            (Category::Technical, Impact::Critical),
            (Category::Billing, Impact::High),
            (Category::Commercial, Impact::Medium),
            (Category::General, Impact::Low),
            (Category::Support, Impact::Low),
        ]);

        let sentiment_to_urgency = HashMap::from([
            (Sentiment::Negative, Urgency::High),
            (Sentiment::Neutral, Urgency::Medium),
            (Sentiment::Positive, Urgency::Low),
        ]);

        let matrix = HashMap::from([
            (
                Impact::Critical,
                HashMap::from([
                    (Urgency::High, Priority::Critical),
                    (Urgency::Medium, Priority::Critical),
                    (Urgency::Low, Priority::High),
                ]),
            ),
            (
                Impact::High,
                HashMap::from([
                    (Urgency::High, Priority::Critical),
                    (Urgency::Medium, Priority::High),
                    (Urgency::Low, Priority::Medium),
                ]),
            ),
            (
                Impact::Medium,
                HashMap::from([
                    (Urgency::High, Priority::High),
                    (Urgency::Medium, Priority::Medium),
                    (Urgency::Low, Priority::Low),
                ]),
            ),
            (
                Impact::Low,
                HashMap::from([
                    (Urgency::High, Priority::Medium),
                    (Urgency::Medium, Priority::Low),
                    (Urgency::Low, Priority::Low),
                ]),
            ),
        ]);

        let sla_hours = HashMap::from([
            (Priority::Critical, 1),
            (Priority::High, 4),
            (Priority::Medium, 24),
            (Priority::Low, 48),
        ]);

        Self {
            category_to_impact,
            sentiment_to_urgency,
            matrix,
            sla_hours,
            on_track_threshold: default_on_track_threshold(),
            warning_threshold: default_warning_threshold(),
        }
    }
}

impl PriorityConfig {
    /// Verify the tables are complete: every category, sentiment and
    /// Impact × Urgency combination must resolve, and every priority must
    /// have an SLA.
    pub fn validate(&self) -> Result<()> {
        for category in Category::ALL {
            if !self.category_to_impact.contains_key(&category) {
                return Err(TriageError::Config(format!(
                    "category_to_impact missing entry for {category}"
                )));
            }
        }

        for sentiment in Sentiment::ALL {
            if !self.sentiment_to_urgency.contains_key(&sentiment) {
                return Err(TriageError::Config(format!(
                    "sentiment_to_urgency missing entry for {sentiment}"
                )));
            }
        }

        for impact in [Impact::Critical, Impact::High, Impact::Medium, Impact::Low] {
            let row = self.matrix.get(&impact).ok_or_else(|| {
                TriageError::Config(format!("priority matrix missing row for {impact}"))
            })?;
            for urgency in [Urgency::High, Urgency::Medium, Urgency::Low] {
                if !row.contains_key(&urgency) {
                    return Err(TriageError::Config(format!(
                        "priority matrix missing cell {impact} x {urgency}"
                    )));
                }
            }
        }

        for priority in [
            Priority::Critical,
            Priority::High,
            Priority::Medium,
            Priority::Low,
        ] {
            if !self.sla_hours.contains_key(&priority) {
                return Err(TriageError::Config(format!(
                    "sla_hours missing entry for {priority}"
                )));
            }
        }

        Ok(())
    }
}

/// Load the priority tables from `PRIORITY_CONFIG_PATH` or fall back to the
/// reference defaults.
fn load_priority_config() -> Result<PriorityConfig> {
    let config = match env::var("PRIORITY_CONFIG_PATH") {
        Ok(path) => load_priority_config_from_file(&path)?,
        Err(_) => PriorityConfig::default(),
    };

    config.validate()?;
    Ok(config)
}

/// Load priority tables from a JSON file.
fn load_priority_config_from_file(path: &str) -> Result<PriorityConfig> {
    let path = Path::new(path);
    let content = fs::read_to_string(path)
        .map_err(|e| TriageError::Config(format!("Failed to read priority config: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| TriageError::Config(format!("Failed to parse priority config: {e}")))
}

/// Parse a comma-separated list of model identifiers.
fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect()
}

/// Read a boolean flag from the environment ("1", "true", "yes").
fn env_flag(var_name: &str) -> bool {
    env::var(var_name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Read and parse an environment variable, falling back to a default.
fn env_parse<T: std::str::FromStr>(var_name: &str, default: T) -> T {
    env::var(var_name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
