//! AI-powered ticket classification.
//!
//! Sends ticket descriptions to an external chat-completions endpoint,
//! trying an ordered list of models and degrading to the keyword
//! classifier when every model fails. Classification is best-effort by
//! design: `classify` never returns an error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AiConfig;
use crate::error::{Result, TriageError};
use crate::keyword::KeywordClassifier;
use crate::models::{Category, ClassificationResult, ConfidenceBand, Sentiment};
use crate::ratelimit::{ProviderRateLimiter, RateLimit};

/// Chat-completions request body.
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// One message in a chat-completions request.
#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat-completions response body.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
    /// Model id the provider actually served, when reported.
    #[serde(default)]
    pub model: Option<String>,
}

/// Candidate completion in a response.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

/// Message content of a completion candidate.
#[derive(Debug, Deserialize)]
pub struct ChatChoiceMessage {
    pub content: String,
}

/// Classification JSON embedded in the model's textual reply.
#[derive(Debug, Deserialize)]
struct RawClassification {
    category: String,
    sentiment: String,
    confidence: f64,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Capability for issuing one chat-completion call.
///
/// Production uses [`HttpTransport`]; tests inject a scripted transport to
/// observe or suppress network activity.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

/// HTTP transport for the configured provider endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpTransport {
    /// Build a transport with the configured per-request timeout.
    pub fn new(config: &AiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TriageError::Provider(format!("HTTP {status}: {body}")));
        }

        Ok(response.json::<ChatResponse>().await?)
    }
}

/// Classify a reqwest send failure: connection and timeout errors are
/// retryable transport failures, anything else stays an HTTP error.
fn classify_send_error(e: reqwest::Error) -> TriageError {
    if e.is_connect() || e.is_timeout() || e.is_request() {
        TriageError::Transport(e.to_string())
    } else {
        TriageError::Http(e)
    }
}

/// Classifier that orchestrates model fallback, rate limiting and the
/// keyword degradation path.
pub struct AiClassifier {
    config: AiConfig,
    transport: Arc<dyn ChatTransport>,
    rate_limit: Arc<dyn RateLimit>,
    keyword: KeywordClassifier,
}

impl AiClassifier {
    /// Create a classifier with the HTTP transport and a governor-backed
    /// rate limiter.
    pub fn new(config: AiConfig) -> Result<Self> {
        let transport: Arc<dyn ChatTransport> = Arc::new(HttpTransport::new(&config)?);
        let rate_limit: Arc<dyn RateLimit> =
            Arc::new(ProviderRateLimiter::new(config.rate_limit_per_minute));

        Ok(Self {
            transport,
            rate_limit,
            keyword: KeywordClassifier::new()?,
            config,
        })
    }

    /// Replace the transport (used by tests).
    pub fn with_transport(mut self, transport: Arc<dyn ChatTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Replace the rate limiter (used by tests).
    pub fn with_rate_limit(mut self, rate_limit: Arc<dyn RateLimit>) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Classify a ticket description.
    ///
    /// Never fails: in mock mode the network path is skipped entirely, and
    /// any provider failure degrades to the keyword classifier.
    pub async fn classify(&self, text: &str) -> ClassificationResult {
        if self.config.always_mock {
            tracing::info!("Using keyword classification (mock mode forced by config)");
            return self.keyword.classify(text);
        }

        match self.classify_remote(text).await {
            Ok(result) => {
                if result.confidence_band(&self.config) == ConfidenceBand::Low {
                    tracing::warn!(
                        confidence = result.confidence,
                        min_confidence = self.config.min_confidence,
                        "Low-confidence classification, flag for manual review"
                    );
                }
                result
            }
            Err(e) => {
                tracing::warn!(error = %e, "AI provider failed, using keyword classification");
                self.keyword.classify(text)
            }
        }
    }

    /// Try each configured model in order; the first valid classification
    /// wins.
    async fn classify_remote(&self, text: &str) -> Result<ClassificationResult> {
        if self.config.models.is_empty() {
            return Err(TriageError::Config("No models configured".to_string()));
        }

        for model in &self.config.models {
            if !self.rate_limit.try_acquire(&self.config.provider_name) {
                let err = TriageError::RateLimited {
                    provider: self.config.provider_name.clone(),
                };
                tracing::warn!(model = %model, error = %err, "Skipping model attempt");
                continue;
            }

            tracing::info!(model = %model, "Trying model");
            match self.call_model(model, text).await {
                Ok(result) => {
                    tracing::info!(model = %model, "Model succeeded");
                    return Ok(result);
                }
                Err(e) => {
                    tracing::warn!(model = %model, error = %e, "Model failed, trying next");
                }
            }
        }

        Err(TriageError::Provider(format!(
            "All {} models failed",
            self.config.provider_name
        )))
    }

    /// One model attempt: request, bounded transport retries, parse,
    /// validate, annotate.
    async fn call_model(&self, model: &str, text: &str) -> Result<ClassificationResult> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.system_prompt(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let started = Instant::now();
        let response = self.complete_with_retries(&request).await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        self.parse_response(response, model, elapsed_ms)
    }

    /// Retry transport-level failures up to the configured count with a
    /// fixed delay. Application-level errors fail immediately.
    async fn complete_with_retries(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let mut attempt = 0;
        loop {
            match self.transport.complete(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.config.retries => {
                    attempt += 1;
                    tracing::warn!(error = %e, attempt, "Transport failure, retrying");
                    tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// System prompt instructing the model to emit classification JSON
    /// only, listing the valid enumerations.
    fn system_prompt(&self) -> String {
        let categories = Category::ALL
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let sentiments = Sentiment::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "You are an AI assistant that classifies customer support tickets. \
             Analyze the ticket description and respond ONLY with a JSON object \
             containing: category ({categories}), sentiment ({sentiments}), \
             confidence (0.0-1.0), and reasoning. Be precise and consistent."
        )
    }

    /// Parse and validate the model's reply into a classification.
    ///
    /// Any shape or domain violation is a provider error, counting as this
    /// model's failure.
    fn parse_response(
        &self,
        response: ChatResponse,
        requested_model: &str,
        elapsed_ms: u64,
    ) -> Result<ClassificationResult> {
        let content = response
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| TriageError::Provider("Empty response: no choices".to_string()))?;

        let json_text = extract_json(content);

        let raw: RawClassification = serde_json::from_str(json_text)
            .map_err(|e| TriageError::Provider(format!("Invalid JSON response: {e}")))?;

        let category: Category = raw
            .category
            .parse()
            .map_err(|_| TriageError::Provider(format!("Invalid category: {}", raw.category)))?;
        let sentiment: Sentiment = raw
            .sentiment
            .parse()
            .map_err(|_| TriageError::Provider(format!("Invalid sentiment: {}", raw.sentiment)))?;

        if !raw.confidence.is_finite() || !(0.0..=1.0).contains(&raw.confidence) {
            return Err(TriageError::Provider(format!(
                "Invalid confidence value: {}",
                raw.confidence
            )));
        }

        Ok(ClassificationResult {
            category,
            sentiment,
            confidence: raw.confidence,
            reasoning: raw.reasoning,
            model: response
                .model
                .unwrap_or_else(|| requested_model.to_string()),
            provider: Some(self.config.provider_name.clone()),
            processing_time_ms: Some(elapsed_ms),
        })
    }
}

/// Extract JSON from text that may be wrapped in markdown code blocks.
fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let start = start + 7;
        if let Some(end) = text[start..].find("```") {
            return text[start..start + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let start = start + 3;
        if let Some(end) = text[start..].find("```") {
            return text[start..start + end].trim();
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::keyword::KEYWORD_MODEL;
    use crate::ratelimit::NoopRateLimiter;

    /// Transport that serves pre-scripted replies and counts invocations.
    struct ScriptedTransport {
        calls: AtomicUsize,
        replies: Mutex<Vec<Result<ChatResponse>>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Result<ChatResponse>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                replies: Mutex::new(replies),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn complete(&self, _request: &ChatRequest) -> Result<ChatResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().expect("lock");
            if replies.is_empty() {
                return Err(TriageError::Provider("no scripted reply".to_string()));
            }
            replies.remove(0)
        }
    }

    /// Rate limiter that always denies.
    struct DenyAll;

    impl RateLimit for DenyAll {
        fn try_acquire(&self, _key: &str) -> bool {
            false
        }
    }

    fn reply(content: &str, model: Option<&str>) -> ChatResponse {
        ChatResponse {
            choices: vec![ChatChoice {
                message: ChatChoiceMessage {
                    content: content.to_string(),
                },
            }],
            model: model.map(|m| m.to_string()),
        }
    }

    fn test_config(models: &[&str]) -> AiConfig {
        AiConfig {
            models: models.iter().map(|m| m.to_string()).collect(),
            retry_delay_ms: 1,
            ..AiConfig::default()
        }
    }

    fn classifier(
        config: AiConfig,
        transport: Arc<ScriptedTransport>,
    ) -> AiClassifier {
        AiClassifier::new(config)
            .expect("classifier builds")
            .with_transport(transport)
            .with_rate_limit(Arc::new(NoopRateLimiter))
    }

    const GOOD_CONTENT: &str =
        r#"{"category":"technical","sentiment":"negative","confidence":0.92,"reasoning":"crash report"}"#;

    #[tokio::test]
    async fn mock_mode_never_touches_the_transport() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(reply(GOOD_CONTENT, None))]));
        let config = AiConfig {
            always_mock: true,
            ..test_config(&["m1"])
        };
        let classifier = classifier(config, Arc::clone(&transport));

        let result = classifier.classify("login is broken").await;

        assert_eq!(transport.call_count(), 0);
        assert_eq!(result.model, KEYWORD_MODEL);
        assert!(result.is_valid());
    }

    #[tokio::test]
    async fn successful_classification_is_annotated() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(reply(
            GOOD_CONTENT,
            Some("meta-llama/llama-3.2-3b-instruct:free"),
        ))]));
        let classifier = classifier(test_config(&["m1"]), Arc::clone(&transport));

        let result = classifier.classify("the app crashes on login").await;

        assert_eq!(result.category, Category::Technical);
        assert_eq!(result.sentiment, Sentiment::Negative);
        assert!((result.confidence - 0.92).abs() < 1e-9);
        assert_eq!(result.model, "meta-llama/llama-3.2-3b-instruct:free");
        assert_eq!(result.provider.as_deref(), Some("openrouter"));
        assert!(result.processing_time_ms.is_some());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn response_model_falls_back_to_requested_id() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(reply(GOOD_CONTENT, None))]));
        let classifier = classifier(test_config(&["model-one"]), transport);

        let result = classifier.classify("broken export").await;

        assert_eq!(result.model, "model-one");
    }

    #[tokio::test]
    async fn code_fenced_json_is_accepted() {
        let fenced = format!("```json\n{GOOD_CONTENT}\n```");
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(reply(&fenced, None))]));
        let classifier = classifier(test_config(&["m1"]), transport);

        let result = classifier.classify("crash on upload").await;

        assert_eq!(result.category, Category::Technical);
        assert_eq!(result.provider.as_deref(), Some("openrouter"));
    }

    #[tokio::test]
    async fn invalid_reply_moves_to_next_model() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(reply(
                r#"{"category":"spam","sentiment":"negative","confidence":0.9}"#,
                None,
            )),
            Ok(reply(GOOD_CONTENT, Some("m2"))),
        ]));
        let classifier = classifier(test_config(&["m1", "m2"]), Arc::clone(&transport));

        let result = classifier.classify("database error").await;

        assert_eq!(result.model, "m2");
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn all_models_failing_degrades_to_keywords() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(TriageError::Provider("HTTP 500: upstream".to_string())),
            Err(TriageError::Provider("HTTP 502: upstream".to_string())),
        ]));
        let classifier = classifier(test_config(&["m1", "m2"]), Arc::clone(&transport));

        let result = classifier.classify("the server keeps showing an error").await;

        assert_eq!(transport.call_count(), 2);
        assert_eq!(result.model, KEYWORD_MODEL);
        assert_eq!(result.category, Category::Technical);
        assert!(result.is_valid());
    }

    #[tokio::test]
    async fn rate_limit_denial_skips_models_and_degrades() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(reply(GOOD_CONTENT, None))]));
        let classifier = AiClassifier::new(test_config(&["m1", "m2"]))
            .expect("classifier builds")
            .with_transport(transport.clone())
            .with_rate_limit(Arc::new(DenyAll));

        let result = classifier.classify("urgent billing problem").await;

        // Both model attempts were denied before any network call.
        assert_eq!(transport.call_count(), 0);
        assert_eq!(result.model, KEYWORD_MODEL);
        assert_eq!(result.category, Category::Billing);
        assert_eq!(result.sentiment, Sentiment::Negative);
    }

    #[tokio::test]
    async fn transport_failures_retry_up_to_the_configured_count() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(TriageError::Transport("connection refused".to_string())),
            Err(TriageError::Transport("connection refused".to_string())),
            Err(TriageError::Transport("connection refused".to_string())),
            Err(TriageError::Transport("connection refused".to_string())),
        ]));
        let classifier = classifier(test_config(&["m1"]), Arc::clone(&transport));

        let result = classifier.classify("the upload fails").await;

        // One initial attempt plus `retries` (3), then the model fails and
        // classification degrades to keywords.
        assert_eq!(transport.call_count(), 4);
        assert_eq!(result.model, KEYWORD_MODEL);
        assert_eq!(result.category, Category::Technical);
    }

    #[tokio::test]
    async fn transport_failure_then_success_returns_parsed_result() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(TriageError::Transport("connection reset".to_string())),
            Ok(reply(GOOD_CONTENT, Some("m1"))),
        ]));
        let classifier = classifier(test_config(&["m1"]), Arc::clone(&transport));

        let result = classifier.classify("crash on save").await;

        assert_eq!(transport.call_count(), 2);
        assert_eq!(result.model, "m1");
        assert_eq!(result.category, Category::Technical);
        assert_eq!(result.provider.as_deref(), Some("openrouter"));
    }

    #[tokio::test]
    async fn provider_errors_do_not_retry() {
        let transport = Arc::new(ScriptedTransport::new(vec![Err(TriageError::Provider(
            "HTTP 400: bad request".to_string(),
        ))]));
        let classifier = classifier(test_config(&["m1"]), Arc::clone(&transport));

        classifier.classify("anything").await;

        // One model, one attempt: application-level failures are final.
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn empty_model_list_degrades_to_keywords() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let classifier = classifier(test_config(&[]), Arc::clone(&transport));

        let result = classifier.classify("thank you, everything is great").await;

        assert_eq!(transport.call_count(), 0);
        assert_eq!(result.model, KEYWORD_MODEL);
        assert_eq!(result.sentiment, Sentiment::Positive);
    }

    #[test]
    fn extract_json_plain() {
        let text = r#"{"category": "support"}"#;
        assert_eq!(extract_json(text), text);
    }

    #[test]
    fn extract_json_code_block() {
        let text = "```json\n{\"category\": \"support\"}\n```";
        assert_eq!(extract_json(text), r#"{"category": "support"}"#);
    }

    #[test]
    fn extract_json_plain_code_block() {
        let text = "```\n{\"category\": \"support\"}\n```";
        assert_eq!(extract_json(text), r#"{"category": "support"}"#);
    }

    #[test]
    fn parse_rejects_missing_fields() {
        let classifier = AiClassifier::new(test_config(&["m1"])).expect("builds");
        let response = reply(r#"{"category":"technical","sentiment":"negative"}"#, None);

        let err = classifier.parse_response(response, "m1", 5).unwrap_err();
        assert!(matches!(err, TriageError::Provider(_)));
    }

    #[test]
    fn parse_rejects_out_of_range_confidence() {
        let classifier = AiClassifier::new(test_config(&["m1"])).expect("builds");
        let response = reply(
            r#"{"category":"technical","sentiment":"negative","confidence":1.5}"#,
            None,
        );

        let err = classifier.parse_response(response, "m1", 5).unwrap_err();
        assert!(err.to_string().contains("Invalid confidence value"));
    }

    #[test]
    fn parse_rejects_unknown_sentiment() {
        let classifier = AiClassifier::new(test_config(&["m1"])).expect("builds");
        let response = reply(
            r#"{"category":"technical","sentiment":"livid","confidence":0.8}"#,
            None,
        );

        let err = classifier.parse_response(response, "m1", 5).unwrap_err();
        assert!(err.to_string().contains("Invalid sentiment"));
    }

    #[test]
    fn parse_rejects_empty_choices() {
        let classifier = AiClassifier::new(test_config(&["m1"])).expect("builds");
        let response = ChatResponse {
            choices: vec![],
            model: None,
        };

        assert!(classifier.parse_response(response, "m1", 5).is_err());
    }

    #[test]
    fn system_prompt_lists_enumerations() {
        let classifier = AiClassifier::new(test_config(&["m1"])).expect("builds");
        let prompt = classifier.system_prompt();

        for category in Category::ALL {
            assert!(prompt.contains(category.as_str()));
        }
        for sentiment in Sentiment::ALL {
            assert!(prompt.contains(sentiment.as_str()));
        }
    }
}
