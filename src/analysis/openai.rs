//! OpenAI-compatible chat completions analyzer

use super::{prompt, AnalysisService};
use crate::config::{resolve_secret, AnalysisConfig};
use crate::error::{Error, Result};
use crate::models::{AnalysisResult, UsageRecord};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Analyzer backed by a `/chat/completions` endpoint
pub struct OpenAiAnalyzer {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiAnalyzer {
    /// Build from configuration, resolving the API key from the environment
    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        let api_key = resolve_secret(&config.api_key_ref).ok_or_else(|| {
            Error::Config(format!(
                "Analysis API key not found in ${}",
                config.api_key_ref.to_uppercase()
            ))
        })?;
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self::new(client, config, api_key))
    }

    /// Build with an explicit client and key
    pub fn new(client: Client, config: &AnalysisConfig, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn request_body(&self, record: &UsageRecord) -> Result<Value> {
        Ok(json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt::SYSTEM_PROMPT },
                { "role": "user", "content": prompt::user_message(record)? },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        }))
    }
}

#[async_trait]
impl AnalysisService for OpenAiAnalyzer {
    async fn analyze(&self, record: &UsageRecord) -> Result<AnalysisResult> {
        let body = self.request_body(record)?;

        tracing::debug!(model = %self.model, "Requesting usage analysis");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Analysis(format!("Failed to reach analysis service: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Analysis(format!(
                "Analysis service returned {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let completion: Value = response
            .json()
            .await
            .map_err(|e| Error::Malformed(format!("Failed to parse completion: {}", e)))?;

        prompt::parse_completion(&completion)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, http::StatusCode, response::IntoResponse, routing::post, Json, Router};

    async fn completions(headers: HeaderMap, Json(body): Json<Value>) -> axum::response::Response {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer sk-test");
        if !authorized {
            return (StatusCode::UNAUTHORIZED, "bad key").into_response();
        }
        // Echo the shower duration back as the score so the test can see
        // the record made it into the prompt
        let user = body["messages"][1]["content"].as_str().unwrap_or("");
        let score = if user.contains("\"showerDuration\":25") { 80 } else { 20 };
        let analysis = json!({
            "waterUsageScore": score,
            "totalLitersPerDay": 200,
            "insights": ["Uzun duş"],
            "recommendations": ["Kısa duş"],
            "comparison": {"user": 200, "cityAverage": 165, "recommended": 100},
            "breakdown": [{"category": "Duş", "percentage": 100, "liters": 200}]
        });
        Json(json!({"choices": [{"message": {"content": analysis.to_string()}}]})).into_response()
    }

    async fn spawn_fake() -> String {
        let app = Router::new().route("/v1/chat/completions", post(completions));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    fn config(base_url: String) -> AnalysisConfig {
        AnalysisConfig {
            base_url,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_request_body() {
        let analyzer = OpenAiAnalyzer::new(Client::new(), &AnalysisConfig::default(), "k");
        let body = analyzer.request_body(&UsageRecord::default()).unwrap();
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let base = spawn_fake().await;
        let analyzer = OpenAiAnalyzer::new(Client::new(), &config(base), "sk-test");
        let record = UsageRecord {
            name: "Ayşe".to_string(),
            shower_duration: 25,
            ..UsageRecord::default()
        };
        let result = analyzer.analyze(&record).await.unwrap();
        assert_eq!(result.water_usage_score, 80.0);
        assert_eq!(result.breakdown_total(), 100.0);
    }

    #[tokio::test]
    async fn test_analyze_rejected_key() {
        let base = spawn_fake().await;
        let analyzer = OpenAiAnalyzer::new(Client::new(), &config(base), "sk-wrong");
        let err = analyzer.analyze(&UsageRecord::default()).await.unwrap_err();
        assert!(matches!(err, Error::Analysis(ref m) if m.contains("401")));
    }

    #[tokio::test]
    async fn test_analyze_unreachable() {
        // Port 9 (discard) is not listening on loopback in test environments
        let analyzer = OpenAiAnalyzer::new(
            Client::new(),
            &config("http://127.0.0.1:9/v1".to_string()),
            "sk-test",
        );
        assert!(analyzer.analyze(&UsageRecord::default()).await.is_err());
    }

    #[test]
    fn test_from_config_requires_key() {
        let cfg = AnalysisConfig {
            api_key_ref: "konya_water_test_unset_openai".to_string(),
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            OpenAiAnalyzer::from_config(&cfg),
            Err(Error::Config(_))
        ));
    }
}
