//! AI-assisted analyzer backed by the Anthropic Messages API.

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

use crate::analyzer::{ErrorAnalyzer, ErrorContext};
use crate::errors::AnalyzerError;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Default model used for analyses.
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-opus-5";

/// Analyzer that asks Claude for troubleshooting suggestions.
///
/// The API key comes from the constructor or the `ANTHROPIC_API_KEY`
/// environment variable; without one the analyzer reports itself disabled
/// rather than failing. All analysis failures surface as [`AnalyzerError`]s,
/// which the engine swallows.
pub struct ClaudeAnalyzer {
    api_key: Option<String>,
    model: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl ClaudeAnalyzer {
    /// Creates an analyzer using `ANTHROPIC_API_KEY` and the default model.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(std::env::var("ANTHROPIC_API_KEY").ok(), DEFAULT_CLAUDE_MODEL)
    }

    /// Creates an analyzer with an explicit key and model.
    #[must_use]
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        if api_key.is_none() {
            warn!(
                "no API key provided for AI error analysis; \
                 set ANTHROPIC_API_KEY to enable it"
            );
        } else {
            info!("AI-powered error analysis enabled");
        }

        Self {
            api_key,
            model: model.into(),
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    fn build_prompt(error: &str, context: &ErrorContext) -> String {
        format!(
            "You are helping troubleshoot a data pipeline error. Provide \
             concise, actionable troubleshooting steps.\n\
             \n\
             ERROR:\n{error}\n\
             \n\
             CONTEXT:\n\
             operation: {operation}\n\
             record_id: {record_id}\n\
             total_processed: {total}\n\
             \n\
             Provide 3-5 specific troubleshooting steps, prioritized by \
             likelihood. Keep each step under 2 sentences and be specific \
             to the error context.",
            operation = context.operation,
            record_id = context.record_id.as_deref().unwrap_or("<none>"),
            total = context.total_processed,
        )
    }

    fn call_api(&self, api_key: &str, prompt: &str) -> Result<String, AnalyzerError> {
        let body = json!({
            "model": self.model,
            "max_tokens": 1000,
            "messages": [
                {"role": "user", "content": prompt}
            ],
        });

        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .map_err(|err| AnalyzerError::Http(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(AnalyzerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .map_err(|err| AnalyzerError::Http(err.to_string()))?;

        parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text)
            .ok_or(AnalyzerError::MissingContent)
    }
}

impl ErrorAnalyzer for ClaudeAnalyzer {
    fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    fn explain(
        &self,
        error: &str,
        context: &ErrorContext,
    ) -> Result<Option<String>, AnalyzerError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(AnalyzerError::Disabled);
        };

        let prompt = Self::build_prompt(error, context);
        let suggestions = self.call_api(api_key, &prompt)?;
        Ok(Some(suggestions))
    }
}

impl std::fmt::Debug for ClaudeAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeAnalyzer")
            .field("model", &self.model)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
