//! Client for OpenAI-compatible `/chat/completions` and `/embeddings` endpoints.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{OracleError, OracleResult};
use super::{ChatMessage, Oracle};
use crate::config::ConfigError;
use crate::constants::{
    DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL, DEFAULT_SEED, HIGH_THROUGHPUT_THREADS,
};

pub const ENV_BASE_URL: &str = "TRACELINK_OPENAI_BASE_URL";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_CHAT_MODEL: &str = "TRACELINK_CHAT_MODEL";
pub const ENV_EMBEDDING_MODEL: &str = "TRACELINK_EMBEDDING_MODEL";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub embedding_model: String,
    pub seed: u32,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            seed: DEFAULT_SEED,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl OpenAiConfig {
    /// Defaults overridden by the oracle environment variables.
    pub fn from_env(seed: u32) -> Self {
        let mut config = Self {
            seed,
            ..Self::default()
        };
        if let Ok(url) = env::var(ENV_BASE_URL) {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(key) = env::var(ENV_API_KEY)
            && !key.is_empty()
        {
            config.api_key = Some(key);
        }
        if let Ok(model) = env::var(ENV_CHAT_MODEL) {
            config.model = model;
        }
        if let Ok(model) = env::var(ENV_EMBEDDING_MODEL) {
            config.embedding_model = model;
        }
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::MissingSetting { name: ENV_API_KEY });
        }
        if self.base_url.is_empty() {
            return Err(ConfigError::MissingSetting {
                name: ENV_BASE_URL,
            });
        }
        if self.model.is_empty() {
            return Err(ConfigError::MissingSetting {
                name: ENV_CHAT_MODEL,
            });
        }
        if self.embedding_model.is_empty() {
            return Err(ConfigError::MissingSetting {
                name: ENV_EMBEDDING_MODEL,
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    seed: u32,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

fn malformed(reason: impl Into<String>) -> OracleError {
    OracleError::MalformedResponse {
        reason: reason.into(),
    }
}

/// Extracts the assistant text from a chat completion body.
pub(crate) fn parse_chat_response(body: &str) -> OracleResult<String> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| malformed(format!("chat completion: {e}")))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| malformed("chat completion has no message content"))
}

/// Extracts the first vector from an embeddings body.
pub(crate) fn parse_embedding_response(body: &str) -> OracleResult<Vec<f32>> {
    let response: EmbeddingResponse =
        serde_json::from_str(body).map_err(|e| malformed(format!("embedding: {e}")))?;
    let embedding = response
        .data
        .into_iter()
        .next()
        .map(|data| data.embedding)
        .ok_or_else(|| malformed("embedding response has no data"))?;
    if embedding.is_empty() {
        return Err(malformed("embedding vector is empty"));
    }
    Ok(embedding)
}

/// Deterministic (temperature 0, fixed seed) OpenAI-compatible oracle.
#[derive(Debug, Clone)]
pub struct OpenAiOracle {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiOracle {
    pub fn new(config: OpenAiConfig) -> OracleResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(OracleError::Transport)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> OracleResult<String> {
        let url = format!("{}/{}", self.config.base_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.transport(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport(e))?;

        debug!(url = %url, status = status.as_u16(), bytes = text.len(), "Oracle responded");

        if !status.is_success() {
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    fn transport(&self, error: reqwest::Error) -> OracleError {
        if error.is_timeout() {
            OracleError::Timeout {
                after: self.config.timeout,
            }
        } else {
            OracleError::Transport(error)
        }
    }
}

#[async_trait]
impl Oracle for OpenAiOracle {
    async fn embed(&self, text: &str) -> OracleResult<Vec<f32>> {
        let body = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: text,
        };
        let raw = self.post("embeddings", &body).await?;
        parse_embedding_response(&raw)
    }

    async fn chat(&self, messages: &[ChatMessage]) -> OracleResult<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: 0.0,
            seed: self.config.seed,
        };
        let raw = self.post("chat/completions", &body).await?;
        parse_chat_response(&raw)
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn embedding_model(&self) -> &str {
        &self.config.embedding_model
    }

    fn seed(&self) -> u32 {
        self.config.seed
    }

    fn max_concurrency(&self) -> usize {
        HIGH_THROUGHPUT_THREADS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"<trace>yes</trace>"}}]}"#;
        assert_eq!(parse_chat_response(body).unwrap(), "<trace>yes</trace>");
    }

    #[test]
    fn test_parse_chat_response_without_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        assert!(matches!(
            parse_chat_response(body),
            Err(OracleError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_chat_response(r#"{"choices":[]}"#),
            Err(OracleError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_chat_response("not json"),
            Err(OracleError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_parse_embedding_response() {
        let body = r#"{"object":"list","data":[{"index":0,"embedding":[0.25,-0.5]}]}"#;
        assert_eq!(parse_embedding_response(body).unwrap(), vec![0.25, -0.5]);
        assert!(parse_embedding_response(r#"{"data":[]}"#).is_err());
        assert!(parse_embedding_response(r#"{"data":[{"embedding":[]}]}"#).is_err());
    }

    #[test]
    fn test_chat_request_shape() {
        let messages = [ChatMessage::user("q")];
        let body = serde_json::to_value(ChatRequest {
            model: "m",
            messages: &messages,
            temperature: 0.0,
            seed: 9,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "m",
                "messages": [{ "role": "user", "content": "q" }],
                "temperature": 0.0,
                "seed": 9
            })
        );
    }

    fn keyed() -> OpenAiConfig {
        OpenAiConfig {
            api_key: Some("sk-test".into()),
            ..OpenAiConfig::default()
        }
    }

    #[test]
    fn test_config_requires_api_key() {
        assert!(matches!(
            OpenAiConfig::default().validate(),
            Err(ConfigError::MissingSetting { name: ENV_API_KEY })
        ));

        let blank = OpenAiConfig {
            api_key: Some(String::new()),
            ..OpenAiConfig::default()
        };
        assert!(matches!(
            blank.validate(),
            Err(ConfigError::MissingSetting { name: ENV_API_KEY })
        ));
    }

    #[test]
    fn test_config_validation() {
        assert!(keyed().validate().is_ok());

        let config = OpenAiConfig {
            model: String::new(),
            ..keyed()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingSetting { .. })
        ));

        let config = OpenAiConfig {
            timeout: Duration::ZERO,
            ..keyed()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout)));
    }

    #[test]
    fn test_oracle_reports_config() {
        let oracle = OpenAiOracle::new(OpenAiConfig {
            seed: 5,
            ..OpenAiConfig::default()
        })
        .unwrap();
        assert_eq!(oracle.model(), DEFAULT_CHAT_MODEL);
        assert_eq!(oracle.embedding_model(), DEFAULT_EMBEDDING_MODEL);
        assert_eq!(oracle.seed(), 5);
        assert_eq!(oracle.max_concurrency(), HIGH_THROUGHPUT_THREADS);
    }
}
