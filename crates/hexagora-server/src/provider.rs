//! LLM provider clients.
//!
//! [`ProviderClient`] is the one capability the rest of the server knows
//! about: verify a credential cheaply, or turn a prompt into a parsed
//! action proposal. [`HttpProviderClient`] binds it to OpenAI, Anthropic,
//! Gemini, and Ollama over `reqwest`; tests swap in stubs.

use async_trait::async_trait;
use hexagora_core::Action;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

/// Probe timeout for credential verification
const VERIFY_TIMEOUT: Duration = Duration::from_secs(6);
/// Bound on one action request
const ACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// The supported remote providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Ollama => "ollama",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "openai" => Some(ProviderKind::OpenAi),
            "anthropic" => Some(ProviderKind::Anthropic),
            "gemini" => Some(ProviderKind::Gemini),
            "ollama" => Some(ProviderKind::Ollama),
            _ => None,
        }
    }

    /// Environment variable consulted when no explicit key is given
    pub fn env_key(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::Gemini => Some("GEMINI_API_KEY"),
            ProviderKind::Ollama => None,
        }
    }

    /// Local providers run on-host and need no credential
    pub fn requires_credential(&self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
            ProviderKind::Ollama => "http://127.0.0.1:11434",
        }
    }
}

/// Failures between us and a provider
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("no credential for {0}; pass apiKey or set the provider's environment variable")]
    MissingCredential(&'static str),

    #[error("provider request failed: {0}")]
    Http(String),

    #[error("provider request timed out")]
    Timeout,

    #[error("provider returned status {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("could not parse an action from the response: {0}")]
    Unparseable(String),
}

/// Result of a credential probe; never an Err, the outcome carries it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOutcome {
    pub ok: bool,
    pub status: u16,
    pub message: String,
}

/// One action request to a provider
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub provider: ProviderKind,
    pub model: String,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub system: String,
    pub user: String,
}

/// A sanitized proposal parsed out of a completion
#[derive(Debug, Clone)]
pub struct Proposal {
    pub action: Action,
    pub reason: Option<String>,
    pub confidence: Option<f64>,
}

/// The capability the driver and the verify endpoint program against
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn verify(
        &self,
        provider: ProviderKind,
        api_key: Option<&str>,
        endpoint: Option<&str>,
    ) -> VerifyOutcome;

    async fn request_action(&self, request: &ProviderRequest) -> Result<Proposal, ProviderError>;
}

/// Extract the first JSON object from completion text and sanitize it
/// into a [`Proposal`]: known action names only, unknown payload fields
/// dropped on the floor.
pub fn parse_proposal(text: &str) -> Result<Proposal, ProviderError> {
    let start = text
        .find('{')
        .ok_or_else(|| ProviderError::Unparseable("no JSON object in response".to_string()))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| ProviderError::Unparseable("unterminated JSON object".to_string()))?;
    if end < start {
        return Err(ProviderError::Unparseable(
            "unterminated JSON object".to_string(),
        ));
    }

    let value: Value = serde_json::from_str(&text[start..=end])
        .map_err(|e| ProviderError::Unparseable(e.to_string()))?;

    let name = value
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::Unparseable("missing \"action\" field".to_string()))?;
    let payload = value.get("payload").cloned().unwrap_or(Value::Null);

    let action = Action::from_parts(name, &payload)
        .map_err(|e| ProviderError::Unparseable(e.to_string()))?;

    Ok(Proposal {
        action,
        reason: value
            .get("reason")
            .and_then(Value::as_str)
            .map(str::to_string),
        confidence: value.get("confidence").and_then(Value::as_f64),
    })
}

/// Production client over `reqwest`
pub struct HttpProviderClient {
    http: reqwest::Client,
}

impl HttpProviderClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    fn resolve_key(provider: ProviderKind, explicit: Option<&str>) -> Option<String> {
        if let Some(key) = explicit {
            if !key.is_empty() {
                return Some(key.to_string());
            }
        }
        provider
            .env_key()
            .and_then(|name| std::env::var(name).ok())
            .filter(|v| !v.is_empty())
    }

    fn probe(
        &self,
        provider: ProviderKind,
        base: &str,
        key: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let key = key.unwrap_or_default();
        match provider {
            ProviderKind::OpenAi => self
                .http
                .get(format!("{base}/models"))
                .bearer_auth(key),
            ProviderKind::Anthropic => self
                .http
                .get(format!("{base}/v1/models"))
                .header("x-api-key", key)
                .header("anthropic-version", "2023-06-01"),
            ProviderKind::Gemini => self
                .http
                .get(format!("{base}/v1beta/models?key={key}")),
            ProviderKind::Ollama => self.http.get(format!("{base}/api/tags")),
        }
    }

    fn action_request(
        &self,
        request: &ProviderRequest,
        base: &str,
        key: &str,
    ) -> reqwest::RequestBuilder {
        let model = &request.model;
        match request.provider {
            ProviderKind::OpenAi => self
                .http
                .post(format!("{base}/chat/completions"))
                .bearer_auth(key)
                .json(&json!({
                    "model": model,
                    "temperature": 0.2,
                    "messages": [
                        {"role": "system", "content": request.system},
                        {"role": "user", "content": request.user},
                    ],
                })),
            ProviderKind::Anthropic => self
                .http
                .post(format!("{base}/v1/messages"))
                .header("x-api-key", key)
                .header("anthropic-version", "2023-06-01")
                .json(&json!({
                    "model": model,
                    "max_tokens": 512,
                    "system": request.system,
                    "messages": [{"role": "user", "content": request.user}],
                })),
            ProviderKind::Gemini => self
                .http
                .post(format!(
                    "{base}/v1beta/models/{model}:generateContent?key={key}"
                ))
                .json(&json!({
                    "contents": [{
                        "parts": [{"text": format!("{}\n\n{}", request.system, request.user)}],
                    }],
                })),
            ProviderKind::Ollama => self
                .http
                .post(format!("{base}/api/chat"))
                .json(&json!({
                    "model": model,
                    "stream": false,
                    "messages": [
                        {"role": "system", "content": request.system},
                        {"role": "user", "content": request.user},
                    ],
                })),
        }
    }

    /// Pull the completion text out of a provider-specific response body
    fn completion_text(provider: ProviderKind, body: &Value) -> Option<String> {
        let text = match provider {
            ProviderKind::OpenAi => body
                .pointer("/choices/0/message/content")?
                .as_str()?,
            ProviderKind::Anthropic => body.pointer("/content/0/text")?.as_str()?,
            ProviderKind::Gemini => body
                .pointer("/candidates/0/content/parts/0/text")?
                .as_str()?,
            ProviderKind::Ollama => body.pointer("/message/content")?.as_str()?,
        };
        Some(text.to_string())
    }
}

impl Default for HttpProviderClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn verify(
        &self,
        provider: ProviderKind,
        api_key: Option<&str>,
        endpoint: Option<&str>,
    ) -> VerifyOutcome {
        let key = Self::resolve_key(provider, api_key);
        if provider.requires_credential() && key.is_none() {
            return VerifyOutcome {
                ok: false,
                status: 401,
                message: format!("no credential for {}", provider.as_str()),
            };
        }

        let base = endpoint.unwrap_or_else(|| provider.default_endpoint());
        let request = self.probe(provider, base, key.as_deref());

        match timeout(VERIFY_TIMEOUT, request.send()).await {
            Err(_) => VerifyOutcome {
                ok: false,
                status: 408,
                message: "verification timed out after 6s".to_string(),
            },
            Ok(Err(e)) => VerifyOutcome {
                ok: false,
                status: 0,
                message: format!("provider unreachable: {e}"),
            },
            Ok(Ok(response)) => {
                let status = response.status().as_u16();
                VerifyOutcome {
                    ok: response.status().is_success(),
                    status,
                    message: if response.status().is_success() {
                        format!("{} credentials verified", provider.as_str())
                    } else {
                        format!("{} responded with status {status}", provider.as_str())
                    },
                }
            }
        }
    }

    async fn request_action(&self, request: &ProviderRequest) -> Result<Proposal, ProviderError> {
        let key = Self::resolve_key(request.provider, request.api_key.as_deref());
        if request.provider.requires_credential() && key.is_none() {
            return Err(ProviderError::MissingCredential(request.provider.as_str()));
        }

        let base = request
            .endpoint
            .as_deref()
            .unwrap_or_else(|| request.provider.default_endpoint());
        let http_request = self.action_request(request, base, key.as_deref().unwrap_or_default());

        let response = timeout(ACTION_TIMEOUT, http_request.send())
            .await
            .map_err(|_| ProviderError::Timeout)?
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !status.is_success() {
            let mut detail = body_text;
            detail.truncate(300);
            return Err(ProviderError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        let body: Value = serde_json::from_str(&body_text)
            .map_err(|e| ProviderError::Unparseable(e.to_string()))?;
        let text = Self::completion_text(request.provider, &body).ok_or_else(|| {
            ProviderError::Unparseable("response carried no completion text".to_string())
        })?;

        debug!(provider = request.provider.as_str(), "provider completion received");
        parse_proposal(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_proposal_from_prose() {
        let text = r#"I think building a town is best here.
        {"action": "buildTown", "payload": {"nodeId": 17}, "reason": "strong corner", "confidence": 0.8}
        Good luck!"#;

        let proposal = parse_proposal(text).unwrap();
        assert_eq!(proposal.action, Action::BuildTown { node_id: 17 });
        assert_eq!(proposal.reason.as_deref(), Some("strong corner"));
        assert_eq!(proposal.confidence, Some(0.8));
    }

    #[test]
    fn test_parse_proposal_drops_unknown_fields() {
        let text = r#"{"action": "endTurn", "payload": {}, "mood": "bored", "plan": ["x"]}"#;
        let proposal = parse_proposal(text).unwrap();
        assert_eq!(proposal.action, Action::EndTurn);
        assert_eq!(proposal.reason, None);
    }

    #[test]
    fn test_parse_proposal_rejects_unknown_action() {
        let text = r#"{"action": "stealEverything", "payload": {}}"#;
        assert!(matches!(
            parse_proposal(text),
            Err(ProviderError::Unparseable(_))
        ));
    }

    #[test]
    fn test_parse_proposal_rejects_plain_prose() {
        assert!(matches!(
            parse_proposal("I would roll the dice."),
            Err(ProviderError::Unparseable(_))
        ));
    }

    #[test]
    fn test_provider_names_and_credentials() {
        assert_eq!(ProviderKind::from_name("openai"), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::from_name("weird"), None);
        assert!(ProviderKind::OpenAi.requires_credential());
        assert!(!ProviderKind::Ollama.requires_credential());
        assert_eq!(ProviderKind::Gemini.env_key(), Some("GEMINI_API_KEY"));
        assert_eq!(ProviderKind::Ollama.env_key(), None);
    }

    #[tokio::test]
    async fn test_verify_without_credential_fails_fast() {
        let client = HttpProviderClient::new();
        // No key argument and (almost certainly) no env var in CI
        std::env::remove_var("ANTHROPIC_API_KEY");
        let outcome = client.verify(ProviderKind::Anthropic, None, None).await;
        assert!(!outcome.ok);
        assert_eq!(outcome.status, 401);
    }
}
