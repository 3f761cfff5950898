use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::base::{
    ApiResponse, Completion, CompletionError, HttpExchange, MessagesRequest, Provider, RawRequest,
    RawResponse,
};
use super::configs::{ProviderConfig, ANTHROPIC_HOST};
use super::factory::ApiProvider;
use crate::errors::{AgentError, AgentResult, ProviderError};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

const REDACTED: &str = "[redacted]";

/// Messages API client for the direct Anthropic API and the Vertex and Bedrock hosted
/// variants. The variant decides the endpoint, the authentication header and where the
/// API version and beta flags are sent.
pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> AgentResult<Self> {
        match config.provider {
            ApiProvider::Vertex if config.project_id.is_none() || config.region.is_none() => {
                return Err(AgentError::InvalidConfig(
                    "vertex requires a project id and a region".into(),
                ))
            }
            ApiProvider::Bedrock if config.region.is_none() => {
                return Err(AgentError::InvalidConfig("bedrock requires a region".into()))
            }
            _ => {}
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()
            .map_err(|e| AgentError::Internal(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn region(&self) -> &str {
        self.config.region.as_deref().unwrap_or_default()
    }

    fn host(&self) -> String {
        let host = match (&self.config.host, self.config.provider) {
            (Some(host), _) => host.clone(),
            (None, ApiProvider::Anthropic) => ANTHROPIC_HOST.to_string(),
            (None, ApiProvider::Vertex) => {
                format!("https://{}-aiplatform.googleapis.com", self.region())
            }
            (None, ApiProvider::Bedrock) => {
                format!("https://bedrock-runtime.{}.amazonaws.com", self.region())
            }
        };
        host.trim_end_matches('/').to_string()
    }

    fn url(&self, model: &str) -> String {
        let host = self.host();
        match self.config.provider {
            ApiProvider::Anthropic => format!("{}/v1/messages", host),
            ApiProvider::Vertex => format!(
                "{}/v1/projects/{}/locations/{}/publishers/anthropic/models/{}:rawPredict",
                host,
                self.config.project_id.as_deref().unwrap_or_default(),
                self.region(),
                model
            ),
            ApiProvider::Bedrock => format!("{}/model/{}/invoke", host, model),
        }
    }

    /// Headers as sent, paired with whether the value is a credential
    fn headers(&self, betas: &[&str]) -> Vec<(String, String, bool)> {
        let mut headers = Vec::new();
        match self.config.provider {
            ApiProvider::Anthropic => {
                headers.push(("x-api-key".to_string(), self.config.api_key.clone(), true));
                headers.push((
                    "anthropic-version".to_string(),
                    ANTHROPIC_VERSION.to_string(),
                    false,
                ));
                if !betas.is_empty() {
                    headers.push(("anthropic-beta".to_string(), betas.join(","), false));
                }
            }
            ApiProvider::Vertex | ApiProvider::Bedrock => {
                headers.push((
                    "authorization".to_string(),
                    format!("Bearer {}", self.config.api_key),
                    true,
                ));
            }
        }
        headers
    }

    fn body(&self, request: &MessagesRequest<'_>) -> Result<Value, ProviderError> {
        let mut body = serde_json::to_value(request)
            .map_err(|e| ProviderError::InvalidRequest(e.to_string()))?;

        if let (Some(version), Some(object)) = (
            self.config.provider.profile().body_version,
            body.as_object_mut(),
        ) {
            object.remove("model");
            object.insert("anthropic_version".to_string(), json!(version));
            if !request.betas.is_empty() {
                object.insert("anthropic_beta".to_string(), json!(request.betas));
            }
        }
        Ok(body)
    }

    async fn post(&self, request: &MessagesRequest<'_>) -> Result<Completion, CompletionError> {
        let url = self.url(request.model);
        let headers = self.headers(request.betas);

        let mut raw_request = RawRequest {
            method: "POST".to_string(),
            url: url.clone(),
            headers: headers
                .iter()
                .map(|(name, value, secret)| {
                    let value = if *secret { REDACTED.to_string() } else { value.clone() };
                    (name.clone(), value)
                })
                .collect(),
            body: Value::Null,
        };

        let body = match self.body(request) {
            Ok(body) => body,
            Err(error) => {
                return Err(CompletionError {
                    exchange: HttpExchange {
                        request: raw_request,
                        response: None,
                    },
                    error,
                })
            }
        };
        raw_request.body = body.clone();

        let fail = |request: RawRequest,
                    response: Option<RawResponse>,
                    error: ProviderError|
         -> Result<Completion, CompletionError> {
            Err(CompletionError {
                exchange: HttpExchange { request, response },
                error,
            })
        };

        debug!(provider = %self.config.provider, url = %url, "sending messages request");
        let mut builder = self.client.post(&url).json(&body);
        for (name, value, _) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "messages request did not complete");
                return fail(raw_request, None, ProviderError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return fail(raw_request, None, ProviderError::Transport(e.to_string())),
        };
        let body: Value = serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.clone()));
        let raw_response = RawResponse {
            status: status.as_u16(),
            body: body.clone(),
        };

        if !status.is_success() {
            warn!(status = status.as_u16(), "messages request was rejected");
            return fail(
                raw_request,
                Some(raw_response),
                ProviderError::Api {
                    status: status.as_u16(),
                    body: text,
                },
            );
        }

        match serde_json::from_value::<ApiResponse>(body) {
            Ok(response) => Ok(Completion {
                exchange: HttpExchange {
                    request: raw_request,
                    response: Some(raw_response),
                },
                response,
            }),
            Err(e) => fail(
                raw_request,
                Some(raw_response),
                ProviderError::InvalidResponse(e.to_string()),
            ),
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn kind(&self) -> ApiProvider {
        self.config.provider
    }

    async fn complete(&self, request: &MessagesRequest<'_>) -> Result<Completion, CompletionError> {
        self.post(request).await
    }
}
