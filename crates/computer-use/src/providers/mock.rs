use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use super::base::{
    ApiResponse, Completion, CompletionError, HttpExchange, MessagesRequest, Provider, RawRequest,
    RawResponse, ResponseBlock,
};
use super::factory::ApiProvider;
use crate::errors::ProviderError;

/// A mock provider that returns pre-configured responses and records each request body
pub struct MockProvider {
    kind: ApiProvider,
    responses: Mutex<Vec<Result<Vec<ResponseBlock>, ProviderError>>>,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl MockProvider {
    pub fn new(kind: ApiProvider, responses: Vec<Result<Vec<ResponseBlock>, ProviderError>>) -> Self {
        Self {
            kind,
            responses: Mutex::new(responses),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle to the recorded request bodies
    pub fn requests(&self) -> Arc<Mutex<Vec<Value>>> {
        self.requests.clone()
    }
}

pub fn text(text: &str) -> ResponseBlock {
    ResponseBlock::Text {
        text: text.to_string(),
    }
}

pub fn tool_use(id: &str, name: &str, input: Value) -> ResponseBlock {
    ResponseBlock::ToolUse {
        id: id.to_string(),
        name: name.to_string(),
        input,
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn kind(&self) -> ApiProvider {
        self.kind
    }

    async fn complete(&self, request: &MessagesRequest<'_>) -> Result<Completion, CompletionError> {
        let body = serde_json::to_value(request).unwrap();
        self.requests.lock().unwrap().push(body.clone());

        let raw_request = RawRequest {
            method: "POST".to_string(),
            url: "mock://messages".to_string(),
            headers: Vec::new(),
            body,
        };

        let mut responses = self.responses.lock().unwrap();
        // Return an empty text response once the script runs out
        let next = if responses.is_empty() {
            Ok(vec![text("")])
        } else {
            responses.remove(0)
        };

        match next {
            Ok(content) => {
                let response = ApiResponse {
                    id: "msg_mock".to_string(),
                    model: request.model.to_string(),
                    content,
                    stop_reason: None,
                    usage: Default::default(),
                };
                Ok(Completion {
                    exchange: HttpExchange {
                        request: raw_request,
                        response: Some(RawResponse {
                            status: 200,
                            body: serde_json::to_value(&response).unwrap(),
                        }),
                    },
                    response,
                })
            }
            Err(error) => {
                let response = match &error {
                    ProviderError::Api { status, body } => Some(RawResponse {
                        status: *status,
                        body: json!(body),
                    }),
                    _ => None,
                };
                Err(CompletionError {
                    exchange: HttpExchange {
                        request: raw_request,
                        response,
                    },
                    error,
                })
            }
        }
    }
}
