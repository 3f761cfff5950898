use crate::callbacks::Callbacks;
use crate::caching::inject_prompt_caching;
use crate::errors::{AgentError, AgentResult};
use crate::images::filter_to_n_most_recent_images;
use crate::models::content::{CacheControl, Content, TextContent};
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::prompt_template::system_prompt;
use crate::providers::base::{MessagesRequest, Provider, MAX_CACHE_BREAKPOINTS};
use crate::providers::factory::ApiProvider;
use crate::tools::{ToolCollection, ToolResult};
use crate::translate::{make_tool_result, response_to_params};

pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Per-run settings of the sampling loop
#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    pub model: String,
    pub provider: ApiProvider,
    /// Appended to the generated system prompt
    pub system_prompt_suffix: String,
    /// Keep roughly this many tool result images; `None` keeps them all
    pub only_n_most_recent_images: Option<usize>,
    pub max_tokens: u32,
}

impl LoopConfig {
    pub fn new<S: Into<String>>(model: S, provider: ApiProvider) -> Self {
        Self {
            model: model.into(),
            provider,
            system_prompt_suffix: String::new(),
            only_n_most_recent_images: None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_system_prompt_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.system_prompt_suffix = suffix.into();
        self
    }

    pub fn with_only_n_most_recent_images(mut self, images: Option<usize>) -> Self {
        self.only_n_most_recent_images = images;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Agent drives a model through repeated tool use until it stops asking for tools
pub struct Agent {
    provider: Box<dyn Provider>,
    tools: ToolCollection,
}

impl Agent {
    pub fn new(provider: Box<dyn Provider>, tools: ToolCollection) -> Self {
        Self { provider, tools }
    }

    pub fn tools(&self) -> &ToolCollection {
        &self.tools
    }

    fn system_block(&self, config: &LoopConfig, caching: bool) -> AgentResult<Content> {
        let text = system_prompt(&config.system_prompt_suffix)
            .map_err(|e| AgentError::Prompt(e.to_string()))?;
        Ok(Content::Text(TextContent {
            text,
            cache_control: caching.then_some(CacheControl::Ephemeral),
        }))
    }

    /// Run the conversation forward until the model answers without requesting a tool.
    ///
    /// A failed backend call is reported through `callbacks.api_response` and ends the
    /// loop normally, returning the conversation as it stood. Only local faults such as
    /// a mismatched provider or an unrenderable system prompt are returned as errors.
    pub async fn sampling_loop(
        &self,
        config: &LoopConfig,
        mut messages: Vec<Message>,
        callbacks: &Callbacks<'_>,
    ) -> AgentResult<Vec<Message>> {
        if config.provider != self.provider.kind() {
            return Err(AgentError::InvalidConfig(format!(
                "Loop configured for {} but the client talks to {}",
                config.provider,
                self.provider.kind()
            )));
        }

        let profile = config.provider.profile();
        let system = vec![self.system_block(config, profile.prompt_caching)?];
        let tools = self.tools.to_params();

        loop {
            if profile.prompt_caching {
                inject_prompt_caching(&mut messages);
            }
            filter_to_n_most_recent_images(
                &mut messages,
                config.only_n_most_recent_images,
                profile.image_truncation_threshold,
            );

            let outcome = {
                let request = MessagesRequest {
                    model: &config.model,
                    max_tokens: config.max_tokens,
                    system: &system,
                    tools: &tools,
                    messages: &messages,
                    betas: profile.betas,
                };
                let found = request.cache_breakpoints();
                if found > MAX_CACHE_BREAKPOINTS {
                    return Err(AgentError::CacheBudgetExceeded {
                        found,
                        limit: MAX_CACHE_BREAKPOINTS,
                    });
                }
                self.provider.complete(&request).await
            };

            let completion = match outcome {
                Ok(completion) => completion,
                Err(failure) => {
                    callbacks.api_response.on_api_response(
                        &failure.exchange.request,
                        failure.exchange.response.as_ref(),
                        Some(&failure.error),
                    );
                    return Ok(messages);
                }
            };
            callbacks.api_response.on_api_response(
                &completion.exchange.request,
                completion.exchange.response.as_ref(),
                None,
            );

            let content = response_to_params(&completion.response);
            let mut tool_results = Vec::new();
            for block in &content {
                callbacks.content.on_content(block);
                if let MessageContent::ToolUse(tool_use) = block {
                    let result = self
                        .tools
                        .run(&tool_use.name, tool_use.input.clone())
                        .await
                        .unwrap_or_else(ToolResult::from);
                    tool_results.push(make_tool_result(&result, &tool_use.id));
                    callbacks.tool_result.on_tool_result(&result, &tool_use.id);
                }
            }

            messages.push(Message {
                role: Role::Assistant,
                content,
            });

            if tool_results.is_empty() {
                return Ok(messages);
            }
            messages.push(Message {
                role: Role::User,
                content: tool_results.into_iter().map(MessageContent::from).collect(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::Discard;
    use crate::errors::{ProviderError, ToolError};
    use crate::models::tool::ToolParam;
    use crate::providers::base::{RawRequest, RawResponse};
    use crate::providers::mock::{text, tool_use, MockProvider};
    use crate::tools::Tool;
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    const MODEL: &str = "claude-3-5-sonnet-20241022";

    /// Answers every call with a fixed listing
    struct ListTool;

    #[async_trait]
    impl Tool for ListTool {
        fn name(&self) -> &str {
            "bash"
        }

        fn to_params(&self) -> ToolParam {
            ToolParam::new("bash", "Run a command", json!({"type": "object"}))
        }

        async fn call(&self, _input: Value) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::output("file.txt"))
        }
    }

    /// Returns one screenshot per call
    struct ScreenshotTool;

    #[async_trait]
    impl Tool for ScreenshotTool {
        fn name(&self) -> &str {
            "screenshot"
        }

        fn to_params(&self) -> ToolParam {
            ToolParam::new("screenshot", "Capture the screen", json!({"type": "object"}))
        }

        async fn call(&self, input: Value) -> Result<ToolResult, ToolError> {
            let n = input["n"].as_u64().unwrap_or(0);
            Ok(ToolResult::output(format!("shot {}", n)).with_image(format!("png-{}", n)))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "broken"
        }

        fn to_params(&self) -> ToolParam {
            ToolParam::new("broken", "Always fails", json!({"type": "object"}))
        }

        async fn call(&self, _input: Value) -> Result<ToolResult, ToolError> {
            Err(ToolError::ExecutionError("disk on fire".into()))
        }
    }

    fn tools() -> ToolCollection {
        ToolCollection::new()
            .with_tool(Box::new(ListTool))
            .and_then(|tools| tools.with_tool(Box::new(ScreenshotTool)))
            .and_then(|tools| tools.with_tool(Box::new(FailingTool)))
            .unwrap()
    }

    /// Records every callback invocation as a line of text
    #[derive(Default, Clone)]
    struct Recorder {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl crate::callbacks::ContentSink for Recorder {
        fn on_content(&self, block: &MessageContent) {
            match block {
                MessageContent::Text(text) => self.push(format!("content:{}", text.text)),
                MessageContent::ToolUse(tool_use) => self.push(format!("tool_use:{}", tool_use.id)),
                _ => self.push("content:other".into()),
            }
        }
    }

    impl crate::callbacks::ToolResultSink for Recorder {
        fn on_tool_result(&self, result: &ToolResult, tool_use_id: &str) {
            let text = result.error.as_ref().or(result.output.as_ref());
            self.push(format!(
                "tool_result:{}:{}",
                tool_use_id,
                text.map(String::as_str).unwrap_or("")
            ));
        }
    }

    impl crate::callbacks::ApiTraceSink for Recorder {
        fn on_api_response(
            &self,
            _request: &RawRequest,
            response: Option<&RawResponse>,
            error: Option<&ProviderError>,
        ) {
            self.push(format!(
                "api:{}:{}",
                response.map(|r| r.status.to_string()).unwrap_or("none".into()),
                error.map(|e| e.to_string()).unwrap_or("ok".into())
            ));
        }
    }

    fn count_markers(value: &Value) -> usize {
        match value {
            Value::Object(map) => {
                usize::from(map.contains_key("cache_control"))
                    + map.values().map(count_markers).sum::<usize>()
            }
            Value::Array(items) => items.iter().map(count_markers).sum(),
            _ => 0,
        }
    }

    fn image_blocks(value: &Value) -> usize {
        match value {
            Value::Object(map) => {
                usize::from(map.get("type") == Some(&json!("image")))
                    + map.values().map(image_blocks).sum::<usize>()
            }
            Value::Array(items) => items.iter().map(image_blocks).sum(),
            _ => 0,
        }
    }

    #[tokio::test]
    async fn test_text_only_response_finishes() -> Result<()> {
        let provider = MockProvider::new(ApiProvider::Anthropic, vec![Ok(vec![text("All done.")])]);
        let agent = Agent::new(Box::new(provider), tools());
        let recorder = Recorder::default();
        let callbacks = Callbacks::new(&recorder, &recorder, &recorder);

        let input = vec![Message::user().with_text("Hi")];
        let messages = agent
            .sampling_loop(&LoopConfig::new(MODEL, ApiProvider::Anthropic), input, &callbacks)
            .await?;

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1], Message::assistant().with_text("All done."));
        assert_eq!(recorder.events(), vec!["api:200:ok", "content:All done."]);
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_use_round_trip() -> Result<()> {
        let provider = MockProvider::new(
            ApiProvider::Anthropic,
            vec![
                Ok(vec![
                    text("Listing files."),
                    tool_use("t1", "bash", json!({"command": "ls"})),
                ]),
                Ok(vec![text("There is one file.")]),
            ],
        );
        let requests = provider.requests();
        let agent = Agent::new(Box::new(provider), tools());
        let recorder = Recorder::default();
        let callbacks = Callbacks::new(&recorder, &recorder, &recorder);

        let input = vec![Message::user().with_text("What is here?")];
        let messages = agent
            .sampling_loop(&LoopConfig::new(MODEL, ApiProvider::Anthropic), input, &callbacks)
            .await?;

        assert_eq!(messages.len(), 4);
        let results = &messages[2];
        assert_eq!(results.role, Role::User);
        assert_eq!(results.content.len(), 1);
        let block = results.content[0].as_tool_result().unwrap();
        assert_eq!(block.tool_use_id, "t1");
        assert!(!block.is_error);
        assert_eq!(block.content, vec![Content::text("file.txt")]);

        assert_eq!(
            recorder.events(),
            vec![
                "api:200:ok",
                "content:Listing files.",
                "tool_use:t1",
                "tool_result:t1:file.txt",
                "api:200:ok",
                "content:There is one file.",
            ]
        );

        // the second call carries the tool result back to the model
        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1]["messages"][2]["content"][0]["type"], "tool_result");
        assert_eq!(requests[1]["messages"][2]["content"][0]["tool_use_id"], "t1");
        Ok(())
    }

    #[tokio::test]
    async fn test_transport_error_terminates() -> Result<()> {
        let provider = MockProvider::new(
            ApiProvider::Anthropic,
            vec![Err(ProviderError::Transport("connection refused".into()))],
        );
        let agent = Agent::new(Box::new(provider), tools());
        let recorder = Recorder::default();
        let callbacks = Callbacks::new(&recorder, &recorder, &recorder);

        let input = vec![Message::user().with_text("Hi")];
        let messages = agent
            .sampling_loop(&LoopConfig::new(MODEL, ApiProvider::Anthropic), input, &callbacks)
            .await?;

        assert_eq!(messages.len(), 1);
        assert_eq!(
            recorder.events(),
            vec!["api:none:Request failed: connection refused"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_api_error_after_tool_round() -> Result<()> {
        let provider = MockProvider::new(
            ApiProvider::Anthropic,
            vec![
                Ok(vec![tool_use("t1", "bash", json!({"command": "ls"}))]),
                Err(ProviderError::Api {
                    status: 529,
                    body: "overloaded".into(),
                }),
            ],
        );
        let agent = Agent::new(Box::new(provider), tools());
        let recorder = Recorder::default();
        let callbacks = Callbacks::new(&recorder, &recorder, &recorder);

        let messages = agent
            .sampling_loop(
                &LoopConfig::new(MODEL, ApiProvider::Anthropic),
                vec![Message::user().with_text("Hi")],
                &callbacks,
            )
            .await?;

        // the tool round survives, nothing is appended for the failed call
        assert_eq!(messages.len(), 3);
        assert_eq!(
            recorder.events().last().map(String::as_str),
            Some("api:529:Request failed: 529 - overloaded")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_tools_run_in_requested_order() -> Result<()> {
        let provider = MockProvider::new(
            ApiProvider::Anthropic,
            vec![Ok(vec![
                tool_use("t1", "screenshot", json!({"n": 1})),
                tool_use("t2", "bash", json!({"command": "ls"})),
                tool_use("t3", "screenshot", json!({"n": 3})),
            ])],
        );
        let agent = Agent::new(Box::new(provider), tools());
        let recorder = Recorder::default();
        let callbacks = Callbacks::new(&recorder, &recorder, &recorder);

        let messages = agent
            .sampling_loop(
                &LoopConfig::new(MODEL, ApiProvider::Anthropic),
                vec![Message::user().with_text("Go")],
                &callbacks,
            )
            .await?;

        let ids: Vec<&str> = messages[2]
            .content
            .iter()
            .filter_map(MessageContent::as_tool_result)
            .map(|block| block.tool_use_id.as_str())
            .collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);

        let results: Vec<String> = recorder
            .events()
            .into_iter()
            .filter(|event| event.starts_with("tool_result"))
            .collect();
        assert_eq!(
            results,
            vec![
                "tool_result:t1:shot 1",
                "tool_result:t2:file.txt",
                "tool_result:t3:shot 3",
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_failures_become_error_results() -> Result<()> {
        let provider = MockProvider::new(
            ApiProvider::Anthropic,
            vec![Ok(vec![
                tool_use("t1", "computer", json!({"action": "screenshot"})),
                tool_use("t2", "broken", json!({})),
            ])],
        );
        let agent = Agent::new(Box::new(provider), tools());

        let messages = agent
            .sampling_loop(
                &LoopConfig::new(MODEL, ApiProvider::Anthropic),
                vec![Message::user().with_text("Go")],
                &Callbacks::default(),
            )
            .await?;

        let unknown = messages[2].content[0].as_tool_result().unwrap();
        assert!(unknown.is_error);
        assert_eq!(unknown.content, vec![Content::text("Tool computer is invalid")]);

        let broken = messages[2].content[1].as_tool_result().unwrap();
        assert!(broken.is_error);
        assert_eq!(broken.content, vec![Content::text("disk on fire")]);
        Ok(())
    }

    #[tokio::test]
    async fn test_cache_breakpoints_stay_within_budget() -> Result<()> {
        let mut script: Vec<_> = (0..6)
            .map(|i| Ok(vec![tool_use(&format!("t{}", i), "bash", json!({"command": "ls"}))]))
            .collect();
        script.push(Ok(vec![text("done")]));
        let provider = MockProvider::new(ApiProvider::Anthropic, script);
        let requests = provider.requests();
        let agent = Agent::new(Box::new(provider), tools());

        let messages = agent
            .sampling_loop(
                &LoopConfig::new(MODEL, ApiProvider::Anthropic),
                vec![Message::user().with_text("Go")],
                &Callbacks::default(),
            )
            .await?;
        assert_eq!(messages.len(), 14);

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 7);
        for (i, request) in requests.iter().enumerate() {
            assert_eq!(request["system"][0]["cache_control"]["type"], "ephemeral");
            let total = count_markers(request);
            assert!(total <= MAX_CACHE_BREAKPOINTS);
            assert_eq!(total, 1 + (i + 1).min(3));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_cloud_providers_skip_cache_markers() -> Result<()> {
        let provider = MockProvider::new(
            ApiProvider::Vertex,
            vec![
                Ok(vec![tool_use("t1", "bash", json!({"command": "ls"}))]),
                Ok(vec![text("done")]),
            ],
        );
        let requests = provider.requests();
        let agent = Agent::new(Box::new(provider), tools());

        agent
            .sampling_loop(
                &LoopConfig::new(MODEL, ApiProvider::Vertex),
                vec![Message::user().with_text("Go")],
                &Callbacks::default(),
            )
            .await?;

        for request in requests.lock().unwrap().iter() {
            assert_eq!(count_markers(request), 0);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_old_screenshots_are_pruned_in_chunks() -> Result<()> {
        let mut script: Vec<_> = (0..12)
            .map(|i| Ok(vec![tool_use(&format!("t{}", i), "screenshot", json!({"n": i}))]))
            .collect();
        script.push(Ok(vec![text("done")]));
        let provider = MockProvider::new(ApiProvider::Bedrock, script);
        let requests = provider.requests();
        let agent = Agent::new(Box::new(provider), tools());

        let config =
            LoopConfig::new(MODEL, ApiProvider::Bedrock).with_only_n_most_recent_images(Some(2));
        let messages = agent
            .sampling_loop(&config, vec![Message::user().with_text("Go")], &Callbacks::default())
            .await?;

        let requests = requests.lock().unwrap();
        assert_eq!(image_blocks(&requests[11]), 11);
        assert_eq!(image_blocks(&requests[12]), 2);

        // only images were dropped, every turn and its text is still there
        assert_eq!(messages.len(), 26);
        assert_eq!(crate::images::count_tool_result_images(&messages), 2);
        let first = messages[2].content[0].as_tool_result().unwrap();
        assert_eq!(first.content, vec![Content::text("shot 0")]);
        Ok(())
    }

    #[tokio::test]
    async fn test_request_shape() -> Result<()> {
        let provider = MockProvider::new(ApiProvider::Anthropic, vec![Ok(vec![text("ok")])]);
        let requests = provider.requests();
        let agent = Agent::new(Box::new(provider), tools());

        let config = LoopConfig::new(MODEL, ApiProvider::Anthropic)
            .with_system_prompt_suffix("Never open a browser.")
            .with_max_tokens(1024);
        agent
            .sampling_loop(&config, vec![Message::user().with_text("Hi")], &Callbacks::default())
            .await?;

        let requests = requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request["model"], MODEL);
        assert_eq!(request["max_tokens"], 1024);
        let system = request["system"][0]["text"].as_str().unwrap();
        assert!(system.ends_with(" Never open a browser."));
        let tool_names: Vec<&str> = request["tools"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|tool| tool["name"].as_str())
            .collect();
        assert_eq!(tool_names, vec!["bash", "screenshot", "broken"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_provider_mismatch_is_rejected() {
        let provider = MockProvider::new(ApiProvider::Anthropic, vec![]);
        let agent = Agent::new(Box::new(provider), tools());

        let result = agent
            .sampling_loop(
                &LoopConfig::new(MODEL, ApiProvider::Bedrock),
                vec![Message::user().with_text("Hi")],
                &Callbacks::new(&Discard, &Discard, &Discard),
            )
            .await;
        assert!(matches!(result, Err(AgentError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_defaults() {
        let config = LoopConfig::new(MODEL, ApiProvider::Anthropic);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.only_n_most_recent_images, None);
        assert!(config.system_prompt_suffix.is_empty());
    }
}
