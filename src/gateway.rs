//! # Completion Gateway
//!
//! One chat-completion call per prompt: a fixed system persona followed by the built prompt,
//! answered with the first choice's text, trimmed. There is no retry and no caching.

use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
};
use async_openai::Client;
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use log::{debug, error};
use thiserror::Error;
use url::Url;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that processes academic text.";

/// Failure of the upstream completion call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Transport, authentication, non-2xx status or an undecodable body.
    #[error("completion request failed: {0}")]
    Api(#[from] OpenAIError),

    #[error("completion response has no choices")]
    NoChoices,

    #[error("completion response has no text content")]
    EmptyContent,

    #[error("completion service unavailable: {0}")]
    Unavailable(String),
}

/// The ordered pair of messages sent for every prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: prompt.into(),
        }
    }

    /// `[system, user]`, in that order.
    pub fn messages(&self) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(self.system.as_str())
            .build()?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(self.user.as_str())
            .build()?;
        Ok(vec![system.into(), user.into()])
    }

    pub fn into_chat_request(self, model: &str) -> Result<CreateChatCompletionRequest, OpenAIError> {
        CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(self.messages()?)
            .build()
    }
}

/// Text of the first choice with surrounding whitespace removed.
pub fn first_choice_text(response: CreateChatCompletionResponse) -> Result<String, UpstreamError> {
    let choice = response.choices.into_iter().next().ok_or(UpstreamError::NoChoices)?;
    let content = choice.message.content.ok_or(UpstreamError::EmptyContent)?;
    Ok(content.trim().to_string())
}

/// Anything that turns a prompt into generated text.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError>;
}

/// [CompletionGateway] backed by an OpenAI-compatible chat-completion endpoint.
pub struct OpenAIGateway {
    client: Client<OpenAIConfig>,
    model: String,
    system_prompt: String,
}

impl OpenAIGateway {
    pub fn new(api_key: impl Into<String>, api_base: &Url, model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base.as_str().trim_end_matches('/'));
        // a zero elapsed-time budget turns the client's rate-limit retry loop into a single attempt
        let single_attempt = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        let client = Client::with_config(config).with_backoff(single_attempt);
        Self {
            client,
            model: model.into(),
            system_prompt: system_prompt.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

#[async_trait]
impl CompletionGateway for OpenAIGateway {
    async fn complete(&self, prompt: &str) -> Result<String, UpstreamError> {
        let request = CompletionRequest::new(self.system_prompt.as_str(), prompt).into_chat_request(&self.model)?;
        debug!("sending chat completion request to model {}", self.model);
        let response = self.client.chat().create(request).await.map_err(|e| {
            error!("chat completion failed: {}", e);
            UpstreamError::Api(e)
        })?;
        first_choice_text(response)
    }
}

#[cfg(test)]
mod test_gateway {
    use async_openai::types::{ChatCompletionRequestMessage, ChatCompletionRequestUserMessageContent};
    use serde_json::json;

    use super::*;

    fn response_with(choices: serde_json::Value) -> CreateChatCompletionResponse {
        serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-3.5-turbo",
            "choices": choices,
        }))
        .expect("valid completion response")
    }

    #[test]
    fn test_messages_are_system_then_user() {
        let request = CompletionRequest::new(DEFAULT_SYSTEM_PROMPT, "Summarize: x");
        let messages = request.messages().unwrap();
        assert_eq!(2, messages.len());
        match &messages[0] {
            ChatCompletionRequestMessage::System(msg) => assert_eq!(DEFAULT_SYSTEM_PROMPT, msg.content),
            other => panic!("first message should be system, got {other:?}"),
        }
        match &messages[1] {
            ChatCompletionRequestMessage::User(msg) => match &msg.content {
                ChatCompletionRequestUserMessageContent::Text(text) => assert_eq!("Summarize: x", text),
                other => panic!("user content should be text, got {other:?}"),
            },
            other => panic!("second message should be user, got {other:?}"),
        }
    }

    #[test]
    fn test_wire_request_shape() {
        let request = CompletionRequest::new("persona", "prompt").into_chat_request(DEFAULT_MODEL).unwrap();
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!("gpt-3.5-turbo", wire["model"]);
        assert_eq!(json!("system"), wire["messages"][0]["role"]);
        assert_eq!(json!("persona"), wire["messages"][0]["content"]);
        assert_eq!(json!("user"), wire["messages"][1]["role"]);
        assert_eq!(json!("prompt"), wire["messages"][1]["content"]);
        assert!(wire.get("stream").map_or(true, |s| s.is_null() || s == &json!(false)));
    }

    #[test]
    fn test_first_choice_trimmed() {
        let response = response_with(json!([
            {"index": 0, "message": {"role": "assistant", "content": "\n  - Mass and energy are related.\n- E=mc^2 is the formula.  \n"}, "finish_reason": "stop"},
            {"index": 1, "message": {"role": "assistant", "content": "ignored"}, "finish_reason": "stop"}
        ]));
        assert_eq!(
            "- Mass and energy are related.\n- E=mc^2 is the formula.",
            first_choice_text(response).unwrap()
        );
    }

    #[test]
    fn test_whitespace_only_content_becomes_empty() {
        let response = response_with(json!([
            {"index": 0, "message": {"role": "assistant", "content": " \t\n "}, "finish_reason": "stop"}
        ]));
        assert_eq!("", first_choice_text(response).unwrap());
    }

    #[test]
    fn test_missing_choice_or_content() {
        assert!(matches!(first_choice_text(response_with(json!([]))), Err(UpstreamError::NoChoices)));
        let response = response_with(json!([
            {"index": 0, "message": {"role": "assistant", "content": null}, "finish_reason": "stop"}
        ]));
        assert!(matches!(first_choice_text(response), Err(UpstreamError::EmptyContent)));
    }

    #[test]
    fn test_gateway_keeps_configuration() {
        let base = Url::parse("https://api.openai.com/v1").unwrap();
        let gateway = OpenAIGateway::new("sk-test", &base, "gpt-4", "persona");
        assert_eq!("gpt-4", gateway.model());
        assert_eq!("persona", gateway.system_prompt());
    }
}
