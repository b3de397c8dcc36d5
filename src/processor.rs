//! # Text processor
//!
//! `(text, mode)` in, generated text out: the [PromptBuilder] shapes the prompt and a
//! [CompletionGateway] answers it. Every call is independent; nothing is shared between calls
//! except the read-only builder and the gateway's client.

use std::sync::Arc;

use log::{debug, warn};
use thiserror::Error;

use crate::builder::{PromptBuilder, Surface};
use crate::config::{Config, ConfigError};
use crate::gateway::{CompletionGateway, OpenAIGateway, UpstreamError};
use crate::prompt::errors::PromptError;
use crate::utils::token::tiktoken::Tiktoken;
use crate::utils::token::CountToken;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

pub struct TextProcessor {
    builder: PromptBuilder,
    gateway: Arc<dyn CompletionGateway>,
    tokenizer: Option<Tiktoken>,
}

impl TextProcessor {
    pub fn new(builder: PromptBuilder, gateway: Arc<dyn CompletionGateway>) -> Self {
        Self {
            builder,
            gateway,
            tokenizer: None,
        }
    }

    /// Count prompt tokens before each call, for logging only.
    pub fn with_tokenizer(mut self, tokenizer: Tiktoken) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// The processor the binaries run: OpenAI gateway, configured templates, best-effort tokenizer.
    pub fn from_config(config: &Config, surface: Surface) -> Result<Self, ConfigError> {
        let builder = config.prompt_builder(surface)?;
        let gateway = OpenAIGateway::new(
            config.api_key.as_str(),
            &config.api_base,
            config.model.as_str(),
            config.system_prompt.as_str(),
        );
        let processor = Self::new(builder, Arc::new(gateway));
        Ok(match Tiktoken::new(config.model.as_str()) {
            Ok(tokenizer) => processor.with_tokenizer(tokenizer),
            Err(e) => {
                warn!("token counting disabled: {}", e);
                processor
            }
        })
    }

    pub fn builder(&self) -> &PromptBuilder {
        &self.builder
    }

    /// Build the prompt for `text` in `mode` and send it upstream once.
    pub async fn process(&self, text: &str, mode: &str) -> Result<String, ProcessError> {
        let prompt = self.builder.build(mode, text)?;
        if let Some(tokenizer) = &self.tokenizer {
            let tokens = tokenizer.count_token(&prompt);
            debug!("prompt for mode `{}` has {} tokens", mode, tokens);
            if let Some(window) = tokenizer.context_window() {
                if tokens > window {
                    warn!("prompt has {} tokens, more than the {} of model {}", tokens, window, tokenizer.model);
                }
            }
        }
        Ok(self.gateway.complete(&prompt).await?)
    }
}
