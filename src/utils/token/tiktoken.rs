use std::collections::HashMap;

use anyhow::Result;
use lazy_static::lazy_static;
use log::warn;
pub use tiktoken_rs::{cl100k_base, get_bpe_from_model, CoreBPE};

use crate::utils::token::CountToken;

lazy_static! {
    /// const map from model name to context window size.
    pub static ref MODEL_TO_MAX_TOKENS: HashMap<&'static str, usize> = HashMap::from([
        ("gpt-4", 8192),
        ("gpt-4-0613", 8192),
        ("gpt-4-32k", 32768),
        ("gpt-4-32k-0613", 32768),
        ("gpt-3.5-turbo", 4096),
        ("gpt-3.5-turbo-16k", 16384),
        ("gpt-3.5-turbo-0613", 4096),
        ("gpt-3.5-turbo-16k-0613", 16384),
    ]);
}

/// Counter using the Tiktoken tokenizer.
#[derive(Clone)]
#[readonly::make]
pub struct Tiktoken {
    /// The model name the counter was created for. read-only.
    #[readonly]
    pub model: String,
    /// The tokenizer. read-only.
    #[readonly]
    pub bpe: CoreBPE,
}

impl Tiktoken {
    /// Create a counter for `model`. Models unknown to tiktoken get the `cl100k_base` encoding.
    pub fn new(model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        let bpe = match get_bpe_from_model(&model) {
            Ok(bpe) => bpe,
            Err(e) => {
                warn!("no tokenizer registered for model {}, counting with cl100k_base: {}", model, e);
                cl100k_base()?
            }
        };
        Ok(Tiktoken { model, bpe })
    }

    /// Context window of the model, if it is a known OpenAI chat model.
    pub fn context_window(&self) -> Option<usize> {
        MODEL_TO_MAX_TOKENS.get(self.model.as_str()).copied()
    }
}

impl CountToken for Tiktoken {
    fn count_token(&self, string: &str) -> usize {
        self.bpe.encode_with_special_tokens(string).len()
    }
}
