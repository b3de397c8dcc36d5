//! # lecture-simplifier
//!
//! Mode-driven prompts for academic text, answered by a chat-completion API.
//!
//! ## Usage
//! The crate ships two binaries next to the library:
//!
//! * `lecture-server` serves `POST /process-text` for the browser front end.
//! * `lecture-cli` does the same job on the command line, one text at a time.
//!
//! Both need `OPENAI_API_KEY` (a `.env` file works) and refuse to start without it.
//!
//! ```text
//! $ lecture-cli --mode summarize "The mitochondria is an organelle that produces energy in cells."
//! ```
//!
//! ## Concepts
//! There is not much to it, and that is the point: a request is `(text, mode)`, the answer is a
//! string. Everything in between is explicit and flat.
//!
//! ### Mode and Template
//!
//! A mode is a name like `simplify` or `eli5`. Each mode owns a [prompt template](crate::prompt::PromptTemplate)
//! with exactly one placeholder, `{[text]}`:
//!
//! ```text
//! Summarize the main point of this academic text: {[text]}
//! ```
//!
//! Modes live in a [TemplateSet](crate::modes::TemplateSet). Two sets are built in (the server's
//! and the scripts', they disagree on a few names) and configuration can add or override modes.
//!
//! ### Prompt Builder
//!
//! The [PromptBuilder](crate::builder::PromptBuilder) fills the template of the requested mode with
//! the input text. An unknown mode is handled by an explicit
//! [UnknownModePolicy](crate::builder::UnknownModePolicy): the HTTP surface passes the raw text
//! through, the command line refuses.
//!
//! ### Completion Gateway
//!
//! A [CompletionGateway](crate::gateway::CompletionGateway) takes the prompt and returns generated
//! text. The real one, [OpenAIGateway](crate::gateway::OpenAIGateway), sends a system persona and
//! the prompt, makes exactly one attempt and trims the answer. Tests swap in their own gateway.
//!
//! ### Processor and Surfaces
//!
//! [TextProcessor](crate::processor::TextProcessor) chains the two, and the [server] module puts
//! it behind axum.
//!
//! ## Attribution
//! * `async_openai`: request and response types of the chat-completion API.
//! * `tiktoken-rs`: prompt token counts in [crate::utils::token::tiktoken].

pub mod prompt;
pub mod modes;
pub mod builder;
pub mod gateway;
pub mod processor;
pub mod config;
pub mod server;
pub mod utils;
