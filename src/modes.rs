//! # Modes
//!
//! A mode is a named transformation style (simplify, summarize, ...) that selects which prompt
//! template wraps the user's text. The mapping is open: [TemplateSet] starts from one of the
//! built-in [TemplatePreset]s and can be extended or overridden from configuration.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::prompt::errors::PromptError;
use crate::prompt::PromptTemplate;

/// The one placeholder every mode template must contain.
pub const TEXT_PLACEHOLDER: &str = "text";

const SERVER_TEMPLATES: &[(&str, &str)] = &[
    ("simplify", "Simplify this academic sentence so a middle school student can understand it: {[text]}"),
    ("summarize", "Summarize the main point of this academic text: {[text]}"),
    ("bullet", "Turn this academic text into concise bullet points: {[text]}"),
    ("complexify", "Rewrite this sentence in a more advanced, formal, and academic tone: {[text]}"),
    ("question", "Create 1–2 comprehension questions based on this academic sentence: {[text]}"),
    ("define", "Extract and define any key academic terms in this text: {[text]}"),
    ("explain_like_im_5", "Explain this concept like I'm five: {[text]}"),
];

const SCRIPT_TEMPLATES: &[(&str, &str)] = &[
    ("simplify", "Simplify this academic sentence so a middle school student can understand it: {[text]}"),
    ("summarize", "Summarize the main point of this academic text: {[text]}"),
    ("bullet", "Turn this academic text into concise bullet points: {[text]}"),
    ("complexify", "Rewrite this sentence in a more advanced, formal, and academic tone: {[text]}"),
    ("question", "Generate a few quiz-style questions based on this academic text: {[text]}"),
    ("definition", "Identify any key terms in the following and provide simple definitions: {[text]}"),
    ("eli5", "Explain this as if I'm five years old: {[text]}"),
];

/// Built-in template sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplatePreset {
    /// The set served over HTTP: `define` and `explain_like_im_5`.
    Server,
    /// The set of the command-line scripts: `definition` and `eli5`.
    Script,
}

impl TemplatePreset {
    fn entries(self) -> &'static [(&'static str, &'static str)] {
        match self {
            TemplatePreset::Server => SERVER_TEMPLATES,
            TemplatePreset::Script => SCRIPT_TEMPLATES,
        }
    }
}

impl FromStr for TemplatePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" => Ok(TemplatePreset::Server),
            "script" => Ok(TemplatePreset::Script),
            other => Err(format!("unknown template preset `{other}`, expected `server` or `script`")),
        }
    }
}

impl fmt::Display for TemplatePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplatePreset::Server => f.write_str("server"),
            TemplatePreset::Script => f.write_str("script"),
        }
    }
}

/// Ordered mapping from mode name to its prompt template.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: IndexMap<String, PromptTemplate>,
}

impl TemplateSet {
    /// An empty set; every mode is unknown.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preset(preset: TemplatePreset) -> Self {
        let templates = preset
            .entries()
            .iter()
            .map(|(mode, template)| (mode.to_string(), PromptTemplate::new(*template)))
            .collect();
        Self { templates }
    }

    /// Add or replace the template of `mode`, returning the replaced one.
    ///
    /// The template must contain the `{[text]}` placeholder and no other.
    pub fn insert(&mut self, mode: impl Into<String>, template: PromptTemplate) -> Result<Option<PromptTemplate>, PromptError> {
        let mode = mode.into();
        let only_text = template.placeholders.len() == 1 && template.placeholders.contains(TEXT_PLACEHOLDER);
        if !only_text {
            let mut found: Vec<String> = template.placeholders.iter().cloned().collect();
            found.sort();
            return Err(PromptError::InvalidTemplate { mode, found });
        }
        Ok(self.templates.insert(mode, template))
    }

    #[inline]
    pub fn get(&self, mode: &str) -> Option<&PromptTemplate> {
        self.templates.get(mode)
    }

    #[inline]
    pub fn contains(&self, mode: &str) -> bool {
        self.templates.contains_key(mode)
    }

    /// Mode names in insertion order.
    pub fn modes(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Display label for a mode: first character upper-cased, underscores turned into spaces.
pub fn mode_label(mode: &str) -> String {
    let mut chars = mode.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>().replace('_', " "),
        None => String::new(),
    }
}

/// Command-line label for a mode: first character upper-cased, the rest lower-cased.
pub fn capitalize_mode(mode: &str) -> String {
    let mut chars = mode.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
