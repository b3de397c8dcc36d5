//! # Configuration
//!
//! Settings are resolved once at process start: built-in defaults, then an optional TOML file,
//! then the environment. A missing API key is a startup error, not a first-request error.
//!
//! ```toml
//! model = "gpt-3.5-turbo"
//! bind = "0.0.0.0:8000"
//! allowed_origins = ["http://localhost:5173"]
//! unknown_mode = "strict"
//! templates = "server"
//!
//! [modes]
//! tldr = "Give a one-sentence TL;DR of this academic text: {[text]}"
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::http::HeaderValue;
use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::builder::{PromptBuilder, Surface, UnknownModePolicy};
use crate::gateway::{DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT};
use crate::modes::{TemplatePreset, TemplateSet};
use crate::prompt::errors::PromptError;
use crate::prompt::PromptTemplate;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const API_BASE_ENV: &str = "OPENAI_API_BASE";
pub const MODEL_ENV: &str = "LECTURE_MODEL";
pub const BIND_ENV: &str = "LECTURE_BIND";
pub const ALLOWED_ORIGINS_ENV: &str = "LECTURE_ALLOWED_ORIGINS";
pub const UNKNOWN_MODE_ENV: &str = "LECTURE_UNKNOWN_MODE";
pub const TEMPLATES_ENV: &str = "LECTURE_TEMPLATES";

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &["http://localhost:5173", "https://codygrandt.github.io"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is not set, the completion service needs an API key")]
    MissingApiKey,

    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid completion API base url `{value}`: {source}")]
    InvalidApiBase {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid bind address `{0}`")]
    InvalidBind(String),

    #[error("invalid allowed origin `{0}`")]
    InvalidOrigin(String),

    #[error("{0}")]
    InvalidValue(String),

    #[error(transparent)]
    Template(#[from] PromptError),
}

/// The TOML file layout. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub bind: Option<String>,
    pub allowed_origins: Option<Vec<String>>,
    pub unknown_mode: Option<UnknownModePolicy>,
    pub templates: Option<TemplatePreset>,
    pub modes: IndexMap<String, String>,
}

impl FileConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub api_base: Url,
    pub model: String,
    pub system_prompt: String,
    pub bind: SocketAddr,
    pub allowed_origins: Vec<String>,
    pub modes: ModeSettings,
}

/// Everything that shapes prompts. Needs no credentials.
#[derive(Debug, Clone, Default)]
pub struct ModeSettings {
    /// `None` means the default of whichever surface builds the prompts.
    pub unknown_mode: Option<UnknownModePolicy>,
    /// `None` means the default of whichever surface builds the prompts.
    pub templates: Option<TemplatePreset>,
    /// Extra or overriding mode templates.
    pub extra: IndexMap<String, String>,
}

impl ModeSettings {
    /// Mode settings from the optional TOML file at `path` and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => FileConfig::from_path(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file.unknown_mode, file.templates, file.modes, |key| std::env::var(key).ok())
    }

    fn resolve(
        unknown_mode: Option<UnknownModePolicy>,
        templates: Option<TemplatePreset>,
        extra: IndexMap<String, String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let unknown_mode = match non_blank(&env, UNKNOWN_MODE_ENV) {
            Some(policy) => Some(policy.parse::<UnknownModePolicy>().map_err(ConfigError::InvalidValue)?),
            None => unknown_mode,
        };
        let templates = match non_blank(&env, TEMPLATES_ENV) {
            Some(preset) => Some(preset.parse::<TemplatePreset>().map_err(ConfigError::InvalidValue)?),
            None => templates,
        };
        let settings = ModeSettings {
            unknown_mode,
            templates,
            extra,
        };
        // surface the template errors at startup
        settings.template_set(TemplatePreset::Server)?;
        Ok(settings)
    }

    /// Replace the preset and the policy where `Some`.
    pub fn override_with(&mut self, templates: Option<TemplatePreset>, unknown_mode: Option<UnknownModePolicy>) {
        if templates.is_some() {
            self.templates = templates;
        }
        if unknown_mode.is_some() {
            self.unknown_mode = unknown_mode;
        }
    }

    fn template_set(&self, default_preset: TemplatePreset) -> Result<TemplateSet, ConfigError> {
        let mut templates = TemplateSet::preset(self.templates.unwrap_or(default_preset));
        for (mode, template) in &self.extra {
            templates.insert(mode.clone(), PromptTemplate::new(template.as_str()))?;
        }
        Ok(templates)
    }

    /// The prompt builder for `surface`, with configured overrides applied.
    pub fn prompt_builder(&self, surface: Surface) -> Result<PromptBuilder, ConfigError> {
        let templates = self.template_set(surface.default_preset())?;
        let policy = self.unknown_mode.unwrap_or(surface.default_policy());
        Ok(PromptBuilder::new(templates, policy))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base.as_str())
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .field("bind", &self.bind)
            .field("allowed_origins", &self.allowed_origins)
            .field("modes", &self.modes)
            .finish()
    }
}

impl Config {
    /// Load the optional TOML file at `path` and overlay the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => FileConfig::from_path(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge `file` with the variables visible through `env`. The environment wins.
    pub fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let lookup = |key: &str| non_blank(&env, key);

        let api_key = lookup(API_KEY_ENV)
            .or(file.api_key.filter(|k| !k.trim().is_empty()))
            .ok_or(ConfigError::MissingApiKey)?;

        let api_base = lookup(API_BASE_ENV)
            .or(file.api_base)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = Url::parse(&api_base).map_err(|source| ConfigError::InvalidApiBase {
            value: api_base.clone(),
            source,
        })?;

        let bind = lookup(BIND_ENV)
            .or(file.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind.parse().map_err(|_| ConfigError::InvalidBind(bind.clone()))?;

        let allowed_origins = match lookup(ALLOWED_ORIGINS_ENV) {
            Some(list) => split_list(&list),
            None => file
                .allowed_origins
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect()),
        };
        if let Some(origin) = allowed_origins.iter().find(|o| HeaderValue::from_str(o).is_err()) {
            return Err(ConfigError::InvalidOrigin(origin.clone()));
        }

        let modes = ModeSettings::resolve(file.unknown_mode, file.templates, file.modes, &env)?;

        Ok(Config {
            api_key,
            api_base,
            model: lookup(MODEL_ENV).or(file.model).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            system_prompt: file.system_prompt.unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            bind,
            allowed_origins,
            modes,
        })
    }

    pub fn prompt_builder(&self, surface: Surface) -> Result<PromptBuilder, ConfigError> {
        self.modes.prompt_builder(surface)
    }
}

fn non_blank(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
