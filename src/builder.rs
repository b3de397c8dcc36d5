//! # Prompt Builder
//!
//! Turns `(mode, text)` into the prompt sent upstream. Known modes wrap `text` in their template;
//! what happens to unknown modes is an explicit [UnknownModePolicy], chosen per [Surface] and
//! overridable from configuration.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::modes::{TemplatePreset, TemplateSet, TEXT_PLACEHOLDER};
use crate::prompt::errors::PromptError;

/// What [PromptBuilder::build] does with a mode that has no template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownModePolicy {
    /// Send the input text as the prompt, unchanged.
    Passthrough,
    /// Fail with [PromptError::UnknownMode].
    Strict,
}

impl FromStr for UnknownModePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passthrough" => Ok(UnknownModePolicy::Passthrough),
            "strict" => Ok(UnknownModePolicy::Strict),
            other => Err(format!("unknown policy `{other}`, expected `passthrough` or `strict`")),
        }
    }
}

impl fmt::Display for UnknownModePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownModePolicy::Passthrough => f.write_str("passthrough"),
            UnknownModePolicy::Strict => f.write_str("strict"),
        }
    }
}

/// The deployment surface a builder is made for. Each one has its own defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// `POST /process-text`: unknown modes fall back to the raw text.
    Http,
    /// The command line: unknown modes are an error.
    Script,
}

impl Surface {
    pub fn default_policy(self) -> UnknownModePolicy {
        match self {
            Surface::Http => UnknownModePolicy::Passthrough,
            Surface::Script => UnknownModePolicy::Strict,
        }
    }

    pub fn default_preset(self) -> TemplatePreset {
        match self {
            Surface::Http => TemplatePreset::Server,
            Surface::Script => TemplatePreset::Script,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    templates: TemplateSet,
    policy: UnknownModePolicy,
}

impl PromptBuilder {
    pub fn new(templates: TemplateSet, policy: UnknownModePolicy) -> Self {
        Self { templates, policy }
    }

    /// Builder with the defaults of `surface`.
    pub fn for_surface(surface: Surface) -> Self {
        Self::new(TemplateSet::preset(surface.default_preset()), surface.default_policy())
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    pub fn policy(&self) -> UnknownModePolicy {
        self.policy
    }

    /// Build the prompt for `text` in `mode`.
    pub fn build(&self, mode: &str, text: &str) -> Result<String, PromptError> {
        match self.templates.get(mode) {
            Some(template) => {
                let mut prompt = template.construct_prompt();
                prompt.try_fill(TEXT_PLACEHOLDER, text)?;
                Ok(prompt.complete()?)
            }
            None => match self.policy {
                UnknownModePolicy::Passthrough => Ok(text.to_string()),
                UnknownModePolicy::Strict => Err(PromptError::UnknownMode {
                    mode: mode.to_string(),
                    available: self.templates.modes().map(str::to_string).collect(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod test_builder {
    use super::*;

    const INPUTS: &[&str] = &[
        "",
        "Cats are mammals.",
        "  padded\n",
        "E=mc^2 relates mass and energy.",
        "costs $1 {[text]} {{braces}}",
        "ünïcödé – ✓",
    ];

    #[test]
    fn test_summarize_scenario() {
        let builder = PromptBuilder::for_surface(Surface::Http);
        assert_eq!(
            "Summarize the main point of this academic text: Cats are mammals.",
            builder.build("summarize", "Cats are mammals.").unwrap()
        );
    }

    #[test]
    fn test_every_mode_contains_input_and_is_deterministic() {
        for surface in [Surface::Http, Surface::Script] {
            let builder = PromptBuilder::for_surface(surface);
            let modes: Vec<String> = builder.templates().modes().map(str::to_string).collect();
            for mode in &modes {
                for text in INPUTS {
                    let first = builder.build(mode, text).unwrap();
                    let second = builder.build(mode, text).unwrap();
                    assert!(first.contains(text), "{mode} prompt lost its input: {first}");
                    assert!(first.len() > text.len());
                    assert_eq!(first, second);
                }
            }
        }
    }

    #[test]
    fn test_unknown_mode_passthrough() {
        let builder = PromptBuilder::for_surface(Surface::Http);
        assert_eq!(UnknownModePolicy::Passthrough, builder.policy());
        assert_eq!("hello", builder.build("unknown_mode_xyz", "hello").unwrap());
        assert_eq!("", builder.build("unknown_mode_xyz", "").unwrap());
    }

    #[test]
    fn test_unknown_mode_strict() {
        let builder = PromptBuilder::for_surface(Surface::Script);
        match builder.build("unknown_mode_xyz", "hello") {
            Err(PromptError::UnknownMode { mode, available }) => {
                assert_eq!("unknown_mode_xyz", mode);
                assert_eq!(7, available.len());
                assert!(available.contains(&"eli5".to_string()));
            }
            other => panic!("expected UnknownMode, got {other:?}"),
        }
    }

    #[test]
    fn test_surfaces_differ_in_vocabulary() {
        let http = PromptBuilder::for_surface(Surface::Http);
        let script = PromptBuilder::for_surface(Surface::Script);
        assert_eq!(
            "Explain this concept like I'm five: atoms",
            http.build("explain_like_im_5", "atoms").unwrap()
        );
        assert_eq!("Explain this as if I'm five years old: atoms", script.build("eli5", "atoms").unwrap());
        // not a server mode, so the raw text goes through
        assert_eq!("atoms", http.build("eli5", "atoms").unwrap());
        assert!(script.build("explain_like_im_5", "atoms").is_err());
    }

    #[test]
    fn test_mode_lookup_is_case_sensitive() {
        let builder = PromptBuilder::for_surface(Surface::Http);
        assert_eq!("hello", builder.build("Summarize", "hello").unwrap());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(Ok(UnknownModePolicy::Strict), "STRICT".parse::<UnknownModePolicy>());
        assert_eq!(Ok(UnknownModePolicy::Passthrough), "passthrough".parse::<UnknownModePolicy>());
        assert!("fallback".parse::<UnknownModePolicy>().is_err());
    }
}
