use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use lecture_simplifier::builder::{Surface, UnknownModePolicy};
use lecture_simplifier::config::{Config, ModeSettings};
use lecture_simplifier::modes::{capitalize_mode, TemplatePreset};
use lecture_simplifier::processor::TextProcessor;

/// Rewrite academic text in one of the configured modes.
#[derive(Debug, Parser)]
#[command(name = "lecture-cli", version)]
struct Args {
    /// Text to process; read from stdin when omitted
    text: Option<String>,

    /// Mode to apply
    #[arg(short, long, default_value = "eli5")]
    mode: String,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Built-in template set: `script` or `server`
    #[arg(long)]
    templates: Option<TemplatePreset>,

    /// What to do with an unknown mode: `strict` or `passthrough`
    #[arg(long)]
    unknown_mode: Option<UnknownModePolicy>,

    /// List the available modes and exit
    #[arg(long)]
    list_modes: bool,

    /// Print the output as plain text
    #[arg(long)]
    plain: bool,
}

fn plain_report(mode: &str, output: &str) -> String {
    format!("\nMode: {}\nOutput: {}", capitalize_mode(mode), output)
}

#[cfg(feature = "terminal_printing")]
fn report(mode: &str, output: &str, plain: bool) -> String {
    if plain {
        plain_report(mode, output)
    } else {
        let skin = termimad::MadSkin::default();
        format!("\nMode: {}\nOutput:\n{}", capitalize_mode(mode), skin.term_text(output))
    }
}

#[cfg(not(feature = "terminal_printing"))]
fn report(mode: &str, output: &str, _plain: bool) -> String {
    plain_report(mode, output)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    pretty_env_logger::init();

    let args = Args::parse();
    if args.list_modes {
        let mut settings = ModeSettings::load(args.config.as_deref()).context("invalid configuration")?;
        settings.override_with(args.templates, args.unknown_mode);
        let builder = settings.prompt_builder(Surface::Script)?;
        for mode in builder.templates().modes() {
            println!("{:<20} {}", mode, capitalize_mode(mode));
        }
        return Ok(());
    }

    let mut config = Config::load(args.config.as_deref()).context("invalid configuration")?;
    config.modes.override_with(args.templates, args.unknown_mode);
    let processor = TextProcessor::from_config(&config, Surface::Script)?;

    let text = match args.text {
        Some(text) => text,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).context("failed to read text from stdin")?;
            text
        }
    };

    let output = processor.process(&text, &args.mode).await?;
    println!("{}", report(&args.mode, &output, args.plain));
    Ok(())
}

#[cfg(test)]
mod test_cli {
    use super::*;

    #[test]
    fn test_plain_report() {
        assert_eq!("\nMode: Summarize\nOutput: Cats are mammals.", report("summarize", "Cats are mammals.", true));
        assert_eq!("\nMode: Explain_like_im_5\nOutput: ok", plain_report("explain_like_im_5", "ok"));
    }

    #[test]
    fn test_args() {
        let args = Args::try_parse_from(["lecture-cli", "Cats are mammals."]).unwrap();
        assert_eq!("eli5", args.mode);
        assert_eq!(Some("Cats are mammals.".to_string()), args.text);
        let args = Args::try_parse_from(["lecture-cli", "--list-modes", "--templates", "server", "--unknown-mode", "strict"]).unwrap();
        assert!(args.list_modes);
        assert_eq!(Some(TemplatePreset::Server), args.templates);
        assert_eq!(Some(UnknownModePolicy::Strict), args.unknown_mode);
        assert!(Args::try_parse_from(["lecture-cli", "--templates", "lecture"]).is_err());
    }
}
