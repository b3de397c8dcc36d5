use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::info;

use lecture_simplifier::builder::Surface;
use lecture_simplifier::config::Config;
use lecture_simplifier::processor::TextProcessor;
use lecture_simplifier::server;

/// Serve `POST /process-text` on top of a chat-completion API.
#[derive(Debug, Parser)]
#[command(name = "lecture-server", version)]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the config
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Completion model, overrides the config
    #[arg(short, long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    pretty_env_logger::init();

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref()).context("invalid configuration")?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    info!("starting with {:?}", config);

    let processor = TextProcessor::from_config(&config, Surface::Http)?;
    server::serve(&config, Arc::new(processor)).await
}
