use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use reelcheck_common::Config;
use reelcheck_verifier::adapters::build_pipeline;
use reelcheck_verifier::ChannelMessage;

/// Check the factual claims made in an Instagram reel.
#[derive(Parser, Debug)]
#[command(name = "reelcheck", version)]
struct Cli {
    /// Post, reel or share link.
    url: String,

    /// Print one report at the end instead of streaming events.
    #[arg(long)]
    buffered: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("reelcheck=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;

    let pipeline = build_pipeline(&config);
    info!(url = cli.url.as_str(), buffered = cli.buffered, "Starting verification");

    let failed = if cli.buffered {
        let report = pipeline.run_buffered(&cli.url).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        report.outcome.is_failed()
    } else {
        let mut failed = false;
        let mut messages = Box::pin(pipeline.stream(cli.url.clone()));
        while let Some(message) = messages.next().await {
            if let ChannelMessage::Terminal(outcome) = &message {
                failed = outcome.is_failed();
            }
            println!("{}", serde_json::to_string(&message)?);
        }
        failed
    };

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
