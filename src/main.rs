use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use youtube_transcript_mcp::cli::{Cli, Commands, TransportKind};
use youtube_transcript_mcp::config::Config;
use youtube_transcript_mcp::extractors::extract_video_id;
use youtube_transcript_mcp::mcp::{HttpTransport, McpServer, StdioTransport};
use youtube_transcript_mcp::provider::YoutubeTranscriptProvider;
use youtube_transcript_mcp::tools::{Tool, TranscriptTool};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays free for the stdio transport
    let default_filter = if cli.verbose {
        "youtube_transcript_mcp=debug,yt_transcript_mcp=debug"
    } else {
        "youtube_transcript_mcp=info,yt_transcript_mcp=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Serve { transport, host, port } => {
            let mut config = Config::load(cli.config.as_deref())?;
            if let Some(transport) = transport {
                config.server.transport = transport;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            let provider = YoutubeTranscriptProvider::new(&config.provider)?;
            let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(TranscriptTool::new(provider))];
            let server = Arc::new(McpServer::new(tools));

            tracing::info!("Starting YouTube Transcript MCP server ({} transport)", config.server.transport);

            match config.server.transport {
                TransportKind::Http => {
                    HttpTransport::new(server, config.server.host, config.server.port)
                        .run()
                        .await?;
                }
                TransportKind::Stdio => {
                    StdioTransport::new(server).run().await?;
                }
            }
        }
        Commands::Transcript { url } => {
            let config = Config::load(cli.config.as_deref())?;
            let tool = TranscriptTool::new(YoutubeTranscriptProvider::new(&config.provider)?);

            match tool.get_transcript(&url).await {
                Ok(transcript) => println!("{}", transcript),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::VideoId { url } => match extract_video_id(&url) {
            Some(video_id) => println!("{}", video_id),
            None => {
                eprintln!("No video ID found in: {}", url);
                std::process::exit(1);
            }
        },
        Commands::Config { show, init } => {
            if init {
                let path = Config::user_config_path()?;
                if path.exists() {
                    anyhow::bail!("Config file already exists: {}", path.display());
                }
                Config::default().save(&path)?;
                println!("Configuration written to: {}", path.display());
            } else {
                let config = Config::load(cli.config.as_deref())?;
                if show {
                    config.display();
                } else {
                    println!("Edit the config file to change settings:");
                    println!("  {}", Config::user_config_path()?.display());
                    println!("Run with --show to print the effective configuration.");
                }
            }
        }
    }

    Ok(())
}
