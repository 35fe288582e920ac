use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "yt-transcript-mcp",
    about = "YouTube Transcript MCP - Fetch YouTube transcripts as an MCP tool",
    version,
    long_about = "An MCP server exposing a single get_youtube_transcript tool. Given a YouTube video URL (watch, youtu.be or shorts), the tool returns the full caption text of the video as plain text."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a YAML configuration file
    #[arg(short, long, global = true, value_name = "FILE", env = "YT_TRANSCRIPT_MCP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the MCP server
    Serve {
        /// Transport carrying tool invocations (defaults to the configured one)
        #[arg(short, long, value_enum)]
        transport: Option<TransportKind>,

        /// Address to bind the HTTP transport to
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Port for the HTTP transport
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// Fetch the transcript of a single video and print it
    Transcript {
        /// YouTube video URL
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Print the video ID extracted from a URL
    VideoId {
        /// YouTube video URL
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Show or initialize the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write the default configuration to the user config directory
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Streamable HTTP, JSON-RPC messages POSTed to /mcp
    Http,
    /// Newline-delimited JSON-RPC over stdin/stdout
    Stdio,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Http => write!(f, "http"),
            TransportKind::Stdio => write!(f, "stdio"),
        }
    }
}
