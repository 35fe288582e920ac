//! YouTube Transcript MCP - A tool server that turns a YouTube URL into its transcript
//!
//! This library exposes a single `get_youtube_transcript` tool over the Model Context
//! Protocol. The tool extracts the video ID from the URL, fetches the caption track from
//! YouTube and returns the caption text joined into one string.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod mcp;
pub mod provider;
pub mod tools;

pub use cli::{Cli, Commands, TransportKind};
pub use config::Config;
pub use extractors::extract_video_id;
pub use mcp::McpServer;
pub use provider::{ProviderError, TranscriptProvider, TranscriptSegment};
pub use tools::{Tool, ToolCallError, ToolDefinition, TranscriptTool};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Failures surfaced to callers of the transcript tool
#[derive(thiserror::Error, Debug)]
pub enum TranscriptToolError {
    #[error("Could not extract a valid YouTube video ID from the URL: '{0}'")]
    InvalidUrl(String),

    #[error("Transcripts are disabled for the video with ID: {0}")]
    TranscriptsDisabled(String),

    #[error("No transcript could be found for the video with ID: {0}. It may not be available in any language.")]
    NoTranscriptFound(String),

    #[error("An unexpected error occurred while fetching the transcript: {message}")]
    UnexpectedProviderError { video_id: String, message: String },
}
