use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod timedtext;
pub mod youtube;

pub use youtube::YoutubeTranscriptProvider;

/// One caption line as returned by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Caption text
    pub text: String,

    /// Start time in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

impl TranscriptSegment {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }
}

/// Errors reported by a transcript provider
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("Subtitles are disabled for this video")]
    TranscriptsDisabled,

    #[error("No transcripts were found for any of the requested language codes: {}", .requested_languages.join(", "))]
    NoTranscriptFound { requested_languages: Vec<String> },

    #[error("The video is no longer available: {0}")]
    VideoUnavailable(String),

    #[error("YouTube is receiving too many requests from this IP")]
    TooManyRequests,

    #[error("YouTube is blocking requests from this IP")]
    RequestBlocked,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0}")]
    UnexpectedStatus(u16),

    #[error("Failed to parse YouTube response: {0}")]
    Parse(String),
}

/// Coarse failure category the tool handler reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    TranscriptsDisabled,
    NoTranscriptFound,
    Other,
}

impl ProviderError {
    /// Classify this error into the categories the tool reports on
    pub fn failure(&self) -> ProviderFailure {
        match self {
            ProviderError::TranscriptsDisabled => ProviderFailure::TranscriptsDisabled,
            ProviderError::NoTranscriptFound { .. } => ProviderFailure::NoTranscriptFound,
            ProviderError::VideoUnavailable(_)
            | ProviderError::TooManyRequests
            | ProviderError::RequestBlocked
            | ProviderError::Http(_)
            | ProviderError::UnexpectedStatus(_)
            | ProviderError::Parse(_) => ProviderFailure::Other,
        }
    }
}

/// Source of video transcripts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// Fetch the default transcript of a video, segments in playback order
    async fn fetch_transcript(&self, video_id: &str) -> Result<Vec<TranscriptSegment>, ProviderError>;

    /// Name of this provider for logging
    fn provider_name(&self) -> &'static str;
}
