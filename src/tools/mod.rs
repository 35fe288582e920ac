use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::extractors::extract_video_id;
use crate::provider::{ProviderFailure, TranscriptProvider};
use crate::TranscriptToolError;

/// Name the transcript tool is published under
pub const TRANSCRIPT_TOOL_NAME: &str = "get_youtube_transcript";

/// Description of a tool as advertised to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,

    pub description: String,

    /// JSON schema of the tool arguments
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Why a tool call did not produce a result
#[derive(thiserror::Error, Debug)]
pub enum ToolCallError {
    /// The arguments did not match the input schema
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool ran and reported a failure
    #[error(transparent)]
    Failed(#[from] TranscriptToolError),
}

/// An operation callable through the protocol server
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn call(&self, arguments: Value) -> Result<String, ToolCallError>;
}

#[derive(Debug, Deserialize)]
struct TranscriptArgs {
    video_url: String,
}

/// Tool returning the plain-text transcript of a YouTube video
pub struct TranscriptTool<P> {
    provider: P,
}

impl<P: TranscriptProvider> TranscriptTool<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Fetch the transcript for a video URL, joining segment texts with single spaces
    pub async fn get_transcript(&self, video_url: &str) -> Result<String, TranscriptToolError> {
        tracing::info!("Received request to get transcript for: {}", video_url);

        let video_id = extract_video_id(video_url)
            .ok_or_else(|| TranscriptToolError::InvalidUrl(video_url.to_string()))?;

        let segments = match self.provider.fetch_transcript(&video_id).await {
            Ok(segments) => segments,
            Err(err) => {
                return Err(match err.failure() {
                    ProviderFailure::TranscriptsDisabled => {
                        tracing::warn!("Transcripts are disabled for video: {}", video_id);
                        TranscriptToolError::TranscriptsDisabled(video_id)
                    }
                    ProviderFailure::NoTranscriptFound => {
                        tracing::warn!("No transcript found for video {}: {}", video_id, err);
                        TranscriptToolError::NoTranscriptFound(video_id)
                    }
                    ProviderFailure::Other => {
                        tracing::error!(
                            "An unexpected error occurred for video {} ({}): {:?}",
                            video_id,
                            self.provider.provider_name(),
                            err
                        );
                        TranscriptToolError::UnexpectedProviderError {
                            video_id,
                            message: err.to_string(),
                        }
                    }
                });
            }
        };

        let transcript = segments
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        tracing::info!("Successfully fetched transcript for video ID: {}", video_id);
        Ok(transcript)
    }
}

#[async_trait]
impl<P: TranscriptProvider> Tool for TranscriptTool<P> {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: TRANSCRIPT_TOOL_NAME.to_string(),
            description: "Fetches the full text transcript for a given YouTube video URL. \
                The video must have transcripts enabled and available."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "video_url": {
                        "type": "string",
                        "description": "YouTube video URL (watch, youtu.be or shorts link)"
                    }
                },
                "required": ["video_url"]
            }),
        }
    }

    async fn call(&self, arguments: Value) -> Result<String, ToolCallError> {
        let args: TranscriptArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolCallError::InvalidArguments(e.to_string()))?;

        Ok(self.get_transcript(&args.video_url).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockTranscriptProvider, ProviderError, TranscriptSegment};
    use mockall::predicate::eq;

    fn tool_returning(
        video_id: &'static str,
        result: fn() -> Result<Vec<TranscriptSegment>, ProviderError>,
    ) -> TranscriptTool<MockTranscriptProvider> {
        let mut provider = MockTranscriptProvider::new();
        provider
            .expect_fetch_transcript()
            .with(eq(video_id))
            .returning(move |_| result());
        provider.expect_provider_name().return_const("mock");
        TranscriptTool::new(provider)
    }

    #[tokio::test]
    async fn test_segments_joined_with_spaces() {
        let tool = tool_returning("dQw4w9WgXcQ", || {
            Ok(vec![
                TranscriptSegment::new("Hello", 0.0, 1.0),
                TranscriptSegment::new("world", 1.0, 1.0),
            ])
        });

        let transcript = tool
            .get_transcript("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .await
            .unwrap();
        assert_eq!(transcript, "Hello world");
    }

    #[tokio::test]
    async fn test_empty_transcript() {
        let tool = tool_returning("dQw4w9WgXcQ", || Ok(Vec::new()));
        let transcript = tool.get_transcript("https://youtu.be/dQw4w9WgXcQ").await.unwrap();
        assert_eq!(transcript, "");
    }

    #[tokio::test]
    async fn test_invalid_url_skips_provider() {
        let mut provider = MockTranscriptProvider::new();
        provider.expect_fetch_transcript().never();
        let tool = TranscriptTool::new(provider);

        let err = tool.get_transcript("not a youtube url").await.unwrap_err();
        assert!(matches!(err, TranscriptToolError::InvalidUrl(_)));
        assert!(err.to_string().contains("not a youtube url"));
    }

    #[tokio::test]
    async fn test_transcripts_disabled() {
        let tool = tool_returning("abc12345678", || Err(ProviderError::TranscriptsDisabled));

        let err = tool
            .get_transcript("https://www.youtube.com/shorts/abc12345678")
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptToolError::TranscriptsDisabled(ref id) if id == "abc12345678"));
        assert!(err.to_string().contains("abc12345678"));
    }

    #[tokio::test]
    async fn test_no_transcript_found() {
        let tool = tool_returning("abc12345678", || {
            Err(ProviderError::NoTranscriptFound {
                requested_languages: vec!["en".to_string()],
            })
        });

        let err = tool
            .get_transcript("https://youtu.be/abc12345678")
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptToolError::NoTranscriptFound(_)));
        assert!(err.to_string().contains("abc12345678"));
    }

    #[tokio::test]
    async fn test_unexpected_error_keeps_message() {
        let tool = tool_returning("abc12345678", || Err(ProviderError::Parse("boom".to_string())));

        let err = tool
            .get_transcript("https://youtu.be/abc12345678")
            .await
            .unwrap_err();
        match &err {
            TranscriptToolError::UnexpectedProviderError { video_id, message } => {
                assert_eq!(video_id, "abc12345678");
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_repeated_calls_are_identical() {
        let tool = tool_returning("dQw4w9WgXcQ", || {
            Ok(vec![
                TranscriptSegment::new("never", 0.0, 1.0),
                TranscriptSegment::new("gonna", 1.0, 1.0),
            ])
        });
        let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

        let first = tool.get_transcript(url).await.unwrap();
        let second = tool.get_transcript(url).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_call_with_arguments() {
        let tool = tool_returning("dQw4w9WgXcQ", || Ok(vec![TranscriptSegment::new("hi", 0.0, 1.0)]));

        let text = tool
            .call(json!({"video_url": "https://youtu.be/dQw4w9WgXcQ"}))
            .await
            .unwrap();
        assert_eq!(text, "hi");
    }

    #[tokio::test]
    async fn test_call_with_bad_arguments() {
        let tool = TranscriptTool::new(MockTranscriptProvider::new());

        let err = tool.call(json!({"url": "https://youtu.be/dQw4w9WgXcQ"})).await.unwrap_err();
        assert!(matches!(err, ToolCallError::InvalidArguments(_)));

        let err = tool.call(json!({"video_url": 42})).await.unwrap_err();
        assert!(matches!(err, ToolCallError::InvalidArguments(_)));
    }

    #[test]
    fn test_definition() {
        let tool = TranscriptTool::new(MockTranscriptProvider::new());
        let definition = tool.definition();
        assert_eq!(definition.name, "get_youtube_transcript");
        assert_eq!(definition.input_schema["required"], json!(["video_url"]));
        assert_eq!(definition.input_schema["properties"]["video_url"]["type"], "string");
    }
}
