use anyhow::Context;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, COOKIE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{timedtext, ProviderError, TranscriptProvider, TranscriptSegment};
use crate::config::ProviderConfig;

const WATCH_URL: &str = "https://www.youtube.com/watch";
const PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";

// The Android client still receives caption tracks without a PO token
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

lazy_static! {
    static ref API_KEY_RE: Regex = Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).unwrap();
}

/// A caption track listed in the player response
#[derive(Debug, Clone, Deserialize)]
pub struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    pub base_url: String,

    #[serde(rename = "languageCode")]
    pub language_code: String,

    /// `asr` for auto-generated tracks
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Transcript provider backed by YouTube's player API and timedtext caption tracks
pub struct YoutubeTranscriptProvider {
    client: Client,
    languages: Vec<String>,
}

impl YoutubeTranscriptProvider {
    /// Build a provider from the provider section of the configuration
    pub fn new(config: &ProviderConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));
        // Skips the EU cookie consent interstitial
        headers.insert(COOKIE, HeaderValue::from_static("CONSENT=YES+cb"));

        let mut builder = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs));

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .with_context(|| format!("Invalid proxy URL: {}", proxy))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            languages: config.languages.clone(),
        })
    }

    /// Languages tried in priority order when choosing a caption track
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    async fn fetch_watch_html(&self, video_id: &str) -> Result<String, ProviderError> {
        tracing::debug!("Fetching watch page for: {}", video_id);

        let response = self
            .client
            .get(WATCH_URL)
            .query(&[("v", video_id)])
            .send()
            .await?;
        check_status(response.status())?;

        let html = response.text().await?;
        if html.contains("class=\"g-recaptcha\"") {
            return Err(ProviderError::RequestBlocked);
        }

        Ok(html)
    }

    async fn fetch_player_response(&self, video_id: &str, api_key: &str) -> Result<Value, ProviderError> {
        tracing::debug!("Requesting player data for: {}", video_id);

        let body = json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });

        let response = self
            .client
            .post(PLAYER_URL)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;
        check_status(response.status())?;

        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::Parse(format!("player response is not JSON: {}", e)))
    }

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<TranscriptSegment>, ProviderError> {
        tracing::debug!(
            "Downloading {} caption track ({})",
            track.language_code,
            if track.is_generated() { "generated" } else { "manual" }
        );

        // srv3 uses a different document layout; ask for the classic format
        let url = track.base_url.replace("&fmt=srv3", "");
        let response = self.client.get(url).send().await?;
        check_status(response.status())?;

        let xml = response.text().await?;
        timedtext::parse_timedtext(&xml)
    }
}

#[async_trait]
impl TranscriptProvider for YoutubeTranscriptProvider {
    async fn fetch_transcript(&self, video_id: &str) -> Result<Vec<TranscriptSegment>, ProviderError> {
        let html = self.fetch_watch_html(video_id).await?;
        let api_key = extract_api_key(&html)?;

        let player = self.fetch_player_response(video_id, &api_key).await?;
        check_playability(&player)?;

        let tracks = caption_tracks(&player)?;
        let track = select_track(&tracks, &self.languages)?;

        self.fetch_track(track).await
    }

    fn provider_name(&self) -> &'static str {
        "YouTube"
    }
}

fn check_status(status: StatusCode) -> Result<(), ProviderError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::TooManyRequests);
    }

    if !status.is_success() {
        return Err(ProviderError::UnexpectedStatus(status.as_u16()));
    }

    Ok(())
}

/// Pull the innertube API key out of the watch page
pub fn extract_api_key(html: &str) -> Result<String, ProviderError> {
    API_KEY_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ProviderError::Parse("INNERTUBE_API_KEY not found in watch page".to_string()))
}

/// Map a non-OK playability status to a provider error
pub fn check_playability(player: &Value) -> Result<(), ProviderError> {
    let status = player["playabilityStatus"]["status"].as_str().unwrap_or("OK");
    if status == "OK" {
        return Ok(());
    }

    let reason = player["playabilityStatus"]["reason"]
        .as_str()
        .unwrap_or(status)
        .to_string();

    if status == "LOGIN_REQUIRED" && reason.contains("not a bot") {
        return Err(ProviderError::RequestBlocked);
    }

    Err(ProviderError::VideoUnavailable(reason))
}

/// List the caption tracks of a player response
pub fn caption_tracks(player: &Value) -> Result<Vec<CaptionTrack>, ProviderError> {
    let renderer = &player["captions"]["playerCaptionsTracklistRenderer"];
    if renderer.is_null() {
        return Err(ProviderError::TranscriptsDisabled);
    }

    let tracks: Vec<CaptionTrack> = match renderer.get("captionTracks") {
        Some(tracks) => serde_json::from_value(tracks.clone())
            .map_err(|e| ProviderError::Parse(format!("invalid caption track list: {}", e)))?,
        None => Vec::new(),
    };

    if tracks.is_empty() {
        return Err(ProviderError::TranscriptsDisabled);
    }

    Ok(tracks)
}

/// Choose a track for the first requested language that has one,
/// preferring manually created tracks over generated ones
pub fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Result<&'a CaptionTrack, ProviderError> {
    for language in languages {
        let manual = tracks
            .iter()
            .find(|t| &t.language_code == language && !t.is_generated());
        let generated = || {
            tracks
                .iter()
                .find(|t| &t.language_code == language && t.is_generated())
        };

        if let Some(track) = manual.or_else(generated) {
            return Ok(track);
        }
    }

    Err(ProviderError::NoTranscriptFound {
        requested_languages: languages.to_vec(),
    })
}
