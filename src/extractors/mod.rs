use lazy_static::lazy_static;
use regex::Regex;

/// A URL shape that carries a YouTube video ID right after a fixed marker
pub struct VideoIdPattern {
    /// Name of the URL shape
    pub name: &'static str,

    regex: Regex,
}

impl VideoIdPattern {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).expect("video ID pattern must compile"),
        }
    }

    /// Return the captured video ID if the marker appears anywhere in the URL
    pub fn find<'a>(&self, url: &'a str) -> Option<&'a str> {
        self.regex
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

lazy_static! {
    /// Supported URL shapes, in priority order
    static ref PATTERNS: Vec<VideoIdPattern> = vec![
        // https://www.youtube.com/watch?v=dQw4w9WgXcQ
        VideoIdPattern::new("watch", r"watch\?v=([a-zA-Z0-9_-]{11})"),
        // https://youtu.be/dQw4w9WgXcQ
        VideoIdPattern::new("short link", r"youtu\.be/([a-zA-Z0-9_-]{11})"),
        // https://www.youtube.com/shorts/dQw4w9WgXcQ
        VideoIdPattern::new("shorts", r"shorts/([a-zA-Z0-9_-]{11})"),
    ];
}

/// Supported URL shapes, in the order they are tried
pub fn patterns() -> &'static [VideoIdPattern] {
    &PATTERNS
}

/// Extract the 11-character video ID from a YouTube URL.
///
/// Patterns are searched anywhere in the input and the first one that matches wins.
/// The ID is not checked against YouTube, and nothing is logged.
pub fn extract_video_id(url: &str) -> Option<String> {
    patterns()
        .iter()
        .find_map(|pattern| pattern.find(url))
        .map(|id| id.to_string())
}
