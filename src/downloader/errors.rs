// Error types for the download engine

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network timeout while connecting to YouTube
    #[error("Network timeout: YouTube is not responding")]
    NetworkTimeout,

    /// YouTube blocked the request (429, bot detection, etc.)
    #[error(
        "YouTube is temporarily throttling requests from your IP address. \
         Wait and try again later, or try a different network."
    )]
    BlockedByYouTube,

    /// yt-dlp not found in system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// URL rejected by the engine
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse yt-dlp JSON output
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Command execution failed
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// Local filesystem failure (creating the download directory, etc.)
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Unknown error with details
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl DownloadError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

// Classify raw yt-dlp stderr into an error kind
impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        let lower = s.to_lowercase();

        // IP blocking shows up as timeouts against youtube.com
        if (lower.contains("timeout") || lower.contains("timed out"))
            && lower.contains("youtube.com")
        {
            return Self::BlockedByYouTube;
        }

        if lower.contains("timeout") || lower.contains("timed out") {
            return Self::NetworkTimeout;
        }

        if lower.contains("http error 429")
            || lower.contains("sign in to confirm you're not a bot")
            || lower.contains("blocked")
        {
            return Self::BlockedByYouTube;
        }

        if lower.contains("command not found") || lower.contains("no such file") {
            return Self::ToolNotFound(s);
        }

        if lower.contains("unsupported url") || lower.contains("invalid url") || lower.contains("is not a valid url") {
            return Self::InvalidUrl(s);
        }

        if lower.contains("json") || lower.contains("parse") {
            return Self::ParseError(s);
        }

        if s.trim().is_empty() {
            return Self::Unknown("yt-dlp exited without an error message".to_string());
        }

        Self::ExecutionError(s)
    }
}
