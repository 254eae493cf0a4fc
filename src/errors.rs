/*!
 * Error types for the shortform application.
 *
 * Each stage of the pipeline has its own error enum, built with thiserror.
 * `AppError` wraps them all for library consumers that want a single type.
 */

use thiserror::Error;

/// Errors raised while turning narration into captions
#[derive(Error, Debug)]
pub enum CaptionError {
    /// The caller supplied an unusable setting (e.g. a zero maximum length)
    #[error("Invalid caption configuration: {0}")]
    Configuration(String),

    /// The duration oracle failed for one caption; the whole block is aborted
    #[error("Duration lookup failed for caption {index} ({caption:?}): {source}")]
    Oracle {
        /// Zero-based position of the caption in the sequence
        index: usize,
        /// Caption text that was being measured
        caption: String,
        /// Underlying oracle failure
        #[source]
        source: OracleError,
    },
}

/// Errors a duration oracle can report for a single caption
#[derive(Error, Debug)]
pub enum OracleError {
    /// Speech synthesis failed
    #[error("Speech synthesis failed: {0}")]
    Synthesis(#[from] ProviderError),

    /// Measuring the synthesized audio failed
    #[error("Audio probe failed: {0}")]
    Probe(#[from] MediaError),

    /// The oracle produced a duration that cannot be placed on the clock
    #[error("Invalid duration: {0}")]
    InvalidDuration(f64),

    /// The lookup did not finish in time
    #[error("Duration lookup timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Writing the audio clip failed
    #[error("Audio file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when talking to remote HTTP services
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Map a non-success HTTP status and body to the matching variant
    pub fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors from the remote rendering service workflow
#[derive(Error, Debug)]
pub enum RenderError {
    /// HTTP level failure
    #[error("Render API error: {0}")]
    Provider(#[from] ProviderError),

    /// The service reported the render as failed
    #[error("Render {id} failed: {message}")]
    Failed {
        /// Render job id
        id: String,
        /// Error message reported by the service, if any
        message: String,
    },

    /// The render did not finish within the polling window
    #[error("Render {id} did not finish within {secs} seconds")]
    Timeout {
        /// Render job id
        id: String,
        /// Polling window in seconds
        secs: u64,
    },

    /// No API key configured
    #[error("Render API key is not configured (set render.api_key or SHORTFORM_RENDER_API_KEY)")]
    MissingApiKey,

    /// Succeeded job without a downloadable URL
    #[error("Render {0} succeeded but returned no output URL")]
    MissingOutput(String),

    /// Failure writing the downloaded file
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from ffmpeg / ffprobe invocations
#[derive(Error, Debug)]
pub enum MediaError {
    /// Binary missing from PATH
    #[error("{0} is not installed or not on PATH")]
    NotFound(String),

    /// Process exited with a failure status
    #[error("{tool} failed: {message}")]
    Failed {
        /// Binary name
        tool: String,
        /// Filtered stderr output
        message: String,
    },

    /// Process ran longer than allowed
    #[error("{tool} timed out after {secs} seconds")]
    Timeout {
        /// Binary name
        tool: String,
        /// Timeout in seconds
        secs: u64,
    },

    /// Output could not be understood
    #[error("Unexpected {tool} output: {message}")]
    Parse {
        /// Binary name
        tool: String,
        /// What was wrong
        message: String,
    },

    /// Local file failure
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from caption processing
    #[error("Caption error: {0}")]
    Caption(#[from] CaptionError),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from rendering
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Error from ffmpeg tooling
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
