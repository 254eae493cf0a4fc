/*!
 * Narration audio: synthesis and duration measurement.
 *
 * - `google`: Google Translate TTS client
 * - `probe`: ffprobe based duration measurement
 * - `oracle`: synthesize + probe + cache, exposed as a `DurationOracle`
 */

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

use crate::errors::{MediaError, ProviderError};

/// Common trait for text-to-speech services
///
/// Implementations return encoded audio (MP3) for the given text.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` spoken in `language`
    ///
    /// # Arguments
    /// * `text` - Text to speak
    /// * `language` - ISO 639-1 code, optionally with region
    ///
    /// # Returns
    /// * `Result<Bytes, ProviderError>` - Encoded audio or an error
    async fn synthesize(&self, text: &str, language: &str) -> Result<Bytes, ProviderError>;
}

/// Measures the playback length of an audio file
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Duration of the audio at `path`, in seconds
    async fn duration_of(&self, path: &Path) -> Result<f64, MediaError>;
}

pub mod google;
pub mod oracle;
pub mod probe;

pub use google::GoogleTranslateTts;
pub use oracle::{NarratedClip, NarrationOracle};
pub use probe::FfprobeProbe;
