use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use super::{DurationProbe, SpeechSynthesizer};
use crate::captions::DurationOracle;
use crate::errors::OracleError;

/// A synthesized narration clip on disk
#[derive(Debug, Clone, PartialEq)]
pub struct NarratedClip {
    pub path: PathBuf,
    pub duration_secs: f64,
}

/// Duration oracle that speaks each caption and measures the result.
///
/// Clips are stored under the audio directory, named by a hash of the
/// language and text, so a caption spoken twice is synthesized once and
/// clips left over from an earlier run are reused.
pub struct NarrationOracle<S, P> {
    synthesizer: S,
    probe: P,
    audio_dir: PathBuf,
    clips: Mutex<HashMap<String, NarratedClip>>,
}

impl<S, P> NarrationOracle<S, P>
where
    S: SpeechSynthesizer,
    P: DurationProbe,
{
    pub fn new(synthesizer: S, probe: P, audio_dir: impl Into<PathBuf>) -> Self {
        Self {
            synthesizer,
            probe,
            audio_dir: audio_dir.into(),
            clips: Mutex::new(HashMap::new()),
        }
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Cache key for a caption
    pub fn clip_key(text: &str, language: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(language.as_bytes());
        hasher.update(b"\n");
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Where the clip for a caption lives (whether or not it exists yet)
    pub fn clip_path(&self, text: &str, language: &str) -> PathBuf {
        self.audio_dir.join(format!("{}.mp3", Self::clip_key(text, language)))
    }

    /// Clip produced for a caption during this run, if any
    pub fn clip_for(&self, text: &str, language: &str) -> Option<NarratedClip> {
        self.clips.lock().get(&Self::clip_key(text, language)).cloned()
    }

    /// Synthesize (or reuse) the clip for a caption and measure it
    pub async fn narrate(&self, text: &str, language: &str) -> Result<NarratedClip, OracleError> {
        let key = Self::clip_key(text, language);
        let known = self.clips.lock().get(&key).cloned();
        if let Some(clip) = known {
            return Ok(clip);
        }

        let path = self.clip_path(text, language);
        if path.exists() {
            debug!("Reusing narration clip {:?}", path);
        } else {
            let audio = self.synthesizer.synthesize(text, language).await?;
            self.store(&path, &audio)?;
            debug!("Synthesized {} bytes of narration into {:?}", audio.len(), path);
        }

        let duration_secs = self.probe.duration_of(&path).await?;
        let clip = NarratedClip { path, duration_secs };
        self.clips.lock().insert(key, clip.clone());
        Ok(clip)
    }

    // A clip only appears at `path` once fully written
    fn store(&self, path: &Path, audio: &[u8]) -> Result<(), OracleError> {
        std::fs::create_dir_all(&self.audio_dir)?;
        let mut file = NamedTempFile::new_in(&self.audio_dir)?;
        file.write_all(audio)?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[async_trait]
impl<S, P> DurationOracle for NarrationOracle<S, P>
where
    S: SpeechSynthesizer,
    P: DurationProbe,
{
    async fn duration(&self, text: &str, language: &str) -> Result<f64, OracleError> {
        Ok(self.narrate(text, language).await?.duration_secs)
    }
}
