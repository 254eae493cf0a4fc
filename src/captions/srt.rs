use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use super::timing::{SrtTimestamp, TimedCaption};

// @struct: Single SRT cue
#[derive(Debug, Clone, PartialEq)]
pub struct SrtEntry {
    // @field: 1-based sequence number
    pub index: usize,
    pub start: SrtTimestamp,
    pub end: SrtTimestamp,
    pub text: String,
}

impl fmt::Display for SrtEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(f, "{} --> {}", self.start, self.end)?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Number timed captions as SRT cues
pub fn entries_from(captions: &[TimedCaption]) -> Vec<SrtEntry> {
    captions
        .iter()
        .enumerate()
        .map(|(i, caption)| SrtEntry {
            index: i + 1,
            start: caption.start,
            end: caption.end,
            text: caption.text.clone(),
        })
        .collect()
}

/// Render timed captions as SRT text
pub fn render_srt(captions: &[TimedCaption]) -> String {
    entries_from(captions).iter().map(|entry| entry.to_string()).collect()
}

/// Write timed captions to an SRT file, creating parent directories
pub fn write_srt<P: AsRef<Path>>(path: P, captions: &[TimedCaption]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut file = File::create(path)
        .with_context(|| format!("Failed to create subtitle file: {}", path.display()))?;

    for entry in entries_from(captions) {
        write!(file, "{}", entry)?;
    }

    Ok(())
}
