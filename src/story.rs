use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::file_utils::FileManager;

/// A story as written by the author: sections of narration, each paired
/// with the images shown while it is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    #[serde(default)]
    pub category: String,

    pub title: String,

    /// Narration blocks; `section[j]` is read over `image[j]`
    #[serde(default)]
    pub section: Vec<String>,

    /// Image sources per section; only the first image of each group is used
    #[serde(default)]
    pub image: Vec<Vec<String>>,
}

impl Story {
    /// Pairs of (narration, image source) in reading order.
    ///
    /// Sections without an image are skipped.
    pub fn scenes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.section
            .iter()
            .zip(self.image.iter())
            .filter_map(|(text, images)| images.first().map(|src| (text.as_str(), src.as_str())))
    }
}

/// One spoken caption with its audio clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Description {
    pub script: String,
    pub audio: String,
    /// Clip length in seconds
    pub duration: f64,
}

/// An image and the captions read over it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarratedImage {
    pub source: String,
    pub descriptions: Vec<Description>,
    pub total_duration: f64,
}

impl NarratedImage {
    pub fn new(source: impl Into<String>, descriptions: Vec<Description>) -> Self {
        let total_duration = descriptions.iter().map(|d| d.duration).sum();
        Self {
            source: source.into(),
            descriptions,
            total_duration,
        }
    }
}

/// A story after narration: everything a renderer needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarratedStory {
    pub title: String,
    pub images: Vec<NarratedImage>,
}

impl NarratedStory {
    pub fn total_duration(&self) -> f64 {
        self.images.iter().map(|i| i.total_duration).sum()
    }
}

/// Load a story file (a JSON array of stories)
pub fn load_stories<P: AsRef<Path>>(path: P) -> Result<Vec<Story>> {
    let content = FileManager::read_to_string(&path)?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse stories from {:?}", path.as_ref()))
}

/// Load narrated stories written by an earlier `narrate` run
pub fn load_narrated<P: AsRef<Path>>(path: P) -> Result<Vec<NarratedStory>> {
    let content = FileManager::read_to_string(&path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse narrated stories from {:?}", path.as_ref()))
}

/// Write narrated stories as pretty JSON
pub fn save_narrated<P: AsRef<Path>>(path: P, stories: &[NarratedStory]) -> Result<()> {
    let json = serde_json::to_string_pretty(stories).context("Failed to serialize narrated stories")?;
    FileManager::write_to_file(path, &json)
}
