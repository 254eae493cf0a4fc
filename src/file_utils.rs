use anyhow::{anyhow, Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Component, Path, PathBuf};
use url::Url;
use walkdir::WalkDir;

use crate::app_config::OutputConfig;

// @module: File and directory utilities

/// Image extensions picked up when a directory is given
pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Find files with any of the given extensions, sorted by path
    pub fn find_files<P: AsRef<Path>>(dir: P, extensions: &[&str]) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    let ext = ext.to_string_lossy();
                    if extensions.iter().any(|e| ext.eq_ignore_ascii_case(e.trim_start_matches('.'))) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        result.sort();
        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }
}

/// Naming for the files a single run produces.
///
/// Every generated file name starts with the run prefix, a local
/// timestamp taken when the run starts.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub prefix: String,
    pub output_dir: PathBuf,
    pub audio_dir: PathBuf,
}

impl RunContext {
    /// Start a run now
    pub fn new(output: &OutputConfig) -> Self {
        Self::with_prefix(
            Local::now().format("%Y%m%d_%H%M%S").to_string(),
            &output.output_dir,
            &output.audio_dir,
        )
    }

    pub fn with_prefix(prefix: impl Into<String>, output_dir: impl Into<PathBuf>, audio_dir: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            output_dir: output_dir.into(),
            audio_dir: audio_dir.into(),
        }
    }

    fn output_file(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{}_{}", self.prefix, name))
    }

    /// Captions for one image of one story
    pub fn srt_path(&self, story: usize, image: usize) -> PathBuf {
        self.output_file(&format!("category_{}_img_{}.srt", story, image))
    }

    /// Captions for a whole story, re-timed across its images
    pub fn story_srt_path(&self, story: usize) -> PathBuf {
        self.output_file(&format!("category_{}.srt", story))
    }

    pub fn information_path(&self) -> PathBuf {
        self.output_file("information.json")
    }

    pub fn render_source_path(&self, story: usize) -> PathBuf {
        self.output_file(&format!("render_{}.json", story))
    }

    /// Concat list for a story (`kind` is "images" or "audio")
    pub fn concat_list_path(&self, story: usize, kind: &str) -> PathBuf {
        self.output_file(&format!("category_{}_{}.txt", story, kind))
    }

    pub fn video_path(&self, story: usize) -> PathBuf {
        self.output_file(&format!("category_{}.mp4", story))
    }

    /// Destination for a downloaded render, named after the remote file
    pub fn download_path(&self, label: &str, url: &str) -> PathBuf {
        let name = Url::parse(url)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut segments| segments.next_back().map(str::to_string))
            })
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "render".to_string());

        self.output_file(&format!("{}_{}", label, name))
    }
}

/// Public URL for a local media file.
///
/// With no base URL the path is returned unchanged; otherwise the path's
/// normal components are appended to the base as URL path segments.
pub fn media_url(base: Option<&str>, path: &Path) -> Result<String> {
    let Some(base) = base.map(str::trim).filter(|b| !b.is_empty()) else {
        return Ok(path.to_string_lossy().into_owned());
    };

    let mut url = Url::parse(base).with_context(|| format!("Invalid media base URL: {}", base))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| anyhow!("Media base URL cannot have a path: {}", base))?;
        segments.pop_if_empty();
        for component in path.components() {
            if let Component::Normal(part) = component {
                segments.push(&part.to_string_lossy());
            }
        }
    }

    Ok(url.to_string())
}
