use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use log::{error, info};
use serde_json::Value;
use tokio::process::Command;

use crate::app_config::LocalVideoConfig;
use crate::errors::MediaError;
use crate::file_utils::FileManager;

// @module: ffmpeg / ffprobe invocation

/// Run an external media tool, mapping failures to `MediaError`
pub async fn run_tool(binary: &str, args: &[&str], timeout: Duration) -> Result<Output, MediaError> {
    let future = Command::new(binary).args(args).kill_on_drop(true).output();

    let output = tokio::select! {
        result = future => {
            result.map_err(|e| match e.kind() {
                ErrorKind::NotFound => MediaError::NotFound(binary.to_string()),
                _ => MediaError::Io(e),
            })?
        },
        _ = tokio::time::sleep(timeout) => {
            return Err(MediaError::Timeout { tool: binary.to_string(), secs: timeout.as_secs() });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let filtered = filter_ffmpeg_stderr(&stderr);
        error!("{} failed: {}", binary, filtered);
        return Err(MediaError::Failed {
            tool: binary.to_string(),
            message: filtered,
        });
    }

    Ok(output)
}

/// Keep only the meaningful lines of ffmpeg stderr, dropping the banner,
/// build configuration and stream metadata noise.
pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "ffprobe version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Metadata:",
        "Duration:",
        "Stream #",
        "Output #",
        "Stream mapping:",
        "Press [q]",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !noise_prefixes.iter().any(|p| line.starts_with(p)))
        .collect();

    if meaningful.is_empty() {
        "unknown error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}

/// One line of an ffmpeg concat demuxer list
#[derive(Debug, Clone, PartialEq)]
pub struct ConcatEntry {
    pub path: PathBuf,
    /// How long to show the entry (images only)
    pub duration_secs: Option<f64>,
}

impl ConcatEntry {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            duration_secs: None,
        }
    }

    pub fn still(path: impl Into<PathBuf>, duration_secs: f64) -> Self {
        Self {
            path: path.into(),
            duration_secs: Some(duration_secs),
        }
    }
}

fn escape_concat_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

/// Render a concat demuxer list.
///
/// When the last entry carries a duration it is listed a second time;
/// the demuxer ignores the duration of the final file otherwise.
pub fn concat_list_contents(entries: &[ConcatEntry]) -> String {
    let mut contents = String::new();
    for entry in entries {
        contents.push_str(&format!("file '{}'\n", escape_concat_path(&entry.path)));
        if let Some(duration) = entry.duration_secs {
            contents.push_str(&format!("duration {:.3}\n", duration));
        }
    }

    if let Some(last) = entries.last().filter(|e| e.duration_secs.is_some()) {
        contents.push_str(&format!("file '{}'\n", escape_concat_path(&last.path)));
    }

    contents
}

/// Write a concat demuxer list file
pub fn write_concat_list<P: AsRef<Path>>(path: P, entries: &[ConcatEntry]) -> Result<()> {
    FileManager::write_to_file(path, &concat_list_contents(entries))
}

/// Escape a path for use as a filtergraph option value
pub fn escape_filter_path(path: &Path) -> String {
    let mut escaped = String::new();
    for c in path.to_string_lossy().chars() {
        if matches!(c, '\\' | ':' | '\'' | ',' | ';' | '[' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Arguments for muxing an image list, an audio list and burned-in subtitles
pub fn video_args(
    config: &LocalVideoConfig,
    image_list: &Path,
    audio_list: &Path,
    subtitles: &Path,
    output: &Path,
) -> Vec<String> {
    let filter = format!(
        "format=yuv420p,pad=ceil(iw/2)*2:ceil(ih/2)*2,subtitles={}",
        escape_filter_path(subtitles)
    );

    let mut args = Vec::new();
    for list in [image_list, audio_list] {
        args.extend(["-f", "concat", "-safe", "0", "-i"].map(String::from));
        args.push(list.to_string_lossy().into_owned());
    }

    args.extend([
        "-vf".to_string(),
        filter,
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        config.preset.clone(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        config.audio_bitrate.clone(),
        "-shortest".to_string(),
        "-y".to_string(),
        output.to_string_lossy().into_owned(),
    ]);
    args
}

/// Mux images, narration and subtitles into a video with ffmpeg
pub async fn create_video(
    config: &LocalVideoConfig,
    image_list: &Path,
    audio_list: &Path,
    subtitles: &Path,
    output: &Path,
) -> Result<(), MediaError> {
    let args = video_args(config, image_list, audio_list, subtitles, output);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    run_tool(&config.ffmpeg_path, &args, Duration::from_secs(config.timeout_secs)).await?;
    info!("Video created: {:?}", output);
    Ok(())
}

/// Size of a 9:16 canvas for an image.
///
/// Images wider than 9:16 keep their width, others keep their height.
pub fn portrait_dimensions(width: u32, height: u32) -> (u32, u32) {
    let (w, h) = (u64::from(width), u64::from(height));
    if 16 * w > 9 * h {
        (width, (w * 16 / 9) as u32)
    } else {
        ((h * 9 / 16) as u32, height)
    }
}

/// Read the width and height of the first video stream (or image)
pub async fn probe_dimensions(config: &LocalVideoConfig, input: &Path) -> Result<(u32, u32), MediaError> {
    let input = input.to_string_lossy().into_owned();
    let args = [
        "-v",
        "error",
        "-select_streams",
        "v:0",
        "-show_entries",
        "stream=width,height",
        "-of",
        "json",
        input.as_str(),
    ];
    let output = run_tool(&config.ffprobe_path, &args, Duration::from_secs(config.timeout_secs)).await?;
    parse_dimensions(&String::from_utf8_lossy(&output.stdout))
}

/// Extract `streams[0].width/height` from ffprobe JSON output
pub fn parse_dimensions(json: &str) -> Result<(u32, u32), MediaError> {
    let parse_error = |message: &str| MediaError::Parse {
        tool: "ffprobe".to_string(),
        message: message.to_string(),
    };

    let value: Value = serde_json::from_str(json).map_err(|_| parse_error("invalid JSON"))?;
    let stream = value
        .get("streams")
        .and_then(|s| s.get(0))
        .ok_or_else(|| parse_error("no video stream"))?;

    let dimension = |key: &str| {
        stream
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
            .ok_or_else(|| parse_error("missing or invalid dimensions"))
    };

    Ok((dimension("width")?, dimension("height")?))
}

/// Stretch an image onto a 9:16 canvas
pub async fn resize_to_portrait(config: &LocalVideoConfig, input: &Path, output: &Path) -> Result<(u32, u32), MediaError> {
    let (width, height) = probe_dimensions(config, input).await?;
    let (new_width, new_height) = portrait_dimensions(width, height);

    let input = input.to_string_lossy().into_owned();
    let output_str = output.to_string_lossy().into_owned();
    let scale = format!("scale={}:{}", new_width, new_height);
    let args = ["-y", "-i", input.as_str(), "-vf", scale.as_str(), output_str.as_str()];

    run_tool(&config.ffmpeg_path, &args, Duration::from_secs(config.timeout_secs)).await?;
    info!("Resized {}x{} -> {}x{}: {:?}", width, height, new_width, new_height, output);
    Ok((new_width, new_height))
}
