use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::DurationProbe;
use crate::errors::MediaError;
use crate::ffmpeg::run_tool;

/// Reads audio duration with `ffprobe`
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: String,
    timeout: Duration,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe", Duration::from_secs(60))
    }
}

#[async_trait]
impl DurationProbe for FfprobeProbe {
    async fn duration_of(&self, path: &Path) -> Result<f64, MediaError> {
        let path = path.to_string_lossy().into_owned();
        let args = [
            "-v",
            "error",
            "-select_streams",
            "a",
            "-show_entries",
            "format=duration",
            "-of",
            "json",
            path.as_str(),
        ];

        let output = run_tool(&self.binary, &args, self.timeout).await?;
        parse_ffprobe_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Extract `format.duration` from ffprobe JSON output
pub fn parse_ffprobe_duration(json: &str) -> Result<f64, MediaError> {
    let parse_error = |message: String| MediaError::Parse {
        tool: "ffprobe".to_string(),
        message,
    };

    let value: Value = serde_json::from_str(json).map_err(|e| parse_error(format!("invalid JSON: {}", e)))?;

    // ffprobe prints numbers as strings, but accept both
    let duration = match value.get("format").and_then(|f| f.get("duration")) {
        Some(Value::String(raw)) => raw
            .trim()
            .parse::<f64>()
            .map_err(|e| parse_error(format!("invalid duration '{}': {}", raw, e)))?,
        Some(Value::Number(number)) => number
            .as_f64()
            .ok_or_else(|| parse_error(format!("invalid duration {}", number)))?,
        _ => return Err(parse_error("missing format.duration".to_string())),
    };

    if !duration.is_finite() || duration < 0.0 {
        return Err(parse_error(format!("invalid duration {}", duration)));
    }

    Ok(duration)
}
