use anyhow::{anyhow, bail, Result};
use rand::Rng;
use serde_json::{json, Value};

use crate::app_config::RenderConfig;
use crate::story::{Description, NarratedImage};

/// Length of the title card in seconds
pub const TITLE_DURATION_SECS: f64 = 4.0;

/// Random opaque colour for the title card background
pub fn random_title_color() -> u32 {
    rand::rng().random_range(0..=0xFF_FFFF)
}

/// Build the render source for one narrated story.
///
/// The scene opens with a title card, then shows each image for as long
/// as its narration lasts, with the captions and their audio laid over it.
pub fn build_render_source(title: &str, images: &[NarratedImage], config: &RenderConfig, title_color: u32) -> Value {
    let mut elements = vec![title_card(title, title_color)];
    elements.extend(images.iter().map(image_composition));

    json!({
        "output_format": config.output_format,
        "frame_rate": config.frame_rate,
        "width": config.width,
        "height": config.height,
        "elements": elements,
    })
}

fn title_card(title: &str, color: u32) -> Value {
    json!({
        "type": "composition",
        "track": 1,
        "time": 0,
        "duration": TITLE_DURATION_SECS,
        "fill_color": format!("#{:06x}", color & 0xFF_FFFF),
        "clip": true,
        "elements": [{
            "type": "text",
            "track": 1,
            "time": 0,
            "duration": 3,
            "dynamic": true,
            "width": "52.2433%",
            "height": "35.6373%",
            "x_alignment": "50%",
            "y_alignment": "50%",
            "fill_color": "#ffffff",
            "animations": [
                {
                    "time": "end",
                    "duration": 3,
                    "easing": "quadratic-out",
                    "type": "text-typewriter",
                    "typing_start": "0 s",
                    "typing_duration": "1.5 s",
                },
                {
                    "time": "end",
                    "duration": 2.35,
                    "easing": "linear",
                    "type": "scale",
                    "fade": false,
                    "scope": "element",
                    "track": 0,
                    "start_scale": "130%",
                },
            ],
            "text": title,
            "font_family": "Yeon Sung",
            "font_size_minimum": "10 vmin",
            "font_size_maximum": "20 vmin",
            "text_transform": "uppercase",
        }],
    })
}

fn image_composition(image: &NarratedImage) -> Value {
    let total = image.total_duration;
    let intro = total * 0.1;

    let mut elements = vec![json!({
        "type": "image",
        "track": 1,
        "time": 0,
        "duration": total,
        "dynamic": true,
        "color_overlay": "rgba(0,0,0,0.25)",
        "animations": [
            {
                "time": 0,
                "duration": intro,
                "easing": "quadratic-out",
                "type": "slide",
                "direction": "180",
            },
            {
                "time": intro,
                "duration": total * 0.9,
                "easing": "linear",
                "type": "scale",
                "fade": false,
                "scope": "element",
                "end_scale": "130%",
                "start_scale": "100%",
            },
        ],
        "source": image.source,
    })];

    let mut offset = 0.0;
    for description in &image.descriptions {
        elements.push(caption_composition(description, offset));
        offset += description.duration;
    }

    json!({
        "type": "composition",
        "track": 1,
        "duration": total,
        "clip": true,
        "animations": [{
            "time": 0,
            "duration": intro,
            "transition": true,
            "type": "fade",
        }],
        "elements": elements,
    })
}

// Captions share track 2 and start where the previous one ended
fn caption_composition(description: &Description, start: f64) -> Value {
    json!({
        "type": "composition",
        "track": 2,
        "time": start,
        "duration": description.duration,
        "elements": [
            {
                "type": "text",
                "track": 1,
                "time": 0,
                "x": "5%",
                "width": "90%",
                "x_anchor": "0%",
                "y_anchor": "0%",
                "x_alignment": "50%",
                "y_alignment": "50%",
                "fill_color": "#090101",
                "animations": [{
                    "easing": "quadratic-out",
                    "type": "text-typewriter",
                }],
                "text": description.script,
                "font_family": "Noto Sans",
                "font_size": "7 vmin",
                "background_color": "rgba(255,255,255,1)",
                "background_x_padding": "10%",
                "background_y_padding": "10%",
            },
            {
                "type": "audio",
                "track": 2,
                "time": 0,
                "duration": null,
                "source": description.audio,
            },
        ],
    })
}

/// Edit applied at the end of a key path
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// Insert or replace the value
    Set(Value),
    /// Delete the key if present
    Remove,
}

/// Modify a nested JSON document in place.
///
/// Missing intermediate objects are created. Array elements are addressed
/// by index. Removing a key that does not exist is not an error.
pub fn apply_patch(document: &mut Value, key_path: &[&str], op: PatchOp) -> Result<()> {
    let Some((last, parents)) = key_path.split_last() else {
        bail!("Key path must not be empty");
    };

    let mut current = document;
    for key in parents {
        current = match current {
            Value::Object(map) => map.entry(key.to_string()).or_insert_with(|| json!({})),
            Value::Array(items) => {
                let index = array_index(key, items.len())?;
                &mut items[index]
            }
            other => bail!("Cannot descend into {} at '{}'", type_name(other), key),
        };
    }

    match (current, op) {
        (Value::Object(map), PatchOp::Set(value)) => {
            map.insert(last.to_string(), value);
        }
        (Value::Object(map), PatchOp::Remove) => {
            map.remove(*last);
        }
        (Value::Array(items), PatchOp::Set(value)) => {
            let index = array_index(last, items.len())?;
            items[index] = value;
        }
        (Value::Array(items), PatchOp::Remove) => {
            if let Ok(index) = array_index(last, items.len()) {
                items.remove(index);
            }
        }
        (other, _) => bail!("Cannot modify {} at '{}'", type_name(other), last),
    }

    Ok(())
}

fn array_index(key: &str, len: usize) -> Result<usize> {
    key.parse::<usize>()
        .ok()
        .filter(|index| *index < len)
        .ok_or_else(|| anyhow!("'{}' is not a valid index for an array of {} elements", key, len))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse a `path.to.key=value` override.
///
/// The value is read as JSON when it parses, otherwise as a plain string.
pub fn parse_override(raw: &str) -> Result<(Vec<String>, PatchOp)> {
    let (path, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Override '{}' must look like path.to.key=value", raw))?;

    let key_path = parse_key_path(path)?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key_path, PatchOp::Set(value)))
}

/// Split a dotted key path
pub fn parse_key_path(path: &str) -> Result<Vec<String>> {
    let keys: Vec<String> = path.trim().split('.').map(str::to_string).collect();
    if keys.iter().any(String::is_empty) {
        bail!("Invalid key path '{}'", path);
    }
    Ok(keys)
}
