/*!
 * Tests for render source construction and patching
 */

use serde_json::json;

use shortform::app_config::RenderConfig;
use shortform::render::{apply_patch, build_render_source, parse_key_path, PatchOp};
use shortform::story::{Description, NarratedImage};

fn sample_images() -> Vec<NarratedImage> {
    vec![
        NarratedImage::new(
            "http://media/img/a.png",
            vec![
                Description { script: "첫 자막".into(), audio: "http://media/audio/1.mp3".into(), duration: 1.5 },
                Description { script: "둘째 자막".into(), audio: "http://media/audio/2.mp3".into(), duration: 2.5 },
            ],
        ),
        NarratedImage::new(
            "http://media/img/b.png",
            vec![Description { script: "끝".into(), audio: "http://media/audio/3.mp3".into(), duration: 1.0 }],
        ),
    ]
}

/// Test the top-level output settings
#[test]
fn test_buildRenderSource_shouldUseConfiguredOutput() {
    let source = build_render_source("Title", &sample_images(), &RenderConfig::default(), 0x12ab34);

    assert_eq!(source["output_format"], json!("mp4"));
    assert_eq!(source["frame_rate"], json!(60));
    assert_eq!(source["width"], json!(720));
    assert_eq!(source["height"], json!(1280));
    assert_eq!(source["elements"].as_array().map(Vec::len), Some(3));
}

/// Test the title card
#[test]
fn test_buildRenderSource_shouldOpenWithTitleCard() {
    let source = build_render_source("가천대학교", &[], &RenderConfig::default(), 0x0000ff);
    let title = &source["elements"][0];

    assert_eq!(title["type"], json!("composition"));
    assert_eq!(title["duration"], json!(4.0));
    assert_eq!(title["fill_color"], json!("#0000ff"));
    assert_eq!(title["elements"][0]["text"], json!("가천대학교"));
    assert_eq!(title["elements"][0]["font_family"], json!("Yeon Sung"));
    assert_eq!(title["elements"][0]["animations"][0]["type"], json!("text-typewriter"));
}

/// Test the image composition timing
#[test]
fn test_buildRenderSource_imageComposition_shouldLastForNarration() {
    let source = build_render_source("T", &sample_images(), &RenderConfig::default(), 0);
    let first = &source["elements"][1];

    assert_eq!(first["duration"], json!(4.0));
    assert_eq!(first["animations"][0]["type"], json!("fade"));
    assert_eq!(first["animations"][0]["duration"], json!(4.0 * 0.1));

    let image = &first["elements"][0];
    assert_eq!(image["type"], json!("image"));
    assert_eq!(image["source"], json!("http://media/img/a.png"));
    assert_eq!(image["animations"][1]["end_scale"], json!("130%"));
}

/// Test that captions follow each other with their audio
#[test]
fn test_buildRenderSource_captions_shouldBeSequencedWithAudio() {
    let source = build_render_source("T", &sample_images(), &RenderConfig::default(), 0);
    let elements = source["elements"][1]["elements"].as_array().cloned().unwrap_or_default();

    assert_eq!(elements.len(), 3);
    assert_eq!(elements[1]["time"], json!(0.0));
    assert_eq!(elements[1]["duration"], json!(1.5));
    assert_eq!(elements[2]["time"], json!(1.5));
    assert_eq!(elements[2]["elements"][0]["text"], json!("둘째 자막"));
    assert_eq!(elements[2]["elements"][1]["type"], json!("audio"));
    assert_eq!(elements[2]["elements"][1]["source"], json!("http://media/audio/2.mp3"));
    assert_eq!(elements[2]["elements"][1]["duration"], json!(null));
}

/// Test patching nested values of a built source
#[test]
fn test_applyPatch_onRenderSource_shouldOverrideAndRemove() {
    let mut source = build_render_source("T", &sample_images(), &RenderConfig::default(), 0);

    apply_patch(&mut source, &["frame_rate"], PatchOp::Set(json!(30))).unwrap();
    apply_patch(&mut source, &["elements", "0", "fill_color"], PatchOp::Set(json!("#000000"))).unwrap();
    apply_patch(&mut source, &["metadata", "owner"], PatchOp::Set(json!("me"))).unwrap();
    apply_patch(&mut source, &["height"], PatchOp::Remove).unwrap();

    assert_eq!(source["frame_rate"], json!(30));
    assert_eq!(source["elements"][0]["fill_color"], json!("#000000"));
    assert_eq!(source["metadata"], json!({"owner": "me"}));
    assert!(source.get("height").is_none());
}

/// Test that scalars cannot be descended into
#[test]
fn test_applyPatch_throughScalar_shouldFail() {
    let mut source = json!({"frame_rate": 60});
    assert!(apply_patch(&mut source, &["frame_rate", "x"], PatchOp::Set(json!(1))).is_err());
}

/// Test dotted key paths
#[test]
fn test_parseKeyPath_shouldSplitOnDots() {
    assert_eq!(parse_key_path("elements.0.text").unwrap(), vec!["elements", "0", "text"]);
    assert!(parse_key_path("").is_err());
    assert!(parse_key_path("a.").is_err());
}
