/*!
 * Tests for ffmpeg helpers
 */

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

use shortform::app_config::LocalVideoConfig;
use shortform::errors::MediaError;
use shortform::ffmpeg::{
    concat_list_contents, escape_filter_path, parse_dimensions, portrait_dimensions, run_tool, video_args,
    write_concat_list, ConcatEntry,
};
use shortform::file_utils::FileManager;

use crate::common;

/// Test image lists: durations per still and the final still repeated
#[test]
fn test_concatListContents_withStills_shouldRepeatLastImage() {
    let entries = vec![
        ConcatEntry::still("/tmp/a.png", 2.5),
        ConcatEntry::still("/tmp/b.png", 1.0),
    ];

    assert_eq!(
        concat_list_contents(&entries),
        "file '/tmp/a.png'\nduration 2.500\nfile '/tmp/b.png'\nduration 1.000\nfile '/tmp/b.png'\n"
    );
}

/// Test audio lists: plain file lines
#[test]
fn test_concatListContents_withAudio_shouldListFilesOnly() {
    let entries = vec![ConcatEntry::file("/tmp/1.mp3"), ConcatEntry::file("/tmp/2.mp3")];
    assert_eq!(concat_list_contents(&entries), "file '/tmp/1.mp3'\nfile '/tmp/2.mp3'\n");
    assert_eq!(concat_list_contents(&[]), "");
}

/// Test single quotes in paths
#[test]
fn test_concatListContents_withQuote_shouldEscape() {
    let entries = vec![ConcatEntry::file("/tmp/it's.mp3")];
    assert_eq!(concat_list_contents(&entries), "file '/tmp/it'\\''s.mp3'\n");
}

/// Test writing a list file
#[test]
fn test_writeConcatList_shouldCreateFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("lists/audio.txt");

    write_concat_list(&path, &[ConcatEntry::file("/tmp/1.mp3")])?;

    assert_eq!(FileManager::read_to_string(&path)?, "file '/tmp/1.mp3'\n");
    Ok(())
}

/// Test filtergraph escaping
#[test]
fn test_escapeFilterPath_shouldEscapeSpecialCharacters() {
    assert_eq!(escape_filter_path(Path::new("out/a.srt")), "out/a.srt");
    assert_eq!(escape_filter_path(Path::new("C:/subs/it's,1.srt")), "C\\:/subs/it\\'s\\,1.srt");
}

/// Test the mux command line
#[test]
fn test_videoArgs_shouldBuildMuxCommand() {
    let config = LocalVideoConfig::default();
    let args = video_args(
        &config,
        Path::new("images.txt"),
        Path::new("audio.txt"),
        Path::new("subs.srt"),
        Path::new("out.mp4"),
    );

    assert_eq!(
        args,
        vec![
            "-f", "concat", "-safe", "0", "-i", "images.txt",
            "-f", "concat", "-safe", "0", "-i", "audio.txt",
            "-vf", "format=yuv420p,pad=ceil(iw/2)*2:ceil(ih/2)*2,subtitles=subs.srt",
            "-c:v", "libx264", "-preset", "fast",
            "-c:a", "aac", "-b:a", "192k",
            "-shortest", "-y", "out.mp4",
        ]
    );
}

/// Test the 9:16 canvas math
#[test]
fn test_portraitDimensions_shouldKeepTheLimitingSide() {
    // Wider than 9:16: width kept
    assert_eq!(portrait_dimensions(1920, 1080), (1920, 3413));
    assert_eq!(portrait_dimensions(900, 1000), (900, 1600));
    // Exactly 9:16 or narrower: height kept
    assert_eq!(portrait_dimensions(1080, 1920), (1080, 1920));
    assert_eq!(portrait_dimensions(100, 1000), (562, 1000));
}

/// Test parsing ffprobe stream output
#[test]
fn test_parseDimensions_shouldReadFirstStream() {
    let json = r#"{"programs":[],"streams":[{"width":1280,"height":720}]}"#;
    assert_eq!(parse_dimensions(json).unwrap(), (1280, 720));

    assert!(matches!(parse_dimensions(r#"{"streams":[]}"#), Err(MediaError::Parse { .. })));
    assert!(parse_dimensions(r#"{"streams":[{"width":0,"height":720}]}"#).is_err());
}

/// Test that a missing binary is reported distinctly
#[tokio::test]
async fn test_runTool_withMissingBinary_shouldReturnNotFound() {
    let binary = PathBuf::from("/nonexistent/shortform-no-such-tool");
    let result = run_tool(&binary.to_string_lossy(), &["-version"], Duration::from_secs(5)).await;

    assert!(matches!(result, Err(MediaError::NotFound(_))));
}
