/*!
 * Tests for SRT output
 */

use anyhow::Result;
use shortform::captions::{place_captions, render_srt, write_srt, SrtTimestamp};
use shortform::file_utils::FileManager;

use crate::common;

/// Test that cues are numbered from one and separated by blank lines
#[test]
fn test_renderSrt_withTwoCaptions_shouldFormatCues() -> Result<()> {
    let captions = place_captions(
        vec![("안녕하세요.".to_string(), 1.25), ("Bye.".to_string(), 0.5)],
        SrtTimestamp::ZERO,
    )?;

    let expected = "1\n00:00:00,000 --> 00:00:01,250\n안녕하세요.\n\n2\n00:00:01,250 --> 00:00:01,750\nBye.\n\n";
    assert_eq!(render_srt(&captions), expected);
    Ok(())
}

/// Test that nothing is rendered for an empty timeline
#[test]
fn test_renderSrt_withNoCaptions_shouldBeEmpty() {
    assert_eq!(render_srt(&[]), "");
}

/// Test that write_srt creates missing directories and matches render_srt
#[test]
fn test_writeSrt_withNestedPath_shouldCreateDirectories() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("nested/dir/out.srt");
    let captions = place_captions(vec![("Hi.".to_string(), 1.0)], SrtTimestamp::ZERO)?;

    write_srt(&path, &captions)?;

    assert_eq!(FileManager::read_to_string(&path)?, render_srt(&captions));
    Ok(())
}
