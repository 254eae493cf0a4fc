/*!
 * Common test utilities for the shortform test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use shortform::story::Story;


/// Route library logs through the test harness (RUST_LOG=debug to see them)
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Two stories; the second has a section without an image
pub fn sample_stories() -> Vec<Story> {
    vec![
        Story {
            category: "news".to_string(),
            title: "First".to_string(),
            section: vec![
                "Hello there, friend. It is a sunny day.".to_string(),
                "Bye.".to_string(),
            ],
            image: vec![vec!["img/a.png".to_string()], vec!["img/b.png".to_string()]],
        },
        Story {
            category: "news".to_string(),
            title: "Second".to_string(),
            section: vec!["One more.".to_string(), "Lost section.".to_string()],
            image: vec![vec!["img/c.png".to_string(), "img/unused.png".to_string()], vec![]],
        },
    ]
}
