/*!
 * # shortform
 *
 * A Rust library for turning written stories into narrated, captioned
 * vertical (9:16) short videos.
 *
 * ## Features
 *
 * - Split narration into short, speakable captions
 * - Time captions against synthesized speech and write SRT files
 * - Synthesize narration with the Google Translate TTS endpoint
 * - Render videos with a remote render API, from scene JSON or templates
 * - Mux videos locally with ffmpeg
 * - Serve local media over HTTP for the render service
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `captions`: caption segmentation, timing and SRT output
 *   - `captions::segmenter`: narration to caption-sized pieces
 *   - `captions::timing`: subtitle clock and the duration oracle seam
 *   - `captions::srt`: SubRip formatting
 * - `speech`: text-to-speech and duration measurement
 * - `render`: render source construction and the render API client
 * - `ffmpeg`: local muxing and image resizing
 * - `server`: static file server
 * - `story`: story and narrated story data model
 * - `app_controller`: workflows tying everything together
 * - `app_config`: configuration management
 * - `file_utils`: file system operations and run naming
 * - `language_utils`: ISO language code utilities
 * - `errors`: custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod captions;
pub mod errors;
pub mod ffmpeg;
pub mod file_utils;
pub mod language_utils;
pub mod render;
pub mod server;
pub mod speech;
pub mod story;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use captions::{segment_narration, time_segments, DurationOracle, Segmenter, SrtTimestamp, TimedCaption};
pub use errors::{AppError, CaptionError, MediaError, OracleError, ProviderError, RenderError};
pub use language_utils::{get_language_name, language_codes_match};
