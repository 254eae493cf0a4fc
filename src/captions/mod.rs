/*!
 * Caption segmentation and timing.
 *
 * - `segmenter`: narration → sentence → caption-sized pieces
 * - `timing`: subtitle clock arithmetic and the duration oracle seam
 * - `srt`: SubRip output
 */

pub mod segmenter;
pub mod srt;
pub mod timing;

pub use segmenter::{
    filter_valid, is_valid_caption, segment_narration, split_into_sentences, split_sentence, Segmenter,
    SplitState,
};
pub use srt::{render_srt, write_srt, SrtEntry};
pub use timing::{
    accumulate_timestamps, concatenate_tracks, place_captions, time_segments, CaptionTimer, DurationOracle,
    SrtTimestamp, TimedCaption,
};
