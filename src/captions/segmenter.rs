use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::CaptionError;

// @module: Narration to caption segmentation

// @const: Sentence terminator plus the whitespace it swallows
static SENTENCE_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[.!?]\s*").unwrap()
});

/// Whether a fragment may still be split at a comma.
///
/// A fragment produced as the left half of a comma split ends with that
/// comma; it is only ever split at spaces afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitState {
    /// No comma split has produced this fragment
    Unprocessed,
    /// Left half of a comma split
    CommaHead,
}

/// Splits narration into captions no longer than a configured length
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    max_length: usize,
}

impl Segmenter {
    /// Create a segmenter; a zero maximum length is rejected
    pub fn new(max_length: usize) -> Result<Self, CaptionError> {
        if max_length == 0 {
            return Err(CaptionError::Configuration(
                "maximum caption length must be greater than zero".to_string(),
            ));
        }
        Ok(Self { max_length })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Split a narration block into ordered, speakable captions
    pub fn segment(&self, narration: &str) -> Vec<String> {
        let sentences = split_into_sentences(narration);

        let mut captions = Vec::new();
        for sentence in &sentences {
            captions.extend(split_sentence(sentence, self.max_length, SplitState::Unprocessed));
        }

        let captions = filter_valid(captions);
        debug!(
            "Segmented {} sentence(s) into {} caption(s) (max {} chars)",
            sentences.len(),
            captions.len(),
            self.max_length
        );
        captions
    }
}

/// Segment narration text into captions of at most `max_length` characters
pub fn segment_narration(narration: &str, max_length: usize) -> Result<Vec<String>, CaptionError> {
    Ok(Segmenter::new(max_length)?.segment(narration))
}

/// Split narration after every `.`, `!` or `?`, consuming the whitespace that follows.
///
/// The final piece is always discarded. When the narration ends on a
/// terminator that piece is the empty remainder; when it does not, the
/// unterminated last sentence is lost.
pub fn split_into_sentences(narration: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_BOUNDARY.find_iter(narration) {
        // Terminators are single-byte ASCII
        let end = boundary.start() + 1;
        sentences.push(narration[start..end].to_string());
        start = boundary.end();
    }
    sentences.push(narration[start..].to_string());

    sentences.pop();
    sentences
}

/// Recursively split a sentence into pieces of at most `max_length` characters.
///
/// Lengths are counted in characters, not bytes. A piece with no comma
/// and no space to split at is returned whole, even when too long.
pub fn split_sentence(sentence: &str, max_length: usize, state: SplitState) -> Vec<String> {
    let chars: Vec<char> = sentence.chars().collect();
    let mut pieces = Vec::new();
    split_chars(&chars, max_length, state, &mut pieces);
    pieces
}

fn split_chars(chars: &[char], max_length: usize, state: SplitState, pieces: &mut Vec<String>) {
    if chars.len() <= max_length {
        pieces.push(chars.iter().collect());
        return;
    }

    if state == SplitState::Unprocessed {
        if let Some(comma) = find_nearest_comma(chars) {
            split_chars(&chars[..=comma], max_length, SplitState::CommaHead, pieces);
            split_chars(trim_chars(&chars[comma + 1..]), max_length, SplitState::Unprocessed, pieces);
            return;
        }
    }

    match find_split_space(chars) {
        Some(space) => {
            split_chars(&chars[..space], max_length, SplitState::Unprocessed, pieces);
            split_chars(&chars[space + 1..], max_length, SplitState::Unprocessed, pieces);
        }
        None => pieces.push(chars.iter().collect()),
    }
}

/// Index of the comma closest to the middle; the lower index wins ties
fn find_nearest_comma(chars: &[char]) -> Option<usize> {
    let mid = chars.len() / 2;
    chars
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == ',')
        .map(|(i, _)| i)
        .min_by_key(|&i| i.abs_diff(mid))
}

/// Space to split at: last one before the middle or first one from the middle on
fn find_split_space(chars: &[char]) -> Option<usize> {
    let mid = chars.len() / 2;
    let left = chars[..mid].iter().rposition(|&c| c == ' ');
    let right = chars[mid..].iter().position(|&c| c == ' ').map(|offset| mid + offset);

    match (left, right) {
        (Some(left), Some(right)) if mid - left <= right - mid => Some(left),
        (Some(left), None) => Some(left),
        (_, Some(right)) => Some(right),
        (None, None) => None,
    }
}

fn trim_chars(chars: &[char]) -> &[char] {
    let start = chars.iter().position(|c| !c.is_whitespace()).unwrap_or(chars.len());
    let end = chars.iter().rposition(|c| !c.is_whitespace()).map_or(start, |i| i + 1);
    &chars[start..end]
}

/// A caption is worth speaking if it has at least one letter or digit
pub fn is_valid_caption(text: &str) -> bool {
    !text.trim().is_empty() && text.chars().any(char::is_alphanumeric)
}

/// Drop empty and punctuation-only fragments
pub fn filter_valid(segments: Vec<String>) -> Vec<String> {
    segments.into_iter().filter(|s| is_valid_caption(s)).collect()
}
