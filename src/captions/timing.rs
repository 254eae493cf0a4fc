use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use log::debug;
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::{CaptionError, OracleError};

// @module: Caption timing on a subtitle clock

/// Point on an `HH:MM:SS,mmm` subtitle clock, stored in whole milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SrtTimestamp {
    millis: u64,
}

impl SrtTimestamp {
    pub const ZERO: Self = Self { millis: 0 };

    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    pub fn as_millis(&self) -> u64 {
        self.millis
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.millis as f64 / 1000.0
    }

    /// Advance the clock by a duration in seconds.
    ///
    /// The duration is first rounded to whole microseconds (ties to even),
    /// then the sub-millisecond remainder of the sum is truncated.
    /// Returns `None` for negative, non-finite or overflowing durations.
    pub fn checked_add_seconds(self, seconds: f64) -> Option<Self> {
        if !seconds.is_finite() || seconds < 0.0 {
            return None;
        }
        let micros = (seconds * 1_000_000.0).round_ties_even();
        if micros >= u64::MAX as f64 {
            return None;
        }
        let total_micros = self.millis.checked_mul(1_000)?.checked_add(micros as u64)?;
        Some(Self { millis: total_micros / 1_000 })
    }
}

impl fmt::Display for SrtTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.millis / 3_600_000;
        let minutes = (self.millis % 3_600_000) / 60_000;
        let seconds = (self.millis % 60_000) / 1_000;
        let millis = self.millis % 1_000;
        write!(f, "{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

impl FromStr for SrtTimestamp {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (clock, millis) = s
            .trim()
            .split_once(',')
            .ok_or_else(|| anyhow!("Invalid timestamp format: {}", s))?;
        let parts: Vec<&str> = clock.split(':').collect();
        if parts.len() != 3 || millis.len() != 3 {
            return Err(anyhow!("Invalid timestamp format: {}", s));
        }

        let hours: u64 = parts[0].parse().context("Failed to parse hours")?;
        let minutes: u64 = parts[1].parse().context("Failed to parse minutes")?;
        let seconds: u64 = parts[2].parse().context("Failed to parse seconds")?;
        let millis: u64 = millis.parse().context("Failed to parse milliseconds")?;

        if minutes >= 60 || seconds >= 60 {
            return Err(anyhow!("Invalid time components in timestamp: {}", s));
        }

        Ok(Self::from_millis(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis))
    }
}

impl Serialize for SrtTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SrtTimestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Maps caption text to the length of its spoken audio
#[async_trait]
pub trait DurationOracle: Send + Sync {
    /// Spoken duration of `text` in `language`, in seconds
    async fn duration(&self, text: &str, language: &str) -> Result<f64, OracleError>;
}

/// A caption placed on the subtitle clock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedCaption {
    pub text: String,
    pub start: SrtTimestamp,
    pub end: SrtTimestamp,
    /// Duration as reported by the oracle, before clock truncation
    pub duration_secs: f64,
}

/// Places captions back to back using durations from an oracle
#[derive(Debug, Clone)]
pub struct CaptionTimer {
    language: String,
    start: SrtTimestamp,
    concurrency: usize,
    timeout: Option<Duration>,
}

impl CaptionTimer {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            start: SrtTimestamp::ZERO,
            concurrency: 1,
            timeout: None,
        }
    }

    /// Clock value of the first caption's start
    pub fn starting_at(mut self, start: SrtTimestamp) -> Self {
        self.start = start;
        self
    }

    /// Number of oracle lookups allowed in flight; results keep caption order
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Bound each oracle call; an expired call fails the whole block
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Measure every caption and chain the timestamps.
    ///
    /// Either every caption is timed or an error is returned; there is no
    /// partial result.
    pub async fn time<O>(&self, captions: &[String], oracle: &O) -> Result<Vec<TimedCaption>, CaptionError>
    where
        O: DurationOracle + ?Sized,
    {
        let durations: Vec<f64> = if self.concurrency <= 1 {
            let mut durations = Vec::with_capacity(captions.len());
            for (index, caption) in captions.iter().enumerate() {
                durations.push(self.measure(oracle, index, caption).await?);
            }
            durations
        } else {
            stream::iter(captions.iter().enumerate())
                .map(|(index, caption)| self.measure(oracle, index, caption))
                .buffered(self.concurrency)
                .try_collect()
                .await?
        };

        let timed = place_captions(captions.iter().cloned().zip(durations), self.start)?;
        if let Some(last) = timed.last() {
            debug!("Timed {} caption(s), ending at {}", timed.len(), last.end);
        }
        Ok(timed)
    }

    async fn measure<O>(&self, oracle: &O, index: usize, caption: &str) -> Result<f64, CaptionError>
    where
        O: DurationOracle + ?Sized,
    {
        let lookup = oracle.duration(caption, &self.language);
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, lookup).await {
                Ok(result) => result,
                Err(_) => Err(OracleError::Timeout(limit)),
            },
            None => lookup.await,
        };

        let duration = result.and_then(|secs| {
            if secs.is_finite() && secs >= 0.0 {
                Ok(secs)
            } else {
                Err(OracleError::InvalidDuration(secs))
            }
        });

        duration.map_err(|source| CaptionError::Oracle {
            index,
            caption: caption.to_string(),
            source,
        })
    }
}

/// Chain already-measured captions onto the clock starting at `start`
pub fn place_captions<I>(captions: I, start: SrtTimestamp) -> Result<Vec<TimedCaption>, CaptionError>
where
    I: IntoIterator<Item = (String, f64)>,
{
    let mut timer = start;
    let mut timed = Vec::new();

    for (index, (text, duration_secs)) in captions.into_iter().enumerate() {
        let end = match timer.checked_add_seconds(duration_secs) {
            Some(end) => end,
            None => {
                return Err(CaptionError::Oracle {
                    index,
                    caption: text,
                    source: OracleError::InvalidDuration(duration_secs),
                });
            }
        };
        timed.push(TimedCaption { text, start: timer, end, duration_secs });
        timer = end;
    }

    Ok(timed)
}

/// Re-chain several timed groups into one continuous track starting at zero
pub fn concatenate_tracks(groups: &[Vec<TimedCaption>]) -> Result<Vec<TimedCaption>, CaptionError> {
    place_captions(
        groups
            .iter()
            .flatten()
            .map(|caption| (caption.text.clone(), caption.duration_secs)),
        SrtTimestamp::ZERO,
    )
}

/// Time captions sequentially from `start`
pub async fn accumulate_timestamps<O>(
    segments: &[String],
    oracle: &O,
    language: &str,
    start: SrtTimestamp,
) -> Result<Vec<TimedCaption>, CaptionError>
where
    O: DurationOracle + ?Sized,
{
    CaptionTimer::new(language).starting_at(start).time(segments, oracle).await
}

/// Time captions sequentially from `00:00:00,000`
pub async fn time_segments<O>(captions: &[String], oracle: &O, language: &str) -> Result<Vec<TimedCaption>, CaptionError>
where
    O: DurationOracle + ?Sized,
{
    accumulate_timestamps(captions, oracle, language, SrtTimestamp::ZERO).await
}
