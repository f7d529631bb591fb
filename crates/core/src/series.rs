//! Regularly spaced series.

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Sampling frequency of an aligned series.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Hourly,
    Daily,
}

impl Frequency {
    /// Distance between consecutive buckets.
    pub fn step(self) -> Duration {
        match self {
            Frequency::Hourly => Duration::hours(1),
            Frequency::Daily => Duration::days(1),
        }
    }

    /// Start of the bucket containing `ts`.
    pub fn floor(self, ts: NaiveDateTime) -> NaiveDateTime {
        let hour = match self {
            Frequency::Hourly => ts.hour(),
            Frequency::Daily => 0,
        };
        ts.date().and_hms_opt(hour, 0, 0).unwrap_or(ts)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
        }
    }
}

/// Series sampled at a fixed frequency.
///
/// Stored as `start + values`, so timestamps are strictly increasing and evenly
/// spaced by construction. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedSeries {
    frequency: Frequency,
    start: NaiveDateTime,
    values: Vec<f64>,
}

impl AlignedSeries {
    pub fn new(frequency: Frequency, start: NaiveDateTime, values: Vec<f64>) -> DomainResult<Self> {
        if values.is_empty() {
            return Err(DomainError::validation("aligned series cannot be empty"));
        }
        if frequency.floor(start) != start {
            return Err(DomainError::invariant(format!(
                "series start {start} is not on a {} boundary",
                frequency.as_str()
            )));
        }
        Ok(Self {
            frequency,
            start,
            values,
        })
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always `false`; kept for the usual `len`/`is_empty` pairing.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamp_at(&self, index: usize) -> NaiveDateTime {
        self.start + self.frequency.step() * index as i32
    }

    pub fn last_timestamp(&self) -> NaiveDateTime {
        self.timestamp_at(self.values.len() - 1)
    }

    /// The `steps` bucket timestamps immediately following the last observation.
    pub fn future_timestamps(&self, steps: usize) -> Vec<NaiveDateTime> {
        let last = self.last_timestamp();
        (1..=steps)
            .map(|h| last + self.frequency.step() * h as i32)
            .collect()
    }
}
