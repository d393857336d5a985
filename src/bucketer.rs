//! Interval bucketing
//!
//! Splits `[window_start, window_end)` into fixed-width slots and attributes
//! each sample to the slot containing its start. The window end doubles as
//! "now": slots starting at or after it are never created and samples ending
//! after it are dropped, since provisional platform records are not trusted.

use crate::error::EngineError;
use crate::types::{Bucket, Sample, SampleStats};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// Buckets keyed by start time, ascending
pub type BucketMap = BTreeMap<DateTime<Utc>, Bucket>;

/// Fixed-width bucketer
#[derive(Debug, Clone, Copy)]
pub struct IntervalBucketer {
    width: Duration,
}

impl IntervalBucketer {
    pub fn new(width: Duration) -> Result<Self, EngineError> {
        if width <= Duration::zero() {
            return Err(EngineError::InvalidWindow(format!(
                "bucket width must be positive, got {}s",
                width.num_seconds()
            )));
        }
        // slot_index works in whole milliseconds
        if width < Duration::milliseconds(1) {
            return Err(EngineError::InvalidWindow(format!(
                "bucket width must be at least 1ms, got {}ns",
                width.num_nanoseconds().unwrap_or_default()
            )));
        }
        Ok(Self { width })
    }

    pub fn width(&self) -> Duration {
        self.width
    }

    /// Bucket `samples` into `[window_start, window_end)`
    pub fn bucket(
        &self,
        samples: &[Sample],
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<BucketMap, EngineError> {
        self.bucket_with_stats(samples, window_start, window_end)
            .map(|(buckets, _)| buckets)
    }

    /// Same as [`IntervalBucketer::bucket`], also reporting what happened to each sample
    pub fn bucket_with_stats(
        &self,
        samples: &[Sample],
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<(BucketMap, SampleStats), EngineError> {
        if window_start > window_end {
            return Err(EngineError::InvalidWindow(format!(
                "window start {} is after window end {}",
                window_start.to_rfc3339(),
                window_end.to_rfc3339()
            )));
        }

        let mut slots = self.empty_slots(window_start, window_end);
        let mut stats = SampleStats {
            total: samples.len(),
            ..SampleStats::default()
        };

        for sample in samples {
            if sample.end > window_end {
                stats.future_discarded += 1;
                continue;
            }
            if sample.start < window_start || sample.start >= window_end {
                stats.outside_window += 1;
                continue;
            }
            match self.slot_index(window_start, sample.start) {
                Some(index) if index < slots.len() => {
                    slots[index].record(sample.value);
                    stats.attributed += 1;
                }
                _ => stats.outside_window += 1,
            }
        }

        if stats.future_discarded > 0 || stats.outside_window > 0 {
            tracing::debug!(
                future_discarded = stats.future_discarded,
                outside_window = stats.outside_window,
                attributed = stats.attributed,
                "dropped samples while bucketing"
            );
        }

        let buckets = slots.into_iter().map(|b| (b.start, b)).collect();
        Ok((buckets, stats))
    }

    fn empty_slots(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> Vec<Bucket> {
        let mut slots = Vec::new();
        let mut start = window_start;
        while start < window_end {
            slots.push(Bucket::empty(start, self.width));
            start += self.width;
        }
        slots
    }

    fn slot_index(&self, window_start: DateTime<Utc>, ts: DateTime<Utc>) -> Option<usize> {
        let offset = (ts - window_start).num_milliseconds();
        let width = self.width.num_milliseconds();
        if offset < 0 || width <= 0 {
            return None;
        }
        usize::try_from(offset / width).ok()
    }
}

/// Bucket `samples` into `width`-sized slots covering `[window_start, window_end)`
pub fn bucket(
    samples: &[Sample],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    width: Duration,
) -> Result<BucketMap, EngineError> {
    IntervalBucketer::new(width)?.bucket(samples, window_start, window_end)
}
