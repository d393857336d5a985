//! Last-activity resolution
//!
//! Walks buckets newest-first and stops at the first one that is both busy
//! enough and recent enough. A single busy bucket from hours ago must not keep
//! reporting the user as currently active, hence the freshness window.

use crate::types::{Bucket, Count};
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy)]
pub struct LastActivityResolver {
    active_threshold: Count,
    freshness_window: Duration,
}

impl LastActivityResolver {
    pub fn new(active_threshold: Count, freshness_window: Duration) -> Self {
        Self {
            active_threshold,
            freshness_window,
        }
    }

    /// Start of the most recent qualifying bucket, or `None` when nothing qualifies.
    ///
    /// `buckets` must be ordered by start ascending. A bucket qualifies when it
    /// has data, its count reaches the threshold and `now - end` is within the
    /// freshness window.
    pub fn resolve<'a, I>(&self, buckets: I, now: DateTime<Utc>) -> Option<DateTime<Utc>>
    where
        I: IntoIterator<Item = &'a Bucket>,
        I::IntoIter: DoubleEndedIterator,
    {
        buckets
            .into_iter()
            .rev()
            .find(|bucket| self.qualifies(bucket, now))
            .map(|bucket| bucket.start)
    }

    fn qualifies(&self, bucket: &Bucket, now: DateTime<Utc>) -> bool {
        bucket.has_data
            && bucket.count >= self.active_threshold
            && now - bucket.end <= self.freshness_window
    }
}

pub fn resolve_last_activity(
    buckets: &[Bucket],
    now: DateTime<Utc>,
    active_threshold: Count,
    freshness_window: Duration,
) -> Option<DateTime<Utc>> {
    LastActivityResolver::new(active_threshold, freshness_window).resolve(buckets, now)
}
