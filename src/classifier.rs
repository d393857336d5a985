//! Bucket classification

use crate::types::{Bucket, Classification, Count};

/// Maps a bucket's count to a tri-state label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityClassifier {
    active_threshold: Count,
}

impl ActivityClassifier {
    pub fn new(active_threshold: Count) -> Self {
        Self { active_threshold }
    }

    pub fn active_threshold(&self) -> Count {
        self.active_threshold
    }

    pub fn classify(&self, bucket: &Bucket) -> Classification {
        self.classify_count(bucket.has_data, bucket.count)
    }

    pub fn classify_count(&self, has_data: bool, count: Count) -> Classification {
        if !has_data {
            Classification::Unknown
        } else if count >= self.active_threshold {
            Classification::Active
        } else {
            Classification::Inactive
        }
    }
}

pub fn classify(bucket: &Bucket, active_threshold: Count) -> Classification {
    ActivityClassifier::new(active_threshold).classify(bucket)
}
