//! Core types for the Last Stand engine
//!
//! This module defines the values that flow through each stage of the engine:
//! raw samples, fixed-width buckets, tri-state classifications and the derived
//! activity summary handed to the presentation layer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Step count or stand-hour tally
pub type Count = u64;

/// Kind of sample delivered by the health-data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    /// Step-count quantity; `value` is the number of steps
    StepCount,
    /// Stand-hour category; `value` is 1 for "stood" and 0 for "idle"
    StandHour,
}

impl SampleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleKind::StepCount => "step_count",
            SampleKind::StandHour => "stand_hour",
        }
    }
}

/// A raw observation from the health-data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub kind: SampleKind,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub value: Count,
}

impl Sample {
    pub fn new(kind: SampleKind, start: DateTime<Utc>, end: DateTime<Utc>, value: Count) -> Self {
        Self {
            kind,
            start,
            end,
            value,
        }
    }

    /// Step-count sample
    pub fn steps(start: DateTime<Utc>, end: DateTime<Utc>, steps: Count) -> Self {
        Self::new(SampleKind::StepCount, start, end, steps)
    }

    /// Stand-hour sample
    pub fn stand_hour(start: DateTime<Utc>, end: DateTime<Utc>, stood: bool) -> Self {
        Self::new(SampleKind::StandHour, start, end, Count::from(stood))
    }

    pub fn is_stood(&self) -> bool {
        self.kind == SampleKind::StandHour && self.value > 0
    }
}

/// A fixed-width time slot `[start, end)` with the samples attributed to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Sum of attributed sample values
    pub count: Count,
    /// False when no sample was attributed, which is not the same as a zero count
    pub has_data: bool,
}

impl Bucket {
    /// Bucket with no attributed samples
    pub fn empty(start: DateTime<Utc>, width: Duration) -> Self {
        Self {
            start,
            end: start + width,
            count: 0,
            has_data: false,
        }
    }

    pub fn record(&mut self, value: Count) {
        self.count = self.count.saturating_add(value);
        self.has_data = true;
    }

    pub fn width(&self) -> Duration {
        self.end - self.start
    }
}

/// Tri-state activity label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Active,
    Inactive,
    Unknown,
}

impl Classification {
    /// Inactive and Unknown both count as sedentary time
    pub fn is_sedentary(&self) -> bool {
        !matches!(self, Classification::Active)
    }
}

/// One timeline slot with its classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    #[serde(flatten)]
    pub bucket: Bucket,
    pub classification: Classification,
}

/// Longest run of sedentary time inside the work window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SedentaryStreak {
    /// Start of the first sedentary slot in the run
    pub start: DateTime<Utc>,
    /// End of the last sedentary slot in the run
    pub end: DateTime<Utc>,
    pub minutes: u32,
}

/// Minute-level activity for one work-window hour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourActivity {
    /// Hour of day (local to the configured offset)
    pub hour: u32,
    pub active_minutes: u32,
    pub observed_minutes: u32,
    /// `active_minutes / observed_minutes`, 0 when nothing was observed
    pub activity_ratio: f64,
}

/// Stand-hour status for one hour of the day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandHourEntry {
    pub hour: u32,
    pub start: DateTime<Utc>,
    pub status: Classification,
}

/// What happened to the samples offered to the bucketers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleStats {
    pub total: usize,
    pub attributed: usize,
    /// Samples ending after `now`
    pub future_discarded: usize,
    /// Samples starting before the start of the day or at/after `now`
    pub outside_window: usize,
}

impl std::ops::Add for SampleStats {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            total: self.total + other.total,
            attributed: self.attributed + other.attributed,
            future_discarded: self.future_discarded + other.future_discarded,
            outside_window: self.outside_window + other.outside_window,
        }
    }
}

/// Derived activity model for one day, recomputed on every run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    /// Reference time the summary was computed against
    pub now: DateTime<Utc>,
    pub day_start: DateTime<Utc>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub longest_sedentary_streak_minutes: u32,
    pub longest_sedentary_streak: Option<SedentaryStreak>,
    pub active_bucket_count: usize,
    pub total_bucket_count: usize,
    /// Work-window hours with at least one active minute
    pub active_hour_count: usize,
    pub timeline: Vec<TimelineEntry>,
    pub hourly: Vec<HourActivity>,
    pub stand_hours: Vec<StandHourEntry>,
    pub stood_hour_count: usize,
    pub last_stand_at: Option<DateTime<Utc>>,
    pub seconds_since_last_stand: Option<i64>,
    pub sample_stats: SampleStats,
}

/// Report producer metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Quality flag indicating data issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    NoStepData,
    NoStandData,
    FutureSamplesDiscarded,
    SamplesOutsideWindow,
    LowCoverage,
}

/// Report quality metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportQuality {
    /// Fraction of timeline buckets with data (0-1)
    pub coverage: f64,
    pub total_samples: usize,
    pub used_samples: usize,
    pub discarded_future_samples: usize,
    pub flags: Vec<QualityFlag>,
}

/// Complete report handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at: DateTime<Utc>,
    pub config: crate::config::EngineConfig,
    pub quality: ReportQuality,
    pub summary: ActivitySummary,
}
