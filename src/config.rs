//! Engine configuration
//!
//! Thresholds and windows are product decisions, so every one of them is a
//! plain value here rather than a constant baked into the classifiers.

use crate::error::EngineError;
use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BUCKET_WIDTH_MINUTES: u32 = 5;
pub const DEFAULT_ACTIVE_THRESHOLD: u64 = 20;
pub const DEFAULT_FRESHNESS_WINDOW_SECS: u32 = 900;
pub const DEFAULT_STREAK_RESOLUTION_MINUTES: u32 = 1;
pub const DEFAULT_MINUTE_ACTIVE_THRESHOLD: u64 = 1;

const MINUTES_PER_DAY: u32 = 24 * 60;
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

/// Hour-of-day range `[start_hour:00, end_hour:00)` used for streak analysis
///
/// The end hour is exclusive: `9..17` covers 8 hours and stops at 17:00. To
/// include the whole 17:00 hour, as an inclusive `9...17` range would, use an
/// end hour of 18.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for WorkWindow {
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 17,
        }
    }
}

impl WorkWindow {
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    pub fn contains_hour(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }

    pub fn hours(&self) -> std::ops::Range<u32> {
        self.start_hour..self.end_hour
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.end_hour > 24 {
            return Err(EngineError::InvalidConfig(format!(
                "work window end hour {} is past 24",
                self.end_hour
            )));
        }
        if self.start_hour >= self.end_hour {
            return Err(EngineError::InvalidConfig(format!(
                "work window start hour {} must be before end hour {}",
                self.start_hour, self.end_hour
            )));
        }
        Ok(())
    }
}

/// Configuration for a summary run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Width of the timeline buckets (minutes)
    pub bucket_width_minutes: u32,
    /// Steps per timeline bucket needed to be Active
    pub active_threshold: u64,
    /// Maximum age of a qualifying bucket's end for last-activity (seconds)
    pub freshness_window_secs: u32,
    /// Hours in which sedentary streaks are tracked
    pub work_window: WorkWindow,
    /// Bucket width for streak and per-hour analysis (minutes)
    pub streak_resolution_minutes: u32,
    /// Steps per streak bucket needed to be Active
    pub minute_active_threshold: u64,
    /// Fixed UTC offset used for start-of-day and hour-of-day
    pub utc_offset_minutes: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bucket_width_minutes: DEFAULT_BUCKET_WIDTH_MINUTES,
            active_threshold: DEFAULT_ACTIVE_THRESHOLD,
            freshness_window_secs: DEFAULT_FRESHNESS_WINDOW_SECS,
            work_window: WorkWindow::default(),
            streak_resolution_minutes: DEFAULT_STREAK_RESOLUTION_MINUTES,
            minute_active_threshold: DEFAULT_MINUTE_ACTIVE_THRESHOLD,
            utc_offset_minutes: 0,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config; missing fields fall back to defaults
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        validate_width("bucket_width_minutes", self.bucket_width_minutes)?;
        validate_width("streak_resolution_minutes", self.streak_resolution_minutes)?;
        if 60 % self.streak_resolution_minutes != 0 {
            return Err(EngineError::InvalidConfig(format!(
                "streak_resolution_minutes of {} does not divide an hour",
                self.streak_resolution_minutes
            )));
        }
        self.work_window.validate()?;
        if self.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(EngineError::InvalidConfig(format!(
                "utc offset {} minutes is outside +/-18h",
                self.utc_offset_minutes
            )));
        }
        Ok(())
    }

    pub fn bucket_width(&self) -> Duration {
        Duration::minutes(i64::from(self.bucket_width_minutes))
    }

    pub fn streak_resolution(&self) -> Duration {
        Duration::minutes(i64::from(self.streak_resolution_minutes))
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::seconds(i64::from(self.freshness_window_secs))
    }

    pub fn offset(&self) -> Result<FixedOffset, EngineError> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            EngineError::InvalidConfig(format!(
                "utc offset {} minutes is not representable",
                self.utc_offset_minutes
            ))
        })
    }
}

fn validate_width(name: &str, minutes: u32) -> Result<(), EngineError> {
    if minutes == 0 {
        return Err(EngineError::InvalidWindow(format!("{name} must be positive")));
    }
    if minutes > MINUTES_PER_DAY {
        return Err(EngineError::InvalidConfig(format!(
            "{name} of {minutes} minutes exceeds one day"
        )));
    }
    Ok(())
}

/// Local midnight (in `offset`) of the day containing `now`
pub fn start_of_day(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local = now.with_timezone(&offset);
    let since_midnight = Duration::seconds(i64::from(local.num_seconds_from_midnight()))
        + Duration::nanoseconds(i64::from(local.nanosecond()));
    now - since_midnight
}

/// Hour of day of `ts` in `offset`
pub fn hour_of_day(ts: DateTime<Utc>, offset: FixedOffset) -> u32 {
    ts.with_timezone(&offset).hour()
}
