//! Activity timeline construction
//!
//! Orchestrates the engine stages for one day:
//! 1. IntervalBucketer - step samples into timeline buckets and streak slots
//! 2. ActivityClassifier - tri-state label per bucket
//! 3. LastActivityResolver - most recent fresh active bucket
//! 4. SedentaryStreakAnalyzer - longest sedentary run in the work window
//! 5. Per-hour and stand-hour aggregation
//!
//! Every stage reads the single `now` passed in; nothing consults the wall clock.

use crate::bucketer::{BucketMap, IntervalBucketer};
use crate::classifier::ActivityClassifier;
use crate::config::{hour_of_day, start_of_day, EngineConfig};
use crate::error::EngineError;
use crate::last_activity::LastActivityResolver;
use crate::streak::SedentaryStreakAnalyzer;
use crate::types::{
    ActivitySummary, Classification, HourActivity, Sample, SampleKind, StandHourEntry,
    TimelineEntry,
};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use std::collections::BTreeMap;

/// A stood sample counts once per hour, so any count reaches the threshold
const STAND_HOUR_THRESHOLD: u64 = 1;

/// Builds an [`ActivitySummary`] from raw samples
#[derive(Debug, Clone)]
pub struct ActivityTimelineBuilder {
    config: EngineConfig,
}

impl ActivityTimelineBuilder {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build the summary for the day containing `now`
    pub fn build(&self, samples: &[Sample], now: DateTime<Utc>) -> Result<ActivitySummary, EngineError> {
        let config = &self.config;
        let offset = config.offset()?;
        let day_start = start_of_day(now, offset);

        let steps: Vec<Sample> = samples
            .iter()
            .filter(|s| s.kind == SampleKind::StepCount)
            .cloned()
            .collect();
        let stands: Vec<Sample> = samples
            .iter()
            .filter(|s| s.kind == SampleKind::StandHour)
            .cloned()
            .collect();

        // Timeline at the configured bucket width
        let (buckets, step_stats) = IntervalBucketer::new(config.bucket_width())?
            .bucket_with_stats(&steps, day_start, now)?;
        let classifier = ActivityClassifier::new(config.active_threshold);
        let timeline: Vec<TimelineEntry> = buckets
            .values()
            .map(|bucket| TimelineEntry {
                bucket: *bucket,
                classification: classifier.classify(bucket),
            })
            .collect();
        let active_bucket_count = timeline
            .iter()
            .filter(|e| e.classification == Classification::Active)
            .count();

        let last_activity_at =
            LastActivityResolver::new(config.active_threshold, config.freshness_window())
                .resolve(buckets.values(), now);

        // Streak and per-hour analysis at the finer resolution
        let slots = IntervalBucketer::new(config.streak_resolution())?.bucket(&steps, day_start, now)?;
        let slot_classifier = ActivityClassifier::new(config.minute_active_threshold);
        let slot_classifications: Vec<(DateTime<Utc>, Classification)> = slots
            .values()
            .map(|slot| (slot.start, slot_classifier.classify(slot)))
            .collect();

        let analyzer = SedentaryStreakAnalyzer::new(
            config.work_window,
            config.streak_resolution_minutes,
            offset,
        )
        .with_until(now);
        let longest_sedentary_streak = analyzer.analyze(&slot_classifications);
        let longest_sedentary_streak_minutes =
            longest_sedentary_streak.map_or(0, |streak| streak.minutes);

        let hourly = self.hourly_activity(&slot_classifications, &analyzer, offset);
        let active_hour_count = hourly.iter().filter(|h| h.active_minutes > 0).count();

        // Stand hours
        let (stand_buckets, stand_stats) =
            IntervalBucketer::new(Duration::hours(1))?.bucket_with_stats(&stands, day_start, now)?;
        let sample_stats = step_stats + stand_stats;
        let stand_hours = stand_hour_entries(&stand_buckets, offset);
        let stood_hour_count = stand_hours
            .iter()
            .filter(|h| h.status == Classification::Active)
            .count();
        let last_stand_at = last_stand(&stands, now);
        let seconds_since_last_stand = last_stand_at.map(|at| (now - at).num_seconds());

        tracing::debug!(
            buckets = timeline.len(),
            active_buckets = active_bucket_count,
            streak_minutes = longest_sedentary_streak_minutes,
            stood_hours = stood_hour_count,
            "built activity summary"
        );

        Ok(ActivitySummary {
            now,
            day_start,
            last_activity_at,
            longest_sedentary_streak_minutes,
            longest_sedentary_streak,
            active_bucket_count,
            total_bucket_count: timeline.len(),
            active_hour_count,
            timeline,
            hourly,
            stand_hours,
            stood_hour_count,
            last_stand_at,
            seconds_since_last_stand,
            sample_stats,
        })
    }

    fn hourly_activity(
        &self,
        slot_classifications: &[(DateTime<Utc>, Classification)],
        analyzer: &SedentaryStreakAnalyzer,
        offset: FixedOffset,
    ) -> Vec<HourActivity> {
        let mut by_hour: BTreeMap<u32, (u32, u32)> = BTreeMap::new();

        for &(ts, classification) in slot_classifications {
            let slot_minutes = analyzer.slot_minutes(ts);
            if slot_minutes == 0 {
                continue;
            }
            let (active, observed) = by_hour.entry(hour_of_day(ts, offset)).or_insert((0, 0));
            *observed += slot_minutes;
            if classification == Classification::Active {
                *active += slot_minutes;
            }
        }

        by_hour
            .into_iter()
            .map(|(hour, (active_minutes, observed_minutes))| HourActivity {
                hour,
                active_minutes,
                observed_minutes,
                activity_ratio: if observed_minutes == 0 {
                    0.0
                } else {
                    f64::from(active_minutes) / f64::from(observed_minutes)
                },
            })
            .collect()
    }
}

/// Build the summary for `samples` as of `now`
pub fn build_summary(
    samples: &[Sample],
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Result<ActivitySummary, EngineError> {
    ActivityTimelineBuilder::new(config.clone())?.build(samples, now)
}

fn stand_hour_entries(stand_buckets: &BucketMap, offset: FixedOffset) -> Vec<StandHourEntry> {
    let classifier = ActivityClassifier::new(STAND_HOUR_THRESHOLD);
    stand_buckets
        .values()
        .map(|bucket| StandHourEntry {
            hour: hour_of_day(bucket.start, offset),
            start: bucket.start,
            status: classifier.classify(bucket),
        })
        .collect()
}

/// End of the latest completed "stood" sample
fn last_stand(stands: &[Sample], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    stands
        .iter()
        .filter(|s| s.is_stood() && s.end <= now)
        .map(|s| s.end)
        .max()
}
