//! Property-based tests for the engine stages.
//!
//! Verifies invariants that must hold for arbitrary inputs:
//! - Bucket count, contiguity and coverage for widths dividing a day
//! - Future-dated samples never reach a bucket
//! - Classification is monotonic in count
//! - Last activity always points at a qualifying, fresh bucket
//! - Summaries are idempotent and streaks never exceed elapsed work minutes

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use last_stand::types::{Bucket, Classification, Count, Sample};
use last_stand::{bucket, classify, resolve_last_activity, summarize, EngineConfig};

// =============================================================================
// Helpers
// =============================================================================

const MINUTES_PER_DAY: i64 = 1440;

fn day_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn minute(m: i64) -> DateTime<Utc> {
    day_start() + Duration::minutes(m)
}

fn rank(c: Classification) -> u8 {
    match c {
        Classification::Unknown => 0,
        Classification::Inactive => 1,
        Classification::Active => 2,
    }
}

// =============================================================================
// Proptest strategies
// =============================================================================

/// Bucket widths (minutes) that divide a day evenly.
fn arb_day_divisor() -> impl Strategy<Value = i64> {
    prop::sample::select(vec![
        1i64, 2, 3, 4, 5, 6, 8, 9, 10, 12, 15, 16, 18, 20, 24, 30, 32, 36, 40, 45, 48, 60, 72, 80,
        90, 96, 120, 144, 160, 180, 240, 288, 360, 480, 720, 1440,
    ])
}

/// Step sample starting somewhere in the day, lasting up to two hours.
fn arb_step_sample() -> impl Strategy<Value = Sample> {
    (0i64..MINUTES_PER_DAY, 0i64..=120, 0u64..=200).prop_map(|(start, len, steps)| {
        Sample::steps(minute(start), minute(start + len), steps)
    })
}

fn arb_samples() -> impl Strategy<Value = Vec<Sample>> {
    prop::collection::vec(arb_step_sample(), 0..60)
}

// =============================================================================
// Bucketing
// =============================================================================

proptest! {
    #[test]
    fn full_day_bucket_count(width in arb_day_divisor()) {
        let end = minute(MINUTES_PER_DAY);
        let buckets = bucket(&[], day_start(), end, Duration::minutes(width)).unwrap();

        prop_assert_eq!(buckets.len() as i64, MINUTES_PER_DAY / width);

        let slots: Vec<&Bucket> = buckets.values().collect();
        prop_assert_eq!(slots[0].start, day_start());
        prop_assert_eq!(slots[slots.len() - 1].end, end);
        for pair in slots.windows(2) {
            prop_assert_eq!(pair[0].end, pair[1].start);
        }
        prop_assert!(slots.iter().all(|b| !b.has_data && b.count == 0));
    }

    #[test]
    fn no_slot_starts_at_or_after_now(width in 1i64..=90, now in 1i64..MINUTES_PER_DAY) {
        let buckets = bucket(&[], day_start(), minute(now), Duration::minutes(width)).unwrap();
        prop_assert!(buckets.values().all(|b| b.start < minute(now)));
        prop_assert_eq!(buckets.len() as i64, (now + width - 1) / width);
    }

    #[test]
    fn future_samples_are_excluded(
        samples in arb_samples(),
        width in arb_day_divisor(),
        now in 1i64..=MINUTES_PER_DAY,
    ) {
        let now = minute(now);
        let buckets = bucket(&samples, day_start(), now, Duration::minutes(width)).unwrap();

        let bucketed: Count = buckets.values().map(|b| b.count).sum();
        let expected: Count = samples
            .iter()
            .filter(|s| s.end <= now && s.start < now)
            .map(|s| s.value)
            .sum();
        prop_assert_eq!(bucketed, expected);
    }
}

// =============================================================================
// Classification
// =============================================================================

proptest! {
    #[test]
    fn classification_is_monotonic_in_count(
        threshold in 0u64..=100,
        a in 0u64..=200,
        b in 0u64..=200,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let mk = |count| Bucket { start: day_start(), end: minute(5), count, has_data: true };

        let low_class = classify(&mk(low), threshold);
        let high_class = classify(&mk(high), threshold);
        prop_assert!(rank(low_class) <= rank(high_class));
        prop_assert_ne!(low_class, Classification::Unknown);
    }

    #[test]
    fn no_data_is_always_unknown(threshold in 0u64..=100, count in 0u64..=200) {
        let bucket = Bucket { start: day_start(), end: minute(5), count, has_data: false };
        prop_assert_eq!(classify(&bucket, threshold), Classification::Unknown);
    }
}

// =============================================================================
// Last activity
// =============================================================================

proptest! {
    #[test]
    fn last_activity_is_fresh_and_active(
        samples in arb_samples(),
        now in 1i64..=MINUTES_PER_DAY,
        threshold in 1u64..=60,
        freshness_secs in 0i64..=3600,
    ) {
        let now = minute(now);
        let freshness = Duration::seconds(freshness_secs);
        let buckets: Vec<Bucket> = bucket(&samples, day_start(), now, Duration::minutes(5))
            .unwrap()
            .into_values()
            .collect();

        let qualifies =
            |b: &Bucket| b.has_data && b.count >= threshold && now - b.end <= freshness;

        match resolve_last_activity(&buckets, now, threshold, freshness) {
            Some(at) => {
                let hit = buckets.iter().find(|b| b.start == at).unwrap();
                prop_assert!(qualifies(hit));
                prop_assert!(buckets.iter().filter(|b| b.start > at).all(|b| !qualifies(b)));
            }
            None => prop_assert!(buckets.iter().all(|b| !qualifies(b))),
        }
    }
}

// =============================================================================
// Summary
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn summarize_is_idempotent(samples in arb_samples(), now in 1i64..=MINUTES_PER_DAY) {
        let config = EngineConfig::default();
        let first = summarize(&samples, minute(now), &config).unwrap();
        let second = summarize(&samples, minute(now), &config).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn streak_never_exceeds_elapsed_work_minutes(
        samples in arb_samples(),
        now_secs in 1i64..MINUTES_PER_DAY * 60,
        resolution in prop::sample::select(vec![1u32, 2, 5, 10, 15, 30, 60]),
    ) {
        let config = EngineConfig {
            streak_resolution_minutes: resolution,
            ..EngineConfig::default()
        };
        let now = day_start() + Duration::seconds(now_secs);
        let summary = summarize(&samples, now, &config).unwrap();

        // default work window is [09:00, 17:00)
        let elapsed = (now_secs.min(17 * 3600) - 9 * 3600).max(0) / 60;
        prop_assert!(i64::from(summary.longest_sedentary_streak_minutes) <= elapsed);

        let observed: u32 = summary.hourly.iter().map(|h| h.observed_minutes).sum();
        prop_assert!(i64::from(observed) <= elapsed);

        let active = summary
            .timeline
            .iter()
            .filter(|e| e.classification == Classification::Active)
            .count();
        prop_assert_eq!(active, summary.active_bucket_count);
    }
}
