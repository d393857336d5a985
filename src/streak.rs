//! Sedentary streak analysis
//!
//! Scans classifications in time order and tracks the longest unbroken run of
//! sedentary slots inside the work window. Unknown counts as sedentary: no
//! steps reported is treated the same as zero steps. Slots outside the work
//! window are skipped without touching the running streak.

use crate::config::{hour_of_day, start_of_day, WorkWindow};
use crate::types::{Classification, SedentaryStreak};
use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};

#[derive(Debug, Clone, Copy)]
pub struct SedentaryStreakAnalyzer {
    work_window: WorkWindow,
    resolution_minutes: u32,
    offset: FixedOffset,
    until: Option<DateTime<Utc>>,
}

impl SedentaryStreakAnalyzer {
    /// `resolution_minutes` is the width each classification stands for
    pub fn new(work_window: WorkWindow, resolution_minutes: u32, offset: FixedOffset) -> Self {
        Self {
            work_window,
            resolution_minutes,
            offset,
            until: None,
        }
    }

    /// Stop counting at `until`; the slot containing it only contributes its elapsed part
    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    /// Whole minutes of the slot starting at `ts` that are inside the work
    /// window and not past `until`
    pub fn slot_minutes(&self, ts: DateTime<Utc>) -> u32 {
        if !self.work_window.contains_hour(hour_of_day(ts, self.offset)) {
            return 0;
        }
        self.slot_end(ts)
            .map_or(0, |end| u32::try_from((end - ts).num_minutes()).unwrap_or(0))
    }

    /// End of the counted part of the slot at `ts`, None when nothing of it counts
    fn slot_end(&self, ts: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let window_end =
            start_of_day(ts, self.offset) + Duration::hours(i64::from(self.work_window.end_hour));
        let mut end = (ts + Duration::minutes(i64::from(self.resolution_minutes))).min(window_end);
        if let Some(until) = self.until {
            end = end.min(until);
        }
        (end > ts).then_some(end)
    }

    /// Longest sedentary run, with its bounds
    pub fn analyze(
        &self,
        classifications: &[(DateTime<Utc>, Classification)],
    ) -> Option<SedentaryStreak> {
        let mut current: Option<SedentaryStreak> = None;
        let mut longest: Option<SedentaryStreak> = None;

        for &(ts, classification) in classifications {
            if !self.work_window.contains_hour(hour_of_day(ts, self.offset)) {
                continue;
            }

            if classification.is_sedentary() {
                let Some(slot_end) = self.slot_end(ts) else {
                    continue;
                };
                let run = current.get_or_insert(SedentaryStreak {
                    start: ts,
                    end: ts,
                    minutes: 0,
                });
                run.end = slot_end;
                run.minutes = run.minutes.saturating_add(self.slot_minutes(ts));

                if longest.map_or(true, |best| run.minutes > best.minutes) {
                    longest = Some(*run);
                }
            } else if let Some(run) = current.take() {
                tracing::trace!(minutes = run.minutes, at = %ts, "sedentary streak broken");
            }
        }

        longest.filter(|streak| streak.minutes > 0)
    }

    /// Length in minutes of the longest sedentary run, 0 when there is none
    pub fn longest_streak_minutes(&self, classifications: &[(DateTime<Utc>, Classification)]) -> u32 {
        self.analyze(classifications).map_or(0, |streak| streak.minutes)
    }
}

/// Longest sedentary streak over minute-resolution classifications, hours in UTC
pub fn longest_sedentary_streak(
    classifications: &[(DateTime<Utc>, Classification)],
    work_window: WorkWindow,
) -> u32 {
    SedentaryStreakAnalyzer::new(work_window, 1, Utc.fix()).longest_streak_minutes(classifications)
}
