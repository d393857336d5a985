//! Pipeline orchestration
//!
//! This module provides the public API for Last Stand.
//! It runs the full path from activity.sample.v1 JSON to the report envelope.

use crate::config::EngineConfig;
use crate::encoder::ReportEncoder;
use crate::error::EngineError;
use crate::schema::{SampleAdapter, SampleRecord};
use crate::timeline::{build_summary, ActivityTimelineBuilder};
use crate::types::{ActivityReport, ActivitySummary, Sample};
use chrono::{DateTime, Utc};

/// Build the activity summary for the day containing `now`.
///
/// Pure function of its inputs: the same samples, `now` and config always
/// produce the same summary.
pub fn summarize(
    samples: &[Sample],
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Result<ActivitySummary, EngineError> {
    build_summary(samples, now, config)
}

/// Convert a JSON array of activity.sample.v1 records into a report.
///
/// # Arguments
/// * `samples_json` - JSON array of sample records
/// * `now_rfc3339` - Reference time, e.g. "2024-01-01T09:12:00Z"
/// * `config_json` - Optional engine config; defaults apply when `None`
///
/// # Example
/// ```ignore
/// let report = summarize_json(
///     samples_json,
///     "2024-01-01T09:12:00Z".to_string(),
///     None,
/// )?;
/// ```
pub fn summarize_json(
    samples_json: String,
    now_rfc3339: String,
    config_json: Option<String>,
) -> Result<String, EngineError> {
    let engine = match config_json {
        Some(json) => ActivityEngine::from_config_json(&json)?,
        None => ActivityEngine::new(EngineConfig::default())?,
    };
    engine.process_json(&samples_json, &now_rfc3339)
}

/// Parse an RFC 3339 reference time into UTC
pub fn parse_now(now_rfc3339: &str) -> Result<DateTime<Utc>, EngineError> {
    DateTime::parse_from_rfc3339(now_rfc3339.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EngineError::InvalidTimestamp(format!("{}: {}", now_rfc3339, e)))
}

/// Reusable engine holding a validated config and a report encoder.
///
/// Nothing is retained between calls; every `process` recomputes the day
/// from the samples it is given.
pub struct ActivityEngine {
    builder: ActivityTimelineBuilder,
    encoder: ReportEncoder,
}

impl ActivityEngine {
    /// Create an engine, rejecting an invalid config
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Ok(Self {
            builder: ActivityTimelineBuilder::new(config)?,
            encoder: ReportEncoder::new(),
        })
    }

    /// Create an engine from a JSON config
    pub fn from_config_json(json: &str) -> Result<Self, EngineError> {
        Self::new(EngineConfig::from_json(json)?)
    }

    /// Replace the encoder, e.g. to pin the instance ID
    pub fn with_encoder(mut self, encoder: ReportEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        self.builder.config()
    }

    /// Build the report for `records` as of `now`
    pub fn process(
        &self,
        records: &[SampleRecord],
        now: DateTime<Utc>,
    ) -> Result<ActivityReport, EngineError> {
        let samples = SampleAdapter::to_samples(records)?;
        let summary = self.builder.build(&samples, now)?;
        Ok(self.encoder.encode(summary, self.config()))
    }

    /// JSON in, pretty JSON out
    pub fn process_json(&self, samples_json: &str, now_rfc3339: &str) -> Result<String, EngineError> {
        let now = parse_now(now_rfc3339)?;
        let records = SampleAdapter::parse_array(samples_json)?;
        let report = self.process(&records, now)?;
        serde_json::to_string_pretty(&report).map_err(EngineError::JsonError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StandLabel;
    use crate::types::Classification;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    fn sample_records_json() -> &'static str {
        r#"[
            {"schema_version":"activity.sample.v1","kind":"step_count","start":"2024-01-01T09:00:00Z","end":"2024-01-01T09:01:00Z","value":5},
            {"schema_version":"activity.sample.v1","kind":"step_count","start":"2024-01-01T09:10:00Z","end":"2024-01-01T09:11:00Z","value":30},
            {"schema_version":"activity.sample.v1","kind":"stand_hour","start":"2024-01-01T08:00:00Z","end":"2024-01-01T09:00:00Z","value":"stood"}
        ]"#
    }

    #[test]
    fn test_summarize_json() {
        let json = summarize_json(
            sample_records_json().to_string(),
            "2024-01-01T09:12:00Z".to_string(),
            None,
        )
        .unwrap();

        let report: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(report["report_version"], "1.0.0");
        assert_eq!(report["producer"]["name"], "last-stand");
        assert_eq!(report["computed_at"], "2024-01-01T09:12:00Z");

        let summary = &report["summary"];
        assert_eq!(summary["last_activity_at"], "2024-01-01T09:10:00Z");
        assert_eq!(summary["total_bucket_count"], 111);
        assert_eq!(summary["timeline"][108]["classification"], "inactive");
        assert_eq!(summary["timeline"][110]["classification"], "active");
        assert_eq!(summary["last_stand_at"], "2024-01-01T09:00:00Z");
    }

    #[test]
    fn test_summarize_json_with_config() {
        let json = summarize_json(
            sample_records_json().to_string(),
            "2024-01-01T09:12:00Z".to_string(),
            Some(r#"{"active_threshold": 50}"#.to_string()),
        )
        .unwrap();

        let report: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(report["config"]["active_threshold"], 50);
        assert!(report["summary"]["last_activity_at"].is_null());
    }

    #[test]
    fn test_invalid_now() {
        let result = summarize_json("[]".to_string(), "yesterday".to_string(), None);
        assert!(matches!(result, Err(EngineError::InvalidTimestamp(_))));
    }

    #[test]
    fn test_invalid_json() {
        let result = summarize_json(
            "not json".to_string(),
            "2024-01-01T09:00:00Z".to_string(),
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_config() {
        let result = summarize_json(
            "[]".to_string(),
            "2024-01-01T09:00:00Z".to_string(),
            Some(r#"{"bucket_width_minutes": 0}"#.to_string()),
        );
        assert!(matches!(result, Err(EngineError::InvalidWindow(_))));
    }

    #[test]
    fn test_parse_now_normalizes_offset() {
        let now = parse_now("2024-01-01T10:12:00+01:00").unwrap();
        assert_eq!(now, at(9, 12));
    }

    #[test]
    fn test_engine_process_records() {
        let engine = ActivityEngine::new(EngineConfig::default())
            .unwrap()
            .with_encoder(ReportEncoder::with_instance_id("engine-test".to_string()));

        let records = vec![
            SampleRecord::step_count(at(9, 10), at(9, 11), 30),
            SampleRecord::stand_hour(at(8, 0), at(9, 0), StandLabel::Idle),
        ];
        let report = engine.process(&records, at(9, 12)).unwrap();

        assert_eq!(report.producer.instance_id, "engine-test");
        assert_eq!(report.summary.last_activity_at, Some(at(9, 10)));
        assert_eq!(report.summary.stand_hours[8].status, Classification::Inactive);
        assert_eq!(report.summary.last_stand_at, None);
    }

    #[test]
    fn test_engine_is_stateless() {
        let engine = ActivityEngine::new(EngineConfig::default()).unwrap();
        let records = vec![SampleRecord::step_count(at(9, 10), at(9, 11), 30)];

        let first = engine.process(&records, at(9, 12)).unwrap();
        let empty = engine.process(&[], at(9, 12)).unwrap();
        let again = engine.process(&records, at(9, 12)).unwrap();

        assert_eq!(empty.summary.last_activity_at, None);
        assert_eq!(first, again);
    }

    #[test]
    fn test_engine_rejects_invalid_record() {
        let engine = ActivityEngine::new(EngineConfig::default()).unwrap();
        let records = vec![SampleRecord::step_count(
            at(9, 10),
            at(9, 10) - Duration::minutes(1),
            30,
        )];
        assert!(matches!(
            engine.process(&records, at(9, 12)),
            Err(EngineError::InvalidSample(_))
        ));
    }

    #[test]
    fn test_summarize_matches_builder() {
        let config = EngineConfig::default();
        let samples = vec![Sample::steps(at(9, 0), at(9, 1), 25)];
        let summary = summarize(&samples, at(9, 10), &config).unwrap();
        assert_eq!(summary, build_summary(&samples, at(9, 10), &config).unwrap());
        assert_eq!(summary.last_activity_at, Some(at(9, 0)));
    }
}
