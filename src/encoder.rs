//! Report encoding
//!
//! Wraps an activity summary into the report envelope consumed by the
//! presentation layer: producer metadata, the config used and quality metrics.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::types::{
    ActivityReport, ActivitySummary, Classification, QualityFlag, ReportProducer, ReportQuality,
};
use crate::{ENGINE_VERSION, PRODUCER_NAME};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Coverage below which the report is flagged
const LOW_COVERAGE_THRESHOLD: f64 = 0.25;

/// Report encoder
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Wrap a summary into a report; `computed_at` is the summary's own `now`
    pub fn encode(&self, summary: ActivitySummary, config: &EngineConfig) -> ActivityReport {
        let producer = ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: ENGINE_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        ActivityReport {
            report_version: REPORT_VERSION.to_string(),
            producer,
            computed_at: summary.now,
            config: config.clone(),
            quality: build_quality(&summary),
            summary,
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(
        &self,
        summary: ActivitySummary,
        config: &EngineConfig,
    ) -> Result<String, EngineError> {
        let report = self.encode(summary, config);
        serde_json::to_string_pretty(&report).map_err(EngineError::JsonError)
    }
}

fn build_quality(summary: &ActivitySummary) -> ReportQuality {
    let stats = summary.sample_stats;
    let with_data = summary.timeline.iter().filter(|e| e.bucket.has_data).count();
    let coverage = if summary.total_bucket_count == 0 {
        0.0
    } else {
        with_data as f64 / summary.total_bucket_count as f64
    };

    let mut flags = Vec::new();
    if with_data == 0 {
        flags.push(QualityFlag::NoStepData);
    }
    if summary
        .stand_hours
        .iter()
        .all(|h| h.status == Classification::Unknown)
    {
        flags.push(QualityFlag::NoStandData);
    }
    if stats.future_discarded > 0 {
        flags.push(QualityFlag::FutureSamplesDiscarded);
    }
    if stats.outside_window > 0 {
        flags.push(QualityFlag::SamplesOutsideWindow);
    }
    if coverage < LOW_COVERAGE_THRESHOLD {
        flags.push(QualityFlag::LowCoverage);
    }

    ReportQuality {
        coverage,
        total_samples: stats.total,
        used_samples: stats.attributed,
        discarded_future_samples: stats.future_discarded,
        flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::build_summary;
    use crate::types::Sample;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    fn sample_summary() -> ActivitySummary {
        let samples = vec![
            Sample::steps(at(0, 0), at(0, 4), 40),
            Sample::steps(at(0, 5), at(0, 9), 0),
            Sample::steps(at(0, 14), at(0, 20), 90),
            Sample::stand_hour(at(0, 0), at(0, 15), true),
        ];
        build_summary(&samples, at(0, 15), &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_encode_report() {
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let summary = sample_summary();
        let report = encoder.encode(summary.clone(), &EngineConfig::default());

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.version, ENGINE_VERSION);
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_eq!(report.computed_at, at(0, 15));
        assert_eq!(report.summary, summary);

        // 00:00 and 00:05 have data, 00:10 does not
        assert!((report.quality.coverage - 2.0 / 3.0).abs() < 1e-9);
        // three step samples and one stand sample
        assert_eq!(report.quality.total_samples, 4);
        assert_eq!(report.quality.used_samples, 3);
        assert_eq!(report.quality.discarded_future_samples, 1);
        assert_eq!(report.quality.flags, vec![QualityFlag::FutureSamplesDiscarded]);
    }

    #[test]
    fn test_empty_summary_flags() {
        let summary = build_summary(&[], at(9, 0), &EngineConfig::default()).unwrap();
        let report = ReportEncoder::new().encode(summary, &EngineConfig::default());

        assert_eq!(report.quality.coverage, 0.0);
        assert_eq!(
            report.quality.flags,
            vec![
                QualityFlag::NoStepData,
                QualityFlag::NoStandData,
                QualityFlag::LowCoverage
            ]
        );
    }

    #[test]
    fn test_stand_only_counts_samples_but_flags_no_steps() {
        let samples = vec![Sample::stand_hour(at(8, 0), at(9, 0), true)];
        let summary = build_summary(&samples, at(9, 30), &EngineConfig::default()).unwrap();
        let report = ReportEncoder::new().encode(summary, &EngineConfig::default());

        assert_eq!(report.quality.total_samples, 1);
        assert_eq!(report.quality.used_samples, 1);
        assert_eq!(
            report.quality.flags,
            vec![QualityFlag::NoStepData, QualityFlag::LowCoverage]
        );
    }

    #[test]
    fn test_encode_to_json() {
        let encoder = ReportEncoder::new();
        let json = encoder
            .encode_to_json(sample_summary(), &EngineConfig::default())
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["report_version"], REPORT_VERSION);
        assert!(parsed.get("producer").is_some());
        assert!(parsed.get("quality").is_some());
        assert_eq!(parsed["summary"]["timeline"].as_array().unwrap().len(), 3);
        assert_eq!(parsed["config"]["active_threshold"], 20);
    }

    #[test]
    fn test_instance_ids_are_unique() {
        assert_ne!(ReportEncoder::new().instance_id(), ReportEncoder::new().instance_id());
    }
}
