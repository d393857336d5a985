//! activity.sample.v1 schema definition
//!
//! Wire form of the samples handed over by the health-data source. Step
//! samples carry a numeric step count; stand-hour samples carry either a
//! label ("stood"/"idle") or the numeric category (1/0).

use crate::types::{Count, Sample, SampleKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version
pub const SCHEMA_VERSION: &str = "activity.sample.v1";

/// Data source information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Source name (e.g., "iPhone", "Apple Watch")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Unique device identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// Stand-hour label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandLabel {
    Stood,
    Idle,
}

/// Sample value as it appears on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    Number(f64),
    Label(StandLabel),
}

impl From<u64> for RecordValue {
    fn from(v: u64) -> Self {
        // Step counts fit comfortably in f64's integer range
        RecordValue::Number(v as f64)
    }
}

impl From<StandLabel> for RecordValue {
    fn from(v: StandLabel) -> Self {
        RecordValue::Label(v)
    }
}

/// The activity.sample.v1 record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Schema version identifier
    pub schema_version: String,
    /// Unique sample identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_id: Option<String>,
    /// Kind of sample
    pub kind: SampleKind,
    /// Sample start (UTC)
    pub start: DateTime<Utc>,
    /// Sample end (UTC)
    pub end: DateTime<Utc>,
    /// Step count or stand label
    pub value: RecordValue,
    /// Where the sample came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
}

impl SampleRecord {
    /// Create a new step-count record
    pub fn step_count(start: DateTime<Utc>, end: DateTime<Utc>, steps: u64) -> Self {
        Self::new(SampleKind::StepCount, start, end, RecordValue::from(steps))
    }

    /// Create a new stand-hour record
    pub fn stand_hour(start: DateTime<Utc>, end: DateTime<Utc>, label: StandLabel) -> Self {
        Self::new(SampleKind::StandHour, start, end, RecordValue::from(label))
    }

    fn new(kind: SampleKind, start: DateTime<Utc>, end: DateTime<Utc>, value: RecordValue) -> Self {
        SampleRecord {
            schema_version: SCHEMA_VERSION.to_string(),
            sample_id: Some(uuid::Uuid::new_v4().to_string()),
            kind,
            start,
            end,
            value,
            source: None,
        }
    }

    /// Attach source information
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// Validate the record schema
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        if self.end < self.start {
            return Err(ValidationError::EndBeforeStart {
                start: self.start.to_rfc3339(),
                end: self.end.to_rfc3339(),
            });
        }

        self.count().map(|_| ())
    }

    /// Convert to an engine sample
    pub fn to_sample(&self) -> Result<Sample, ValidationError> {
        self.validate()?;
        Ok(Sample::new(self.kind, self.start, self.end, self.count()?))
    }

    fn count(&self) -> Result<Count, ValidationError> {
        match (self.kind, &self.value) {
            (SampleKind::StepCount, RecordValue::Number(n)) => number_to_count(*n),
            (SampleKind::StepCount, RecordValue::Label(_)) => Err(ValidationError::ValueKindMismatch {
                kind: self.kind.as_str().to_string(),
            }),
            (SampleKind::StandHour, RecordValue::Label(StandLabel::Stood)) => Ok(1),
            (SampleKind::StandHour, RecordValue::Label(StandLabel::Idle)) => Ok(0),
            (SampleKind::StandHour, RecordValue::Number(n)) => match number_to_count(*n)? {
                value @ (0 | 1) => Ok(value),
                other => Err(ValidationError::InvalidStandValue(other.to_string())),
            },
        }
    }
}

/// Fractional step counts (split samples) round to the nearest step
fn number_to_count(n: f64) -> Result<Count, ValidationError> {
    if !n.is_finite() {
        return Err(ValidationError::NonFiniteValue);
    }
    if n < 0.0 {
        return Err(ValidationError::NegativeValue(n));
    }
    Ok(n.round() as Count)
}

/// Validation errors for sample records
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Sample ends ({end}) before it starts ({start})")]
    EndBeforeStart { start: String, end: String },

    #[error("Sample value is negative: {0}")]
    NegativeValue(f64),

    #[error("Sample value is not a finite number")]
    NonFiniteValue,

    #[error("Stand-hour value must be 0, 1, \"stood\" or \"idle\", got {0}")]
    InvalidStandValue(String),

    #[error("Label values are not allowed for {kind} samples")]
    ValueKindMismatch { kind: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_serialize_step_record() {
        let record = SampleRecord::step_count(at(9, 0), at(9, 1), 42).with_source(Source {
            name: Some("iPhone".to_string()),
            device_id: None,
        });
        let json = serde_json::to_string(&record).unwrap();

        assert!(json.contains(SCHEMA_VERSION));
        assert!(json.contains("step_count"));
        assert!(json.contains("iPhone"));
        assert!(record.sample_id.is_some());
    }

    #[test]
    fn test_deserialize_stand_label() {
        let json = r#"{
            "schema_version": "activity.sample.v1",
            "kind": "stand_hour",
            "start": "2024-01-01T09:00:00Z",
            "end": "2024-01-01T10:00:00Z",
            "value": "stood"
        }"#;
        let record: SampleRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.value, RecordValue::Label(StandLabel::Stood));

        let sample = record.to_sample().unwrap();
        assert!(sample.is_stood());
    }

    #[test]
    fn test_numeric_stand_value() {
        let mut record = SampleRecord::stand_hour(at(9, 0), at(10, 0), StandLabel::Idle);
        record.value = RecordValue::Number(1.0);
        assert_eq!(record.to_sample().unwrap().value, 1);

        record.value = RecordValue::Number(2.0);
        assert!(matches!(
            record.validate(),
            Err(ValidationError::InvalidStandValue(_))
        ));
    }

    #[test]
    fn test_fractional_steps_round() {
        let mut record = SampleRecord::step_count(at(9, 0), at(9, 1), 0);
        record.value = RecordValue::Number(12.6);
        assert_eq!(record.to_sample().unwrap().value, 13);
    }

    #[test]
    fn test_validation_failures() {
        let mut record = SampleRecord::step_count(at(9, 0), at(9, 1), 10);
        record.schema_version = "wear.raw_event.v1".to_string();
        assert!(matches!(
            record.validate(),
            Err(ValidationError::InvalidSchemaVersion { .. })
        ));

        let record = SampleRecord::step_count(at(9, 1), at(9, 0), 10);
        assert!(matches!(
            record.validate(),
            Err(ValidationError::EndBeforeStart { .. })
        ));

        let mut record = SampleRecord::step_count(at(9, 0), at(9, 1), 10);
        record.value = RecordValue::Number(-3.0);
        assert_eq!(record.validate(), Err(ValidationError::NegativeValue(-3.0)));

        record.value = RecordValue::Label(StandLabel::Stood);
        assert!(matches!(
            record.validate(),
            Err(ValidationError::ValueKindMismatch { .. })
        ));
    }

    #[test]
    fn test_instant_sample_is_valid() {
        let record = SampleRecord::step_count(at(9, 0), at(9, 0), 3);
        assert!(record.validate().is_ok());
        assert_eq!(record.to_sample().unwrap().end - record.start, Duration::zero());
    }
}
