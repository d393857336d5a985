//! Adapter for converting activity.sample.v1 records into engine samples

use crate::error::EngineError;
use crate::schema::record::{SampleRecord, ValidationError};
use crate::types::Sample;

/// Adapter for converting sample records to engine samples
pub struct SampleAdapter;

impl SampleAdapter {
    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<SampleRecord>, EngineError> {
        let records: Vec<SampleRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<SampleRecord>, EngineError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<SampleRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(EngineError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Convert validated records to samples ordered by start time
    pub fn to_samples(records: &[SampleRecord]) -> Result<Vec<Sample>, EngineError> {
        let mut samples = records
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                record.to_sample().map_err(|e| {
                    EngineError::InvalidSample(format!("record {}: {}", idx, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        samples.sort_by_key(|s| (s.start, s.end));
        Ok(samples)
    }

    /// Validate a batch of records, returning only the failures
    pub fn validate_records(records: &[SampleRecord]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .filter_map(|(idx, record)| {
                record.validate().err().map(|error| ValidationResult {
                    index: idx,
                    sample_id: record.sample_id.clone(),
                    error,
                })
            })
            .collect()
    }
}

/// A record that failed validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub index: usize,
    pub sample_id: Option<String>,
    pub error: ValidationError,
}
