//! Last Stand - On-device activity timeline engine
//!
//! Last Stand turns raw step-count and stand-hour samples into a per-day
//! activity model through a deterministic pipeline: bucketing → classification
//! → last-activity resolution → sedentary streak analysis → report encoding.
//!
//! Every computation takes an explicit `now`; the engine never reads the wall
//! clock, so the same inputs always yield the same summary.

pub mod bucketer;
pub mod classifier;
pub mod config;
pub mod encoder;
pub mod error;
pub mod last_activity;
pub mod pipeline;
pub mod schema;
pub mod streak;
pub mod timeline;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use bucketer::{bucket, IntervalBucketer};
pub use classifier::{classify, ActivityClassifier};
pub use config::{EngineConfig, WorkWindow};
pub use error::EngineError;
pub use last_activity::{resolve_last_activity, LastActivityResolver};
pub use pipeline::{summarize, summarize_json, ActivityEngine};
pub use streak::{longest_sedentary_streak, SedentaryStreakAnalyzer};
pub use timeline::{build_summary, ActivityTimelineBuilder};

// Schema exports
pub use schema::{SampleAdapter, SampleRecord, SCHEMA_VERSION};

/// Engine version embedded in all reports
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "last-stand";
