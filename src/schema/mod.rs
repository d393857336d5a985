//! activity.sample.v1 input schema
//!
//! This module defines the wire format for samples delivered by the
//! health-data source and converts them into engine samples.

mod adapter;
mod record;

pub use adapter::*;
pub use record::*;
