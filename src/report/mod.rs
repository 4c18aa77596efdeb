//! Usage reports.
//!
//! A [`Report`] partitions one state snapshot into what was read (`used`) and
//! what never was (`unused`), with size and count metrics a visualization can
//! render:
//! - `percent_used`: serialized size of `used` relative to the whole state
//! - `number_of_props`: leaf count of the state
//! - `store_size`: UTF-8 byte length of the serialized state
//!
//! Reports are generated under the report guard, so nothing the generator
//! reads is recorded as usage.

mod generator;
mod metrics;
mod types;

pub use generator::ReportGenerator;
pub use metrics::{deep_count, lookup, unused_diff};
pub use types::{PointerExtractor, Report, SubtreeStats, SummaryExtractor};
