// RAPL-SWEEP LIBRARY
// SWEEP PLANNING, PROFILER INVOCATION, TRIAL COLLECTION AND AGGREGATION.
// THE BINARY (src/main.rs) ONLY WIRES CONFIGURATION AND OUTPUT AROUND THESE.

pub mod aggregate;
pub mod chart;
pub mod collector;
pub mod config;
pub mod error;
pub mod profiler;
pub mod report;
pub mod sweep;
pub mod table;

pub use error::{Error, Result};
