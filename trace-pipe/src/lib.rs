//! Fetch-by-fetch tracing for pull-pipes.
//!
//! This crate records every notification a pipeline sends to its sink,
//! so the nested pull sequence behind a single terminal call can be
//! inspected or printed after the fact.

pub mod debug_trace;
pub mod executor;

pub use debug_trace::{FetchEvent, FetchTrace, RecordingSink};
pub use executor::execute_traced;
