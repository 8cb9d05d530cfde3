//! Traced pipeline execution.
//!
//! Runs a pipeline exactly as `pull_pipes::execute` does, with a
//! [`RecordingSink`] attached, and hands back the recorded trace alongside
//! the outcome.

use std::rc::Rc;

use pull_pipes::{Outcome, PipelineError, execute};

use crate::debug_trace::{FetchTrace, RecordingSink};

/// Execute a pipeline while recording every fetch.
///
/// Returns the terminal's outcome and the trace of the whole run,
/// including node registration.
pub fn execute_traced(pipeline_text: &str) -> Result<(Outcome, FetchTrace), PipelineError> {
    let sink = Rc::new(RecordingSink::new());
    let outcome = execute(pipeline_text, sink.clone())?;
    let trace = sink.take_trace();
    tracing::debug!(events = trace.events.len(), "trace recorded");
    Ok((outcome, trace))
}
