//! Errors reported while parsing and building pipelines from DSL text.
//!
//! The evaluation engine itself never fails: exhaustion is `None`, and a
//! panicking callback unwinds straight to the driving caller.

use thiserror::Error;

/// Errors produced by the pipeline DSL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Pipeline is empty")]
    Empty,

    #[error("Line {line}: Unknown command: {name}")]
    UnknownStage { line: usize, name: String },

    #[error("Line {line}: {message}")]
    InvalidArgument { line: usize, message: String },

    #[error("{stage} cannot be the first stage (try EMPTY, OF, ITERATE, GENERATE, or COUNTER)")]
    NotASource { stage: String },

    #[error("{stage} is a source and must be the first stage")]
    MisplacedSource { stage: String },

    #[error("{stage} is a terminal and must be the last stage")]
    MisplacedTerminal { stage: String },

    #[error("{source_stage} never exhausts; add a LIMIT before {stage}")]
    Unbounded { source_stage: String, stage: String },
}

impl PipelineError {
    pub fn invalid(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_stage() {
        let err = PipelineError::NotASource {
            stage: "FILTER".to_string(),
        };
        assert!(err.to_string().starts_with("FILTER cannot be the first stage"));

        let err = PipelineError::Unbounded {
            source_stage: "ITERATE".to_string(),
            stage: "SORTED".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ITERATE never exhausts; add a LIMIT before SORTED"
        );
    }

    #[test]
    fn test_invalid_carries_line() {
        let err = PipelineError::invalid(3, "LIMIT requires a number");
        assert_eq!(err.to_string(), "Line 3: LIMIT requires a number");
    }
}
