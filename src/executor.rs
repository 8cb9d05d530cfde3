//! Builds engine pipelines from parsed commands and drives them.
//!
//! Validation happens before any node is created, so a rejected pipeline
//! never registers anything with the sink.

use std::fmt;
use std::rc::Rc;

use crate::dsl::{Command, parse_commands};
use crate::error::{PipelineError, Result};
use crate::pipeline::Pipeline;
use crate::sink::EventSink;

/// Result of driving a pipeline's terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// FOREACH and TOARRAY
    Values(Vec<i64>),
    /// COUNT
    Count(u64),
    /// FINDFIRST
    First(Option<i64>),
    /// REDUCE
    Reduced(i64),
}

impl Outcome {
    /// Number of output lines this outcome renders to.
    pub fn len(&self) -> usize {
        match self {
            Outcome::Values(values) => values.len(),
            Outcome::First(None) => 0,
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Values(values) => {
                let lines: Vec<String> = values.iter().map(i64::to_string).collect();
                write!(f, "{}", lines.join("\n"))
            }
            Outcome::Count(n) => write!(f, "{n}"),
            Outcome::First(Some(v)) | Outcome::Reduced(v) => write!(f, "{v}"),
            Outcome::First(None) => Ok(()),
        }
    }
}

/// A validated pipeline: one source, the stages after it, one terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan<'a> {
    pub source: &'a Command,
    pub stages: &'a [Command],
    pub terminal: Command,
}

/// Check stage positions and reject unbounded drains.
pub fn plan(commands: &[Command]) -> Result<Plan<'_>> {
    let (source, rest) = commands.split_first().ok_or(PipelineError::Empty)?;
    if !source.is_source() {
        return Err(PipelineError::NotASource {
            stage: source.name().to_string(),
        });
    }

    let (stages, terminal) = match rest.split_last() {
        Some((last, stages)) if last.is_terminal() => (stages, last.clone()),
        _ => (rest, Command::ForEach),
    };

    let mut bounded = !source.is_infinite();
    for stage in stages {
        if stage.is_source() {
            return Err(PipelineError::MisplacedSource {
                stage: stage.name().to_string(),
            });
        }
        if stage.is_terminal() {
            return Err(PipelineError::MisplacedTerminal {
                stage: stage.name().to_string(),
            });
        }
        match stage {
            Command::Limit { .. } => bounded = true,
            Command::Sorted { .. } if !bounded => {
                return Err(PipelineError::Unbounded {
                    source_stage: source.name().to_string(),
                    stage: stage.name().to_string(),
                });
            }
            _ => {}
        }
    }

    if !bounded && terminal != Command::FindFirst {
        return Err(PipelineError::Unbounded {
            source_stage: source.name().to_string(),
            stage: terminal.name().to_string(),
        });
    }

    Ok(Plan {
        source,
        stages,
        terminal,
    })
}

/// Create the source node for a source command.
fn build_source(cmd: &Command, sink: Rc<dyn EventSink>) -> Result<Pipeline<i64>> {
    let pipe = match cmd {
        Command::Empty => Pipeline::empty(sink),
        Command::Of { values } => Pipeline::of(sink, values.clone()),
        Command::Iterate { seed, step } => {
            let step = *step;
            Pipeline::iterate(sink, *seed, move |x| x.wrapping_add(step))
        }
        Command::Generate { value } => {
            let value = *value;
            Pipeline::generate(sink, move || value)
        }
        Command::Counter { start } => {
            let mut next = *start;
            Pipeline::generate(sink, move || {
                let value = next;
                next = next.wrapping_add(1);
                value
            })
        }
        other => {
            return Err(PipelineError::NotASource {
                stage: other.name().to_string(),
            });
        }
    };
    Ok(pipe)
}

/// Link one transform onto `pipe`.
fn apply_stage(pipe: &Pipeline<i64>, cmd: &Command) -> Result<Pipeline<i64>> {
    let next = match cmd {
        Command::Map { op } => {
            let op = *op;
            pipe.map(move |x| op.apply(x))
        }
        Command::Filter { predicate } => {
            let predicate = *predicate;
            pipe.filter(move |x| predicate.test(*x))
        }
        Command::Limit { n } => pipe.limit(*n),
        Command::Sorted { descending: false } => pipe.sorted(),
        Command::Sorted { descending: true } => pipe.sorted_by(|a, b| b.cmp(a)),
        Command::Distinct => pipe.distinct(),
        other if other.is_terminal() => {
            return Err(PipelineError::MisplacedTerminal {
                stage: other.name().to_string(),
            });
        }
        other => {
            return Err(PipelineError::MisplacedSource {
                stage: other.name().to_string(),
            });
        }
    };
    Ok(next)
}

/// Build the node chain for a plan, without pulling anything.
pub fn build(plan: &Plan<'_>, sink: Rc<dyn EventSink>) -> Result<Pipeline<i64>> {
    let mut pipe = build_source(plan.source, sink)?;
    for stage in plan.stages {
        pipe = apply_stage(&pipe, stage)?;
    }
    Ok(pipe)
}

/// Drive `pipe` with a terminal command.
pub fn drive(pipe: &Pipeline<i64>, terminal: &Command) -> Result<Outcome> {
    let outcome = match terminal {
        Command::ForEach => {
            let mut values = Vec::new();
            pipe.for_each(|v| values.push(v));
            Outcome::Values(values)
        }
        Command::Count => Outcome::Count(pipe.count()),
        Command::FindFirst => Outcome::First(pipe.find_first()),
        Command::ToArray => Outcome::Values(pipe.to_array().into_vec()),
        Command::Reduce { combiner, seed } => {
            let combiner = *combiner;
            Outcome::Reduced(pipe.reduce(*seed, move |acc, x| combiner.combine(acc, x)))
        }
        other => {
            return Err(PipelineError::MisplacedTerminal {
                stage: other.name().to_string(),
            });
        }
    };
    Ok(outcome)
}

/// Parse, validate, build and drive a pipeline, reporting to `sink`.
pub fn execute(pipeline_text: &str, sink: Rc<dyn EventSink>) -> Result<Outcome> {
    let commands = parse_commands(pipeline_text)?;
    let plan = plan(&commands)?;
    tracing::debug!(
        source = plan.source.name(),
        stages = plan.stages.len(),
        terminal = plan.terminal.name(),
        "building pipeline"
    );

    let pipe = build(&plan, sink)?;
    let outcome = drive(&pipe, &plan.terminal)?;
    tracing::debug!(lines = outcome.len(), "pipeline finished");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;

    fn run(text: &str) -> Result<Outcome> {
        execute(text, Rc::new(NullSink))
    }

    #[test]
    fn test_execute_scenario() {
        let pipeline = "PIPE ITERATE 9 -1
| MAP SQUARE
| FILTER ODD
| LIMIT 2
| SORTED
| TOARRAY
?";
        assert_eq!(run(pipeline).unwrap(), Outcome::Values(vec![49, 81]));
    }

    #[test]
    fn test_default_terminal_is_foreach() {
        let outcome = run("PIPE OF 3 1 2\n| MAP MUL 10").unwrap();
        assert_eq!(outcome, Outcome::Values(vec![30, 10, 20]));
        assert_eq!(outcome.to_string(), "30\n10\n20");
    }

    #[test]
    fn test_source_only_pipeline() {
        assert_eq!(run("PIPE OF 4 5").unwrap(), Outcome::Values(vec![4, 5]));
        assert_eq!(run("PIPE EMPTY").unwrap(), Outcome::Values(vec![]));
    }

    #[test]
    fn test_count_and_reduce() {
        assert_eq!(
            run("PIPE OF 1 2 3 4 5 6\n| FILTER EVEN\n| COUNT").unwrap(),
            Outcome::Count(3)
        );
        assert_eq!(
            run("PIPE COUNTER 1\n| LIMIT 5\n| REDUCE MUL 1").unwrap(),
            Outcome::Reduced(120)
        );
        assert_eq!(
            run("PIPE EMPTY\n| REDUCE MAX -7").unwrap(),
            Outcome::Reduced(-7)
        );
    }

    #[test]
    fn test_find_first_on_infinite_source() {
        let outcome = run("PIPE COUNTER 10\n| FILTER GT 12\n| FINDFIRST").unwrap();
        assert_eq!(outcome, Outcome::First(Some(13)));
        assert_eq!(outcome.to_string(), "13");
    }

    #[test]
    fn test_find_first_on_empty() {
        let outcome = run("PIPE EMPTY\n| FINDFIRST").unwrap();
        assert_eq!(outcome, Outcome::First(None));
        assert!(outcome.is_empty());
        assert_eq!(outcome.to_string(), "");
    }

    #[test]
    fn test_sorted_descending_and_distinct() {
        let outcome = run("PIPE OF 3 1 3 2 2\n| DISTINCT\n| SORTED DESC").unwrap();
        assert_eq!(outcome, Outcome::Values(vec![3, 2, 1]));
    }

    #[test]
    fn test_generate_constant() {
        let outcome = run("PIPE GENERATE 7\n| LIMIT 3\n| COUNT").unwrap();
        assert_eq!(outcome, Outcome::Count(3));
    }

    #[test]
    fn test_empty_pipeline_rejected() {
        assert_eq!(run("# nothing\n").unwrap_err(), PipelineError::Empty);
    }

    #[test]
    fn test_filter_cannot_be_first() {
        let err = run("PIPE FILTER ODD\n| COUNT").unwrap_err();
        assert!(err.to_string().contains("FILTER cannot be the first stage"));
    }

    #[test]
    fn test_source_in_middle_rejected() {
        let err = run("PIPE OF 1\n| OF 2\n| COUNT").unwrap_err();
        assert_eq!(
            err,
            PipelineError::MisplacedSource {
                stage: "OF".to_string()
            }
        );
    }

    #[test]
    fn test_terminal_in_middle_rejected() {
        let err = run("PIPE OF 1\n| COUNT\n| LIMIT 1").unwrap_err();
        assert_eq!(
            err,
            PipelineError::MisplacedTerminal {
                stage: "COUNT".to_string()
            }
        );
    }

    #[test]
    fn test_unbounded_sort_rejected() {
        let err = run("PIPE ITERATE 0 1\n| SORTED\n| LIMIT 3").unwrap_err();
        assert_eq!(
            err,
            PipelineError::Unbounded {
                source_stage: "ITERATE".to_string(),
                stage: "SORTED".to_string()
            }
        );
    }

    #[test]
    fn test_unbounded_drain_rejected() {
        let err = run("PIPE GENERATE 1\n| MAP ADD 1").unwrap_err();
        assert_eq!(
            err,
            PipelineError::Unbounded {
                source_stage: "GENERATE".to_string(),
                stage: "FOREACH".to_string()
            }
        );
    }

    #[test]
    fn test_plan_splits_source_stages_terminal() {
        let commands = parse_commands("PIPE OF 1\n| LIMIT 1\n| DISTINCT\n| COUNT").unwrap();
        let plan = plan(&commands).unwrap();
        assert_eq!(plan.source.name(), "OF");
        assert_eq!(plan.stages.len(), 2);
        assert_eq!(plan.terminal, Command::Count);
    }

    #[test]
    fn test_drive_rejects_non_terminal() {
        let pipe = Pipeline::of(Rc::new(NullSink), [1i64]);
        assert!(drive(&pipe, &Command::Distinct).is_err());
    }
}
