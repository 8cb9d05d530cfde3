//! DSL parser for integer pipelines.
//!
//! Pipeline format (CMS Pipelines style):
//! ```text
//! PIPE ITERATE 9 -1
//! | MAP SQUARE
//! | FILTER ODD
//! | LIMIT 2
//! | SORTED
//! | TOARRAY
//! ?
//! ```
//!
//! - `PIPE <source>` starts the pipeline
//! - `| <stage>` continues to the next stage
//! - `?` on its own line marks the end of the pipeline
//! - Lines starting with `#` are comments
//!
//! Stage position rules:
//! - The first stage must be a source and sources may only come first
//! - A terminal may only be last; without one the pipeline ends in FOREACH
//!
//! Sources:
//! - `EMPTY` - Produce nothing
//! - `OF n1 n2 ...` - Produce the listed numbers
//! - `ITERATE seed step` - Produce seed, seed+step, seed+2*step, ... forever
//! - `GENERATE n` - Produce n forever
//! - `COUNTER start` - Produce start, start+1, ... forever
//!
//! Transforms:
//! - `MAP SQUARE|NEGATE|ABS|ADD n|MUL n|MOD n`
//! - `FILTER ODD|EVEN|POSITIVE|NEGATIVE|GT n|LT n|EQ n|NE n`
//! - `LIMIT n` - Pass at most n values
//! - `SORTED [ASC|DESC]` - Sort the whole upstream
//! - `DISTINCT` - Skip values already seen (one retry per pull)
//!
//! Terminals:
//! - `FOREACH` - Emit every value
//! - `COUNT` - Emit the number of values
//! - `FINDFIRST` - Emit the first value, if any
//! - `TOARRAY` - Emit every value, collected in one pull
//! - `REDUCE ADD|MUL|MIN|MAX seed` - Fold every value into seed

use crate::error::{PipelineError, Result};

/// Integer mapping applied by `MAP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapOp {
    Square,
    Negate,
    Abs,
    Add(i64),
    Mul(i64),
    Mod(i64),
}

impl MapOp {
    pub fn apply(self, x: i64) -> i64 {
        match self {
            MapOp::Square => x.wrapping_mul(x),
            MapOp::Negate => x.wrapping_neg(),
            MapOp::Abs => x.wrapping_abs(),
            MapOp::Add(n) => x.wrapping_add(n),
            MapOp::Mul(n) => x.wrapping_mul(n),
            MapOp::Mod(n) => x.wrapping_rem(n),
        }
    }
}

/// Integer predicate applied by `FILTER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Odd,
    Even,
    Positive,
    Negative,
    Gt(i64),
    Lt(i64),
    Eq(i64),
    Ne(i64),
}

impl Predicate {
    pub fn test(self, x: i64) -> bool {
        match self {
            Predicate::Odd => x % 2 != 0,
            Predicate::Even => x % 2 == 0,
            Predicate::Positive => x > 0,
            Predicate::Negative => x < 0,
            Predicate::Gt(n) => x > n,
            Predicate::Lt(n) => x < n,
            Predicate::Eq(n) => x == n,
            Predicate::Ne(n) => x != n,
        }
    }
}

/// Combiner applied by `REDUCE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combiner {
    Add,
    Mul,
    Min,
    Max,
}

impl Combiner {
    pub fn combine(self, acc: i64, x: i64) -> i64 {
        match self {
            Combiner::Add => acc.wrapping_add(x),
            Combiner::Mul => acc.wrapping_mul(x),
            Combiner::Min => acc.min(x),
            Combiner::Max => acc.max(x),
        }
    }
}

/// Parsed pipeline command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// EMPTY
    Empty,
    /// OF n1 n2 ...
    Of { values: Vec<i64> },
    /// ITERATE seed step
    Iterate { seed: i64, step: i64 },
    /// GENERATE n
    Generate { value: i64 },
    /// COUNTER start
    Counter { start: i64 },
    /// MAP op
    Map { op: MapOp },
    /// FILTER predicate
    Filter { predicate: Predicate },
    /// LIMIT n
    Limit { n: usize },
    /// SORTED [ASC|DESC]
    Sorted { descending: bool },
    /// DISTINCT
    Distinct,
    /// FOREACH
    ForEach,
    /// COUNT
    Count,
    /// FINDFIRST
    FindFirst,
    /// TOARRAY
    ToArray,
    /// REDUCE combiner seed
    Reduce { combiner: Combiner, seed: i64 },
}

impl Command {
    /// Is this stage a source (no upstream)?
    pub fn is_source(&self) -> bool {
        matches!(
            self,
            Command::Empty
                | Command::Of { .. }
                | Command::Iterate { .. }
                | Command::Generate { .. }
                | Command::Counter { .. }
        )
    }

    /// Does this source produce values forever?
    pub fn is_infinite(&self) -> bool {
        matches!(
            self,
            Command::Iterate { .. } | Command::Generate { .. } | Command::Counter { .. }
        )
    }

    /// Is this stage a terminal driver?
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Command::ForEach
                | Command::Count
                | Command::FindFirst
                | Command::ToArray
                | Command::Reduce { .. }
        )
    }

    /// Get the stage name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Empty => "EMPTY",
            Command::Of { .. } => "OF",
            Command::Iterate { .. } => "ITERATE",
            Command::Generate { .. } => "GENERATE",
            Command::Counter { .. } => "COUNTER",
            Command::Map { .. } => "MAP",
            Command::Filter { .. } => "FILTER",
            Command::Limit { .. } => "LIMIT",
            Command::Sorted { .. } => "SORTED",
            Command::Distinct => "DISTINCT",
            Command::ForEach => "FOREACH",
            Command::Count => "COUNT",
            Command::FindFirst => "FINDFIRST",
            Command::ToArray => "TOARRAY",
            Command::Reduce { .. } => "REDUCE",
        }
    }
}

/// Parse DSL text into commands.
pub fn parse_commands(text: &str) -> Result<Vec<Command>> {
    let mut commands = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // "PIPE COMMAND" - extract command after PIPE
        let line = if line.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("PIPE ")) {
            line[5..].trim()
        } else if line.eq_ignore_ascii_case("PIPE") {
            continue;
        } else {
            line
        };

        // Continuation lines: "| COMMAND ..."
        let line = line.strip_prefix('|').map_or(line, str::trim);

        // Explicit end of pipeline
        let line = line.trim_end_matches('?').trim();

        if line.is_empty() {
            continue;
        }

        commands.push(parse_command(line, line_num + 1)?);
    }

    Ok(commands)
}

/// Parse a single command line.
fn parse_command(line: &str, line_num: usize) -> Result<Command> {
    let mut words = line.split_whitespace();
    let keyword = words.next().unwrap_or_default().to_ascii_uppercase();
    let args: Vec<&str> = words.collect();

    match keyword.as_str() {
        "EMPTY" => no_args(&keyword, &args, line_num, Command::Empty),
        "OF" => {
            let values = args
                .iter()
                .map(|a| parse_number(a, "OF", line_num))
                .collect::<Result<Vec<_>>>()?;
            Ok(Command::Of { values })
        }
        "ITERATE" => match args.as_slice() {
            [seed, step] => Ok(Command::Iterate {
                seed: parse_number(seed, "ITERATE", line_num)?,
                step: parse_number(step, "ITERATE", line_num)?,
            }),
            _ => Err(PipelineError::invalid(
                line_num,
                "ITERATE requires a seed and a step",
            )),
        },
        "GENERATE" => Ok(Command::Generate {
            value: single_number(&args, "GENERATE", line_num)?,
        }),
        "COUNTER" => Ok(Command::Counter {
            start: single_number(&args, "COUNTER", line_num)?,
        }),
        "MAP" => parse_map(&args, line_num),
        "FILTER" => parse_filter(&args, line_num),
        "LIMIT" => {
            let n = match args.as_slice() {
                [n] => n.parse::<usize>().ok(),
                _ => None,
            };
            n.map(|n| Command::Limit { n })
                .ok_or_else(|| PipelineError::invalid(line_num, "LIMIT requires a number"))
        }
        "SORTED" => match args.as_slice() {
            [] => Ok(Command::Sorted { descending: false }),
            [order] if order.eq_ignore_ascii_case("ASC") => {
                Ok(Command::Sorted { descending: false })
            }
            [order] if order.eq_ignore_ascii_case("DESC") => {
                Ok(Command::Sorted { descending: true })
            }
            _ => Err(PipelineError::invalid(
                line_num,
                "SORTED accepts only ASC or DESC",
            )),
        },
        "DISTINCT" => no_args(&keyword, &args, line_num, Command::Distinct),
        "FOREACH" => no_args(&keyword, &args, line_num, Command::ForEach),
        "COUNT" => no_args(&keyword, &args, line_num, Command::Count),
        "FINDFIRST" => no_args(&keyword, &args, line_num, Command::FindFirst),
        "TOARRAY" => no_args(&keyword, &args, line_num, Command::ToArray),
        "REDUCE" => parse_reduce(&args, line_num),
        _ => Err(PipelineError::UnknownStage {
            line: line_num,
            name: keyword,
        }),
    }
}

fn no_args(keyword: &str, args: &[&str], line_num: usize, cmd: Command) -> Result<Command> {
    if args.is_empty() {
        Ok(cmd)
    } else {
        Err(PipelineError::invalid(
            line_num,
            format!("{keyword} takes no arguments"),
        ))
    }
}

fn parse_number(word: &str, keyword: &str, line_num: usize) -> Result<i64> {
    word.parse().map_err(|_| {
        PipelineError::invalid(line_num, format!("{keyword}: '{word}' is not a number"))
    })
}

fn single_number(args: &[&str], keyword: &str, line_num: usize) -> Result<i64> {
    match args {
        [word] => parse_number(word, keyword, line_num),
        _ => Err(PipelineError::invalid(
            line_num,
            format!("{keyword} requires a number"),
        )),
    }
}

/// Parse MAP command.
fn parse_map(args: &[&str], line_num: usize) -> Result<Command> {
    let op = match args {
        [op] if op.eq_ignore_ascii_case("SQUARE") => MapOp::Square,
        [op] if op.eq_ignore_ascii_case("NEGATE") => MapOp::Negate,
        [op] if op.eq_ignore_ascii_case("ABS") => MapOp::Abs,
        [op, n] if op.eq_ignore_ascii_case("ADD") => MapOp::Add(parse_number(n, "MAP", line_num)?),
        [op, n] if op.eq_ignore_ascii_case("MUL") => MapOp::Mul(parse_number(n, "MAP", line_num)?),
        [op, n] if op.eq_ignore_ascii_case("MOD") => {
            let n = parse_number(n, "MAP", line_num)?;
            if n == 0 {
                return Err(PipelineError::invalid(
                    line_num,
                    "MAP MOD requires a non-zero divisor",
                ));
            }
            MapOp::Mod(n)
        }
        _ => {
            return Err(PipelineError::invalid(
                line_num,
                "MAP requires SQUARE, NEGATE, ABS, ADD n, MUL n, or MOD n",
            ));
        }
    };
    Ok(Command::Map { op })
}

/// Parse FILTER command.
fn parse_filter(args: &[&str], line_num: usize) -> Result<Command> {
    let predicate = match args {
        [p] if p.eq_ignore_ascii_case("ODD") => Predicate::Odd,
        [p] if p.eq_ignore_ascii_case("EVEN") => Predicate::Even,
        [p] if p.eq_ignore_ascii_case("POSITIVE") => Predicate::Positive,
        [p] if p.eq_ignore_ascii_case("NEGATIVE") => Predicate::Negative,
        [p, n] => {
            let n = parse_number(n, "FILTER", line_num)?;
            match p.to_ascii_uppercase().as_str() {
                "GT" => Predicate::Gt(n),
                "LT" => Predicate::Lt(n),
                "EQ" => Predicate::Eq(n),
                "NE" => Predicate::Ne(n),
                other => {
                    return Err(PipelineError::invalid(
                        line_num,
                        format!("FILTER: unknown comparison '{other}'"),
                    ));
                }
            }
        }
        _ => {
            return Err(PipelineError::invalid(
                line_num,
                "FILTER requires ODD, EVEN, POSITIVE, NEGATIVE, or GT|LT|EQ|NE n",
            ));
        }
    };
    Ok(Command::Filter { predicate })
}

/// Parse REDUCE command.
fn parse_reduce(args: &[&str], line_num: usize) -> Result<Command> {
    let [combiner, seed] = args else {
        return Err(PipelineError::invalid(
            line_num,
            "REDUCE requires ADD|MUL|MIN|MAX and a seed",
        ));
    };
    let combiner = match combiner.to_ascii_uppercase().as_str() {
        "ADD" => Combiner::Add,
        "MUL" => Combiner::Mul,
        "MIN" => Combiner::Min,
        "MAX" => Combiner::Max,
        other => {
            return Err(PipelineError::invalid(
                line_num,
                format!("REDUCE: unknown combiner '{other}'"),
            ));
        }
    };
    Ok(Command::Reduce {
        combiner,
        seed: parse_number(seed, "REDUCE", line_num)?,
    })
}
