//! # pull-pipes
//!
//! Lazy, pull-based operator pipelines evaluated one value at a time.
//!
//! This library shows how a chain of stream operators evaluates on demand:
//! nothing runs when the chain is built, and pulling one value from the
//! last node pulls from upstream nodes only as far as needed.
//!
//! ## Overview
//!
//! - **Nodes**: every stage is a [`PipelineNode`] with a buffer and an
//!   [`Operator`] that refills it
//! - **Sources**: `empty`, `of`, `iterate`, `generate`
//! - **Stateless stages**: `filter`, `map`, `limit`
//! - **Stateful stages**: `sorted` (drains upstream), `distinct`
//! - **Drivers**: `for_each`, `count`, `find_first`, `to_array`, `reduce`
//! - **Sinks**: every node reports registration and each fetch to an
//!   [`EventSink`]
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use pull_pipes::{LogSink, Pipeline};
//!
//! let evens = Pipeline::of(Rc::new(LogSink), 1..=10)
//!     .filter(|x| x % 2 == 0)
//!     .map(|x| x * 100)
//!     .limit(3);
//!
//! assert_eq!(&*evens.to_array(), &[200, 400, 600]);
//! ```

pub mod aggregate;
pub mod dsl;
pub mod error;
pub mod executor;
pub mod node;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod stage;
pub mod stateful;

pub use dsl::{Combiner, Command, MapOp, Predicate, parse_commands};
pub use error::{PipelineError, Result};
pub use executor::{Outcome, Plan, build, drive, execute, plan};
pub use node::{Buffer, Operator, PipelineNode};
pub use pipeline::{Pipeline, Pulls};
pub use sink::{EventSink, LogSink, NodeView, NullSink};
