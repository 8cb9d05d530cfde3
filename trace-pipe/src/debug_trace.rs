//! Debug trace types for pull-based evaluation.
//!
//! A [`RecordingSink`] stores each notification as a [`FetchEvent`]. The
//! resulting [`FetchTrace`] shows the journey of every pull: a fetch on the
//! last node opens a `BeforeFetch`, nested fetches on upstream nodes follow,
//! and the matching `AfterFetch` closes it with the value produced.

use std::cell::RefCell;
use std::fmt;

use pull_pipes::{EventSink, NodeView};

/// One notification received from a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    /// The node was constructed.
    Register { node: String, depth: usize },
    /// The node is about to refill.
    BeforeFetch {
        node: String,
        depth: usize,
        /// Values buffered when the fetch started.
        buffered: Vec<String>,
    },
    /// The node finished a fetch.
    AfterFetch {
        node: String,
        depth: usize,
        /// Values still buffered after the pop.
        buffered: Vec<String>,
        /// The value produced, or `None` when the fetch came back empty.
        value: Option<String>,
    },
}

impl FetchEvent {
    pub fn node(&self) -> &str {
        match self {
            FetchEvent::Register { node, .. }
            | FetchEvent::BeforeFetch { node, .. }
            | FetchEvent::AfterFetch { node, .. } => node,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            FetchEvent::Register { depth, .. }
            | FetchEvent::BeforeFetch { depth, .. }
            | FetchEvent::AfterFetch { depth, .. } => *depth,
        }
    }
}

/// Complete record of the notifications sent during a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchTrace {
    pub events: Vec<FetchEvent>,
}

impl FetchTrace {
    /// Node names in registration order.
    pub fn registered(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| matches!(e, FetchEvent::Register { .. }))
            .map(FetchEvent::node)
            .collect()
    }

    /// How many fetches were started on nodes named `node`.
    pub fn fetch_count(&self, node: &str) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, FetchEvent::BeforeFetch { .. }) && e.node() == node)
            .count()
    }

    /// Values produced by nodes named `node`, in order.
    pub fn produced_by(&self, node: &str) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                FetchEvent::AfterFetch {
                    node: name,
                    value: Some(value),
                    ..
                } if name == node => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Depth of the deepest registered node.
    pub fn max_depth(&self) -> usize {
        self.events.iter().map(FetchEvent::depth).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl fmt::Display for FetchTrace {
    /// One line per fetch notification, indented by node depth.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in &self.events {
            let indent = "  ".repeat(event.depth());
            match event {
                FetchEvent::Register { node, .. } => {
                    writeln!(f, "{indent}+ {node}")?;
                }
                FetchEvent::BeforeFetch { node, buffered, .. } => {
                    writeln!(f, "{indent}{node} [{}] <--FETCH--", buffered.join(", "))?;
                }
                FetchEvent::AfterFetch {
                    node,
                    buffered,
                    value,
                    ..
                } => {
                    let shown = value.as_deref().unwrap_or("none");
                    writeln!(f, "{indent}{node} [{}] --{shown}-->", buffered.join(", "))?;
                }
            }
        }
        Ok(())
    }
}

/// Sink that records every notification it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RefCell<Vec<FetchEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn trace(&self) -> FetchTrace {
        FetchTrace {
            events: self.events.borrow().clone(),
        }
    }

    /// Everything recorded so far, leaving the sink empty.
    pub fn take_trace(&self) -> FetchTrace {
        FetchTrace {
            events: self.events.take(),
        }
    }
}

impl EventSink for RecordingSink {
    fn register(&self, node: &dyn NodeView) {
        self.events.borrow_mut().push(FetchEvent::Register {
            node: node.name().to_string(),
            depth: node.depth(),
        });
    }

    fn before_fetch(&self, node: &dyn NodeView) {
        self.events.borrow_mut().push(FetchEvent::BeforeFetch {
            node: node.name().to_string(),
            depth: node.depth(),
            buffered: node.buffered(),
        });
    }

    fn after_fetch(&self, node: &dyn NodeView, value: Option<&dyn fmt::Debug>) {
        self.events.borrow_mut().push(FetchEvent::AfterFetch {
            node: node.name().to_string(),
            depth: node.depth(),
            buffered: node.buffered(),
            value: value.map(|v| format!("{v:?}")),
        });
    }
}
