//! The notification contract between nodes and their observers.
//!
//! Every node holds a shared `EventSink` handed to it at construction.
//! The sink is told when the node is created, when a pull starts and what
//! the pull produced. Sinks only ever see a read-only [`NodeView`]; they
//! cannot reach a node's buffer or operator state mutably.

use std::fmt;

/// Read-only view of a node, as seen by a sink.
pub trait NodeView {
    /// Operator label, e.g. `filter` or `limit(2)`.
    fn name(&self) -> &str;

    /// Position in the chain; sources sit at depth 0.
    fn depth(&self) -> usize;

    /// Display form of the values currently buffered, head to tail.
    fn buffered(&self) -> Vec<String>;

    /// Display form of every value ever pushed into the buffer.
    fn display_mirror(&self) -> Vec<String>;
}

/// Observer notified by every node of a pipeline.
///
/// Implementations must not pull from the node they are handed.
pub trait EventSink {
    /// Called exactly once per node, when it is constructed.
    fn register(&self, node: &dyn NodeView);

    /// Called immediately before a node refills.
    fn before_fetch(&self, node: &dyn NodeView);

    /// Called once the node has refilled and popped its result.
    fn after_fetch(&self, node: &dyn NodeView, value: Option<&dyn fmt::Debug>);
}

/// Sink that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn register(&self, _node: &dyn NodeView) {}

    fn before_fetch(&self, _node: &dyn NodeView) {}

    fn after_fetch(&self, _node: &dyn NodeView, _value: Option<&dyn fmt::Debug>) {}
}

/// Sink that forwards every notification to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn register(&self, node: &dyn NodeView) {
        tracing::debug!(node = node.name(), depth = node.depth(), "register");
    }

    fn before_fetch(&self, node: &dyn NodeView) {
        tracing::debug!(
            node = node.name(),
            depth = node.depth(),
            buffered = ?node.buffered(),
            "<--FETCH--"
        );
    }

    fn after_fetch(&self, node: &dyn NodeView, value: Option<&dyn fmt::Debug>) {
        match value {
            Some(value) => tracing::debug!(
                node = node.name(),
                depth = node.depth(),
                value = ?value,
                "produced"
            ),
            None => tracing::debug!(node = node.name(), depth = node.depth(), "absent"),
        }
    }
}
