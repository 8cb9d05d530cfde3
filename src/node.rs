//! Pipeline nodes and the pull protocol.
//!
//! A node pairs a buffer with an [`Operator`]. Pulling a node asks the
//! operator to refill the buffer (pulling its own upstream as needed) and
//! then pops the tail of the buffer:
//!
//! 1. notify the sink `before_fetch`
//! 2. `refill()` the buffer
//! 3. pop the most recently pushed value, if any
//! 4. notify the sink `after_fetch` with the value or its absence
//!
//! `None` is the only exhaustion signal; nothing in here returns an error.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::sink::{EventSink, NodeView};

/// Ready-output queue of a node.
///
/// Values are popped from the tail. Every push is also recorded as a
/// display string in the mirror, which only sinks read.
pub struct Buffer<T> {
    items: Vec<T>,
    mirror: Vec<String>,
}

impl<T: fmt::Debug> Buffer<T> {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            mirror: Vec::new(),
        }
    }

    /// Push a value onto the tail.
    pub fn push(&mut self, value: T) {
        self.mirror.push(format!("{value:?}"));
        self.items.push(value);
    }

    /// Insert a value at `index`, shifting the tail towards the end.
    pub fn insert(&mut self, index: usize, value: T) {
        self.mirror.push(format!("{value:?}"));
        self.items.insert(index, value);
    }

    /// Pop the most recently pushed value.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    fn display(&self) -> Vec<String> {
        self.items.iter().map(|v| format!("{v:?}")).collect()
    }
}

/// The node-specific half of the pull protocol.
///
/// An operator owns its upstream handle and any per-node state (drained
/// flags, budgets, seen sets). `refill` may pull upstream zero or more
/// times and push results into `buffer`.
pub trait Operator<T> {
    fn refill(&mut self, buffer: &mut Buffer<T>);
}

/// One stage in a pipeline.
pub struct PipelineNode<T> {
    name: String,
    depth: usize,
    sink: Rc<dyn EventSink>,
    buffer: RefCell<Buffer<T>>,
    operator: RefCell<Box<dyn Operator<T>>>,
    /// Set for the duration of a refill; left set if the refill unwound.
    refilling: Cell<bool>,
}

impl<T: fmt::Debug + 'static> PipelineNode<T> {
    /// Create a node and register it with `sink`.
    pub fn new(
        name: impl Into<String>,
        depth: usize,
        sink: Rc<dyn EventSink>,
        operator: Box<dyn Operator<T>>,
    ) -> Rc<Self> {
        let node = Rc::new(Self {
            name: name.into(),
            depth,
            sink,
            buffer: RefCell::new(Buffer::new()),
            operator: RefCell::new(operator),
            refilling: Cell::new(false),
        });
        tracing::trace!(node = %node.name, depth, "node created");
        node.sink.register(&*node);
        node
    }

    /// Produce the next value, or `None` if nothing is available.
    pub fn fetch_one(&self) -> Option<T> {
        self.sink.before_fetch(self);

        let value = if self.refilling.get() {
            tracing::warn!(
                node = %self.name,
                depth = self.depth,
                "pull on a node whose refill was interrupted"
            );
            None
        } else {
            self.refilling.set(true);
            self.operator.borrow_mut().refill(&mut self.buffer.borrow_mut());
            self.refilling.set(false);
            self.buffer.borrow_mut().pop()
        };

        self.sink
            .after_fetch(self, value.as_ref().map(|v| v as &dyn fmt::Debug));
        value
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of values waiting in the buffer.
    pub fn pending(&self) -> usize {
        self.buffer.borrow().len()
    }

    /// True once a refill on this node has unwound; the node then only
    /// ever yields `None`.
    pub fn is_poisoned(&self) -> bool {
        self.refilling.get()
    }

    pub(crate) fn sink(&self) -> Rc<dyn EventSink> {
        Rc::clone(&self.sink)
    }
}

impl<T: fmt::Debug + 'static> NodeView for PipelineNode<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn buffered(&self) -> Vec<String> {
        self.buffer.borrow().display()
    }

    fn display_mirror(&self) -> Vec<String> {
        self.buffer.borrow().mirror.clone()
    }
}

impl<T> fmt::Debug for PipelineNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineNode")
            .field("name", &self.name)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}
