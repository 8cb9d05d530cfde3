//! Aggregate operators, which drain their upstream in a single refill.
//!
//! Terminal drivers create these ad hoc on top of a pipeline and pull them
//! exactly once.

use std::fmt;
use std::rc::Rc;

use crate::node::{Buffer, Operator, PipelineNode};

/// Folds the whole upstream into one accumulator.
///
/// The seed is pushed as the accumulator, then each upstream value pops
/// it, combines and pushes the result back. An empty upstream leaves the
/// seed itself. The seed is consumed by the first refill, so a second
/// pull on the same node yields nothing.
pub struct Reduce<T, F> {
    upstream: Rc<PipelineNode<T>>,
    seed: Option<T>,
    combiner: F,
}

impl<T, F> Reduce<T, F> {
    pub fn new(upstream: Rc<PipelineNode<T>>, seed: T, combiner: F) -> Self {
        Self {
            upstream,
            seed: Some(seed),
            combiner,
        }
    }
}

impl<T, F> Operator<T> for Reduce<T, F>
where
    T: fmt::Debug + 'static,
    F: FnMut(T, T) -> T,
{
    fn refill(&mut self, buffer: &mut Buffer<T>) {
        let Some(seed) = self.seed.take() else {
            return;
        };
        buffer.push(seed);
        while let Some(value) = self.upstream.fetch_one() {
            if let Some(accumulator) = buffer.pop() {
                buffer.push((self.combiner)(accumulator, value));
            }
        }
    }
}

/// Gathers the whole upstream into a single list value.
pub struct CollectToList<T> {
    upstream: Rc<PipelineNode<T>>,
    collected: bool,
}

impl<T> CollectToList<T> {
    pub fn new(upstream: Rc<PipelineNode<T>>) -> Self {
        Self {
            upstream,
            collected: false,
        }
    }
}

impl<T: fmt::Debug + 'static> Operator<Vec<T>> for CollectToList<T> {
    fn refill(&mut self, buffer: &mut Buffer<Vec<T>>) {
        if self.collected {
            return;
        }
        let mut elements = Vec::new();
        while let Some(value) = self.upstream.fetch_one() {
            elements.push(value);
        }
        self.collected = true;
        buffer.push(elements);
    }
}
