//! Stateless transforms.
//!
//! These hold at most one pending value between pulls. `Filter` may pull
//! upstream many times in one refill, `Map` and `Limit` pull at most once.

use std::fmt;
use std::rc::Rc;

use crate::node::{Buffer, Operator, PipelineNode};

/// Keeps values matching a predicate.
///
/// Pulls upstream until a value passes or upstream comes back empty.
pub struct Filter<T, P> {
    upstream: Rc<PipelineNode<T>>,
    predicate: P,
}

impl<T, P> Filter<T, P> {
    pub fn new(upstream: Rc<PipelineNode<T>>, predicate: P) -> Self {
        Self {
            upstream,
            predicate,
        }
    }
}

impl<T, P> Operator<T> for Filter<T, P>
where
    T: fmt::Debug + 'static,
    P: FnMut(&T) -> bool,
{
    fn refill(&mut self, buffer: &mut Buffer<T>) {
        while let Some(value) = self.upstream.fetch_one() {
            if (self.predicate)(&value) {
                buffer.push(value);
                return;
            }
        }
    }
}

/// Applies a function to each value.
pub struct Map<U, F> {
    upstream: Rc<PipelineNode<U>>,
    mapper: F,
}

impl<U, F> Map<U, F> {
    pub fn new(upstream: Rc<PipelineNode<U>>, mapper: F) -> Self {
        Self { upstream, mapper }
    }
}

impl<T, U, F> Operator<T> for Map<U, F>
where
    T: fmt::Debug,
    U: fmt::Debug + 'static,
    F: FnMut(U) -> T,
{
    fn refill(&mut self, buffer: &mut Buffer<T>) {
        if let Some(value) = self.upstream.fetch_one() {
            buffer.push((self.mapper)(value));
        }
    }
}

/// Passes through at most `n` values.
///
/// Once the budget is spent upstream is never pulled again.
pub struct Limit<T> {
    upstream: Rc<PipelineNode<T>>,
    remaining: usize,
}

impl<T> Limit<T> {
    pub fn new(upstream: Rc<PipelineNode<T>>, n: usize) -> Self {
        Self {
            upstream,
            remaining: n,
        }
    }
}

impl<T: fmt::Debug + 'static> Operator<T> for Limit<T> {
    fn refill(&mut self, buffer: &mut Buffer<T>) {
        if self.remaining == 0 {
            return;
        }
        if let Some(value) = self.upstream.fetch_one() {
            self.remaining -= 1;
            buffer.push(value);
        }
    }
}
