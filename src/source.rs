//! Source operators: nodes with no upstream.

use std::fmt;

use crate::node::{Buffer, Operator};

/// Never produces anything.
pub struct Empty;

impl<T> Operator<T> for Empty {
    fn refill(&mut self, _buffer: &mut Buffer<T>) {}
}

/// Emits a fixed sequence of elements, in order.
///
/// The first refill pushes every element in reverse so that tail pops
/// yield the original order; later refills do nothing.
pub struct OfElements<T> {
    elements: Option<Vec<T>>,
}

impl<T> OfElements<T> {
    pub fn new(elements: Vec<T>) -> Self {
        Self {
            elements: Some(elements),
        }
    }
}

impl<T: fmt::Debug> Operator<T> for OfElements<T> {
    fn refill(&mut self, buffer: &mut Buffer<T>) {
        if let Some(elements) = self.elements.take() {
            for element in elements.into_iter().rev() {
                buffer.push(element);
            }
        }
    }
}

/// Emits `seed`, then `step(seed)`, `step(step(seed))`, ... forever.
pub struct Iterate<T, F> {
    seed: Option<T>,
    last: Option<T>,
    step: F,
}

impl<T, F> Iterate<T, F> {
    pub fn new(seed: T, step: F) -> Self {
        Self {
            seed: Some(seed),
            last: None,
            step,
        }
    }
}

impl<T, F> Operator<T> for Iterate<T, F>
where
    T: fmt::Debug + Clone,
    F: FnMut(&T) -> T,
{
    fn refill(&mut self, buffer: &mut Buffer<T>) {
        let next = match (self.seed.take(), &self.last) {
            (Some(seed), _) => seed,
            (None, Some(last)) => (self.step)(last),
            // Only reachable after `step` unwound; the node is poisoned then.
            (None, None) => return,
        };
        self.last = Some(next.clone());
        buffer.push(next);
    }
}

/// Emits `supplier()` on every pull, forever.
pub struct Generate<F> {
    supplier: F,
}

impl<F> Generate<F> {
    pub fn new(supplier: F) -> Self {
        Self { supplier }
    }
}

impl<T, F> Operator<T> for Generate<F>
where
    T: fmt::Debug,
    F: FnMut() -> T,
{
    fn refill(&mut self, buffer: &mut Buffer<T>) {
        buffer.push((self.supplier)());
    }
}
