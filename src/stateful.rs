//! Stateful transforms: `Sorted` and `Distinct`.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::node::{Buffer, Operator, PipelineNode};

/// Sorts the whole upstream.
///
/// The first refill drains upstream completely, keeping the buffer in
/// descending order so that tail pops come out ascending. Later refills
/// only let the node pop what is left. An upstream that never exhausts
/// never finishes the first refill.
pub struct Sorted<T, C> {
    upstream: Rc<PipelineNode<T>>,
    compare: C,
    drained: bool,
}

impl<T, C> Sorted<T, C> {
    pub fn new(upstream: Rc<PipelineNode<T>>, compare: C) -> Self {
        Self {
            upstream,
            compare,
            drained: false,
        }
    }
}

impl<T, C> Operator<T> for Sorted<T, C>
where
    T: fmt::Debug + 'static,
    C: FnMut(&T, &T) -> Ordering,
{
    fn refill(&mut self, buffer: &mut Buffer<T>) {
        if self.drained {
            return;
        }
        while let Some(value) = self.upstream.fetch_one() {
            // Equal values go after existing ones, nearer the tail.
            let index = buffer
                .as_slice()
                .partition_point(|held| (self.compare)(held, &value) != Ordering::Less);
            buffer.insert(index, value);
        }
        self.drained = true;
    }
}

/// Drops a value already seen, retrying at most once per pull.
///
/// When the first upstream value of a pull is a duplicate, exactly one more
/// value is pulled and used as is, even if it is a duplicate too. A run of
/// three equal values after the first therefore lets the second one
/// through.
pub struct Distinct<T> {
    upstream: Rc<PipelineNode<T>>,
    seen: HashSet<T>,
}

impl<T> Distinct<T> {
    pub fn new(upstream: Rc<PipelineNode<T>>) -> Self {
        Self {
            upstream,
            seen: HashSet::new(),
        }
    }
}

impl<T> Operator<T> for Distinct<T>
where
    T: fmt::Debug + Eq + Hash + Clone + 'static,
{
    fn refill(&mut self, buffer: &mut Buffer<T>) {
        let mut value = self.upstream.fetch_one();
        if value.as_ref().is_some_and(|v| self.seen.contains(v)) {
            value = self.upstream.fetch_one();
        }
        if let Some(value) = value {
            self.seen.insert(value.clone());
            buffer.push(value);
        }
    }
}
