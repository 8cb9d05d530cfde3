//! Pipeline builder and terminal drivers.
//!
//! A [`Pipeline`] is a handle on the last node of a chain. Each builder
//! method creates one new node linked to the current one by a shared
//! reference, so building never pulls anything: evaluation only happens
//! when a driver (`for_each`, `count`, `find_first`, `to_array`, `reduce`)
//! pulls the last node.
//!
//! ```
//! use std::rc::Rc;
//! use pull_pipes::{NullSink, Pipeline};
//!
//! let sorted = Pipeline::iterate(Rc::new(NullSink), 9i64, |x| x - 1)
//!     .map(|x| x * x)
//!     .filter(|x| x % 2 != 0)
//!     .limit(2)
//!     .sorted()
//!     .to_array();
//!
//! assert_eq!(&*sorted, &[49, 81]);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::aggregate::{CollectToList, Reduce};
use crate::node::{Operator, PipelineNode};
use crate::sink::EventSink;
use crate::source::{Empty, Generate, Iterate, OfElements};
use crate::stage::{Filter, Limit, Map};
use crate::stateful::{Distinct, Sorted};

/// Handle on the last node of a lazily evaluated chain.
pub struct Pipeline<T> {
    node: Rc<PipelineNode<T>>,
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pipeline").field(&self.node).finish()
    }
}

impl<T: fmt::Debug + 'static> Pipeline<T> {
    fn source(sink: Rc<dyn EventSink>, name: &str, operator: impl Operator<T> + 'static) -> Self {
        Self {
            node: PipelineNode::new(name, 0, sink, Box::new(operator)),
        }
    }

    fn link<R: fmt::Debug + 'static>(
        &self,
        name: impl Into<String>,
        operator: impl Operator<R> + 'static,
    ) -> Pipeline<R> {
        Pipeline {
            node: PipelineNode::new(
                name,
                self.node.depth() + 1,
                self.node.sink(),
                Box::new(operator),
            ),
        }
    }

    // ---------------------------------------------------------------------
    // Sources
    // ---------------------------------------------------------------------

    /// A source that never produces a value.
    pub fn empty(sink: Rc<dyn EventSink>) -> Self {
        Self::source(sink, "empty", Empty)
    }

    /// A source yielding `elements` in order.
    pub fn of(sink: Rc<dyn EventSink>, elements: impl IntoIterator<Item = T>) -> Self {
        Self::source(sink, "of", OfElements::new(elements.into_iter().collect()))
    }

    /// An infinite source: `seed`, `step(seed)`, `step(step(seed))`, ...
    pub fn iterate(
        sink: Rc<dyn EventSink>,
        seed: T,
        step: impl FnMut(&T) -> T + 'static,
    ) -> Self
    where
        T: Clone,
    {
        Self::source(sink, "generate", Iterate::new(seed, step))
    }

    /// An infinite source calling `supplier` on every pull.
    pub fn generate(sink: Rc<dyn EventSink>, supplier: impl FnMut() -> T + 'static) -> Self {
        Self::source(sink, "generate", Generate::new(supplier))
    }

    // ---------------------------------------------------------------------
    // Transforms
    // ---------------------------------------------------------------------

    pub fn filter(&self, predicate: impl FnMut(&T) -> bool + 'static) -> Self {
        self.link("filter", Filter::new(Rc::clone(&self.node), predicate))
    }

    pub fn map<R: fmt::Debug + 'static>(&self, mapper: impl FnMut(T) -> R + 'static) -> Pipeline<R> {
        self.link("map", Map::new(Rc::clone(&self.node), mapper))
    }

    pub fn limit(&self, n: usize) -> Self {
        self.link(format!("limit({n})"), Limit::new(Rc::clone(&self.node), n))
    }

    /// Sort by natural order. Drains the upstream on the first pull.
    pub fn sorted(&self) -> Self
    where
        T: Ord,
    {
        self.sorted_by(T::cmp)
    }

    /// Sort by `compare`. Drains the upstream on the first pull.
    pub fn sorted_by(&self, compare: impl FnMut(&T, &T) -> Ordering + 'static) -> Self {
        self.link("sorted", Sorted::new(Rc::clone(&self.node), compare))
    }

    /// Skip values already seen, retrying at most once per pull.
    pub fn distinct(&self) -> Self
    where
        T: Eq + Hash + Clone,
    {
        self.link("distinct", Distinct::new(Rc::clone(&self.node)))
    }

    /// Append a reduce node, whose first pull yields the fold of the
    /// whole upstream.
    pub fn reducing(&self, seed: T, combiner: impl FnMut(T, T) -> T + 'static) -> Self {
        self.link("reduce", Reduce::new(Rc::clone(&self.node), seed, combiner))
    }

    /// Append a collect node, whose first pull yields the whole upstream
    /// as one list.
    pub fn collecting(&self) -> Pipeline<Vec<T>> {
        self.link("toArray", CollectToList::new(Rc::clone(&self.node)))
    }

    // ---------------------------------------------------------------------
    // Drivers
    // ---------------------------------------------------------------------

    /// Pull one value from the last node.
    pub fn fetch_one(&self) -> Option<T> {
        self.node.fetch_one()
    }

    /// Pull until exhaustion, handing each value to `consumer`.
    pub fn for_each(&self, mut consumer: impl FnMut(T)) {
        while let Some(value) = self.fetch_one() {
            consumer(value);
        }
    }

    /// Pull exactly once.
    pub fn find_first(&self) -> Option<T> {
        self.fetch_one()
    }

    /// Number of values left, counted as `map(|_| 1)` reduced by `+`.
    pub fn count(&self) -> u64 {
        self.map(|_| 1u64).reduce(0, |a, b| a + b)
    }

    /// Fold every remaining value into `seed`.
    pub fn reduce(&self, seed: T, combiner: impl FnMut(T, T) -> T + 'static) -> T {
        self.reducing(seed, combiner)
            .find_first()
            .expect("a fresh reduce node always yields its accumulator")
    }

    /// Gather every remaining value into a fixed-size array.
    pub fn to_array(&self) -> Box<[T]> {
        self.collecting()
            .find_first()
            .unwrap_or_default()
            .into_boxed_slice()
    }

    /// Iterate by pulling one value per `next()` call.
    pub fn iter(&self) -> Pulls<'_, T> {
        Pulls { pipeline: self }
    }

    pub fn node(&self) -> &PipelineNode<T> {
        &self.node
    }
}

/// Iterator adapter over [`Pipeline::fetch_one`].
pub struct Pulls<'a, T> {
    pipeline: &'a Pipeline<T>,
}

impl<T: fmt::Debug + 'static> Iterator for Pulls<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.pipeline.fetch_one()
    }
}

impl<'a, T: fmt::Debug + 'static> IntoIterator for &'a Pipeline<T> {
    type Item = T;
    type IntoIter = Pulls<'a, T>;

    fn into_iter(self) -> Pulls<'a, T> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{NodeView, NullSink};
    use std::cell::RefCell;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    /// Records notifications as `(kind, node, value)` tuples.
    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<(&'static str, String, Option<String>)>>,
    }

    impl EventSink for Recorder {
        fn register(&self, node: &dyn NodeView) {
            self.events
                .borrow_mut()
                .push(("register", node.name().to_string(), None));
        }

        fn before_fetch(&self, node: &dyn NodeView) {
            self.events
                .borrow_mut()
                .push(("before", node.name().to_string(), None));
        }

        fn after_fetch(&self, node: &dyn NodeView, value: Option<&dyn fmt::Debug>) {
            self.events.borrow_mut().push((
                "after",
                node.name().to_string(),
                value.map(|v| format!("{v:?}")),
            ));
        }
    }

    #[test]
    fn test_scenario_squares_odd_limit_sorted() {
        let pipe = Pipeline::iterate(Rc::new(NullSink), 9i64, |x| x - 1)
            .map(|x| x * x)
            .filter(|x| x % 2 != 0)
            .limit(2)
            .sorted();
        assert_eq!(&*pipe.to_array(), &[49, 81]);
    }

    #[test]
    fn test_scenario_pulls_stop_at_limit() {
        let recorder = Rc::new(Recorder::default());
        let pipe = Pipeline::iterate(recorder.clone(), 9i64, |x| x - 1)
            .map(|x| x * x)
            .filter(|x| x % 2 != 0)
            .limit(2)
            .sorted();
        pipe.to_array();
        let produced: Vec<String> = recorder
            .events
            .borrow()
            .iter()
            .filter(|(kind, name, value)| *kind == "after" && name == "generate" && value.is_some())
            .filter_map(|(_, _, value)| value.clone())
            .collect();
        // 9 and 7 pass; nothing below 7 is ever generated
        assert_eq!(produced, vec!["9", "8", "7"]);
    }

    #[test]
    fn test_depth_grows_per_link() {
        let sink: Rc<dyn EventSink> = Rc::new(NullSink);
        let source = Pipeline::of(sink, [1, 2]);
        let mapped = source.map(|x| x + 1);
        let limited = mapped.limit(1);
        assert_eq!(source.node().depth(), 0);
        assert_eq!(mapped.node().depth(), 1);
        assert_eq!(limited.node().depth(), 2);
        assert_eq!(limited.node().name(), "limit(1)");
    }

    #[test]
    fn test_nodes_register_once_at_construction() {
        let recorder = Rc::new(Recorder::default());
        let pipe = Pipeline::of(recorder.clone(), [1, 2, 3])
            .filter(|x| *x > 1)
            .distinct();
        let registered: Vec<String> = recorder
            .events
            .borrow()
            .iter()
            .map(|(kind, name, _)| format!("{kind}:{name}"))
            .collect();
        assert_eq!(
            registered,
            vec!["register:of", "register:filter", "register:distinct"]
        );
        pipe.for_each(|_| {});
        let registrations = recorder
            .events
            .borrow()
            .iter()
            .filter(|(kind, _, _)| *kind == "register")
            .count();
        assert_eq!(registrations, 3);
    }

    #[test]
    fn test_each_fetch_notifies_before_then_after() {
        let recorder = Rc::new(Recorder::default());
        let pipe = Pipeline::of(recorder.clone(), [1, 2]).map(|x| x * 10);
        recorder.events.borrow_mut().clear();

        assert_eq!(pipe.fetch_one(), Some(10));
        let events = recorder.events.borrow().clone();
        assert_eq!(
            events,
            vec![
                ("before", "map".to_string(), None),
                ("before", "of".to_string(), None),
                ("after", "of".to_string(), Some("1".to_string())),
                ("after", "map".to_string(), Some("10".to_string())),
            ]
        );
    }

    #[test]
    fn test_absent_fetch_still_notifies() {
        let recorder = Rc::new(Recorder::default());
        let pipe = Pipeline::<i32>::empty(recorder.clone());
        recorder.events.borrow_mut().clear();

        for _ in 0..3 {
            assert_eq!(pipe.fetch_one(), None);
        }
        let events = recorder.events.borrow().clone();
        assert_eq!(events.len(), 6);
        for pair in events.chunks(2) {
            assert_eq!(pair[0], ("before", "empty".to_string(), None));
            assert_eq!(pair[1], ("after", "empty".to_string(), None));
        }
    }

    #[test]
    fn test_notifications_balance_across_chain() {
        let recorder = Rc::new(Recorder::default());
        let pipe = Pipeline::of(recorder.clone(), 0..20)
            .filter(|x| x % 3 != 0)
            .distinct()
            .limit(4)
            .sorted_by(|a, b| b.cmp(a));
        assert_eq!(pipe.iter().collect::<Vec<_>>(), vec![5, 4, 2, 1]);

        let events = recorder.events.borrow();
        for name in ["of", "filter", "distinct", "limit(4)", "sorted"] {
            let mut open = 0i32;
            for (kind, node, _) in events.iter().filter(|(_, node, _)| node == name) {
                match *kind {
                    "before" => open += 1,
                    "after" => {
                        open -= 1;
                        assert!(open >= 0, "after without before on {node}");
                    }
                    _ => {}
                }
            }
            assert_eq!(open, 0, "unbalanced notifications on {name}");
        }
    }

    #[test]
    fn test_find_first_pulls_exactly_once() {
        let recorder = Rc::new(Recorder::default());
        let pipe = Pipeline::of(recorder.clone(), [4, 5, 6]);
        recorder.events.borrow_mut().clear();
        assert_eq!(pipe.find_first(), Some(4));
        assert_eq!(recorder.events.borrow().len(), 2);
        assert_eq!(pipe.find_first(), Some(5));
    }

    #[test]
    fn test_count_builds_map_and_reduce() {
        let recorder = Rc::new(Recorder::default());
        let pipe = Pipeline::of(recorder.clone(), ['a', 'b', 'c']);
        assert_eq!(pipe.count(), 3);
        let registered: Vec<String> = recorder
            .events
            .borrow()
            .iter()
            .filter(|(kind, _, _)| *kind == "register")
            .map(|(_, name, _)| name.clone())
            .collect();
        assert_eq!(registered, vec!["of", "map", "reduce"]);
    }

    #[test]
    fn test_drivers_continue_where_previous_stopped() {
        let pipe = Pipeline::of(Rc::new(NullSink), 1..=6);
        assert_eq!(pipe.find_first(), Some(1));
        assert_eq!(pipe.limit(2).to_array().into_vec(), vec![2, 3]);
        assert_eq!(pipe.count(), 3);
        assert!(pipe.to_array().is_empty());
    }

    #[test]
    fn test_for_each_visits_in_order() {
        let mut seen = Vec::new();
        Pipeline::of(Rc::new(NullSink), ["x", "y", "z"]).for_each(|v| seen.push(v));
        assert_eq!(seen, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_iterator_adapter() {
        let pipe = Pipeline::generate(Rc::new(NullSink), || 'q');
        let taken: String = pipe.iter().take(3).collect();
        assert_eq!(taken, "qqq");

        let finite = Pipeline::of(Rc::new(NullSink), [1, 2, 3]);
        let mut total = 0;
        for v in &finite {
            total += v;
        }
        assert_eq!(total, 6);
    }

    #[test]
    fn test_callback_panic_reaches_driver() {
        let pipe = Pipeline::of(Rc::new(NullSink), [1, 2, 3, 4])
            .map(|x: i32| if x == 3 { panic!("mapper failed") } else { x })
            .sorted();
        let result = catch_unwind(AssertUnwindSafe(|| pipe.to_array()));
        assert!(result.is_err());
        // the interrupted sort stays unusable
        assert!(pipe.node().is_poisoned());
        assert_eq!(pipe.fetch_one(), None);
    }

    #[test]
    fn test_clone_shares_the_node() {
        let pipe = Pipeline::of(Rc::new(NullSink), [1, 2]);
        let other = pipe.clone();
        assert_eq!(pipe.fetch_one(), Some(1));
        assert_eq!(other.fetch_one(), Some(2));
        assert_eq!(format!("{pipe:?}"), format!("{other:?}"));
    }
}
