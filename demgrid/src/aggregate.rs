//! Aggregate combinators over lists of promises.
//!
//! - [`all`] fulfills with every value once all inputs fulfill, and rejects with
//!   the first rejection observed.
//! - [`any`] fulfills with the first value observed, and rejects only once
//!   every input rejected.
//! - [`all_settled`] never rejects; it reports every outcome.
//!
//! Results are always in input order, whatever order the inputs settle in.
//! Empty input lists settle immediately.

use std::cell::RefCell;
use std::rc::Rc;

use crate::promise::{Deferred, Promise, Settled};

/// Per-input slots filled as inputs settle.
struct Slots<S> {
    slots: Vec<Option<S>>,
}

impl<S> Slots<S> {
    fn new(len: usize) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            slots: (0..len).map(|_| None).collect(),
        }))
    }

    /// Store a slot, returning every slot once all are filled.
    fn fill(&mut self, index: usize, value: S) -> Option<Vec<S>> {
        self.slots[index] = Some(value);
        if self.slots.iter().all(Option::is_some) {
            self.slots.iter_mut().map(Option::take).collect()
        } else {
            None
        }
    }
}

/// Fulfill with all values in input order, or reject with the first reason observed.
///
/// Once a rejection has fired, later rejections are ignored; the aggregate
/// settles exactly once.
pub fn all<T, E>(inputs: Vec<Promise<T, E>>) -> Promise<Vec<T>, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    let aggregate = Deferred::new();
    if inputs.is_empty() {
        aggregate.resolve(Vec::new());
        return aggregate.promise();
    }

    let values = Slots::new(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let aggregate = aggregate.clone();
        let values = Rc::clone(&values);
        input.on_settled(move |outcome| match outcome {
            Settled::Fulfilled(value) => {
                let complete = values.borrow_mut().fill(index, value);
                if let Some(values) = complete {
                    aggregate.resolve(values);
                }
            }
            Settled::Rejected(error) => {
                aggregate.reject(error);
            }
        });
    }
    aggregate.promise()
}

/// Fulfill with the first value observed, or reject with every reason in input order.
pub fn any<T, E>(inputs: Vec<Promise<T, E>>) -> Promise<T, Vec<E>>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    let aggregate = Deferred::new();
    if inputs.is_empty() {
        aggregate.reject(Vec::new());
        return aggregate.promise();
    }

    let reasons = Slots::new(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let aggregate = aggregate.clone();
        let reasons = Rc::clone(&reasons);
        input.on_settled(move |outcome| match outcome {
            Settled::Fulfilled(value) => {
                aggregate.resolve(value);
            }
            Settled::Rejected(error) => {
                let complete = reasons.borrow_mut().fill(index, error);
                if let Some(reasons) = complete {
                    aggregate.reject(reasons);
                }
            }
        });
    }
    aggregate.promise()
}

/// Fulfill with every outcome in input order once all inputs have settled.
///
/// The returned promise never rejects.
pub fn all_settled<T, E>(inputs: Vec<Promise<T, E>>) -> Promise<Vec<Settled<T, E>>, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    let aggregate = Deferred::new();
    if inputs.is_empty() {
        aggregate.resolve(Vec::new());
        return aggregate.promise();
    }

    let outcomes = Slots::new(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let aggregate = aggregate.clone();
        let outcomes = Rc::clone(&outcomes);
        input.on_settled(move |outcome| {
            let complete = outcomes.borrow_mut().fill(index, outcome);
            if let Some(outcomes) = complete {
                aggregate.resolve(outcomes);
            }
        });
    }
    aggregate.promise()
}
