//! A single-threaded deferred/future primitive.
//!
//! A [`Promise`] starts pending and settles exactly once, either fulfilled with
//! a value or rejected with an error. Settlement synchronously runs every
//! registered continuation in registration order. Continuations are typed:
//!
//! - [`Promise::then`] runs on fulfillment,
//! - [`Promise::catch`] runs on rejection,
//! - [`Promise::finally`] runs on either.
//!
//! A continuation whose type does not match the settlement does not run its
//! callback. It forwards the settlement unchanged to its derived promise, so a
//! rejection skips every intervening `then` until it meets a `catch`.
//!
//! ```
//! use demgrid::{Deferred, Next};
//!
//! let deferred = Deferred::<i32, String>::new();
//! let doubled = deferred
//!     .promise()
//!     .then(|v| Next::Fulfill(v * 2))
//!     .catch(|_| Next::Fulfill(0));
//!
//! deferred.resolve(21);
//! assert_eq!(doubled.settlement().and_then(|s| s.ok()), Some(42));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// The final outcome of a promise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<T, E> {
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> Settled<T, E> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Settled::Fulfilled(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Settled::Rejected(_))
    }

    /// Returns the fulfilled value, discarding a rejection.
    pub fn ok(self) -> Option<T> {
        match self {
            Settled::Fulfilled(v) => Some(v),
            Settled::Rejected(_) => None,
        }
    }

    /// Returns the rejection reason, discarding a fulfilled value.
    pub fn err(self) -> Option<E> {
        match self {
            Settled::Fulfilled(_) => None,
            Settled::Rejected(e) => Some(e),
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Settled::Fulfilled(v) => Ok(v),
            Settled::Rejected(e) => Err(e),
        }
    }
}

impl<T, E> From<Result<T, E>> for Settled<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Settled::Fulfilled(v),
            Err(e) => Settled::Rejected(e),
        }
    }
}

/// What a continuation callback hands to its derived promise.
pub enum Next<T, E> {
    /// Fulfill the derived promise with a value.
    Fulfill(T),
    /// Reject the derived promise.
    Reject(E),
    /// Settle the derived promise with the eventual outcome of another promise.
    Adopt(Promise<T, E>),
}

impl<T, E> From<Result<T, E>> for Next<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Next::Fulfill(v),
            Err(e) => Next::Reject(e),
        }
    }
}

impl<T, E> From<Promise<T, E>> for Next<T, E> {
    fn from(promise: Promise<T, E>) -> Self {
        Next::Adopt(promise)
    }
}

impl<T, E> From<Settled<T, E>> for Next<T, E> {
    fn from(outcome: Settled<T, E>) -> Self {
        match outcome {
            Settled::Fulfilled(v) => Next::Fulfill(v),
            Settled::Rejected(e) => Next::Reject(e),
        }
    }
}

enum Status<T, E> {
    Pending,
    Fulfilled(T),
    Rejected(E),
}

/// A continuation record registered on a promise.
///
/// Each variant carries the callback that runs when the settlement kind
/// matches and, for `Then`/`Catch`, the forwarder used when it does not.
enum Continuation<T, E> {
    Then {
        on_fulfilled: Box<dyn FnOnce(T)>,
        forward: Box<dyn FnOnce(E)>,
    },
    Catch {
        on_rejected: Box<dyn FnOnce(E)>,
        forward: Box<dyn FnOnce(T)>,
    },
    Finally {
        on_settled: Box<dyn FnOnce(Settled<T, E>)>,
    },
}

impl<T, E> Continuation<T, E> {
    fn fire(self, outcome: Settled<T, E>) {
        match (self, outcome) {
            (Continuation::Then { on_fulfilled, .. }, Settled::Fulfilled(v)) => on_fulfilled(v),
            (Continuation::Catch { on_rejected, .. }, Settled::Rejected(e)) => on_rejected(e),
            (Continuation::Finally { on_settled }, outcome) => on_settled(outcome),
            // Skip-forward: the callback does not run, its successors see the
            // antecedent's settlement untouched.
            (Continuation::Then { forward, .. }, Settled::Rejected(e)) => forward(e),
            (Continuation::Catch { forward, .. }, Settled::Fulfilled(v)) => forward(v),
        }
    }
}

struct Shared<T, E> {
    status: Status<T, E>,
    continuations: Vec<Continuation<T, E>>,
}

/// A handle to an eventual value of type `T` or error of type `E`.
///
/// Cloning the handle does not clone the underlying state; every clone
/// observes the same settlement.
pub struct Promise<T, E> {
    shared: Rc<RefCell<Shared<T, E>>>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.borrow();
        let status = match shared.status {
            Status::Pending => "pending",
            Status::Fulfilled(_) => "fulfilled",
            Status::Rejected(_) => "rejected",
        };
        f.debug_struct("Promise")
            .field("status", &status)
            .field("continuations", &shared.continuations.len())
            .finish()
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Promise<T, E> {
    fn pending() -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                status: Status::Pending,
                continuations: Vec::new(),
            })),
        }
    }

    /// A promise that is already fulfilled.
    pub fn resolved(value: T) -> Self {
        let deferred = Deferred::new();
        deferred.resolve(value);
        deferred.promise()
    }

    /// A promise that is already rejected.
    pub fn rejected(error: E) -> Self {
        let deferred = Deferred::new();
        deferred.reject(error);
        deferred.promise()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.shared.borrow().status, Status::Pending)
    }

    /// A copy of the outcome, or `None` while pending.
    pub fn settlement(&self) -> Option<Settled<T, E>> {
        match &self.shared.borrow().status {
            Status::Pending => None,
            Status::Fulfilled(v) => Some(Settled::Fulfilled(v.clone())),
            Status::Rejected(e) => Some(Settled::Rejected(e.clone())),
        }
    }

    /// Register a continuation, running it at once if already settled.
    fn subscribe(&self, continuation: Continuation<T, E>) {
        let mut shared = self.shared.borrow_mut();
        let outcome = match &shared.status {
            Status::Pending => None,
            Status::Fulfilled(v) => Some(Settled::Fulfilled(v.clone())),
            Status::Rejected(e) => Some(Settled::Rejected(e.clone())),
        };
        match outcome {
            None => shared.continuations.push(continuation),
            Some(outcome) => {
                drop(shared);
                continuation.fire(outcome);
            }
        }
    }

    /// Run `f` with the fulfilled value and settle the derived promise with its result.
    ///
    /// A rejection is forwarded to the derived promise without calling `f`.
    pub fn then<U, F>(&self, f: F) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Next<U, E> + 'static,
    {
        let derived = Deferred::new();
        let on_fulfilled = {
            let derived = derived.clone();
            Box::new(move |value| derived.follow(f(value)))
        };
        let forward = {
            let derived = derived.clone();
            Box::new(move |error| {
                derived.reject(error);
            })
        };
        self.subscribe(Continuation::Then {
            on_fulfilled,
            forward,
        });
        derived.promise()
    }

    /// Run `f` with the rejection reason and settle the derived promise with its result.
    ///
    /// A fulfilled value is forwarded to the derived promise without calling `f`.
    pub fn catch<F>(&self, f: F) -> Promise<T, E>
    where
        F: FnOnce(E) -> Next<T, E> + 'static,
    {
        let derived = Deferred::new();
        let on_rejected = {
            let derived = derived.clone();
            Box::new(move |error| derived.follow(f(error)))
        };
        let forward = {
            let derived = derived.clone();
            Box::new(move |value| {
                derived.resolve(value);
            })
        };
        self.subscribe(Continuation::Catch {
            on_rejected,
            forward,
        });
        derived.promise()
    }

    /// Run `f` with whichever outcome arrives and settle the derived promise with its result.
    pub fn finally<U, F>(&self, f: F) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(Settled<T, E>) -> Next<U, E> + 'static,
    {
        let derived = Deferred::new();
        let on_settled = {
            let derived = derived.clone();
            Box::new(move |outcome| derived.follow(f(outcome)))
        };
        self.subscribe(Continuation::Finally { on_settled });
        derived.promise()
    }

    /// Observe the outcome without deriving a new promise.
    pub(crate) fn on_settled<F>(&self, f: F)
    where
        F: FnOnce(Settled<T, E>) + 'static,
    {
        self.subscribe(Continuation::Finally {
            on_settled: Box::new(f),
        });
    }
}

/// The settling side of a [`Promise`].
pub struct Deferred<T, E> {
    promise: Promise<T, E>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
        }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Default for Deferred<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Deferred<T, E> {
    pub fn new() -> Self {
        Self {
            promise: Promise::pending(),
        }
    }

    pub fn promise(&self) -> Promise<T, E> {
        self.promise.clone()
    }

    /// Fulfill the promise. Returns `false` if it had already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Settled::Fulfilled(value))
    }

    /// Reject the promise. Returns `false` if it had already settled.
    pub fn reject(&self, error: E) -> bool {
        self.settle(Settled::Rejected(error))
    }

    /// Settle the promise and notify its continuations in registration order.
    pub fn settle(&self, outcome: Settled<T, E>) -> bool {
        let continuations = {
            let mut shared = self.promise.shared.borrow_mut();
            if !matches!(shared.status, Status::Pending) {
                return false;
            }
            shared.status = match &outcome {
                Settled::Fulfilled(v) => Status::Fulfilled(v.clone()),
                Settled::Rejected(e) => Status::Rejected(e.clone()),
            };
            std::mem::take(&mut shared.continuations)
        };

        for continuation in continuations {
            continuation.fire(outcome.clone());
        }
        true
    }

    /// Settle according to a callback's [`Next`], adopting another promise if asked.
    fn follow(&self, next: Next<T, E>) {
        match next {
            Next::Fulfill(value) => {
                self.resolve(value);
            }
            Next::Reject(error) => {
                self.reject(error);
            }
            Next::Adopt(other) => {
                let deferred = self.clone();
                other.on_settled(move |outcome| {
                    deferred.settle(outcome);
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    type P = Promise<i32, String>;

    #[test]
    fn test_settles_exactly_once() {
        let deferred = Deferred::<i32, String>::new();
        assert!(deferred.promise().is_pending());
        assert!(deferred.resolve(1));
        assert!(!deferred.resolve(2));
        assert!(!deferred.reject("late".to_string()));
        assert_eq!(deferred.promise().settlement(), Some(Settled::Fulfilled(1)));
    }

    #[test]
    fn test_continuations_run_in_registration_order() {
        let deferred = Deferred::<i32, String>::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let log = Rc::clone(&log);
            deferred.promise().then(move |v| {
                log.borrow_mut().push(format!("{}:{}", tag, v));
                Next::Fulfill(v)
            });
        }

        assert!(log.borrow().is_empty());
        deferred.resolve(7);
        assert_eq!(*log.borrow(), vec!["first:7", "second:7", "third:7"]);
    }

    #[test]
    fn test_late_registration_runs_immediately() {
        let promise = P::resolved(5);
        let seen = Rc::new(Cell::new(0));
        let seen_in = Rc::clone(&seen);
        promise.then(move |v| {
            seen_in.set(v);
            Next::Fulfill(v)
        });
        assert_eq!(seen.get(), 5);
    }

    #[test]
    fn test_rejection_skips_then_until_catch() {
        let deferred = Deferred::<i32, String>::new();
        let calls = Rc::new(Cell::new(0));

        let c1 = Rc::clone(&calls);
        let c2 = Rc::clone(&calls);
        let recovered = deferred
            .promise()
            .then(move |v| {
                c1.set(c1.get() + 1);
                Next::Fulfill(v + 1)
            })
            .then(move |v| {
                c2.set(c2.get() + 1);
                Next::Fulfill(v + 1)
            })
            .catch(|e| Next::Fulfill(e.len() as i32));

        deferred.reject("boom".to_string());
        assert_eq!(calls.get(), 0);
        assert_eq!(recovered.settlement(), Some(Settled::Fulfilled(4)));
    }

    #[test]
    fn test_fulfillment_skips_catch() {
        let caught = Rc::new(Cell::new(false));
        let caught_in = Rc::clone(&caught);
        let result = P::resolved(3)
            .catch(move |_| {
                caught_in.set(true);
                Next::Fulfill(0)
            })
            .then(|v| Next::Fulfill(v * 10));

        assert!(!caught.get());
        assert_eq!(result.settlement(), Some(Settled::Fulfilled(30)));
    }

    #[test]
    fn test_callback_failure_rejects_derived() {
        let result: P = P::resolved(1).then(|_| Next::Reject("bad input".to_string()));
        assert_eq!(
            result.settlement(),
            Some(Settled::Rejected("bad input".to_string()))
        );
    }

    #[test]
    fn test_result_conversion() {
        let ok: P = P::resolved(2).then(|v| Ok::<_, String>(v + 1).into());
        let err: P = P::resolved(2).then(|_| Err::<i32, _>("nope".to_string()).into());
        assert_eq!(ok.settlement(), Some(Settled::Fulfilled(3)));
        assert_eq!(err.settlement(), Some(Settled::Rejected("nope".to_string())));
    }

    #[test]
    fn test_adopts_returned_promise() {
        let inner = Deferred::<String, String>::new();
        let inner_promise = inner.promise();
        let outer = P::resolved(1).then(move |_| Next::Adopt(inner_promise));

        assert!(outer.is_pending());
        inner.resolve("done".to_string());
        assert_eq!(outer.settlement(), Some(Settled::Fulfilled("done".to_string())));
    }

    #[test]
    fn test_adopts_returned_rejection() {
        let inner = Deferred::<i32, String>::new();
        let inner_promise = inner.promise();
        let outer: P = P::resolved(1).then(move |_| inner_promise.into());

        inner.reject("inner failed".to_string());
        assert_eq!(
            outer.settlement(),
            Some(Settled::Rejected("inner failed".to_string()))
        );
    }

    #[test]
    fn test_finally_sees_both_kinds() {
        let fulfilled = P::resolved(1).finally(|outcome| Next::Fulfill(outcome.is_fulfilled()));
        let rejected =
            P::rejected("x".to_string()).finally(|outcome| Next::Fulfill(outcome.is_fulfilled()));

        assert_eq!(fulfilled.settlement(), Some(Settled::Fulfilled(true)));
        assert_eq!(rejected.settlement(), Some(Settled::Fulfilled(false)));
    }

    #[test]
    fn test_forwarded_settlement_reaches_late_subscribers() {
        let deferred = Deferred::<i32, String>::new();
        let skipped = deferred.promise().then(|v| Next::Fulfill(v + 1));
        deferred.reject("early".to_string());

        // Registered after the forward happened.
        let caught = skipped.catch(|e| Next::Fulfill(e.len() as i32));
        assert_eq!(caught.settlement(), Some(Settled::Fulfilled(5)));
    }

    #[test]
    fn test_reentrant_registration_during_settlement() {
        let deferred = Deferred::<i32, String>::new();
        let promise = deferred.promise();
        let nested = Rc::new(RefCell::new(None));

        let nested_in = Rc::clone(&nested);
        let promise_in = promise.clone();
        promise.then(move |v| {
            *nested_in.borrow_mut() = Some(promise_in.then(|w| Next::Fulfill(w * 2)));
            Next::Fulfill(v)
        });

        deferred.resolve(4);
        let nested = nested.borrow_mut().take().unwrap();
        assert_eq!(nested.settlement(), Some(Settled::Fulfilled(8)));
    }
}
