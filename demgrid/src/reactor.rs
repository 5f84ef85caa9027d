//! Completion reactor for blocking I/O.
//!
//! Promises are single-threaded, so a byte fetch that blocks (an HTTP request,
//! a slow network share) runs on a worker thread and reports back over a
//! channel. The reactor keeps the deferred for every job in flight and settles
//! it on the pipeline thread when [`Reactor::turn`] receives the completion.
//! At most `max_workers` jobs run at once; later submissions wait in a queue
//! and start as earlier ones complete.
//!
//! ```
//! use demgrid::Reactor;
//!
//! let reactor = Reactor::new();
//! let bytes = reactor.submit("N00E000.hgt", || Ok(vec![0u8; 8]));
//! assert!(bytes.is_pending());
//!
//! let outcome = reactor.run_until_settled(&bytes).unwrap();
//! assert_eq!(outcome.ok().map(|b| b.len()), Some(8));
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tracing::debug;

use crate::error::{DemError, Result};
use crate::promise::{Deferred, Promise, Settled};
use crate::source::TileBytes;

/// Worker threads a reactor runs at once unless configured otherwise.
pub const DEFAULT_MAX_WORKERS: usize = 8;

type Completion = (u64, Result<Vec<u8>>);
type Job = Box<dyn FnOnce() -> Result<Vec<u8>> + Send + 'static>;

struct QueuedJob {
    id: u64,
    address: String,
    job: Job,
}

/// Multiplexes worker-thread completions onto the thread that owns the promises.
pub struct Reactor {
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
    in_flight: RefCell<HashMap<u64, Deferred<TileBytes, DemError>>>,
    queued: RefCell<VecDeque<QueuedJob>>,
    running: Cell<usize>,
    max_workers: usize,
    next_id: Cell<u64>,
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Reactor {
    pub fn new() -> Self {
        Self::with_max_workers(DEFAULT_MAX_WORKERS)
    }

    /// Reactor running at most `max_workers` jobs at once (at least one).
    pub fn with_max_workers(max_workers: usize) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            in_flight: RefCell::new(HashMap::new()),
            queued: RefCell::new(VecDeque::new()),
            running: Cell::new(0),
            max_workers: max_workers.max(1),
            next_id: Cell::new(0),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Run `job` on a worker thread and return a promise of its bytes.
    ///
    /// The promise settles during a later [`turn`](Self::turn). A panicking job
    /// rejects with [`DemError::TileFetchFailed`] for `address`. When all
    /// workers are busy the job is queued.
    pub fn submit<F>(&self, address: &str, job: F) -> Promise<TileBytes, DemError>
    where
        F: FnOnce() -> Result<Vec<u8>> + Send + 'static,
    {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let deferred = Deferred::new();
        let promise = deferred.promise();
        self.in_flight.borrow_mut().insert(id, deferred);

        let queued = QueuedJob {
            id,
            address: address.to_string(),
            job: Box::new(job),
        };
        if self.running.get() < self.max_workers {
            self.spawn(queued);
        } else {
            debug!(address, queued = self.queued.borrow().len() + 1, "All workers busy");
            self.queued.borrow_mut().push_back(queued);
        }

        promise
    }

    fn spawn(&self, queued: QueuedJob) {
        self.running.set(self.running.get() + 1);

        let sender = self.sender.clone();
        let QueuedJob { id, address, job } = queued;
        thread::spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(job))
                .unwrap_or_else(|_| Err(DemError::fetch_failed(address, "fetch worker panicked")));
            // The reactor may have been dropped; nobody is waiting then.
            let _ = sender.send((id, result));
        });
    }

    /// Start queued jobs while workers are free.
    fn start_queued(&self) {
        while self.running.get() < self.max_workers {
            let next = self.queued.borrow_mut().pop_front();
            match next {
                Some(queued) => self.spawn(queued),
                None => break,
            }
        }
    }

    /// Number of jobs, running or queued, whose completion has not been
    /// processed yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.borrow().len()
    }

    /// Block for one completion and settle its promise.
    ///
    /// Returns `false` without blocking when nothing is in flight.
    pub fn turn(&self) -> bool {
        if self.in_flight() == 0 {
            return false;
        }

        // The reactor holds a sender itself, so the channel never disconnects.
        let Ok((id, result)) = self.receiver.recv() else {
            return false;
        };

        self.running.set(self.running.get().saturating_sub(1));
        self.start_queued();

        let deferred = self.in_flight.borrow_mut().remove(&id);
        if let Some(deferred) = deferred {
            deferred.settle(result.map(TileBytes::from).into());
        }
        true
    }

    /// Drive completions until `promise` settles.
    ///
    /// Returns `None` if the promise is still pending with nothing left in
    /// flight, meaning it can never settle through this reactor.
    pub fn run_until_settled<T, E>(&self, promise: &Promise<T, E>) -> Option<Settled<T, E>>
    where
        T: Clone + 'static,
        E: Clone + 'static,
    {
        loop {
            if let Some(outcome) = promise.settlement() {
                return Some(outcome);
            }
            if !self.turn() {
                return None;
            }
        }
    }
}
