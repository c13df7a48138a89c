//! # Work Queue
//!
//! A single-threaded delayed work executor.
//!
//! ```text
//!   queue_delayed(h, now, d)        run_pending(now)
//!          │                              │
//!          ▼                              ▼
//!   ┌──────────────┐  due items   ┌───────────────┐   one at a time
//!   │   pending    │ ───────────▶ │  exec lock    │ ──────────────▶ Work::run
//!   │ (deadline,   │              │ (single-flight│
//!   │   seq) order │              │   executor)   │
//!   └──────────────┘              └───────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - A work item is pending at most once; queuing it again is a no-op.
//! - Items never overlap, whichever thread drives [`WorkQueue::run_pending`].
//! - [`WorkQueue::cancel_sync`] and [`WorkQueue::destroy`] return only once
//!   no item is in flight.
//! - After [`WorkQueue::destroy`] nothing runs and nothing can be queued.
//!
//! The queue owns no thread. The platform's worker loop calls
//! `run_pending(now)` and sleeps until [`WorkQueue::next_deadline`].
//!
//! `cancel_sync` and `destroy` wait on the execution lock, so calling them
//! from a work item running on the same queue deadlocks. Work items use
//! [`WorkQueue::cancel`] instead.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use mako_hal::{Duration, Timestamp};
use spin::{Mutex, RwLock};

/// Work queue errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkQueueError {
    /// The queue was destroyed
    Dead,
}

impl core::fmt::Display for WorkQueueError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Dead => write!(f, "work queue destroyed"),
        }
    }
}

/// Result type for work queue operations
pub type WorkQueueResult<T> = Result<T, WorkQueueError>;

/// A unit of deferred work
pub trait Work: Send + Sync {
    /// Execute the work; `now` is the time the executor picked it up
    fn run(&self, now: Timestamp);
}

/// Handle to a registered work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkHandle {
    id: u64,
    name: &'static str,
}

impl WorkHandle {
    /// Name given at registration
    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    id: u64,
    deadline: Timestamp,
    seq: u64,
}

/// Single-threaded delayed work queue
pub struct WorkQueue {
    name: &'static str,
    works: RwLock<BTreeMap<u64, Arc<dyn Work>>>,
    /// Sorted by (deadline, seq)
    pending: Mutex<Vec<Pending>>,
    exec: Mutex<()>,
    /// Id of the in-flight item, 0 when idle
    running: AtomicU64,
    alive: AtomicBool,
    next_id: AtomicU64,
    next_seq: AtomicU64,
    executed: AtomicU64,
}

impl WorkQueue {
    /// Create a queue
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            works: RwLock::new(BTreeMap::new()),
            pending: Mutex::new(Vec::new()),
            exec: Mutex::new(()),
            running: AtomicU64::new(0),
            alive: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
            next_seq: AtomicU64::new(0),
            executed: AtomicU64::new(0),
        }
    }

    /// Queue name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register a work item (INIT_WORK)
    pub fn register(&self, name: &'static str, work: Arc<dyn Work>) -> WorkQueueResult<WorkHandle> {
        if !self.is_alive() {
            return Err(WorkQueueError::Dead);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.works.write().insert(id, work);
        log::debug!("WorkQueue({}): registered '{}'", self.name, name);
        Ok(WorkHandle { id, name })
    }

    /// Queue for immediate execution
    pub fn queue(&self, handle: WorkHandle, now: Timestamp) -> bool {
        self.queue_delayed(handle, now, Duration::ZERO)
    }

    /// Queue for execution `delay` after `now`
    ///
    /// Returns false if the item was already pending, unknown, or the queue
    /// is dead.
    pub fn queue_delayed(&self, handle: WorkHandle, now: Timestamp, delay: Duration) -> bool {
        if !self.is_alive() || !self.works.read().contains_key(&handle.id) {
            return false;
        }

        let mut pending = self.pending.lock();
        if pending.iter().any(|p| p.id == handle.id) {
            return false;
        }
        Self::insert_sorted(
            &mut pending,
            Pending {
                id: handle.id,
                deadline: now.saturating_add(delay),
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            },
        );
        true
    }

    /// Queue, or move the deadline of an already pending item
    pub fn mod_delayed(&self, handle: WorkHandle, now: Timestamp, delay: Duration) -> bool {
        self.cancel(handle);
        self.queue_delayed(handle, now, delay)
    }

    fn insert_sorted(pending: &mut Vec<Pending>, item: Pending) {
        let pos = pending
            .iter()
            .position(|p| (p.deadline, p.seq) > (item.deadline, item.seq))
            .unwrap_or(pending.len());
        pending.insert(pos, item);
    }

    /// Is the item waiting to run?
    pub fn is_pending(&self, handle: WorkHandle) -> bool {
        self.pending.lock().iter().any(|p| p.id == handle.id)
    }

    /// Is the item executing right now?
    pub fn is_running(&self, handle: WorkHandle) -> bool {
        self.running.load(Ordering::Acquire) == handle.id
    }

    /// Deadline of a pending item
    pub fn deadline(&self, handle: WorkHandle) -> Option<Timestamp> {
        self.pending
            .lock()
            .iter()
            .find(|p| p.id == handle.id)
            .map(|p| p.deadline)
    }

    /// Earliest deadline of all pending items
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.pending.lock().first().map(|p| p.deadline)
    }

    /// Remove a pending item without waiting for an in-flight run
    pub fn cancel(&self, handle: WorkHandle) -> bool {
        let mut pending = self.pending.lock();
        match pending.iter().position(|p| p.id == handle.id) {
            Some(pos) => {
                pending.remove(pos);
                true
            },
            None => false,
        }
    }

    /// Remove a pending item and wait until no item is in flight
    pub fn cancel_sync(&self, handle: WorkHandle) -> bool {
        let was_pending = self.cancel(handle);
        drop(self.exec.lock());
        was_pending
    }

    /// Run every item due at `now`, one at a time
    ///
    /// Items queued by a running item with a deadline at or before `now`
    /// wait for the next call, so a self-requeuing item cannot starve the
    /// caller.
    pub fn run_pending(&self, now: Timestamp) -> usize {
        let limit = self.next_seq.load(Ordering::Relaxed);
        let mut ran = 0;

        loop {
            let _exec = self.exec.lock();
            if !self.is_alive() {
                break;
            }

            let next = {
                let mut pending = self.pending.lock();
                let pos = pending
                    .iter()
                    .take_while(|p| p.deadline <= now)
                    .position(|p| p.seq < limit);
                pos.map(|pos| pending.remove(pos))
            };
            let Some(item) = next else {
                break;
            };

            let work = self.works.read().get(&item.id).cloned();
            if let Some(work) = work {
                self.running.store(item.id, Ordering::Release);
                work.run(now);
                self.running.store(0, Ordering::Release);
                self.executed.fetch_add(1, Ordering::Relaxed);
                ran += 1;
            }
        }

        ran
    }

    /// Total items executed
    pub fn executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }

    /// Is the queue accepting work?
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Cancel everything, wait for the in-flight item, release all work
    /// (destroy_workqueue)
    pub fn destroy(&self) {
        if !self.alive.swap(false, Ordering::AcqRel) {
            return;
        }

        let dropped = {
            let mut pending = self.pending.lock();
            let n = pending.len();
            pending.clear();
            n
        };
        drop(self.exec.lock());
        self.works.write().clear();

        log::debug!(
            "WorkQueue({}): destroyed, {} pending item(s) dropped",
            self.name,
            dropped
        );
    }
}

impl core::fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("name", &self.name)
            .field("pending", &self.pending.lock().len())
            .field("alive", &self.is_alive())
            .finish()
    }
}
