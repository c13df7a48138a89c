//! # Mako Kernel Services
//!
//! The two execution primitives the hotplug controller is built on:
//!
//! - **Work queue**: a single-threaded, deadline-ordered delayed work
//!   executor with synchronous cancellation (`alloc_workqueue(.., 1)` +
//!   `queue_delayed_work_on` + `cancel_delayed_work_sync`).
//! - **Event bus**: a publish/subscribe platform event bus (display and input
//!   notifier chains).
//!
//! Both are `no_std` + `alloc` and lock with `spin`, so they work in an
//! interrupt-free kernel context and on a host alike.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

pub mod ipc;
pub mod workqueue;

pub use ipc::{EventBus, EventSubscription};
pub use workqueue::{Work, WorkHandle, WorkQueue, WorkQueueError, WorkQueueResult};
