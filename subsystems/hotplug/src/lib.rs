//! # Mako Hotplug
//!
//! Load-based CPU core-count controller for the MSM8960 ("mako") SoC.
//!
//! ## Core layout
//!
//! ```text
//!   slot 0                 slot 1
//!  ┌────────┐  drives     ┌────────┐  drives
//!  │ cpu0   │ ─────────▶  │ cpu1   │ ─────────▶
//!  │ small  │   cpu2      │ small  │   cpu3
//!  └────────┘   (big)     └────────┘   (big)
//! ```
//!
//! The small cores are always on while the display is on and are the only
//! cores sampled. Each slot pairs one small core with one switchable big
//! core; the slot's hysteresis counter decides when the big core comes
//! online or goes offline.
//!
//! ## Control loop
//!
//! ```text
//!   ┌──────────────────────── WorkQueue ("mako_hotplug") ───────────────────────┐
//!   │                                                                          │
//!   │  decide ──▶ Sampler ──▶ Hysteresis ──▶ DecisionEngine ──▶ cpu_up/down    │
//!   │    ▲                                                          │          │
//!   │    └──────────────── requeue after timer × 100 ms ◀───────────┘          │
//!   │                                                                          │
//!   │  suspend ──▶ PowerCoordinator::on_display_off   (cancels decide)         │
//!   │  resume  ──▶ PowerCoordinator::on_display_on    (requeues decide)        │
//!   │  boost   ──▶ touch boost, up to cores_on_touch, then input_boost_freq    │
//!   └──────────────────────────────────────────────────────────────────────────┘
//!          ▲                      ▲
//!          │ queue                │ queue
//!   display listener         input listener        (EventSource)
//! ```
//!
//! Everything mutating runtime state runs on the controller's single-threaded
//! work queue and under the runtime-state lock. Tunables are atomics and are
//! read once per tick.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

pub mod boost;
pub mod control;
pub mod controller;
pub mod coordinator;
pub mod decision;
pub mod error;
pub mod hysteresis;
pub mod policy;
pub mod sampler;
pub mod state;
pub mod tunables;

#[cfg(test)]
mod sim;

use mako_hal::{CpuId, MAX_CPUS};
use static_assertions::const_assert;

pub use boost::{InputBoost, INPUT_BOOST_DURATION, INPUT_BOOST_INTERVAL};
pub use control::{AttrMode, Attribute, ControlError, HotplugControl, CONTROL_VERSION};
pub use controller::{Controller, ControllerStats, ControllerStatus, STARTUP_DELAY};
pub use coordinator::PowerCoordinator;
pub use decision::{Action, DecisionEngine, SkipReason, SlotInput};
pub use error::{CpuOp, HotplugError, HotplugResult};
pub use hysteresis::Hysteresis;
pub use policy::{HotplugPolicy, ResumePolicy};
pub use sampler::{LoadPercent, LoadSampler};
pub use state::{RuntimeState, SlotState};
pub use tunables::{Tunable, Tunables, TunablesSnapshot};

/// Driver name used in log messages
pub const MAKO_HOTPLUG: &str = "mako_hotplug";

/// Number of sampled small cores, and of big-core slots
pub const SAMPLED_CPUS: usize = 2;

const_assert!(SAMPLED_CPUS * 2 <= MAX_CPUS);

/// Small (sampled) core of a slot
pub const fn small_cpu(slot: usize) -> CpuId {
    CpuId::new(slot as u32)
}

/// Big (switchable) core of a slot
pub const fn big_cpu(slot: usize) -> CpuId {
    CpuId::new((slot + SAMPLED_CPUS) as u32)
}

/// Slot a big core belongs to
pub fn slot_of(cpu: CpuId) -> Option<usize> {
    let idx = cpu.index();
    (SAMPLED_CPUS..SAMPLED_CPUS * 2)
        .contains(&idx)
        .then(|| idx - SAMPLED_CPUS)
}
