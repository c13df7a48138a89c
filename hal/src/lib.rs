//! # Mako Platform Abstraction Layer
//!
//! The hotplug controller never touches hardware directly. Everything it
//! consumes from the platform goes through the traits in this crate:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      HOTPLUG CONTROLLER                          │
//! └───────┬───────────────┬───────────────┬───────────────┬──────────┘
//!         │               │               │               │
//!         ▼               ▼               ▼               ▼
//!   ┌───────────┐   ┌───────────┐   ┌───────────┐   ┌─────────────┐
//!   │CpuHotplug │   │ CpuFreq   │   │ CpuStat   │   │ EventSource │
//!   │ up/down   │   │ cur/max   │   │ wall/idle │   │ display     │
//!   │ online set│   │ max cap   │   │ iowait    │   │ input       │
//!   └───────────┘   └───────────┘   └───────────┘   └─────────────┘
//!    (actuator)      (actuator)       (sensor)         (sensor)
//! ```
//!
//! The first three plus [`Clock`] are bundled into [`Platform`], which is
//! what the controller is generic over. [`EventSource`] is handed to the
//! controller separately at start-up, because on a real device the display
//! notifier chain outlives any single consumer.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

pub mod cpu;
pub mod cpufreq;
pub mod event;
pub mod time;

pub use cpu::{CpuHotplug, CpuId, CpuMask, CpuMaskIter, MAX_CPUS};
pub use cpufreq::{CpuFreq, CpuStat, CpuTimes, FreqKhz};
pub use event::{DisplayEvent, EventListener, EventSource, PlatformEvent, SubscriptionId};
pub use time::{Clock, Duration, Timestamp};

/// Errors reported by platform actuators and sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// The CPU id is outside the possible set
    InvalidCpu(CpuId),
    /// The platform refused the transition (cpu_up/cpu_down returned an error)
    TransitionFailed(CpuId),
    /// The CPU is busy with another transition
    Busy(CpuId),
    /// The data source is not initialised yet
    NotReady,
    /// The operation is not supported by this platform
    NotSupported,
    /// Listener registration failed
    RegistrationFailed,
}

impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidCpu(cpu) => write!(f, "invalid cpu {}", cpu),
            Self::TransitionFailed(cpu) => write!(f, "transition failed on cpu {}", cpu),
            Self::Busy(cpu) => write!(f, "cpu {} busy", cpu),
            Self::NotReady => write!(f, "source not ready"),
            Self::NotSupported => write!(f, "operation not supported"),
            Self::RegistrationFailed => write!(f, "listener registration failed"),
        }
    }
}

/// Result type for platform operations
pub type HalResult<T> = Result<T, HalError>;

/// Everything the periodic controller needs from the platform
///
/// Implemented automatically for any type providing all four facets.
pub trait Platform: CpuHotplug + CpuFreq + CpuStat + Clock + Send + Sync + 'static {}

impl<T> Platform for T where T: CpuHotplug + CpuFreq + CpuStat + Clock + Send + Sync + 'static {}
