//! # Error Handling
//!
//! | Error | Surfaced to | Handling |
//! |-------|-------------|----------|
//! | `ActuatorFailure` | log | cached state unchanged, next tick re-evaluates |
//! | `ResourceUnavailable` | log | tick requeued with backoff |
//! | `TeardownRace` | log (debug) | work item returns without acting |
//! | `ListenerRegistration` | `Controller::start` caller | start aborted |
//! | `AlreadyStarted` | `Controller::start` caller | start refused |
//! | `QueueDead` | `Controller::start` caller | start aborted |
//!
//! Out-of-range tunable writes are not errors; they are clamped.

use core::fmt;

use mako_hal::{CpuId, HalError};

/// Direction of a core transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuOp {
    /// cpu_up
    Up,
    /// cpu_down
    Down,
    /// Frequency cap change
    Cap,
    /// Input boost frequency request
    Boost,
}

impl fmt::Display for CpuOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
            Self::Cap => f.write_str("cap"),
            Self::Boost => f.write_str("boost"),
        }
    }
}

/// Controller errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotplugError {
    /// A core transition or cap change was refused by the platform
    ActuatorFailure {
        /// CPU acted upon
        cpu: CpuId,
        /// What was attempted
        op: CpuOp,
        /// Platform error
        source: HalError,
    },
    /// Load accounting for a CPU is not available yet
    ResourceUnavailable(CpuId),
    /// Work fired after teardown began
    TeardownRace,
    /// The display/input listener could not be registered
    ListenerRegistration(HalError),
    /// `start` called twice
    AlreadyStarted,
    /// The work queue was already destroyed
    QueueDead,
}

impl fmt::Display for HotplugError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActuatorFailure { cpu, op, source } => {
                write!(f, "cpu{} {} failed: {}", cpu, op, source)
            },
            Self::ResourceUnavailable(cpu) => write!(f, "load source for cpu{} not ready", cpu),
            Self::TeardownRace => f.write_str("work fired after shutdown"),
            Self::ListenerRegistration(e) => write!(f, "cannot register event listener: {}", e),
            Self::AlreadyStarted => f.write_str("controller already started"),
            Self::QueueDead => f.write_str("work queue destroyed"),
        }
    }
}

/// Result type for controller operations
pub type HotplugResult<T> = Result<T, HotplugError>;
