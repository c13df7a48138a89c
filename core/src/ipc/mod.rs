//! # Platform Event Delivery
//!
//! The display and input notifier chains are modelled as one event bus.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mako_core::ipc::{EventBus, EventSubscription};
//! use mako_hal::{DisplayEvent, PlatformEvent};
//!
//! let bus = EventBus::new();
//! bus.subscribe(EventSubscription::new("hotplug", listener));
//!
//! bus.publish(PlatformEvent::Display(DisplayEvent::OffStart));
//! ```

pub mod event_bus;

pub use event_bus::{EventBus, EventSubscription};

/// IPC error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpcError {
    /// The bus is shut down
    Closed,
}

impl core::fmt::Display for IpcError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Closed => write!(f, "Event bus is closed"),
        }
    }
}

/// Result type for IPC operations
pub type IpcResult<T> = Result<T, IpcError>;
