//! Platform event sources: display state and user input.
//!
//! Listeners are invoked on the notifier's own context and must not block.
//! A listener typically queues work and returns.

use alloc::string::String;
use alloc::sync::Arc;

use crate::HalResult;

/// Display panel transitions (lcd_notify equivalent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayEvent {
    /// The panel started powering on
    OnStart,
    /// The panel started powering off
    OffStart,
}

/// Events delivered by an [`EventSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformEvent {
    /// Display state change
    Display(DisplayEvent),
    /// Touch, touchpad or key input
    Input,
}

/// Receiver of platform events
pub trait EventListener: Send + Sync {
    /// Handle an event
    fn on_event(&self, event: PlatformEvent);
}

/// Subscription handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

/// Publisher of platform events
pub trait EventSource: Send + Sync {
    /// Register a listener
    fn subscribe(&self, name: String, listener: Arc<dyn EventListener>)
        -> HalResult<SubscriptionId>;

    /// Remove a listener, returns false if it was not registered
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
