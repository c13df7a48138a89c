//! # Event Bus
//!
//! A publish-subscribe bus for platform events.
//!
//! Every subscriber sees every event, in subscription order. Dispatch does
//! not block: listeners are expected to defer real work.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use mako_hal::{EventListener, EventSource, HalError, HalResult, PlatformEvent, SubscriptionId};
use spin::RwLock;

use super::{IpcError, IpcResult};

// =============================================================================
// Subscriber
// =============================================================================

fn next_subscription_id() -> SubscriptionId {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    SubscriptionId(COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Event subscription
pub struct EventSubscription {
    id: SubscriptionId,
    /// Subscriber name (for debugging)
    name: String,
    listener: Arc<dyn EventListener>,
}

impl EventSubscription {
    /// Create a new subscription
    pub fn new(name: impl Into<String>, listener: Arc<dyn EventListener>) -> Self {
        Self {
            id: next_subscription_id(),
            name: name.into(),
            listener,
        }
    }

    /// Get subscription ID
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Subscriber name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl core::fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

// =============================================================================
// Event Bus
// =============================================================================

/// Platform event bus
pub struct EventBus {
    /// All subscriptions, in subscription order
    subscriptions: RwLock<Vec<EventSubscription>>,
    /// Accepting subscribers?
    open: AtomicBool,
}

impl EventBus {
    /// Create a new event bus
    pub const fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            open: AtomicBool::new(true),
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self, subscription: EventSubscription) -> IpcResult<SubscriptionId> {
        if !self.open.load(Ordering::Acquire) {
            return Err(IpcError::Closed);
        }

        let id = subscription.id;
        log::debug!("EventBus: New subscription {:?} ({})", id, subscription.name);
        self.subscriptions.write().push(subscription);
        Ok(id)
    }

    /// Unsubscribe
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.write();
        if let Some(pos) = subs.iter().position(|s| s.id == id) {
            subs.remove(pos);
            log::debug!("EventBus: Removed subscription {:?}", id);
            true
        } else {
            false
        }
    }

    /// Publish an event to every subscriber, return how many received it
    pub fn publish(&self, event: PlatformEvent) -> usize {
        // Listeners are cloned out so a listener may unsubscribe itself
        let targets: Vec<Arc<dyn EventListener>> = self
            .subscriptions
            .read()
            .iter()
            .map(|s| s.listener.clone())
            .collect();

        for listener in &targets {
            listener.on_event(event);
        }
        targets.len()
    }

    /// Get the number of subscriptions
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Refuse new subscribers
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for EventBus {
    fn subscribe(
        &self,
        name: String,
        listener: Arc<dyn EventListener>,
    ) -> HalResult<SubscriptionId> {
        EventBus::subscribe(self, EventSubscription::new(name, listener)).map_err(|e| {
            log::warn!("EventBus: subscription refused: {}", e);
            HalError::RegistrationFailed
        })
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        EventBus::unsubscribe(self, id)
    }
}
