//! # Hysteresis Accumulator
//!
//! One bounded counter per slot. Busy samples push it up by `up_step`, idle
//! samples pull it down by `down_step`. With the default +2/-1 the counter
//! reacts to sustained load twice as fast as it forgets it, so a load that
//! hovers around the threshold does not bounce the big core.
//!
//! The counter always stays within `0..=max_load_counter`, also when
//! `max_load_counter` is lowered underneath it.

use crate::policy::HotplugPolicy;
use crate::sampler::LoadPercent;
use crate::state::SlotState;
use crate::tunables::TunablesSnapshot;

/// Counter update rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hysteresis {
    up_step: u32,
    down_step: u32,
    refill_margin: u32,
}

impl Hysteresis {
    /// Rules from a policy profile
    pub const fn from_policy(policy: &HotplugPolicy) -> Self {
        Self {
            up_step: policy.up_step,
            down_step: policy.down_step,
            refill_margin: policy.refill_margin,
        }
    }

    /// Feed one sample, return the new counter
    pub fn update(&self, slot: &mut SlotState, load: LoadPercent, t: &TunablesSnapshot) -> u32 {
        let counter = if load >= t.load_threshold {
            slot.counter.saturating_add(self.up_step)
        } else {
            slot.counter.saturating_sub(self.down_step)
        };
        slot.counter = counter.min(t.max_load_counter);
        slot.counter
    }

    /// Push the counter back above the online threshold so the core stays
    /// up for `refill_margin` more idle samples
    pub fn refill(&self, slot: &mut SlotState, t: &TunablesSnapshot) -> u32 {
        slot.counter = t
            .high_load_counter
            .saturating_add(self.refill_margin)
            .min(t.max_load_counter);
        slot.counter
    }

    /// Zero the counter
    pub fn reset(slot: &mut SlotState) {
        slot.counter = 0;
        slot.spike_streak = 0;
    }
}

impl Default for Hysteresis {
    fn default() -> Self {
        Self::from_policy(&HotplugPolicy::default())
    }
}
