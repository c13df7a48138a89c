//! # Decision Engine
//!
//! Turns one load sample of a slot into at most one core transition.
//!
//! ```text
//!   load ≥ threshold ──▶ counter += up   ──▶ big offline && (counter ≥ hlc || spike)
//!                                               └──▶ OnlineCore(big)
//!   load < threshold ──▶ counter -= down ──▶ big online && counter < hlc
//!                                               ├─ freq high, not boosted ──▶ refill
//!                                               ├─ dwell not met          ──▶ None
//!                                               ├─ online ≤ floor         ──▶ None
//!                                               └──▶ OfflineCore(big)
//! ```
//!
//! The engine is pure with respect to the platform: it only reads the
//! [`SlotInput`] and mutates the slot's counters. Applying the action is the
//! controller's job.

use mako_hal::{CpuId, FreqKhz, Timestamp};

use crate::hysteresis::Hysteresis;
use crate::policy::HotplugPolicy;
use crate::sampler::LoadPercent;
use crate::state::SlotState;
use crate::tunables::TunablesSnapshot;

/// Outcome of one slot evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Leave things as they are
    None,
    /// Bring a core online
    OnlineCore(CpuId),
    /// Take a core offline
    OfflineCore(CpuId),
}

/// Why a whole tick was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Only one core online: nothing to sample against
    SingleCpuOnline,
    /// `load_threshold` of 100 pins the system to two cores
    DualCoreOnly,
    /// `load_threshold` of 0 asks for every core and they are all up
    AllCoresRequested,
}

/// Everything the engine needs to know about one slot for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInput {
    /// Frequency-scaled load of the slot's small core
    pub load: LoadPercent,
    /// The slot's big core
    pub big_cpu: CpuId,
    /// Is the big core online
    pub big_online: bool,
    /// Cores online system-wide
    pub online_count: u32,
    /// Current frequency of the big core
    pub big_freq: FreqKhz,
    /// An input boost is active
    pub boosted: bool,
    /// Tick time
    pub now: Timestamp,
}

/// Per-slot decision logic
#[derive(Debug, Clone, Copy)]
pub struct DecisionEngine {
    policy: HotplugPolicy,
    hysteresis: Hysteresis,
}

impl DecisionEngine {
    /// Engine for a policy profile
    pub const fn new(policy: HotplugPolicy) -> Self {
        Self {
            hysteresis: Hysteresis::from_policy(&policy),
            policy,
        }
    }

    /// Policy in use
    pub fn policy(&self) -> &HotplugPolicy {
        &self.policy
    }

    /// Counter rules in use
    pub fn hysteresis(&self) -> &Hysteresis {
        &self.hysteresis
    }

    /// Should the whole tick be skipped?
    pub fn early_exit(
        &self,
        online: u32,
        possible: u32,
        t: &TunablesSnapshot,
    ) -> Option<SkipReason> {
        if online <= 1 {
            Some(SkipReason::SingleCpuOnline)
        } else if t.load_threshold == 100 && online == 2 {
            Some(SkipReason::DualCoreOnly)
        } else if t.load_threshold == 0 && online >= possible {
            Some(SkipReason::AllCoresRequested)
        } else {
            None
        }
    }

    /// Evaluate one slot
    pub fn decide(&self, slot: &mut SlotState, input: &SlotInput, t: &TunablesSnapshot) -> Action {
        let spike = self.track_spike(slot, input.load);
        let counter = self.hysteresis.update(slot, input.load, t);

        if input.load >= t.load_threshold {
            if !input.big_online && (counter >= t.high_load_counter || spike) {
                log::debug!(
                    "{}: load {}% counter {}{}, onlining cpu{}",
                    crate::MAKO_HOTPLUG,
                    input.load,
                    counter,
                    if spike { " (spike)" } else { "" },
                    input.big_cpu
                );
                return Action::OnlineCore(input.big_cpu);
            }
            return Action::None;
        }

        if !input.big_online || counter >= t.high_load_counter {
            return Action::None;
        }

        if input.big_freq > t.cpufreq_unplug_limit && !input.boosted {
            let refilled = self.hysteresis.refill(slot, t);
            log::debug!(
                "{}: cpu{} at {} kHz, counter refilled to {}",
                crate::MAKO_HOTPLUG,
                input.big_cpu,
                input.big_freq,
                refilled
            );
            return Action::None;
        }

        if input.now.saturating_duration_since(slot.last_online) < t.min_online_time() {
            return Action::None;
        }

        if input.online_count <= self.policy.offline_floor {
            return Action::None;
        }

        Action::OfflineCore(input.big_cpu)
    }

    /// Update the spike streak, return whether the override fires
    fn track_spike(&self, slot: &mut SlotState, load: LoadPercent) -> bool {
        if self.policy.spike_samples == 0 || load < self.policy.spike_load {
            slot.spike_streak = 0;
            return false;
        }
        slot.spike_streak = slot.spike_streak.saturating_add(1);
        slot.spike_streak >= self.policy.spike_samples
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(HotplugPolicy::default())
    }
}
