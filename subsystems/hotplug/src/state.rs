//! Runtime state owned by the control loop.

use mako_hal::{FreqKhz, Timestamp};

use crate::sampler::LoadSampler;
use crate::SAMPLED_CPUS;

/// Per big-core slot state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotState {
    /// Hysteresis counter, within `0..=max_load_counter`
    pub counter: u32,
    /// When the big core last came online
    pub last_online: Timestamp,
    /// Cached view of the big core's online state
    pub online: bool,
    /// Consecutive samples at or above the spike load
    pub spike_streak: u32,
}

impl SlotState {
    /// Fresh slot, dwell clock starting at `now`
    pub fn new(now: Timestamp) -> Self {
        Self {
            last_online: now,
            ..Self::default()
        }
    }
}

/// Controller runtime state
#[derive(Debug)]
pub struct RuntimeState {
    /// Display is off, periodic sampling paused
    pub suspended: bool,
    /// Max frequency of the boot CPU captured at suspend
    pub saved_max_freq: FreqKhz,
    /// Big-core slots
    pub slots: [SlotState; SAMPLED_CPUS],
    /// Previous-sample history
    pub sampler: LoadSampler,
    /// Consecutive ticks that could not sample
    pub backoff: u32,
}

impl RuntimeState {
    /// State at controller creation
    pub fn new(now: Timestamp) -> Self {
        Self {
            suspended: false,
            saved_max_freq: 0,
            slots: [SlotState::new(now); SAMPLED_CPUS],
            sampler: LoadSampler::new(),
            backoff: 0,
        }
    }

    /// Zero every hysteresis counter and spike streak
    pub fn reset_counters(&mut self) {
        for slot in &mut self.slots {
            slot.counter = 0;
            slot.spike_streak = 0;
        }
    }

    /// Hysteresis counters, by slot
    pub fn counters(&self) -> [u32; SAMPLED_CPUS] {
        self.slots.map(|s| s.counter)
    }
}
