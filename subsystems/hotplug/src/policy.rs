//! Structural policy: the parts of the algorithm that are not user tunables.
//!
//! The driver went through several revisions that disagreed on step sizes,
//! floors and resume behaviour. Each revision is a profile here rather than
//! a set of competing special cases in the engine.

/// What happens to the big cores when the display comes back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePolicy {
    /// Only the small cores come back; the periodic tick decides the rest
    Governed,
    /// Every possible core comes back online
    AllOnline,
}

/// Fixed parameters of the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotplugPolicy {
    /// Counter increment on a busy sample
    pub up_step: u32,
    /// Counter decrement on an idle sample
    pub down_step: u32,
    /// Extra samples a core is kept online when its frequency is still high
    pub refill_margin: u32,
    /// Load at or above which a sample counts towards the spike override
    pub spike_load: u32,
    /// Consecutive spike samples that bypass the counter; 0 disables
    pub spike_samples: u32,
    /// The periodic tick never offlines below this many online cores
    pub offline_floor: u32,
    /// Cores left online while the display is off
    pub suspend_floor: u32,
    /// Resume behaviour
    pub resume: ResumePolicy,
}

impl HotplugPolicy {
    /// Current driver behaviour
    pub const fn mako() -> Self {
        Self {
            up_step: 2,
            down_step: 1,
            refill_margin: 5,
            spike_load: 90,
            spike_samples: 2,
            offline_floor: 2,
            suspend_floor: 1,
            resume: ResumePolicy::Governed,
        }
    }

    /// First-generation behaviour: symmetric steps, dual-core suspend and
    /// everything online on resume
    pub const fn legacy() -> Self {
        Self {
            up_step: 1,
            down_step: 1,
            refill_margin: 5,
            spike_load: 100,
            spike_samples: 0,
            offline_floor: 2,
            suspend_floor: 2,
            resume: ResumePolicy::AllOnline,
        }
    }
}

impl Default for HotplugPolicy {
    fn default() -> Self {
        Self::mako()
    }
}
