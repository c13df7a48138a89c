//! # Power-State Coordinator
//!
//! Display-off and display-on transitions.
//!
//! Both transitions are idempotent: a second display-off while suspended
//! and a second display-on while running leave the platform alone. Platform
//! errors are logged and the transition carries on with the remaining cores.

use mako_hal::{CpuId, Platform, Timestamp};

use crate::error::{CpuOp, HotplugError};
use crate::policy::{HotplugPolicy, ResumePolicy};
use crate::state::RuntimeState;
use crate::tunables::TunablesSnapshot;
use crate::{big_cpu, small_cpu, SAMPLED_CPUS};

/// Suspend/resume logic
#[derive(Debug, Clone, Copy)]
pub struct PowerCoordinator {
    policy: HotplugPolicy,
}

impl PowerCoordinator {
    /// Coordinator for a policy profile
    pub const fn new(policy: HotplugPolicy) -> Self {
        Self { policy }
    }

    /// Display going off
    ///
    /// Returns false if already suspended.
    pub fn on_display_off<P>(&self, platform: &P, state: &mut RuntimeState, t: &TunablesSnapshot) -> bool
    where
        P: Platform + ?Sized,
    {
        if state.suspended {
            return false;
        }

        state.reset_counters();

        let floor = self.policy.suspend_floor.max(1);
        let mut online = platform.online_cpus();
        for id in (1..platform.possible_cpus()).rev() {
            if online.count() <= floor {
                break;
            }
            let cpu = CpuId::new(id);
            if !online.contains(cpu) {
                continue;
            }
            match platform.cpu_down(cpu) {
                Ok(()) => online.clear(cpu),
                Err(source) => warn_failure(cpu, CpuOp::Down, source),
            }
        }

        state.saved_max_freq = platform.max_freq(CpuId::BOOT);

        if t.suspend_frequency > 0 {
            for cpu in platform.online_cpus().iter() {
                if let Err(source) = platform.set_max_freq_cap(cpu, Some(t.suspend_frequency)) {
                    warn_failure(cpu, CpuOp::Cap, source);
                }
            }
        }

        for slot in &mut state.slots {
            slot.online = false;
        }
        state.suspended = true;

        log::info!(
            "{}: suspend, {} core(s) online, max freq {} kHz capped to {} kHz",
            crate::MAKO_HOTPLUG,
            platform.num_online(),
            state.saved_max_freq,
            t.suspend_frequency
        );
        true
    }

    /// Display coming on
    ///
    /// Returns false if not suspended. Caps are cleared either way.
    pub fn on_display_on<P>(&self, platform: &P, state: &mut RuntimeState, now: Timestamp) -> bool
    where
        P: Platform + ?Sized,
    {
        let possible = platform.possible_cpus();

        for id in 0..possible {
            let cpu = CpuId::new(id);
            if let Err(source) = platform.set_max_freq_cap(cpu, None) {
                warn_failure(cpu, CpuOp::Cap, source);
            }
        }

        if !state.suspended {
            return false;
        }

        let wanted = match self.policy.resume {
            ResumePolicy::Governed => (SAMPLED_CPUS as u32).min(possible),
            ResumePolicy::AllOnline => possible,
        };
        for id in 1..wanted {
            let cpu = CpuId::new(id);
            if platform.is_online(cpu) {
                continue;
            }
            if let Err(source) = platform.cpu_up(cpu) {
                warn_failure(cpu, CpuOp::Up, source);
            }
        }

        let online = platform.online_cpus();
        for (slot, s) in state.slots.iter_mut().enumerate() {
            s.online = online.contains(big_cpu(slot));
            s.last_online = now;
        }
        state.reset_counters();
        state.sampler.prime(platform);
        state.backoff = 0;
        state.suspended = false;

        log::info!(
            "{}: resume, {} core(s) online, cpu{} max freq {} kHz",
            crate::MAKO_HOTPLUG,
            online.count(),
            small_cpu(0),
            state.saved_max_freq
        );
        true
    }
}

impl Default for PowerCoordinator {
    fn default() -> Self {
        Self::new(HotplugPolicy::default())
    }
}

fn warn_failure(cpu: CpuId, op: CpuOp, source: mako_hal::HalError) {
    log::warn!(
        "{}: {}",
        crate::MAKO_HOTPLUG,
        HotplugError::ActuatorFailure { cpu, op, source }
    );
}
