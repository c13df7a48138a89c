//! # Input Boost
//!
//! A touch brings cores online before the load shows up in the samples.
//!
//! ```text
//!   input ──▶ on_input(now) ──(≥ 100 ms since last)──▶ boost work
//!                  │                                      │
//!                  └── last_input = now                   ├── online up to
//!                                                         │   cores_on_touch
//!                                                         └── raise online cores
//!                                                             to input_boost_freq
//!   is_boosted(now) = now - last_input < 1 s
//! ```

use core::sync::atomic::{AtomicU64, Ordering};

use mako_hal::{CpuId, Duration, FreqKhz, Platform, Timestamp};

use crate::error::{CpuOp, HotplugError};
use crate::slot_of;
use crate::state::RuntimeState;
use crate::tunables::TunablesSnapshot;

/// Minimum spacing between two accepted input events
pub const INPUT_BOOST_INTERVAL: Duration = Duration::from_millis(100);

/// How long an accepted input event keeps the system boosted
pub const INPUT_BOOST_DURATION: Duration = Duration::from_secs(1);

const NEVER: u64 = u64::MAX;

/// Rate limiter and boost window
#[derive(Debug)]
pub struct InputBoost {
    last_input_ns: AtomicU64,
}

impl InputBoost {
    /// No input seen yet
    pub const fn new() -> Self {
        Self {
            last_input_ns: AtomicU64::new(NEVER),
        }
    }

    /// Record an input event; false if it falls inside the rate limit
    pub fn on_input(&self, now: Timestamp) -> bool {
        let now_ns = now.as_nanos();
        let mut last = self.last_input_ns.load(Ordering::Acquire);
        loop {
            if last != NEVER
                && now.saturating_duration_since(Timestamp::from_nanos(last)) < INPUT_BOOST_INTERVAL
            {
                return false;
            }
            match self.last_input_ns.compare_exchange_weak(
                last,
                now_ns,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(current) => last = current,
            }
        }
    }

    /// Last accepted input
    pub fn last_input(&self) -> Option<Timestamp> {
        match self.last_input_ns.load(Ordering::Acquire) {
            NEVER => None,
            ns => Some(Timestamp::from_nanos(ns)),
        }
    }

    /// Is the boost window open?
    pub fn is_boosted(&self, now: Timestamp) -> bool {
        self.last_input()
            .map(|last| now.saturating_duration_since(last) < INPUT_BOOST_DURATION)
            .unwrap_or(false)
    }

    /// Forget the last input
    pub fn reset(&self) {
        self.last_input_ns.store(NEVER, Ordering::Release);
    }
}

impl Default for InputBoost {
    fn default() -> Self {
        Self::new()
    }
}

/// Bring cores online, lowest id first, until `cores_on_touch` are up
///
/// Returns the number of cores onlined.
pub fn apply_touch_boost<P>(
    platform: &P,
    state: &mut RuntimeState,
    t: &TunablesSnapshot,
    now: Timestamp,
) -> u32
where
    P: Platform + ?Sized,
{
    let possible = platform.possible_cpus();
    let target = t.cores_on_touch.min(possible);
    let mut online = platform.online_cpus();
    let mut onlined = 0;

    for id in 0..possible {
        if online.count() >= target {
            break;
        }
        let cpu = CpuId::new(id);
        if online.contains(cpu) {
            continue;
        }
        if let Err(source) = platform.cpu_up(cpu) {
            log::warn!(
                "{}: {}",
                crate::MAKO_HOTPLUG,
                HotplugError::ActuatorFailure {
                    cpu,
                    op: CpuOp::Up,
                    source
                }
            );
            continue;
        }
        online.set(cpu);
        onlined += 1;

        if let Some(slot) = slot_of(cpu) {
            let s = &mut state.slots[slot];
            s.online = true;
            s.last_online = now;
            s.counter = s.counter.max(t.high_load_counter).min(t.max_load_counter);
        }
    }

    if onlined > 0 {
        log::debug!(
            "{}: input boost, {} core(s) onlined",
            crate::MAKO_HOTPLUG,
            onlined
        );
    }
    onlined
}

/// Request `input_boost_freq` on every online core running below it
///
/// Returns the number of cores asked to speed up. A zero frequency disables
/// the step.
pub fn boost_frequency<P>(platform: &P, t: &TunablesSnapshot) -> u32
where
    P: Platform + ?Sized,
{
    let target: FreqKhz = t.input_boost_freq;
    if target == 0 {
        return 0;
    }

    let mut raised = 0;
    for cpu in platform.online_cpus().iter() {
        if platform.cur_freq(cpu) >= target {
            continue;
        }
        match platform.set_target_freq(cpu, target) {
            Ok(()) => raised += 1,
            Err(source) => log::warn!(
                "{}: {}",
                crate::MAKO_HOTPLUG,
                HotplugError::ActuatorFailure {
                    cpu,
                    op: CpuOp::Boost,
                    source
                }
            ),
        }
    }
    raised
}
