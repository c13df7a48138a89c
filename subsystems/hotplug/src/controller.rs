//! # Controller
//!
//! Owns the tunables, the runtime state and a private work queue, and wires
//! the platform's display and input events to it.
//!
//! ## Lifecycle
//!
//! ```text
//!   new() ──▶ start(events) ──▶ ... ticks, suspend, resume, boost ... ──▶ stop()
//!              │                                                          │
//!              ├─ register works                 set shutdown flag ◀──────┤
//!              ├─ subscribe listener              unsubscribe       ◀──────┤
//!              └─ first tick after STARTUP_DELAY  destroy queue     ◀──────┘
//! ```
//!
//! Work items and the event listener hold only a `Weak` reference to the
//! controller state. Anything that fires after `stop` finds the shutdown
//! flag set or the state gone and returns without touching the platform.

use alloc::string::String;
use alloc::sync::{Arc, Weak};
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use mako_core::{Work, WorkHandle, WorkQueue};
use mako_hal::{
    CpuId, CpuMask, DisplayEvent, Duration, EventListener, EventSource, FreqKhz, Platform,
    PlatformEvent, SubscriptionId, Timestamp,
};
use spin::{Mutex, Once};

use crate::boost::{apply_touch_boost, boost_frequency, InputBoost};
use crate::control::HotplugControl;
use crate::coordinator::PowerCoordinator;
use crate::decision::{Action, DecisionEngine, SlotInput};
use crate::error::{CpuOp, HotplugError, HotplugResult};
use crate::hysteresis::Hysteresis;
use crate::policy::HotplugPolicy;
use crate::state::{RuntimeState, SlotState};
use crate::tunables::{Tunables, TunablesSnapshot};
use crate::{big_cpu, small_cpu, MAKO_HOTPLUG, SAMPLED_CPUS};

/// Delay between `start` and the first tick
pub const STARTUP_DELAY: Duration = Duration::from_secs(20);

/// Largest backoff exponent: the period is multiplied by at most 2^3
const MAX_BACKOFF_SHIFT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkKind {
    Decide,
    Suspend,
    Resume,
    Boost,
}

impl WorkKind {
    const fn name(self) -> &'static str {
        match self {
            WorkKind::Decide => "decide",
            WorkKind::Suspend => "suspend",
            WorkKind::Resume => "resume",
            WorkKind::Boost => "boost",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Works {
    decide: WorkHandle,
    suspend: WorkHandle,
    resume: WorkHandle,
    boost: WorkHandle,
}

#[derive(Default)]
struct Stats {
    ticks: AtomicU64,
    onlined: AtomicU64,
    offlined: AtomicU64,
    failures: AtomicU64,
    suspends: AtomicU64,
    resumes: AtomicU64,
    boosts: AtomicU64,
}

/// Controller counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Ticks that ran while not suspended
    pub ticks: u64,
    /// Big cores onlined by the tick
    pub onlined: u64,
    /// Big cores offlined by the tick
    pub offlined: u64,
    /// Failed tick transitions
    pub failures: u64,
    /// Display-off transitions
    pub suspends: u64,
    /// Display-on transitions
    pub resumes: u64,
    /// Input boosts that onlined a core or raised a frequency
    pub boosts: u64,
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerStatus {
    /// Display is off
    pub suspended: bool,
    /// Online cores, as reported by the platform
    pub online: CpuMask,
    /// Hysteresis counters, by slot
    pub counters: [u32; SAMPLED_CPUS],
    /// Max frequency captured at the last suspend
    pub saved_max_freq: FreqKhz,
    /// When the next tick is due, if one is queued
    pub next_tick: Option<Timestamp>,
    /// An input boost is active
    pub boosted: bool,
}

struct Inner<P: Platform> {
    platform: Arc<P>,
    tunables: Tunables,
    engine: DecisionEngine,
    coordinator: PowerCoordinator,
    boost: InputBoost,
    state: Mutex<RuntimeState>,
    wq: WorkQueue,
    works: Once<Works>,
    shutdown: AtomicBool,
    stats: Stats,
}

impl<P: Platform> Inner<P> {
    fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn handle_event(&self, event: PlatformEvent) {
        if self.is_shut_down() {
            return;
        }
        let Some(works) = self.works.get() else {
            return;
        };
        let now = self.platform.now();

        match event {
            PlatformEvent::Display(DisplayEvent::OffStart) => {
                self.wq.cancel(works.resume);
                self.wq.queue(works.suspend, now);
            },
            PlatformEvent::Display(DisplayEvent::OnStart) => {
                self.wq.cancel(works.suspend);
                self.wq.queue(works.resume, now);
            },
            PlatformEvent::Input => {
                if self.boost.on_input(now) {
                    self.wq.queue(works.boost, now);
                }
            },
        }
    }

    fn run(&self, kind: WorkKind, now: Timestamp) {
        let Some(works) = self.works.get() else {
            return;
        };

        match kind {
            WorkKind::Decide => self.tick(works, now),
            WorkKind::Suspend => self.suspend(works),
            WorkKind::Resume => self.resume(works, now),
            WorkKind::Boost => self.touch_boost(now),
        }
    }

    fn tick(&self, works: &Works, now: Timestamp) {
        let t = self.tunables.snapshot();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if state.suspended {
            return;
        }
        self.stats.ticks.fetch_add(1, Ordering::Relaxed);

        let platform = &*self.platform;
        let period = t.sample_period();
        let possible = platform.possible_cpus();
        let mut online_count = platform.num_online();

        if let Some(reason) = self.engine.early_exit(online_count, possible, &t) {
            log::debug!("{}: tick skipped: {:?}", MAKO_HOTPLUG, reason);
            self.wq.queue_delayed(works.decide, now, period);
            return;
        }

        let boosted = self.boost.is_boosted(now);

        for slot in 0..SAMPLED_CPUS {
            let big = big_cpu(slot);
            if big.as_u32() >= possible {
                break;
            }
            if slot > 0 && !platform.is_online(small_cpu(slot)) {
                break;
            }

            let load = match state.sampler.sample(platform, slot) {
                Ok(load) => load,
                Err(err) => {
                    state.backoff = (state.backoff + 1).min(MAX_BACKOFF_SHIFT);
                    let delay = period.saturating_mul(1 << state.backoff);
                    log::warn!(
                        "{}: {}, retrying in {} ms",
                        MAKO_HOTPLUG,
                        err,
                        delay.as_millis()
                    );
                    self.wq.queue_delayed(works.decide, now, delay);
                    return;
                },
            };

            let big_online = platform.is_online(big);
            let slot_state = &mut state.slots[slot];
            slot_state.online = big_online;

            let input = SlotInput {
                load,
                big_cpu: big,
                big_online,
                online_count,
                big_freq: platform.cur_freq(big),
                boosted,
                now,
            };
            let action = self.engine.decide(slot_state, &input, &t);
            if self.apply(slot_state, action, now) {
                match action {
                    Action::OnlineCore(_) => online_count += 1,
                    Action::OfflineCore(_) => online_count -= 1,
                    Action::None => {},
                }
            }
        }

        state.backoff = 0;
        self.wq.queue_delayed(works.decide, now, period);
    }

    /// Perform a tick action; true if the platform changed
    fn apply(&self, slot: &mut SlotState, action: Action, now: Timestamp) -> bool {
        let (cpu, op, result) = match action {
            Action::None => return false,
            Action::OnlineCore(cpu) => (cpu, CpuOp::Up, self.platform.cpu_up(cpu)),
            Action::OfflineCore(cpu) => (cpu, CpuOp::Down, self.platform.cpu_down(cpu)),
        };

        if let Err(source) = result {
            self.stats.failures.fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "{}: {}",
                MAKO_HOTPLUG,
                HotplugError::ActuatorFailure { cpu, op, source }
            );
            return false;
        }

        match op {
            CpuOp::Up => {
                slot.online = true;
                slot.last_online = now;
                self.stats.onlined.fetch_add(1, Ordering::Relaxed);
            },
            _ => {
                slot.online = false;
                Hysteresis::reset(slot);
                self.stats.offlined.fetch_add(1, Ordering::Relaxed);
            },
        }
        log::debug!("{}: cpu{} {}", MAKO_HOTPLUG, cpu, op);
        true
    }

    fn suspend(&self, works: &Works) {
        let t = self.tunables.snapshot();
        let mut state = self.state.lock();

        self.wq.cancel(works.decide);
        if self
            .coordinator
            .on_display_off(&*self.platform, &mut state, &t)
        {
            self.stats.suspends.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn resume(&self, works: &Works, now: Timestamp) {
        let t = self.tunables.snapshot();
        let mut state = self.state.lock();

        if self
            .coordinator
            .on_display_on(&*self.platform, &mut state, now)
        {
            self.boost.reset();
            self.stats.resumes.fetch_add(1, Ordering::Relaxed);
            self.wq.mod_delayed(works.decide, now, t.sample_period());
        }
    }

    fn touch_boost(&self, now: Timestamp) {
        let t = self.tunables.snapshot();
        let mut state = self.state.lock();

        if state.suspended {
            return;
        }
        let onlined = apply_touch_boost(&*self.platform, &mut state, &t, now);
        let raised = boost_frequency(&*self.platform, &t);
        if onlined + raised > 0 {
            self.stats.boosts.fetch_add(1, Ordering::Relaxed);
        }
    }
}

struct ControllerWork<P: Platform> {
    inner: Weak<Inner<P>>,
    kind: WorkKind,
}

impl<P: Platform> Work for ControllerWork<P> {
    fn run(&self, now: Timestamp) {
        match self.inner.upgrade() {
            Some(inner) if !inner.is_shut_down() => inner.run(self.kind, now),
            _ => log::debug!(
                "{}: {} work: {}",
                MAKO_HOTPLUG,
                self.kind.name(),
                HotplugError::TeardownRace
            ),
        }
    }
}

struct EventRelay<P: Platform> {
    inner: Weak<Inner<P>>,
}

impl<P: Platform> EventListener for EventRelay<P> {
    fn on_event(&self, event: PlatformEvent) {
        if let Some(inner) = self.inner.upgrade() {
            inner.handle_event(event);
        }
    }
}

/// The hotplug controller
pub struct Controller<P: Platform> {
    inner: Arc<Inner<P>>,
    subscription: Mutex<Option<(Arc<dyn EventSource>, SubscriptionId)>>,
}

impl<P: Platform> Controller<P> {
    /// Controller with the default policy
    pub fn new(platform: Arc<P>) -> Self {
        Self::with_policy(platform, HotplugPolicy::default())
    }

    /// Controller with an explicit policy profile
    pub fn with_policy(platform: Arc<P>, policy: HotplugPolicy) -> Self {
        let now = platform.now();
        Self {
            inner: Arc::new(Inner {
                platform,
                tunables: Tunables::new(),
                engine: DecisionEngine::new(policy),
                coordinator: PowerCoordinator::new(policy),
                boost: InputBoost::new(),
                state: Mutex::new(RuntimeState::new(now)),
                wq: WorkQueue::new(MAKO_HOTPLUG),
                works: Once::new(),
                shutdown: AtomicBool::new(false),
                stats: Stats::default(),
            }),
            subscription: Mutex::new(None),
        }
    }

    /// Register work, subscribe to `events` and schedule the first tick
    pub fn start(&self, events: Arc<dyn EventSource>) -> HotplugResult<()> {
        let mut subscription = self.subscription.lock();
        if subscription.is_some() {
            return Err(HotplugError::AlreadyStarted);
        }
        if self.inner.is_shut_down() || !self.inner.wq.is_alive() {
            return Err(HotplugError::QueueDead);
        }

        let works = match self.inner.works.get() {
            Some(works) => *works,
            None => {
                let works = self.register_works()?;
                *self.inner.works.call_once(|| works)
            },
        };

        let relay = Arc::new(EventRelay {
            inner: Arc::downgrade(&self.inner),
        });
        let id = events
            .subscribe(String::from(MAKO_HOTPLUG), relay)
            .map_err(HotplugError::ListenerRegistration)?;
        *subscription = Some((events, id));

        let platform = &*self.inner.platform;
        let now = platform.now();
        self.inner.wq.queue_delayed(works.decide, now, STARTUP_DELAY);

        log::info!(
            "{}: init, {} cpu(s) possible, {} online, first tick in {} ms",
            MAKO_HOTPLUG,
            platform.possible_cpus(),
            platform.num_online(),
            STARTUP_DELAY.as_millis()
        );
        Ok(())
    }

    fn register_works(&self) -> HotplugResult<Works> {
        let register = |kind: WorkKind| {
            self.inner
                .wq
                .register(
                    kind.name(),
                    Arc::new(ControllerWork {
                        inner: Arc::downgrade(&self.inner),
                        kind,
                    }),
                )
                .map_err(|_| HotplugError::QueueDead)
        };

        Ok(Works {
            decide: register(WorkKind::Decide)?,
            suspend: register(WorkKind::Suspend)?,
            resume: register(WorkKind::Resume)?,
            boost: register(WorkKind::Boost)?,
        })
    }

    /// Unsubscribe, cancel all work and wait for the in-flight item
    ///
    /// Must not be called from a work item of this controller.
    pub fn stop(&self) {
        if self.inner.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some((events, id)) = self.subscription.lock().take() {
            events.unsubscribe(id);
        }
        self.inner.wq.destroy();

        log::info!("{}: exit", MAKO_HOTPLUG);
    }

    /// Live tunables
    pub fn tunables(&self) -> &Tunables {
        &self.inner.tunables
    }

    /// Attribute interface over the tunables
    pub fn control(&self) -> HotplugControl<'_> {
        HotplugControl::new(&self.inner.tunables)
    }

    /// The controller's work queue, for the platform's worker loop
    pub fn work_queue(&self) -> &WorkQueue {
        &self.inner.wq
    }

    /// Run every work item due now
    pub fn run_pending(&self) -> usize {
        self.inner.wq.run_pending(self.inner.platform.now())
    }

    /// Feed a display event directly, without an event source
    pub fn display_event(&self, event: DisplayEvent) {
        self.inner.handle_event(PlatformEvent::Display(event));
    }

    /// Feed an input event directly, without an event source
    pub fn input_event(&self) {
        self.inner.handle_event(PlatformEvent::Input);
    }

    /// Current state
    pub fn status(&self) -> ControllerStatus {
        let inner = &*self.inner;
        let now = inner.platform.now();
        let state = inner.state.lock();

        ControllerStatus {
            suspended: state.suspended,
            online: inner.platform.online_cpus(),
            counters: state.counters(),
            saved_max_freq: state.saved_max_freq,
            next_tick: inner
                .works
                .get()
                .and_then(|works| inner.wq.deadline(works.decide)),
            boosted: inner.boost.is_boosted(now),
        }
    }

    /// Counters since creation
    pub fn stats(&self) -> ControllerStats {
        let s = &self.inner.stats;
        ControllerStats {
            ticks: s.ticks.load(Ordering::Relaxed),
            onlined: s.onlined.load(Ordering::Relaxed),
            offlined: s.offlined.load(Ordering::Relaxed),
            failures: s.failures.load(Ordering::Relaxed),
            suspends: s.suspends.load(Ordering::Relaxed),
            resumes: s.resumes.load(Ordering::Relaxed),
            boosts: s.boosts.load(Ordering::Relaxed),
        }
    }

    /// Snapshot of the tunables
    pub fn snapshot(&self) -> TunablesSnapshot {
        self.inner.tunables.snapshot()
    }

    /// Is a given CPU online, per the platform
    pub fn is_online(&self, cpu: CpuId) -> bool {
        self.inner.platform.is_online(cpu)
    }
}

impl<P: Platform> Drop for Controller<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Call, SimPlatform};
    use crate::tunables::Tunable;
    use alloc::vec;
    use alloc::vec::Vec;
    use mako_core::EventBus;
    use mako_hal::{Clock, CpuFreq, CpuHotplug, HalError};

    extern crate std;

    const PERIOD_MS: u64 = 100;

    fn cpu(id: u32) -> CpuId {
        CpuId::new(id)
    }

    struct Rig {
        sim: Arc<SimPlatform>,
        bus: Arc<EventBus>,
        ctl: Controller<SimPlatform>,
    }

    impl Rig {
        /// Started controller, clock at the first tick
        fn new(possible: u32, online: u32) -> Self {
            Self::with_policy(possible, online, HotplugPolicy::default())
        }

        fn with_policy(possible: u32, online: u32, policy: HotplugPolicy) -> Self {
            let sim = Arc::new(SimPlatform::new(possible, online));
            let bus = Arc::new(EventBus::new());
            let ctl = Controller::with_policy(sim.clone(), policy);
            ctl.start(bus.clone()).unwrap();
            sim.advance_millis(STARTUP_DELAY.as_millis());
            Self { sim, bus, ctl }
        }

        /// Run whatever is due, then move to the next period
        fn tick(&self) -> usize {
            let ran = self.ctl.run_pending();
            self.sim.advance_millis(PERIOD_MS);
            ran
        }

        fn ticks(&self, n: usize) {
            for _ in 0..n {
                self.tick();
            }
        }

        fn display(&self, event: DisplayEvent) {
            self.bus.publish(PlatformEvent::Display(event));
            self.ctl.run_pending();
        }
    }

    #[test]
    fn test_first_tick_after_startup_delay() {
        let sim = Arc::new(SimPlatform::new(4, 2));
        let bus = Arc::new(EventBus::new());
        let ctl = Controller::new(sim.clone());
        let t0 = sim.now();

        ctl.start(bus.clone()).unwrap();
        assert_eq!(bus.subscription_count(), 1);
        assert_eq!(
            ctl.status().next_tick,
            Some(t0.saturating_add(STARTUP_DELAY))
        );
        assert_eq!(ctl.run_pending(), 0);
        assert_eq!(ctl.start(bus.clone()), Err(HotplugError::AlreadyStarted));
    }

    #[test]
    fn test_sustained_load_onlines_one_big_core() {
        let rig = Rig::new(4, 2);
        rig.sim.set_load(0, 70);
        rig.sim.set_load(1, 10);

        rig.ticks(6);

        assert_eq!(rig.sim.calls(), vec![Call::Up(cpu(2))]);
        assert!(rig.ctl.is_online(cpu(2)));
        assert_eq!(rig.ctl.stats().onlined, 1);
        assert_eq!(rig.ctl.stats().ticks, 6);
    }

    #[test]
    fn test_display_off_then_on() {
        let rig = Rig::new(4, 4);

        rig.display(DisplayEvent::OffStart);
        assert_eq!(
            rig.sim.take_calls(),
            vec![
                Call::Down(cpu(3)),
                Call::Down(cpu(2)),
                Call::Down(cpu(1)),
                Call::Cap(cpu(0), Some(702_000)),
            ]
        );
        let status = rig.ctl.status();
        assert!(status.suspended);
        assert_eq!(status.online.count(), 1);
        assert_eq!(status.saved_max_freq, 1_512_000);
        assert_eq!(status.next_tick, None);

        // Nothing ticks while suspended
        rig.sim.advance_millis(10_000);
        assert_eq!(rig.ctl.run_pending(), 0);

        rig.display(DisplayEvent::OnStart);
        let calls = rig.sim.take_calls();
        assert!(calls[..4].iter().all(|c| matches!(c, Call::Cap(_, None))));
        assert_eq!(&calls[4..], &[Call::Up(cpu(1))]);
        assert_eq!(rig.sim.cap(cpu(0)), None);

        let status = rig.ctl.status();
        assert!(!status.suspended);
        assert_eq!(
            status.next_tick,
            Some(rig.sim.now().saturating_add(Duration::from_millis(PERIOD_MS)))
        );

        rig.sim.advance_millis(PERIOD_MS);
        assert_eq!(rig.ctl.run_pending(), 1);
        assert_eq!(rig.ctl.stats().suspends, 1);
        assert_eq!(rig.ctl.stats().resumes, 1);
    }

    #[test]
    fn test_display_off_twice() {
        let rig = Rig::new(4, 4);

        rig.display(DisplayEvent::OffStart);
        let first = rig.sim.take_calls();
        rig.display(DisplayEvent::OffStart);

        assert_eq!(first.len(), 4);
        assert!(rig.sim.calls().is_empty());
        assert_eq!(rig.ctl.stats().suspends, 1);
    }

    #[test]
    fn test_display_on_cancels_pending_off() {
        let rig = Rig::new(4, 4);

        rig.bus.publish(PlatformEvent::Display(DisplayEvent::OffStart));
        rig.bus.publish(PlatformEvent::Display(DisplayEvent::OnStart));
        rig.ctl.run_pending();

        assert!(!rig.ctl.status().suspended);
        assert_eq!(rig.sim.num_online(), 4);
        assert!(rig
            .sim
            .calls()
            .iter()
            .all(|c| matches!(c, Call::Cap(_, None))));
    }

    #[test]
    fn test_dual_core_threshold_is_inert() {
        let rig = Rig::new(4, 2);
        assert_eq!(rig.ctl.control().store("load_threshold", "100"), Ok(100));
        rig.sim.set_load(0, 100);
        rig.sim.set_load(1, 100);

        rig.ticks(10);

        assert!(rig.sim.calls().is_empty());
        assert_eq!(rig.ctl.status().counters, [0, 0]);
    }

    #[test]
    fn test_single_spike_does_not_online() {
        let rig = Rig::new(4, 2);
        rig.ctl.tunables().set(Tunable::HighLoadCounter, 3);

        rig.sim.set_load(0, 95);
        rig.tick();
        rig.sim.set_load(0, 10);
        rig.ticks(5);

        assert!(rig.sim.calls().is_empty());
    }

    #[test]
    fn test_consecutive_spikes_online_early() {
        let rig = Rig::new(4, 2);
        rig.sim.set_load(0, 95);

        rig.tick();
        assert!(rig.sim.calls().is_empty());
        rig.tick();
        assert_eq!(rig.sim.calls(), vec![Call::Up(cpu(2))]);
    }

    #[test]
    fn test_dwell_time_then_offline() {
        let rig = Rig::new(4, 2);
        rig.sim.set_cur_freq(2, 384_000);

        rig.sim.set_load(0, 95);
        rig.ticks(2);
        assert_eq!(rig.sim.take_calls(), vec![Call::Up(cpu(2))]);

        rig.sim.set_load(0, 0);
        rig.ticks(9);
        assert!(rig.sim.calls().is_empty());

        rig.tick();
        assert_eq!(rig.sim.calls(), vec![Call::Down(cpu(2))]);
        assert_eq!(rig.ctl.status().counters[0], 0);
        assert_eq!(rig.ctl.stats().offlined, 1);
    }

    #[test]
    fn test_high_frequency_keeps_core_online() {
        let rig = Rig::new(4, 3);
        rig.sim.set_load(0, 0);

        rig.ticks(30);

        assert!(rig.sim.calls().is_empty());
        assert!(rig.ctl.status().counters[0] >= 10);
    }

    #[test]
    fn test_failed_online_retried_next_tick() {
        let rig = Rig::new(4, 2);
        rig.sim.fail_up(cpu(2));
        rig.sim.set_load(0, 95);

        rig.ticks(3);
        assert_eq!(rig.sim.calls(), vec![Call::Up(cpu(2)), Call::Up(cpu(2))]);
        assert!(!rig.ctl.is_online(cpu(2)));
        assert_eq!(rig.ctl.stats().failures, 2);

        rig.sim.clear_failures();
        rig.tick();
        assert!(rig.ctl.is_online(cpu(2)));
    }

    #[test]
    fn test_backoff_while_stats_unavailable() {
        let rig = Rig::new(4, 2);
        rig.sim.set_stat_ready(false);

        for shift in [1u64, 2, 3, 3] {
            let now = rig.sim.now();
            assert_eq!(rig.ctl.run_pending(), 1);
            let delay = PERIOD_MS << shift;
            assert_eq!(
                rig.ctl.status().next_tick,
                Some(now.saturating_add(Duration::from_millis(delay)))
            );
            rig.sim.advance_millis(delay);
        }

        rig.sim.set_stat_ready(true);
        let now = rig.sim.now();
        rig.ctl.run_pending();
        assert_eq!(
            rig.ctl.status().next_tick,
            Some(now.saturating_add(Duration::from_millis(PERIOD_MS)))
        );
    }

    #[test]
    fn test_timer_tunable_sets_period() {
        let rig = Rig::new(4, 2);
        rig.ctl.tunables().set(Tunable::Timer, 5);

        let now = rig.sim.now();
        rig.ctl.run_pending();
        assert_eq!(
            rig.ctl.status().next_tick,
            Some(now.saturating_add(Duration::from_millis(500)))
        );
    }

    #[test]
    fn test_input_boost() {
        let rig = Rig::new(4, 2);
        rig.ctl.tunables().set(Tunable::CoresOnTouch, 4);

        rig.bus.publish(PlatformEvent::Input);
        rig.ctl.run_pending();
        assert_eq!(rig.sim.take_calls(), vec![Call::Up(cpu(2)), Call::Up(cpu(3))]);
        assert!(rig.ctl.status().boosted);

        // Inside the rate limit
        rig.sim.set_online(cpu(3), false);
        rig.bus.publish(PlatformEvent::Input);
        rig.ctl.run_pending();
        assert!(rig.sim.calls().is_empty());
        assert_eq!(rig.ctl.stats().boosts, 1);
    }

    #[test]
    fn test_boost_ignored_while_suspended() {
        let rig = Rig::new(4, 2);
        rig.display(DisplayEvent::OffStart);
        rig.sim.take_calls();

        rig.ctl.input_event();
        rig.ctl.run_pending();
        assert!(rig.sim.calls().is_empty());
    }

    #[test]
    fn test_stop_tears_down() {
        let rig = Rig::new(4, 4);
        rig.ctl.stop();

        assert_eq!(rig.bus.subscription_count(), 0);
        assert!(!rig.ctl.work_queue().is_alive());

        rig.bus.publish(PlatformEvent::Display(DisplayEvent::OffStart));
        rig.ctl.display_event(DisplayEvent::OffStart);
        assert_eq!(rig.ctl.run_pending(), 0);
        assert!(rig.sim.calls().is_empty());
        assert_eq!(rig.ctl.start(rig.bus.clone()), Err(HotplugError::QueueDead));
    }

    #[test]
    fn test_drop_unsubscribes() {
        let rig = Rig::new(4, 2);
        let Rig { sim, bus, ctl } = rig;
        drop(ctl);

        assert_eq!(bus.subscription_count(), 0);
        bus.publish(PlatformEvent::Input);
        assert!(sim.calls().is_empty());
    }

    fn boost_work(inner: Weak<Inner<SimPlatform>>) -> ControllerWork<SimPlatform> {
        ControllerWork {
            inner,
            kind: WorkKind::Boost,
        }
    }

    #[test]
    fn test_work_on_live_controller_acts() {
        let rig = Rig::new(4, 2);
        rig.ctl.tunables().set(Tunable::CoresOnTouch, 4);

        boost_work(Arc::downgrade(&rig.ctl.inner)).run(rig.sim.now());
        assert_eq!(rig.sim.calls(), vec![Call::Up(cpu(2)), Call::Up(cpu(3))]);
    }

    #[test]
    fn test_work_after_teardown_is_noop() {
        let Rig { sim, bus: _bus, ctl } = Rig::new(4, 2);
        ctl.tunables().set(Tunable::CoresOnTouch, 4);

        // Stopped, state still referenced
        let held = ctl.inner.clone();
        ctl.stop();
        boost_work(Arc::downgrade(&held)).run(sim.now());
        assert!(sim.calls().is_empty());

        // State gone
        let weak = Arc::downgrade(&held);
        drop(held);
        drop(ctl);
        assert!(weak.upgrade().is_none());
        boost_work(weak).run(sim.now());
        assert!(sim.calls().is_empty());
        assert_eq!(sim.online_cpus(), CpuMask::first(2));
    }

    #[test]
    fn test_input_raises_frequency() {
        let rig = Rig::new(4, 2);
        rig.sim.set_cur_freq(0, 384_000);
        rig.sim.set_cur_freq(1, 1_134_000);

        rig.bus.publish(PlatformEvent::Input);
        rig.ctl.run_pending();
        assert_eq!(rig.sim.take_calls(), vec![Call::Target(cpu(0), 1_026_000)]);
        assert_eq!(rig.sim.cur_freq(cpu(0)), 1_026_000);
        assert_eq!(rig.ctl.stats().boosts, 1);

        // Disabled
        rig.ctl.tunables().set(Tunable::InputBoostFreq, 0);
        rig.sim.set_cur_freq(0, 384_000);
        rig.sim.advance_millis(200);
        rig.bus.publish(PlatformEvent::Input);
        rig.ctl.run_pending();
        assert!(rig.sim.calls().is_empty());
    }

    #[test]
    fn test_start_on_closed_bus() {
        let sim = Arc::new(SimPlatform::new(4, 2));
        let bus = Arc::new(EventBus::new());
        bus.close();

        let ctl = Controller::new(sim);
        assert_eq!(
            ctl.start(bus.clone()),
            Err(HotplugError::ListenerRegistration(HalError::RegistrationFailed))
        );

        let bus = Arc::new(EventBus::new());
        assert_eq!(ctl.start(bus.clone()), Ok(()));
        assert_eq!(bus.subscription_count(), 1);
    }

    #[test]
    fn test_concurrent_display_events() {
        use std::thread;

        let rig = Arc::new(Rig::new(4, 4));
        rig.sim.set_load(0, 80);
        rig.sim.set_load(1, 80);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let rig = rig.clone();
                thread::spawn(move || {
                    for n in 0..200 {
                        let event = if (n + i) % 2 == 0 {
                            DisplayEvent::OffStart
                        } else {
                            DisplayEvent::OnStart
                        };
                        rig.bus.publish(PlatformEvent::Display(event));
                        rig.ctl.run_pending();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        rig.display(DisplayEvent::OffStart);
        let status = rig.ctl.status();
        assert!(status.suspended);
        assert_eq!(status.online.count(), 1);
        assert_eq!(status.next_tick, None);

        rig.display(DisplayEvent::OnStart);
        let status = rig.ctl.status();
        assert!(!status.suspended);
        assert!(status.online.contains(cpu(0)) && status.online.contains(cpu(1)));
        assert!(status.next_tick.is_some());
    }
}
