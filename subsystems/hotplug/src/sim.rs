//! Simulated platform for tests.
//!
//! Manual clock, scripted per-core load, recorded actuator calls and failure
//! injection. Every `cpu_times` read advances that core's counters by one
//! 100 ms window at the scripted load.

use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use mako_hal::{
    Clock, CpuFreq, CpuHotplug, CpuId, CpuMask, CpuStat, CpuTimes, FreqKhz, HalError, HalResult,
    Timestamp,
};
use spin::Mutex;

/// Max frequency of every simulated core
pub const SIM_MAX_FREQ: FreqKhz = 1_512_000;

const WINDOW_US: u64 = 100_000;

/// A recorded actuator call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Up(CpuId),
    Down(CpuId),
    Cap(CpuId, Option<FreqKhz>),
    Target(CpuId, FreqKhz),
}

pub struct SimPlatform {
    possible: u32,
    online: AtomicU64,
    now_ns: AtomicU64,
    loads: Mutex<Vec<u32>>,
    times: Mutex<Vec<CpuTimes>>,
    cur_freq: Mutex<Vec<FreqKhz>>,
    caps: Mutex<Vec<Option<FreqKhz>>>,
    calls: Mutex<Vec<Call>>,
    fail_up: AtomicU64,
    fail_down: AtomicU64,
    stat_ready: AtomicBool,
}

impl SimPlatform {
    /// `possible` cores, the first `online` of them up, clock at 100 s
    pub fn new(possible: u32, online: u32) -> Self {
        let n = possible as usize;
        Self {
            possible,
            online: AtomicU64::new(CpuMask::first(online.min(possible)).bits()),
            now_ns: AtomicU64::new(Timestamp::from_secs(100).as_nanos()),
            loads: Mutex::new(vec![0; n]),
            times: Mutex::new(vec![CpuTimes::default(); n]),
            cur_freq: Mutex::new(vec![SIM_MAX_FREQ; n]),
            caps: Mutex::new(vec![None; n]),
            calls: Mutex::new(Vec::new()),
            fail_up: AtomicU64::new(0),
            fail_down: AtomicU64::new(0),
            stat_ready: AtomicBool::new(true),
        }
    }

    pub fn advance_millis(&self, ms: u64) {
        self.now_ns.fetch_add(ms * 1_000_000, Ordering::SeqCst);
    }

    pub fn set_load(&self, cpu: u32, load: u32) {
        self.loads.lock()[cpu as usize] = load.min(100);
    }

    pub fn set_cur_freq(&self, cpu: u32, freq: FreqKhz) {
        self.cur_freq.lock()[cpu as usize] = freq;
    }

    /// Change online state behind the controller's back
    pub fn set_online(&self, cpu: CpuId, online: bool) {
        let bit = 1u64 << cpu.index();
        if online {
            self.online.fetch_or(bit, Ordering::SeqCst);
        } else {
            self.online.fetch_and(!bit, Ordering::SeqCst);
        }
    }

    pub fn fail_up(&self, cpu: CpuId) {
        self.fail_up.fetch_or(1 << cpu.index(), Ordering::SeqCst);
    }

    pub fn fail_down(&self, cpu: CpuId) {
        self.fail_down.fetch_or(1 << cpu.index(), Ordering::SeqCst);
    }

    pub fn clear_failures(&self) {
        self.fail_up.store(0, Ordering::SeqCst);
        self.fail_down.store(0, Ordering::SeqCst);
    }

    pub fn set_stat_ready(&self, ready: bool) {
        self.stat_ready.store(ready, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn take_calls(&self) -> Vec<Call> {
        core::mem::take(&mut *self.calls.lock())
    }

    pub fn cap(&self, cpu: CpuId) -> Option<FreqKhz> {
        self.caps.lock()[cpu.index()]
    }

    fn check(&self, cpu: CpuId) -> HalResult<()> {
        if cpu.as_u32() >= self.possible {
            return Err(HalError::InvalidCpu(cpu));
        }
        Ok(())
    }
}

impl CpuHotplug for SimPlatform {
    fn possible_cpus(&self) -> u32 {
        self.possible
    }

    fn online_cpus(&self) -> CpuMask {
        CpuMask::from_bits(self.online.load(Ordering::SeqCst))
    }

    fn cpu_up(&self, cpu: CpuId) -> HalResult<()> {
        self.check(cpu)?;
        self.calls.lock().push(Call::Up(cpu));
        if self.fail_up.load(Ordering::SeqCst) & (1 << cpu.index()) != 0 {
            return Err(HalError::TransitionFailed(cpu));
        }
        self.set_online(cpu, true);
        Ok(())
    }

    fn cpu_down(&self, cpu: CpuId) -> HalResult<()> {
        self.check(cpu)?;
        self.calls.lock().push(Call::Down(cpu));
        if self.fail_down.load(Ordering::SeqCst) & (1 << cpu.index()) != 0 {
            return Err(HalError::Busy(cpu));
        }
        self.set_online(cpu, false);
        Ok(())
    }
}

impl CpuFreq for SimPlatform {
    fn cur_freq(&self, cpu: CpuId) -> FreqKhz {
        self.cur_freq.lock().get(cpu.index()).copied().unwrap_or(0)
    }

    fn max_freq(&self, cpu: CpuId) -> FreqKhz {
        if cpu.as_u32() < self.possible {
            SIM_MAX_FREQ
        } else {
            0
        }
    }

    fn set_max_freq_cap(&self, cpu: CpuId, cap: Option<FreqKhz>) -> HalResult<()> {
        self.check(cpu)?;
        self.calls.lock().push(Call::Cap(cpu, cap));
        self.caps.lock()[cpu.index()] = cap;
        Ok(())
    }

    fn set_target_freq(&self, cpu: CpuId, freq: FreqKhz) -> HalResult<()> {
        self.check(cpu)?;
        self.calls.lock().push(Call::Target(cpu, freq));
        let limit = self.caps.lock()[cpu.index()].unwrap_or(SIM_MAX_FREQ);
        self.cur_freq.lock()[cpu.index()] = freq.min(limit);
        Ok(())
    }
}

impl CpuStat for SimPlatform {
    fn cpu_times(&self, cpu: CpuId) -> HalResult<CpuTimes> {
        self.check(cpu)?;
        if !self.stat_ready.load(Ordering::SeqCst) {
            return Err(HalError::NotReady);
        }

        let load = self.loads.lock()[cpu.index()] as u64;
        let mut times = self.times.lock();
        let t = &mut times[cpu.index()];
        t.wall_us += WINDOW_US;
        t.idle_us += WINDOW_US * (100 - load) / 100;
        Ok(*t)
    }
}

impl Clock for SimPlatform {
    fn now(&self) -> Timestamp {
        Timestamp::from_nanos(self.now_ns.load(Ordering::SeqCst))
    }
}
