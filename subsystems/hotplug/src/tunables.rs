//! # Tunables
//!
//! The user-settable knobs of the controller. Each knob is an atomic so the
//! control surface can write while the tick reads; the tick takes one
//! [`TunablesSnapshot`] per run and works from that.
//!
//! | Key | Range | Default | Unit |
//! |-----|-------|---------|------|
//! | `load_threshold` | 0..=100 | 60 | % |
//! | `high_load_counter` | 0..=50 | 10 | samples |
//! | `max_load_counter` | 0..=50 | 20 | samples |
//! | `cpufreq_unplug_limit` | 0..=u32::MAX | 1000000 | kHz |
//! | `min_time_cpu_online` | 0..=100 | 1 | s |
//! | `timer` | 1..=100 | 1 | 100 ms |
//! | `suspend_frequency` | 0..=1512000 | 702000 | kHz, 0 = no cap |
//! | `cores_on_touch` | 2..=4 | 2 | cores |
//! | `input_boost_freq` | 0..=1512000 | 1026000 | kHz, 0 = off |
//!
//! Writes outside the range are clamped to the nearest bound.

use core::sync::atomic::{AtomicU32, Ordering};

use mako_hal::{Duration, FreqKhz};

/// One sample period unit
pub const TIMER_UNIT: Duration = Duration::from_millis(100);

/// Tunable keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Tunable {
    /// Load percentage at or above which a sampled core counts as busy
    LoadThreshold = 0,
    /// Counter value at which a big core is brought online
    HighLoadCounter = 1,
    /// Counter ceiling
    MaxLoadCounter = 2,
    /// Frequency above which offlining is deferred
    CpufreqUnplugLimit = 3,
    /// Minimum seconds a core stays online
    MinTimeCpuOnline = 4,
    /// Sample period in 100 ms units
    Timer = 5,
    /// Frequency cap while the display is off
    SuspendFrequency = 6,
    /// Cores brought online by an input boost
    CoresOnTouch = 7,
    /// Frequency floor requested on online cores by an input boost
    InputBoostFreq = 8,
}

impl Tunable {
    /// Number of tunables
    pub const COUNT: usize = 9;

    /// Every tunable, in attribute order
    pub const ALL: [Tunable; Self::COUNT] = [
        Tunable::LoadThreshold,
        Tunable::HighLoadCounter,
        Tunable::MaxLoadCounter,
        Tunable::CpufreqUnplugLimit,
        Tunable::MinTimeCpuOnline,
        Tunable::Timer,
        Tunable::SuspendFrequency,
        Tunable::CoresOnTouch,
        Tunable::InputBoostFreq,
    ];

    /// Attribute name
    pub const fn name(self) -> &'static str {
        match self {
            Tunable::LoadThreshold => "load_threshold",
            Tunable::HighLoadCounter => "high_load_counter",
            Tunable::MaxLoadCounter => "max_load_counter",
            Tunable::CpufreqUnplugLimit => "cpufreq_unplug_limit",
            Tunable::MinTimeCpuOnline => "min_time_cpu_online",
            Tunable::Timer => "timer",
            Tunable::SuspendFrequency => "suspend_frequency",
            Tunable::CoresOnTouch => "cores_on_touch",
            Tunable::InputBoostFreq => "input_boost_freq",
        }
    }

    /// Look up by attribute name
    pub fn from_name(name: &str) -> Option<Tunable> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Inclusive valid range
    pub const fn range(self) -> (u32, u32) {
        match self {
            Tunable::LoadThreshold => (0, 100),
            Tunable::HighLoadCounter => (0, 50),
            Tunable::MaxLoadCounter => (0, 50),
            Tunable::CpufreqUnplugLimit => (0, u32::MAX),
            Tunable::MinTimeCpuOnline => (0, 100),
            Tunable::Timer => (1, 100),
            Tunable::SuspendFrequency => (0, 1_512_000),
            Tunable::CoresOnTouch => (2, 4),
            Tunable::InputBoostFreq => (0, 1_512_000),
        }
    }

    /// Value at init
    pub const fn default_value(self) -> u32 {
        match self {
            Tunable::LoadThreshold => 60,
            Tunable::HighLoadCounter => 10,
            Tunable::MaxLoadCounter => 20,
            Tunable::CpufreqUnplugLimit => 1_000_000,
            Tunable::MinTimeCpuOnline => 1,
            Tunable::Timer => 1,
            Tunable::SuspendFrequency => 702_000,
            Tunable::CoresOnTouch => 2,
            Tunable::InputBoostFreq => 1_026_000,
        }
    }

    /// Clamp a value into range
    pub fn clamp(self, value: u32) -> u32 {
        let (min, max) = self.range();
        value.clamp(min, max)
    }
}

/// Live tunables
pub struct Tunables {
    values: [AtomicU32; Tunable::COUNT],
}

impl Tunables {
    /// Tunables with their default values
    pub fn new() -> Self {
        Self {
            values: Tunable::ALL.map(|t| AtomicU32::new(t.default_value())),
        }
    }

    /// Current value
    pub fn get(&self, key: Tunable) -> u32 {
        self.values[key as usize].load(Ordering::Relaxed)
    }

    /// Store a value, clamped; returns what was stored
    pub fn set(&self, key: Tunable, value: u32) -> u32 {
        let clamped = key.clamp(value);
        if clamped != value {
            log::debug!(
                "{}: {} = {} clamped to {}",
                crate::MAKO_HOTPLUG,
                key.name(),
                value,
                clamped
            );
        }
        self.values[key as usize].store(clamped, Ordering::Relaxed);
        clamped
    }

    /// Restore every default
    pub fn reset(&self) {
        for key in Tunable::ALL {
            self.set(key, key.default_value());
        }
    }

    /// Consistent-enough copy for one tick
    pub fn snapshot(&self) -> TunablesSnapshot {
        TunablesSnapshot {
            load_threshold: self.get(Tunable::LoadThreshold),
            high_load_counter: self.get(Tunable::HighLoadCounter),
            max_load_counter: self.get(Tunable::MaxLoadCounter),
            cpufreq_unplug_limit: self.get(Tunable::CpufreqUnplugLimit),
            min_time_cpu_online: self.get(Tunable::MinTimeCpuOnline),
            timer: self.get(Tunable::Timer),
            suspend_frequency: self.get(Tunable::SuspendFrequency),
            cores_on_touch: self.get(Tunable::CoresOnTouch),
            input_boost_freq: self.get(Tunable::InputBoostFreq),
        }
    }
}

impl Default for Tunables {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Tunables {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.snapshot().fmt(f)
    }
}

/// Plain copy of the tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunablesSnapshot {
    /// See [`Tunable::LoadThreshold`]
    pub load_threshold: u32,
    /// See [`Tunable::HighLoadCounter`]
    pub high_load_counter: u32,
    /// See [`Tunable::MaxLoadCounter`]
    pub max_load_counter: u32,
    /// See [`Tunable::CpufreqUnplugLimit`]
    pub cpufreq_unplug_limit: FreqKhz,
    /// See [`Tunable::MinTimeCpuOnline`]
    pub min_time_cpu_online: u32,
    /// See [`Tunable::Timer`]
    pub timer: u32,
    /// See [`Tunable::SuspendFrequency`]
    pub suspend_frequency: FreqKhz,
    /// See [`Tunable::CoresOnTouch`]
    pub cores_on_touch: u32,
    /// See [`Tunable::InputBoostFreq`]
    pub input_boost_freq: FreqKhz,
}

impl TunablesSnapshot {
    /// Delay between two ticks
    pub fn sample_period(&self) -> Duration {
        TIMER_UNIT.saturating_mul(self.timer.max(1) as u64)
    }

    /// Minimum dwell time of an onlined core
    pub fn min_online_time(&self) -> Duration {
        Duration::from_secs(self.min_time_cpu_online as u64)
    }
}

impl Default for TunablesSnapshot {
    fn default() -> Self {
        Tunables::new().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let t = Tunables::new().snapshot();
        assert_eq!(t.load_threshold, 60);
        assert_eq!(t.high_load_counter, 10);
        assert_eq!(t.max_load_counter, 20);
        assert_eq!(t.cpufreq_unplug_limit, 1_000_000);
        assert_eq!(t.min_time_cpu_online, 1);
        assert_eq!(t.timer, 1);
        assert_eq!(t.input_boost_freq, 1_026_000);
        assert_eq!(t.sample_period(), Duration::from_millis(100));
    }

    #[test]
    fn test_round_trip_in_range() {
        let t = Tunables::new();
        for key in Tunable::ALL {
            let (min, max) = key.range();
            let mid = min + (max - min) / 2;
            assert_eq!(t.set(key, mid), mid);
            assert_eq!(t.get(key), mid);
        }
    }

    #[test]
    fn test_out_of_range_clamps() {
        let t = Tunables::new();
        assert_eq!(t.set(Tunable::LoadThreshold, 150), 100);
        assert_eq!(t.get(Tunable::LoadThreshold), 100);
        assert_eq!(t.set(Tunable::HighLoadCounter, 51), 50);
        assert_eq!(t.set(Tunable::Timer, 0), 1);
        assert_eq!(t.set(Tunable::CoresOnTouch, 0), 2);
        assert_eq!(t.set(Tunable::CoresOnTouch, 9), 4);
        assert_eq!(t.set(Tunable::SuspendFrequency, 2_000_000), 1_512_000);
        assert_eq!(t.set(Tunable::CpufreqUnplugLimit, u32::MAX), u32::MAX);
        assert_eq!(t.set(Tunable::InputBoostFreq, 3_000_000), 1_512_000);
    }

    #[test]
    fn test_names() {
        for key in Tunable::ALL {
            assert_eq!(Tunable::from_name(key.name()), Some(key));
        }
        assert_eq!(Tunable::from_name("version"), None);
    }

    #[test]
    fn test_reset() {
        let t = Tunables::new();
        t.set(Tunable::MaxLoadCounter, 3);
        t.reset();
        assert_eq!(t.get(Tunable::MaxLoadCounter), 20);
    }
}
