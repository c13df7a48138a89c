//! # Load Sampler
//!
//! Frequency-scaled utilisation of the sampled small cores.
//!
//! ```text
//!   busy%   = 100 * (Δwall - Δidle) / Δwall        (Δidle excludes iowait)
//!   scaled% = busy% * cur_freq / max_freq
//! ```
//!
//! A core at 100 % busy but running at half its maximum frequency reports
//! 50 %: the load it would put on the core at full speed.

use mako_hal::{CpuFreq, CpuStat, CpuTimes, FreqKhz};

use crate::error::{HotplugError, HotplugResult};
use crate::{small_cpu, SAMPLED_CPUS};

/// Load in percent, 0..=100
pub type LoadPercent = u32;

/// Busy percentage between two cumulative samples
///
/// Returns 0 on clock anomalies (a counter running backwards, no wall time
/// elapsed, or more idle than wall time) instead of underflowing.
pub fn busy_percent(prev: CpuTimes, cur: CpuTimes) -> LoadPercent {
    let (Some(wall), Some(mut idle)) = (
        cur.wall_us.checked_sub(prev.wall_us),
        cur.idle_us.checked_sub(prev.idle_us),
    ) else {
        return 0;
    };
    let iowait = cur.iowait_us.saturating_sub(prev.iowait_us);

    if idle >= iowait {
        idle -= iowait;
    }

    if wall == 0 || wall < idle {
        return 0;
    }

    ((wall - idle) as u128 * 100 / wall as u128) as LoadPercent
}

/// Scale a busy percentage by current over maximum frequency
pub fn scale_to_max_freq(busy: LoadPercent, cur: FreqKhz, max: FreqKhz) -> LoadPercent {
    if max == 0 {
        return busy.min(100);
    }
    let scaled = busy as u64 * cur as u64 / max as u64;
    scaled.min(100) as LoadPercent
}

/// Previous-sample history of the sampled cores
#[derive(Debug, Clone, Default)]
pub struct LoadSampler {
    prev: [CpuTimes; SAMPLED_CPUS],
}

impl LoadSampler {
    /// Sampler with zeroed history; the first sample covers time since boot
    pub fn new() -> Self {
        Self::default()
    }

    /// Frequency-scaled load of a slot's small core since its last sample
    pub fn sample<P>(&mut self, platform: &P, slot: usize) -> HotplugResult<LoadPercent>
    where
        P: CpuStat + CpuFreq + ?Sized,
    {
        let cpu = small_cpu(slot);
        let cur = platform
            .cpu_times(cpu)
            .map_err(|_| HotplugError::ResourceUnavailable(cpu))?;

        let busy = busy_percent(self.prev[slot], cur);
        self.prev[slot] = cur;

        Ok(scale_to_max_freq(
            busy,
            platform.cur_freq(cpu),
            platform.max_freq(cpu),
        ))
    }

    /// Adopt the current counters as history without producing a sample
    pub fn prime<P>(&mut self, platform: &P)
    where
        P: CpuStat + ?Sized,
    {
        for slot in 0..SAMPLED_CPUS {
            if let Ok(times) = platform.cpu_times(small_cpu(slot)) {
                self.prev[slot] = times;
            }
        }
    }
}
