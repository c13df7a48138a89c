//! Frequency inspection, frequency capping and CPU time accounting.

use crate::{CpuId, HalResult};

/// Frequency in kHz
pub type FreqKhz = u32;

/// Cumulative CPU time counters for one CPU, in microseconds
///
/// All three counters are monotonic since boot; consumers work with deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTimes {
    /// Wall-clock time
    pub wall_us: u64,
    /// Idle time (including iowait on platforms that fold it in)
    pub idle_us: u64,
    /// Time spent waiting on I/O
    pub iowait_us: u64,
}

/// Frequency inspection and capping
pub trait CpuFreq: Send + Sync {
    /// Current operating frequency of the CPU's policy
    fn cur_freq(&self, cpu: CpuId) -> FreqKhz;

    /// Maximum frequency of the CPU's policy
    fn max_freq(&self, cpu: CpuId) -> FreqKhz;

    /// Impose (`Some`) or lift (`None`) an upper bound on the CPU's frequency
    fn set_max_freq_cap(&self, cpu: CpuId, cap: Option<FreqKhz>) -> HalResult<()>;

    /// Ask the CPU's policy to run at least at `freq`, rounded up to the
    /// next supported step
    fn set_target_freq(&self, cpu: CpuId, freq: FreqKhz) -> HalResult<()>;
}

/// CPU time accounting (kcpustat equivalent)
pub trait CpuStat: Send + Sync {
    /// Cumulative time counters for the CPU
    ///
    /// Returns [`HalError::NotReady`](crate::HalError::NotReady) while the
    /// accounting source is still initialising.
    fn cpu_times(&self, cpu: CpuId) -> HalResult<CpuTimes>;
}
