//! CPU identifiers, masks and the hotplug actuator.

use core::fmt;

use static_assertions::const_assert;

use crate::HalResult;

/// Largest CPU count a [`CpuMask`] can describe
pub const MAX_CPUS: usize = 64;

const_assert!(MAX_CPUS <= u64::BITS as usize);

/// Logical CPU number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CpuId(u32);

impl CpuId {
    /// The boot CPU, never taken offline
    pub const BOOT: CpuId = CpuId(0);

    /// Create a CPU id
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw CPU number
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// CPU number as an index
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A set of CPUs
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuMask(u64);

impl CpuMask {
    /// Empty mask
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Mask with CPUs `0..count` set
    pub const fn first(count: u32) -> Self {
        if count as usize >= MAX_CPUS {
            Self(u64::MAX)
        } else {
            Self((1u64 << count) - 1)
        }
    }

    /// Raw bits
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Build from raw bits
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Add a CPU
    pub fn set(&mut self, cpu: CpuId) {
        if cpu.index() < MAX_CPUS {
            self.0 |= 1 << cpu.index();
        }
    }

    /// Remove a CPU
    pub fn clear(&mut self, cpu: CpuId) {
        if cpu.index() < MAX_CPUS {
            self.0 &= !(1 << cpu.index());
        }
    }

    /// Is the CPU in the set?
    pub const fn contains(self, cpu: CpuId) -> bool {
        cpu.index() < MAX_CPUS && self.0 & (1 << cpu.index()) != 0
    }

    /// Number of CPUs in the set
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Is the set empty?
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate CPUs in ascending order
    pub fn iter(self) -> CpuMaskIter {
        CpuMaskIter { bits: self.0 }
    }
}

impl fmt::Debug for CpuMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|c| c.as_u32())).finish()
    }
}

impl FromIterator<CpuId> for CpuMask {
    fn from_iter<I: IntoIterator<Item = CpuId>>(iter: I) -> Self {
        let mut mask = CpuMask::empty();
        for cpu in iter {
            mask.set(cpu);
        }
        mask
    }
}

/// Iterator over the CPUs of a [`CpuMask`]
#[derive(Debug, Clone)]
pub struct CpuMaskIter {
    bits: u64,
}

impl Iterator for CpuMaskIter {
    type Item = CpuId;

    fn next(&mut self) -> Option<CpuId> {
        if self.bits == 0 {
            return None;
        }
        let idx = self.bits.trailing_zeros();
        self.bits &= self.bits - 1;
        Some(CpuId::new(idx))
    }
}

/// CPU online/offline actuator
///
/// `cpu_up`/`cpu_down` are synchronous and may take several milliseconds on
/// real hardware. Callers serialise them.
pub trait CpuHotplug: Send + Sync {
    /// Number of possible CPUs
    fn possible_cpus(&self) -> u32;

    /// Currently online CPUs (authoritative)
    fn online_cpus(&self) -> CpuMask;

    /// Bring a CPU online
    fn cpu_up(&self, cpu: CpuId) -> HalResult<()>;

    /// Take a CPU offline
    fn cpu_down(&self, cpu: CpuId) -> HalResult<()>;

    /// Is the CPU online?
    fn is_online(&self, cpu: CpuId) -> bool {
        self.online_cpus().contains(cpu)
    }

    /// Number of online CPUs
    fn num_online(&self) -> u32 {
        self.online_cpus().count()
    }
}
