//! Monotonic time.

/// Point in time since boot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    nanos: u64,
}

impl Timestamp {
    /// Boot
    pub const ZERO: Timestamp = Timestamp { nanos: 0 };

    /// Create from nanoseconds
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Create from microseconds
    pub const fn from_micros(micros: u64) -> Self {
        Self {
            nanos: micros.saturating_mul(1_000),
        }
    }

    /// Create from milliseconds
    pub const fn from_millis(millis: u64) -> Self {
        Self {
            nanos: millis.saturating_mul(1_000_000),
        }
    }

    /// Create from seconds
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            nanos: secs.saturating_mul(1_000_000_000),
        }
    }

    /// Get nanoseconds
    pub const fn as_nanos(&self) -> u64 {
        self.nanos
    }

    /// Get microseconds
    pub const fn as_micros(&self) -> u64 {
        self.nanos / 1_000
    }

    /// Get milliseconds
    pub const fn as_millis(&self) -> u64 {
        self.nanos / 1_000_000
    }

    /// Duration since an earlier timestamp, zero if `earlier` is in the future
    pub const fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        Duration {
            nanos: self.nanos.saturating_sub(earlier.nanos),
        }
    }

    /// Timestamp `d` later, saturating at the end of time
    pub const fn saturating_add(&self, d: Duration) -> Timestamp {
        Timestamp {
            nanos: self.nanos.saturating_add(d.nanos),
        }
    }
}

/// Span of time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration {
    nanos: u64,
}

impl Duration {
    /// Zero-length span
    pub const ZERO: Duration = Duration { nanos: 0 };

    /// Create from nanoseconds
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Create from microseconds
    pub const fn from_micros(micros: u64) -> Self {
        Self {
            nanos: micros.saturating_mul(1_000),
        }
    }

    /// Create from milliseconds
    pub const fn from_millis(millis: u64) -> Self {
        Self {
            nanos: millis.saturating_mul(1_000_000),
        }
    }

    /// Create from seconds
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            nanos: secs.saturating_mul(1_000_000_000),
        }
    }

    /// Get nanoseconds
    pub const fn as_nanos(&self) -> u64 {
        self.nanos
    }

    /// Get milliseconds
    pub const fn as_millis(&self) -> u64 {
        self.nanos / 1_000_000
    }

    /// Multiply, saturating on overflow
    pub const fn saturating_mul(&self, factor: u64) -> Duration {
        Duration {
            nanos: self.nanos.saturating_mul(factor),
        }
    }
}

/// Monotonic clock (ktime_get equivalent)
pub trait Clock: Send + Sync {
    /// Current time since boot
    fn now(&self) -> Timestamp;
}
