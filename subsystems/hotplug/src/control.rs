//! # Control Surface
//!
//! Text attribute interface over the tunables, one attribute per knob plus a
//! read-only `version`. `first_level` is the older name of `load_threshold`
//! and reads and writes the same value.
//!
//! ```text
//!   show("load_threshold")        -> "60\n"
//!   store("load_threshold", "75") -> Ok(75)
//!   store("load_threshold", "250")-> Ok(100)     clamped
//!   store("version", "3")         -> Err(ReadOnly)
//! ```

use alloc::format;
use alloc::string::String;
use core::fmt;

use crate::tunables::{Tunable, Tunables};

/// Version reported by the `version` attribute
pub const CONTROL_VERSION: u32 = 2;

bitflags::bitflags! {
    /// Attribute access mode
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AttrMode: u8 {
        /// Readable
        const READ = 1 << 0;
        /// Writable
        const WRITE = 1 << 1;
    }
}

/// One control attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name
    pub name: &'static str,
    /// Access mode
    pub mode: AttrMode,
    /// Backing tunable, `None` for `version`
    pub key: Option<Tunable>,
}

const fn tunable_attr(key: Tunable) -> Attribute {
    Attribute {
        name: key.name(),
        mode: AttrMode::READ.union(AttrMode::WRITE),
        key: Some(key),
    }
}

static ATTRIBUTES: [Attribute; Tunable::COUNT + 2] = [
    tunable_attr(Tunable::LoadThreshold),
    tunable_attr(Tunable::HighLoadCounter),
    tunable_attr(Tunable::MaxLoadCounter),
    tunable_attr(Tunable::CpufreqUnplugLimit),
    tunable_attr(Tunable::MinTimeCpuOnline),
    tunable_attr(Tunable::Timer),
    tunable_attr(Tunable::SuspendFrequency),
    tunable_attr(Tunable::CoresOnTouch),
    tunable_attr(Tunable::InputBoostFreq),
    Attribute {
        name: "first_level",
        mode: AttrMode::READ.union(AttrMode::WRITE),
        key: Some(Tunable::LoadThreshold),
    },
    Attribute {
        name: "version",
        mode: AttrMode::READ,
        key: None,
    },
];

/// Control surface errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    /// No such attribute
    UnknownAttribute,
    /// Attribute cannot be written
    ReadOnly,
    /// Value is not an unsigned integer
    InvalidValue,
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAttribute => write!(f, "unknown attribute"),
            Self::ReadOnly => write!(f, "attribute is read-only"),
            Self::InvalidValue => write!(f, "invalid value"),
        }
    }
}

/// Attribute view over a controller's tunables
#[derive(Debug, Clone, Copy)]
pub struct HotplugControl<'a> {
    tunables: &'a Tunables,
}

impl<'a> HotplugControl<'a> {
    /// Control surface over `tunables`
    pub fn new(tunables: &'a Tunables) -> Self {
        Self { tunables }
    }

    /// Attribute table
    pub fn attributes() -> &'static [Attribute] {
        &ATTRIBUTES
    }

    fn lookup(name: &str) -> Result<&'static Attribute, ControlError> {
        ATTRIBUTES
            .iter()
            .find(|a| a.name == name)
            .ok_or(ControlError::UnknownAttribute)
    }

    /// Read an attribute as `"<value>\n"`
    pub fn show(&self, name: &str) -> Result<String, ControlError> {
        let attr = Self::lookup(name)?;
        let value = match attr.key {
            Some(key) => self.tunables.get(key),
            None => CONTROL_VERSION,
        };
        Ok(format!("{}\n", value))
    }

    /// Write an attribute, return the value actually stored
    pub fn store(&self, name: &str, buf: &str) -> Result<u32, ControlError> {
        let attr = Self::lookup(name)?;
        let key = match attr.key {
            Some(key) if attr.mode.contains(AttrMode::WRITE) => key,
            _ => return Err(ControlError::ReadOnly),
        };

        let value = parse_uint(buf)?;
        Ok(self.tunables.set(key, value))
    }
}

/// Unsigned decimal, surrounding whitespace ignored, saturating at u32::MAX
fn parse_uint(buf: &str) -> Result<u32, ControlError> {
    let digits = buf.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ControlError::InvalidValue);
    }

    let value = digits.bytes().fold(0u64, |acc, b| {
        acc.saturating_mul(10).saturating_add((b - b'0') as u64)
    });
    Ok(value.min(u32::MAX as u64) as u32)
}
