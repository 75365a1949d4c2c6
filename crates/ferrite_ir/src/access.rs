//! Access modes and software side-effect tags.
//!
//! These are the closed vocabularies the generator dispatches on. A property
//! combination outside these enums is unrepresentable, so the back end can
//! never receive an unknown access string at generation time.

use serde::{Deserialize, Serialize};

/// An access mode, used for both the software and hardware side of a field
/// and for the software side of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Access {
    /// No access.
    Na,
    /// Read-only.
    R,
    /// Write-only.
    W,
    /// Read-write.
    Rw,
}

impl Access {
    /// Returns `true` if this mode permits reads.
    pub fn is_readable(self) -> bool {
        matches!(self, Access::R | Access::Rw)
    }

    /// Returns `true` if this mode permits writes.
    pub fn is_writable(self) -> bool {
        matches!(self, Access::W | Access::Rw)
    }
}

/// A side effect triggered by a software read of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OnRead {
    /// Reading clears the field to all zeros.
    RClr,
    /// Reading sets the field to all ones.
    RSet,
}

/// The value-shaping behavior of a software write.
///
/// The plain behavior (absent tag) replaces written bits. The `Wo`/`Wz`
/// family operates per bit on the written data; `Wclr`/`Wset` ignore the
/// written data entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OnWrite {
    /// Write one to set: `field | data`.
    Woset,
    /// Write one to clear: `field & ~data`.
    Woclr,
    /// Write one to toggle: `field ^ data`.
    Wot,
    /// Write zero to set: `field | ~data`.
    Wzs,
    /// Write zero to clear: `field & data`.
    Wzc,
    /// Write zero to toggle: `field ^ ~data`.
    Wzt,
    /// Any write clears the field.
    Wclr,
    /// Any write sets the field.
    Wset,
}

/// The declared priority between software and hardware writers of a field
/// when both may update it on the same clock edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Precedence {
    /// Software updates win over hardware updates.
    #[default]
    Sw,
    /// Hardware updates win over software updates.
    Hw,
}
