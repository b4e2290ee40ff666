//! Source-database operation timestamp

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cluster operation time: seconds plus an ordinal within the second
///
/// Ordered by `(seconds, increment)`; packs into a `u64` with the seconds in
/// the high half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OpTime {
    pub seconds: u32,
    pub increment: u32,
}

impl OpTime {
    pub const fn new(seconds: u32, increment: u32) -> Self {
        Self { seconds, increment }
    }

    pub const fn from_u64(value: u64) -> Self {
        Self {
            seconds: (value >> 32) as u32,
            increment: value as u32,
        }
    }

    pub const fn as_u64(&self) -> u64 {
        ((self.seconds as u64) << 32) | self.increment as u64
    }
}

impl fmt::Display for OpTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}, {})", self.seconds, self.increment)
    }
}
