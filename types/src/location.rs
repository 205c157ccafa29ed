//! Directory-block heights, minutes and leader slots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of minutes in one directory block.
pub const MINUTES_PER_BLOCK: u8 = 10;

/// Index of a leader slot (position of a federated server in chain-ID order).
pub type SlotIndex = usize;

/// A directory block height. Every slot agrees on it as the consensus clock.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DbHeight(u32);

impl DbHeight {
    pub const GENESIS: Self = Self(0);

    pub fn new(height: u32) -> Self {
        Self(height)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for DbHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A (height, minute) position in the block cadence.
///
/// Orders by height first, then minute.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MinuteLocation {
    pub height: DbHeight,
    pub minute: u8,
}

impl MinuteLocation {
    pub fn new(height: DbHeight, minute: u8) -> Self {
        Self { height, minute }
    }

    /// Absolute minute index since genesis.
    pub fn absolute(&self) -> u64 {
        u64::from(self.height.as_u32()) * u64::from(MINUTES_PER_BLOCK) + u64::from(self.minute)
    }

    /// The location `minutes` later, rolling over into following heights.
    pub fn advance(&self, minutes: u32) -> Self {
        let total = self.absolute() + u64::from(minutes);
        let per_block = u64::from(MINUTES_PER_BLOCK);
        let height = u32::try_from(total / per_block).unwrap_or(u32::MAX);
        Self {
            height: DbHeight::new(height),
            minute: (total % per_block) as u8,
        }
    }
}

impl fmt::Display for MinuteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.height, self.minute)
    }
}
