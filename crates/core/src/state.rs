// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Counters kept in memory that survives the low-power suspend.

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

/// Cell index of the last-wake timestamp.
pub const LAST_WAKE_CELL: usize = 0;
/// Cell index of the boot counter.
pub const BOOT_COUNT_CELL: usize = 1;

/// Two 32-bit cells retained across suspend but not across power loss.
///
/// After a cold power-on both cells read as zero.
pub trait RetainedMemory {
    fn read_cell(&self, index: usize) -> u32;
    fn write_cell(&mut self, index: usize, value: u32);
}

impl<T: RetainedMemory + ?Sized> RetainedMemory for &mut T {
    fn read_cell(&self, index: usize) -> u32 {
        (**self).read_cell(index)
    }

    fn write_cell(&mut self, index: usize, value: u32) {
        (**self).write_cell(index, value)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct PersistentState {
    /// Uptime in milliseconds at the previous wake.
    pub last_wake_ms: u32,
    /// Number of wakes since the last cold reset. Wraps at `u32::MAX`.
    pub boot_count: u32,
}

impl PersistentState {
    /// State to persist for a wake happening at `now_ms`.
    pub fn advance(self, now_ms: u32) -> Self {
        Self {
            last_wake_ms: now_ms,
            boot_count: self.boot_count.wrapping_add(1),
        }
    }

    /// Milliseconds between the previous wake and `now_ms`.
    pub fn elapsed_since_last_wake(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.last_wake_ms)
    }
}

/// Typed view over the retained cells.
#[derive(Debug)]
pub struct CounterStore<M> {
    memory: M,
}

impl<M: RetainedMemory> CounterStore<M> {
    pub fn new(memory: M) -> Self {
        Self { memory }
    }

    pub fn load(&self) -> PersistentState {
        PersistentState {
            last_wake_ms: self.memory.read_cell(LAST_WAKE_CELL),
            boot_count: self.memory.read_cell(BOOT_COUNT_CELL),
        }
    }

    pub fn store(&mut self, state: PersistentState) {
        self.memory.write_cell(LAST_WAKE_CELL, state.last_wake_ms);
        self.memory.write_cell(BOOT_COUNT_CELL, state.boot_count);
    }

    pub fn into_inner(self) -> M {
        self.memory
    }
}
