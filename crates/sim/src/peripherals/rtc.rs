// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use napbeacon_core::state::{BOOT_COUNT_CELL, LAST_WAKE_CELL};
use napbeacon_core::{PersistentState, RetainedMemory};
use serde_json::json;

pub const RETAINED_CELLS: usize = 2;

/// Low-power domain memory: survives suspend, cleared by power loss.
#[derive(Debug, Default)]
pub struct RetainedRam {
    cells: [u32; RETAINED_CELLS],
}

impl RetainedRam {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preloads the cells as if earlier wakes had already run.
    pub fn seed(&mut self, state: PersistentState) {
        self.cells[LAST_WAKE_CELL] = state.last_wake_ms;
        self.cells[BOOT_COUNT_CELL] = state.boot_count;
    }

    pub fn state(&self) -> PersistentState {
        PersistentState {
            last_wake_ms: self.cells[LAST_WAKE_CELL],
            boot_count: self.cells[BOOT_COUNT_CELL],
        }
    }
}

impl RetainedMemory for RetainedRam {
    fn read_cell(&self, index: usize) -> u32 {
        self.cells[index]
    }

    fn write_cell(&mut self, index: usize, value: u32) {
        self.cells[index] = value;
    }
}

impl crate::Peripheral for RetainedRam {
    fn name(&self) -> &'static str {
        "rtc_ram"
    }

    fn power_off(&mut self) {
        self.cells = [0; RETAINED_CELLS];
    }

    fn snapshot(&self) -> serde_json::Value {
        json!({ "cells": self.cells })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Peripheral;

    #[test]
    fn test_power_off_clears_cells() {
        let mut ram = RetainedRam::new();
        ram.seed(PersistentState {
            last_wake_ms: 10,
            boot_count: 7,
        });
        assert_eq!(ram.read_cell(BOOT_COUNT_CELL), 7);
        ram.power_off();
        assert_eq!(ram.state(), PersistentState::default());
    }
}
