// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use napbeacon_core::RetainedMemory;

use crate::regs::{read, write, BKP};

const CELLS: usize = 2;

/// Backup data registers DR1..DR4, two 16-bit halves per cell.
///
/// They live in the backup domain: kept through Standby, lost when
/// both VDD and VBAT go away. Writes need `PWR_CR.DBP`, which
/// `Board::init` sets.
pub struct BackupRegisters;

impl BackupRegisters {
    fn halves(index: usize) -> (u32, u32) {
        let lo = BKP + 0x04 + (index as u32) * 8;
        (lo, lo + 4)
    }
}

impl RetainedMemory for BackupRegisters {
    fn read_cell(&self, index: usize) -> u32 {
        if index >= CELLS {
            return 0;
        }
        let (lo, hi) = Self::halves(index);
        (read(lo) & 0xFFFF) | ((read(hi) & 0xFFFF) << 16)
    }

    fn write_cell(&mut self, index: usize, value: u32) {
        if index >= CELLS {
            return;
        }
        let (lo, hi) = Self::halves(index);
        write(lo, value & 0xFFFF);
        write(hi, value >> 16);
    }
}
