// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#![no_main]
#![no_std]

mod backup;
mod board;
mod regs;
mod usart;

use cortex_m_rt::entry;
use napbeacon_core::hci::HciRadio;
use napbeacon_core::PowerCycle;
use panic_halt as _;

use backup::BackupRegisters;
use board::Board;
use usart::Usart;

#[entry]
fn main() -> ! {
    let board = Board::init();
    let radio = HciRadio::new(Usart::usart2());

    let mut cycle = PowerCycle::new(board, BackupRegisters, radio);
    cycle.run();

    // Only reached when Standby was refused.
    loop {
        cortex_m::asm::wfi();
    }
}
