// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::peripherals::hci::Transmission;
use napbeacon_core::PersistentState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize, Deserialize, Debug)]
pub struct MachineSnapshot {
    pub cycles: u32,
    pub halted: bool,
    pub now_us: u64,
    pub retained: PersistentState,
    pub transmissions: Vec<Transmission>,
    pub peripherals: HashMap<String, serde_json::Value>,
}
