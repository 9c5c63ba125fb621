// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod clock;
pub mod gpio;
pub mod hci;
pub mod power;
pub mod rtc;
pub mod uart;
