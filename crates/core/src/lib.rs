// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Device logic of the NapBeacon: a beacon that wakes, broadcasts its boot
//! counter as an iBeacon for a moment and goes back to low-power suspend.
//!
//! Everything here is hardware independent. The firmware supplies a
//! [`Platform`], a [`RetainedMemory`] and a [`Radio`]; the simulator supplies
//! host models of the same three.

#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod log;

pub mod consts;
pub mod cycle;
pub mod diagnostics;
pub mod hci;
pub mod payload;
pub mod platform;
pub mod radio;
pub mod state;

mod tests;

pub use cycle::{CycleReport, PowerCycle};
pub use payload::{build, AdvertisementFrame, BeaconIdentity};
pub use platform::{Platform, SleepOutcome, Uptime};
pub use radio::{AdvertisingController, AdvertisingMode, BdAddr, Radio};
pub use state::{CounterStore, PersistentState, RetainedMemory};
