// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Build-time tunables of the beacon.

use uuid::{uuid, Uuid};

/// Proximity UUID of the beacon, also printed in the startup banner.
pub const PROXIMITY_UUID: Uuid = uuid!("49d3b970-625b-40e3-b96b-32466f297fdb");

/// Bluetooth SIG company identifier carried in the manufacturer data (Apple).
pub const MANUFACTURER_ID: u16 = 0x004C;

/// iBeacon sub-type and the length of the record that follows it.
pub const BEACON_SUBTYPE: u8 = 0x02;
pub const BEACON_SUBTYPE_LEN: u8 = 0x15;

/// Calibrated RSSI at 1 m. Left uncalibrated.
pub const MEASURED_POWER: i8 = 0;

/// Name handed to the radio on init.
pub const DEVICE_NAME: &str = "NapBeacon";

/// How long each wake broadcasts before going back to sleep.
pub const ADVERTISING_DURATION_MS: u32 = 100;

/// Length of the low-power suspend between broadcasts.
pub const DEEP_SLEEP_DURATION_MS: u32 = 500;

/// Serial diagnostics stay on while the loaded boot counter is below this.
pub const DIAGNOSTIC_BOOT_THRESHOLD: u32 = 10;

/// Advertising interval bounds handed to the controller, in 0.625 ms units
/// (30 ms .. 60 ms).
pub const ADV_INTERVAL_MIN: u16 = 0x0030;
pub const ADV_INTERVAL_MAX: u16 = 0x0060;
