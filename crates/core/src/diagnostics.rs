// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Serial diagnostics, emitted only when the boot-time decision allows it.

use core::fmt::{self, Write};

use crate::consts::{DIAGNOSTIC_BOOT_THRESHOLD, PROXIMITY_UUID};
use crate::radio::BdAddr;

/// Diagnostics are on when the operator asks for them or the device is young.
pub fn should_report(diagnostic_requested: bool, boot_count: u32) -> bool {
    diagnostic_requested || boot_count < DIAGNOSTIC_BOOT_THRESHOLD
}

/// Writes diagnostic lines to the serial sink when enabled, and nothing
/// otherwise. Write errors on the sink are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostics {
    enabled: bool,
}

impl Diagnostics {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn line<W: Write>(&self, out: &mut W, args: fmt::Arguments<'_>) {
        if self.enabled {
            let _ = out.write_fmt(args);
            let _ = out.write_char('\n');
        }
    }

    pub fn banner<W: Write>(&self, out: &mut W) {
        self.line(
            out,
            format_args!("\nStart NapBeacon iBeacon {}", PROXIMITY_UUID.hyphenated()),
        );
    }

    pub fn wake_count<W: Write>(&self, out: &mut W, boot_count: u32) {
        self.line(out, format_args!("Since reset {} wakeups", boot_count));
    }

    pub fn since_reset<W: Write>(&self, out: &mut W, secs: u32) {
        self.line(out, format_args!("Last reset {}s ago", secs));
    }

    pub fn sleep_cycle<W: Write>(&self, out: &mut W, elapsed_ms: u32) {
        self.line(out, format_args!("Deep sleep cycle was {} ms", elapsed_ms));
    }

    pub fn address<W: Write>(&self, out: &mut W, addr: BdAddr) {
        self.line(out, format_args!("BLE device address is {}", addr));
    }

    pub fn advertising<W: Write>(&self, out: &mut W, duration_ms: u32) {
        self.line(out, format_args!("Advertising for {} ms", duration_ms));
    }

    pub fn sleeping<W: Write>(&self, out: &mut W, duration_ms: u32) {
        self.line(out, format_args!("Enter deep sleep for {} ms\n", duration_ms));
    }

    pub fn radio_error<W: Write, E: fmt::Debug>(&self, out: &mut W, err: &E) {
        self.line(out, format_args!("Radio error: {:?}", err));
    }

    pub fn sleep_failed<W: Write>(&self, out: &mut W) {
        self.line(out, format_args!("Deep sleep failed!"));
    }
}
