// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Platform services consumed by the power cycle.

use core::fmt;

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

/// Time since the last cold reset. Keeps counting through low-power suspend.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct Uptime {
    pub secs: u32,
    pub micros: u32,
}

impl Uptime {
    pub fn from_micros(us: u64) -> Self {
        Self {
            secs: (us / 1_000_000) as u32,
            micros: (us % 1_000_000) as u32,
        }
    }

    /// Milliseconds in 32-bit arithmetic; wraps after ~49.7 days.
    pub fn as_millis(&self) -> u32 {
        self.secs
            .wrapping_mul(1000)
            .wrapping_add(self.micros / 1000)
    }
}

/// Result of asking the platform to suspend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "snake_case"))]
pub enum SleepOutcome {
    /// The platform took the suspend. Real hardware restarts from reset
    /// instead of returning this; only hosts that model the restart see it.
    Entered,
    /// The suspend call came back without sleeping.
    Returned,
}

pub trait Platform {
    type Serial: fmt::Write;

    fn uptime(&mut self) -> Uptime;

    /// Level of the diagnostic input (button held).
    fn diagnostic_requested(&mut self) -> bool;

    fn serial(&mut self) -> &mut Self::Serial;

    /// Blocks for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);

    /// Enters low-power suspend for `duration_us`.
    ///
    /// On hardware a successful suspend never returns: the next wake starts
    /// the program over from its entry point. Returning
    /// [`SleepOutcome::Returned`] is the platform's way of saying the request
    /// failed; there is no recovery beyond reporting it.
    fn deep_sleep(&mut self, duration_us: u64) -> SleepOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_split() {
        let up = Uptime::from_micros(12_345_678);
        assert_eq!(up.secs, 12);
        assert_eq!(up.micros, 345_678);
        assert_eq!(up.as_millis(), 12_345);
    }

    #[test]
    fn test_millis_wrap() {
        let up = Uptime {
            secs: 4_294_968,
            micros: 0,
        };
        assert_eq!(up.as_millis(), 4_294_968_000u64 as u32);
    }
}
