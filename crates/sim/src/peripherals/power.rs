// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use napbeacon_core::SleepOutcome;
use serde_json::json;

use super::clock::SimClock;

/// Power management unit: takes suspend requests.
///
/// A taken suspend advances the clock by the requested time; the machine
/// then restarts the program, like a wake from deep sleep.
#[derive(Debug, Default)]
pub struct PowerUnit {
    fail_next: bool,
    suspends: u64,
    failures: u64,
    slept_us: u64,
}

impl PowerUnit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next suspend request return without sleeping.
    pub fn fail_next_suspend(&mut self) {
        self.fail_next = true;
    }

    pub fn suspend(&mut self, clock: &SimClock, duration_us: u64) -> SleepOutcome {
        if std::mem::take(&mut self.fail_next) {
            self.failures += 1;
            tracing::warn!(duration_us, "PMU: suspend request rejected");
            return SleepOutcome::Returned;
        }
        self.suspends += 1;
        self.slept_us += duration_us;
        clock.advance(duration_us);
        tracing::debug!(duration_us, "PMU: suspended");
        SleepOutcome::Entered
    }

    pub fn suspends(&self) -> u64 {
        self.suspends
    }

    pub fn slept_us(&self) -> u64 {
        self.slept_us
    }
}

impl crate::Peripheral for PowerUnit {
    fn name(&self) -> &'static str {
        "pmu"
    }

    fn snapshot(&self) -> serde_json::Value {
        json!({
            "suspends": self.suspends,
            "failures": self.failures,
            "slept_us": self.slept_us,
        })
    }
}
